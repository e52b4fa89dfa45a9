//! Lease data derived from an ACK: the address, its netmask/broadcast, the server that
//! granted it and the renewal timers, filling in whatever the server left implicit.

use core::net::Ipv4Addr;

use crate::options::{DhcpOption, Options};
use crate::route::{self, Routes};
use crate::Error;

/// `dhcpOption(51)` value meaning the lease never expires; T1/T2 renewal timers don't apply.
pub const INFINITE: u32 = 0xffff_ffff;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Lease {
    pub yiaddr: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub server_id: Ipv4Addr,
    pub lease_time: u32,
    pub t1: u32,
    pub t2: u32,
    pub routes: Routes,
    pub dns: heapless::Vec<Ipv4Addr, 4>,
    pub domain_search: bool,
}

impl Lease {
    /// Builds a lease from an ACK's `yiaddr` and options, applying the defaulting rules
    /// for subnet mask, broadcast address and the T1/T2 renewal timers (RFC 2131 section 4.4.5).
    pub fn from_ack(
        yiaddr: Ipv4Addr,
        options: &Options<'_>,
        requested_ms_csr: bool,
    ) -> Result<Self, Error> {
        let server_id = options
            .find_map(|o| match o {
                DhcpOption::ServerIdentifier(a) => Some(a),
                _ => None,
            })
            .ok_or(Error::InvalidFormat)?;

        let netmask = options
            .find_map(|o| match o {
                DhcpOption::SubnetMask(a) => Some(a),
                _ => None,
            })
            .unwrap_or_else(|| classful_netmask(yiaddr));

        let broadcast = options
            .find_map(|o| match o {
                DhcpOption::BroadcastAddress(a) => Some(a),
                _ => None,
            })
            .unwrap_or_else(|| implied_broadcast(yiaddr, netmask));

        let lease_time = options
            .find_map(|o| match o {
                DhcpOption::IpAddressLeaseTime(v) => Some(v),
                _ => None,
            })
            .unwrap_or(INFINITE);

        let (t1, t2) = if lease_time == INFINITE {
            (INFINITE, INFINITE)
        } else {
            let t1 = options
                .find_map(|o| match o {
                    DhcpOption::RenewalTime(v) => Some(v),
                    _ => None,
                })
                .unwrap_or(lease_time / 2);

            let t2 = options
                .find_map(|o| match o {
                    DhcpOption::RebindingTime(v) => Some(v),
                    _ => None,
                })
                .unwrap_or(lease_time * 7 / 8);

            if t1 == 0 || t1 >= t2 || t2 >= lease_time {
                return Err(Error::InvalidFormat);
            }

            (t1, t2)
        };

        let routes = route::routes(options, requested_ms_csr)?;

        let mut dns = heapless::Vec::new();
        if let Some(servers) = options.find_map(|o| match o {
            DhcpOption::DomainNameServer(a) => Some(a),
            _ => None,
        }) {
            for addr in servers.iter().take(dns.capacity()) {
                let _ = dns.push(addr);
            }
        }

        let domain_search = options.find_map(|o| match o {
            DhcpOption::DomainSearch(_) => Some(()),
            _ => None,
        }).is_some();

        Ok(Self {
            yiaddr,
            netmask,
            broadcast,
            server_id,
            lease_time,
            t1,
            t2,
            routes,
            dns,
            domain_search,
        })
    }

    pub fn is_infinite(&self) -> bool {
        self.lease_time == INFINITE
    }
}

fn classful_netmask(addr: Ipv4Addr) -> Ipv4Addr {
    let first = addr.octets()[0];
    if first < 128 {
        Ipv4Addr::new(255, 0, 0, 0)
    } else if first < 192 {
        Ipv4Addr::new(255, 255, 0, 0)
    } else {
        Ipv4Addr::new(255, 255, 255, 0)
    }
}

fn implied_broadcast(addr: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    let addr = u32::from(addr);
    let mask = u32::from(netmask);
    Ipv4Addr::from(addr | !mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_t1_t2_from_lease_time() {
        let options_data = [
            DhcpOption::ServerIdentifier(Ipv4Addr::new(192, 0, 2, 1)),
            DhcpOption::IpAddressLeaseTime(3600),
        ];
        let options = Options::new(&options_data);

        let lease = Lease::from_ack(Ipv4Addr::new(192, 0, 2, 50), &options, false).unwrap();
        assert_eq!(lease.t1, 1800);
        assert_eq!(lease.t2, 3150);
        assert_eq!(lease.netmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(lease.broadcast, Ipv4Addr::new(192, 0, 2, 255));
    }

    #[test]
    fn infinite_lease_disables_timers() {
        let options_data = [DhcpOption::ServerIdentifier(Ipv4Addr::new(192, 0, 2, 1))];
        let options = Options::new(&options_data);
        let lease = Lease::from_ack(Ipv4Addr::new(192, 0, 2, 50), &options, false).unwrap();
        assert!(lease.is_infinite());
        assert_eq!(lease.t1, INFINITE);
    }

    #[test]
    fn missing_server_id_is_rejected() {
        let options = Options::new(&[DhcpOption::IpAddressLeaseTime(3600)]);
        assert!(matches!(
            Lease::from_ack(Ipv4Addr::new(192, 0, 2, 50), &options, false),
            Err(Error::InvalidFormat)
        ));
    }
}
