//! Route derivation from a lease's options, honoring the classless-static-route precedence
//! order (RFC 3442 section 3): if classless static routes are present they and only they
//! describe the routing table; only in their absence do static routes and the router list
//! contribute, concatenated in that order.

use core::net::Ipv4Addr;

use dhcp4c_raw::bytes::BytesIn;

use crate::options::{DhcpOption, Ipv4Addrs, Options};
use crate::Error;

/// Maximum number of routes this crate will carry per lease. Chosen generously above what
/// any real DHCP server hands out; `TooManyRoutes` is the overflow signal past it.
pub const MAX_ROUTES: usize = 16;

pub type Routes = heapless::Vec<Route, MAX_ROUTES>;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Route {
    pub destination: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl Route {
    const fn host(destination: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        Self {
            destination,
            netmask: Ipv4Addr::new(255, 255, 255, 255),
            gateway,
        }
    }

    fn default(gateway: Ipv4Addr) -> Self {
        Self {
            destination: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            gateway,
        }
    }
}

/// Derives the routing table from a decoded options set, per the precedence described above.
pub fn routes(options: &Options<'_>, requested_ms_csr: bool) -> Result<Routes, Error> {
    if let Some(data) = options.find_map(|o| match o {
        DhcpOption::ClasslessStaticRoute(d) => Some(d),
        _ => None,
    }) {
        return decode_classless(data);
    }

    if requested_ms_csr {
        if let Some(data) = options.find_map(|o| match o {
            DhcpOption::MsClasslessStaticRoute(d) => Some(d),
            _ => None,
        }) {
            return decode_classless(data);
        }
    }

    let mut routes = Routes::new();

    if let Some(data) = options.find_map(|o| match o {
        DhcpOption::StaticRoute(d) => Some(d),
        _ => None,
    }) {
        decode_static_routes(data, &mut routes)?;
    }

    if let Some(addrs) = options.find_map(|o| match o {
        DhcpOption::Router(a) => Some(a),
        _ => None,
    }) {
        decode_routers(addrs, &mut routes)?;
    }

    Ok(routes)
}

/// Decodes RFC 3442/MS-CSR wire format: one octet of prefix length, `ceil(prefix/8)` octets
/// of destination (left-aligned, trailing octets implicitly zero), then a 4-octet gateway.
fn decode_classless(data: &[u8]) -> Result<Routes, Error> {
    let mut bytes = BytesIn::new(data);
    let mut routes = Routes::new();

    while !bytes.is_empty() {
        let prefix = bytes.byte()?;
        if prefix > 32 {
            return Err(Error::InvalidFormat);
        }

        let significant = (prefix as usize).div_ceil(8);
        let mut octets = [0u8; 4];
        octets[..significant].copy_from_slice(bytes.slice(significant)?);

        let gateway = Ipv4Addr::from(bytes.arr::<4>()?);
        let netmask = prefix_netmask(prefix);

        routes
            .push(Route {
                destination: Ipv4Addr::from(octets),
                netmask,
                gateway,
            })
            .map_err(|_| Error::TooManyRoutes)?;
    }

    Ok(routes)
}

/// Decodes the legacy static-routes option (33): 8-octet (destination, gateway) pairs. The
/// netmask isn't carried on the wire here; it's derived classfully from the destination,
/// which is a different rule from the one used for a bare address on an interface.
fn decode_static_routes(data: &[u8], out: &mut Routes) -> Result<(), Error> {
    if data.len() % 8 != 0 {
        return Err(Error::InvalidFormat);
    }

    for pair in data.chunks_exact(8) {
        let destination = Ipv4Addr::new(pair[0], pair[1], pair[2], pair[3]);
        let gateway = Ipv4Addr::new(pair[4], pair[5], pair[6], pair[7]);
        let netmask = classful_netmask(destination);

        out.push(Route {
            destination,
            netmask,
            gateway,
        })
        .map_err(|_| Error::TooManyRoutes)?;
    }

    Ok(())
}

fn decode_routers(addrs: Ipv4Addrs<'_>, out: &mut Routes) -> Result<(), Error> {
    for gateway in addrs.iter() {
        out.push(Route::default(gateway))
            .map_err(|_| Error::TooManyRoutes)?;
    }

    Ok(())
}

fn prefix_netmask(prefix: u8) -> Ipv4Addr {
    if prefix == 0 {
        Ipv4Addr::UNSPECIFIED
    } else {
        Ipv4Addr::from(u32::MAX.wrapping_shl(32 - prefix as u32))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classless_routes_take_precedence() {
        // 24-bit prefix 10.0.0/24 via 192.0.2.1, default route via 192.0.2.1.
        let csr: &[u8] = &[24, 10, 0, 0, 192, 0, 2, 1, 0, 192, 0, 2, 1];
        let options_data = [
            DhcpOption::ClasslessStaticRoute(csr),
            DhcpOption::Router(Ipv4Addrs::empty()),
        ];
        let options = Options::new(&options_data);

        let routes = routes(&options, false).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].destination, Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(routes[0].netmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(routes[1].destination, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn falls_back_to_static_then_router() {
        let static_routes: &[u8] = &[172, 16, 0, 0, 192, 0, 2, 2];
        let options_data = [
            DhcpOption::StaticRoute(static_routes),
            DhcpOption::Router(Ipv4Addrs::empty()),
        ];
        let options = Options::new(&options_data);

        let routes = routes(&options, false).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].destination, Ipv4Addr::new(172, 16, 0, 0));
        assert_eq!(routes[0].netmask, Ipv4Addr::new(255, 255, 0, 0));
    }

    #[test]
    fn rejects_oversized_prefix() {
        let csr: &[u8] = &[33, 0, 0, 0, 0];
        let options = Options::new(&[DhcpOption::ClasslessStaticRoute(csr)]);
        assert!(matches!(routes(&options, false), Err(Error::InvalidFormat)));
    }
}
