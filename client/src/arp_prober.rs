//! RFC 5227 address-conflict detection: probe an address before claiming it, announce it
//! once claimed, and keep watching for anyone else using it.

use core::net::Ipv4Addr;
use core::pin::pin;
use std::time::Duration;

use async_io::Timer;
use dhcp4c_net_traits::{MacAddr, RawReceive, RawSend};
use dhcp4c_raw::arp::{ArpOp, ArpPacket};
use dhcp4c_raw::eth::BROADCAST;
use dhcp4c_raw::io::{Error as LinkError, Frame, Link};
use rand_core::RngCore;

use crate::rng;

const PROBE_NUM: u32 = 3;
const PROBE_MIN_MS: u32 = 1_000;
const PROBE_MAX_MS: u32 = 2_000;
const PROBE_WAIT_MAX_MS: u32 = 1_000;
const ANNOUNCE_NUM: u32 = 2;
const ANNOUNCE_INTERVAL_MS: u32 = 2_000;
const ANNOUNCE_WAIT_MS: u32 = 2_000;
pub const DEFEND_INTERVAL: Duration = Duration::from_secs(10);

/// Outcome of probing a candidate address.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ProbeOutcome {
    /// Nobody answered; the address is free to claim.
    Free,
    /// Someone else already holds the address.
    Conflict,
}

/// Sends up to [`PROBE_NUM`] ARP probes for `candidate`, spaced `PROBE_MIN..PROBE_MAX`
/// apart after an initial `0..PROBE_WAIT_MAX` randomized delay, listening for any reply or
/// request that claims the address is already in use. A probe reply carrying this
/// interface's own hardware address (e.g. an echo off a switch configured for port
/// mirroring) never counts as a conflict.
pub async fn probe<T, R>(
    link: &mut Link<T>,
    candidate: Ipv4Addr,
    rng: &mut R,
) -> Result<ProbeOutcome, LinkError<T::Error>>
where
    T: RawSend + RawReceive,
    R: RngCore,
{
    let our_mac = link.mac();

    Timer::after(Duration::from_millis(rng::uniform_ms(rng, 0, PROBE_WAIT_MAX_MS) as u64)).await;

    for _ in 0..PROBE_NUM {
        let request = ArpPacket::probe(our_mac, Ipv4Addr::UNSPECIFIED, candidate);
        link.send_arp(BROADCAST, &request).await?;

        let wait = rng::uniform_ms(rng, PROBE_MIN_MS, PROBE_MAX_MS);
        if let Some(outcome) = listen(link, candidate, our_mac, Duration::from_millis(wait as u64)).await? {
            return Ok(outcome);
        }
    }

    Ok(ProbeOutcome::Free)
}

/// Announces `claimed` [`ANNOUNCE_NUM`] times, [`ANNOUNCE_INTERVAL_MS`] apart, after an
/// initial [`ANNOUNCE_WAIT_MS`] settle delay.
pub async fn announce<T>(link: &mut Link<T>, claimed: Ipv4Addr) -> Result<(), LinkError<T::Error>>
where
    T: RawSend + RawReceive,
{
    Timer::after(Duration::from_millis(ANNOUNCE_WAIT_MS as u64)).await;

    for _ in 0..ANNOUNCE_NUM {
        let packet = ArpPacket::announce(link.mac(), claimed);
        link.send_arp(BROADCAST, &packet).await?;
        Timer::after(Duration::from_millis(ANNOUNCE_INTERVAL_MS as u64)).await;
    }

    Ok(())
}

/// Watches for [`DEFEND_INTERVAL`] worth of silence after sending one defending
/// announcement for `held`. Callers that see a second conflict inside the interval should
/// treat the address as lost instead of calling this again (RFC 5227 ยง2.4's rate limit).
pub async fn defend<T>(link: &mut Link<T>, held: Ipv4Addr) -> Result<(), LinkError<T::Error>>
where
    T: RawSend + RawReceive,
{
    let packet = ArpPacket::announce(link.mac(), held);
    link.send_arp(BROADCAST, &packet).await
}

/// Inspects one ARP packet against a bound `held` address. `true` means someone else
/// claims or is probing for the address; our own hardware address is always exempt.
pub fn is_conflict(packet: &ArpPacket, held: Ipv4Addr, our_mac: MacAddr) -> bool {
    if packet.sha == our_mac {
        return false;
    }

    packet.spa == held || (packet.op == ArpOp::Request && packet.spa.is_unspecified() && packet.tpa == held)
}

async fn listen<T>(
    link: &mut Link<T>,
    candidate: Ipv4Addr,
    our_mac: MacAddr,
    timeout: Duration,
) -> Result<Option<ProbeOutcome>, LinkError<T::Error>>
where
    T: RawSend + RawReceive,
{
    let mut buf = [0u8; 1500];
    let deadline = async {
        Timer::after(timeout).await;
        None
    };
    let mut deadline = pin!(deadline);

    loop {
        let receive = async {
            match link.receive(&mut buf, None).await {
                Ok(Frame::Arp(packet)) => Some(Ok(packet)),
                Ok(Frame::Dhcp { .. }) => None,
                Err(err) => Some(Err(err)),
            }
        };

        match futures_lite::future::or(receive, deadline.as_mut()).await {
            Some(Ok(packet)) => {
                if is_conflict(&packet, candidate, our_mac) {
                    return Ok(Some(ProbeOutcome::Conflict));
                }
            }
            Some(Err(err)) => return Err(err),
            None => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_hardware_address_is_never_a_conflict() {
        let our_mac = [1, 2, 3, 4, 5, 6];
        let packet = ArpPacket {
            op: ArpOp::Reply,
            sha: our_mac,
            spa: Ipv4Addr::new(192, 0, 2, 5),
            tha: our_mac,
            tpa: Ipv4Addr::new(192, 0, 2, 5),
        };

        assert!(!is_conflict(&packet, Ipv4Addr::new(192, 0, 2, 5), our_mac));
    }

    #[test]
    fn a_reply_claiming_the_address_is_a_conflict() {
        let our_mac = [1, 2, 3, 4, 5, 6];
        let other_mac = [9, 9, 9, 9, 9, 9];
        let packet = ArpPacket {
            op: ArpOp::Reply,
            sha: other_mac,
            spa: Ipv4Addr::new(192, 0, 2, 5),
            tha: our_mac,
            tpa: Ipv4Addr::new(192, 0, 2, 1),
        };

        assert!(is_conflict(&packet, Ipv4Addr::new(192, 0, 2, 5), our_mac));
    }

    #[test]
    fn a_probe_for_our_address_from_someone_else_is_a_conflict() {
        let our_mac = [1, 2, 3, 4, 5, 6];
        let other_mac = [9, 9, 9, 9, 9, 9];
        let packet = ArpPacket {
            op: ArpOp::Request,
            sha: other_mac,
            spa: Ipv4Addr::UNSPECIFIED,
            tha: [0; 6],
            tpa: Ipv4Addr::new(192, 0, 2, 5),
        };

        assert!(is_conflict(&packet, Ipv4Addr::new(192, 0, 2, 5), our_mac));
    }

    #[test]
    fn an_unrelated_address_is_not_a_conflict() {
        let our_mac = [1, 2, 3, 4, 5, 6];
        let other_mac = [9, 9, 9, 9, 9, 9];
        let packet = ArpPacket {
            op: ArpOp::Request,
            sha: other_mac,
            spa: Ipv4Addr::new(192, 0, 2, 9),
            tha: [0; 6],
            tpa: Ipv4Addr::new(192, 0, 2, 200),
        };

        assert!(!is_conflict(&packet, Ipv4Addr::new(192, 0, 2, 5), our_mac));
    }
}
