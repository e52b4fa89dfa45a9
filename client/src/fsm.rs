//! The per-interface DHCP state machine: an explicit phase enum plus a pure dispatch
//! function. Kept free of sockets and timers so it can be driven from tests with
//! synthetic packets and a fake clock, and from the real event loop with real ones.

use core::net::Ipv4Addr;
use core::time::Duration;

use dhcp4c_proto::message::MessageType;
use dhcp4c_proto::{Lease, Packet};

const DHCP_BASE: Duration = Duration::from_secs(4);
const DHCP_MAX: Duration = Duration::from_secs(64);
const DHCP_ARP_FAIL: Duration = Duration::from_secs(2);
const MIN_RETRANSMIT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_CONFLICTS: u32 = 10;
/// Discovery attempts before falling back to a self-assigned link-local address (RFC 3927).
const MAX_DISCOVER_ATTEMPTS: u32 = 4;
/// REQUEST attempts in REBOOT before giving up on the remembered lease and discovering fresh.
const MAX_REBOOT_ATTEMPTS: u32 = 2;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Phase {
    Init,
    Selecting,
    Requesting,
    Probe,
    Announce,
    Bound,
    Renewing,
    Rebinding,
    Reboot,
    Inform,
    InitIpv4ll,
    Releasing,
}

/// An offer collected in SELECTING, held until the REQUEST round either confirms or
/// discards it.
#[derive(Clone, Debug)]
pub struct Offer {
    pub yiaddr: Ipv4Addr,
    pub server_id: Ipv4Addr,
}

#[derive(Clone, Debug)]
pub struct State {
    pub phase: Phase,
    pub xid: u32,
    pub attempts: u32,
    pub offer: Option<Offer>,
    pub lease: Option<Lease>,
    pub probe_addr: Option<Ipv4Addr>,
    pub conflicts: u32,
    /// Set once a REBOOT round confirms the remembered lease, so the BOUND transition can
    /// fire `Reason::Reboot` instead of `Reason::Bound`.
    pub from_reboot: bool,
    /// Set once a probed address is self-assigned rather than server-leased, so the BOUND
    /// transition can fire `Reason::Ipv4ll` and skip persisting a lease file.
    pub ipv4ll: bool,
    /// The statically-configured address an INFORM round is requesting options for.
    pub inform_addr: Option<Ipv4Addr>,
}

impl State {
    pub fn new(xid: u32) -> Self {
        Self {
            phase: Phase::Init,
            xid,
            attempts: 0,
            offer: None,
            lease: None,
            probe_addr: None,
            conflicts: 0,
            from_reboot: false,
            ipv4ll: false,
            inform_addr: None,
        }
    }

    /// Starts in REBOOT, re-confirming a lease read back from disk before falling back to
    /// full discovery.
    pub fn reboot(xid: u32, lease: Lease) -> Self {
        Self {
            phase: Phase::Reboot,
            lease: Some(lease),
            from_reboot: true,
            ..Self::new(xid)
        }
    }

    /// Starts in INFORM, requesting options for an address assigned by some other means.
    pub fn inform(xid: u32, address: Ipv4Addr) -> Self {
        Self {
            phase: Phase::Inform,
            inform_addr: Some(address),
            ..Self::new(xid)
        }
    }
}

/// Something the caller must do in response to a transition: send a packet, start an ARP
/// cycle, persist or drop the lease, or tell the hook script about a reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SendBroadcast(MessageType),
    SendUnicast(MessageType, Ipv4Addr),
    StartProbe(Ipv4Addr),
    /// Picks and probes a random `169.254.0.0/16` candidate; the caller owns the RNG.
    StartIpv4llProbe,
    StartAnnounce(Ipv4Addr),
    PersistLease,
    /// Arm the renew/rebind/expire timers from this lease's T1/T2/lease-time. Emitted
    /// every time the machine enters `Phase::Bound` with a real (non-IPv4LL) lease.
    ArmLeaseTimers(Lease),
    DropLease,
    Hook(Reason),
    ScheduleRetransmit(Duration),
    ScheduleCoolOff(Duration),
    Stop,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Reason {
    Bound,
    Renew,
    Rebind,
    Reboot,
    Expire,
    Fail,
    Ipv4ll,
    Release,
    Inform,
}

/// Inputs the dispatch function reacts to.
pub enum Event<'a> {
    /// A new acquisition starts (INIT's broadcast DISCOVER, or INFORM's unicast/broadcast INFORM).
    Start,
    Offer(&'a Packet<'a>),
    Ack(&'a Packet<'a>),
    Nak,
    RetransmitTimeout,
    OfferTimeout,
    ArpProbed,
    ArpConflict,
    ArpAnnounced,
    ArpDefended,
    ArpLost,
    T1,
    T2,
    Expire,
    CoolOffElapsed,
    UserRelease,
    UserDecline,
}

/// Exponential backoff for DISCOVER/REQUEST retransmission: `DHCP_BASE * 2^attempt`,
/// capped at `DHCP_MAX`, plus jitter the caller adds separately (kept out of this pure
/// function so tests can assert on the unjittered bound).
pub fn retransmit_delay(attempt: u32) -> Duration {
    let doubled = DHCP_BASE.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    doubled.min(DHCP_MAX)
}

/// Renew/rebind retransmission schedule: half the remaining time until the next
/// checkpoint, floored at 60 seconds.
pub fn renew_retransmit_delay(remaining: Duration) -> Duration {
    (remaining / 2).max(MIN_RETRANSMIT).min(remaining.max(MIN_RETRANSMIT))
}

/// `169.254.0.0/16` link-local range a server has no business offering as `yiaddr`.
fn is_link_local(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    octets[0] == 169 && octets[1] == 254
}

fn accept(packet: &Packet<'_>, xid: u32, chaddr: &[u8; 16], expected: &[MessageType]) -> Option<MessageType> {
    if packet.xid != xid || &packet.chaddr != chaddr {
        return None;
    }
    let kind = packet.options.find_map(|o| match o {
        dhcp4c_proto::DhcpOption::MessageType(t) => Some(t),
        _ => None,
    })?;
    expected.contains(&kind).then_some(kind)
}

/// Drives one transition. `chaddr` and `max_conflicts` are interface configuration the
/// pure function needs but does not own.
pub fn step(state: &mut State, event: Event<'_>, chaddr: &[u8; 16], max_conflicts: u32) -> heapless::Vec<Action, 4> {
    let mut actions = heapless::Vec::new();
    let max_conflicts = if max_conflicts == 0 { DEFAULT_MAX_CONFLICTS } else { max_conflicts };

    macro_rules! push {
        ($a:expr) => {
            let _ = actions.push($a);
        };
    }

    match (state.phase, event) {
        (Phase::Init, Event::Start) | (Phase::Init, Event::CoolOffElapsed) => {
            state.attempts = 0;
            state.ipv4ll = false;
            state.phase = Phase::Selecting;
            push!(Action::SendBroadcast(MessageType::Discover));
            push!(Action::ScheduleRetransmit(retransmit_delay(0)));
        }

        (Phase::Selecting, Event::Offer(packet)) => {
            if let Some(MessageType::Offer) = accept(packet, state.xid, chaddr, &[MessageType::Offer]) {
                if packet.yiaddr == Ipv4Addr::new(255, 255, 255, 255)
                    || packet.yiaddr.is_unspecified()
                    || is_link_local(packet.yiaddr)
                {
                    return actions;
                }
                let server_id = packet.options.find_map(|o| match o {
                    dhcp4c_proto::DhcpOption::ServerIdentifier(a) => Some(a),
                    _ => None,
                });
                if let Some(server_id) = server_id {
                    state.offer = Some(Offer { yiaddr: packet.yiaddr, server_id });
                    state.phase = Phase::Requesting;
                    state.attempts = 0;
                    push!(Action::SendBroadcast(MessageType::Request));
                    push!(Action::ScheduleRetransmit(retransmit_delay(0)));
                }
            }
        }
        (Phase::Selecting, Event::RetransmitTimeout) | (Phase::Selecting, Event::OfferTimeout) => {
            state.attempts += 1;
            if state.attempts >= MAX_DISCOVER_ATTEMPTS {
                state.attempts = 0;
                state.phase = Phase::InitIpv4ll;
                push!(Action::StartIpv4llProbe);
            } else {
                push!(Action::SendBroadcast(MessageType::Discover));
                push!(Action::ScheduleRetransmit(retransmit_delay(state.attempts)));
            }
        }

        (Phase::InitIpv4ll, Event::ArpProbed) => {
            state.phase = Phase::Announce;
            state.ipv4ll = true;
            if let Some(addr) = state.probe_addr {
                push!(Action::StartAnnounce(addr));
            }
        }
        // Collision probability on a /16 is low; RFC 3927 has us just pick again.
        (Phase::InitIpv4ll, Event::ArpConflict) => {
            push!(Action::StartIpv4llProbe);
        }

        (Phase::Reboot, Event::Start) => {
            state.attempts = 0;
            push!(Action::SendBroadcast(MessageType::Request));
            push!(Action::ScheduleRetransmit(retransmit_delay(0)));
        }
        (Phase::Reboot, Event::Ack(packet)) => {
            if let Some(MessageType::Ack) = accept(packet, state.xid, chaddr, &[MessageType::Ack]) {
                if let Ok(lease) = Lease::from_ack(packet.yiaddr, &packet.options, false) {
                    state.lease = Some(lease);
                    state.phase = Phase::Probe;
                    state.probe_addr = Some(packet.yiaddr);
                    push!(Action::StartProbe(packet.yiaddr));
                }
            }
        }
        (Phase::Reboot, Event::Nak) => {
            state.phase = Phase::Init;
            state.lease = None;
            state.from_reboot = false;
            push!(Action::DropLease);
            push!(Action::ScheduleCoolOff(DHCP_ARP_FAIL));
        }
        (Phase::Reboot, Event::RetransmitTimeout) => {
            state.attempts += 1;
            if state.attempts > MAX_REBOOT_ATTEMPTS {
                state.phase = Phase::Selecting;
                state.attempts = 0;
                state.from_reboot = false;
                push!(Action::SendBroadcast(MessageType::Discover));
                push!(Action::ScheduleRetransmit(retransmit_delay(0)));
            } else {
                push!(Action::SendBroadcast(MessageType::Request));
                push!(Action::ScheduleRetransmit(retransmit_delay(state.attempts)));
            }
        }

        (Phase::Inform, Event::Start) => {
            if state.inform_addr.is_some() {
                push!(Action::SendBroadcast(MessageType::Inform));
                push!(Action::ScheduleRetransmit(retransmit_delay(0)));
            }
        }
        (Phase::Inform, Event::Ack(packet)) => {
            if accept(packet, state.xid, chaddr, &[MessageType::Ack]).is_some() {
                push!(Action::Hook(Reason::Inform));
            }
        }
        (Phase::Inform, Event::RetransmitTimeout) => {
            state.attempts += 1;
            if state.inform_addr.is_some() {
                push!(Action::SendBroadcast(MessageType::Inform));
                push!(Action::ScheduleRetransmit(retransmit_delay(state.attempts)));
            }
        }

        (Phase::Requesting, Event::Ack(packet)) => {
            let accepted = accept(
                packet,
                state.xid,
                chaddr,
                &[MessageType::Ack, MessageType::Nak],
            );
            let offer_yiaddr = state.offer.as_ref().map(|o| o.yiaddr);
            match accepted {
                Some(MessageType::Ack) if Some(packet.yiaddr) == offer_yiaddr || offer_yiaddr.is_none() => {
                    let requested_ms_csr = false;
                    if let Ok(lease) = Lease::from_ack(packet.yiaddr, &packet.options, requested_ms_csr) {
                        state.lease = Some(lease);
                        state.phase = Phase::Probe;
                        state.probe_addr = Some(packet.yiaddr);
                        push!(Action::StartProbe(packet.yiaddr));
                    }
                }
                // ACK with a yiaddr that doesn't match what was offered is treated as a NAK.
                _ => {
                    state.phase = Phase::Init;
                    state.offer = None;
                    push!(Action::ScheduleCoolOff(DHCP_ARP_FAIL));
                }
            }
        }
        (Phase::Requesting, Event::Nak) => {
            state.phase = Phase::Init;
            state.offer = None;
            push!(Action::ScheduleCoolOff(DHCP_ARP_FAIL));
        }
        (Phase::Requesting, Event::RetransmitTimeout) => {
            state.attempts += 1;
            push!(Action::SendBroadcast(MessageType::Request));
            push!(Action::ScheduleRetransmit(retransmit_delay(state.attempts)));
        }

        (Phase::Probe, Event::ArpProbed) => {
            state.phase = Phase::Announce;
            if let Some(addr) = state.probe_addr {
                push!(Action::StartAnnounce(addr));
            }
        }
        (Phase::Probe, Event::ArpConflict) => {
            state.conflicts += 1;
            state.lease = None;
            state.phase = Phase::Init;
            let server_id = state.offer.as_ref().map(|o| o.server_id);
            state.offer = None;
            if let Some(server_id) = server_id {
                push!(Action::SendUnicast(MessageType::Decline, server_id));
            }
            push!(Action::ScheduleCoolOff(Duration::from_secs(10)));
        }
        (Phase::Announce, Event::ArpAnnounced) => {
            state.phase = Phase::Bound;
            if state.ipv4ll {
                push!(Action::Hook(Reason::Ipv4ll));
            } else if state.from_reboot {
                state.from_reboot = false;
                push!(Action::PersistLease);
                if let Some(lease) = state.lease.clone() {
                    push!(Action::ArmLeaseTimers(lease));
                }
                push!(Action::Hook(Reason::Reboot));
            } else {
                push!(Action::PersistLease);
                if let Some(lease) = state.lease.clone() {
                    push!(Action::ArmLeaseTimers(lease));
                }
                push!(Action::Hook(Reason::Bound));
            }
        }

        (_, Event::T1) if state.phase == Phase::Bound => {
            state.phase = Phase::Renewing;
            push!(Action::Hook(Reason::Renew));
            if let Some(lease) = &state.lease {
                if let Some(server_id) = Some(lease.server_id) {
                    push!(Action::SendUnicast(MessageType::Request, server_id));
                }
            }
        }
        (Phase::Renewing, Event::Ack(packet)) | (Phase::Rebinding, Event::Ack(packet)) => {
            if let Some(MessageType::Ack) = accept(packet, state.xid, chaddr, &[MessageType::Ack]) {
                if let Ok(lease) = Lease::from_ack(packet.yiaddr, &packet.options, false) {
                    state.lease = Some(lease.clone());
                    state.phase = Phase::Bound;
                    push!(Action::PersistLease);
                    push!(Action::ArmLeaseTimers(lease));
                    push!(Action::Hook(Reason::Bound));
                }
            }
        }
        (Phase::Renewing, Event::Nak) | (Phase::Rebinding, Event::Nak) => {
            state.phase = Phase::Init;
            state.lease = None;
            push!(Action::DropLease);
            push!(Action::Hook(Reason::Expire));
            push!(Action::ScheduleCoolOff(DHCP_ARP_FAIL));
        }
        (Phase::Renewing, Event::RetransmitTimeout) => {
            if let Some(lease) = &state.lease {
                push!(Action::SendUnicast(MessageType::Request, lease.server_id));
            }
        }
        (_, Event::T2) if state.phase == Phase::Renewing => {
            state.phase = Phase::Rebinding;
            push!(Action::Hook(Reason::Rebind));
            push!(Action::SendBroadcast(MessageType::Request));
        }
        (Phase::Rebinding, Event::RetransmitTimeout) => {
            push!(Action::SendBroadcast(MessageType::Request));
        }
        (_, Event::Expire) if state.phase == Phase::Rebinding => {
            state.phase = Phase::Init;
            state.lease = None;
            push!(Action::DropLease);
            push!(Action::Hook(Reason::Expire));
        }

        (Phase::Bound, Event::ArpConflict) => {
            push!(Action::StartAnnounce(state.probe_addr.unwrap_or(Ipv4Addr::UNSPECIFIED)));
        }
        (Phase::Bound, Event::ArpDefended) => {}
        (Phase::Bound, Event::ArpLost) => {
            state.conflicts += 1;
            state.lease = None;
            state.phase = Phase::Init;
            push!(Action::DropLease);
            push!(Action::Hook(Reason::Fail));
            if state.conflicts >= max_conflicts {
                push!(Action::Stop);
            }
        }

        (_, Event::UserRelease) => {
            state.phase = Phase::Releasing;
            if let Some(lease) = &state.lease {
                push!(Action::SendUnicast(MessageType::Release, lease.server_id));
            }
            push!(Action::DropLease);
            push!(Action::Hook(Reason::Release));
        }

        _ => {}
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retransmit_delay_doubles_then_caps() {
        assert_eq!(retransmit_delay(0), Duration::from_secs(4));
        assert_eq!(retransmit_delay(1), Duration::from_secs(8));
        assert_eq!(retransmit_delay(4), Duration::from_secs(64));
        assert_eq!(retransmit_delay(10), Duration::from_secs(64));
    }

    #[test]
    fn renew_schedule_floors_at_sixty_seconds() {
        assert_eq!(renew_retransmit_delay(Duration::from_secs(600)), Duration::from_secs(300));
        assert_eq!(renew_retransmit_delay(Duration::from_secs(80)), Duration::from_secs(60));
    }

    #[test]
    fn init_start_broadcasts_discover() {
        let mut state = State::new(42);
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::Start, &chaddr, 10);
        assert_eq!(state.phase, Phase::Selecting);
        assert!(actions.contains(&Action::SendBroadcast(MessageType::Discover)));
    }

    #[test]
    fn nak_during_requesting_returns_to_init_with_cooloff() {
        let mut state = State::new(1);
        state.phase = Phase::Requesting;
        state.offer = Some(Offer {
            yiaddr: Ipv4Addr::new(192, 0, 2, 10),
            server_id: Ipv4Addr::new(192, 0, 2, 1),
        });
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::Nak, &chaddr, 10);
        assert_eq!(state.phase, Phase::Init);
        assert!(actions.contains(&Action::ScheduleCoolOff(DHCP_ARP_FAIL)));
    }

    #[test]
    fn persistent_conflicts_stop_the_interface() {
        let mut state = State::new(1);
        state.phase = Phase::Bound;
        state.conflicts = 9;
        state.lease = None;
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::ArpLost, &chaddr, 10);
        assert_eq!(state.conflicts, 10);
        assert!(actions.contains(&Action::Stop));
    }

    #[test]
    fn exhausted_discovery_falls_back_to_ipv4ll() {
        let mut state = State::new(1);
        state.phase = Phase::Selecting;
        state.attempts = MAX_DISCOVER_ATTEMPTS - 1;
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::RetransmitTimeout, &chaddr, 10);
        assert_eq!(state.phase, Phase::InitIpv4ll);
        assert!(actions.contains(&Action::StartIpv4llProbe));
    }

    #[test]
    fn ipv4ll_probe_success_announces_and_bound_reason_is_ipv4ll() {
        let mut state = State::new(1);
        state.phase = Phase::InitIpv4ll;
        state.probe_addr = Some(Ipv4Addr::new(169, 254, 10, 20));
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::ArpProbed, &chaddr, 10);
        assert_eq!(state.phase, Phase::Announce);
        assert!(state.ipv4ll);
        assert!(actions.contains(&Action::StartAnnounce(Ipv4Addr::new(169, 254, 10, 20))));

        let actions = step(&mut state, Event::ArpAnnounced, &chaddr, 10);
        assert_eq!(state.phase, Phase::Bound);
        assert!(actions.contains(&Action::Hook(Reason::Ipv4ll)));
        assert!(!actions.contains(&Action::PersistLease));
    }

    #[test]
    fn reboot_confirmed_by_ack_goes_through_probe_with_reboot_reason() {
        let options_data = [dhcp4c_proto::DhcpOption::ServerIdentifier(
            Ipv4Addr::new(192, 0, 2, 1),
        )];
        let options = dhcp4c_proto::Options::new(&options_data);
        let lease = Lease::from_ack(Ipv4Addr::new(192, 0, 2, 50), &options, false).unwrap();
        let mut state = State::reboot(7, lease);
        let chaddr = [0u8; 16];

        let actions = step(&mut state, Event::Start, &chaddr, 10);
        assert!(actions.contains(&Action::SendBroadcast(MessageType::Request)));

        state.phase = Phase::Probe;
        state.probe_addr = Some(Ipv4Addr::new(192, 0, 2, 50));
        let actions = step(&mut state, Event::ArpProbed, &chaddr, 10);
        assert_eq!(state.phase, Phase::Announce);

        let actions = step(&mut state, Event::ArpAnnounced, &chaddr, 10);
        assert_eq!(state.phase, Phase::Bound);
        assert!(actions.contains(&Action::Hook(Reason::Reboot)));
        assert!(!state.from_reboot);
    }

    #[test]
    fn reboot_nak_drops_lease_and_returns_to_init() {
        let options_data = [dhcp4c_proto::DhcpOption::ServerIdentifier(
            Ipv4Addr::new(192, 0, 2, 1),
        )];
        let options = dhcp4c_proto::Options::new(&options_data);
        let lease = Lease::from_ack(Ipv4Addr::new(192, 0, 2, 50), &options, false).unwrap();
        let mut state = State::reboot(7, lease);
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::Nak, &chaddr, 10);
        assert_eq!(state.phase, Phase::Init);
        assert!(state.lease.is_none());
        assert!(actions.contains(&Action::DropLease));
    }

    #[test]
    fn inform_start_broadcasts_inform_and_ack_hooks_inform() {
        let mut state = State::inform(3, Ipv4Addr::new(192, 0, 2, 77));
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::Start, &chaddr, 10);
        assert!(actions.contains(&Action::SendBroadcast(MessageType::Inform)));
    }

    #[test]
    fn cooloff_elapsed_restarts_discovery() {
        let mut state = State::new(5);
        state.phase = Phase::Init;
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::CoolOffElapsed, &chaddr, 10);
        assert_eq!(state.phase, Phase::Selecting);
        assert!(actions.contains(&Action::SendBroadcast(MessageType::Discover)));
    }

    #[test]
    fn user_release_sends_unicast_release() {
        let options_data = [dhcp4c_proto::DhcpOption::ServerIdentifier(
            Ipv4Addr::new(192, 0, 2, 1),
        )];
        let options = dhcp4c_proto::Options::new(&options_data);
        let lease = Lease::from_ack(Ipv4Addr::new(192, 0, 2, 10), &options, false).unwrap();

        let mut state = State::new(1);
        state.phase = Phase::Bound;
        state.lease = Some(lease);
        let chaddr = [0u8; 16];
        let actions = step(&mut state, Event::UserRelease, &chaddr, 10);
        assert_eq!(state.phase, Phase::Releasing);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::SendUnicast(MessageType::Release, _))));
    }

    #[test]
    fn offer_with_link_local_yiaddr_is_ignored() {
        let mut state = State::new(42);
        state.phase = Phase::Selecting;
        let chaddr = [0u8; 16];
        let sname = [0u8; 64];
        let file = [0u8; 128];
        let options_data = [
            dhcp4c_proto::DhcpOption::MessageType(MessageType::Offer),
            dhcp4c_proto::DhcpOption::ServerIdentifier(Ipv4Addr::new(192, 0, 2, 1)),
        ];
        let options = dhcp4c_proto::Options::new(&options_data);
        let packet = Packet {
            reply: true,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 42,
            secs: 0,
            broadcast: false,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::new(169, 254, 10, 20),
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr,
            sname: &sname,
            file: &file,
            options,
        };
        let actions = step(&mut state, Event::Offer(&packet), &chaddr, 10);
        assert_eq!(state.phase, Phase::Selecting);
        assert!(state.offer.is_none());
        assert!(actions.is_empty());
    }
}
