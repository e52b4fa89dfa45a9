//! DHCPv4 client core: the state machine, its timers, ARP-based conflict detection and
//! the ambient persistence a running daemon needs (lease file, DUID file, PID file, hook
//! script). Sits on top of [`dhcp4c_raw`]'s wire codecs and [`dhcp4c_net_traits`]'s socket
//! abstractions; owns no platform-specific socket code itself.

pub mod arp_prober;
pub mod duid_store;
pub mod fsm;
pub mod hook;
pub mod lease_store;
pub mod pidfile;
pub mod rng;
pub mod timer;

use core::net::Ipv4Addr;
use std::path::PathBuf;

use dhcp4c_net_traits::{MacAddr, RawReceive, RawSend};
use dhcp4c_proto::duid::{ClientId, Duid};
use dhcp4c_proto::message::{MessageType, Packet};
use dhcp4c_proto::{DhcpOption, Lease, Options};
use dhcp4c_raw::io::{Frame, Link};

use fsm::{Action, Event, Phase, State};
use timer::{TimerKey, Timers};

/// Filesystem roots a running daemon persists state under, mirroring the layout a real
/// install would derive from `--state-dir`/`--config-dir`/`--run-dir` (parsing those
/// flags is outside this crate's scope).
pub struct Paths {
    pub state_dir: PathBuf,
    pub config_dir: PathBuf,
    pub run_dir: PathBuf,
    pub package: &'static str,
}

/// Static, per-interface configuration the FSM needs but does not itself decide.
pub struct Config {
    pub ifname: String,
    pub mac: MacAddr,
    pub ifindex: u32,
    pub arp_enabled: bool,
    pub max_conflicts: u32,
    pub hook_script: Option<PathBuf>,
    pub request: dhcp4c_proto::mask::OptionMask,
    pub suppress: dhcp4c_proto::mask::OptionMask,
}

/// Ties the pure [`fsm`] to a real [`Link`], persistence and a hook runner. One instance
/// per interface; nothing here is shared across interfaces except `paths.package`.
pub struct Client<T> {
    link: Link<T>,
    config: Config,
    paths: Paths,
    rng: rng::OsRng,
    duid: Duid,
    state: State,
    timers: Timers,
    old_lease: Option<Lease>,
    /// Raw header+options bytes of the last ACK, persisted verbatim on BOUND.
    last_ack: Option<Vec<u8>>,
}

impl<T> Client<T>
where
    T: RawSend + RawReceive,
{
    pub fn new(link: Link<T>, config: Config, paths: Paths, duid: Duid) -> Self {
        let mut rng = rng::OsRng;
        let xid = rng::xid(&mut rng);

        let lease_path = lease_store::lease_path(&paths.state_dir, paths.package, &config.ifname);
        let (state, last_ack) = match lease_store::read_lease(&lease_path) {
            Ok(Some(persisted)) => match lease_store::decode(&persisted) {
                Ok(packet) => match Lease::from_ack(packet.yiaddr, &packet.options, false) {
                    Ok(lease)
                        if persisted.elapsed_since_bound < std::time::Duration::from_secs(lease.lease_time as u64) =>
                    {
                        (State::reboot(xid, lease), Some(persisted.bytes))
                    }
                    _ => (State::new(xid), None),
                },
                Err(_) => (State::new(xid), None),
            },
            _ => (State::new(xid), None),
        };

        Self {
            link,
            config,
            paths,
            rng,
            duid,
            state,
            timers: Timers::new(),
            old_lease: None,
            last_ack,
        }
    }

    fn lease_path(&self) -> PathBuf {
        lease_store::lease_path(&self.paths.state_dir, self.paths.package, &self.config.ifname)
    }

    fn client_id(&self) -> ClientId {
        ClientId::Rfc4361 {
            iaid: dhcp4c_proto::duid::ClientId::iaid_from_index(self.config.ifindex),
            duid: self.duid,
        }
    }

    fn chaddr(&self) -> [u8; 16] {
        let mut chaddr = [0u8; 16];
        chaddr[..6].copy_from_slice(&self.config.mac);
        chaddr
    }

    fn request_list(&self) -> dhcp4c_proto::mask::RequestList {
        dhcp4c_proto::mask::request_list(&self.config.request, &self.config.suppress)
    }

    /// Builds a DHCP message of `kind` for the current FSM state.
    fn build_message<'o>(&self, kind: MessageType, buf: &'o mut [u8]) -> Result<&'o [u8], dhcp4c_proto::Error> {
        let mut client_id_buf = [0u8; ClientId::MAX_ENCODED_LEN];
        let client_id = self.client_id().encode(&mut client_id_buf);

        let request_list = self.request_list();
        let mut options = vec![DhcpOption::MessageType(kind), DhcpOption::ClientIdentifier(client_id)];

        match kind {
            MessageType::Discover | MessageType::Request => {
                // SELECTING's REQUEST echoes the offer's server id; REBOOT's REQUEST must
                // not (RFC 2131 4.3.2) since no server has been chosen yet.
                if kind == MessageType::Request && self.state.phase == Phase::Requesting {
                    if let Some(offer) = &self.state.offer {
                        options.push(DhcpOption::RequestedIpAddress(offer.yiaddr));
                        options.push(DhcpOption::ServerIdentifier(offer.server_id));
                    }
                } else if kind == MessageType::Request && self.state.phase == Phase::Reboot {
                    if let Some(lease) = &self.state.lease {
                        options.push(DhcpOption::RequestedIpAddress(lease.yiaddr));
                    }
                }
                options.push(DhcpOption::ParameterRequestList(request_list.as_slice()));
            }
            MessageType::Decline | MessageType::Release => {
                if let Some(addr) = self.state.probe_addr.or(self.state.lease.as_ref().map(|l| l.yiaddr)) {
                    options.push(DhcpOption::RequestedIpAddress(addr));
                }
            }
            MessageType::Inform => {
                options.push(DhcpOption::ParameterRequestList(request_list.as_slice()));
            }
            _ => {}
        }

        let ciaddr = match self.state.phase {
            Phase::Renewing | Phase::Rebinding => self.state.lease.as_ref().map(|l| l.yiaddr).unwrap_or(Ipv4Addr::UNSPECIFIED),
            Phase::Inform => self.state.inform_addr.unwrap_or(Ipv4Addr::UNSPECIFIED),
            _ => Ipv4Addr::UNSPECIFIED,
        };

        let packet = Packet {
            reply: false,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: self.state.xid,
            secs: 0,
            broadcast: ciaddr.is_unspecified(),
            ciaddr,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: self.chaddr(),
            sname: &[0u8; 64],
            file: &[0u8; 128],
            options: Options::new(&options),
        };

        packet.encode(buf)
    }

    /// Runs the actions the FSM asked for after a transition: sending frames, arming
    /// timers, persisting or dropping the lease, driving the ARP prober and invoking the
    /// hook script. ARP outcomes and, eventually, an empty options view feed straight back
    /// through [`fsm::step`], so this is a worklist rather than a single pass.
    async fn apply(&mut self, actions: heapless::Vec<Action, 4>) -> Result<(), dhcp4c_raw::io::Error<T::Error>> {
        let mut pending: Vec<Action> = actions.into_iter().collect();
        let chaddr = self.chaddr();

        while let Some(action) = pending.pop() {
            match action {
                Action::SendBroadcast(kind) => {
                    let mut buf = [0u8; 1500];
                    if let Ok(data) = self.build_message(kind, &mut buf) {
                        let src = core::net::SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 68);
                        let dst = core::net::SocketAddrV4::new(Ipv4Addr::BROADCAST, 67);
                        self.link.send_dhcp(dhcp4c_raw::eth::BROADCAST, src, dst, data).await?;
                    }
                }
                Action::SendUnicast(kind, server) => {
                    let mut buf = [0u8; 1500];
                    if let Ok(data) = self.build_message(kind, &mut buf) {
                        let ciaddr = self.state.lease.as_ref().map(|l| l.yiaddr).unwrap_or(Ipv4Addr::UNSPECIFIED);
                        let src = core::net::SocketAddrV4::new(ciaddr, 68);
                        let dst = core::net::SocketAddrV4::new(server, 67);
                        self.link.send_dhcp(dhcp4c_raw::eth::BROADCAST, src, dst, data).await?;
                    }
                }
                Action::ScheduleRetransmit(delay) => self.timers.set_in(TimerKey::Retransmit, delay),
                Action::ScheduleCoolOff(delay) => self.timers.set_in(TimerKey::CoolOff, delay),

                Action::StartProbe(addr) => {
                    let event = if self.config.arp_enabled {
                        match arp_prober::probe(&mut self.link, addr, &mut self.rng).await? {
                            arp_prober::ProbeOutcome::Free => fsm::Event::ArpProbed,
                            arp_prober::ProbeOutcome::Conflict => fsm::Event::ArpConflict,
                        }
                    } else {
                        fsm::Event::ArpProbed
                    };
                    let follow_up = fsm::step(&mut self.state, event, &chaddr, self.config.max_conflicts);
                    pending.extend(follow_up);
                }
                Action::StartIpv4llProbe => {
                    let candidate = rng::ipv4ll_address(&mut self.rng);
                    self.state.probe_addr = Some(candidate);
                    let event = if self.config.arp_enabled {
                        match arp_prober::probe(&mut self.link, candidate, &mut self.rng).await? {
                            arp_prober::ProbeOutcome::Free => fsm::Event::ArpProbed,
                            arp_prober::ProbeOutcome::Conflict => fsm::Event::ArpConflict,
                        }
                    } else {
                        fsm::Event::ArpProbed
                    };
                    let follow_up = fsm::step(&mut self.state, event, &chaddr, self.config.max_conflicts);
                    pending.extend(follow_up);
                }
                Action::StartAnnounce(addr) => {
                    arp_prober::announce(&mut self.link, addr).await?;
                    let follow_up =
                        fsm::step(&mut self.state, fsm::Event::ArpAnnounced, &chaddr, self.config.max_conflicts);
                    pending.extend(follow_up);
                }

                Action::ArmLeaseTimers(lease) => {
                    self.timers.set_in(TimerKey::Renew, std::time::Duration::from_secs(lease.t1 as u64));
                    self.timers.set_in(TimerKey::Rebind, std::time::Duration::from_secs(lease.t2 as u64));
                    self.timers
                        .set_in(TimerKey::Expire, std::time::Duration::from_secs(lease.lease_time as u64));
                }
                Action::PersistLease => {
                    if let Some(bytes) = &self.last_ack {
                        if let Err(err) = lease_store::write_lease(&self.lease_path(), bytes) {
                            log::warn!("interface {}: writing lease file: {err}", self.config.ifname);
                        }
                    }
                }
                Action::DropLease => {
                    if let Err(err) = lease_store::delete_lease(&self.lease_path()) {
                        log::warn!("interface {}: deleting lease file: {err}", self.config.ifname);
                    }
                }

                Action::Hook(reason) => self.run_hook(reason),
                Action::Stop => log::error!("interface {}: too many address conflicts, stopping", self.config.ifname),
            }
        }
        Ok(())
    }

    fn run_hook(&mut self, reason: fsm::Reason) {
        let Some(script) = self.config.hook_script.clone() else { return };

        let reason = match reason {
            fsm::Reason::Bound => hook::Reason::Bound,
            fsm::Reason::Renew => hook::Reason::Renew,
            fsm::Reason::Rebind => hook::Reason::Rebind,
            fsm::Reason::Reboot => hook::Reason::Reboot,
            fsm::Reason::Expire => hook::Reason::Expire,
            fsm::Reason::Fail => hook::Reason::Fail,
            fsm::Reason::Ipv4ll => hook::Reason::Ipv4ll,
            fsm::Reason::Release => hook::Reason::Release,
            fsm::Reason::Inform => hook::Reason::Inform,
        };

        let empty = Options::new(&[]);
        let new_packet = self.last_ack.as_deref().and_then(|bytes| Packet::decode(bytes).ok());
        let new_options = new_packet.as_ref().map(|p| &p.options).unwrap_or(&empty);
        let new = self.state.lease.as_ref().map(|l| (l, new_options));
        let old = self.old_lease.as_ref().map(|l| (l, &empty));
        let vars = hook::build_vars(&self.config.ifname, reason, new, old);

        let info_file = hook::info_file_path(&self.paths.run_dir, self.paths.package, &self.config.ifname);
        if let Err(err) = hook::run(&script, &info_file, reason, &vars) {
            log::warn!("interface {}: running hook script: {err}", self.config.ifname);
        }

        self.old_lease = self.state.lease.clone();
    }

    /// One iteration: waits for either the next timer or an inbound frame, then feeds the
    /// corresponding event to [`fsm::step`] and applies the resulting actions.
    pub async fn run_once(&mut self, buf: &mut [u8]) -> Result<(), dhcp4c_raw::io::Error<T::Error>> {
        enum Wake<'a> {
            Frame(Frame<'a>),
            TimersDue,
        }

        let timeout = self.timers.sleep_until_next();
        let receive = self.link.receive(buf, None);

        let wake = match futures_lite::future::or(
            async { Some(receive.await) },
            async {
                timeout.await;
                None
            },
        )
        .await
        {
            Some(frame) => Wake::Frame(frame?),
            None => Wake::TimersDue,
        };

        let chaddr = self.chaddr();

        let actions = match wake {
            Wake::Frame(Frame::Dhcp { data, .. }) => match Packet::decode(data) {
                Ok(packet) => {
                    let kind = packet.options.find_map(|o| match o {
                        DhcpOption::MessageType(t) => Some(t),
                        _ => None,
                    });
                    let event = match kind {
                        Some(MessageType::Offer) => Some(Event::Offer(&packet)),
                        Some(MessageType::Ack) => {
                            self.last_ack = Some(data.to_vec());
                            Some(Event::Ack(&packet))
                        }
                        Some(MessageType::Nak) => Some(Event::Nak),
                        _ => None,
                    };
                    event.map(|event| fsm::step(&mut self.state, event, &chaddr, self.config.max_conflicts))
                }
                Err(_) => None,
            },
            Wake::Frame(Frame::Arp(_)) => None,
            Wake::TimersDue => {
                let due = self.timers.drain_due(std::time::Instant::now());
                due.first().map(|key| {
                    let event = match key {
                        TimerKey::Retransmit => Event::RetransmitTimeout,
                        TimerKey::Renew => Event::T1,
                        TimerKey::Rebind => Event::T2,
                        TimerKey::Expire => Event::Expire,
                        TimerKey::CoolOff => Event::CoolOffElapsed,
                        _ => Event::RetransmitTimeout,
                    };
                    fsm::step(&mut self.state, event, &chaddr, self.config.max_conflicts)
                })
            }
        };

        if let Some(actions) = actions {
            self.apply(actions).await?;
        }

        Ok(())
    }

    /// Kicks off acquisition: broadcasts a DISCOVER from a cold start, or a REQUEST if a
    /// still-fresh lease was read back from disk in [`Client::new`].
    pub async fn start(&mut self) -> Result<(), dhcp4c_raw::io::Error<T::Error>> {
        let chaddr = self.chaddr();
        let actions = fsm::step(&mut self.state, Event::Start, &chaddr, self.config.max_conflicts);
        self.apply(actions).await
    }
}
