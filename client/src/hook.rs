//! Invokes the user hook script on every state transition, the same contract dhcpcd's
//! `dhcpcd-run-hooks` follows: two positional args (info-file, reason) plus lease data as
//! both environment variables and a shell-sourcable info file.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use dhcp4c_proto::lease::Lease;
use dhcp4c_proto::options::DhcpOption;
use dhcp4c_proto::printable;
use dhcp4c_proto::Options;

/// Reasons the hook script is invoked with (RFC 2131 phase or daemon lifecycle event).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Reason {
    Preinit,
    Carrier,
    NoCarrier,
    Bound,
    Renew,
    Rebind,
    Reboot,
    Expire,
    Fail,
    Ipv4ll,
    Stop,
    Release,
    Inform,
    Test,
}

impl Reason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preinit => "PREINIT",
            Self::Carrier => "CARRIER",
            Self::NoCarrier => "NOCARRIER",
            Self::Bound => "BOUND",
            Self::Renew => "RENEW",
            Self::Rebind => "REBIND",
            Self::Reboot => "REBOOT",
            Self::Expire => "EXPIRE",
            Self::Fail => "FAIL",
            Self::Ipv4ll => "IPV4LL",
            Self::Stop => "STOP",
            Self::Release => "RELEASE",
            Self::Inform => "INFORM",
            Self::Test => "TEST",
        }
    }
}

/// One `KEY=value` pair, unescaped (suitable for a process environment directly).
pub type Vars = Vec<(String, String)>;

/// Builds the `new_*`/`old_*` environment for a transition. `new` is the lease that was
/// just accepted (absent on STOP/EXPIRE, where only `old_*` is populated); `old` is the
/// previously accepted one, if any.
pub fn build_vars(
    interface: &str,
    reason: Reason,
    new: Option<(&Lease, &Options<'_>)>,
    old: Option<(&Lease, &Options<'_>)>,
) -> Vars {
    let mut vars = vec![
        ("reason".into(), reason.as_str().into()),
        ("interface".into(), interface.into()),
        ("pid".into(), std::process::id().to_string()),
    ];

    if let Some((lease, options)) = new {
        lease_vars("new", lease, options, &mut vars);
    }
    if let Some((lease, options)) = old {
        lease_vars("old", lease, options, &mut vars);
    }

    vars
}

fn lease_vars(prefix: &str, lease: &Lease, options: &Options<'_>, vars: &mut Vars) {
    vars.push((format!("{prefix}_ip_address"), lease.yiaddr.to_string()));
    vars.push((format!("{prefix}_subnet_mask"), lease.netmask.to_string()));
    vars.push((format!("{prefix}_broadcast_address"), lease.broadcast.to_string()));
    vars.push((
        format!("{prefix}_network_number"),
        core::net::Ipv4Addr::from(u32::from(lease.yiaddr) & u32::from(lease.netmask)).to_string(),
    ));
    vars.push((format!("{prefix}_dhcp_server_identifier"), lease.server_id.to_string()));
    vars.push((format!("{prefix}_dhcp_lease_time"), lease.lease_time.to_string()));
    vars.push((format!("{prefix}_dhcp_renewal_time"), lease.t1.to_string()));
    vars.push((format!("{prefix}_dhcp_rebinding_time"), lease.t2.to_string()));

    if !lease.routes.is_empty() {
        let has_classless = options
            .find_map(|o| matches!(o, DhcpOption::ClasslessStaticRoute(_)).then_some(()))
            .is_some();

        let rendered = lease
            .routes
            .iter()
            .map(|r| format!("{}/{} {}", r.destination, mask_bits(r.netmask), r.gateway))
            .collect::<Vec<_>>()
            .join(" ");

        if has_classless {
            vars.push((format!("{prefix}_classless_static_routes"), rendered));
        } else {
            vars.push((format!("{prefix}_static_routes"), rendered));
        }
    }

    if let Some(addrs) = options.find_map(|o| match o {
        DhcpOption::Router(a) => Some(a),
        _ => None,
    }) {
        let rendered = addrs.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(" ");
        if !rendered.is_empty() {
            vars.push((format!("{prefix}_routers"), rendered));
        }
    }

    if !lease.dns.is_empty() {
        let rendered = lease.dns.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(" ");
        vars.push((format!("{prefix}_domain_name_servers"), rendered));
    }

    if let Some(name) = options.find_map(|o| match o {
        DhcpOption::DomainName(s) => Some(s),
        _ => None,
    }) {
        vars.push((format!("{prefix}_domain_name"), name.to_string()));
    }

    if let Some(data) = options.find_map(|o| match o {
        DhcpOption::DomainSearch(d) => Some(d),
        _ => None,
    }) {
        if let Ok(domains) = dhcp4c_proto::dns::decode(data) {
            let rendered = domains.iter().map(|d| d.as_str()).collect::<Vec<_>>().join(" ");
            vars.push((format!("{prefix}_domain_search"), rendered));
        }
    }

    if let Some(name) = options.find_map(|o| match o {
        DhcpOption::HostName(s) => Some(s),
        _ => None,
    }) {
        vars.push((format!("{prefix}_host_name"), name.to_string()));
    }
}

fn mask_bits(mask: core::net::Ipv4Addr) -> u32 {
    u32::from(mask).count_ones()
}

/// Writes the shell-sourcable info file: one `KEY='value'` line per variable, rendered
/// with the same printable escaping used throughout the wire codec.
pub fn write_info_file(path: &Path, vars: &Vars) -> io::Result<()> {
    let mut contents = String::new();
    for (key, value) in vars {
        let _ = write!(contents, "{key}=");
        let _ = printable::write_quoted(&mut contents, value.as_bytes());
        contents.push('\n');
    }

    fs::write(path, contents)
}

/// Runs the hook script with the info-file path and reason as positional arguments, and
/// the variables also set directly in the child's environment.
pub fn run(script: &Path, info_file: &Path, reason: Reason, vars: &Vars) -> io::Result<()> {
    write_info_file(info_file, vars)?;

    let mut cmd = Command::new(script);
    cmd.arg(info_file).arg(reason.as_str());
    for (key, value) in vars {
        cmd.env(key, value);
    }

    let status = cmd.status()?;
    if !status.success() {
        log::warn!("hook script {} exited with {}", script.display(), status);
    }

    Ok(())
}

pub fn info_file_path(run_dir: &Path, package: &str, ifname: &str) -> PathBuf {
    run_dir.join(format!("{package}-{ifname}.info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhcp4c_proto::options::DhcpOption;
    use dhcp4c_proto::Options;

    #[test]
    fn builds_base_vars_without_a_lease() {
        let vars = build_vars("eth0", Reason::Stop, None, None);
        assert!(vars.contains(&("reason".into(), "STOP".into())));
        assert!(vars.contains(&("interface".into(), "eth0".into())));
    }

    #[test]
    fn populates_new_prefixed_lease_vars() {
        let options_data = [DhcpOption::ServerIdentifier(core::net::Ipv4Addr::new(
            192, 0, 2, 1,
        ))];
        let options = Options::new(&options_data);
        let lease = Lease::from_ack(core::net::Ipv4Addr::new(192, 0, 2, 10), &options, false).unwrap();

        let vars = build_vars("eth0", Reason::Bound, Some((&lease, &options)), None);
        assert!(vars.contains(&("new_ip_address".into(), "192.0.2.10".into())));
        assert!(vars.contains(&("new_dhcp_server_identifier".into(), "192.0.2.1".into())));
    }
}
