//! Daemon entry point: wires one interface's [`dhcp4c_net_std::Interface`] into a
//! [`dhcp4c_client::Client`] and drives it until the process is asked to stop.
//!
//! Argument handling is deliberately minimal — a single positional interface name —
//! since flag/config-file parsing belongs to a surrounding launcher, not this core.

use std::ffi::CString;
use std::mem::MaybeUninit;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use dhcp4c_client::{duid_store, pidfile, Client, Config, Paths};
use dhcp4c_net_std::Interface;
use dhcp4c_net_traits::{MacAddr, RawStack};
use dhcp4c_proto::mask::OptionMask;

const PACKAGE: &str = "dhcp4c";

fn main() -> Result<()> {
    env_logger::init();

    let ifname = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: dhcp4c <interface>"))?;

    let ifindex = if_nametoindex(&ifname)?;
    let mac = if_hwaddr(&ifname)?;

    let paths = Paths {
        state_dir: PathBuf::from("/var/lib/dhcp4c"),
        config_dir: PathBuf::from("/etc/dhcp4c"),
        run_dir: PathBuf::from("/run/dhcp4c"),
        package: PACKAGE,
    };
    std::fs::create_dir_all(&paths.state_dir).context("creating state dir")?;
    std::fs::create_dir_all(&paths.config_dir).context("creating config dir")?;
    std::fs::create_dir_all(&paths.run_dir).context("creating run dir")?;

    let _pid_file = pidfile::PidFile::acquire(&pidfile::pid_path(&paths.run_dir, PACKAGE, &ifname))
        .context("acquiring pid file lock, is another instance running on this interface?")?;

    let duid = duid_store::load_or_generate(&duid_store::duid_path(&paths.config_dir, PACKAGE), 1, mac)
        .context("loading or generating DUID")?;

    let mut request = OptionMask::empty();
    for name in ["subnet_mask", "routers", "domain_name_servers", "domain_name", "broadcast_address", "classless_static_routes", "static_routes", "host_name"] {
        let _ = dhcp4c_proto::mask::make_option_mask(name, &mut request);
    }

    let config = Config {
        ifname: ifname.clone(),
        mac,
        ifindex,
        arp_enabled: true,
        max_conflicts: 10,
        hook_script: std::env::var_os("DHCP4C_HOOK").map(PathBuf::from),
        request,
        suppress: OptionMask::empty(),
    };

    async_io::block_on(async move {
        let stack = Interface::new(ifindex);
        let socket = stack.bind().await.context("binding raw socket")?;
        let link = dhcp4c_raw::io::Link::new(socket, mac);

        let mut client = Client::new(link, config, paths, duid);
        if let Err(err) = client.start().await {
            return Err(anyhow!("interface {ifname}: starting acquisition: {err:?}"));
        }

        let mut buf = [0u8; 1500];
        loop {
            if let Err(err) = client.run_once(&mut buf).await {
                log::warn!("interface {ifname}: {err:?}");
            }
        }
    })
}

fn if_nametoindex(ifname: &str) -> Result<u32> {
    let cname = CString::new(ifname).context("interface name contains a NUL byte")?;
    let index = unsafe { libc::if_nametoindex(cname.as_ptr()) };
    if index == 0 {
        Err(anyhow!("unknown interface {ifname}"))
    } else {
        Ok(index)
    }
}

/// `struct ifreq` as used by `SIOCGIFHWADDR`, hand-rolled since `libc` does not expose the
/// ioctl request structs themselves, only the primitive types that make them up.
#[repr(C)]
struct IfreqHwaddr {
    ifr_name: [libc::c_char; 16],
    ifr_hwaddr: libc::sockaddr,
}

/// Not exported by every `libc` target; this is the stable `sockios.h` value on Linux.
const SIOCGIFHWADDR: libc::c_ulong = 0x8927;

fn if_hwaddr(ifname: &str) -> Result<MacAddr> {
    let cname = CString::new(ifname).context("interface name contains a NUL byte")?;
    if cname.as_bytes_with_nul().len() > 16 {
        return Err(anyhow!("interface name {ifname} too long"));
    }

    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(anyhow!("opening control socket: {}", std::io::Error::last_os_error()));
    }

    let mut req: IfreqHwaddr = unsafe { MaybeUninit::zeroed().assume_init() };
    for (dst, src) in req.ifr_name.iter_mut().zip(cname.as_bytes_with_nul()) {
        *dst = *src as libc::c_char;
    }

    let result = unsafe { libc::ioctl(fd, SIOCGIFHWADDR, &mut req) };
    unsafe { libc::close(fd) };

    if result < 0 {
        return Err(anyhow!("reading hardware address: {}", std::io::Error::last_os_error()));
    }

    let mut mac = [0u8; 6];
    for (dst, src) in mac.iter_mut().zip(req.ifr_hwaddr.sa_data.iter()) {
        *dst = *src as u8;
    }

    Ok(mac)
}
