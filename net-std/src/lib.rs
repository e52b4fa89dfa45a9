#![allow(async_fn_in_trait)]
#![warn(clippy::large_futures)]

//! Linux `AF_PACKET` raw socket binding for [`dhcp4c_net_traits`].
//!
//! Before a lease exists there is no routable IP stack to hand packets to, so the client
//! talks to the kernel at the link layer directly: `SOCK_RAW` over `ETH_P_ALL` hands back
//! (and accepts) whole Ethernet frames, DHCP-over-UDP and ARP alike, which is what the
//! probe/announce step and the DHCP exchange both need on the same socket.

use core::ops::Deref;
use core::pin::pin;

use std::io::{self, ErrorKind};
use std::os::fd::{AsFd, AsRawFd, FromRawFd};

use async_io::Async;

use dhcp4c_net_traits::{MacAddr, RawReceive, RawSend, RawStack};
use embedded_io_async::ErrorType;

/// Identifies the network interface a raw socket is bound to, by kernel ifindex.
#[derive(Default)]
pub struct Interface(u32);

impl Interface {
    pub const fn new(ifindex: u32) -> Self {
        Self(ifindex)
    }
}

impl RawStack for Interface {
    type Error = io::Error;

    type Socket<'a> = RawSocket;

    async fn bind(&self) -> Result<Self::Socket<'_>, Self::Error> {
        let socket = syscall_los!(unsafe {
            sys::socket(sys::PF_PACKET, sys::SOCK_RAW, (sys::ETH_P_ALL as u16).to_be() as _)
        })?;

        let sockaddr = sys::sockaddr_ll {
            sll_family: sys::AF_PACKET as _,
            sll_protocol: (sys::ETH_P_ALL as u16).to_be() as _,
            sll_ifindex: self.0 as _,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: Default::default(),
        };

        syscall_los!(unsafe {
            sys::bind(
                socket,
                &sockaddr as *const _ as *const _,
                core::mem::size_of::<sys::sockaddr_ll>() as _,
            )
        })?;

        let socket = unsafe { std::net::UdpSocket::from_raw_fd(socket) };
        socket.set_broadcast(true)?;

        Ok(RawSocket(Async::new(socket)?, self.0))
    }
}

pub struct RawSocket(Async<std::net::UdpSocket>, u32);

impl RawSocket {
    pub fn release(self) -> (Async<std::net::UdpSocket>, u32) {
        (self.0, self.1)
    }
}

impl Deref for RawSocket {
    type Target = Async<std::net::UdpSocket>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ErrorType for &RawSocket {
    type Error = io::Error;
}

impl RawReceive for &RawSocket {
    async fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, MacAddr), Self::Error> {
        let fut = pin!(self.0.read_with(|io| {
            let mut storage: sys::sockaddr_storage = unsafe { core::mem::zeroed() };
            let mut addrlen = core::mem::size_of_val(&storage) as sys::socklen_t;

            let ret = syscall_los!(unsafe {
                sys::recvfrom(
                    io.as_fd().as_raw_fd(),
                    buffer.as_mut_ptr() as *mut _,
                    buffer.len(),
                    0,
                    &mut storage as *mut _ as *mut _,
                    &mut addrlen,
                )
            })?;

            let sockaddr = as_sockaddr_ll(&storage, addrlen as usize)?;

            let mut mac = [0; 6];
            mac.copy_from_slice(&sockaddr.sll_addr[..6]);

            Ok((ret as usize, mac))
        }));

        fut.await
    }
}

impl RawSend for &RawSocket {
    async fn send(&mut self, mac: MacAddr, data: &[u8]) -> Result<(), Self::Error> {
        let mut sockaddr = sys::sockaddr_ll {
            sll_family: sys::AF_PACKET as _,
            sll_protocol: (sys::ETH_P_ALL as u16).to_be() as _,
            sll_ifindex: self.1 as _,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: mac.len() as _,
            sll_addr: Default::default(),
        };

        sockaddr.sll_addr[..mac.len()].copy_from_slice(&mac);

        let fut = pin!(self.0.write_with(|io| {
            let len = core::cmp::min(data.len(), u16::MAX as usize);

            let ret = syscall_los!(unsafe {
                sys::sendto(
                    io.as_fd().as_raw_fd(),
                    data.as_ptr() as *const _,
                    len,
                    sys::MSG_NOSIGNAL,
                    &sockaddr as *const _ as *const _,
                    core::mem::size_of::<sys::sockaddr_ll>() as _,
                )
            })?;
            Ok(ret as usize)
        }));

        let len = fut.await?;

        assert_eq!(len, data.len());

        Ok(())
    }
}

impl ErrorType for RawSocket {
    type Error = io::Error;
}

impl RawReceive for RawSocket {
    async fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, MacAddr), Self::Error> {
        let mut rself = &*self;

        let fut = pin!(rself.receive(buffer));

        fut.await
    }
}

impl RawSend for RawSocket {
    async fn send(&mut self, mac: MacAddr, data: &[u8]) -> Result<(), Self::Error> {
        let mut rself = &*self;

        let fut = pin!(rself.send(mac, data));

        fut.await
    }
}

fn as_sockaddr_ll(storage: &sys::sockaddr_storage, len: usize) -> io::Result<&sys::sockaddr_ll> {
    match storage.ss_family as core::ffi::c_int {
        sys::AF_PACKET => {
            assert!(len >= core::mem::size_of::<sys::sockaddr_ll>());
            Ok(unsafe { (storage as *const _ as *const sys::sockaddr_ll).as_ref() }.unwrap())
        }
        _ => Err(io::Error::new(ErrorKind::InvalidInput, "invalid argument")),
    }
}

mod sys {
    pub use libc::*;

    #[macro_export]
    macro_rules! syscall_los {
        ($ret:expr) => {{
            let result = $ret;

            if result == -1 {
                Err(::std::io::Error::last_os_error())
            } else {
                Ok(result)
            }
        }};
    }
}
