//! Glues the wire codecs in this crate to a raw link-layer socket, so callers send and
//! receive whole Ethernet frames (DHCP-over-UDP or ARP) instead of juggling headers.

use core::net::SocketAddrV4;

use dhcp4c_net_traits::{MacAddr, RawReceive, RawSend};
use embedded_io_async::ErrorKind;

use crate::arp::ArpPacket;
use crate::eth::{EthHeader, ETHERTYPE_ARP, ETHERTYPE_IPV4};
use crate::{ip, udp, Error as RawError};

#[derive(Debug)]
pub enum Error<E> {
    Io(E),
    Raw(RawError),
}

impl<E> From<RawError> for Error<E> {
    fn from(value: RawError) -> Self {
        Self::Raw(value)
    }
}

impl<E> embedded_io_async::Error for Error<E>
where
    E: embedded_io_async::Error,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(err) => err.kind(),
            Self::Raw(_) => ErrorKind::InvalidData,
        }
    }
}

/// A frame decoded off the wire, with everything below the layer the caller cares about
/// already stripped.
pub enum Frame<'a> {
    Dhcp {
        src_mac: MacAddr,
        src: SocketAddrV4,
        dst: SocketAddrV4,
        data: &'a [u8],
    },
    Arp(ArpPacket),
}

/// Wraps a raw socket and speaks whole Ethernet frames: DHCP packets carried over
/// IPv4/UDP, and bare ARP requests/replies used for conflict detection.
pub struct Link<T> {
    socket: T,
    mac: MacAddr,
}

impl<T> Link<T>
where
    T: RawSend + RawReceive,
{
    pub fn new(socket: T, mac: MacAddr) -> Self {
        Self { socket, mac }
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub async fn send_dhcp(
        &mut self,
        dst_mac: MacAddr,
        src: SocketAddrV4,
        dst: SocketAddrV4,
        data: &[u8],
    ) -> Result<(), Error<T::Error>> {
        let mut buf = [0; 1500];

        let frame = EthHeader::encode_with_payload(dst_mac, self.mac, ETHERTYPE_IPV4, &mut buf, |buf| {
            Ok(ip::encode_dhcp(buf, *src.ip(), *dst.ip(), udp::UdpPacketHeader::PROTO, |buf| {
                Ok(udp::encode(buf, src, dst, |buf| {
                    if data.len() <= buf.len() {
                        buf[..data.len()].copy_from_slice(data);
                        Ok(data.len())
                    } else {
                        Err(RawError::BufferOverflow)
                    }
                })?
                .len())
            })?
            .len())
        })?;

        self.socket.send(dst_mac, frame).await.map_err(Error::Io)
    }

    pub async fn send_arp(
        &mut self,
        dst_mac: MacAddr,
        packet: &ArpPacket,
    ) -> Result<(), Error<T::Error>> {
        let mut buf = [0; 60];

        let frame = EthHeader::encode_with_payload(dst_mac, self.mac, ETHERTYPE_ARP, &mut buf, |buf| {
            Ok(packet.encode(buf)?.len())
        })?;

        self.socket.send(dst_mac, frame).await.map_err(Error::Io)
    }

    /// Receives and classifies the next frame, discarding anything this client has no use
    /// for (other ethertypes, malformed or foreign DHCP/ARP traffic).
    pub async fn receive<'b>(
        &mut self,
        buf: &'b mut [u8],
        filter_dst: Option<SocketAddrV4>,
    ) -> Result<Frame<'b>, Error<T::Error>> {
        // `Outcome` carries only the byte range of the DHCP payload (as offsets into
        // `buf`) rather than a borrowed slice, so that none of the borrows taken while
        // classifying a given datagram need to stay alive across the retry loop's
        // back edge; the borrow checker can't otherwise see that they don't.
        enum Outcome {
            Dhcp {
                src_mac: MacAddr,
                src: SocketAddrV4,
                dst: SocketAddrV4,
                offset: usize,
                len: usize,
            },
            Arp(ArpPacket),
        }

        let outcome = loop {
            let (len, _) = self.socket.receive(buf).await.map_err(Error::Io)?;
            let frame = &buf[..len];

            let (hdr, payload) = match EthHeader::decode(frame) {
                Ok(decoded) => decoded,
                Err(_) => continue,
            };

            match hdr.ethertype {
                ETHERTYPE_IPV4 => {
                    match ip::decode(
                        payload,
                        core::net::Ipv4Addr::UNSPECIFIED,
                        filter_dst.map(|a| *a.ip()).unwrap_or(core::net::Ipv4Addr::UNSPECIFIED),
                        Some(udp::UdpPacketHeader::PROTO),
                    ) {
                        Ok(Some((src_ip, dst_ip, _proto, udp_packet))) => {
                            match udp::decode_dhcp(
                                src_ip,
                                dst_ip,
                                udp_packet,
                                filter_dst.map(|a| a.port()),
                            ) {
                                Ok(Some((src, dst, data))) => {
                                    let offset = data.as_ptr() as usize - buf.as_ptr() as usize;
                                    break Outcome::Dhcp {
                                        src_mac: hdr.src,
                                        src,
                                        dst,
                                        offset,
                                        len: data.len(),
                                    };
                                }
                                _ => continue,
                            }
                        }
                        _ => continue,
                    }
                }
                ETHERTYPE_ARP => match ArpPacket::decode(payload) {
                    Ok(packet) => break Outcome::Arp(packet),
                    Err(_) => continue,
                },
                _ => continue,
            }
        };

        Ok(match outcome {
            Outcome::Dhcp { src_mac, src, dst, offset, len } => Frame::Dhcp {
                src_mac,
                src,
                dst,
                data: &buf[offset..offset + len],
            },
            Outcome::Arp(packet) => Frame::Arp(packet),
        })
    }
}
