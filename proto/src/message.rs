//! BOOTP/DHCP message framing (RFC 951, RFC 2131 section 2).
//!
//! The fixed area is always 236 octets; everything past it is the magic cookie followed by
//! a variable-length options area, with `file`/`sname` reused as extra option space when
//! OPTION_OVERLOAD says so.

use core::net::Ipv4Addr;

use dhcp4c_raw::bytes::{BytesIn, BytesOut};
use num_enum::TryFromPrimitive;

use crate::options::Options;
use crate::Error;

const OP_BOOTREQUEST: u8 = 1;
const OP_BOOTREPLY: u8 = 2;

const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];
const FLAG_BROADCAST: u16 = 0x8000;

/// Minimum legal size of a BOOTP/DHCP datagram (RFC 1542 section 2.1); this crate pads
/// outgoing messages up to it and rejects nothing shorter than the fixed header on input.
pub const MIN_MESSAGE_SIZE: usize = 300;

const FIXED_HEADER_SIZE: usize = 236;
const CHADDR_LEN: usize = 16;
const SNAME_LEN: usize = 64;
const FILE_LEN: usize = 128;

#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

/// A decoded or about-to-be-encoded BOOTP/DHCP message.
///
/// `chaddr` is kept at its full 16 octets regardless of `hlen`; callers that care about
/// Ethernet addresses slice `&chaddr[..6]` themselves.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Packet<'a> {
    pub reply: bool,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub broadcast: bool,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; CHADDR_LEN],
    pub sname: &'a [u8; SNAME_LEN],
    pub file: &'a [u8; FILE_LEN],
    pub options: Options<'a>,
}

impl<'a> Packet<'a> {
    pub fn decode(data: &'a [u8]) -> Result<Self, Error> {
        if data.len() < FIXED_HEADER_SIZE {
            return Err(Error::DataUnderflow);
        }

        let mut bytes = BytesIn::new(data);

        let op = bytes.byte()?;
        let reply = match op {
            OP_BOOTREQUEST => false,
            OP_BOOTREPLY => true,
            _ => return Err(Error::InvalidFormat),
        };

        let htype = bytes.byte()?;
        let hlen = bytes.byte()?;
        if hlen as usize > CHADDR_LEN {
            return Err(Error::InvalidHlen);
        }

        let hops = bytes.byte()?;
        let xid = u32::from_be_bytes(bytes.arr()?);
        let secs = u16::from_be_bytes(bytes.arr()?);
        let flags = u16::from_be_bytes(bytes.arr()?);
        let broadcast = flags & FLAG_BROADCAST != 0;

        let ciaddr = Ipv4Addr::from(bytes.arr::<4>()?);
        let yiaddr = Ipv4Addr::from(bytes.arr::<4>()?);
        let siaddr = Ipv4Addr::from(bytes.arr::<4>()?);
        let giaddr = Ipv4Addr::from(bytes.arr::<4>()?);
        let chaddr = bytes.arr::<CHADDR_LEN>()?;

        let sname: &'a [u8; SNAME_LEN] = bytes.slice(SNAME_LEN)?.try_into().unwrap();
        let file: &'a [u8; FILE_LEN] = bytes.slice(FILE_LEN)?.try_into().unwrap();

        let rest = bytes.remaining();
        let (cookie, main) = if rest.len() >= 4 {
            rest.split_at(4)
        } else {
            return Err(Error::MissingCookie);
        };
        if cookie != MAGIC_COOKIE {
            return Err(Error::MissingCookie);
        }

        let (options, _overload) = Options::decode(main, file, sname)?;

        Ok(Self {
            reply,
            htype,
            hlen,
            hops,
            xid,
            secs,
            broadcast,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            options,
        })
    }

    /// Encodes the message, appending the END marker and padding with zero octets up to
    /// [`MIN_MESSAGE_SIZE`]. Returns the encoded slice, which may be longer than the minimum
    /// if the options area doesn't fit in it.
    pub fn encode<'o>(&self, buf: &'o mut [u8]) -> Result<&'o [u8], Error> {
        let mut out = BytesOut::new(buf);

        out.byte(if self.reply { OP_BOOTREPLY } else { OP_BOOTREQUEST })?;
        out.byte(self.htype)?;
        out.byte(self.hlen)?;
        out.byte(self.hops)?;
        out.push(&self.xid.to_be_bytes())?;
        out.push(&self.secs.to_be_bytes())?;

        let flags = if self.broadcast { FLAG_BROADCAST } else { 0 };
        out.push(&flags.to_be_bytes())?;

        out.push(&self.ciaddr.octets())?;
        out.push(&self.yiaddr.octets())?;
        out.push(&self.siaddr.octets())?;
        out.push(&self.giaddr.octets())?;
        out.push(&self.chaddr)?;
        out.push(self.sname)?;
        out.push(self.file)?;
        out.push(&MAGIC_COOKIE)?;

        self.options.encode(&mut out)?;
        out.byte(crate::options::CODE_END)?;

        while out.len() < MIN_MESSAGE_SIZE {
            out.byte(0)?;
        }

        let len = out.len();
        Ok(&buf[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DhcpOption;

    fn roundtrip<'a>(packet: &Packet<'_>, buf: &'a mut [u8]) -> Packet<'a> {
        let encoded = packet.encode(buf).unwrap();
        Packet::decode(encoded).unwrap()
    }

    #[test]
    fn encodes_minimum_size() {
        let sname = [0u8; SNAME_LEN];
        let file = [0u8; FILE_LEN];
        let packet = Packet {
            reply: false,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 0xdeadbeef,
            secs: 0,
            broadcast: true,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0xaa; CHADDR_LEN],
            sname: &sname,
            file: &file,
            options: Options::new(&[DhcpOption::MessageType(MessageType::Discover)]),
        };

        let mut buf = [0u8; 400];
        let encoded = packet.encode(&mut buf).unwrap();
        assert_eq!(encoded.len(), MIN_MESSAGE_SIZE);

        let decoded = Packet::decode(encoded).unwrap();
        assert_eq!(decoded.xid, 0xdeadbeef);
        assert!(decoded.broadcast);
        assert_eq!(
            decoded.options.find_map(|o| match o {
                DhcpOption::MessageType(mt) => Some(mt),
                _ => None,
            }),
            Some(MessageType::Discover)
        );
    }

    #[test]
    fn rejects_missing_cookie() {
        let data = [0u8; FIXED_HEADER_SIZE];
        assert!(matches!(Packet::decode(&data), Err(Error::MissingCookie)));
    }

    #[test]
    fn rejects_oversized_hlen() {
        let mut data = [0u8; FIXED_HEADER_SIZE + 4];
        data[0] = OP_BOOTREQUEST;
        data[2] = 32;
        data[FIXED_HEADER_SIZE..].copy_from_slice(&MAGIC_COOKIE);
        assert!(matches!(Packet::decode(&data), Err(Error::InvalidHlen)));
    }

    #[test]
    fn options_overload_roundtrip() {
        let mut file = [0u8; FILE_LEN];
        file[0] = crate::options::CODE_HOST_NAME;
        file[1] = 4;
        file[2..6].copy_from_slice(b"host");
        file[6] = crate::options::CODE_END;

        let sname = [0u8; SNAME_LEN];
        let packet = Packet {
            reply: true,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 1,
            secs: 0,
            broadcast: false,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::new(192, 0, 2, 10),
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; CHADDR_LEN],
            sname: &sname,
            file: &file,
            options: Options::new(&[
                DhcpOption::MessageType(MessageType::Offer),
                DhcpOption::Overload(1),
            ]),
        };

        let mut buf = [0u8; 400];
        let decoded = roundtrip(&packet, &mut buf);

        assert_eq!(
            decoded.options.find_map(|o| match o {
                DhcpOption::HostName(name) => Some(name),
                _ => None,
            }),
            Some("host")
        );
    }

    #[test]
    fn options_overload_file_wins_on_conflicting_code() {
        let mut file = [0u8; FILE_LEN];
        file[0] = crate::options::CODE_HOST_NAME;
        file[1] = 4;
        file[2..6].copy_from_slice(b"file");
        file[6] = crate::options::CODE_END;

        let sname = [0u8; SNAME_LEN];
        let packet = Packet {
            reply: true,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 1,
            secs: 0,
            broadcast: false,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::new(192, 0, 2, 10),
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; CHADDR_LEN],
            sname: &sname,
            file: &file,
            options: Options::new(&[
                DhcpOption::MessageType(MessageType::Offer),
                DhcpOption::HostName("main"),
                DhcpOption::Overload(1),
            ]),
        };

        let mut buf = [0u8; 400];
        let decoded = roundtrip(&packet, &mut buf);

        // `main` and `file` both carry a HostName; the overload contract has `file`
        // parsed after `main`, overwriting it, so `file`'s value must win.
        assert_eq!(
            decoded.options.find_map(|o| match o {
                DhcpOption::HostName(name) => Some(name),
                _ => None,
            }),
            Some("file")
        );
    }
}
