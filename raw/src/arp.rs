//! ARP (RFC 826) request/reply framing for Ethernet + IPv4, used by the duplicate-address
//! detector to probe and announce an address before it is committed.

use core::net::Ipv4Addr;

use super::bytes::{BytesIn, BytesOut};
use super::eth::MacAddr;
use super::Error;

const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;
const HLEN: u8 = 6;
const PLEN: u8 = 4;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArpOp {
    Request,
    Reply,
}

impl ArpOp {
    fn code(self) -> u16 {
        match self {
            Self::Request => 1,
            Self::Reply => 2,
        }
    }

    fn from_code(code: u16) -> Result<Self, Error> {
        match code {
            1 => Ok(Self::Request),
            2 => Ok(Self::Reply),
            _ => Err(Error::InvalidFormat),
        }
    }
}

/// A parsed ARP packet. Only Ethernet/IPv4 combinations are recognized; anything else
/// decodes to `Error::InvalidFormat` so the caller can silently ignore it.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ArpPacket {
    pub op: ArpOp,
    pub sha: MacAddr,
    pub spa: Ipv4Addr,
    pub tha: MacAddr,
    pub tpa: Ipv4Addr,
}

impl ArpPacket {
    pub const SIZE: usize = 28;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let mut bytes = BytesIn::new(data);

        let htype = u16::from_be_bytes(bytes.arr()?);
        let ptype = u16::from_be_bytes(bytes.arr()?);
        let hlen = bytes.byte()?;
        let plen = bytes.byte()?;
        let op = ArpOp::from_code(u16::from_be_bytes(bytes.arr()?))?;

        if htype != HTYPE_ETHERNET || ptype != PTYPE_IPV4 || hlen != HLEN || plen != PLEN {
            Err(Error::InvalidFormat)?;
        }

        Ok(Self {
            op,
            sha: bytes.arr()?,
            spa: u32::from_be_bytes(bytes.arr()?).into(),
            tha: bytes.arr()?,
            tpa: u32::from_be_bytes(bytes.arr()?).into(),
        })
    }

    pub fn encode<'o>(&self, buf: &'o mut [u8]) -> Result<&'o [u8], Error> {
        let mut bytes = BytesOut::new(buf);

        bytes
            .push(&u16::to_be_bytes(HTYPE_ETHERNET))?
            .push(&u16::to_be_bytes(PTYPE_IPV4))?
            .byte(HLEN)?
            .byte(PLEN)?
            .push(&u16::to_be_bytes(self.op.code()))?
            .push(&self.sha)?
            .push(&u32::to_be_bytes(self.spa.into()))?
            .push(&self.tha)?
            .push(&u32::to_be_bytes(self.tpa.into()))?;

        let len = bytes.len();

        Ok(&buf[..len])
    }

    /// Builds a gratuitous/probe ARP request: "who has `target`? tell `sha`/`spa`".
    pub fn probe(sha: MacAddr, spa: Ipv4Addr, target: Ipv4Addr) -> Self {
        Self {
            op: ArpOp::Request,
            sha,
            spa,
            tha: [0; 6],
            tpa: target,
        }
    }

    /// Builds a gratuitous ARP announcement: spa == tpa == the address being claimed.
    pub fn announce(sha: MacAddr, claimed: Ipv4Addr) -> Self {
        Self {
            op: ArpOp::Request,
            sha,
            spa: claimed,
            tha: [0; 6],
            tpa: claimed,
        }
    }
}
