//! Ethernet II framing.
//!
//! A DHCP client has to speak to the network before it owns an IP address, so every
//! frame it sends or receives is wrapped (or unwrapped) at the link layer by hand here,
//! the same way [`crate::ip`] hand-frames IPv4.

use super::bytes::{BytesIn, BytesOut};
use super::Error;

pub type MacAddr = [u8; 6];

pub const BROADCAST: MacAddr = [0xff; 6];

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// A decoded Ethernet II header, with the payload slice borrowed from the input.
#[derive(Clone, Debug)]
pub struct EthHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
}

impl EthHeader {
    pub const SIZE: usize = 14;

    pub fn decode(data: &[u8]) -> Result<(Self, &[u8]), Error> {
        let mut bytes = BytesIn::new(data);

        let hdr = Self {
            dst: bytes.arr()?,
            src: bytes.arr()?,
            ethertype: u16::from_be_bytes(bytes.arr()?),
        };

        Ok((hdr, bytes.remaining()))
    }

    /// Encodes the header followed by whatever `encoder` writes, returning the full frame.
    pub fn encode_with_payload<'o, F>(
        dst: MacAddr,
        src: MacAddr,
        ethertype: u16,
        buf: &'o mut [u8],
        encoder: F,
    ) -> Result<&'o [u8], Error>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, Error>,
    {
        if buf.len() < Self::SIZE {
            Err(Error::BufferOverflow)?;
        }

        let (hdr_buf, payload_buf) = buf.split_at_mut(Self::SIZE);

        let mut out = BytesOut::new(hdr_buf);
        out.push(&dst)?.push(&src)?.push(&u16::to_be_bytes(ethertype))?;

        let payload_len = encoder(payload_buf)?;

        Ok(&buf[..Self::SIZE + payload_len])
    }
}
