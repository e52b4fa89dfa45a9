//! Client identification: a DUID-LLT (RFC 8415 section 11.2) wrapped in an RFC 4361
//! client-identifier option, or the legacy `htype || chaddr` identifier when no DUID is
//! configured.

use crate::Error;

const DUID_LLT: u16 = 1;

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z, the DUID time base.
const DUID_EPOCH: u64 = 946_684_800;

/// A DUID-LLT: link-layer type plus hardware address, timestamped at first generation so it
/// stays stable across address changes on the same interface.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Duid {
    pub hwtype: u16,
    pub time: u32,
    pub hwaddr: [u8; 6],
}

impl Duid {
    /// `now_unix` is the current time; the DUID is generated once and should be persisted
    /// (see the DUID file in the running daemon) rather than rebuilt on every start.
    pub fn generate(hwtype: u16, hwaddr: [u8; 6], now_unix: u64) -> Self {
        let time = now_unix.saturating_sub(DUID_EPOCH) as u32;
        Self {
            hwtype,
            time,
            hwaddr,
        }
    }

    pub const ENCODED_LEN: usize = 12;

    pub fn encode(&self, out: &mut [u8; Self::ENCODED_LEN]) {
        out[0..2].copy_from_slice(&DUID_LLT.to_be_bytes());
        out[2..4].copy_from_slice(&self.hwtype.to_be_bytes());
        out[4..8].copy_from_slice(&self.time.to_be_bytes());
        out[8..12].copy_from_slice(&self.hwaddr);
    }

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() != Self::ENCODED_LEN {
            return Err(Error::InvalidFormat);
        }

        let kind = u16::from_be_bytes([data[0], data[1]]);
        if kind != DUID_LLT {
            return Err(Error::InvalidFormat);
        }

        let hwtype = u16::from_be_bytes([data[2], data[3]]);
        let time = u32::from_be_bytes(data[4..8].try_into().unwrap());
        let hwaddr = data[8..12].try_into().unwrap();

        Ok(Self {
            hwtype,
            time,
            hwaddr,
        })
    }
}

/// RFC 4361 client-identifier: `0xff || IAID || DUID`, or, when no DUID is configured, the
/// legacy `htype || chaddr` form most DHCP servers still understand.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ClientId {
    Rfc4361 { iaid: u32, duid: Duid },
    Legacy { htype: u8, hwaddr: [u8; 6] },
}

impl ClientId {
    pub const MAX_ENCODED_LEN: usize = 1 + 4 + Duid::ENCODED_LEN;

    /// IAID derived from the interface index, the simplest stable choice when a single
    /// interface runs the client (RFC 8415 section 11.1 leaves the derivation to the client).
    pub fn iaid_from_index(ifindex: u32) -> u32 {
        ifindex
    }

    pub fn encode<'o>(&self, buf: &'o mut [u8; Self::MAX_ENCODED_LEN]) -> &'o [u8] {
        match *self {
            Self::Rfc4361 { iaid, duid } => {
                buf[0] = 0xff;
                buf[1..5].copy_from_slice(&iaid.to_be_bytes());
                let mut encoded = [0u8; Duid::ENCODED_LEN];
                duid.encode(&mut encoded);
                buf[5..5 + Duid::ENCODED_LEN].copy_from_slice(&encoded);
                &buf[..5 + Duid::ENCODED_LEN]
            }
            Self::Legacy { htype, hwaddr } => {
                buf[0] = htype;
                buf[1..7].copy_from_slice(&hwaddr);
                &buf[..7]
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() == 1 + 4 + Duid::ENCODED_LEN && data[0] == 0xff {
            let iaid = u32::from_be_bytes(data[1..5].try_into().unwrap());
            let duid = Duid::decode(&data[5..])?;
            return Ok(Self::Rfc4361 { iaid, duid });
        }

        if data.len() == 7 {
            let htype = data[0];
            let hwaddr = data[1..7].try_into().unwrap();
            return Ok(Self::Legacy { htype, hwaddr });
        }

        Err(Error::InvalidFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duid_roundtrip() {
        let duid = Duid::generate(1, [0x02, 0x00, 0x00, 0x00, 0x00, 0x01], DUID_EPOCH + 100);
        assert_eq!(duid.time, 100);

        let mut buf = [0u8; Duid::ENCODED_LEN];
        duid.encode(&mut buf);
        assert_eq!(Duid::decode(&buf).unwrap(), duid);
    }

    #[test]
    fn client_id_rfc4361_roundtrip() {
        let duid = Duid::generate(1, [0xaa; 6], DUID_EPOCH);
        let id = ClientId::Rfc4361 { iaid: 7, duid };

        let mut buf = [0u8; ClientId::MAX_ENCODED_LEN];
        let encoded = id.encode(&mut buf);
        assert_eq!(ClientId::decode(encoded).unwrap(), id);
    }

    #[test]
    fn client_id_legacy_roundtrip() {
        let id = ClientId::Legacy {
            htype: 1,
            hwaddr: [1, 2, 3, 4, 5, 6],
        };

        let mut buf = [0u8; ClientId::MAX_ENCODED_LEN];
        let encoded = id.encode(&mut buf);
        assert_eq!(ClientId::decode(encoded).unwrap(), id);
    }
}
