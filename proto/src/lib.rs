#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::too_many_arguments)]

//! BOOTP/DHCP message codec (RFC 2131/2132) plus the data derived from a message: routes,
//! leases, client identifiers and the option request list.
//!
//! Kept free of any socket or clock dependency, the same way [`dhcp4c_raw`] stays free of
//! DHCP semantics — this crate only ever sees byte slices in, byte slices out.

pub mod dns;
pub mod duid;
pub mod lease;
pub mod mask;
pub mod message;
pub mod options;
pub mod printable;
pub mod route;

pub use duid::{ClientId, Duid};
pub use lease::Lease;
pub use mask::{OptionMask, RequestList};
pub use message::{MessageType, Packet};
pub use options::{DhcpOption, Options};
pub use route::Route;

use dhcp4c_raw::bytes;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    DataUnderflow,
    BufferOverflow,
    InvalidFormat,
    InvalidUtf8,
    InvalidMessageType,
    InvalidHlen,
    MissingCookie,
    TooManyOptions,
    TooManyRoutes,
}

impl From<bytes::Error> for Error {
    fn from(value: bytes::Error) -> Self {
        match value {
            bytes::Error::BufferOverflow => Self::BufferOverflow,
            bytes::Error::DataUnderflow => Self::DataUnderflow,
            bytes::Error::InvalidFormat => Self::InvalidFormat,
        }
    }
}

impl From<core::str::Utf8Error> for Error {
    fn from(_: core::str::Utf8Error) -> Self {
        Self::InvalidUtf8
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let str = match self {
            Self::DataUnderflow => "data underflow",
            Self::BufferOverflow => "buffer overflow",
            Self::InvalidFormat => "invalid format",
            Self::InvalidUtf8 => "invalid utf8 string option",
            Self::InvalidMessageType => "invalid or missing message type",
            Self::InvalidHlen => "unsupported hardware address length",
            Self::MissingCookie => "missing BOOTP magic cookie",
            Self::TooManyOptions => "too many options for a packet of this size",
            Self::TooManyRoutes => "too many routes for the fixed-capacity route table",
        };

        write!(f, "{}", str)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
