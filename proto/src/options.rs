//! DHCP option TLV codec (RFC 2132 and friends).
//!
//! Options are walked lazily off a borrowed byte slice rather than collected eagerly, so a
//! caller that wants one option out of a 300-octet packet doesn't pay to materialize the
//! other twenty.

use dhcp4c_raw::bytes::{BytesIn, BytesOut};
use num_enum::TryFromPrimitive;

use crate::message::MessageType;
use crate::Error;

pub const CODE_PAD: u8 = 0;
pub const CODE_SUBNET_MASK: u8 = 1;
pub const CODE_ROUTER: u8 = 3;
pub const CODE_DNS: u8 = 6;
pub const CODE_HOST_NAME: u8 = 12;
pub const CODE_DOMAIN_NAME: u8 = 15;
pub const CODE_BROADCAST_ADDRESS: u8 = 28;
pub const CODE_STATIC_ROUTE: u8 = 33;
pub const CODE_REQUESTED_IP_ADDRESS: u8 = 50;
pub const CODE_IP_ADDRESS_LEASE_TIME: u8 = 51;
pub const CODE_OVERLOAD: u8 = 52;
pub const CODE_MESSAGE_TYPE: u8 = 53;
pub const CODE_SERVER_IDENTIFIER: u8 = 54;
pub const CODE_PARAMETER_REQUEST_LIST: u8 = 55;
pub const CODE_MESSAGE: u8 = 56;
pub const CODE_MAX_MESSAGE_SIZE: u8 = 57;
pub const CODE_RENEWAL_TIME: u8 = 58;
pub const CODE_REBINDING_TIME: u8 = 59;
pub const CODE_VENDOR_CLASS_ID: u8 = 60;
pub const CODE_CLIENT_IDENTIFIER: u8 = 61;
pub const CODE_DOMAIN_SEARCH: u8 = 119;
pub const CODE_CLASSLESS_STATIC_ROUTE: u8 = 121;
pub const CODE_FQDN: u8 = 81;
pub const CODE_USER_CLASS: u8 = 77;
pub const CODE_MS_CLASSLESS_STATIC_ROUTE: u8 = 249;
pub const CODE_END: u8 = 255;

/// A single decoded option. Address lists, the classless-route blobs and the user-class
/// blob stay as raw byte slices: [`crate::route::Route`] and [`UserClasses`] know how to
/// walk them, and most callers only want one or two options out of the set anyway.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DhcpOption<'a> {
    SubnetMask(core::net::Ipv4Addr),
    Router(Ipv4Addrs<'a>),
    DomainNameServer(Ipv4Addrs<'a>),
    HostName(&'a str),
    DomainName(&'a str),
    BroadcastAddress(core::net::Ipv4Addr),
    StaticRoute(&'a [u8]),
    RequestedIpAddress(core::net::Ipv4Addr),
    IpAddressLeaseTime(u32),
    Overload(u8),
    MessageType(MessageType),
    ServerIdentifier(core::net::Ipv4Addr),
    ParameterRequestList(&'a [u8]),
    Message(&'a str),
    MaxMessageSize(u16),
    RenewalTime(u32),
    RebindingTime(u32),
    VendorClassId(&'a [u8]),
    ClientIdentifier(&'a [u8]),
    UserClass(UserClasses<'a>),
    Fqdn { flags: u8, name: &'a [u8] },
    DomainSearch(&'a [u8]),
    ClasslessStaticRoute(&'a [u8]),
    MsClasslessStaticRoute(&'a [u8]),
    Unrecognized(u8, &'a [u8]),
}

impl<'a> DhcpOption<'a> {
    pub const fn code(&self) -> u8 {
        match self {
            Self::SubnetMask(_) => CODE_SUBNET_MASK,
            Self::Router(_) => CODE_ROUTER,
            Self::DomainNameServer(_) => CODE_DNS,
            Self::HostName(_) => CODE_HOST_NAME,
            Self::DomainName(_) => CODE_DOMAIN_NAME,
            Self::BroadcastAddress(_) => CODE_BROADCAST_ADDRESS,
            Self::StaticRoute(_) => CODE_STATIC_ROUTE,
            Self::RequestedIpAddress(_) => CODE_REQUESTED_IP_ADDRESS,
            Self::IpAddressLeaseTime(_) => CODE_IP_ADDRESS_LEASE_TIME,
            Self::Overload(_) => CODE_OVERLOAD,
            Self::MessageType(_) => CODE_MESSAGE_TYPE,
            Self::ServerIdentifier(_) => CODE_SERVER_IDENTIFIER,
            Self::ParameterRequestList(_) => CODE_PARAMETER_REQUEST_LIST,
            Self::Message(_) => CODE_MESSAGE,
            Self::MaxMessageSize(_) => CODE_MAX_MESSAGE_SIZE,
            Self::RenewalTime(_) => CODE_RENEWAL_TIME,
            Self::RebindingTime(_) => CODE_REBINDING_TIME,
            Self::VendorClassId(_) => CODE_VENDOR_CLASS_ID,
            Self::ClientIdentifier(_) => CODE_CLIENT_IDENTIFIER,
            Self::UserClass(_) => CODE_USER_CLASS,
            Self::Fqdn { .. } => CODE_FQDN,
            Self::DomainSearch(_) => CODE_DOMAIN_SEARCH,
            Self::ClasslessStaticRoute(_) => CODE_CLASSLESS_STATIC_ROUTE,
            Self::MsClasslessStaticRoute(_) => CODE_MS_CLASSLESS_STATIC_ROUTE,
            Self::Unrecognized(code, _) => *code,
        }
    }

    fn decode(bytes: &mut BytesIn<'a>) -> Result<Option<DhcpOption<'a>>, Error> {
        let code = bytes.byte()?;
        if code == CODE_END {
            return Ok(None);
        }

        if code == CODE_PAD {
            return Self::decode(bytes);
        }

        let len = bytes.byte()? as usize;
        let data = bytes.slice(len)?;
        let mut inner = BytesIn::new(data);

        let option = match code {
            CODE_SUBNET_MASK => DhcpOption::SubnetMask(addr(&mut inner)?),
            CODE_ROUTER => DhcpOption::Router(Ipv4Addrs::checked(data)?),
            CODE_DNS => DhcpOption::DomainNameServer(Ipv4Addrs::checked(data)?),
            CODE_HOST_NAME => DhcpOption::HostName(core::str::from_utf8(data)?),
            CODE_DOMAIN_NAME => DhcpOption::DomainName(core::str::from_utf8(data)?),
            CODE_BROADCAST_ADDRESS => DhcpOption::BroadcastAddress(addr(&mut inner)?),
            CODE_STATIC_ROUTE => {
                if data.len() % 8 != 0 {
                    return Err(Error::InvalidFormat);
                }
                DhcpOption::StaticRoute(data)
            }
            CODE_REQUESTED_IP_ADDRESS => DhcpOption::RequestedIpAddress(addr(&mut inner)?),
            CODE_IP_ADDRESS_LEASE_TIME => DhcpOption::IpAddressLeaseTime(read_u32(&mut inner)?),
            CODE_OVERLOAD => DhcpOption::Overload(inner.byte()?),
            CODE_MESSAGE_TYPE => DhcpOption::MessageType(
                MessageType::try_from_primitive(inner.byte()?)
                    .map_err(|_| Error::InvalidMessageType)?,
            ),
            CODE_SERVER_IDENTIFIER => DhcpOption::ServerIdentifier(addr(&mut inner)?),
            CODE_PARAMETER_REQUEST_LIST => DhcpOption::ParameterRequestList(data),
            CODE_MESSAGE => DhcpOption::Message(core::str::from_utf8(data)?),
            CODE_MAX_MESSAGE_SIZE => DhcpOption::MaxMessageSize(read_u16(&mut inner)?),
            CODE_RENEWAL_TIME => DhcpOption::RenewalTime(read_u32(&mut inner)?),
            CODE_REBINDING_TIME => DhcpOption::RebindingTime(read_u32(&mut inner)?),
            CODE_VENDOR_CLASS_ID => DhcpOption::VendorClassId(data),
            CODE_CLIENT_IDENTIFIER => DhcpOption::ClientIdentifier(data),
            CODE_USER_CLASS => DhcpOption::UserClass(UserClasses::checked(data)?),
            CODE_FQDN => {
                if data.len() < 3 {
                    return Err(Error::InvalidFormat);
                }
                DhcpOption::Fqdn {
                    flags: data[0],
                    name: &data[3..],
                }
            }
            CODE_DOMAIN_SEARCH => DhcpOption::DomainSearch(data),
            CODE_CLASSLESS_STATIC_ROUTE => DhcpOption::ClasslessStaticRoute(data),
            CODE_MS_CLASSLESS_STATIC_ROUTE => DhcpOption::MsClasslessStaticRoute(data),
            _ => DhcpOption::Unrecognized(code, data),
        };

        Ok(Some(option))
    }

    fn encode(&self, out: &mut BytesOut) -> Result<(), Error> {
        out.byte(self.code())?;

        let len_pos = out.len();
        out.byte(0)?;

        let start = out.len();

        match *self {
            Self::SubnetMask(a) | Self::BroadcastAddress(a) | Self::RequestedIpAddress(a) | Self::ServerIdentifier(a) => {
                out.push(&a.octets())?;
            }
            Self::Router(addrs) | Self::DomainNameServer(addrs) => {
                for a in addrs.iter() {
                    out.push(&a.octets())?;
                }
            }
            Self::HostName(s) | Self::DomainName(s) | Self::Message(s) => {
                out.push(s.as_bytes())?;
            }
            Self::StaticRoute(bytes)
            | Self::ParameterRequestList(bytes)
            | Self::VendorClassId(bytes)
            | Self::ClientIdentifier(bytes)
            | Self::DomainSearch(bytes)
            | Self::ClasslessStaticRoute(bytes)
            | Self::MsClasslessStaticRoute(bytes)
            | Self::Unrecognized(_, bytes) => {
                out.push(bytes)?;
            }
            Self::IpAddressLeaseTime(v) | Self::RenewalTime(v) | Self::RebindingTime(v) => {
                out.push(&v.to_be_bytes())?;
            }
            Self::Overload(v) => {
                out.byte(v)?;
            }
            Self::MessageType(mt) => {
                out.byte(mt as u8)?;
            }
            Self::MaxMessageSize(v) => {
                out.push(&v.to_be_bytes())?;
            }
            Self::UserClass(classes) => {
                out.push(classes.0)?;
            }
            Self::Fqdn { flags, name } => {
                out.byte(flags)?.byte(0)?.byte(0)?.push(name)?;
            }
        }

        let written = out.len() - start;
        if written > u8::MAX as usize {
            return Err(Error::BufferOverflow);
        }

        out.overwrite_byte(len_pos, written as u8);

        Ok(())
    }
}

fn addr(bytes: &mut BytesIn<'_>) -> Result<core::net::Ipv4Addr, Error> {
    Ok(read_u32(bytes)?.into())
}

fn read_u32(bytes: &mut BytesIn<'_>) -> Result<u32, Error> {
    Ok(u32::from_be_bytes(bytes.arr()?))
}

fn read_u16(bytes: &mut BytesIn<'_>) -> Result<u16, Error> {
    Ok(u16::from_be_bytes(bytes.arr()?))
}

/// A borrowed, comma-free list of IPv4 addresses packed 4 bytes apiece (options 3, 6, ...).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Ipv4Addrs<'a>(&'a [u8]);

impl<'a> Ipv4Addrs<'a> {
    pub const fn empty() -> Self {
        Self(&[])
    }

    fn checked(data: &'a [u8]) -> Result<Self, Error> {
        if data.len() % 4 != 0 {
            return Err(Error::InvalidFormat);
        }

        Ok(Self(data))
    }

    pub fn iter(&self) -> impl Iterator<Item = core::net::Ipv4Addr> + 'a {
        let data = self.0;

        (0..data.len()).step_by(4).map(move |off| {
            let octets: [u8; 4] = data[off..off + 4].try_into().unwrap();
            octets.into()
        })
    }
}

/// RFC 3004 user classes: each is a one-byte length prefix followed by that many opaque
/// bytes, possibly several back to back in one option.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct UserClasses<'a>(&'a [u8]);

impl<'a> UserClasses<'a> {
    fn checked(data: &'a [u8]) -> Result<Self, Error> {
        let mut pos = 0;
        while pos < data.len() {
            let len = data[pos] as usize;
            if len == 0 || pos + 1 + len > data.len() {
                return Err(Error::InvalidFormat);
            }
            pos += 1 + len;
        }

        Ok(Self(data))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> {
        let mut data = self.0;

        core::iter::from_fn(move || {
            if data.is_empty() {
                return None;
            }

            let len = data[0] as usize;
            let (class, rest) = data[1..].split_at(len);
            data = rest;

            Some(class)
        })
    }
}

/// A view over the options area of a packet. Constructed either over a raw byte slice
/// (decoding) or an explicit array of options (encoding a packet we are building).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Options<'a>(Inner<'a>);

#[derive(Clone, PartialEq, Eq, Debug)]
enum Inner<'a> {
    Overlay {
        main: &'a [u8],
        file: Option<&'a [u8]>,
        sname: Option<&'a [u8]>,
    },
    Values(&'a [DhcpOption<'a>]),
}

impl<'a> Options<'a> {
    pub const fn new(options: &'a [DhcpOption<'a>]) -> Self {
        Self(Inner::Values(options))
    }

    /// Decodes the main options area, following any OPTION_OVERLOAD into `file`/`sname`.
    ///
    /// Per the overload contract each of `file` and `sname` is parsed at most once, and
    /// only after the main area, in that order; neither may itself carry another overload.
    pub(crate) fn decode(
        main: &'a [u8],
        file: &'a [u8; 128],
        sname: &'a [u8; 64],
    ) -> Result<(Self, u8), Error> {
        let overload = Self::scan(main, None)?;

        let file = if overload & 0b01 != 0 {
            Self::scan(file, Some(CODE_OVERLOAD))?;
            Some(file.as_slice())
        } else {
            None
        };

        let sname = if overload & 0b10 != 0 {
            Self::scan(sname, Some(CODE_OVERLOAD))?;
            Some(sname.as_slice())
        } else {
            None
        };

        Ok((Self(Inner::Overlay { main, file, sname }), overload))
    }

    /// Validates an options region decodes cleanly, optionally rejecting a code (used to
    /// forbid a nested OPTION_OVERLOAD inside an overloaded `file`/`sname` region).
    fn scan(data: &'a [u8], forbid: Option<u8>) -> Result<u8, Error> {
        let mut bytes = BytesIn::new(data);
        let mut overload = 0;

        while let Some(option) = DhcpOption::decode(&mut bytes)? {
            if Some(option.code()) == forbid {
                return Err(Error::InvalidFormat);
            }

            if let DhcpOption::Overload(v) = option {
                overload = v;
            }
        }

        Ok(overload)
    }

    pub fn iter(&self) -> impl Iterator<Item = DhcpOption<'a>> + 'a {
        match self.0 {
            Inner::Overlay { main, file, sname } => Either::Left(
                ByteOptions(BytesIn::new(main))
                    .chain(file.into_iter().flat_map(|d| ByteOptions(BytesIn::new(d))))
                    .chain(sname.into_iter().flat_map(|d| ByteOptions(BytesIn::new(d)))),
            ),
            Inner::Values(data) => Either::Right(data.iter().copied()),
        }
    }

    /// The overload contract has `file` and `sname` parsed after `main`, each overwriting
    /// any value the earlier region set for the same code — so on a conflict the *last*
    /// match along `main, file, sname` wins, not the first.
    pub fn find_map<R>(&self, f: impl Fn(DhcpOption<'a>) -> Option<R> + 'a) -> Option<R> {
        self.iter().filter_map(f).last()
    }

    pub(crate) fn encode(&self, out: &mut BytesOut) -> Result<(), Error> {
        for option in self.iter() {
            option.encode(out)?;
        }

        Ok(())
    }
}

struct ByteOptions<'a>(BytesIn<'a>);

impl<'a> Iterator for ByteOptions<'a> {
    type Item = DhcpOption<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            None
        } else {
            DhcpOption::decode(&mut self.0).ok().flatten()
        }
    }
}

enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Iterator for Either<L, R>
where
    L: Iterator,
    R: Iterator<Item = L::Item>,
{
    type Item = L::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Left(it) => it.next(),
            Self::Right(it) => it.next(),
        }
    }
}
