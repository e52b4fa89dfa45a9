//! Option bitmaps: which options to request, which must be present in a lease to accept it,
//! and which to suppress even if requested — plus turning a request mask into the
//! parameter-request-list bytes sent on the wire.

use crate::options::{
    CODE_BROADCAST_ADDRESS, CODE_CLASSLESS_STATIC_ROUTE, CODE_DNS, CODE_DOMAIN_NAME,
    CODE_DOMAIN_SEARCH, CODE_FQDN, CODE_HOST_NAME, CODE_IP_ADDRESS_LEASE_TIME,
    CODE_MS_CLASSLESS_STATIC_ROUTE, CODE_REBINDING_TIME, CODE_RENEWAL_TIME, CODE_ROUTER,
    CODE_STATIC_ROUTE, CODE_SUBNET_MASK, CODE_USER_CLASS, CODE_VENDOR_CLASS_ID,
};
use crate::Error;

/// A 256-bit set of option codes, one bit per code.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct OptionMask([u64; 4]);

impl OptionMask {
    pub const fn empty() -> Self {
        Self([0; 4])
    }

    pub fn set(&mut self, code: u8) {
        let (word, bit) = Self::locate(code);
        self.0[word] |= 1 << bit;
    }

    pub fn clear(&mut self, code: u8) {
        let (word, bit) = Self::locate(code);
        self.0[word] &= !(1 << bit);
    }

    pub fn contains(&self, code: u8) -> bool {
        let (word, bit) = Self::locate(code);
        self.0[word] & (1 << bit) != 0
    }

    /// All codes set in `self` but not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let mut words = [0u64; 4];
        for i in 0..4 {
            words[i] = self.0[i] & !other.0[i];
        }
        Self(words)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0u16..=255).map(|c| c as u8).filter(move |&c| self.contains(c))
    }

    const fn locate(code: u8) -> (usize, u32) {
        (code as usize / 64, (code % 64) as u32)
    }
}

/// Codes that should sort early in a parameter-request-list, in priority order: a server
/// that truncates the list for space should still see the classless routing options before
/// the legacy ones (RFC 3442 section 5 advises sending both so older servers still answer).
const PRIORITY: &[u8] = &[
    CODE_SUBNET_MASK,
    CODE_CLASSLESS_STATIC_ROUTE,
    CODE_MS_CLASSLESS_STATIC_ROUTE,
    CODE_ROUTER,
    CODE_STATIC_ROUTE,
    CODE_DNS,
    CODE_DOMAIN_NAME,
    CODE_DOMAIN_SEARCH,
    CODE_HOST_NAME,
    CODE_BROADCAST_ADDRESS,
    CODE_IP_ADDRESS_LEASE_TIME,
    CODE_RENEWAL_TIME,
    CODE_REBINDING_TIME,
];

pub const MAX_REQUEST_LIST: usize = 32;

pub type RequestList = heapless::Vec<u8, MAX_REQUEST_LIST>;

/// Builds the wire parameter-request-list: `request` minus `suppress`, ordered per
/// [`PRIORITY`] and then ascending for anything left over.
pub fn request_list(request: &OptionMask, suppress: &OptionMask) -> RequestList {
    let wanted = request.difference(suppress);
    let mut list = RequestList::new();

    for &code in PRIORITY {
        if wanted.contains(code) && list.push(code).is_err() {
            return list;
        }
    }

    for code in wanted.iter() {
        if PRIORITY.contains(&code) {
            continue;
        }
        if list.push(code).is_err() {
            break;
        }
    }

    list
}

const NAMES: &[(&str, u8)] = &[
    ("subnet_mask", CODE_SUBNET_MASK),
    ("routers", CODE_ROUTER),
    ("domain_name_servers", CODE_DNS),
    ("host_name", CODE_HOST_NAME),
    ("domain_name", CODE_DOMAIN_NAME),
    ("broadcast_address", CODE_BROADCAST_ADDRESS),
    ("static_routes", CODE_STATIC_ROUTE),
    ("classless_static_routes", CODE_CLASSLESS_STATIC_ROUTE),
    ("ms_classless_static_routes", CODE_MS_CLASSLESS_STATIC_ROUTE),
    ("domain_search", CODE_DOMAIN_SEARCH),
    ("dhcp_lease_time", CODE_IP_ADDRESS_LEASE_TIME),
    ("dhcp_renewal_time", CODE_RENEWAL_TIME),
    ("dhcp_rebinding_time", CODE_REBINDING_TIME),
    ("vendor_class_identifier", CODE_VENDOR_CLASS_ID),
    ("user_class", CODE_USER_CLASS),
    ("fqdn", CODE_FQDN),
];

/// Parses a comma/space-separated list of option names or numeric codes (e.g.
/// `"subnet_mask,routers,121"`) and sets each in `mask`.
pub fn make_option_mask(spec: &str, mask: &mut OptionMask) -> Result<(), Error> {
    for token in spec.split([',', ' ']).filter(|t| !t.is_empty()) {
        if let Ok(code) = token.parse::<u8>() {
            mask.set(code);
            continue;
        }

        let code = NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, code)| *code)
            .ok_or(Error::InvalidFormat)?;

        mask.set(code);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_names_and_codes() {
        let mut mask = OptionMask::empty();
        make_option_mask("subnet_mask,routers, 119", &mut mask).unwrap();

        assert!(mask.contains(CODE_SUBNET_MASK));
        assert!(mask.contains(CODE_ROUTER));
        assert!(mask.contains(CODE_DOMAIN_SEARCH));
        assert!(!mask.contains(CODE_HOST_NAME));
    }

    #[test]
    fn rejects_unknown_name() {
        let mut mask = OptionMask::empty();
        assert!(matches!(
            make_option_mask("not_a_real_option", &mut mask),
            Err(Error::InvalidFormat)
        ));
    }

    #[test]
    fn request_list_orders_csr_before_router() {
        let mut request = OptionMask::empty();
        request.set(CODE_ROUTER);
        request.set(CODE_CLASSLESS_STATIC_ROUTE);
        request.set(CODE_HOST_NAME);

        let list = request_list(&request, &OptionMask::empty());
        let csr_pos = list.iter().position(|&c| c == CODE_CLASSLESS_STATIC_ROUTE).unwrap();
        let router_pos = list.iter().position(|&c| c == CODE_ROUTER).unwrap();
        assert!(csr_pos < router_pos);
    }

    #[test]
    fn suppress_removes_from_request() {
        let mut request = OptionMask::empty();
        request.set(CODE_ROUTER);
        request.set(CODE_HOST_NAME);

        let mut suppress = OptionMask::empty();
        suppress.set(CODE_HOST_NAME);

        let list = request_list(&request, &suppress);
        assert!(list.contains(&CODE_ROUTER));
        assert!(!list.contains(&CODE_HOST_NAME));
    }
}
