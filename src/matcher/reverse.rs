//! Reverse mapping from source addresses to canonical lookup names.

use std::fmt::Write;
use std::net::IpAddr;

use hickory_proto::rr::Name;

/// Canonical PTR-form name for an address.
///
/// IPv4 addresses map under `in-addr.arpa`, IPv6 addresses
/// nibble-reversed under `ip6.arpa`. Returns None when the generated
/// form fails to parse; callers treat that as a non-match.
pub fn ptr_name(addr: IpAddr) -> Option<Name> {
    let text = match addr {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa.", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut text = String::with_capacity(74);
            for byte in v6.octets().iter().rev() {
                write!(text, "{:x}.{:x}.", byte & 0xf, byte >> 4).ok()?;
            }
            text.push_str("ip6.arpa.");
            text
        }
    };
    Name::from_ascii(text).ok()
}

/// 6to4 prefix name for an address, under `2.0.0.2.ip6.arpa`.
///
/// Only IPv4 and IPv4-mapped IPv6 addresses have a 6to4 form: the /48
/// prefix `2002:aabb:ccdd::/48` derived from `a.b.c.d` reverses to
/// eight nibbles below `2.0.0.2.ip6.arpa`.
pub fn six_to_four_name(addr: IpAddr) -> Option<Name> {
    let v4 = match addr {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
    };
    let mut text = String::with_capacity(34);
    for byte in v4.octets().iter().rev() {
        write!(text, "{:x}.{:x}.", byte & 0xf, byte >> 4).ok()?;
    }
    text.push_str("2.0.0.2.ip6.arpa.");
    Name::from_ascii(text).ok()
}
