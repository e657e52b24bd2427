//! Name pattern matching.
//!
//! Thin predicates over `hickory_proto::rr::Name`; all comparisons are
//! case-insensitive, inherited from the name type itself.

use hickory_proto::rr::{Name, RecordType};

/// Check `name` against a wildcard pattern.
///
/// `*.suffix` matches names strictly below `suffix`; the suffix itself
/// is not covered. A bare `*.` therefore matches every non-root name.
pub fn matches_wildcard(name: &Name, pattern: &Name) -> bool {
    if !pattern.is_wildcard() {
        return false;
    }
    let base = pattern.base_name();
    base.zone_of(name) && *name != base
}

/// Match a concrete name against a rule identity, which may be an
/// exact name or a wildcard pattern.
pub fn matches_identity(name: &Name, identity: &Name) -> bool {
    if identity.is_wildcard() {
        matches_wildcard(name, identity)
    } else {
        name == identity
    }
}

/// Proper-subdomain test: `name` strictly below `ancestor`.
pub fn strictly_under(name: &Name, ancestor: &Name) -> bool {
    ancestor.zone_of(name) && name != ancestor
}

/// The wildcard formed by prefixing `*.` onto `name`.
///
/// Returns None if the result would exceed name length limits.
pub fn self_wildcard(name: &Name) -> Option<Name> {
    Name::from_ascii("*").ok()?.append_name(name).ok()
}

/// Record types an empty rule type list covers.
///
/// Zone-structure and signature types are excluded so a blanket rule
/// cannot rewrite delegation or authority data.
pub fn is_user_type(rtype: RecordType) -> bool {
    !matches!(
        rtype,
        RecordType::NS | RecordType::SOA | RecordType::RRSIG
    )
}
