//! Error types for the policy engine.

use hickory_proto::rr::{Name, RecordType};
use thiserror::Error;

/// Errors raised while building a rule table.
///
/// These are configuration-time contract violations; a loader should
/// surface them as hard failures naming the offending policy clause.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Rule identity must be a fully qualified name.
    #[error("rule identity is not absolute: {0}")]
    IdentityNotAbsolute(Name),

    /// Rule name must be a fully qualified name.
    #[error("rule name is not absolute: {0}")]
    NameNotAbsolute(Name),

    /// A wildcard rule's name must itself be a wildcard pattern.
    #[error("wildcard rule requires a wildcard name: {0}")]
    NotWildcard(Name),

    /// Type lists hold concrete data types or ANY, never meta types.
    #[error("record type {0} is not allowed in a rule type list")]
    MetaType(RecordType),
}

/// Error returned by an injected match predicate.
///
/// The evaluator never propagates these: a failing predicate is logged
/// and treated as "did not match", so authorization stays fail-closed.
#[derive(Debug, Error)]
pub enum PredicateError {
    /// ACL lookup failed.
    #[error("acl lookup failed: {0}")]
    Acl(String),

    /// Backend error (realm service, external daemon, database, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

impl PredicateError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
