//! Capability interfaces consumed by the evaluator.
//!
//! Every trust decision that depends on infrastructure outside the rule
//! table - ACLs, Kerberos/NTLM realm checks, external authorizers, DLZ
//! backing stores - enters through one of these traits, so the engine
//! carries no compile-time dependency on any identity or storage
//! technology. Implementations must be thread-safe (`Send + Sync`) as
//! tables are checked concurrently.

use std::net::IpAddr;

use hickory_proto::rr::{Name, RecordType};

use crate::error::PredicateError;

/// The ACL name the evaluator queries for local-policy rules.
pub const LOCALHOST_ACL: &str = "localhost";

/// Opaque handle to the key that authenticated a request.
pub trait SignerKey: Send + Sync {
    /// Name of the TSIG or SIG(0) key.
    fn name(&self) -> &Name;
}

/// Named address-list lookups.
pub trait AclMatcher: Send + Sync {
    /// Check whether `addr` is a member of the named ACL.
    fn matches(&self, addr: IpAddr, acl: &str) -> Result<bool, PredicateError>;
}

/// Kerberos/NTLM principal-to-realm matching.
pub trait RealmMatcher: Send + Sync {
    /// Check a Kerberos principal (`signer`) against `realm`.
    ///
    /// `target` carries the update name for the self-style checks and
    /// is None for plain realm membership. `subdomain` widens the self
    /// check to names below the principal's machine name.
    fn matches_krb5(
        &self,
        signer: &Name,
        target: Option<&Name>,
        realm: &Name,
        subdomain: bool,
    ) -> Result<bool, PredicateError>;

    /// Windows (NTLM) counterpart of [`matches_krb5`](Self::matches_krb5).
    fn matches_ms(
        &self,
        signer: &Name,
        target: Option<&Name>,
        realm: &Name,
        subdomain: bool,
    ) -> Result<bool, PredicateError>;
}

/// Pluggable external authorizer (e.g. a policy daemon).
pub trait ExternalMatcher: Send + Sync {
    /// Decide whether the request matches; `identity` is the rule's
    /// identity field, typically naming the authorizer instance.
    fn matches(
        &self,
        identity: &Name,
        signer: Option<&Name>,
        name: &Name,
        addr: Option<IpAddr>,
        rtype: RecordType,
        key: Option<&dyn SignerKey>,
    ) -> Result<bool, PredicateError>;
}

/// Pluggable backing store that supplies its own authorization
/// decision, including type filtering.
pub trait DlzBackend: Send + Sync {
    /// Decide whether the backing store allows the update.
    fn allow_update(
        &self,
        signer: Option<&Name>,
        name: &Name,
        addr: Option<IpAddr>,
        rtype: RecordType,
        key: Option<&dyn SignerKey>,
    ) -> Result<bool, PredicateError>;
}

/// Injected capabilities for one `check_rules` call.
///
/// An absent capability leaves the rule variants that need it
/// unmatchable; evaluation fails closed rather than erroring.
#[derive(Default, Clone, Copy)]
pub struct CheckEnv<'a> {
    /// ACL lookups (the evaluator queries the [`LOCALHOST_ACL`] list).
    pub acl: Option<&'a dyn AclMatcher>,
    /// Kerberos/NTLM realm checks.
    pub realm: Option<&'a dyn RealmMatcher>,
    /// External authorizer.
    pub external: Option<&'a dyn ExternalMatcher>,
}

impl std::fmt::Debug for CheckEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckEnv")
            .field("acl", &self.acl.is_some())
            .field("realm", &self.realm.is_some())
            .field("external", &self.external.is_some())
            .finish()
    }
}
