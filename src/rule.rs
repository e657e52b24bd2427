//! Rule and match-type definitions.

use std::net::IpAddr;

use hickory_proto::rr::{Name, RecordType};
use serde::{Deserialize, Serialize};

use crate::matcher::name::is_user_type;
use crate::traits::SignerKey;

/// How a rule matches an update request.
///
/// Serialized spellings follow the policy language (`self`,
/// `krb5-subdomain`, `6to4-self`, ...) so a config loader can
/// deserialize match types directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    /// Target name equals the rule name exactly.
    Name,
    /// Target name is at or below the rule name.
    Subdomain,
    /// Target name matches the rule's wildcard pattern.
    Wildcard,
    /// Target name equals the signer name.
    #[serde(rename = "self")]
    SelfName,
    /// Target name is strictly below the signer name.
    #[serde(rename = "selfsub")]
    SelfSub,
    /// Target name matches `*.` prepended to the signer name.
    #[serde(rename = "selfwild")]
    SelfWild,
    /// Kerberos principal updating its own machine name.
    Krb5Self,
    /// Windows principal updating its own machine name.
    MsSelf,
    /// Kerberos principal, names below its machine name.
    #[serde(rename = "krb5-selfsub")]
    Krb5SelfSub,
    /// Windows principal, names below its machine name.
    #[serde(rename = "ms-selfsub")]
    MsSelfSub,
    /// Kerberos realm membership plus a subtree restriction.
    Krb5Subdomain,
    /// Windows realm membership plus a subtree restriction.
    MsSubdomain,
    /// Reverse-mapped TCP source address updating itself.
    TcpSelf,
    /// 6to4 prefix of the TCP source address updating itself.
    #[serde(rename = "6to4-self")]
    SixToFourSelf,
    /// Decision delegated to an external authorizer.
    External,
    /// Session-key update restricted to the localhost ACL.
    Local,
    /// Decision delegated to the table's DLZ backend.
    Dlz,
}

impl MatchType {
    /// Policy-language spelling, for logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Name => "name",
            MatchType::Subdomain => "subdomain",
            MatchType::Wildcard => "wildcard",
            MatchType::SelfName => "self",
            MatchType::SelfSub => "selfsub",
            MatchType::SelfWild => "selfwild",
            MatchType::Krb5Self => "krb5-self",
            MatchType::MsSelf => "ms-self",
            MatchType::Krb5SelfSub => "krb5-selfsub",
            MatchType::MsSelfSub => "ms-selfsub",
            MatchType::Krb5Subdomain => "krb5-subdomain",
            MatchType::MsSubdomain => "ms-subdomain",
            MatchType::TcpSelf => "tcp-self",
            MatchType::SixToFourSelf => "6to4-self",
            MatchType::External => "external",
            MatchType::Local => "local",
            MatchType::Dlz => "dlz",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One grant/deny clause in a rule table.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) grant: bool,
    pub(crate) match_type: MatchType,
    pub(crate) identity: Name,
    pub(crate) name: Name,
    pub(crate) types: Vec<RecordType>,
}

impl Rule {
    /// Outcome when this rule matches.
    pub fn is_grant(&self) -> bool {
        self.grant
    }

    /// How the rule matches.
    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    /// Signer pattern (may be a wildcard name).
    pub fn identity(&self) -> &Name {
        &self.identity
    }

    /// Target-name pattern.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Record types the rule covers; empty means all user types.
    pub fn types(&self) -> &[RecordType] {
        &self.types
    }

    /// Type filter.
    ///
    /// An empty list covers every user type but never NS, SOA, or
    /// RRSIG; a non-empty list must name the type or contain ANY.
    pub(crate) fn covers_type(&self, rtype: RecordType) -> bool {
        if self.types.is_empty() {
            is_user_type(rtype)
        } else {
            self.types
                .iter()
                .any(|t| *t == RecordType::ANY || *t == rtype)
        }
    }
}

/// One update-authorization request.
///
/// Borrowed view over the request; the engine copies nothing.
pub struct UpdateContext<'a> {
    /// Authenticated signer name, if the request was signed.
    pub signer: Option<&'a Name>,
    /// Name targeted by the update.
    pub name: &'a Name,
    /// Source address of the request.
    pub addr: Option<IpAddr>,
    /// Whether the request arrived over TCP.
    pub tcp: bool,
    /// Record type being updated.
    pub rtype: RecordType,
    /// Key that authenticated the request, if any.
    pub key: Option<&'a dyn SignerKey>,
}

impl std::fmt::Debug for UpdateContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateContext")
            .field("signer", &self.signer)
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("tcp", &self.tcp)
            .field("rtype", &self.rtype)
            .field("key", &self.key.map(|k| k.name()))
            .finish()
    }
}
