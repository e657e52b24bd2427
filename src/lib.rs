//! Dynamic-update authorization policy engine.
//!
//! Decides whether an authenticated signer and/or source address may
//! modify a record name and type in a dynamically updated zone. Policy
//! is an ordered table of grant/deny rules evaluated first match wins;
//! an exhausted table denies. Trust decisions that live outside the
//! table - ACLs, Kerberos/NTLM realm checks, external authorizers, DLZ
//! backing stores - are injected behind traits, so the engine has no
//! dependency on any particular identity or storage technology.
//!
//! # Architecture
//!
//! - **Rules**: [`Rule`] pairs a grant/deny outcome with one of
//!   seventeen [`MatchType`] variants and an optional record-type list
//! - **Tables**: [`SsuTableBuilder`] validates and orders rules, then
//!   freezes them into an immutable, shareable [`SsuTable`]
//! - **Evaluation**: [`SsuTable::check_rules`] walks the table once per
//!   request; predicate failures count as non-matches (fail closed)
//! - **Reload**: [`ReloadableTable`] swaps whole tables atomically
//!
//! # Example
//!
//! ```
//! use std::str::FromStr;
//!
//! use hickory_proto::rr::{Name, RecordType};
//! use ssu_policy::{CheckEnv, MatchType, SsuTable, UpdateContext};
//!
//! let mut builder = SsuTable::builder();
//! builder.add_rule(
//!     true,
//!     Name::from_str("ddns-key.example.com.").unwrap(),
//!     MatchType::Subdomain,
//!     Name::from_str("dyn.example.com.").unwrap(),
//!     vec![RecordType::A, RecordType::AAAA],
//! ).unwrap();
//! let table = builder.build();
//!
//! let signer = Name::from_str("ddns-key.example.com.").unwrap();
//! let target = Name::from_str("host1.dyn.example.com.").unwrap();
//! let ctx = UpdateContext {
//!     signer: Some(&signer),
//!     name: &target,
//!     addr: None,
//!     tcp: false,
//!     rtype: RecordType::A,
//!     key: None,
//! };
//! assert!(table.check_rules(&ctx, &CheckEnv::default()));
//! ```

pub mod acl;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod rule;
pub mod traits;

pub use acl::NetworkAcl;
pub use engine::{ReloadableTable, SsuTable, SsuTableBuilder};
pub use error::{PredicateError, RuleError};
pub use rule::{MatchType, Rule, UpdateContext};
pub use traits::{
    AclMatcher, CheckEnv, DlzBackend, ExternalMatcher, RealmMatcher, SignerKey, LOCALHOST_ACL,
};
