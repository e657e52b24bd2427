//! Rule tables and the update-authorization evaluator.

use std::sync::Arc;

use arc_swap::ArcSwap;
use hickory_proto::rr::{Name, RecordType};
use tracing::{debug, warn};

use crate::error::RuleError;
use crate::matcher::name::{matches_identity, matches_wildcard, self_wildcard, strictly_under};
use crate::matcher::reverse::{ptr_name, six_to_four_name};
use crate::rule::{MatchType, Rule, UpdateContext};
use crate::traits::{CheckEnv, DlzBackend, LOCALHOST_ACL};

/// Meta/query-only types that may not appear in a rule type list.
fn is_meta_type(rtype: RecordType) -> bool {
    matches!(
        rtype,
        RecordType::OPT
            | RecordType::TSIG
            | RecordType::AXFR
            | RecordType::IXFR
            | RecordType::ZERO
    )
}

/// Builder for an [`SsuTable`].
///
/// All rule validation happens here; the built table is immutable and
/// can be shared freely across threads.
#[derive(Debug, Default)]
pub struct SsuTableBuilder {
    rules: Vec<Rule>,
}

impl SsuTableBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule at the tail of the table.
    ///
    /// `identity` and `name` must be absolute. A [`MatchType::Wildcard`]
    /// rule additionally requires `name` to be a wildcard pattern, and
    /// `types` may hold only concrete data types or `ANY`.
    pub fn add_rule(
        &mut self,
        grant: bool,
        identity: Name,
        match_type: MatchType,
        name: Name,
        types: Vec<RecordType>,
    ) -> Result<&mut Self, RuleError> {
        if !identity.is_fqdn() {
            return Err(RuleError::IdentityNotAbsolute(identity));
        }
        if !name.is_fqdn() {
            return Err(RuleError::NameNotAbsolute(name));
        }
        if match_type == MatchType::Wildcard && !name.is_wildcard() {
            return Err(RuleError::NotWildcard(name));
        }
        if let Some(t) = types.iter().copied().find(|t| is_meta_type(*t)) {
            return Err(RuleError::MetaType(t));
        }
        self.rules.push(Rule {
            grant,
            match_type,
            identity,
            name,
            types,
        });
        Ok(self)
    }

    /// Freeze the rule sequence into an immutable table.
    pub fn build(self) -> SsuTable {
        debug!(rules = self.rules.len(), "built update policy table");
        SsuTable {
            rules: self.rules,
            dlz: None,
        }
    }
}

/// An ordered, immutable set of update-authorization rules.
///
/// Built once by [`SsuTableBuilder`], then shared read-only via
/// `Arc<SsuTable>` (or [`ReloadableTable`]) for its whole lifetime.
/// Rules keep insertion order; evaluation is first match wins.
pub struct SsuTable {
    rules: Vec<Rule>,
    dlz: Option<Arc<dyn DlzBackend>>,
}

impl SsuTable {
    /// Start building a table.
    pub fn builder() -> SsuTableBuilder {
        SsuTableBuilder::new()
    }

    /// Table that delegates every decision to a DLZ backing store.
    ///
    /// Holds exactly one synthetic grant rule; the backend also owns
    /// type filtering, so the usual type filter is skipped.
    pub fn with_dlz(db: Arc<dyn DlzBackend>) -> Self {
        let rule = Rule {
            grant: true,
            match_type: MatchType::Dlz,
            identity: Name::root(),
            name: Name::root(),
            types: Vec::new(),
        };
        Self {
            rules: vec![rule],
            dlz: Some(db),
        }
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the table holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns true if the table delegates to a DLZ backend.
    pub fn has_dlz(&self) -> bool {
        self.dlz.is_some()
    }

    /// Decide whether the request described by `ctx` is authorized.
    ///
    /// Rules are evaluated in insertion order; the first rule whose
    /// identity, name, and type checks all pass fixes the outcome. An
    /// exhausted table denies - there is no implicit allow.
    pub fn check_rules(&self, ctx: &UpdateContext<'_>, env: &CheckEnv<'_>) -> bool {
        // No rule can apply to a request with neither a signer nor a
        // source address.
        if ctx.signer.is_none() && ctx.addr.is_none() {
            return false;
        }
        if !ctx.name.is_fqdn() {
            warn!(name = %ctx.name, "update name is not absolute; denying");
            return false;
        }
        if let Some(signer) = ctx.signer {
            if !signer.is_fqdn() {
                warn!(signer = %signer, "signer name is not absolute; denying");
                return false;
            }
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if !self.rule_matches(rule, ctx, env) {
                continue;
            }
            // DLZ backends do their own type filtering.
            if rule.match_type != MatchType::Dlz && !rule.covers_type(ctx.rtype) {
                continue;
            }
            debug!(
                index,
                match_type = rule.match_type.as_str(),
                grant = rule.grant,
                name = %ctx.name,
                "update policy decision"
            );
            return rule.grant;
        }
        false
    }

    /// Fused identity and target evaluation for one rule.
    fn rule_matches(&self, rule: &Rule, ctx: &UpdateContext<'_>, env: &CheckEnv<'_>) -> bool {
        match rule.match_type {
            MatchType::Name => signer_gate(rule, ctx) && *ctx.name == rule.name,
            MatchType::Subdomain => signer_gate(rule, ctx) && rule.name.zone_of(ctx.name),
            MatchType::Wildcard => {
                signer_gate(rule, ctx) && matches_wildcard(ctx.name, &rule.name)
            }
            MatchType::SelfName => match ctx.signer {
                Some(signer) => {
                    matches_identity(signer, &rule.identity) && signer == ctx.name
                }
                None => false,
            },
            MatchType::SelfSub => match ctx.signer {
                Some(signer) => {
                    matches_identity(signer, &rule.identity)
                        && strictly_under(ctx.name, signer)
                }
                None => false,
            },
            MatchType::SelfWild => match ctx.signer {
                Some(signer) => {
                    matches_identity(signer, &rule.identity)
                        && self_wildcard(signer)
                            .is_some_and(|w| matches_wildcard(ctx.name, &w))
                }
                None => false,
            },
            MatchType::Local => {
                if !signer_gate(rule, ctx) {
                    return false;
                }
                let Some(addr) = ctx.addr else {
                    return false;
                };
                if !rule.name.zone_of(ctx.name) {
                    return false;
                }
                let Some(acl) = env.acl else {
                    debug!("local rule present but no acl matcher configured");
                    return false;
                };
                match acl.matches(addr, LOCALHOST_ACL) {
                    Ok(true) => true,
                    Ok(false) => {
                        if ctx.key.is_some() {
                            warn!(
                                name = %ctx.name,
                                addr = %addr,
                                "local-policy key match from a remote address; \
                                 ignoring key match"
                            );
                        }
                        false
                    }
                    Err(err) => {
                        warn!(error = %err, "acl lookup failed; treating rule as no match");
                        false
                    }
                }
            }
            MatchType::Krb5Self => {
                realm_matches(env, ctx.signer, Some(ctx.name), &rule.identity, false, false)
            }
            MatchType::MsSelf => {
                realm_matches(env, ctx.signer, Some(ctx.name), &rule.identity, false, true)
            }
            MatchType::Krb5SelfSub => {
                realm_matches(env, ctx.signer, Some(ctx.name), &rule.identity, true, false)
            }
            MatchType::MsSelfSub => {
                realm_matches(env, ctx.signer, Some(ctx.name), &rule.identity, true, true)
            }
            MatchType::Krb5Subdomain => {
                ctx.signer.is_some()
                    && rule.name.zone_of(ctx.name)
                    && realm_matches(env, ctx.signer, None, &rule.identity, false, false)
            }
            MatchType::MsSubdomain => {
                ctx.signer.is_some()
                    && rule.name.zone_of(ctx.name)
                    && realm_matches(env, ctx.signer, None, &rule.identity, false, true)
            }
            MatchType::TcpSelf => match (ctx.tcp, ctx.addr) {
                (true, Some(addr)) => ptr_name(addr).is_some_and(|reversed| {
                    matches_identity(&reversed, &rule.identity) && reversed == *ctx.name
                }),
                _ => false,
            },
            MatchType::SixToFourSelf => match (ctx.tcp, ctx.addr) {
                (true, Some(addr)) => six_to_four_name(addr).is_some_and(|reversed| {
                    matches_identity(&reversed, &rule.identity) && reversed == *ctx.name
                }),
                _ => false,
            },
            MatchType::External => {
                let Some(matcher) = env.external else {
                    debug!("external rule present but no external matcher configured");
                    return false;
                };
                match matcher.matches(
                    &rule.identity,
                    ctx.signer,
                    ctx.name,
                    ctx.addr,
                    ctx.rtype,
                    ctx.key,
                ) {
                    Ok(matched) => matched,
                    Err(err) => {
                        warn!(error = %err, "external matcher failed; treating rule as no match");
                        false
                    }
                }
            }
            MatchType::Dlz => {
                let Some(db) = self.dlz.as_deref() else {
                    debug!("dlz rule present but table has no dlz backend");
                    return false;
                };
                match db.allow_update(ctx.signer, ctx.name, ctx.addr, ctx.rtype, ctx.key) {
                    Ok(matched) => matched,
                    Err(err) => {
                        warn!(error = %err, "dlz backend failed; treating rule as no match");
                        false
                    }
                }
            }
        }
    }
}

/// Shared signer/identity gate for the locally matched rule types.
fn signer_gate(rule: &Rule, ctx: &UpdateContext<'_>) -> bool {
    match ctx.signer {
        Some(signer) => matches_identity(signer, &rule.identity),
        None => false,
    }
}

/// Delegate a realm check, downgrading errors and absent capability to
/// "no match".
fn realm_matches(
    env: &CheckEnv<'_>,
    signer: Option<&Name>,
    target: Option<&Name>,
    realm: &Name,
    subdomain: bool,
    ms: bool,
) -> bool {
    let Some(signer) = signer else {
        return false;
    };
    let Some(matcher) = env.realm else {
        debug!("realm rule present but no realm matcher configured");
        return false;
    };
    let result = if ms {
        matcher.matches_ms(signer, target, realm, subdomain)
    } else {
        matcher.matches_krb5(signer, target, realm, subdomain)
    };
    match result {
        Ok(matched) => matched,
        Err(err) => {
            warn!(error = %err, "realm matcher failed; treating rule as no match");
            false
        }
    }
}

impl std::fmt::Debug for SsuTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsuTable")
            .field("rules", &self.rules.len())
            .field("dlz", &self.dlz.is_some())
            .finish()
    }
}

// ── Hot-reloadable table ──

/// A hot-reloadable holder for the current [`SsuTable`].
///
/// Reads are wait-free; [`update`](Self::update) atomically publishes a
/// replacement table. In-flight checks finish against the table they
/// started with.
pub struct ReloadableTable {
    inner: ArcSwap<SsuTable>,
}

impl ReloadableTable {
    /// Wrap an initial table.
    pub fn new(table: SsuTable) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(table)),
        }
    }

    /// Check a request against the current table.
    pub fn check_rules(&self, ctx: &UpdateContext<'_>, env: &CheckEnv<'_>) -> bool {
        self.inner.load().check_rules(ctx, env)
    }

    /// Snapshot of the current table.
    pub fn snapshot(&self) -> Arc<SsuTable> {
        self.inner.load_full()
    }

    /// Atomically replace the table.
    pub fn update(&self, table: SsuTable) {
        self.inner.store(Arc::new(table));
    }
}

impl std::fmt::Debug for ReloadableTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadableTable")
            .field("inner", &*self.inner.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn ctx<'a>(signer: Option<&'a Name>, target: &'a Name, rtype: RecordType) -> UpdateContext<'a> {
        UpdateContext {
            signer,
            name: target,
            addr: None,
            tcp: false,
            rtype,
            key: None,
        }
    }

    #[test]
    fn empty_table_denies_everything() {
        let table = SsuTable::builder().build();
        let signer = name("key.example.com.");
        let target = name("host1.example.com.");
        assert!(!table.check_rules(
            &ctx(Some(&signer), &target, RecordType::A),
            &CheckEnv::default()
        ));
    }

    #[test]
    fn no_signer_no_addr_denies() {
        let mut builder = SsuTable::builder();
        builder
            .add_rule(
                true,
                name("*."),
                MatchType::Subdomain,
                name("example.com."),
                vec![],
            )
            .unwrap();
        let table = builder.build();
        let target = name("host1.example.com.");
        assert!(!table.check_rules(
            &ctx(None, &target, RecordType::A),
            &CheckEnv::default()
        ));
    }

    #[test]
    fn non_absolute_identity_rejected() {
        let mut builder = SsuTable::builder();
        let err = builder
            .add_rule(
                true,
                Name::from_ascii("key.example.com").unwrap(),
                MatchType::Name,
                name("example.com."),
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, RuleError::IdentityNotAbsolute(_)));
    }

    #[test]
    fn non_absolute_name_rejected() {
        let mut builder = SsuTable::builder();
        let err = builder
            .add_rule(
                true,
                name("key.example.com."),
                MatchType::Name,
                Name::from_ascii("example.com").unwrap(),
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, RuleError::NameNotAbsolute(_)));
    }

    #[test]
    fn wildcard_rule_requires_wildcard_name() {
        let mut builder = SsuTable::builder();
        let err = builder
            .add_rule(
                true,
                name("key.example.com."),
                MatchType::Wildcard,
                name("example.com."),
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, RuleError::NotWildcard(_)));

        let mut builder = SsuTable::builder();
        builder
            .add_rule(
                true,
                name("key.example.com."),
                MatchType::Wildcard,
                name("*.example.com."),
                vec![],
            )
            .unwrap();
        assert_eq!(builder.build().rule_count(), 1);
    }

    #[test]
    fn meta_type_rejected() {
        let mut builder = SsuTable::builder();
        let err = builder
            .add_rule(
                true,
                name("key.example.com."),
                MatchType::Name,
                name("example.com."),
                vec![RecordType::A, RecordType::AXFR],
            )
            .unwrap_err();
        assert!(matches!(err, RuleError::MetaType(RecordType::AXFR)));
    }

    #[test]
    fn rules_round_trip_in_insertion_order() {
        let mut builder = SsuTable::builder();
        builder
            .add_rule(
                false,
                name("a.example.com."),
                MatchType::Name,
                name("locked.example.com."),
                vec![RecordType::A],
            )
            .unwrap()
            .add_rule(
                true,
                name("b.example.com."),
                MatchType::Subdomain,
                name("example.com."),
                vec![RecordType::A, RecordType::AAAA],
            )
            .unwrap();
        let table = builder.build();

        let rules: Vec<_> = table.rules().collect();
        assert_eq!(rules.len(), 2);
        assert!(!rules[0].is_grant());
        assert_eq!(rules[0].match_type(), MatchType::Name);
        assert_eq!(rules[0].identity(), &name("a.example.com."));
        assert_eq!(rules[0].name(), &name("locked.example.com."));
        assert_eq!(rules[0].types(), &[RecordType::A]);
        assert!(rules[1].is_grant());
        assert_eq!(rules[1].types(), &[RecordType::A, RecordType::AAAA]);
    }

    #[test]
    fn self_rule_exact_match_only() {
        let mut builder = SsuTable::builder();
        builder
            .add_rule(true, name("*."), MatchType::SelfName, name("."), vec![])
            .unwrap();
        let table = builder.build();

        let signer = name("host1.example.com.");
        let same = name("host1.example.com.");
        let other = name("other.example.com.");
        let env = CheckEnv::default();
        assert!(table.check_rules(&ctx(Some(&signer), &same, RecordType::A), &env));
        assert!(!table.check_rules(&ctx(Some(&signer), &other, RecordType::A), &env));
    }

    #[test]
    fn shared_table_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SsuTable>();
        assert_send_sync::<ReloadableTable>();
        assert_send_sync::<Arc<SsuTable>>();
    }

    #[test]
    fn reload_swaps_atomically() {
        let holder = ReloadableTable::new(SsuTable::builder().build());
        let signer = name("key.example.com.");
        let target = name("host1.example.com.");
        let env = CheckEnv::default();
        assert!(!holder.check_rules(&ctx(Some(&signer), &target, RecordType::A), &env));

        let mut builder = SsuTable::builder();
        builder
            .add_rule(
                true,
                name("key.example.com."),
                MatchType::Subdomain,
                name("example.com."),
                vec![],
            )
            .unwrap();
        holder.update(builder.build());
        assert!(holder.check_rules(&ctx(Some(&signer), &target, RecordType::A), &env));
        assert_eq!(holder.snapshot().rule_count(), 1);
    }

    #[test]
    fn arc_sharing_is_balanced() {
        let table = Arc::new(SsuTable::builder().build());
        let second = Arc::clone(&table);
        let third = Arc::clone(&table);
        assert_eq!(Arc::strong_count(&table), 3);
        drop(second);
        drop(third);
        assert_eq!(Arc::strong_count(&table), 1);
    }
}
