//! Address-list matching backed by CIDR sets.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::error::PredicateError;
use crate::traits::{AclMatcher, LOCALHOST_ACL};

/// Named address lists implementing [`AclMatcher`].
///
/// Each list keeps its networks in sorted, deduplicated v4/v6 vectors;
/// lookup is a linear containment scan. A lookup against a list that
/// was never defined is an error, not a miss, so a misconfigured ACL
/// name cannot silently pass.
#[derive(Debug, Default)]
pub struct NetworkAcl {
    lists: HashMap<String, CidrSet>,
}

#[derive(Debug, Default)]
struct CidrSet {
    v4: Vec<Ipv4Net>,
    v6: Vec<Ipv6Net>,
}

impl CidrSet {
    fn insert(&mut self, net: IpNet) {
        match net {
            IpNet::V4(v4) => {
                self.v4.push(v4);
                self.v4.sort();
                self.v4.dedup();
            }
            IpNet::V6(v6) => {
                self.v6.push(v6);
                self.v6.sort();
                self.v6.dedup();
            }
        }
    }

    fn contains(&self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.v4.iter().any(|net| net.contains(&v4)),
            IpAddr::V6(v6) => self.v6.iter().any(|net| net.contains(&v6)),
        }
    }
}

impl NetworkAcl {
    /// Create an empty ACL set.
    pub fn new() -> Self {
        Self::default()
    }

    /// ACL set whose `localhost` list covers the loopback ranges.
    pub fn with_localhost() -> Self {
        let mut acl = Self::new();
        let v4 = Ipv4Net::new(Ipv4Addr::new(127, 0, 0, 0), 8).expect("valid prefix");
        let v6 = Ipv6Net::new(Ipv6Addr::LOCALHOST, 128).expect("valid prefix");
        acl.add(LOCALHOST_ACL, IpNet::V4(v4));
        acl.add(LOCALHOST_ACL, IpNet::V6(v6));
        acl
    }

    /// Add a network to the named list, creating the list if needed.
    pub fn add(&mut self, list: impl Into<String>, net: IpNet) -> &mut Self {
        self.lists.entry(list.into()).or_default().insert(net);
        self
    }

    /// Number of defined lists.
    pub fn list_count(&self) -> usize {
        self.lists.len()
    }
}

impl AclMatcher for NetworkAcl {
    fn matches(&self, addr: IpAddr, acl: &str) -> Result<bool, PredicateError> {
        match self.lists.get(acl) {
            Some(set) => Ok(set.contains(addr)),
            None => Err(PredicateError::Acl(format!("unknown acl: {acl}"))),
        }
    }
}
