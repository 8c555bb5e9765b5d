//! Two-tier identity resolution.
//!
//! Email is the only field reliably unique per person across providers, so
//! it is tried first. Name + organization is the fallback for providers
//! that omit email. A record with neither is never matched against anything.

use std::fmt;

use leadmerge_shared::{KeyFields, Record};

use crate::normalize::{normalized_field, resolve_org_name};

/// Which key tier a record resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Email,
    NameOrg,
    NoKey,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Email => "email",
            Tier::NameOrg => "name_org",
            Tier::NoKey => "no_key",
        };
        f.write_str(s)
    }
}

/// Tier-specific identity key. Both parts are normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Email(String),
    NameOrg { name: String, org: String },
}

impl IdentityKey {
    pub fn tier(&self) -> Tier {
        match self {
            IdentityKey::Email(_) => Tier::Email,
            IdentityKey::NameOrg { .. } => Tier::NameOrg,
        }
    }
}

/// Result of resolving one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tier: Tier,
    /// `None` only for [`Tier::NoKey`].
    pub key: Option<IdentityKey>,
}

impl Resolution {
    fn no_key() -> Self {
        Self {
            tier: Tier::NoKey,
            key: None,
        }
    }
}

impl From<IdentityKey> for Resolution {
    fn from(key: IdentityKey) -> Self {
        Self {
            tier: key.tier(),
            key: Some(key),
        }
    }
}

/// Decide which identity a record carries. First match wins:
///
/// 1. non-empty normalized email → [`Tier::Email`]
/// 2. non-empty normalized name AND organization → [`Tier::NameOrg`]
/// 3. otherwise → [`Tier::NoKey`]
///
/// A populated email always wins, even when name+org would also match an
/// existing entity.
pub fn resolve(record: &Record, keys: &KeyFields) -> Resolution {
    let email = normalized_field(record, &keys.email);
    if !email.is_empty() {
        return IdentityKey::Email(email).into();
    }

    name_org_key(record, keys)
        .map(Resolution::from)
        .unwrap_or_else(Resolution::no_key)
}

/// The name+org key of a record regardless of its email.
///
/// Used by tier reconciliation to index email-tier entities by name+org.
pub fn name_org_key(record: &Record, keys: &KeyFields) -> Option<IdentityKey> {
    let name = normalized_field(record, &keys.name);
    if name.is_empty() {
        return None;
    }
    let org = resolve_org_name(record, &keys.org);
    if org.is_empty() {
        return None;
    }
    Some(IdentityKey::NameOrg { name, org })
}
