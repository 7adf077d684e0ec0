use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use speak_core_types::{AccessRight, Caller, ItemRef};
use speak_request_gate::ItemPermissions;
use tracing::debug;

use crate::config::{ItemGrant, SessionError};

#[derive(Clone, Debug)]
struct Grant {
    principal: String,
    rights: HashSet<AccessRight>,
}

impl Grant {
    fn applies_to(&self, caller: &Caller) -> bool {
        self.principal.eq_ignore_ascii_case(&caller.name) || caller.is_in_role(&self.principal)
    }

    fn allows(&self, right: AccessRight) -> bool {
        self.rights.contains(&right) || self.rights.contains(&AccessRight::Admin)
    }
}

/// Access rights per item, keyed by item id or content path.
///
/// Keys compare case-insensitively. Administrators hold every right, and a
/// granted `item:admin` right implies all the others.
#[derive(Default)]
pub struct ItemAccessTable {
    grants: DashMap<String, Vec<Grant>>,
}

impl ItemAccessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grants(grants: &[ItemGrant]) -> Result<Self, SessionError> {
        let table = Self::new();
        for grant in grants {
            let rights = grant
                .rights
                .iter()
                .map(|raw| AccessRight::parse(raw))
                .collect::<Result<HashSet<_>, _>>()
                .map_err(|err| SessionError::InvalidGrant {
                    item: grant.item.clone(),
                    reason: err.to_string(),
                })?;
            if grant.to.is_empty() {
                return Err(SessionError::InvalidGrant {
                    item: grant.item.clone(),
                    reason: "no accounts or roles listed".into(),
                });
            }
            for principal in &grant.to {
                for right in &rights {
                    table.grant(&grant.item, principal, *right);
                }
            }
        }
        Ok(table)
    }

    pub fn grant(&self, item: &str, principal: &str, right: AccessRight) {
        let mut grants = self.grants.entry(item_key(item)).or_default();
        match grants
            .iter_mut()
            .find(|grant| grant.principal.eq_ignore_ascii_case(principal))
        {
            Some(existing) => {
                existing.rights.insert(right);
            }
            None => grants.push(Grant {
                principal: principal.to_string(),
                rights: HashSet::from([right]),
            }),
        }
    }

    pub fn revoke_all(&self, item: &str) -> bool {
        self.grants.remove(&item_key(item)).is_some()
    }

    pub fn check(&self, caller: &Caller, item: &ItemRef, right: AccessRight) -> bool {
        if caller.is_administrator {
            return true;
        }
        [item.id.as_str(), item.path.as_str()]
            .into_iter()
            .filter(|key| !key.trim().is_empty())
            .any(|key| {
                self.grants
                    .get(&item_key(key))
                    .map(|grants| {
                        grants
                            .iter()
                            .any(|grant| grant.applies_to(caller) && grant.allows(right))
                    })
                    .unwrap_or(false)
            })
    }
}

#[async_trait]
impl ItemPermissions for ItemAccessTable {
    async fn has_access(&self, caller: &Caller, item: &ItemRef, right: AccessRight) -> bool {
        let allowed = self.check(caller, item, right);
        debug!(user = %caller, item = %item, right = %right, allowed, "item access evaluated");
        allowed
    }
}

fn item_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
