// 6.0 access.rs: capability model. roles are a closed enum, one set per caller,
// checked at the top of every gated operation before any state moves.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Emergency,
    Liquidator,
    YieldManager,
}

#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    grants: HashMap<AccountId, BTreeSet<Role>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    /// Returns false if the grant was already present.
    pub fn grant(&mut self, account: AccountId, role: Role) -> bool {
        self.grants.entry(account).or_default().insert(role)
    }

    /// Returns false if there was nothing to revoke.
    pub fn revoke(&mut self, account: AccountId, role: Role) -> bool {
        match self.grants.get_mut(&account) {
            Some(roles) => roles.remove(&role),
            None => false,
        }
    }

    pub fn has(&self, account: AccountId, role: Role) -> bool {
        self.grants
            .get(&account)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }

    pub fn any_holder_of(&self, role: Role) -> bool {
        self.grants.values().any(|roles| roles.contains(&role))
    }

    /// Stable export for snapshots, sorted by account id.
    pub fn export(&self) -> Vec<(AccountId, Vec<Role>)> {
        let mut entries: Vec<(AccountId, Vec<Role>)> = self
            .grants
            .iter()
            .filter(|(_, roles)| !roles.is_empty())
            .map(|(id, roles)| (*id, roles.iter().copied().collect()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    pub fn import(entries: Vec<(AccountId, Vec<Role>)>) -> Self {
        let mut registry = Self::new();
        for (account, roles) in entries {
            for role in roles {
                registry.grant(account, role);
            }
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_revoke() {
        let mut registry = RoleRegistry::new();
        let admin = AccountId(1);

        assert!(registry.grant(admin, Role::Admin));
        assert!(!registry.grant(admin, Role::Admin));
        assert!(registry.has(admin, Role::Admin));
        assert!(!registry.has(admin, Role::Liquidator));

        assert!(registry.revoke(admin, Role::Admin));
        assert!(!registry.revoke(admin, Role::Admin));
        assert!(!registry.has(admin, Role::Admin));
    }

    #[test]
    fn roles_are_per_account() {
        let mut registry = RoleRegistry::new();
        registry.grant(AccountId(1), Role::Emergency);

        assert!(!registry.has(AccountId(2), Role::Emergency));
        assert!(registry.any_holder_of(Role::Emergency));
        assert!(!registry.any_holder_of(Role::YieldManager));
    }

    #[test]
    fn export_import_round_trip() {
        let mut registry = RoleRegistry::new();
        registry.grant(AccountId(3), Role::Liquidator);
        registry.grant(AccountId(1), Role::Admin);
        registry.grant(AccountId(1), Role::YieldManager);

        let exported = registry.export();
        assert_eq!(exported[0].0, AccountId(1));
        assert_eq!(exported[0].1.len(), 2);

        let restored = RoleRegistry::import(exported);
        assert!(restored.has(AccountId(1), Role::Admin));
        assert!(restored.has(AccountId(3), Role::Liquidator));
    }
}
