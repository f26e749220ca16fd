use std::collections::BTreeSet;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{OracleError, OracleResult};

/// Capabilities checked at each oracle entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Configure the oracle and manage every role
    Admin,
    /// Submit full vault snapshots
    PriceParametersVerifier,
    /// Submit the profit unlock period
    UnlockTimeVerifier,
}

/// Explicit (role, account) grants.
///
/// Once the last admin revokes itself nothing can grant roles or change
/// configuration again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    grants: BTreeSet<(Role, Address)>,
}

impl AccessControl {
    pub fn with_admin(admin: Address) -> Self {
        let mut grants = BTreeSet::new();
        grants.insert((Role::Admin, admin));
        Self { grants }
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.grants.contains(&(role, account))
    }

    pub fn check(&self, role: Role, caller: Address) -> OracleResult<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(OracleError::Unauthorized { caller, role })
        }
    }

    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> OracleResult<()> {
        self.check(Role::Admin, caller)?;
        if self.grants.insert((role, account)) {
            info!(?role, %account, %caller, "role granted");
        }
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> OracleResult<()> {
        self.check(Role::Admin, caller)?;
        if self.grants.remove(&(role, account)) {
            info!(?role, %account, %caller, "role revoked");
        }
        Ok(())
    }

    /// Drop one of the caller's own roles; needs no admin rights.
    pub fn renounce_role(&mut self, caller: Address, role: Role) {
        if self.grants.remove(&(role, caller)) {
            info!(?role, %caller, "role renounced");
        }
    }

    pub fn members(&self, role: Role) -> impl Iterator<Item = Address> + '_ {
        self.grants
            .iter()
            .filter(move |(r, _)| *r == role)
            .map(|(_, account)| *account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admin_grants() {
        let admin = Address::repeat_byte(1);
        let anne = Address::repeat_byte(2);
        let mut roles = AccessControl::with_admin(admin);

        assert!(matches!(
            roles.grant_role(anne, Role::PriceParametersVerifier, anne),
            Err(OracleError::Unauthorized { role: Role::Admin, .. })
        ));

        roles.grant_role(admin, Role::PriceParametersVerifier, anne).unwrap();
        assert!(roles.has_role(Role::PriceParametersVerifier, anne));
        assert!(!roles.has_role(Role::UnlockTimeVerifier, anne));
    }

    #[test]
    fn test_admin_transfer_and_renounce() {
        let admin = Address::repeat_byte(1);
        let anne = Address::repeat_byte(2);
        let mut roles = AccessControl::with_admin(admin);

        roles.grant_role(admin, Role::Admin, anne).unwrap();
        roles.revoke_role(anne, Role::Admin, admin).unwrap();
        assert_eq!(roles.members(Role::Admin).collect::<Vec<_>>(), vec![anne]);

        roles.renounce_role(anne, Role::Admin);
        assert_eq!(roles.members(Role::Admin).count(), 0);
        assert!(roles.grant_role(anne, Role::Admin, anne).is_err());
        assert!(roles.grant_role(admin, Role::Admin, admin).is_err());
    }
}
