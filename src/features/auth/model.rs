use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::{
    ROLE_BLOOD_BANK_ADMIN, ROLE_CITIZEN, ROLE_DRIVER, ROLE_HOSPITAL_ADMIN, ROLE_SUPER_ADMIN,
};

/// Closed set of caller roles; every authorization check matches on it exhaustively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Driver,
    HospitalAdmin,
    BloodBankAdmin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => ROLE_CITIZEN,
            Role::Driver => ROLE_DRIVER,
            Role::HospitalAdmin => ROLE_HOSPITAL_ADMIN,
            Role::BloodBankAdmin => ROLE_BLOOD_BANK_ADMIN,
            Role::SuperAdmin => ROLE_SUPER_ADMIN,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_CITIZEN => Ok(Role::Citizen),
            ROLE_DRIVER => Ok(Role::Driver),
            ROLE_HOSPITAL_ADMIN => Ok(Role::HospitalAdmin),
            ROLE_BLOOD_BANK_ADMIN => Ok(Role::BloodBankAdmin),
            ROLE_SUPER_ADMIN => Ok(Role::SuperAdmin),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller identity as resolved by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// True when the caller is a citizen with the given user id
    pub fn is_citizen(&self, user_id: &str) -> bool {
        match self.role {
            Role::Citizen => self.user_id == user_id,
            Role::Driver | Role::HospitalAdmin | Role::BloodBankAdmin | Role::SuperAdmin => false,
        }
    }

    /// True when the caller is a driver with the given user id
    pub fn is_driver(&self, driver_id: &str) -> bool {
        match self.role {
            Role::Driver => self.user_id == driver_id,
            Role::Citizen | Role::HospitalAdmin | Role::BloodBankAdmin | Role::SuperAdmin => false,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self.role, Role::SuperAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_claim_string() {
        for role in [
            Role::Citizen,
            Role::Driver,
            Role::HospitalAdmin,
            Role::BloodBankAdmin,
            Role::SuperAdmin,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
        assert!("CITIZEN".parse::<Role>().is_err());
    }

    #[test]
    fn test_identity_checks_require_matching_role() {
        let citizen = AuthenticatedUser::new("u-1", Role::Citizen);
        let driver = AuthenticatedUser::new("u-1", Role::Driver);

        assert!(citizen.is_citizen("u-1"));
        assert!(!citizen.is_citizen("u-2"));
        assert!(!citizen.is_driver("u-1"));
        assert!(driver.is_driver("u-1"));
        assert!(!driver.is_citizen("u-1"));
    }
}
