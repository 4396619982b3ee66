// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Coordinator hierarchy, most authority first. Declaration order is the
/// level order, so the derived `Ord` sorts admins before volunteers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    StatePresident,
    StateCoordinator,
    ZoneCoordinator,
    DistrictCoordinator,
    BlockCoordinator,
    Volunteer,
}

impl Role {
    pub const ALL: [Self; 7] = [
        Self::Admin,
        Self::StatePresident,
        Self::StateCoordinator,
        Self::ZoneCoordinator,
        Self::DistrictCoordinator,
        Self::BlockCoordinator,
        Self::Volunteer,
    ];

    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Admin => 0,
            Self::StatePresident => 1,
            Self::StateCoordinator => 2,
            Self::ZoneCoordinator => 3,
            Self::DistrictCoordinator => 4,
            Self::BlockCoordinator => 5,
            Self::Volunteer => 6,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::StatePresident => "STATE_PRESIDENT",
            Self::StateCoordinator => "STATE_COORDINATOR",
            Self::ZoneCoordinator => "ZONE_COORDINATOR",
            Self::DistrictCoordinator => "DISTRICT_COORDINATOR",
            Self::BlockCoordinator => "BLOCK_COORDINATOR",
            Self::Volunteer => "VOLUNTEER",
        }
    }

    #[must_use]
    pub const fn referral_prefix(self) -> &'static str {
        match self {
            Self::Admin => "AD",
            Self::StatePresident => "SP",
            Self::StateCoordinator => "SC",
            Self::ZoneCoordinator => "ZC",
            Self::DistrictCoordinator => "DC",
            Self::BlockCoordinator => "BC",
            Self::Volunteer => "VL",
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Strictly higher in the hierarchy.
    #[must_use]
    pub const fn can_manage(self, other: Self) -> bool {
        self.level() < other.level()
    }

    /// Roles a user of this role may create. Admins are never assignable.
    #[must_use]
    pub fn assignable(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|r| !r.is_admin() && self.can_manage(*r))
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| ValidationError::new("role", format!("unknown role `{}`", s.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_declaration_order() {
        for pair in Role::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].level() + 1, pair[1].level());
        }
    }

    #[test]
    fn management_is_strict() {
        assert!(Role::Admin.can_manage(Role::StatePresident));
        assert!(Role::ZoneCoordinator.can_manage(Role::Volunteer));
        assert!(!Role::ZoneCoordinator.can_manage(Role::ZoneCoordinator));
        assert!(!Role::Volunteer.can_manage(Role::BlockCoordinator));
    }

    #[test]
    fn assignable_roles_exclude_admin_and_peers() {
        assert_eq!(
            Role::DistrictCoordinator.assignable(),
            vec![Role::BlockCoordinator, Role::Volunteer]
        );
        assert!(Role::Volunteer.assignable().is_empty());
        assert_eq!(Role::Admin.assignable().len(), 6);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "zone_coordinator".parse::<Role>().expect("role"),
            Role::ZoneCoordinator
        );
        assert!("captain".parse::<Role>().is_err());
    }
}
