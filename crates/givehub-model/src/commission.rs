// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, ValidationError};
use crate::ids::{CommissionId, DonationId, UserId};
use crate::money::Amount;
use crate::role::Role;

pub const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl CommissionStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Paid, Self::Failed, Self::Cancelled];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// FAILED may be re-queued; PAID and CANCELLED never move again.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Pending, Self::Failed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Failed, Self::Pending)
        )
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommissionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| {
                ValidationError::new("status", format!("unknown commission status `{s}`"))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionLog {
    pub id: CommissionId,
    pub donation_id: DonationId,
    pub beneficiary_id: UserId,
    pub depth: u32,
    pub rate_bps: u32,
    pub amount: Amount,
    pub status: CommissionStatus,
    pub payment_reference: Option<String>,
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A requested status change, validated against the log's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommissionUpdate {
    pub status: CommissionStatus,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl CommissionUpdate {
    /// Returns the trimmed payment reference and note to persist.
    pub fn check_against(
        &self,
        current: CommissionStatus,
    ) -> Result<(Option<String>, Option<String>), DomainError> {
        if !current.can_transition_to(self.status) {
            return Err(DomainError::transition("commission", current, self.status));
        }
        let reference = self
            .payment_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);
        if self.status == CommissionStatus::Paid && reference.is_none() {
            return Err(DomainError::invalid(
                "payment_reference",
                "required when marking a commission PAID",
            ));
        }
        if reference.as_ref().is_some_and(|r| r.len() > 128) {
            return Err(DomainError::invalid(
                "payment_reference",
                "must be at most 128 characters",
            ));
        }
        let note = self
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string);
        if note.as_ref().is_some_and(|n| n.chars().count() > 500) {
            return Err(DomainError::invalid("note", "must be at most 500 characters"));
        }
        Ok((reference, note))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommissionPolicy {
    pub direct_bps: u32,
    #[serde(default)]
    pub override_bps: BTreeMap<Role, u32>,
    pub max_total_bps: u32,
    pub max_depth: u32,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        let override_bps = BTreeMap::from([
            (Role::StatePresident, 100),
            (Role::StateCoordinator, 100),
            (Role::ZoneCoordinator, 150),
            (Role::DistrictCoordinator, 150),
            (Role::BlockCoordinator, 200),
            (Role::Volunteer, 0),
        ]);
        Self {
            direct_bps: 1_000,
            override_bps,
            max_total_bps: 2_000,
            max_depth: 6,
        }
    }
}

impl CommissionPolicy {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();
        if self.max_total_bps > BPS_DENOMINATOR {
            errors.push(ValidationError::new(
                "max_total_bps",
                format!("must be at most {BPS_DENOMINATOR}"),
            ));
        }
        if self.direct_bps > self.max_total_bps {
            errors.push(ValidationError::new(
                "direct_bps",
                "must not exceed max_total_bps",
            ));
        }
        for (role, bps) in &self.override_bps {
            if role.is_admin() {
                errors.push(ValidationError::new(
                    format!("override_bps.{role}"),
                    "admins never earn commission",
                ));
            }
            if *bps > BPS_DENOMINATOR {
                errors.push(ValidationError::new(
                    format!("override_bps.{role}"),
                    format!("must be at most {BPS_DENOMINATOR}"),
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(errors))
        }
    }

    #[must_use]
    pub fn override_for(&self, role: Role) -> u32 {
        self.override_bps.get(&role).copied().unwrap_or(0)
    }
}

/// One link of a referral chain, referrer first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainMember {
    pub user_id: UserId,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub beneficiary_id: UserId,
    pub depth: u32,
    pub rate_bps: u32,
    pub amount: Amount,
}

/// Splits commission for `amount` along `chain` (referrer first, then its
/// ancestors). The referrer earns `direct_bps`, each ancestor its role's
/// override. Rates are granted closest-first until `max_total_bps` is spent;
/// inactive members are skipped without breaking the chain and the walk stops
/// at the first admin or past `max_depth`.
#[must_use]
pub fn distribute(amount: Amount, chain: &[ChainMember], policy: &CommissionPolicy) -> Vec<Share> {
    let mut budget = policy.max_total_bps.min(BPS_DENOMINATOR);
    let mut shares = Vec::new();

    for (depth, member) in chain.iter().enumerate() {
        let Ok(depth) = u32::try_from(depth) else {
            break;
        };
        if depth > policy.max_depth || budget == 0 || member.role.is_admin() {
            break;
        }
        if !member.active {
            continue;
        }
        let rate = if depth == 0 {
            policy.direct_bps
        } else {
            policy.override_for(member.role)
        };
        let granted = rate.min(budget);
        if granted == 0 {
            continue;
        }
        budget -= granted;
        let value = amount.apply_bps(granted);
        if value.is_zero() {
            continue;
        }
        shares.push(Share {
            beneficiary_id: member.user_id,
            depth,
            rate_bps: granted,
            amount: value,
        });
    }
    shares
}
