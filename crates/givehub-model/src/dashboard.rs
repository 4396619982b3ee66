// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::commission::CommissionStatus;
use crate::donation::DonationStatus;
use crate::ids::UserId;
use crate::money::Amount;
use crate::role::Role;
use crate::target::TargetProgress;
use crate::user::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotal {
    pub count: u64,
    pub amount: Amount,
}

impl StatusTotal {
    pub fn add(&mut self, amount: Amount) {
        self.count += 1;
        self.amount = self.amount.saturating_add(amount);
    }
}

/// Count and amount of commission logs per status. Every status is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSummary {
    pub by_status: BTreeMap<CommissionStatus, StatusTotal>,
}

impl Default for CommissionSummary {
    fn default() -> Self {
        Self {
            by_status: CommissionStatus::ALL
                .into_iter()
                .map(|s| (s, StatusTotal::default()))
                .collect(),
        }
    }
}

impl CommissionSummary {
    #[must_use]
    pub fn get(&self, status: CommissionStatus) -> StatusTotal {
        self.by_status.get(&status).copied().unwrap_or_default()
    }

    /// Everything earned that has not been cancelled.
    #[must_use]
    pub fn earned(&self) -> Amount {
        [CommissionStatus::Pending, CommissionStatus::Paid, CommissionStatus::Failed]
            .into_iter()
            .map(|s| self.get(s).amount)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerTotal {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
    pub donations: u64,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub donations: BTreeMap<DonationStatus, StatusTotal>,
    pub commissions: CommissionSummary,
    pub active_users: BTreeMap<Role, u64>,
    pub top_referrers: Vec<ReferrerTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDashboard {
    pub user: User,
    pub direct_subordinates: u64,
    pub team_size: u64,
    pub referred: StatusTotal,
    pub team_amount: Amount,
    pub commissions: CommissionSummary,
    pub current_targets: Vec<TargetProgress>,
}
