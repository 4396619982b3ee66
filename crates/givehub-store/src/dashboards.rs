// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use givehub_model::{
    AdminDashboard, DomainError, DonationStatus, MemberDashboard, ReferrerTotal, Role,
    StatusTotal, User, UserId, ValidationError,
};
use rusqlite::params;

use crate::commissions::summary_for;
use crate::rows::{amount_at, TEAM_CTE};
use crate::targets::{current_targets, progress_of};
use crate::{Store, StoreError};

const TOP_REFERRERS: i64 = 5;

fn count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or_default()
}

fn corrupt(err: ValidationError) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

impl Store {
    pub fn admin_dashboard(&self, actor: &User) -> Result<AdminDashboard, StoreError> {
        if !actor.role.is_admin() {
            return Err(DomainError::forbidden("the admin dashboard is for admins only").into());
        }

        let mut donations: BTreeMap<DonationStatus, StatusTotal> = DonationStatus::ALL
            .into_iter()
            .map(|s| (s, StatusTotal::default()))
            .collect();
        {
            let mut stmt = self.conn.prepare(
                "SELECT status, COUNT(*), COALESCE(SUM(amount), 0) FROM donations GROUP BY status",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let status: String = row.get(0)?;
                let status: DonationStatus = status.parse().map_err(corrupt)?;
                donations.insert(
                    status,
                    StatusTotal {
                        count: count(row.get(1)?),
                        amount: amount_at(row, 2)?,
                    },
                );
            }
        }

        let mut active_users: BTreeMap<Role, u64> = Role::ALL.into_iter().map(|r| (r, 0)).collect();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT role, COUNT(*) FROM users WHERE active = 1 GROUP BY role")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let role: String = row.get(0)?;
                let role: Role = role.parse().map_err(corrupt)?;
                active_users.insert(role, count(row.get(1)?));
            }
        }

        let mut top_referrers = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT u.id, u.name, u.role, COUNT(d.id), COALESCE(SUM(d.amount), 0)
                 FROM donations d JOIN users u ON u.id = d.referrer_id
                 WHERE d.status = ?1
                 GROUP BY u.id
                 ORDER BY SUM(d.amount) DESC, u.id
                 LIMIT ?2",
            )?;
            let mut rows = stmt.query(params![DonationStatus::Completed.as_str(), TOP_REFERRERS])?;
            while let Some(row) = rows.next()? {
                let role: String = row.get(2)?;
                top_referrers.push(ReferrerTotal {
                    user_id: UserId(row.get(0)?),
                    name: row.get(1)?,
                    role: role.parse().map_err(corrupt)?,
                    donations: count(row.get(3)?),
                    amount: amount_at(row, 4)?,
                });
            }
        }

        Ok(AdminDashboard {
            donations,
            commissions: summary_for(&self.conn, None)?,
            active_users,
            top_referrers,
        })
    }

    /// The "me" view: team shape, referred totals, earnings and live targets.
    pub fn member_dashboard(&self, actor: &User) -> Result<MemberDashboard, StoreError> {
        let id = actor.id.get();
        let completed = DonationStatus::Completed.as_str();

        let direct_subordinates: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE parent_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let team_size: i64 = self.conn.query_row(
            &format!("{TEAM_CTE} SELECT COUNT(*) FROM team WHERE id != ?1"),
            params![id],
            |row| row.get(0),
        )?;
        let referred = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM donations
             WHERE referrer_id = ?1 AND status = ?2",
            params![id, completed],
            |row| {
                Ok(StatusTotal {
                    count: count(row.get(0)?),
                    amount: amount_at(row, 1)?,
                })
            },
        )?;
        let team_amount = self.conn.query_row(
            &format!(
                "{TEAM_CTE} SELECT COALESCE(SUM(amount), 0) FROM donations
                 WHERE status = ?2 AND referrer_id IN (SELECT id FROM team)"
            ),
            params![id, completed],
            |row| amount_at(row, 0),
        )?;

        let current_targets = current_targets(&self.conn, actor.id, self.now())?
            .iter()
            .map(|target| progress_of(&self.conn, target))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MemberDashboard {
            user: actor.clone(),
            direct_subordinates: count(direct_subordinates),
            team_size: count(team_size),
            referred,
            team_amount,
            commissions: summary_for(&self.conn, Some(actor.id))?,
            current_targets,
        })
    }
}
