// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use givehub_model::{
    CommissionId, CommissionLog, CommissionStatus, CommissionSummary, CommissionUpdate,
    DomainError, DonationId, DonationStatus, User, UserId,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::donations::load_donation;
use crate::rows::{amount_at, commission_from_row, COMMISSION_COLUMNS};
use crate::users::manages;
use crate::{CommissionFilter, Store, StoreError, MAX_PAGE_LIMIT};

pub(crate) fn commissions_for_donation(
    conn: &Connection,
    id: DonationId,
) -> Result<Vec<CommissionLog>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMISSION_COLUMNS} FROM commission_logs WHERE donation_id = ?1 ORDER BY depth"
    ))?;
    let logs = stmt
        .query_map(params![id.get()], commission_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(logs)
}

fn load_commission(conn: &Connection, id: CommissionId) -> Result<CommissionLog, StoreError> {
    conn.query_row(
        &format!("SELECT {COMMISSION_COLUMNS} FROM commission_logs WHERE id = ?1"),
        params![id.get()],
        commission_from_row,
    )
    .optional()?
    .ok_or_else(|| DomainError::not_found("commission", id).into())
}

/// Per-status totals for one beneficiary, or for everybody when `None`.
pub(crate) fn summary_for(
    conn: &Connection,
    beneficiary: Option<UserId>,
) -> Result<CommissionSummary, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*), COALESCE(SUM(amount), 0) FROM commission_logs
         WHERE ?1 IS NULL OR beneficiary_id = ?1
         GROUP BY status",
    )?;
    let mut rows = stmt.query(params![beneficiary.map(UserId::get)])?;
    let mut summary = CommissionSummary::default();
    while let Some(row) = rows.next()? {
        let status: String = row.get(0)?;
        let status: CommissionStatus = status
            .parse()
            .map_err(|e: givehub_model::ValidationError| StoreError::Corrupt(e.to_string()))?;
        let count: i64 = row.get(1)?;
        let total = summary.by_status.entry(status).or_default();
        total.count = u64::try_from(count).unwrap_or_default();
        total.amount = amount_at(row, 2)?;
    }
    Ok(summary)
}

fn require_admin(actor: &User, action: &str) -> Result<(), StoreError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!("only an admin can {action}")).into())
    }
}

impl Store {
    /// Admins see every log; everybody else only the logs they earned.
    pub fn list_commissions(
        &self,
        actor: &User,
        filter: &CommissionFilter,
    ) -> Result<Vec<CommissionLog>, StoreError> {
        let beneficiary = match (actor.role.is_admin(), filter.beneficiary) {
            (true, wanted) => wanted,
            (false, None) => Some(actor.id),
            (false, Some(wanted)) if wanted == actor.id => Some(wanted),
            (false, Some(wanted)) => {
                return Err(DomainError::forbidden(format!(
                    "commissions of user {wanted} are not visible to you"
                ))
                .into())
            }
        };

        let mut args: Vec<Value> = Vec::new();
        let mut sql = format!("SELECT {COMMISSION_COLUMNS} FROM commission_logs WHERE 1 = 1");
        if let Some(status) = filter.status {
            args.push(Value::Text(status.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", args.len()));
        }
        if let Some(beneficiary) = beneficiary {
            args.push(Value::Integer(beneficiary.get()));
            sql.push_str(&format!(" AND beneficiary_id = ?{}", args.len()));
        }
        args.push(Value::Integer(i64::from(filter.page.limit.clamp(1, MAX_PAGE_LIMIT))));
        sql.push_str(&format!(" ORDER BY id DESC LIMIT ?{}", args.len()));
        args.push(Value::Integer(i64::from(filter.page.offset)));
        sql.push_str(&format!(" OFFSET ?{}", args.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params_from_iter(args.iter()), commission_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Every log, oldest first, for operator exports.
    pub fn export_commissions(
        &self,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<CommissionLog>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMISSION_COLUMNS} FROM commission_logs
             WHERE ?1 IS NULL OR status = ?1 ORDER BY id"
        ))?;
        let logs = stmt
            .query_map(params![status.map(CommissionStatus::as_str)], commission_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn update_commission_status(
        &mut self,
        actor: &User,
        id: CommissionId,
        update: &CommissionUpdate,
    ) -> Result<CommissionLog, StoreError> {
        require_admin(actor, "change commission status")?;
        let now = self.now();
        let tx = self.conn.transaction()?;
        let log = load_commission(&tx, id)?;
        let (reference, note) = update.check_against(log.status)?;
        if update.status == CommissionStatus::Pending {
            let donation = load_donation(&tx, log.donation_id)?;
            if donation.status == DonationStatus::Refunded {
                return Err(DomainError::Conflict(format!(
                    "donation {} was refunded; commission {id} cannot be retried",
                    donation.id
                ))
                .into());
            }
        }
        tx.execute(
            "UPDATE commission_logs
             SET status = ?1,
                 payment_reference = COALESCE(?2, payment_reference),
                 note = COALESCE(?3, note),
                 updated_at = ?4
             WHERE id = ?5",
            params![update.status.as_str(), reference, note, now, id.get()],
        )?;
        let log = load_commission(&tx, id)?;
        tx.commit()?;
        Ok(log)
    }

    /// Marks every listed PENDING log PAID with one payment reference.
    /// Any log that is missing or not PENDING aborts the whole batch.
    pub fn record_payout(
        &mut self,
        actor: &User,
        ids: &[CommissionId],
        payment_reference: &str,
    ) -> Result<Vec<CommissionLog>, StoreError> {
        require_admin(actor, "record payouts")?;
        if ids.is_empty() {
            return Err(DomainError::invalid("commission_ids", "at least one id is required").into());
        }
        let unique: BTreeSet<CommissionId> = ids.iter().copied().collect();
        if unique.len() != ids.len() {
            return Err(DomainError::invalid("commission_ids", "ids must be unique").into());
        }
        let update = CommissionUpdate {
            status: CommissionStatus::Paid,
            payment_reference: Some(payment_reference.to_string()),
            note: None,
        };

        let now = self.now();
        let tx = self.conn.transaction()?;
        let mut paid = Vec::with_capacity(ids.len());
        for id in ids {
            let log = load_commission(&tx, *id)?;
            let (reference, _) = update.check_against(log.status)?;
            tx.execute(
                "UPDATE commission_logs SET status = ?1, payment_reference = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![CommissionStatus::Paid.as_str(), reference, now, id.get()],
            )?;
            paid.push(load_commission(&tx, *id)?);
        }
        tx.commit()?;
        Ok(paid)
    }

    /// Totals for `user`; visible to the user and to anybody managing them.
    pub fn commission_summary(
        &self,
        actor: &User,
        user: UserId,
    ) -> Result<CommissionSummary, StoreError> {
        if actor.id != user && !manages(&self.conn, actor, user)? {
            return Err(DomainError::forbidden(format!("user {user} is outside your team")).into());
        }
        summary_for(&self.conn, Some(user))
    }
}
