// SPDX-License-Identifier: Apache-2.0

use givehub_model::{
    distribute, highlight_name, validate_donation_form, CommissionLog, CommissionPolicy,
    CommissionStatus, Donation, DonationForm, DonationId, DonationLimits, DonationStatus,
    DomainError, DonorHighlight, User, CURRENCY,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::commissions::commissions_for_donation;
use crate::rows::{amount_at, amount_sql, donation_from_row, DONATION_COLUMNS, TEAM_CTE};
use crate::users::{active_referrer, in_team, referral_chain};
use crate::{DonationFilter, Store, StoreError, MAX_PAGE_LIMIT};

pub const DEFAULT_HIGHLIGHTS: u32 = 10;
pub const MAX_HIGHLIGHTS: u32 = 50;
const REFERENCE_MAX_LEN: usize = 128;

/// Outcome of completing a donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub donation: Donation,
    pub commissions: Vec<CommissionLog>,
    /// The donation was already completed with the same payment reference.
    pub replayed: bool,
}

pub(crate) fn find_donation(conn: &Connection, id: DonationId) -> Result<Option<Donation>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {DONATION_COLUMNS} FROM donations WHERE id = ?1"),
            params![id.get()],
            donation_from_row,
        )
        .optional()?)
}

pub(crate) fn load_donation(conn: &Connection, id: DonationId) -> Result<Donation, StoreError> {
    find_donation(conn, id)?.ok_or_else(|| DomainError::not_found("donation", id).into())
}

/// Admins see every donation; others see those referred inside their team.
pub(crate) fn can_view_donation(
    conn: &Connection,
    actor: &User,
    donation: &Donation,
) -> Result<bool, StoreError> {
    if actor.role.is_admin() {
        return Ok(true);
    }
    match donation.referrer_id {
        Some(referrer) => in_team(conn, actor.id, referrer),
        None => Ok(false),
    }
}

fn clean_reference(raw: &str) -> Result<String, DomainError> {
    let reference = raw.trim();
    if reference.is_empty() {
        return Err(DomainError::invalid("payment_reference", "must not be empty"));
    }
    if reference.len() > REFERENCE_MAX_LEN || reference.chars().any(char::is_control) {
        return Err(DomainError::invalid(
            "payment_reference",
            format!("must be at most {REFERENCE_MAX_LEN} printable characters"),
        ));
    }
    Ok(reference.to_string())
}

impl Store {
    /// Validates the public form and records a PENDING donation.
    pub fn create_donation(
        &mut self,
        form: DonationForm,
        limits: &DonationLimits,
    ) -> Result<Donation, StoreError> {
        let valid = validate_donation_form(form, limits)?;
        let referrer = valid
            .referral_code
            .as_ref()
            .map(|code| active_referrer(&self.conn, code))
            .transpose()?;
        let now = self.now();
        self.conn.execute(
            "INSERT INTO donations (donor_name, donor_email, donor_phone, donor_pan, amount, currency,
               referral_code, referrer_id, message, display_publicly, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                valid.donor_name,
                valid.donor_email,
                valid.donor_phone,
                valid.donor_pan,
                amount_sql(valid.amount)?,
                CURRENCY,
                valid.referral_code.as_ref().map(|c| c.as_str().to_string()),
                referrer.as_ref().map(|u| u.id.get()),
                valid.message,
                valid.display_publicly,
                DonationStatus::Pending.as_str(),
                now
            ],
        )?;
        load_donation(&self.conn, DonationId(self.conn.last_insert_rowid()))
    }

    pub fn get_donation(&self, id: DonationId) -> Result<Donation, StoreError> {
        load_donation(&self.conn, id)
    }

    pub fn view_donation(&self, actor: &User, id: DonationId) -> Result<Donation, StoreError> {
        let donation = load_donation(&self.conn, id)?;
        if !can_view_donation(&self.conn, actor, &donation)? {
            return Err(DomainError::forbidden(format!("donation {id} is outside your team")).into());
        }
        Ok(donation)
    }

    /// PENDING → COMPLETED, writing the commission logs in the same
    /// transaction. Replaying the same payment reference is a no-op.
    pub fn complete_donation(
        &mut self,
        id: DonationId,
        payment_reference: &str,
        policy: &CommissionPolicy,
    ) -> Result<Completion, StoreError> {
        let reference = clean_reference(payment_reference)?;
        let now = self.now();
        let tx = self.conn.transaction()?;
        let donation = load_donation(&tx, id)?;

        if donation.status == DonationStatus::Completed
            && donation.payment_reference.as_deref() == Some(reference.as_str())
        {
            let commissions = commissions_for_donation(&tx, id)?;
            return Ok(Completion {
                donation,
                commissions,
                replayed: true,
            });
        }
        donation.status.ensure_transition(DonationStatus::Completed)?;

        tx.execute(
            "UPDATE donations SET status = ?1, payment_reference = ?2, completed_at = ?3 WHERE id = ?4",
            params![DonationStatus::Completed.as_str(), reference, now, id.get()],
        )?;
        if let Some(referrer) = donation.referrer_id {
            let chain = referral_chain(&tx, referrer)?;
            for share in distribute(donation.amount, &chain, policy) {
                tx.execute(
                    "INSERT INTO commission_logs (donation_id, beneficiary_id, depth, rate_bps, amount,
                       status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    params![
                        id.get(),
                        share.beneficiary_id.get(),
                        share.depth,
                        share.rate_bps,
                        amount_sql(share.amount)?,
                        CommissionStatus::Pending.as_str(),
                        now
                    ],
                )?;
            }
        }
        let commissions = commissions_for_donation(&tx, id)?;
        let donation = load_donation(&tx, id)?;
        tx.commit()?;
        Ok(Completion {
            donation,
            commissions,
            replayed: false,
        })
    }

    /// PENDING → FAILED. Failing an already failed donation changes nothing.
    pub fn fail_donation(
        &mut self,
        id: DonationId,
        payment_reference: Option<&str>,
    ) -> Result<Donation, StoreError> {
        let reference = payment_reference
            .filter(|r| !r.trim().is_empty())
            .map(clean_reference)
            .transpose()?;
        let donation = load_donation(&self.conn, id)?;
        if donation.status == DonationStatus::Failed {
            return Ok(donation);
        }
        donation.status.ensure_transition(DonationStatus::Failed)?;
        self.conn.execute(
            "UPDATE donations SET status = ?1, payment_reference = COALESCE(?2, payment_reference)
             WHERE id = ?3",
            params![DonationStatus::Failed.as_str(), reference, id.get()],
        )?;
        load_donation(&self.conn, id)
    }

    /// COMPLETED → REFUNDED. PENDING commission logs of the donation are
    /// cancelled; the count of cancelled logs is returned.
    pub fn refund_donation(&mut self, id: DonationId) -> Result<(Donation, usize), StoreError> {
        let now = self.now();
        let tx = self.conn.transaction()?;
        let donation = load_donation(&tx, id)?;
        donation.status.ensure_transition(DonationStatus::Refunded)?;
        tx.execute(
            "UPDATE donations SET status = ?1 WHERE id = ?2",
            params![DonationStatus::Refunded.as_str(), id.get()],
        )?;
        let cancelled = tx.execute(
            "UPDATE commission_logs
             SET status = ?1, updated_at = ?2, note = COALESCE(note, 'donation refunded')
             WHERE donation_id = ?3 AND status = ?4",
            params![
                CommissionStatus::Cancelled.as_str(),
                now,
                id.get(),
                CommissionStatus::Pending.as_str()
            ],
        )?;
        let donation = load_donation(&tx, id)?;
        tx.commit()?;
        Ok((donation, cancelled))
    }

    /// Newest first, scoped to what `actor` may see.
    pub fn list_donations(
        &self,
        actor: &User,
        filter: &DonationFilter,
    ) -> Result<Vec<Donation>, StoreError> {
        let mut args: Vec<Value> = Vec::new();
        let mut sql = if actor.role.is_admin() {
            format!("SELECT {DONATION_COLUMNS} FROM donations WHERE 1 = 1")
        } else {
            args.push(Value::Integer(actor.id.get()));
            format!(
                "{TEAM_CTE} SELECT {DONATION_COLUMNS} FROM donations
                 WHERE referrer_id IN (SELECT id FROM team)"
            )
        };
        if let Some(status) = filter.status {
            args.push(Value::Text(status.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", args.len()));
        }
        if let Some(referrer) = filter.referrer {
            if !actor.role.is_admin() && !in_team(&self.conn, actor.id, referrer)? {
                return Err(
                    DomainError::forbidden(format!("user {referrer} is outside your team")).into(),
                );
            }
            args.push(Value::Integer(referrer.get()));
            sql.push_str(&format!(" AND referrer_id = ?{}", args.len()));
        }
        args.push(Value::Integer(i64::from(filter.page.limit.clamp(1, MAX_PAGE_LIMIT))));
        sql.push_str(&format!(" ORDER BY id DESC LIMIT ?{}", args.len()));
        args.push(Value::Integer(i64::from(filter.page.offset)));
        sql.push_str(&format!(" OFFSET ?{}", args.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let donations = stmt
            .query_map(params_from_iter(args.iter()), donation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(donations)
    }

    /// Largest public completed donations, most recent first on ties.
    pub fn donor_highlights(&self, limit: u32) -> Result<Vec<DonorHighlight>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT donor_name, amount, message, completed_at FROM donations
             WHERE status = ?1 AND display_publicly = 1 AND completed_at IS NOT NULL
             ORDER BY amount DESC, completed_at DESC, id DESC
             LIMIT ?2",
        )?;
        let highlights = stmt
            .query_map(
                params![
                    DonationStatus::Completed.as_str(),
                    i64::from(limit.clamp(1, MAX_HIGHLIGHTS))
                ],
                |row| {
                    let name: String = row.get(0)?;
                    Ok(DonorHighlight {
                        donor: highlight_name(&name),
                        amount: amount_at(row, 1)?,
                        message: row.get(2)?,
                        completed_at: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(highlights)
    }
}
