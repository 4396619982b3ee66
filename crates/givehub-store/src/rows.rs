// SPDX-License-Identifier: Apache-2.0

//! Column lists and row decoders shared by the query modules.

use std::str::FromStr;

use givehub_model::{
    Amount, CommissionId, CommissionLog, Donation, DonationId, Period, ReferralCode,
    SubmissionId, SurveyForm, SurveySubmission, Target, TargetId, User, UserId,
};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::StoreError;

pub(crate) const USER_COLUMNS: &str =
    "id, name, email, phone, role, parent_id, referral_code, active, created_at";

pub(crate) const DONATION_COLUMNS: &str = "id, donor_name, donor_email, donor_phone, donor_pan, \
     amount, currency, referral_code, referrer_id, message, display_publicly, status, \
     payment_reference, created_at, completed_at";

pub(crate) const COMMISSION_COLUMNS: &str = "id, donation_id, beneficiary_id, depth, rate_bps, \
     amount, status, payment_reference, note, created_at, updated_at";

pub(crate) const TARGET_COLUMNS: &str = "id, user_id, assigned_by, parent_target_id, title, \
     amount, period_start, period_end, created_at";

pub(crate) const SUBMISSION_COLUMNS: &str =
    "id, form_slug, answers_json, referrer_id, submitted_at";

/// Recursive CTE binding `team(id)` to `?1` and every user below it.
pub(crate) const TEAM_CTE: &str = "WITH RECURSIVE team(id) AS (
    SELECT ?1
    UNION ALL
    SELECT u.id FROM users u JOIN team t ON u.parent_id = t.id
)";

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, Type::Text, e))
}

pub(crate) fn amount_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Amount> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw)
        .map(Amount::from_minor)
        .map_err(|e| conversion_error(idx, Type::Integer, e))
}

fn u32_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw).map_err(|e| conversion_error(idx, Type::Integer, e))
}

pub(crate) fn amount_sql(amount: Amount) -> Result<i64, StoreError> {
    i64::try_from(amount.minor())
        .map_err(|_| StoreError::Corrupt(format!("amount {} exceeds storage range", amount.minor())))
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let code: String = row.get(6)?;
    Ok(User {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role: parsed(row, 4)?,
        parent_id: row.get::<_, Option<i64>>(5)?.map(UserId),
        referral_code: ReferralCode::parse(&code).map_err(|e| conversion_error(6, Type::Text, e))?,
        active: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn donation_from_row(row: &Row<'_>) -> rusqlite::Result<Donation> {
    let code: Option<String> = row.get(7)?;
    Ok(Donation {
        id: DonationId(row.get(0)?),
        donor_name: row.get(1)?,
        donor_email: row.get(2)?,
        donor_phone: row.get(3)?,
        donor_pan: row.get(4)?,
        amount: amount_at(row, 5)?,
        currency: row.get(6)?,
        referral_code: code
            .map(|c| ReferralCode::parse(&c))
            .transpose()
            .map_err(|e| conversion_error(7, Type::Text, e))?,
        referrer_id: row.get::<_, Option<i64>>(8)?.map(UserId),
        message: row.get(9)?,
        display_publicly: row.get(10)?,
        status: parsed(row, 11)?,
        payment_reference: row.get(12)?,
        created_at: row.get(13)?,
        completed_at: row.get(14)?,
    })
}

pub(crate) fn commission_from_row(row: &Row<'_>) -> rusqlite::Result<CommissionLog> {
    Ok(CommissionLog {
        id: CommissionId(row.get(0)?),
        donation_id: DonationId(row.get(1)?),
        beneficiary_id: UserId(row.get(2)?),
        depth: u32_at(row, 3)?,
        rate_bps: u32_at(row, 4)?,
        amount: amount_at(row, 5)?,
        status: parsed(row, 6)?,
        payment_reference: row.get(7)?,
        note: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(crate) fn target_from_row(row: &Row<'_>) -> rusqlite::Result<Target> {
    Ok(Target {
        id: TargetId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        assigned_by: UserId(row.get(2)?),
        parent_target_id: row.get::<_, Option<i64>>(3)?.map(TargetId),
        title: row.get(4)?,
        amount: amount_at(row, 5)?,
        period: Period {
            start: row.get(6)?,
            end: row.get(7)?,
        },
        created_at: row.get(8)?,
    })
}

pub(crate) fn form_from_row(row: &Row<'_>) -> rusqlite::Result<SurveyForm> {
    let fields_json: String = row.get(2)?;
    Ok(SurveyForm {
        slug: row.get(0)?,
        title: row.get(1)?,
        fields: serde_json::from_str(&fields_json)
            .map_err(|e| conversion_error(2, Type::Text, e))?,
        active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<SurveySubmission> {
    let answers_json: String = row.get(2)?;
    Ok(SurveySubmission {
        id: SubmissionId(row.get(0)?),
        form_slug: row.get(1)?,
        answers: serde_json::from_str(&answers_json)
            .map_err(|e| conversion_error(2, Type::Text, e))?,
        referrer_id: row.get::<_, Option<i64>>(3)?.map(UserId),
        submitted_at: row.get(4)?,
    })
}
