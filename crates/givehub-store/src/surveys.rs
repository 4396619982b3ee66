// SPDX-License-Identifier: Apache-2.0

use givehub_model::{
    validate_answers, DomainError, NewSurveyForm, ReferralCode, SubmissionId, SurveyForm,
    SurveySubmission, User,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::rows::{form_from_row, submission_from_row, SUBMISSION_COLUMNS, TEAM_CTE};
use crate::users::active_referrer;
use crate::{Page, Store, StoreError, MAX_PAGE_LIMIT};

const FORM_COLUMNS: &str = "slug, title, fields_json, active, created_at";

fn find_form(conn: &Connection, slug: &str) -> Result<Option<SurveyForm>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {FORM_COLUMNS} FROM survey_forms WHERE slug = ?1"),
            params![slug],
            form_from_row,
        )
        .optional()?)
}

fn load_form(conn: &Connection, slug: &str) -> Result<SurveyForm, StoreError> {
    find_form(conn, slug)?.ok_or_else(|| DomainError::not_found("survey", slug).into())
}

impl Store {
    pub fn create_form(&mut self, actor: &User, new: NewSurveyForm) -> Result<SurveyForm, StoreError> {
        if !actor.role.is_admin() {
            return Err(DomainError::forbidden("only an admin can create surveys").into());
        }
        let new = new.validate()?;
        if find_form(&self.conn, &new.slug)?.is_some() {
            return Err(DomainError::Conflict(format!("survey `{}` already exists", new.slug)).into());
        }
        self.conn.execute(
            "INSERT INTO survey_forms (slug, title, fields_json, active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                new.slug,
                new.title,
                serde_json::to_string(&new.fields)?,
                self.now()
            ],
        )?;
        load_form(&self.conn, &new.slug)
    }

    pub fn get_form(&self, slug: &str) -> Result<SurveyForm, StoreError> {
        load_form(&self.conn, slug)
    }

    /// Opens or closes a form for public submissions.
    pub fn set_form_active(
        &mut self,
        actor: &User,
        slug: &str,
        active: bool,
    ) -> Result<SurveyForm, StoreError> {
        if !actor.role.is_admin() {
            return Err(DomainError::forbidden("only an admin can change surveys").into());
        }
        load_form(&self.conn, slug)?;
        self.conn.execute(
            "UPDATE survey_forms SET active = ?1 WHERE slug = ?2",
            params![active, slug],
        )?;
        load_form(&self.conn, slug)
    }

    /// Public submission, optionally attributed through a referral code.
    pub fn submit_survey(
        &mut self,
        slug: &str,
        answers: &Value,
        referral_code: Option<&str>,
    ) -> Result<SurveySubmission, StoreError> {
        let form = load_form(&self.conn, slug)?;
        if !form.active {
            return Err(DomainError::Conflict(format!("survey `{slug}` is closed")).into());
        }
        let normalized = validate_answers(&form, answers)?;
        let referrer = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => Some(active_referrer(&self.conn, &ReferralCode::parse(raw)?)?),
            None => None,
        };
        self.conn.execute(
            "INSERT INTO survey_submissions (form_slug, answers_json, referrer_id, submitted_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                form.slug,
                serde_json::to_string(&Value::Object(normalized))?,
                referrer.as_ref().map(|u| u.id.get()),
                self.now()
            ],
        )?;
        let id = SubmissionId(self.conn.last_insert_rowid());
        Ok(self.conn.query_row(
            &format!("SELECT {SUBMISSION_COLUMNS} FROM survey_submissions WHERE id = ?1"),
            params![id.get()],
            submission_from_row,
        )?)
    }

    /// Admins see every submission; coordinators those attributed to their team.
    pub fn list_submissions(
        &self,
        actor: &User,
        slug: &str,
        page: Page,
    ) -> Result<Vec<SurveySubmission>, StoreError> {
        load_form(&self.conn, slug)?;
        let limit = i64::from(page.limit.clamp(1, MAX_PAGE_LIMIT));
        let offset = i64::from(page.offset);
        let submissions = if actor.role.is_admin() {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {SUBMISSION_COLUMNS} FROM survey_submissions WHERE form_slug = ?1
                 ORDER BY id DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(params![slug, limit, offset], submission_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "{TEAM_CTE} SELECT {SUBMISSION_COLUMNS} FROM survey_submissions
                 WHERE form_slug = ?2 AND referrer_id IN (SELECT id FROM team)
                 ORDER BY id DESC LIMIT ?3 OFFSET ?4"
            ))?;
            let rows = stmt
                .query_map(params![actor.id.get(), slug, limit, offset], submission_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        Ok(submissions)
    }
}
