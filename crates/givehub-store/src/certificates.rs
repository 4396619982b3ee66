// SPDX-License-Identifier: Apache-2.0

use givehub_model::{
    CertificatePayload, CertificateRecord, DomainError, Donation, DonationId, DonationStatus,
    User,
};
use rusqlite::{params, Connection, OptionalExtension};

use crate::donations::{can_view_donation, load_donation};
use crate::{Store, StoreError};

/// A persisted issuance together with the payload it was hashed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub record: CertificateRecord,
    pub payload: CertificatePayload,
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CertificateRecord> {
    Ok(CertificateRecord {
        number: row.get(0)?,
        donation_id: DonationId(row.get(1)?),
        content_hash: row.get(2)?,
        organization: row.get(3)?,
        issued_at: row.get(4)?,
    })
}

fn find_for_donation(conn: &Connection, id: DonationId) -> Result<Option<CertificateRecord>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT number, donation_id, content_hash, organization, issued_at
             FROM certificates WHERE donation_id = ?1",
            params![id.get()],
            record_from_row,
        )
        .optional()?)
}

fn email_matches(donation: &Donation, email: Option<&str>) -> bool {
    email
        .map(str::trim)
        .is_some_and(|e| !e.is_empty() && e.eq_ignore_ascii_case(&donation.donor_email))
}

impl Store {
    /// Issues the certificate of a COMPLETED donation, or returns the
    /// existing issuance unchanged.
    pub fn issue_certificate(
        &mut self,
        id: DonationId,
        organization: &str,
    ) -> Result<Certificate, StoreError> {
        let now = self.now();
        let tx = self.conn.transaction()?;
        let donation = load_donation(&tx, id)?;
        if let Some(record) = find_for_donation(&tx, id)? {
            let payload = CertificatePayload::from_donation(&donation, &record.organization)?;
            return Ok(Certificate { record, payload });
        }
        let payload = CertificatePayload::from_donation(&donation, organization)?;
        let record = CertificateRecord {
            number: payload.number.clone(),
            donation_id: id,
            content_hash: payload.content_hash()?,
            organization: payload.organization.clone(),
            issued_at: now,
        };
        tx.execute(
            "INSERT INTO certificates (number, donation_id, content_hash, organization, issued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.number,
                id.get(),
                record.content_hash,
                record.organization,
                record.issued_at
            ],
        )?;
        tx.commit()?;
        tracing::debug!(number = %record.number, donation_id = %id, "certificate issued");
        Ok(Certificate { record, payload })
    }

    /// Issues the certificate for somebody allowed to see it: an admin, a
    /// user whose team referred the donation, or whoever knows the donor email.
    pub fn certificate_for(
        &mut self,
        actor: Option<&User>,
        email: Option<&str>,
        id: DonationId,
        organization: &str,
    ) -> Result<Certificate, StoreError> {
        let donation = load_donation(&self.conn, id)?;
        let allowed = match actor {
            Some(actor) if can_view_donation(&self.conn, actor, &donation)? => true,
            _ => email_matches(&donation, email),
        };
        if !allowed {
            return Err(DomainError::forbidden(format!(
                "certificate of donation {id} is not available to you"
            ))
            .into());
        }
        self.issue_certificate(id, organization)
    }

    /// True iff certificate `number` exists with exactly `hash` and its
    /// donation has not been refunded since issuance.
    pub fn verify_certificate(&self, number: &str, hash: &str) -> Result<bool, StoreError> {
        let stored: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT c.content_hash, d.status FROM certificates c
                 JOIN donations d ON d.id = c.donation_id
                 WHERE c.number = ?1",
                params![number.trim()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(stored.is_some_and(|(stored_hash, status)| {
            status != DonationStatus::Refunded.as_str()
                && stored_hash.eq_ignore_ascii_case(hash.trim())
        }))
    }
}
