// SPDX-License-Identifier: Apache-2.0

//! Donation certificates.
//!
//! A certificate is derived entirely from a COMPLETED donation plus the
//! organization name. Its content hash covers the canonical JSON form of the
//! payload, so a printed copy can be checked against the stored issuance.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::donation::{Donation, DonationStatus};
use crate::error::DomainError;
use crate::ids::DonationId;
use crate::money::{format_inr, Amount};
use crate::time::{format_date, year_of};

pub const CERTIFICATE_PREFIX: &str = "GH";

/// `GH-<completion year>-<donation id, six digits>`.
#[must_use]
pub fn certificate_number(donation_id: DonationId, completed_at: i64) -> String {
    format!(
        "{CERTIFICATE_PREFIX}-{:04}-{:06}",
        year_of(completed_at),
        donation_id.get()
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePayload {
    pub number: String,
    pub donation_id: DonationId,
    pub donor_name: String,
    pub donor_pan_masked: Option<String>,
    pub amount: Amount,
    pub amount_display: String,
    pub currency: String,
    pub completed_on: String,
    pub organization: String,
}

impl CertificatePayload {
    pub fn from_donation(donation: &Donation, organization: &str) -> Result<Self, DomainError> {
        let completed_at = match (donation.status, donation.completed_at) {
            (DonationStatus::Completed, Some(ts)) => ts,
            _ => {
                return Err(DomainError::Conflict(format!(
                    "donation {} is {} and has no certificate",
                    donation.id, donation.status
                )))
            }
        };
        Ok(Self {
            number: certificate_number(donation.id, completed_at),
            donation_id: donation.id,
            donor_name: donation.donor_name.clone(),
            donor_pan_masked: donation.donor_pan.as_deref().map(mask_pan),
            amount: donation.amount,
            amount_display: format_inr(donation.amount),
            currency: donation.currency.clone(),
            completed_on: format_date(completed_at),
            organization: organization.to_string(),
        })
    }

    /// SHA-256 hex over the key-sorted JSON of the payload.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        givehub_core::stable_json_hash_hex(self)
    }
}

/// Persisted issuance of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub number: String,
    pub donation_id: DonationId,
    pub content_hash: String,
    pub organization: String,
    pub issued_at: i64,
}

/// Keeps the last four characters; everything before becomes `*`.
#[must_use]
pub fn mask_pan(pan: &str) -> String {
    let chars: Vec<char> = pan.trim().chars().collect();
    let keep = chars.len().min(4);
    let mut out = "*".repeat(chars.len() - keep);
    out.extend(&chars[chars.len() - keep..]);
    out
}

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Renders a standalone HTML page for the certificate.
#[must_use]
pub fn render_certificate_html(payload: &CertificatePayload, content_hash: &str) -> String {
    let org = escape_html(&payload.organization);
    let mut html = String::with_capacity(2048);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        html,
        "<title>Donation certificate {}</title>",
        escape_html(&payload.number)
    );
    html.push_str(
        "<style>body{font-family:serif;max-width:720px;margin:40px auto;padding:32px;\
         border:4px double #444}h1{text-align:center}dt{font-weight:bold}\
         .hash{font-family:monospace;font-size:11px;word-break:break-all}</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{org}</h1>");
    html.push_str("<h2>Certificate of Donation</h2>\n<dl>\n");
    let mut row = |label: &str, value: &str| {
        let _ = writeln!(html, "<dt>{label}</dt><dd>{}</dd>", escape_html(value));
    };
    row("Certificate number", &payload.number);
    row("Donor", &payload.donor_name);
    if let Some(pan) = &payload.donor_pan_masked {
        row("PAN", pan);
    }
    row("Amount", &payload.amount_display);
    row("Currency", &payload.currency);
    row("Received on", &payload.completed_on);
    html.push_str("</dl>\n");
    let _ = writeln!(
        html,
        "<p>{org} gratefully acknowledges the donation described above.</p>"
    );
    let _ = writeln!(
        html,
        "<p class=\"hash\">Verification hash: {}</p>",
        escape_html(content_hash)
    );
    html.push_str("</body>\n</html>\n");
    html
}
