// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, ValidationError};
use crate::ids::{DonationId, UserId};
use crate::money::Amount;
use crate::user::{normalize_email, normalize_name, normalize_phone, ReferralCode};

pub const MESSAGE_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl DonationStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Completed, Self::Failed, Self::Refunded];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Completed, Self::Refunded)
        )
    }

    pub fn ensure_transition(self, next: Self) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::transition("donation", self, next))
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| ValidationError::new("status", format!("unknown donation status `{s}`")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub donor_pan: Option<String>,
    pub amount: Amount,
    pub currency: String,
    pub referral_code: Option<ReferralCode>,
    pub referrer_id: Option<UserId>,
    pub message: Option<String>,
    pub display_publicly: bool,
    pub status: DonationStatus,
    pub payment_reference: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Public donation form as posted by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DonationForm {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    #[serde(default)]
    pub donor_pan: Option<String>,
    pub amount: Amount,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub display_publicly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationLimits {
    pub min_amount: Amount,
    pub max_amount: Amount,
}

impl Default for DonationLimits {
    fn default() -> Self {
        Self {
            min_amount: Amount::from_minor(1_000),
            max_amount: Amount::from_minor(100_000_000),
        }
    }
}

/// A form that passed validation, with every field normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDonation {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub donor_pan: Option<String>,
    pub amount: Amount,
    pub referral_code: Option<ReferralCode>,
    pub message: Option<String>,
    pub display_publicly: bool,
}

pub fn validate_donation_form(
    form: DonationForm,
    limits: &DonationLimits,
) -> Result<ValidDonation, DomainError> {
    let mut errors = Vec::new();

    let donor_name = normalize_name("donor_name", &form.donor_name)
        .map_err(|e| errors.push(e))
        .ok();
    let donor_email = normalize_email(&form.donor_email)
        .map_err(|e| errors.push(ValidationError::new("donor_email", e.reason)))
        .ok();
    let donor_phone = normalize_phone("donor_phone", &form.donor_phone)
        .map_err(|e| errors.push(e))
        .ok();

    let donor_pan = match form.donor_pan.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match normalize_pan(raw) {
            Ok(pan) => Some(pan),
            Err(e) => {
                errors.push(e);
                None
            }
        },
    };

    if form.amount < limits.min_amount
        || form.amount > limits.max_amount
        || !form.amount.is_storable()
    {
        errors.push(ValidationError::new(
            "amount",
            format!(
                "must be between {} and {} paise",
                limits.min_amount.minor(),
                limits.max_amount.minor()
            ),
        ));
    }

    let referral_code = match form.referral_code.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match ReferralCode::parse(raw) {
            Ok(code) => Some(code),
            Err(e) => {
                errors.push(e);
                None
            }
        },
    };

    let message = form
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    if message
        .as_ref()
        .is_some_and(|m| m.chars().count() > MESSAGE_MAX_LEN)
    {
        errors.push(ValidationError::new(
            "message",
            format!("must be at most {MESSAGE_MAX_LEN} characters"),
        ));
    }

    match (donor_name, donor_email, donor_phone) {
        (Some(donor_name), Some(donor_email), Some(donor_phone)) if errors.is_empty() => {
            Ok(ValidDonation {
                donor_name,
                donor_email,
                donor_phone,
                donor_pan,
                amount: form.amount,
                referral_code,
                message,
                display_publicly: form.display_publicly,
            })
        }
        _ => Err(DomainError::Validation(errors)),
    }
}

/// Indian PAN: five letters, four digits, one letter.
pub fn normalize_pan(raw: &str) -> Result<String, ValidationError> {
    let pan = raw.trim().to_ascii_uppercase();
    let bytes = pan.as_bytes();
    let valid = bytes.len() == 10
        && bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase();
    if valid {
        Ok(pan)
    } else {
        Err(ValidationError::new("donor_pan", "must match AAAAA9999A"))
    }
}

/// Public carousel entry; never carries contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorHighlight {
    pub donor: String,
    pub amount: Amount,
    pub message: Option<String>,
    pub completed_at: i64,
}

/// `"Asha Kumari Rao"` becomes `"Asha R."`; single names stay as they are.
#[must_use]
pub fn highlight_name(full_name: &str) -> String {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or("Anonymous");
    match parts.last().and_then(|last| last.chars().next()) {
        Some(initial) => format!("{first} {}.", initial.to_uppercase()),
        None => first.to_string(),
    }
}
