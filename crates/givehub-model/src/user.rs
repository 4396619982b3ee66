// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use givehub_core::sha256_hex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, ValidationError};
use crate::ids::UserId;
use crate::role::Role;

pub const NAME_MAX_LEN: usize = 120;
pub const EMAIL_MAX_LEN: usize = 254;
const REFERRAL_MIN_LEN: usize = 6;
const REFERRAL_MAX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub parent_id: Option<UserId>,
    pub referral_code: ReferralCode,
    pub active: bool,
    pub created_at: i64,
}

impl User {
    #[must_use]
    pub fn public_referral(&self) -> PublicReferral {
        PublicReferral {
            name: self.name.clone(),
            role: self.role,
            referral_code: self.referral_code.clone(),
        }
    }
}

/// What the public donation form may learn about a referral code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicReferral {
    pub name: String,
    pub role: Role,
    pub referral_code: ReferralCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub parent_id: Option<UserId>,
}

impl NewUser {
    /// Normalizes every field, reporting all problems at once.
    pub fn validate(self) -> Result<Self, DomainError> {
        let mut errors = Vec::new();
        let name = normalize_name("name", &self.name).map_err(|e| errors.push(e)).ok();
        let email = normalize_email(&self.email).map_err(|e| errors.push(e)).ok();
        let phone = normalize_phone("phone", &self.phone)
            .map_err(|e| errors.push(e))
            .ok();
        if self.role.is_admin() {
            errors.push(ValidationError::new(
                "role",
                "admins can only be created by bootstrap",
            ));
        }
        match (name, email, phone) {
            (Some(name), Some(email), Some(phone)) if errors.is_empty() => Ok(Self {
                name,
                email,
                phone,
                role: self.role,
                parent_id: self.parent_id,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubordinateScope {
    #[default]
    Direct,
    All,
}

impl FromStr for SubordinateScope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "direct" => Ok(Self::Direct),
            "all" => Ok(Self::All),
            other => Err(ValidationError::new(
                "scope",
                format!("expected `direct` or `all`, got `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferralCode(String);

impl ReferralCode {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() < REFERRAL_MIN_LEN || code.len() > REFERRAL_MAX_LEN {
            return Err(ValidationError::new(
                "referral_code",
                format!("must be {REFERRAL_MIN_LEN}..={REFERRAL_MAX_LEN} characters"),
            ));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::new(
                "referral_code",
                "must contain only [A-Z0-9]",
            ));
        }
        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReferralCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferralCode> for String {
    fn from(value: ReferralCode) -> Self {
        value.0
    }
}

/// Role prefix plus eight hex digits of `sha256(email|created_at|nonce)`.
/// Callers bump `nonce` when the store reports a collision.
#[must_use]
pub fn derive_referral_code(role: Role, email: &str, created_at: i64, nonce: u32) -> ReferralCode {
    let digest = sha256_hex(format!("{email}|{created_at}|{nonce}").as_bytes());
    ReferralCode(format!(
        "{}{}",
        role.referral_prefix(),
        digest[..8].to_ascii_uppercase()
    ))
}

pub fn normalize_name(field: &str, raw: &str) -> Result<String, ValidationError> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if collapsed.chars().count() > NAME_MAX_LEN {
        return Err(ValidationError::new(
            field,
            format!("must be at most {NAME_MAX_LEN} characters"),
        ));
    }
    if collapsed.chars().any(char::is_control) {
        return Err(ValidationError::new(field, "must not contain control characters"));
    }
    Ok(collapsed)
}

pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.len() > EMAIL_MAX_LEN {
        return Err(ValidationError::new(
            "email",
            format!("must be at most {EMAIL_MAX_LEN} characters"),
        ));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::new("email", "must contain `@`"));
    };
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("email", "is not a valid address"));
    }
    Ok(email)
}

/// Strips spaces and dashes; keeps an optional leading `+`.
pub fn normalize_phone(field: &str, raw: &str) -> Result<String, ValidationError> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if digits.len() < 10 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(field, "must be 10 to 15 digits"));
    }
    Ok(compact)
}

/// Checks hierarchy placement for a new user under `parent`.
///
/// `parent_in_actor_subtree` must be true when `parent` is the actor itself or
/// one of the actor's descendants; the caller resolves that against the store.
pub fn check_new_user_placement(
    actor: &User,
    parent: &User,
    parent_in_actor_subtree: bool,
    role: Role,
) -> Result<(), DomainError> {
    if !actor.role.can_manage(role) {
        return Err(DomainError::forbidden(format!(
            "{} cannot create {}",
            actor.role, role
        )));
    }
    if !actor.role.is_admin() && !parent_in_actor_subtree {
        return Err(DomainError::forbidden(
            "parent must be yourself or one of your subordinates",
        ));
    }
    if !parent.active {
        return Err(DomainError::Conflict(format!(
            "parent user {} is inactive",
            parent.id
        )));
    }
    if !parent.role.can_manage(role) {
        return Err(DomainError::invalid(
            "parent_id",
            format!("{} cannot be placed under {}", role, parent.role),
        ));
    }
    Ok(())
}
