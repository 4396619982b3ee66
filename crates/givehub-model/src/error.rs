// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::money::Amount;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DomainError {
    Validation(Vec<ValidationError>),
    Forbidden(String),
    NotFound {
        entity: &'static str,
        id: String,
    },
    Conflict(String),
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
    TargetOverflow {
        parent: Amount,
        allocated: Amount,
        requested: Amount,
    },
    UnknownReferralCode(String),
}

impl DomainError {
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationError::new(field, reason)])
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn transition(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<ValidationError> for DomainError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(vec![value])
    }
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => {
                let joined = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "validation failed: {joined}")
            }
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} `{id}` not found"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InvalidTransition { entity, from, to } => {
                write!(f, "{entity} cannot move from {from} to {to}")
            }
            Self::TargetOverflow {
                parent,
                allocated,
                requested,
            } => write!(
                f,
                "division exceeds target: parent {} already allocated {} requested {}",
                parent.minor(),
                allocated.minor(),
                requested.minor()
            ),
            Self::UnknownReferralCode(code) => write!(f, "unknown referral code `{code}`"),
        }
    }
}

impl std::error::Error for DomainError {}
