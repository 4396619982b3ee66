// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use givehub_core::TokenError;
use givehub_model::DomainError;

#[derive(Debug)]
pub enum StoreError {
    /// A rule of the domain rejected the operation.
    Domain(DomainError),
    Sqlite(rusqlite::Error),
    Encoding(serde_json::Error),
    Token(TokenError),
    Io(std::io::Error),
    /// A stored row no longer satisfies the schema's invariants.
    Corrupt(String),
}

impl StoreError {
    #[must_use]
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(err) => Display::fmt(err, f),
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Encoding(err) => write!(f, "json encoding error: {err}"),
            Self::Token(err) => Display::fmt(err, f),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Corrupt(message) => write!(f, "corrupt row: {message}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::Token(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Corrupt(_) => None,
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}

impl From<givehub_model::ValidationError> for StoreError {
    fn from(value: givehub_model::ValidationError) -> Self {
        Self::Domain(value.into())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

impl From<TokenError> for StoreError {
    fn from(value: TokenError) -> Self {
        Self::Token(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
