// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Shared primitives for the givehub workspace: machine-readable errors,
//! process exit codes, hashing, canonical JSON and filesystem defaults.

pub mod canonical;
mod errors;
mod paths;
mod token;

pub use canonical::{sha256_hex, stable_json_bytes, stable_json_hash_hex};
pub use errors::{ExitCode, MachineError};
pub use paths::{resolve_db_path, resolve_db_path_with};
pub use token::{generate_token, token_digest, TokenError, TOKEN_BYTES};

pub const CRATE_NAME: &str = "givehub-core";

pub const ENV_GIVEHUB_DB_PATH: &str = "GIVEHUB_DB_PATH";
pub const ENV_GIVEHUB_LOG_JSON: &str = "GIVEHUB_LOG_JSON";
pub const ENV_GIVEHUB_ORG_NAME: &str = "GIVEHUB_ORG_NAME";

/// Organization printed on certificates when none is configured.
pub const DEFAULT_ORGANIZATION: &str = "GiveHub Foundation";
