// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::canonical::sha256_hex;

pub const TOKEN_BYTES: usize = 32;

#[derive(Debug)]
pub struct TokenError(pub String);

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token generation failed: {}", self.0)
    }
}

impl std::error::Error for TokenError {}

/// Fresh bearer token as lowercase hex. Only its digest is ever persisted.
pub fn generate_token() -> Result<String, TokenError> {
    let mut buf = [0_u8; TOKEN_BYTES];
    getrandom::getrandom(&mut buf).map_err(|e| TokenError(e.to_string()))?;
    Ok(hex::encode(buf))
}

#[must_use]
pub fn token_digest(token: &str) -> String {
    sha256_hex(token.trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_hex_and_distinct() {
        let a = generate_token().expect("token a");
        let b = generate_token().expect("token b");
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_ignores_surrounding_whitespace() {
        assert_eq!(token_digest("abc"), token_digest(" abc\n"));
        assert_ne!(token_digest("abc"), token_digest("abd"));
    }
}
