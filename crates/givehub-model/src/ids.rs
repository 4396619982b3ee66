// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! row_id {
    ($name:ident, $field:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().parse::<i64>() {
                    Ok(v) if v > 0 => Ok(Self(v)),
                    _ => Err(ValidationError::new($field, "must be a positive integer")),
                }
            }
        }
    };
}

row_id!(UserId, "user_id");
row_id!(DonationId, "donation_id");
row_id!(CommissionId, "commission_id");
row_id!(TargetId, "target_id");
row_id!(SubmissionId, "submission_id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_only_positive_integers() {
        assert_eq!("42".parse::<UserId>().expect("id"), UserId(42));
        assert!("0".parse::<UserId>().is_err());
        assert!("-3".parse::<DonationId>().is_err());
        assert!("abc".parse::<TargetId>().is_err());
    }
}
