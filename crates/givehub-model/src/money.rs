// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};

pub const CURRENCY: &str = "INR";

/// Money in minor units (paise).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Largest amount the store can persist (a signed 64-bit column).
    pub const MAX_STORABLE: Self = Self(i64::MAX.unsigned_abs());

    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_storable(self) -> bool {
        self.0 <= Self::MAX_STORABLE.0
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `floor(self * bps / 10_000)`, computed without overflow.
    #[must_use]
    pub fn apply_bps(self, bps: u32) -> Self {
        let scaled = u128::from(self.0) * u128::from(bps) / 10_000;
        Self(u64::try_from(scaled).unwrap_or(u64::MAX))
    }

    /// `self / whole` in basis points; zero when `whole` is zero.
    #[must_use]
    pub fn ratio_bps(self, whole: Self) -> u64 {
        if whole.0 == 0 {
            return 0;
        }
        let scaled = u128::from(self.0) * 10_000 / u128::from(whole.0);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_inr(*self))
    }
}

/// Rupees with Indian digit grouping: `₹12,34,567.89`.
#[must_use]
pub fn format_inr(amount: Amount) -> String {
    let rupees = (amount.0 / 100).to_string();
    let paise = amount.0 % 100;

    let grouped = if rupees.len() <= 3 {
        rupees
    } else {
        let (head, tail) = rupees.split_at(rupees.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            groups.push(&head[end - 2..end]);
            end -= 2;
        }
        groups.push(&head[..end]);
        groups.reverse();
        format!("{},{tail}", groups.join(","))
    };
    format!("₹{grouped}.{paise:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indian_grouping_matches_lakh_and_crore_positions() {
        assert_eq!(format_inr(Amount::from_minor(0)), "₹0.00");
        assert_eq!(format_inr(Amount::from_minor(99_950)), "₹999.50");
        assert_eq!(format_inr(Amount::from_minor(100_000)), "₹1,000.00");
        assert_eq!(format_inr(Amount::from_minor(10_000_000)), "₹1,00,000.00");
        assert_eq!(format_inr(Amount::from_minor(123_456_789)), "₹12,34,567.89");
        assert_eq!(
            format_inr(Amount::from_minor(1_234_567_800)),
            "₹1,23,45,678.00"
        );
    }

    #[test]
    fn bps_application_floors_and_never_overflows() {
        assert_eq!(Amount::from_minor(999).apply_bps(1000).minor(), 99);
        assert_eq!(Amount::from_minor(u64::MAX).apply_bps(10_000).minor(), u64::MAX);
        assert_eq!(Amount::from_minor(5).apply_bps(1).minor(), 0);
    }

    #[test]
    fn ratio_handles_zero_denominator() {
        assert_eq!(Amount::from_minor(5).ratio_bps(Amount::ZERO), 0);
        assert_eq!(
            Amount::from_minor(150).ratio_bps(Amount::from_minor(100)),
            15_000
        );
    }
}
