// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, ValidationError};
use crate::ids::{TargetId, UserId};
use crate::money::Amount;
use crate::time::{format_date, parse_date, SECONDS_PER_DAY};
use crate::user::normalize_name;

/// Half-open `[start, end)` interval of unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: i64,
    pub end: i64,
}

impl Period {
    pub fn new(start: i64, end: i64) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::new(
                "period",
                "start must be before end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Both dates inclusive, as entered on a form.
    pub fn from_dates(start: &str, end: &str) -> Result<Self, ValidationError> {
        let start = parse_date("start_date", start)?;
        let last_day = parse_date("end_date", end)?;
        Self::new(start, last_day + SECONDS_PER_DAY)
    }

    #[must_use]
    pub const fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }

    #[must_use]
    pub fn start_date(&self) -> String {
        format_date(self.start)
    }

    #[must_use]
    pub fn end_date(&self) -> String {
        format_date(self.end - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub user_id: UserId,
    pub assigned_by: UserId,
    pub parent_target_id: Option<TargetId>,
    pub title: String,
    pub amount: Amount,
    pub period: Period,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTarget {
    pub user_id: UserId,
    pub title: String,
    pub amount: Amount,
    pub start_date: String,
    pub end_date: String,
}

impl NewTarget {
    pub fn validate(&self) -> Result<(String, Period), DomainError> {
        let mut errors = Vec::new();
        let title = normalize_name("title", &self.title)
            .map_err(|e| errors.push(e))
            .ok();
        if self.amount.is_zero() {
            errors.push(ValidationError::new("amount", "must be greater than zero"));
        } else if !self.amount.is_storable() {
            errors.push(ValidationError::new(
                "amount",
                format!("must not exceed {} paise", Amount::MAX_STORABLE.minor()),
            ));
        }
        let period = Period::from_dates(&self.start_date, &self.end_date)
            .map_err(|e| errors.push(e))
            .ok();
        match (title, period) {
            (Some(title), Some(period)) if errors.is_empty() => Ok((title, period)),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub user_id: UserId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionPlan {
    pub allocations: Vec<Allocation>,
    pub allocated: Amount,
    pub remaining: Amount,
}

/// Validates splitting a target of `parent` among subordinates when
/// `already_allocated` has been handed out by earlier divisions.
pub fn plan_division(
    parent: Amount,
    already_allocated: Amount,
    requested: &[Allocation],
) -> Result<DivisionPlan, DomainError> {
    if requested.is_empty() {
        return Err(DomainError::invalid(
            "allocations",
            "at least one allocation is required",
        ));
    }

    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    for (idx, allocation) in requested.iter().enumerate() {
        if !seen.insert(allocation.user_id) {
            errors.push(ValidationError::new(
                format!("allocations[{idx}].user_id"),
                format!("user {} appears more than once", allocation.user_id),
            ));
        }
        if allocation.amount.is_zero() {
            errors.push(ValidationError::new(
                format!("allocations[{idx}].amount"),
                "must be greater than zero",
            ));
        } else if !allocation.amount.is_storable() {
            errors.push(ValidationError::new(
                format!("allocations[{idx}].amount"),
                format!("must not exceed {} paise", Amount::MAX_STORABLE.minor()),
            ));
        }
    }
    if !errors.is_empty() {
        return Err(DomainError::Validation(errors));
    }

    let requested_total = requested
        .iter()
        .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a.amount));
    let allocated = requested_total.and_then(|r| r.checked_add(already_allocated));
    match (requested_total, allocated) {
        (Some(requested_total), Some(allocated)) if allocated <= parent => Ok(DivisionPlan {
            allocations: requested.to_vec(),
            allocated,
            remaining: parent.saturating_sub(allocated),
        }),
        (requested_total, _) => Err(DomainError::TargetOverflow {
            parent,
            allocated: already_allocated,
            requested: requested_total.unwrap_or(Amount::from_minor(u64::MAX)),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProgress {
    pub target_id: TargetId,
    pub title: String,
    pub amount: Amount,
    pub achieved: Amount,
    pub remaining: Amount,
    pub progress_bps: u64,
    pub divided: Amount,
    pub undivided: Amount,
    pub start_date: String,
    pub end_date: String,
}

impl TargetProgress {
    #[must_use]
    pub fn compute(target: &Target, achieved: Amount, divided: Amount) -> Self {
        Self {
            target_id: target.id,
            title: target.title.clone(),
            amount: target.amount,
            achieved,
            remaining: target.amount.saturating_sub(achieved),
            progress_bps: achieved.ratio_bps(target.amount),
            divided,
            undivided: target.amount.saturating_sub(divided),
            start_date: target.period.start_date(),
            end_date: target.period.end_date(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(user: i64, amount: u64) -> Allocation {
        Allocation {
            user_id: UserId(user),
            amount: Amount::from_minor(amount),
        }
    }

    #[test]
    fn period_from_dates_includes_the_last_day() {
        let period = Period::from_dates("2026-01-01", "2026-01-31").expect("period");
        assert_eq!(period.end - period.start, 31 * SECONDS_PER_DAY);
        assert!(period.contains(period.start));
        assert!(!period.contains(period.end));
        assert_eq!(period.end_date(), "2026-01-31");
        assert!(Period::from_dates("2026-02-01", "2026-01-31").is_err());
    }

    #[test]
    fn division_reports_remainder() {
        let plan = plan_division(
            Amount::from_minor(1_000),
            Amount::from_minor(200),
            &[alloc(2, 300), alloc(3, 100)],
        )
        .expect("plan");
        assert_eq!(plan.allocated, Amount::from_minor(600));
        assert_eq!(plan.remaining, Amount::from_minor(400));
    }

    #[test]
    fn division_may_consume_the_whole_target() {
        let plan = plan_division(Amount::from_minor(500), Amount::ZERO, &[alloc(2, 500)])
            .expect("exact split");
        assert!(plan.remaining.is_zero());
    }

    #[test]
    fn overflow_is_rejected_with_totals() {
        let err = plan_division(
            Amount::from_minor(1_000),
            Amount::from_minor(900),
            &[alloc(2, 50), alloc(3, 60)],
        )
        .expect_err("overflow");
        assert_eq!(
            err,
            DomainError::TargetOverflow {
                parent: Amount::from_minor(1_000),
                allocated: Amount::from_minor(900),
                requested: Amount::from_minor(110),
            }
        );
    }

    #[test]
    fn duplicates_and_zero_amounts_are_field_errors() {
        let err = plan_division(
            Amount::from_minor(1_000),
            Amount::ZERO,
            &[alloc(2, 10), alloc(2, 0)],
        )
        .expect_err("invalid");
        let DomainError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
        assert!(plan_division(Amount::from_minor(1), Amount::ZERO, &[]).is_err());
    }

    #[test]
    fn amounts_beyond_storage_range_are_field_errors() {
        let target = NewTarget {
            user_id: UserId(2),
            title: "Annual".to_string(),
            amount: Amount::from_minor(u64::MAX),
            start_date: "2026-01-01".to_string(),
            end_date: "2026-12-31".to_string(),
        };
        let DomainError::Validation(errors) = target.validate().expect_err("too large") else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "amount");

        let at_limit = NewTarget {
            amount: Amount::MAX_STORABLE,
            ..target
        };
        assert!(at_limit.validate().is_ok());

        let err = plan_division(Amount::MAX_STORABLE, Amount::ZERO, &[alloc(2, u64::MAX)])
            .expect_err("allocation too large");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn progress_can_exceed_the_target() {
        let target = Target {
            id: TargetId(1),
            user_id: UserId(2),
            assigned_by: UserId(1),
            parent_target_id: None,
            title: "Q1".to_string(),
            amount: Amount::from_minor(1_000),
            period: Period::new(0, 100).expect("period"),
            created_at: 0,
        };
        let progress =
            TargetProgress::compute(&target, Amount::from_minor(1_500), Amount::from_minor(400));
        assert_eq!(progress.progress_bps, 15_000);
        assert!(progress.remaining.is_zero());
        assert_eq!(progress.undivided, Amount::from_minor(600));
    }
}
