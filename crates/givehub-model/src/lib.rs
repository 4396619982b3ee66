// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Domain model for givehub.
//!
//! Everything here is pure: validation, the coordinator hierarchy rules,
//! commission distribution, target division, survey answer checking and
//! certificate rendering. Persistence lives in `givehub-store`.

mod certificate;
mod commission;
mod dashboard;
mod donation;
mod error;
mod ids;
mod money;
mod role;
mod survey;
mod target;
mod time;
mod user;

pub use certificate::{
    certificate_number, escape_html, mask_pan, render_certificate_html, CertificatePayload,
    CertificateRecord,
};
pub use commission::{
    distribute, ChainMember, CommissionLog, CommissionPolicy, CommissionStatus, CommissionUpdate,
    Share, BPS_DENOMINATOR,
};
pub use dashboard::{
    AdminDashboard, CommissionSummary, MemberDashboard, ReferrerTotal, StatusTotal,
};
pub use donation::{
    highlight_name, normalize_pan, validate_donation_form, Donation, DonationForm,
    DonationLimits, DonationStatus, DonorHighlight, ValidDonation, MESSAGE_MAX_LEN,
};
pub use error::{DomainError, ValidationError};
pub use ids::{CommissionId, DonationId, SubmissionId, TargetId, UserId};
pub use money::{format_inr, Amount, CURRENCY};
pub use role::Role;
pub use survey::{
    validate_answers, FieldKind, SurveyField, SurveyForm, SurveySubmission, NewSurveyForm,
};
pub use target::{
    plan_division, Allocation, DivisionPlan, NewTarget, Period, Target, TargetProgress,
};
pub use time::{format_date, now_unix, parse_date, year_of, SECONDS_PER_DAY};
pub use user::{
    check_new_user_placement, derive_referral_code, normalize_email, normalize_name,
    normalize_phone, NewUser, PublicReferral, ReferralCode, SubordinateScope, User,
    NAME_MAX_LEN,
};

pub const CRATE_NAME: &str = "givehub-model";
