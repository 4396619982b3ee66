mod common;

use common::{form, seeded, NOW};
use givehub_model::{
    render_certificate_html, CommissionPolicy, DomainError, DonationLimits, FieldKind,
    NewSurveyForm, SurveyField,
};
use givehub_store::{Page, StoreError};
use serde_json::json;

fn intake() -> NewSurveyForm {
    NewSurveyForm {
        slug: "village-intake".to_string(),
        title: "Village intake".to_string(),
        fields: vec![
            SurveyField {
                key: "village".to_string(),
                label: "Village".to_string(),
                kind: FieldKind::Text { max_len: 60 },
                required: true,
            },
            SurveyField {
                key: "households".to_string(),
                label: "Households".to_string(),
                kind: FieldKind::Number { min: 1, max: 5_000 },
                required: true,
            },
        ],
    }
}

#[test]
fn surveys_accept_valid_answers_and_scope_listings() {
    let (mut store, team) = seeded();
    let err = store
        .create_form(&team.president, intake())
        .expect_err("admin only");
    assert!(matches!(err, StoreError::Domain(DomainError::Forbidden(_))));
    store.create_form(&team.admin, intake()).expect("create");
    assert!(matches!(
        store.create_form(&team.admin, intake()),
        Err(StoreError::Domain(DomainError::Conflict(_)))
    ));

    let code = team.volunteer.referral_code.to_string();
    let submission = store
        .submit_survey(
            "village-intake",
            &json!({"village": " Rampur ", "households": 120}),
            Some(&code),
        )
        .expect("submit");
    assert_eq!(submission.answers["village"], json!("Rampur"));
    assert_eq!(submission.referrer_id, Some(team.volunteer.id));
    store
        .submit_survey("village-intake", &json!({"village": "Sonpur", "households": 8}), None)
        .expect("anonymous");

    let err = store
        .submit_survey("village-intake", &json!({"households": 0}), None)
        .expect_err("invalid");
    match err {
        StoreError::Domain(DomainError::Validation(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("unexpected {other:?}"),
    }

    let admin_view = store
        .list_submissions(&team.admin, "village-intake", Page::default())
        .expect("admin");
    assert_eq!(admin_view.len(), 2);
    let block_view = store
        .list_submissions(&team.block, "village-intake", Page::default())
        .expect("block");
    assert_eq!(block_view.len(), 1);

    store
        .set_form_active(&team.admin, "village-intake", false)
        .expect("close");
    assert!(matches!(
        store.submit_survey("village-intake", &json!({"village": "X", "households": 1}), None),
        Err(StoreError::Domain(DomainError::Conflict(_)))
    ));
    assert!(matches!(
        store.get_form("missing"),
        Err(StoreError::Domain(DomainError::NotFound { .. }))
    ));
}

#[test]
fn certificates_are_issued_once_and_verifiable() {
    let (mut store, team) = seeded();
    let code = team.block.referral_code.to_string();
    let donation = store
        .create_donation(form(10_000_000, Some(&code)), &DonationLimits::default())
        .expect("donation");

    assert!(matches!(
        store.issue_certificate(donation.id, "Seva Trust"),
        Err(StoreError::Domain(DomainError::Conflict(_)))
    ));
    store
        .complete_donation(donation.id, "pay_cert", &CommissionPolicy::default())
        .expect("complete");

    let first = store
        .issue_certificate(donation.id, "Seva Trust")
        .expect("issue");
    assert_eq!(first.record.number, format!("GH-2026-{:06}", donation.id.get()));
    assert_eq!(first.record.issued_at, NOW);
    let again = store
        .issue_certificate(donation.id, "Renamed Trust")
        .expect("reissue");
    assert_eq!(again.record, first.record);
    assert_eq!(again.payload.organization, "Seva Trust");

    assert!(store
        .verify_certificate(&first.record.number, &first.record.content_hash)
        .expect("verify"));
    assert!(!store
        .verify_certificate(&first.record.number, &"0".repeat(64))
        .expect("verify"));
    assert!(!store
        .verify_certificate("GH-2026-999999", &first.record.content_hash)
        .expect("verify"));

    let html = render_certificate_html(&first.payload, &first.record.content_hash);
    assert!(html.contains("******234F"));
    assert!(html.contains("₹1,00,000.00"));
}

#[test]
fn refunded_donation_certificates_no_longer_verify() {
    let (mut store, _) = seeded();
    let donation = store
        .create_donation(form(50_000, None), &DonationLimits::default())
        .expect("donation");
    store
        .complete_donation(donation.id, "pay_refund", &CommissionPolicy::default())
        .expect("complete");
    let issued = store
        .issue_certificate(donation.id, "Seva Trust")
        .expect("issue");
    assert!(store
        .verify_certificate(&issued.record.number, &issued.record.content_hash)
        .expect("verify"));

    store.refund_donation(donation.id).expect("refund");
    assert!(!store
        .verify_certificate(&issued.record.number, &issued.record.content_hash)
        .expect("verify after refund"));
    assert!(matches!(
        store.issue_certificate(donation.id, "Seva Trust"),
        Err(StoreError::Domain(DomainError::Conflict(_)))
    ));
}

#[test]
fn certificate_access_needs_team_membership_or_donor_email() {
    let (mut store, team) = seeded();
    let code = team.block.referral_code.to_string();
    let donation = store
        .create_donation(form(10_000, Some(&code)), &DonationLimits::default())
        .expect("donation");
    store
        .complete_donation(donation.id, "pay_a", &CommissionPolicy::default())
        .expect("complete");

    store
        .certificate_for(None, Some("ASHA@example.org"), donation.id, "Org")
        .expect("donor email");
    store
        .certificate_for(Some(&team.president), None, donation.id, "Org")
        .expect("ancestor of referrer");
    let err = store
        .certificate_for(Some(&team.volunteer), Some("someone@else.org"), donation.id, "Org")
        .expect_err("volunteer below the referrer");
    assert!(matches!(err, StoreError::Domain(DomainError::Forbidden(_))));
}
