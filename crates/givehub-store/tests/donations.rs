mod common;

use common::{form, seeded, NOW};
use givehub_model::{
    Amount, CommissionPolicy, CommissionStatus, CommissionUpdate, DomainError, DonationId,
    DonationLimits, DonationStatus,
};
use givehub_store::{CommissionFilter, DonationFilter, StoreError};

#[test]
fn unknown_or_inactive_referral_codes_are_rejected() {
    let (mut store, team) = seeded();
    let limits = DonationLimits::default();
    let err = store
        .create_donation(form(50_000, Some("VLFFFFFFFF")), &limits)
        .expect_err("unknown");
    assert!(matches!(err, StoreError::Domain(DomainError::UnknownReferralCode(_))));

    store
        .deactivate_user(&team.admin, team.volunteer.id)
        .expect("deactivate");
    let code = team.volunteer.referral_code.to_string();
    let err = store
        .create_donation(form(50_000, Some(&code)), &limits)
        .expect_err("inactive");
    assert!(matches!(err, StoreError::Domain(DomainError::UnknownReferralCode(_))));
}

#[test]
fn completion_distributes_commission_up_the_chain() {
    let (mut store, team) = seeded();
    let code = team.volunteer.referral_code.to_string();
    let donation = store
        .create_donation(form(100_000, Some(&code)), &DonationLimits::default())
        .expect("donation");
    assert_eq!(donation.status, DonationStatus::Pending);
    assert_eq!(donation.referrer_id, Some(team.volunteer.id));
    assert_eq!(donation.donor_pan.as_deref(), Some("ABCDE1234F"));

    let completion = store
        .complete_donation(donation.id, "pay_001", &CommissionPolicy::default())
        .expect("complete");
    assert!(!completion.replayed);
    assert_eq!(completion.donation.completed_at, Some(NOW));
    let shares: Vec<_> = completion
        .commissions
        .iter()
        .map(|c| (c.beneficiary_id, c.rate_bps, c.amount.minor()))
        .collect();
    assert_eq!(
        shares,
        vec![
            (team.volunteer.id, 1_000, 10_000),
            (team.block.id, 200, 2_000),
            (team.president.id, 100, 1_000),
        ]
    );

    let replay = store
        .complete_donation(donation.id, " pay_001 ", &CommissionPolicy::default())
        .expect("replay");
    assert!(replay.replayed);
    assert_eq!(replay.commissions.len(), 3);

    let err = store
        .complete_donation(donation.id, "pay_002", &CommissionPolicy::default())
        .expect_err("different reference");
    assert!(matches!(err, StoreError::Domain(DomainError::InvalidTransition { .. })));
}

#[test]
fn refund_cancels_pending_commissions_but_keeps_paid_ones() {
    let (mut store, team) = seeded();
    let code = team.volunteer.referral_code.to_string();
    let donation = store
        .create_donation(form(100_000, Some(&code)), &DonationLimits::default())
        .expect("donation");
    let completion = store
        .complete_donation(donation.id, "pay_001", &CommissionPolicy::default())
        .expect("complete");
    let first = completion.commissions[0].id;
    store
        .record_payout(&team.admin, &[first], "utr-123")
        .expect("payout");

    let (refunded, cancelled) = store.refund_donation(donation.id).expect("refund");
    assert_eq!(refunded.status, DonationStatus::Refunded);
    assert_eq!(cancelled, 2);

    let logs = store
        .list_commissions(&team.admin, &CommissionFilter::default())
        .expect("list");
    let paid: Vec<_> = logs
        .iter()
        .filter(|c| c.status == CommissionStatus::Paid)
        .map(|c| c.id)
        .collect();
    assert_eq!(paid, vec![first]);
    assert_eq!(
        logs.iter().filter(|c| c.status == CommissionStatus::Cancelled).count(),
        2
    );
    assert!(matches!(
        store.refund_donation(donation.id),
        Err(StoreError::Domain(DomainError::InvalidTransition { .. }))
    ));
}

#[test]
fn failed_donations_cannot_complete() {
    let (mut store, _) = seeded();
    let donation = store
        .create_donation(form(5_000, None), &DonationLimits::default())
        .expect("donation");
    let failed = store.fail_donation(donation.id, Some("pay_x")).expect("fail");
    assert_eq!(failed.status, DonationStatus::Failed);
    assert_eq!(
        store.fail_donation(donation.id, None).expect("again").status,
        DonationStatus::Failed
    );
    assert!(store
        .complete_donation(donation.id, "pay_y", &CommissionPolicy::default())
        .is_err());
    assert!(matches!(
        store.get_donation(DonationId(404)),
        Err(StoreError::Domain(DomainError::NotFound { .. }))
    ));
}

#[test]
fn payout_batch_is_all_or_nothing() {
    let (mut store, team) = seeded();
    let code = team.volunteer.referral_code.to_string();
    let donation = store
        .create_donation(form(100_000, Some(&code)), &DonationLimits::default())
        .expect("donation");
    let logs = store
        .complete_donation(donation.id, "pay_001", &CommissionPolicy::default())
        .expect("complete")
        .commissions;
    store
        .update_commission_status(
            &team.admin,
            logs[1].id,
            &CommissionUpdate {
                status: CommissionStatus::Failed,
                payment_reference: None,
                note: Some("bank account closed".to_string()),
            },
        )
        .expect("fail one");

    let ids: Vec<_> = logs.iter().map(|c| c.id).collect();
    let err = store
        .record_payout(&team.admin, &ids, "utr-9")
        .expect_err("batch contains a FAILED log");
    assert!(matches!(err, StoreError::Domain(DomainError::InvalidTransition { .. })));
    let pending = store
        .list_commissions(
            &team.admin,
            &CommissionFilter {
                status: Some(CommissionStatus::Pending),
                ..CommissionFilter::default()
            },
        )
        .expect("list");
    assert_eq!(pending.len(), 2);

    let err = store
        .record_payout(&team.block, &[logs[0].id], "utr-9")
        .expect_err("non-admin");
    assert!(matches!(err, StoreError::Domain(DomainError::Forbidden(_))));
}

#[test]
fn listings_are_scoped_to_the_team() {
    let (mut store, team) = seeded();
    let limits = DonationLimits::default();
    let code = team.volunteer.referral_code.to_string();
    store
        .create_donation(form(10_000, Some(&code)), &limits)
        .expect("referred");
    store.create_donation(form(20_000, None), &limits).expect("direct");

    let all = store
        .list_donations(&team.admin, &DonationFilter::default())
        .expect("admin");
    assert_eq!(all.len(), 2);
    let scoped = store
        .list_donations(&team.block, &DonationFilter::default())
        .expect("block");
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].amount, Amount::from_minor(10_000));

    let err = store
        .list_donations(
            &team.volunteer,
            &DonationFilter {
                referrer: Some(team.block.id),
                ..DonationFilter::default()
            },
        )
        .expect_err("upward filter");
    assert!(matches!(err, StoreError::Domain(DomainError::Forbidden(_))));

    let err = store
        .list_commissions(
            &team.volunteer,
            &CommissionFilter {
                beneficiary: Some(team.block.id),
                ..CommissionFilter::default()
            },
        )
        .expect_err("other beneficiary");
    assert!(matches!(err, StoreError::Domain(DomainError::Forbidden(_))));
}

#[test]
fn highlights_show_public_donors_by_amount() {
    let (mut store, _) = seeded();
    let limits = DonationLimits::default();
    let mut big = form(90_000, None);
    big.donor_name = "Meera Iyer".to_string();
    let mut hidden = form(500_000, None);
    hidden.display_publicly = false;
    for f in [form(10_000, None), big, hidden] {
        let d = store.create_donation(f, &limits).expect("donation");
        store
            .complete_donation(d.id, &format!("pay_{}", d.id), &CommissionPolicy::default())
            .expect("complete");
    }
    let highlights = store.donor_highlights(10).expect("highlights");
    let shown: Vec<_> = highlights.iter().map(|h| (h.donor.as_str(), h.amount.minor())).collect();
    assert_eq!(shown, vec![("Meera I.", 90_000), ("Asha K.", 10_000)]);
}

fn fail_update(note: &str) -> CommissionUpdate {
    CommissionUpdate {
        status: CommissionStatus::Failed,
        payment_reference: None,
        note: Some(note.to_string()),
    }
}

fn retry_update() -> CommissionUpdate {
    CommissionUpdate {
        status: CommissionStatus::Pending,
        payment_reference: None,
        note: Some("bank details corrected".to_string()),
    }
}

#[test]
fn failed_commission_can_be_retried_and_then_paid() {
    let (mut store, team) = seeded();
    let code = team.volunteer.referral_code.to_string();
    let donation = store
        .create_donation(form(100_000, Some(&code)), &DonationLimits::default())
        .expect("donation");
    let log = store
        .complete_donation(donation.id, "pay_001", &CommissionPolicy::default())
        .expect("complete")
        .commissions[0]
        .clone();

    let failed = store
        .update_commission_status(&team.admin, log.id, &fail_update("bank account closed"))
        .expect("fail");
    assert_eq!(failed.status, CommissionStatus::Failed);

    let retried = store
        .update_commission_status(&team.admin, log.id, &retry_update())
        .expect("retry");
    assert_eq!(retried.status, CommissionStatus::Pending);
    assert_eq!(retried.note.as_deref(), Some("bank details corrected"));
    assert_eq!(retried.amount, log.amount);

    let paid = store
        .record_payout(&team.admin, &[log.id], "utr-77")
        .expect("payout after retry");
    assert_eq!(paid[0].status, CommissionStatus::Paid);
    assert_eq!(paid[0].payment_reference.as_deref(), Some("utr-77"));

    let err = store
        .update_commission_status(&team.admin, log.id, &retry_update())
        .expect_err("paid is final");
    assert!(matches!(err, StoreError::Domain(DomainError::InvalidTransition { .. })));
}

#[test]
fn failed_commission_of_refunded_donation_cannot_be_retried() {
    let (mut store, team) = seeded();
    let code = team.volunteer.referral_code.to_string();
    let donation = store
        .create_donation(form(100_000, Some(&code)), &DonationLimits::default())
        .expect("donation");
    let log_id = store
        .complete_donation(donation.id, "pay_001", &CommissionPolicy::default())
        .expect("complete")
        .commissions[0]
        .id;
    store
        .update_commission_status(&team.admin, log_id, &fail_update("bounced"))
        .expect("fail");

    let (_, cancelled) = store.refund_donation(donation.id).expect("refund");
    assert_eq!(cancelled, 2);

    let err = store
        .update_commission_status(&team.admin, log_id, &retry_update())
        .expect_err("retry after refund");
    match err {
        StoreError::Domain(DomainError::Conflict(message)) => {
            assert!(message.contains("refunded"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
    let failed = store
        .list_commissions(
            &team.admin,
            &CommissionFilter {
                status: Some(CommissionStatus::Failed),
                ..CommissionFilter::default()
            },
        )
        .expect("list");
    assert_eq!(failed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![log_id]);
}

#[test]
fn commission_summary_is_visible_to_self_and_managers_only() {
    let (mut store, team) = seeded();
    let code = team.volunteer.referral_code.to_string();
    let donation = store
        .create_donation(form(100_000, Some(&code)), &DonationLimits::default())
        .expect("donation");
    store
        .complete_donation(donation.id, "pay_001", &CommissionPolicy::default())
        .expect("complete");

    let own = store
        .commission_summary(&team.volunteer, team.volunteer.id)
        .expect("own summary");
    let pending = &own.by_status[&CommissionStatus::Pending];
    assert_eq!(pending.count, 1);
    assert_eq!(pending.amount, Amount::from_minor(10_000));
    assert_eq!(own.by_status[&CommissionStatus::Paid].count, 0);

    let seen_by_manager = store
        .commission_summary(&team.block, team.volunteer.id)
        .expect("manager view");
    assert_eq!(seen_by_manager, own);

    let president = store
        .commission_summary(&team.admin, team.president.id)
        .expect("admin view");
    assert_eq!(
        president.by_status[&CommissionStatus::Pending].amount,
        Amount::from_minor(1_000)
    );

    for (actor, subject) in [
        (&team.volunteer, team.block.id),
        (&team.block, team.president.id),
        (&team.president, team.admin.id),
    ] {
        let err = store
            .commission_summary(actor, subject)
            .expect_err("outside the actor's team");
        assert!(matches!(err, StoreError::Domain(DomainError::Forbidden(_))));
    }
}
