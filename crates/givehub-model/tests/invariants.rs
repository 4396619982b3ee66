use givehub_model::{
    distribute, plan_division, Allocation, Amount, ChainMember, CommissionPolicy, DomainError,
    Role, UserId, BPS_DENOMINATOR,
};
use proptest::prelude::*;

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::StatePresident),
        Just(Role::StateCoordinator),
        Just(Role::ZoneCoordinator),
        Just(Role::DistrictCoordinator),
        Just(Role::BlockCoordinator),
        Just(Role::Volunteer),
    ]
}

fn chain_strategy() -> impl Strategy<Value = Vec<ChainMember>> {
    prop::collection::vec((role_strategy(), any::<bool>()), 0..10).prop_map(|links| {
        links
            .into_iter()
            .enumerate()
            .map(|(idx, (role, active))| ChainMember {
                user_id: UserId(idx as i64 + 1),
                role,
                active,
            })
            .collect()
    })
}

fn policy_strategy() -> impl Strategy<Value = CommissionPolicy> {
    (0u32..=5_000, 0u32..=5_000, 0u32..=1_000, 0u32..8).prop_map(
        |(direct, extra, ovr, max_depth)| {
            let mut policy = CommissionPolicy {
                direct_bps: direct,
                max_total_bps: (direct + extra).min(BPS_DENOMINATOR),
                max_depth,
                ..CommissionPolicy::default()
            };
            for bps in policy.override_bps.values_mut() {
                *bps = ovr;
            }
            policy
        },
    )
}

proptest! {
    #[test]
    fn shares_never_exceed_the_cap(
        amount in 0u64..=10_000_000_000,
        chain in chain_strategy(),
        policy in policy_strategy(),
    ) {
        let shares = distribute(Amount::from_minor(amount), &chain, &policy);
        let total: u128 = shares.iter().map(|s| u128::from(s.amount.minor())).sum();
        let cap = u128::from(amount) * u128::from(policy.max_total_bps) / 10_000;
        prop_assert!(total <= cap);

        let rate_total: u32 = shares.iter().map(|s| s.rate_bps).sum();
        prop_assert!(rate_total <= policy.max_total_bps);
        for share in &shares {
            prop_assert!(!share.amount.is_zero());
            prop_assert!(share.depth <= policy.max_depth);
            let member = chain[share.depth as usize];
            prop_assert!(member.active);
            prop_assert_eq!(member.user_id, share.beneficiary_id);
        }
    }

    #[test]
    fn division_never_allocates_more_than_the_parent(
        parent in 1u64..=1_000_000,
        already in 0u64..=1_000_000,
        amounts in prop::collection::vec(1u64..=400_000, 1..6),
    ) {
        let requested: Vec<Allocation> = amounts
            .iter()
            .enumerate()
            .map(|(idx, amount)| Allocation {
                user_id: UserId(idx as i64 + 1),
                amount: Amount::from_minor(*amount),
            })
            .collect();
        let wanted: u64 = already + amounts.iter().sum::<u64>();
        match plan_division(Amount::from_minor(parent), Amount::from_minor(already), &requested) {
            Ok(plan) => {
                prop_assert!(wanted <= parent);
                prop_assert_eq!(plan.allocated.minor(), wanted);
                prop_assert_eq!(plan.remaining.minor(), parent - wanted);
            }
            Err(DomainError::TargetOverflow { .. }) => prop_assert!(wanted > parent),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}
