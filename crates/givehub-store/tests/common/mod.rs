#![allow(dead_code)]

use givehub_model::{Amount, DonationForm, NewUser, Role, User};
use givehub_store::Store;

/// 2026-01-01T00:00:00Z
pub const NOW: i64 = 1_767_225_600;

pub struct Team {
    pub admin: User,
    pub admin_token: String,
    pub president: User,
    pub block: User,
    pub volunteer: User,
    pub volunteer_token: String,
}

pub fn new_user(name: &str, email: &str, phone: &str, role: Role) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        role,
        parent_id: None,
    }
}

/// admin → state president → block coordinator → volunteer
pub fn seeded() -> (Store, Team) {
    let mut store = Store::open_in_memory().expect("store");
    store.set_clock(|| NOW);
    let (admin, admin_token) = store
        .bootstrap_admin("Root Admin", "admin@givehub.org", "9000000000")
        .expect("bootstrap");
    let (president, _) = store
        .create_user(
            &admin,
            new_user("Sita Verma", "sita@givehub.org", "9876500001", Role::StatePresident),
        )
        .expect("president");
    let (block, _) = store
        .create_user(
            &president,
            new_user("Arjun Das", "arjun@givehub.org", "9876500002", Role::BlockCoordinator),
        )
        .expect("block");
    let (volunteer, volunteer_token) = store
        .create_user(
            &block,
            new_user("Kavya Nair", "kavya@givehub.org", "9876500003", Role::Volunteer),
        )
        .expect("volunteer");
    (
        store,
        Team {
            admin,
            admin_token,
            president,
            block,
            volunteer,
            volunteer_token,
        },
    )
}

pub fn form(amount: u64, referral_code: Option<&str>) -> DonationForm {
    DonationForm {
        donor_name: "Asha Kumari".to_string(),
        donor_email: "asha@example.org".to_string(),
        donor_phone: "+919812345678".to_string(),
        donor_pan: Some("abcde1234f".to_string()),
        amount: Amount::from_minor(amount),
        referral_code: referral_code.map(ToString::to_string),
        message: Some("For the school kitchen".to_string()),
        display_publicly: true,
    }
}
