// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use assert_cmd::Command;
use givehub_model::{Amount, CommissionPolicy, DonationForm, DonationLimits, NewUser, Role};
use givehub_store::Store;

fn givehub() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_givehub"));
    cmd.env_remove("GIVEHUB_DB_PATH")
        .env_remove("GIVEHUB_ORG_NAME")
        .env_remove("RUST_LOG");
    cmd
}

/// Admin with one volunteer, one completed referred donation and one
/// still pending. Returns the completed donation id.
fn seed(db: &Path) -> i64 {
    let mut store = Store::open(db).expect("open store");
    let (admin, _) = store
        .bootstrap_admin("Root Admin", "admin@givehub.org", "9000000000")
        .expect("bootstrap");
    let (volunteer, _) = store
        .create_user(
            &admin,
            NewUser {
                name: "Kavya Nair".to_string(),
                email: "kavya@givehub.org".to_string(),
                phone: "9876500003".to_string(),
                role: Role::Volunteer,
                parent_id: None,
            },
        )
        .expect("volunteer");
    let form = |amount: u64| DonationForm {
        donor_name: "Asha Kumari".to_string(),
        donor_email: "asha@example.org".to_string(),
        donor_phone: "+919812345678".to_string(),
        donor_pan: Some("abcde1234f".to_string()),
        amount: Amount::from_minor(amount),
        referral_code: Some(volunteer.referral_code.to_string()),
        message: None,
        display_publicly: false,
    };
    let limits = DonationLimits::default();
    let done = store.create_donation(form(50_000), &limits).expect("donation");
    store
        .complete_donation(done.id, "pay_cli_1", &CommissionPolicy::default())
        .expect("complete");
    store.create_donation(form(20_000), &limits).expect("pending donation");
    done.id.get()
}

#[test]
fn help_lists_operator_commands() {
    let output = givehub().arg("--help").output().expect("run help");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 help");
    for command in ["init-db", "bootstrap-admin", "commissions", "certificate", "version"] {
        assert!(text.contains(command), "help is missing {command}");
    }
}

#[test]
fn version_output_contains_crate_version() {
    let output = givehub().arg("version").output().expect("run version");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 version");
    assert!(text.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_flag_returns_usage_exit_code_with_machine_error() {
    let output = givehub()
        .args(["--json", "--unknown-flag"])
        .output()
        .expect("run bad cli");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    let payload: serde_json::Value = serde_json::from_str(stderr.trim()).expect("json error");
    assert_eq!(payload["code"], "usage_error");
}

#[test]
fn init_db_reports_schema_version() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("nested").join("givehub.sqlite");
    let output = givehub()
        .arg("--json")
        .arg("--db")
        .arg(&db)
        .arg("init-db")
        .output()
        .expect("run init-db");
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(payload["schema_version"], givehub_store::SCHEMA_VERSION);
    assert!(db.exists());
}

#[test]
fn db_path_falls_back_to_environment() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("from-env.sqlite");
    let output = givehub()
        .env("GIVEHUB_DB_PATH", &db)
        .arg("init-db")
        .output()
        .expect("run init-db");
    assert!(output.status.success());
    assert!(db.exists());
}

#[test]
fn bootstrap_admin_prints_a_working_token_once() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("givehub.sqlite");
    let output = givehub()
        .arg("--json")
        .arg("--db")
        .arg(&db)
        .args([
            "bootstrap-admin",
            "--name",
            "Root Admin",
            "--email",
            "Root@Example.org",
            "--phone",
            "9876543210",
        ])
        .output()
        .expect("run bootstrap");
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(payload["user"]["role"], "ADMIN");
    assert_eq!(payload["user"]["email"], "root@example.org");
    let token = payload["token"].as_str().expect("token").to_string();

    let store = Store::open(&db).expect("reopen");
    let admin = store.authenticate(&token).expect("lookup").expect("admin");
    assert_eq!(admin.role, Role::Admin);
    drop(store);

    let second = givehub()
        .arg("--json")
        .arg("--db")
        .arg(&db)
        .args([
            "bootstrap-admin",
            "--name",
            "Second",
            "--email",
            "second@example.org",
            "--phone",
            "9876543211",
        ])
        .output()
        .expect("run second bootstrap");
    assert_eq!(second.status.code(), Some(3));
    let stderr = String::from_utf8(second.stderr).expect("utf8 stderr");
    assert!(stderr.contains("\"conflict\""));
}

#[test]
fn bootstrap_admin_reports_every_invalid_field() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("givehub.sqlite");
    let output = givehub()
        .arg("--json")
        .arg("--db")
        .arg(&db)
        .args(["bootstrap-admin", "--name", " ", "--email", "nope", "--phone", "12"])
        .output()
        .expect("run bootstrap");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    let payload: serde_json::Value = serde_json::from_str(stderr.trim()).expect("json error");
    assert_eq!(payload["code"], "validation_error");
    let details = payload["details"].as_object().expect("details");
    for field in ["name", "email", "phone"] {
        assert!(details.contains_key(field), "missing detail for {field}");
    }
}

#[test]
fn commissions_export_writes_json_lines_filtered_by_status() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("givehub.sqlite");
    seed(&db);

    let output = givehub()
        .arg("--db")
        .arg(&db)
        .args(["commissions", "export", "--status", "pending"])
        .output()
        .expect("run export");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 export");
    let rows: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row["status"] == "PENDING"));

    let paid = givehub()
        .arg("--db")
        .arg(&db)
        .args(["commissions", "export", "--status", "paid"])
        .output()
        .expect("run export");
    assert!(paid.status.success());
    assert!(paid.stdout.is_empty());

    let bad = givehub()
        .arg("--db")
        .arg(&db)
        .args(["commissions", "export", "--status", "settled"])
        .output()
        .expect("run export");
    assert_eq!(bad.status.code(), Some(2));
}

#[test]
fn certificate_renders_html_and_keeps_first_issuance() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("givehub.sqlite");
    let id = seed(&db).to_string();

    let output = givehub()
        .arg("--db")
        .arg(&db)
        .args(["certificate", "--donation", &id, "--org", "Seva Trust"])
        .output()
        .expect("run certificate");
    assert!(output.status.success());
    let html = String::from_utf8(output.stdout).expect("utf8 html");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Seva Trust"));
    assert!(html.contains("******234F"));
    assert!(!html.contains("ABCDE1234F"));

    let out = tmp.path().join("certificate.json");
    let reprint = givehub()
        .arg("--db")
        .arg(&db)
        .env("GIVEHUB_ORG_NAME", "Another Org")
        .args(["certificate", "--donation", &id, "--format", "json", "--out"])
        .arg(&out)
        .output()
        .expect("run reprint");
    assert!(reprint.status.success());
    let raw = std::fs::read(&out).expect("certificate file");
    let payload: serde_json::Value = serde_json::from_slice(&raw).expect("certificate json");
    assert_eq!(payload["certificate"]["organization"], "Seva Trust");
    assert_eq!(
        payload["certificate"]["content_hash"].as_str().map(str::len),
        Some(64)
    );
}

#[test]
fn certificate_of_pending_donation_is_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("givehub.sqlite");
    let completed = seed(&db);
    let pending = (completed + 1).to_string();

    let output = givehub()
        .arg("--json")
        .arg("--db")
        .arg(&db)
        .args(["certificate", "--donation", &pending])
        .output()
        .expect("run certificate");
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
}
