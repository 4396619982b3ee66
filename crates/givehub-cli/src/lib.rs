// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Operator CLI for givehub: database setup, the root admin, commission
//! payout exports and donation certificates.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode as ProcessExitCode;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use givehub_core::{
    resolve_db_path, ExitCode, MachineError, DEFAULT_ORGANIZATION, ENV_GIVEHUB_ORG_NAME,
};
use givehub_model::{render_certificate_html, CommissionStatus, DomainError, DonationId};
use givehub_store::{Store, StoreError, SCHEMA_VERSION};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub const CRATE_NAME: &str = "givehub-cli";

#[derive(Parser)]
#[command(name = "givehub")]
#[command(about = "GiveHub operator CLI")]
#[command(
    after_help = "Environment:\n  GIVEHUB_DB_PATH    Database file when --db is absent\n  GIVEHUB_ORG_NAME   Organization printed on certificates"
)]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates the database file and applies migrations.
    InitDb,
    /// Creates the single root admin and prints its API token.
    BootstrapAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
    Commissions {
        #[command(subcommand)]
        command: CommissionsCommand,
    },
    /// Issues (or reprints) the certificate of a completed donation.
    Certificate {
        #[arg(long)]
        donation: String,
        #[arg(long)]
        org: Option<String>,
        #[arg(long, value_enum, default_value_t = CertificateFormat::Html)]
        format: CertificateFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Version,
}

#[derive(Subcommand)]
enum CommissionsCommand {
    /// Writes commission logs as JSON lines, oldest first.
    Export {
        #[arg(long, value_parser = parse_commission_status)]
        status: Option<CommissionStatus>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CertificateFormat {
    Html,
    Json,
}

fn parse_commission_status(raw: &str) -> Result<CommissionStatus, String> {
    raw.parse::<CommissionStatus>().map_err(|e| e.reason)
}

#[derive(Debug)]
struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    fn usage(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            machine: MachineError::new("usage_error", message),
        }
    }

    fn internal(message: String) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &message),
        }
    }

    fn dependency(message: String) -> Self {
        Self {
            exit_code: ExitCode::DependencyFailure,
            machine: MachineError::new("dependency_failure", &message),
        }
    }

    fn validation(code: &str, message: String) -> Self {
        Self {
            exit_code: ExitCode::Validation,
            machine: MachineError::new(code, &message),
        }
    }

    fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.machine = self.machine.with_detail(key, value);
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(DomainError::Validation(errors)) => {
                errors.iter().fold(
                    Self::validation("validation_error", "invalid input".to_string()),
                    |acc, e| acc.with_detail(&e.field, &e.reason),
                )
            }
            StoreError::Domain(domain) => {
                let code = match &domain {
                    DomainError::NotFound { .. } => "not_found",
                    DomainError::Conflict(_) => "conflict",
                    DomainError::InvalidTransition { .. } => "invalid_transition",
                    DomainError::Forbidden(_) => "forbidden",
                    _ => "rejected",
                };
                Self::validation(code, domain.to_string())
            }
            StoreError::Sqlite(_) | StoreError::Io(_) => Self::dependency(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::dependency(format!("write failed: {err}"))
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
        for (field, reason) in &error.machine.details {
            eprintln!("  {field}: {reason}");
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run_from(std::env::args_os(), &mut out) {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run_from<I, T>(args: I, out: &mut dyn Write) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                write!(out, "{err}")?;
                return Ok(());
            }
            _ => {
                return Err(CliError::usage("invalid command line arguments").with_detail(
                    "error",
                    err.to_string().trim(),
                ));
            }
        },
    };
    init_logging(cli.verbose);

    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;
    let db_path = cli.db.unwrap_or_else(resolve_db_path);
    match command {
        Commands::Version => print_version(out, cli.json),
        Commands::InitDb => init_db(out, &db_path, cli.json),
        Commands::BootstrapAdmin { name, email, phone } => {
            bootstrap_admin(out, &db_path, cli.json, &name, &email, &phone)
        }
        Commands::Commissions { command } => match command {
            CommissionsCommand::Export { status } => export_commissions(out, &db_path, status),
        },
        Commands::Certificate {
            donation,
            org,
            format,
            out: out_path,
        } => {
            let id = donation
                .parse::<DonationId>()
                .map_err(|e| CliError::validation("validation_error", e.to_string()))?;
            let organization = org
                .or_else(|| std::env::var(ENV_GIVEHUB_ORG_NAME).ok())
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string());
            print_certificate(out, &db_path, id, &organization, format, out_path.as_deref())
        }
    }
}

fn open_store(db_path: &Path) -> Result<Store, CliError> {
    debug!(db = %db_path.display(), "opening database");
    Store::open(db_path)
        .map_err(|e| CliError::dependency(format!("open database {}: {e}", db_path.display())))
}

fn write_json(out: &mut dyn Write, value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string(value).map_err(|e| CliError::internal(e.to_string()))?;
    writeln!(out, "{text}")?;
    Ok(())
}

fn print_version(out: &mut dyn Write, machine_json: bool) -> Result<(), CliError> {
    if machine_json {
        write_json(
            out,
            &json!({
                "name": "givehub",
                "version": env!("CARGO_PKG_VERSION"),
                "schema_version": SCHEMA_VERSION,
            }),
        )
    } else {
        writeln!(out, "givehub {}", env!("CARGO_PKG_VERSION"))?;
        Ok(())
    }
}

fn init_db(out: &mut dyn Write, db_path: &Path, machine_json: bool) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let schema_version = store.schema_version()?;
    info!(db = %db_path.display(), schema_version, "database initialized");
    if machine_json {
        write_json(
            out,
            &json!({ "db": db_path.display().to_string(), "schema_version": schema_version }),
        )
    } else {
        writeln!(out, "db={}", db_path.display())?;
        writeln!(out, "schema_version={schema_version}")?;
        Ok(())
    }
}

fn bootstrap_admin(
    out: &mut dyn Write,
    db_path: &Path,
    machine_json: bool,
    name: &str,
    email: &str,
    phone: &str,
) -> Result<(), CliError> {
    let mut store = open_store(db_path)?;
    let (admin, token) = store.bootstrap_admin(name, email, phone)?;
    info!(user_id = %admin.id, "root admin created");
    if machine_json {
        write_json(out, &json!({ "user": admin, "token": token }))
    } else {
        writeln!(out, "user_id={}", admin.id)?;
        writeln!(out, "referral_code={}", admin.referral_code)?;
        writeln!(out, "token={token}")?;
        Ok(())
    }
}

fn export_commissions(
    out: &mut dyn Write,
    db_path: &Path,
    status: Option<CommissionStatus>,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let logs = store.export_commissions(status)?;
    for log in &logs {
        let line = serde_json::to_string(log).map_err(|e| CliError::internal(e.to_string()))?;
        writeln!(out, "{line}")?;
    }
    info!(count = logs.len(), "commissions exported");
    Ok(())
}

fn print_certificate(
    out: &mut dyn Write,
    db_path: &Path,
    id: DonationId,
    organization: &str,
    format: CertificateFormat,
    out_path: Option<&Path>,
) -> Result<(), CliError> {
    let mut store = open_store(db_path)?;
    let certificate = store.issue_certificate(id, organization)?;
    let body = match format {
        CertificateFormat::Html => {
            render_certificate_html(&certificate.payload, &certificate.record.content_hash)
        }
        CertificateFormat::Json => serde_json::to_string(&json!({
            "certificate": certificate.record,
            "payload": certificate.payload,
        }))
        .map_err(|e| CliError::internal(e.to_string()))?,
    };
    info!(donation_id = %id, number = %certificate.record.number, "certificate rendered");
    match out_path {
        Some(path) => {
            fs::write(path, body.as_bytes()).map_err(|e| {
                CliError::dependency(format!("write {}: {e}", path.display()))
            })?;
            writeln!(out, "{}", path.display())?;
        }
        None => writeln!(out, "{body}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ok(args: &[&str]) -> String {
        let mut out = Vec::new();
        run_from(args.iter().copied(), &mut out).expect("command succeeds");
        String::from_utf8(out).expect("utf8 output")
    }

    fn run_err(args: &[&str]) -> CliError {
        let mut out = Vec::new();
        run_from(args.iter().copied(), &mut out).expect_err("command fails")
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        let err = run_err(&["givehub", "--bogus"]);
        assert_eq!(err.exit_code, ExitCode::Usage);
        assert_eq!(err.machine.code, "usage_error");
        assert!(err.machine.details.contains_key("error"));
    }

    #[test]
    fn missing_command_is_a_usage_error() {
        let err = run_err(&["givehub"]);
        assert_eq!(err.exit_code, ExitCode::Usage);
    }

    #[test]
    fn commission_status_filter_accepts_any_case() {
        assert_eq!(parse_commission_status("paid"), Ok(CommissionStatus::Paid));
        assert!(parse_commission_status("settled").is_err());
    }

    #[test]
    fn store_errors_map_to_exit_codes() {
        let err = CliError::from(StoreError::Domain(DomainError::invalid("email", "is empty")));
        assert_eq!(err.exit_code, ExitCode::Validation);
        assert_eq!(err.machine.details.get("email").map(String::as_str), Some("is empty"));

        let err = CliError::from(StoreError::Domain(DomainError::not_found("donation", 9)));
        assert_eq!(err.machine.code, "not_found");

        let err = CliError::from(StoreError::Corrupt("bad row".to_string()));
        assert_eq!(err.exit_code, ExitCode::Internal);
    }

    #[test]
    fn bootstrap_twice_reports_a_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("givehub.sqlite");
        let db = db.to_str().expect("utf8 path");
        let text = run_ok(&[
            "givehub", "--db", db, "bootstrap-admin", "--name", "Root Admin", "--email",
            "root@example.org", "--phone", "9876543210",
        ]);
        assert!(text.lines().any(|l| l.starts_with("token=")));

        let err = run_err(&[
            "givehub", "--db", db, "bootstrap-admin", "--name", "Other", "--email",
            "other@example.org", "--phone", "9876543211",
        ]);
        assert_eq!(err.exit_code, ExitCode::Validation);
        assert_eq!(err.machine.code, "conflict");
    }

    #[test]
    fn certificate_for_unknown_donation_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("givehub.sqlite");
        let db = db.to_str().expect("utf8 path");
        let err = run_err(&["givehub", "--db", db, "certificate", "--donation", "41"]);
        assert_eq!(err.machine.code, "not_found");

        let err = run_err(&["givehub", "--db", db, "certificate", "--donation", "zero"]);
        assert_eq!(err.exit_code, ExitCode::Validation);
    }
}
