//! Cohorts: policy-driven cohort membership CLI.
//!
//! # Usage
//!
//! ```text
//! cohorts init
//! cohorts sync [--all | --policy <kind> | --group <idnumber>] [--dry-run] [--json]
//! cohorts status [--json]
//! cohorts members <idnumber>
//! cohorts enable <idnumber>
//! cohorts disable <idnumber>
//! cohorts migrate
//! cohorts sync-person <id>
//! cohorts session [--menu]
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cohorts_sync::PolicyKind;
use commands::{
    init::InitArgs, members::MembersArgs, migrate::MigrateArgs, person::SyncPersonArgs,
    session::SessionArgs, status::StatusArgs, sync::SyncArgs, toggle::ToggleArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cohorts",
    version,
    about = "Keep system cohorts in line with profile and enrolment data",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty snapshot and default settings under ~/.cohorts.
    Init(InitArgs),

    /// Reconcile cohort membership against every policy.
    Sync(SyncArgs),

    /// List managed cohorts with their state and size.
    Status(StatusArgs),

    /// List the members of one cohort.
    Members(MembersArgs),

    /// Enable a cohort; the next sync repopulates it.
    Enable(ToggleArgs),

    /// Disable a cohort; the next sync empties it.
    Disable(ToggleArgs),

    /// Adopt legacy cohorts and create department and institution cohorts.
    Migrate(MigrateArgs),

    /// Resync one person's profile cohorts.
    SyncPerson(SyncPersonArgs),

    /// Print the current academic session.
    Session(SessionArgs),
}

// ---------------------------------------------------------------------------
// Shared PolicyKind argument: parsed from CLI strings, converts to sync type
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `PolicyKind` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct PolicyKindArg(pub PolicyKind);

impl FromStr for PolicyKindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<PolicyKind>().map(Self).map_err(|e| e.to_string())
    }
}

impl fmt::Display for PolicyKindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<PolicyKindArg> for PolicyKind {
    fn from(p: PolicyKindArg) -> Self {
        p.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Members(args) => args.run(),
        Commands::Enable(args) => args.run(true),
        Commands::Disable(args) => args.run(false),
        Commands::Migrate(args) => args.run(),
        Commands::SyncPerson(args) => args.run(),
        Commands::Session(args) => args.run(),
    }
}

/// Route library `log` records to stderr; `RUST_LOG` overrides the default
/// `warn` level so stdout stays clean for tables and JSON.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
