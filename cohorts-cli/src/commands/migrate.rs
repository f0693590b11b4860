//! `cohorts migrate`: adopt legacy cohorts, bootstrap profile cohorts.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use cohorts_core::Snapshot;
use cohorts_sync::migrate;

use super::{print_json, Workspace};

/// Arguments for `cohorts migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl MigrateArgs {
    pub fn run(self) -> Result<()> {
        let mut ws = Workspace::load()?;
        let Snapshot {
            directory, cohorts, ..
        } = &mut ws.snapshot;
        let report =
            migrate(&*directory, cohorts, &ws.settings, Utc::now()).context("migration failed")?;
        ws.save()?;

        if self.json {
            return print_json(&report);
        }
        if report.is_empty() {
            println!("· Nothing to migrate");
            return Ok(());
        }
        for idnumber in &report.adopted {
            println!("✓ adopted '{idnumber}'");
        }
        for idnumber in &report.created {
            println!("✓ created '{idnumber}'");
        }
        for idnumber in &report.conflicts {
            println!("✗ skipped '{idnumber}' (a managed cohort already uses it)");
        }
        Ok(())
    }
}
