//! `cohorts enable <idnumber>` / `cohorts disable <idnumber>`

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use cohorts_sync::set_enabled;

use super::Workspace;

/// Arguments shared by `cohorts enable` and `cohorts disable`.
#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Cohort identifier.
    pub idnumber: String,
}

impl ToggleArgs {
    pub fn run(self, enabled: bool) -> Result<()> {
        let mut ws = Workspace::load()?;
        let verb = if enabled { "enabled" } else { "disabled" };

        let changed = set_enabled(&mut ws.snapshot.cohorts, &self.idnumber, enabled, Utc::now())
            .with_context(|| format!("could not update '{}'", self.idnumber))?;
        if !changed {
            println!("· '{}' already {verb}", self.idnumber);
            return Ok(());
        }

        ws.save()?;
        println!("✓ '{}' {verb}", self.idnumber);
        println!("  Run 'cohorts sync --group {}' to apply.", self.idnumber);
        Ok(())
    }
}
