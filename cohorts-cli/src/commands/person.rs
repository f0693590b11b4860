//! `cohorts sync-person <id>`

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;

use cohorts_core::{PersonId, Snapshot};
use cohorts_sync::sync_person;

use super::{print_json, Workspace};

/// Arguments for `cohorts sync-person`.
#[derive(Args, Debug)]
pub struct SyncPersonArgs {
    /// Directory id of the person.
    pub id: u64,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncPersonArgs {
    pub fn run(self) -> Result<()> {
        let mut ws = Workspace::load()?;
        let person = PersonId(self.id);
        let Snapshot {
            directory, cohorts, ..
        } = &mut ws.snapshot;
        let Some(outcome) = sync_person(&*directory, cohorts, &ws.settings, person, Utc::now())
            .with_context(|| format!("sync failed for person {person}"))?
        else {
            bail!("no person with id {person} in the snapshot");
        };
        ws.save()?;

        if self.json {
            return print_json(&outcome);
        }
        if outcome.is_noop() {
            println!("· person {person}: nothing to do");
            return Ok(());
        }
        for idnumber in &outcome.created {
            println!("✓ created '{idnumber}'");
        }
        for idnumber in &outcome.added {
            println!("+ {idnumber}");
        }
        for idnumber in &outcome.removed {
            println!("- {idnumber}");
        }
        for failure in &outcome.failures {
            println!("✗ {failure}");
        }
        Ok(())
    }
}
