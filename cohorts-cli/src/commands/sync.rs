//! `cohorts sync`: reconcile managed cohorts against their policies.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use cohorts_sync::pipeline::{self, PolicyOutcome, SyncScope};

use super::{print_json, Workspace};
use crate::PolicyKindArg;

/// Arguments for `cohorts sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Sync every policy (the default).
    #[arg(long, conflicts_with_all = ["policy", "group"])]
    pub all: bool,

    /// Only policies of this kind: department | institution | all-staff |
    /// location | new-student.
    #[arg(long, value_name = "KIND", conflicts_with = "group")]
    pub policy: Option<PolicyKindArg>,

    /// Only the policy targeting this cohort identifier.
    #[arg(long, value_name = "IDNUMBER")]
    pub group: Option<String>,

    /// Show what would change without writing the snapshot.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    fn scope(&self) -> SyncScope {
        match (&self.policy, &self.group) {
            (Some(kind), _) => SyncScope::Kind(kind.0),
            (None, Some(group)) => SyncScope::Group(group.clone()),
            (None, None) => SyncScope::All,
        }
    }

    pub fn run(self) -> Result<()> {
        let mut ws = Workspace::load()?;
        let scope = self.scope();

        let outcomes = pipeline::run_snapshot(
            &mut ws.snapshot,
            &ws.settings,
            &scope,
            Utc::now(),
            self.dry_run,
        )
        .context("sync failed")?;

        if !self.dry_run {
            ws.save()?;
        }

        if self.json {
            return print_json(&outcomes);
        }
        print_outcomes(&outcomes, self.dry_run);
        Ok(())
    }
}

fn print_outcomes(outcomes: &[PolicyOutcome], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if outcomes.is_empty() {
        println!("{prefix}No cohorts matched.");
        return;
    }

    for o in outcomes {
        let state = if o.enabled {
            String::new()
        } else {
            format!(" {}", "(disabled)".yellow())
        };
        let created = match (o.created, dry_run) {
            (true, true) => " would create",
            (true, false) => " created",
            _ => "",
        };
        if o.is_noop() {
            println!("{prefix}· '{}'{state}: nothing to do", o.idnumber);
            continue;
        }
        println!(
            "{prefix}✓ '{}'{created}{state} (+{} -{})",
            o.idnumber,
            o.added.len(),
            o.removed.len()
        );
        for failure in &o.failures {
            println!(
                "  {} {:?} {}: {}",
                "✗".red(),
                failure.op,
                failure.person,
                failure.reason
            );
        }
    }

    let added: usize = outcomes.iter().map(|o| o.added.len()).sum();
    let removed: usize = outcomes.iter().map(|o| o.removed.len()).sum();
    let failed: usize = outcomes.iter().map(|o| o.failures.len()).sum();
    println!(
        "{prefix}{} cohorts, {added} added, {removed} removed, {failed} failed",
        outcomes.len()
    );
}
