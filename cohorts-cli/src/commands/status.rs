//! `cohorts status`: managed cohorts, their state and size.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cohorts_core::{CohortBook, Settings};
use cohorts_sync::lifecycle::is_adoptable;

use super::{print_json, Workspace};

/// Arguments for `cohorts status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let report = build_report(&ws.snapshot.cohorts, &ws.settings);
        if self.json {
            return print_json(&report);
        }
        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    summary: StatusSummary,
    cohorts: Vec<CohortStatus>,
}

#[derive(Debug, Serialize)]
struct StatusSummary {
    managed: usize,
    disabled: usize,
    members: usize,
    /// Unmanaged groups that `cohorts migrate` would adopt.
    adoptable: usize,
}

#[derive(Debug, Serialize)]
struct CohortStatus {
    idnumber: String,
    name: String,
    enabled: bool,
    visible: bool,
    members: usize,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "idnumber")]
    idnumber: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "members")]
    members: usize,
}

fn build_report(book: &CohortBook, settings: &Settings) -> StatusReport {
    let mut cohorts: Vec<CohortStatus> = book
        .groups
        .iter()
        .filter(|g| g.is_managed())
        .map(|g| CohortStatus {
            idnumber: g.idnumber.clone(),
            name: g.name.clone(),
            enabled: g.enabled,
            visible: g.visible,
            members: book.member_ids(g.id).len(),
        })
        .collect();
    cohorts.sort_by(|a, b| a.idnumber.cmp(&b.idnumber));

    StatusReport {
        summary: StatusSummary {
            managed: cohorts.len(),
            disabled: cohorts.iter().filter(|c| !c.enabled).count(),
            members: cohorts.iter().map(|c| c.members).sum(),
            adoptable: book
                .groups
                .iter()
                .filter(|g| is_adoptable(g, settings))
                .count(),
        },
        cohorts,
    }
}

fn print_table(report: StatusReport) {
    println!(
        "Cohorts v{} | {} managed | {} disabled | {} memberships",
        env!("CARGO_PKG_VERSION"),
        report.summary.managed,
        report.summary.disabled,
        report.summary.members,
    );

    if report.cohorts.is_empty() {
        println!("No managed cohorts. Run `cohorts sync` or `cohorts migrate`.");
    } else {
        let rows: Vec<StatusTableRow> = report
            .cohorts
            .into_iter()
            .map(|c| StatusTableRow {
                status: if c.enabled {
                    "enabled".green().to_string()
                } else {
                    "disabled".yellow().to_string()
                },
                idnumber: c.idnumber,
                name: c.name,
                members: c.members,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if report.summary.adoptable > 0 {
        println!(
            "{} legacy cohort(s) can be adopted; run 'cohorts migrate'.",
            report.summary.adoptable
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cohorts_core::{NewGroup, PersonId};
    use cohorts_sync::Membership;

    #[test]
    fn report_counts_managed_and_adoptable() {
        let mut book = CohortBook::default();
        let now = Utc::now();
        let academic = book.insert_group(
            NewGroup {
                idnumber: "academic".into(),
                name: "Academic".into(),
                description: String::new(),
            },
            now,
        );
        book.add_member(academic, PersonId(1), now).expect("add");
        let legacy = book.insert_group(
            NewGroup {
                idnumber: "Support".into(),
                name: "Support".into(),
                description: "Auto populated Support".into(),
            },
            now,
        );
        book.group_mut(legacy).expect("group").component.clear();

        let report = build_report(&book, &Settings::default());
        assert_eq!(report.summary.managed, 1);
        assert_eq!(report.summary.members, 1);
        assert_eq!(report.summary.adoptable, 1);
        assert_eq!(report.cohorts[0].idnumber, "academic");
    }
}
