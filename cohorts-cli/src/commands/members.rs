//! `cohorts members <idnumber>`

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cohorts_sync::Directory;

use super::{print_json, Workspace};

/// Arguments for `cohorts members`.
#[derive(Args, Debug)]
pub struct MembersArgs {
    /// Cohort identifier, e.g. `academic` or `loc_southampton_stu`.
    pub idnumber: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct MemberRow {
    id: u64,
    username: String,
    email: String,
    department: String,
    joined: String,
}

impl MembersArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let book = &ws.snapshot.cohorts;
        let Some(group) = book.managed(&self.idnumber) else {
            bail!("no managed cohort with identifier '{}'", self.idnumber);
        };

        let rows: Vec<MemberRow> = book
            .members
            .iter()
            .filter(|m| m.group == group.id)
            .map(|m| {
                let person = ws.snapshot.directory.person(m.person);
                MemberRow {
                    id: m.person.0,
                    username: person.map(|p| p.username.clone()).unwrap_or_default(),
                    email: person.map(|p| p.email.clone()).unwrap_or_default(),
                    department: person.map(|p| p.department.clone()).unwrap_or_default(),
                    joined: m.joined_at.format("%Y-%m-%d").to_string(),
                }
            })
            .collect();

        if self.json {
            return print_json(&rows);
        }

        println!("{} ({}): {} members", group.name, group.idnumber, rows.len());
        if !group.enabled {
            println!("Cohort is disabled; the next sync will empty it.");
        }
        if !rows.is_empty() {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        Ok(())
    }
}
