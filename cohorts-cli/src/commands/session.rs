//! `cohorts session [--menu]`

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use cohorts_core::session::session_menu;
use cohorts_core::AcademicSession;

/// Arguments for `cohorts session`.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// List every selectable session, newest first.
    #[arg(long)]
    pub menu: bool,
}

impl SessionArgs {
    pub fn run(self) -> Result<()> {
        let today = Utc::now().date_naive();
        if self.menu {
            for session in session_menu(today) {
                println!("{session}");
            }
        } else {
            println!("{}", AcademicSession::containing(today));
        }
        Ok(())
    }
}
