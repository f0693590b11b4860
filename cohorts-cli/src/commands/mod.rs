//! Subcommand implementations. Each `*Args` struct owns a `run()`.

pub mod init;
pub mod members;
pub mod migrate;
pub mod person;
pub mod session;
pub mod status;
pub mod sync;
pub mod toggle;

use std::path::PathBuf;

use anyhow::{Context, Result};

use cohorts_core::{config, store, Settings, Snapshot};

/// Everything a mutating command needs, loaded from `~/.cohorts`.
pub(crate) struct Workspace {
    pub home: PathBuf,
    pub settings: Settings,
    pub snapshot: Snapshot,
}

impl Workspace {
    pub fn load() -> Result<Self> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let settings = config::load_at(&home).context("failed to load ~/.cohorts/config.yaml")?;
        let snapshot =
            store::load_at(&home).context("failed to load snapshot; run `cohorts init` first")?;
        Ok(Self {
            home,
            settings,
            snapshot,
        })
    }

    pub fn save(&self) -> Result<()> {
        store::save_at(&self.home, &self.snapshot).context("failed to save snapshot")
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON")?
    );
    Ok(())
}
