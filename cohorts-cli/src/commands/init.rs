//! `cohorts init`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use cohorts_core::{config, store, Settings};

/// Create `~/.cohorts/` with an empty snapshot and default settings.
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let existed = store::snapshot_path_at(&home).exists();
        let snapshot = store::init_at(&home).context("failed to initialise snapshot")?;
        if existed {
            println!(
                "· Snapshot already present ({} people, {} cohorts)",
                snapshot.directory.people.len(),
                snapshot.cohorts.groups.len()
            );
        } else {
            println!("✓ Created empty snapshot");
        }
        println!("  {}", store::snapshot_path_at(&home).display());

        let config_path = config::config_path_at(&home);
        if !config_path.exists() {
            config::save_at(&home, &Settings::default())
                .context("failed to write default settings")?;
            println!("✓ Wrote default settings");
            println!("  {}", config_path.display());
        }
        Ok(())
    }
}
