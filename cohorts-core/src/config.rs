//! Plugin settings, read from `<home>/.cohorts/config.yaml`.
//!
//! A missing file yields [`Settings::default`]; missing keys fall back to
//! their individual defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{self, cohorts_dir_at};

/// Settings consumed by the eligibility predicates and adoption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Comma-separated prefixes; an email or username starting with any of
    /// them is never a staff cohort member.
    pub email_exclude_pattern: String,
    /// Comma-separated departments that make up `all-staff`.
    pub staff_cohorts: String,
    /// Email suffix every staff member must carry.
    pub institutional_domain: String,
    /// Only accounts from this authentication source are considered staff.
    pub auth_source: String,
    /// Rolling window for the new-student cohort.
    pub new_student_months: u32,
    /// Description marker that makes an unmanaged group adoptable.
    pub adoption_marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email_exclude_pattern: "academic,consultant,jobshop".to_string(),
            staff_cohorts: "academic,management,support".to_string(),
            institutional_domain: "@solent.ac.uk".to_string(),
            auth_source: "ldap".to_string(),
            new_student_months: 6,
            adoption_marker: "Auto populated".to_string(),
        }
    }
}

impl Settings {
    pub fn excluded_prefixes(&self) -> Vec<String> {
        split_list(&self.email_exclude_pattern)
    }

    pub fn staff_departments(&self) -> Vec<String> {
        split_list(&self.staff_cohorts)
    }
}

/// Split a comma-separated setting, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `<home>/.cohorts/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".cohorts").join("config.yaml")
}

/// Load settings, falling back to defaults when no file exists.
pub fn load_at(home: &Path) -> Result<Settings, StoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, StoreError> {
    load_at(&store::home()?)
}

/// Atomically write settings to `<home>/.cohorts/config.yaml`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), StoreError> {
    cohorts_dir_at(home)?;
    let yaml = serde_yaml::to_string(settings)?;
    store::write_atomic(&config_path_at(home), &yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_shipped_values() {
        let s = Settings::default();
        assert_eq!(s.excluded_prefixes(), vec!["academic", "consultant", "jobshop"]);
        assert_eq!(s.staff_departments(), vec!["academic", "management", "support"]);
        assert_eq!(s.new_student_months, 6);
    }

    #[test]
    fn split_list_drops_blanks_and_whitespace() {
        assert_eq!(split_list(" a, ,b,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().expect("home");
        assert_eq!(load_at(home.path()).expect("load"), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let home = TempDir::new().expect("home");
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "staff_cohorts: academic\n").expect("write");

        let s = load_at(home.path()).expect("load");
        assert_eq!(s.staff_departments(), vec!["academic"]);
        assert_eq!(s.auth_source, "ldap");
    }

    #[test]
    fn save_then_load_roundtrip() {
        let home = TempDir::new().expect("home");
        let s = Settings {
            email_exclude_pattern: "temp".into(),
            ..Settings::default()
        };
        save_at(home.path(), &s).expect("save");
        assert_eq!(load_at(home.path()).expect("load"), s);
    }
}
