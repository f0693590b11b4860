//! Group lifecycle: lookup-or-create, the enable toggle, and adoption of
//! groups created before this tool managed them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use cohorts_core::types::{Group, GroupId, GroupScope, NewGroup, COMPONENT};
use cohorts_core::Settings;

use crate::eligibility::department_key;
use crate::error::SyncError;
use crate::host::{Directory, Membership};
use crate::policy::{DepartmentPolicy, InstitutionPolicy, Policy};

/// Result of [`ensure_group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Existing(GroupId),
    Created(GroupId),
}

impl Ensured {
    pub fn id(&self) -> GroupId {
        match self {
            Ensured::Existing(id) | Ensured::Created(id) => *id,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }
}

/// Return the managed group for `target.idnumber`, creating it enabled when
/// absent.
pub fn ensure_group<M: Membership + ?Sized>(
    membership: &mut M,
    target: NewGroup,
    now: DateTime<Utc>,
) -> Result<Ensured, SyncError> {
    if let Some(id) = membership.find_group(&target.idnumber) {
        return Ok(Ensured::Existing(id));
    }
    tracing::info!("creating cohort \"{}\" ({})", target.name, target.idnumber);
    let id = membership.create_group(target, now)?;
    Ok(Ensured::Created(id))
}

/// Flip the enabled flag on a managed group. Returns `true` when the flag
/// actually changed.
///
/// Disabling does not touch members here; the next sync pass empties the
/// group.
pub fn set_enabled<M: Membership + ?Sized>(
    membership: &mut M,
    idnumber: &str,
    enabled: bool,
    now: DateTime<Utc>,
) -> Result<bool, SyncError> {
    let id = membership
        .find_group(idnumber)
        .ok_or_else(|| SyncError::UnknownGroup {
            idnumber: idnumber.to_string(),
        })?;
    let mut group = membership.group(id).ok_or_else(|| SyncError::UnknownGroup {
        idnumber: idnumber.to_string(),
    })?;
    if group.enabled == enabled {
        return Ok(false);
    }
    group.enabled = enabled;
    group.modified_at = now;
    membership.update_group(group)?;
    tracing::info!(
        "cohort {idnumber} {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(true)
}

// ---------------------------------------------------------------------------
// Adoption
// ---------------------------------------------------------------------------

/// Unowned system group whose description carries the adoption marker.
pub fn is_adoptable(group: &Group, settings: &Settings) -> bool {
    group.scope == GroupScope::System
        && group.component.is_empty()
        && !group.idnumber.trim().is_empty()
        && group.description.contains(&settings.adoption_marker)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adoption {
    Adopted(GroupId),
    /// Fails the adoption criteria; left untouched.
    Ineligible,
    /// A managed group already carries the lowercased identifier.
    Conflict { existing: GroupId },
}

/// Take ownership of a pre-existing group.
///
/// The identifier is lowercased, the group is stamped with this system's
/// component, and `enabled` is seeded from `visible`.
pub fn adopt_group<M: Membership + ?Sized>(
    membership: &mut M,
    id: GroupId,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<Adoption, SyncError> {
    let Some(mut group) = membership.group(id) else {
        return Ok(Adoption::Ineligible);
    };
    if !is_adoptable(&group, settings) {
        return Ok(Adoption::Ineligible);
    }
    let idnumber = group.idnumber.trim().to_lowercase();
    if let Some(existing) = membership.find_group(&idnumber) {
        tracing::warn!(
            "cannot adopt \"{}\": managed cohort {idnumber} already exists",
            group.name
        );
        return Ok(Adoption::Conflict { existing });
    }
    group.idnumber = idnumber;
    group.component = COMPONENT.to_string();
    group.enabled = group.visible;
    group.modified_at = now;
    tracing::info!("adopted cohort \"{}\" as {}", group.name, group.idnumber);
    membership.update_group(group)?;
    Ok(Adoption::Adopted(id))
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// What [`migrate`] did, by group identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub adopted: Vec<String>,
    pub conflicts: Vec<String>,
    pub created: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.adopted.is_empty() && self.conflicts.is_empty() && self.created.is_empty()
    }
}

/// Adopt every eligible legacy group, then make sure a group exists for
/// each department and institution held by an active person.
///
/// Safe to run repeatedly; a second run reports nothing.
pub fn migrate<M: Membership + ?Sized>(
    directory: &dyn Directory,
    membership: &mut M,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<MigrationReport, SyncError> {
    let mut report = MigrationReport::default();

    let candidates: Vec<Group> = membership
        .groups()
        .into_iter()
        .filter(|g| is_adoptable(g, settings))
        .collect();
    for group in candidates {
        match adopt_group(membership, group.id, settings, now)? {
            Adoption::Adopted(_) => report.adopted.push(group.idnumber.trim().to_lowercase()),
            Adoption::Conflict { .. } => report.conflicts.push(group.idnumber),
            Adoption::Ineligible => {}
        }
    }

    let active = directory.people().iter().filter(|p| p.is_active());
    let mut departments = BTreeSet::new();
    let mut institutions = BTreeSet::new();
    for person in active {
        let department = department_key(&person.department);
        if !department.is_empty() {
            departments.insert(department);
        }
        let institution = person.institution.trim();
        if !institution.is_empty() {
            institutions.insert(institution.to_string());
        }
    }

    let mut targets: Vec<NewGroup> = departments
        .iter()
        .map(|d| DepartmentPolicy::new(d).target())
        .collect();
    targets.extend(institutions.iter().map(|i| InstitutionPolicy::new(i).target()));

    for target in targets {
        let idnumber = target.idnumber.clone();
        if ensure_group(membership, target, now)?.was_created() {
            report.created.push(idnumber);
        }
    }

    tracing::info!(
        "migration: {} adopted, {} conflicts, {} created",
        report.adopted.len(),
        report.conflicts.len(),
        report.created.len()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
