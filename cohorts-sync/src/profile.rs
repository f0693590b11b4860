//! Single-person resync after a profile change.
//!
//! Only the profile-driven groups (department, institution, all-staff) are
//! touched. Location and new-student membership belongs to the batch pass.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cohorts_core::types::{GroupId, PersonId};
use cohorts_core::Settings;

use crate::error::SyncError;
use crate::host::{Directory, Membership};
use crate::lifecycle::ensure_group;
use crate::policy::{
    policy_for_group, AllStaffPolicy, DepartmentPolicy, EvalContext, InstitutionPolicy, Policy,
};

/// Changes made for one person, by group identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSyncOutcome {
    pub person: PersonId,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub created: Vec<String>,
    pub failures: Vec<String>,
}

impl PersonSyncOutcome {
    fn new(person: PersonId) -> Self {
        Self {
            person,
            added: Vec::new(),
            removed: Vec::new(),
            created: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.created.is_empty()
            && self.failures.is_empty()
    }
}

/// Re-evaluate `person` against the profile-driven groups.
///
/// Returns `Ok(None)` when the directory has no such person.
pub fn sync_person<M: Membership + ?Sized>(
    directory: &dyn Directory,
    membership: &mut M,
    settings: &Settings,
    person: PersonId,
    now: DateTime<Utc>,
) -> Result<Option<PersonSyncOutcome>, SyncError> {
    let Some(record) = directory.person(person) else {
        tracing::debug!("person {person} not in directory; nothing to sync");
        return Ok(None);
    };
    let mut outcome = PersonSyncOutcome::new(person);

    let memberships: Vec<(GroupId, String)> = membership
        .groups()
        .into_iter()
        .filter(|g| g.is_managed())
        .filter(|g| {
            membership
                .current_members(g.id)
                .is_ok_and(|members| members.contains(&person))
        })
        .map(|g| (g.id, g.idnumber))
        .collect();

    let has_profile =
        !record.department.trim().is_empty() || !record.institution.trim().is_empty();
    if !has_profile && memberships.is_empty() {
        return Ok(Some(outcome));
    }

    if !record.is_active() {
        tracing::info!("person {person} is inactive; removing from all managed cohorts");
        for (group, idnumber) in memberships {
            remove(membership, group, &idnumber, &mut outcome);
        }
        return Ok(Some(outcome));
    }

    let ctx = EvalContext::new(settings, now);

    // Drop memberships of profile groups the person no longer qualifies for.
    for (group, idnumber) in &memberships {
        let Some(record_group) = membership.group(*group) else {
            continue;
        };
        let Some(policy) = policy_for_group(&record_group, settings) else {
            continue;
        };
        if !policy.kind().is_profile_field() {
            continue;
        }
        if !record_group.enabled || !policy.is_eligible(record, directory, &ctx) {
            remove(membership, *group, idnumber, &mut outcome);
        }
    }

    // Join the groups the profile now points at.
    let mut candidates: Vec<Box<dyn Policy>> = Vec::new();
    if !record.department.trim().is_empty() {
        candidates.push(Box::new(DepartmentPolicy::new(&record.department)));
    }
    if !record.institution.trim().is_empty() {
        candidates.push(Box::new(InstitutionPolicy::new(&record.institution)));
    }
    candidates.push(Box::new(AllStaffPolicy::from_settings(settings)));

    for policy in candidates {
        if !policy.is_eligible(record, directory, &ctx) {
            continue;
        }
        let ensured = ensure_group(membership, policy.target(), now)?;
        if ensured.was_created() {
            outcome.created.push(policy.idnumber().to_string());
        }
        let group = ensured.id();
        if membership.is_enabled(group) != Some(true) {
            continue;
        }
        let already = membership
            .current_members(group)
            .is_ok_and(|members| members.contains(&person));
        if already {
            continue;
        }
        match membership.add_member(group, person, now) {
            Ok(()) => outcome.added.push(policy.idnumber().to_string()),
            Err(err) => {
                tracing::warn!("failed to add {person} to {}: {err}", policy.idnumber());
                outcome.failures.push(format!("add {}: {err}", policy.idnumber()));
            }
        }
    }

    Ok(Some(outcome))
}

fn remove<M: Membership + ?Sized>(
    membership: &mut M,
    group: GroupId,
    idnumber: &str,
    outcome: &mut PersonSyncOutcome,
) {
    match membership.remove_member(group, outcome.person) {
        Ok(()) => outcome.removed.push(idnumber.to_string()),
        Err(err) => {
            tracing::warn!("failed to remove {} from {idnumber}: {err}", outcome.person);
            outcome.failures.push(format!("remove {idnumber}: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use chrono::TimeZone;
    use cohorts_core::types::{CohortBook, DirectoryData, Person};

    use crate::lifecycle::set_enabled;
    use crate::policy::NewStudentPolicy;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap()
    }

    fn staff(department: &str, institution: &str) -> Person {
        Person {
            id: PersonId(7),
            username: "jbloggs".into(),
            email: "joe.bloggs@solent.ac.uk".into(),
            auth: "ldap".into(),
            department: department.into(),
            institution: institution.into(),
            suspended: false,
            deleted: false,
            created_at: now(),
        }
    }

    fn dir(person: Person) -> DirectoryData {
        DirectoryData {
            people: vec![person],
            ..DirectoryData::default()
        }
    }

    fn groups_of(book: &CohortBook, person: PersonId) -> BTreeSet<String> {
        book.groups
            .iter()
            .filter(|g| book.is_member(g.id, person))
            .map(|g| g.idnumber.clone())
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_staff_member_joins_and_creates_groups() {
        let directory = dir(staff("Academic", "Solent University"));
        let mut book = CohortBook::default();
        let outcome = sync_person(&directory, &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync")
            .expect("known person");
        assert_eq!(outcome.created.len(), 3);
        assert_eq!(
            groups_of(&book, PersonId(7)),
            set(&["academic", "inst_solent-university", "all-staff"])
        );
    }

    #[test]
    fn department_change_moves_the_person() {
        let mut book = CohortBook::default();
        let before = dir(staff("academic", ""));
        sync_person(&before, &mut book, &Settings::default(), PersonId(7), now()).expect("sync");

        let after = dir(staff("finance", ""));
        let outcome = sync_person(&after, &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync")
            .expect("known person");
        assert!(outcome.removed.contains(&"academic".to_string()));
        assert!(outcome.removed.contains(&"all-staff".to_string()));
        assert_eq!(groups_of(&book, PersonId(7)), set(&["finance"]));
    }

    #[test]
    fn suspended_person_leaves_every_managed_group() {
        let mut book = CohortBook::default();
        let active = dir(staff("academic", ""));
        sync_person(&active, &mut book, &Settings::default(), PersonId(7), now()).expect("sync");
        let student6 = ensure_group(&mut book, NewStudentPolicy.target(), now())
            .expect("ensure")
            .id();
        book.add_member(student6, PersonId(7), now()).expect("add");

        let mut person = staff("academic", "");
        person.suspended = true;
        sync_person(&dir(person), &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync");
        assert!(groups_of(&book, PersonId(7)).is_empty());
    }

    #[test]
    fn batch_only_groups_are_left_alone() {
        let mut book = CohortBook::default();
        let student6 = ensure_group(&mut book, NewStudentPolicy.target(), now())
            .expect("ensure")
            .id();
        book.add_member(student6, PersonId(7), now()).expect("add");
        sync_person(&dir(staff("academic", "")), &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync");
        assert!(book.is_member(student6, PersonId(7)));
    }

    #[test]
    fn disabled_group_is_not_joined_and_is_left() {
        let mut book = CohortBook::default();
        let directory = dir(staff("academic", ""));
        sync_person(&directory, &mut book, &Settings::default(), PersonId(7), now()).expect("sync");
        set_enabled(&mut book, "academic", false, now()).expect("toggle");

        sync_person(&directory, &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync");
        assert_eq!(groups_of(&book, PersonId(7)), set(&["all-staff"]));
    }

    #[test]
    fn excluded_account_is_dropped() {
        let mut book = CohortBook::default();
        sync_person(&dir(staff("academic", "")), &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync");
        let mut consultant = staff("academic", "");
        consultant.username = "consultant042".into();
        sync_person(&dir(consultant), &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync");
        assert!(groups_of(&book, PersonId(7)).is_empty());
    }

    #[test]
    fn unknown_person_is_a_noop() {
        let mut book = CohortBook::default();
        let result = sync_person(
            &DirectoryData::default(),
            &mut book,
            &Settings::default(),
            PersonId(1),
            now(),
        )
        .expect("sync");
        assert!(result.is_none());
        assert!(book.groups.is_empty());
    }

    #[test]
    fn person_without_profile_or_memberships_gets_an_empty_outcome() {
        let mut book = CohortBook::default();
        let outcome = sync_person(&dir(staff("", "")), &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync")
            .expect("known person");
        assert_eq!(outcome.person, PersonId(7));
        assert!(outcome.is_noop());
        assert!(book.groups.is_empty());
    }

    #[test]
    fn department_group_is_left_after_the_department_is_gone() {
        let mut book = CohortBook::default();
        sync_person(&dir(staff("finance", "")), &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync");
        let outcome = sync_person(&dir(staff("", "")), &mut book, &Settings::default(), PersonId(7), now())
            .expect("sync")
            .expect("known person");
        assert!(outcome.removed.contains(&"finance".to_string()));
        assert!(groups_of(&book, PersonId(7)).is_empty());
    }
}
