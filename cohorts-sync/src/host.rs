//! Seams to the host platform.
//!
//! [`Directory`] is the read-only view of people and enrolments;
//! [`Membership`] is the group store and its mutation API. The reconciler
//! and policies only ever see these traits. The snapshot types from
//! `cohorts-core` implement both so the tool runs without a host.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use cohorts_core::types::{
    CohortBook, Course, DirectoryData, Enrolment, Group, GroupId, Member, NewGroup, Person,
    PersonId,
};

use crate::error::MembershipError;

/// Read-only access to people, courses and enrolments.
pub trait Directory {
    fn people(&self) -> &[Person];
    fn courses(&self) -> &[Course];
    fn enrolments(&self) -> &[Enrolment];

    fn person(&self, id: PersonId) -> Option<&Person> {
        self.people().iter().find(|p| p.id == id)
    }
}

/// Group storage and membership mutation.
pub trait Membership {
    /// Every group known to the host, managed or not.
    fn groups(&self) -> Vec<Group>;

    fn group(&self, id: GroupId) -> Option<Group>;

    /// Managed system group carrying `idnumber`.
    fn find_group(&self, idnumber: &str) -> Option<GroupId>;

    /// `None` when the group does not exist.
    fn is_enabled(&self, group: GroupId) -> Option<bool>;

    fn current_members(&self, group: GroupId) -> Result<BTreeSet<PersonId>, MembershipError>;

    fn add_member(
        &mut self,
        group: GroupId,
        person: PersonId,
        now: DateTime<Utc>,
    ) -> Result<(), MembershipError>;

    fn remove_member(&mut self, group: GroupId, person: PersonId) -> Result<(), MembershipError>;

    /// Create a managed, enabled system group.
    fn create_group(&mut self, new: NewGroup, now: DateTime<Utc>)
        -> Result<GroupId, MembershipError>;

    /// Replace the stored record for `group.id`.
    fn update_group(&mut self, group: Group) -> Result<(), MembershipError>;
}

// ---------------------------------------------------------------------------
// Snapshot implementations
// ---------------------------------------------------------------------------

impl Directory for DirectoryData {
    fn people(&self) -> &[Person] {
        &self.people
    }

    fn courses(&self) -> &[Course] {
        &self.courses
    }

    fn enrolments(&self) -> &[Enrolment] {
        &self.enrolments
    }
}

impl Membership for CohortBook {
    fn groups(&self) -> Vec<Group> {
        self.groups.clone()
    }

    fn group(&self, id: GroupId) -> Option<Group> {
        CohortBook::group(self, id).cloned()
    }

    fn find_group(&self, idnumber: &str) -> Option<GroupId> {
        self.managed(idnumber).map(|g| g.id)
    }

    fn is_enabled(&self, group: GroupId) -> Option<bool> {
        CohortBook::group(self, group).map(|g| g.enabled)
    }

    fn current_members(&self, group: GroupId) -> Result<BTreeSet<PersonId>, MembershipError> {
        if CohortBook::group(self, group).is_none() {
            return Err(MembershipError::GroupNotFound(group));
        }
        Ok(self.member_ids(group))
    }

    fn add_member(
        &mut self,
        group: GroupId,
        person: PersonId,
        now: DateTime<Utc>,
    ) -> Result<(), MembershipError> {
        if CohortBook::group(self, group).is_none() {
            return Err(MembershipError::GroupNotFound(group));
        }
        if self.is_member(group, person) {
            return Err(MembershipError::AlreadyMember { group, person });
        }
        self.members.push(Member {
            group,
            person,
            joined_at: now,
        });
        Ok(())
    }

    fn remove_member(&mut self, group: GroupId, person: PersonId) -> Result<(), MembershipError> {
        let before = self.members.len();
        self.members
            .retain(|m| !(m.group == group && m.person == person));
        if self.members.len() == before {
            return Err(MembershipError::NotMember { group, person });
        }
        Ok(())
    }

    fn create_group(
        &mut self,
        new: NewGroup,
        now: DateTime<Utc>,
    ) -> Result<GroupId, MembershipError> {
        Ok(self.insert_group(new, now))
    }

    fn update_group(&mut self, group: Group) -> Result<(), MembershipError> {
        let id = group.id;
        let slot = self
            .group_mut(id)
            .ok_or(MembershipError::GroupNotFound(id))?;
        *slot = group;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_group() -> (CohortBook, GroupId) {
        let mut book = CohortBook::default();
        let id = book.insert_group(
            NewGroup {
                idnumber: "academic".into(),
                name: "Academic".into(),
                description: String::new(),
            },
            Utc::now(),
        );
        (book, id)
    }

    #[test]
    fn add_then_remove_member() {
        let (mut book, id) = book_with_group();
        book.add_member(id, PersonId(1), Utc::now()).expect("add");
        assert_eq!(
            book.current_members(id).expect("members"),
            BTreeSet::from([PersonId(1)])
        );
        book.remove_member(id, PersonId(1)).expect("remove");
        assert!(book.current_members(id).expect("members").is_empty());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let (mut book, id) = book_with_group();
        book.add_member(id, PersonId(1), Utc::now()).expect("add");
        let err = book.add_member(id, PersonId(1), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            MembershipError::AlreadyMember {
                group: id,
                person: PersonId(1)
            }
        );
    }

    #[test]
    fn removing_non_member_errors() {
        let (mut book, id) = book_with_group();
        assert!(matches!(
            book.remove_member(id, PersonId(9)),
            Err(MembershipError::NotMember { .. })
        ));
    }

    #[test]
    fn missing_group_reports_none_and_errors() {
        let book = CohortBook::default();
        assert_eq!(book.is_enabled(GroupId(4)), None);
        assert_eq!(
            book.current_members(GroupId(4)).unwrap_err(),
            MembershipError::GroupNotFound(GroupId(4))
        );
    }

    #[test]
    fn update_group_replaces_record() {
        let (mut book, id) = book_with_group();
        let mut group = Membership::group(&book, id).expect("group");
        group.enabled = false;
        book.update_group(group).expect("update");
        assert_eq!(book.is_enabled(id), Some(false));
    }

    #[test]
    fn directory_person_lookup() {
        let data = DirectoryData::default();
        assert!(data.person(PersonId(1)).is_none());
    }
}
