//! Domain types for cohort synchronisation.
//!
//! The snapshot mirrors the host platform's tables: people and course
//! enrolments on the directory side, groups and their members on the cohort
//! side. All types are serializable via serde + serde_yaml.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Component tag marking a group as owned by this system.
pub const COMPONENT: &str = "cohorts";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a person in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PersonId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A strongly-typed identifier for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for GroupId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A strongly-typed identifier for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseId(pub u64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for CourseId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where a group lives. Only system groups are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupScope {
    #[default]
    System,
    Category(u64),
}

/// Enrolment status as recorded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnrolmentStatus {
    #[default]
    Active,
    Suspended,
}

/// Role held through an enrolment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnrolmentRole {
    #[default]
    Student,
    Teacher,
    Other(String),
}

impl fmt::Display for EnrolmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrolmentRole::Student => write!(f, "student"),
            EnrolmentRole::Teacher => write!(f, "teacher"),
            EnrolmentRole::Other(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory side
// ---------------------------------------------------------------------------

/// A user account as seen in the host directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub username: String,
    pub email: String,
    /// Authentication source, e.g. `ldap` or `manual`.
    pub auth: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Person {
    /// Neither suspended nor deleted.
    pub fn is_active(&self) -> bool {
        !self.suspended && !self.deleted
    }
}

/// A course page, with the custom-field tags used by location policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub shortname: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Study level tag, carried for the host's data; no cohort is synced from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// A person's enrolment on a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrolment {
    pub person: PersonId,
    pub course: CourseId,
    #[serde(default)]
    pub role: EnrolmentRole,
    #[serde(default)]
    pub status: EnrolmentStatus,
}

/// Read-only directory data: people, courses and enrolments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DirectoryData {
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub enrolments: Vec<Enrolment>,
}

// ---------------------------------------------------------------------------
// Cohort side
// ---------------------------------------------------------------------------

/// A named group of people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Identifier slug, unique per scope and component.
    pub idnumber: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owning integration; empty for unmanaged groups.
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub scope: GroupScope,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Group {
    /// Owned by this system and living in the system scope.
    pub fn is_managed(&self) -> bool {
        self.component == COMPONENT && self.scope == GroupScope::System
    }
}

/// Attributes for a group that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub idnumber: String,
    pub name: String,
    pub description: String,
}

/// Membership of one person in one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub group: GroupId,
    pub person: PersonId,
    pub joined_at: DateTime<Utc>,
}

/// All groups and their members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CohortBook {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl CohortBook {
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Managed system group with the given identifier.
    pub fn managed(&self, idnumber: &str) -> Option<&Group> {
        self.groups
            .iter()
            .find(|g| g.is_managed() && g.idnumber == idnumber)
    }

    pub fn member_ids(&self, group: GroupId) -> BTreeSet<PersonId> {
        self.members
            .iter()
            .filter(|m| m.group == group)
            .map(|m| m.person)
            .collect()
    }

    pub fn is_member(&self, group: GroupId, person: PersonId) -> bool {
        self.members
            .iter()
            .any(|m| m.group == group && m.person == person)
    }

    /// Insert a new managed system group and return its id.
    pub fn insert_group(&mut self, new: NewGroup, now: DateTime<Utc>) -> GroupId {
        let id = GroupId(self.groups.iter().map(|g| g.id.0).max().unwrap_or(0) + 1);
        self.groups.push(Group {
            id,
            idnumber: new.idnumber,
            name: new.name,
            description: new.description,
            component: COMPONENT.to_string(),
            scope: GroupScope::System,
            enabled: true,
            visible: true,
            created_at: now,
            modified_at: now,
        });
        id
    }
}

/// Root of the persisted YAML snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub directory: DirectoryData,
    #[serde(default)]
    pub cohorts: CohortBook,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_group(idnumber: &str) -> NewGroup {
        NewGroup {
            idnumber: idnumber.to_string(),
            name: idnumber.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn newtype_display() {
        assert_eq!(PersonId::from(7).to_string(), "7");
        assert_eq!(GroupId::from(3).to_string(), "3");
        assert_eq!(CourseId::from(11).to_string(), "11");
    }

    #[test]
    fn inserted_groups_get_increasing_ids_and_are_managed() {
        let mut book = CohortBook::default();
        let now = Utc::now();
        let a = book.insert_group(new_group("academic"), now);
        let b = book.insert_group(new_group("support"), now);
        assert_eq!(a, GroupId(1));
        assert_eq!(b, GroupId(2));
        assert!(book.managed("support").expect("support").enabled);
    }

    #[test]
    fn unmanaged_group_is_not_found_by_managed_lookup() {
        let mut book = CohortBook::default();
        let id = book.insert_group(new_group("academic"), Utc::now());
        book.group_mut(id).expect("group").component = String::new();
        assert!(book.managed("academic").is_none());
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let snapshot = Snapshot {
            version: 1,
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&snapshot).expect("serialize");
        let back: Snapshot = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(snapshot, back);
    }

    #[test]
    fn group_flags_default_to_true() {
        let yaml = "id: 1\nidnumber: x\nname: X\ncreated_at: 2024-01-01T00:00:00Z\nmodified_at: 2024-01-01T00:00:00Z\n";
        let group: Group = serde_yaml::from_str(yaml).expect("deserialize");
        assert!(group.enabled);
        assert!(group.visible);
        assert!(group.component.is_empty());
    }

    #[test]
    fn role_display() {
        assert_eq!(EnrolmentRole::Student.to_string(), "student");
        assert_eq!(EnrolmentRole::Other("tutor".into()).to_string(), "tutor");
    }
}
