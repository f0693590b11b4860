//! Membership policies.
//!
//! A policy names its target group and decides who belongs in it. All five
//! share the one [`Reconciler`](crate::reconciler::Reconciler); only the
//! desired-set query differs.
//!
//! | policy      | identifier              | members                                       |
//! |-------------|-------------------------|-----------------------------------------------|
//! | department  | `<department>`          | staff filter + department matches             |
//! | institution | `inst_<slug>`           | staff filter + institution slug matches       |
//! | all-staff   | `all-staff`             | staff filter + department in staff list       |
//! | location    | `loc_<slug>_stu`        | active student on a running course there      |
//! | new-student | `student6`              | student account created inside the window     |

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use cohorts_core::types::{EnrolmentRole, EnrolmentStatus, Group, NewGroup, Person, PersonId};
use cohorts_core::{bounded_idnumber, AcademicSession, Settings};

use crate::eligibility::{course_is_running, department_key, is_new_student, StaffFilter};
use crate::error::SyncError;
use crate::host::Directory;

pub const ALL_STAFF_IDNUMBER: &str = "all-staff";
pub const NEW_STUDENT_IDNUMBER: &str = "student6";
pub const INSTITUTION_PREFIX: &str = "inst_";
pub const LOCATION_PREFIX: &str = "loc_";
pub const LOCATION_SUFFIX: &str = "_stu";

// ---------------------------------------------------------------------------
// Kinds and context
// ---------------------------------------------------------------------------

/// The five membership policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    Department,
    Institution,
    AllStaff,
    Location,
    NewStudent,
}

impl PolicyKind {
    pub fn all() -> &'static [PolicyKind] {
        &[
            PolicyKind::Department,
            PolicyKind::Institution,
            PolicyKind::AllStaff,
            PolicyKind::Location,
            PolicyKind::NewStudent,
        ]
    }

    /// Kinds driven by the user profile rather than enrolments.
    pub fn is_profile_field(&self) -> bool {
        matches!(
            self,
            PolicyKind::Department | PolicyKind::Institution | PolicyKind::AllStaff
        )
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Department => write!(f, "department"),
            PolicyKind::Institution => write!(f, "institution"),
            PolicyKind::AllStaff => write!(f, "all-staff"),
            PolicyKind::Location => write!(f, "location"),
            PolicyKind::NewStudent => write!(f, "new-student"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "department" => Ok(PolicyKind::Department),
            "institution" => Ok(PolicyKind::Institution),
            "all-staff" => Ok(PolicyKind::AllStaff),
            "location" => Ok(PolicyKind::Location),
            "new-student" => Ok(PolicyKind::NewStudent),
            other => Err(SyncError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Everything a predicate may look at besides the person.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    pub now: DateTime<Utc>,
    pub session: AcademicSession,
    pub settings: &'a Settings,
    pub staff: StaffFilter,
}

impl<'a> EvalContext<'a> {
    /// The session is taken from the UTC date of `now`.
    pub fn new(settings: &'a Settings, now: DateTime<Utc>) -> Self {
        Self {
            now,
            session: AcademicSession::containing(now.date_naive()),
            settings,
            staff: StaffFilter::from_settings(settings),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy trait
// ---------------------------------------------------------------------------

/// A rule binding one group to the people who should be in it.
pub trait Policy {
    fn kind(&self) -> PolicyKind;

    /// Identifier of the target group.
    fn idnumber(&self) -> &str;

    /// Attributes used when the target group has to be created.
    fn target(&self) -> NewGroup;

    fn is_eligible(&self, person: &Person, directory: &dyn Directory, ctx: &EvalContext) -> bool;

    /// Everyone the predicate currently selects.
    fn desired_members(&self, directory: &dyn Directory, ctx: &EvalContext) -> BTreeSet<PersonId> {
        directory
            .people()
            .iter()
            .filter(|p| self.is_eligible(p, directory, ctx))
            .map(|p| p.id)
            .collect()
    }
}

fn auto_populated(name: &str) -> String {
    format!("Auto populated {name}")
}

/// `academic` → `Academic`, `student services` → `Student Services`.
fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Department
// ---------------------------------------------------------------------------

/// Staff whose department field equals the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentPolicy {
    key: String,
}

impl DepartmentPolicy {
    pub fn new(department: &str) -> Self {
        Self {
            key: department_key(department),
        }
    }
}

impl Policy for DepartmentPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Department
    }

    fn idnumber(&self) -> &str {
        &self.key
    }

    fn target(&self) -> NewGroup {
        let name = title_case(&self.key);
        NewGroup {
            idnumber: self.key.clone(),
            description: auto_populated(&name),
            name,
        }
    }

    fn is_eligible(&self, person: &Person, _directory: &dyn Directory, ctx: &EvalContext) -> bool {
        department_key(&person.department) == self.key && ctx.staff.admits(person)
    }
}

// ---------------------------------------------------------------------------
// Institution
// ---------------------------------------------------------------------------

/// Staff whose institution slugs to the group's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionPolicy {
    idnumber: String,
    name: String,
}

impl InstitutionPolicy {
    pub fn new(institution: &str) -> Self {
        Self {
            idnumber: Self::idnumber_for(institution),
            name: institution.trim().to_string(),
        }
    }

    pub fn idnumber_for(institution: &str) -> String {
        bounded_idnumber(INSTITUTION_PREFIX, institution, "")
    }
}

impl Policy for InstitutionPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Institution
    }

    fn idnumber(&self) -> &str {
        &self.idnumber
    }

    fn target(&self) -> NewGroup {
        NewGroup {
            idnumber: self.idnumber.clone(),
            name: self.name.clone(),
            description: auto_populated(&self.name),
        }
    }

    fn is_eligible(&self, person: &Person, _directory: &dyn Directory, ctx: &EvalContext) -> bool {
        !person.institution.trim().is_empty()
            && Self::idnumber_for(&person.institution) == self.idnumber
            && ctx.staff.admits(person)
    }
}

// ---------------------------------------------------------------------------
// All staff
// ---------------------------------------------------------------------------

/// Staff in any of the configured staff departments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllStaffPolicy {
    departments: Vec<String>,
}

impl AllStaffPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            departments: settings
                .staff_departments()
                .iter()
                .map(|d| department_key(d))
                .collect(),
        }
    }

    pub fn is_staff_department(&self, department: &str) -> bool {
        let key = department_key(department);
        self.departments.iter().any(|d| *d == key)
    }
}

impl Policy for AllStaffPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::AllStaff
    }

    fn idnumber(&self) -> &str {
        ALL_STAFF_IDNUMBER
    }

    fn target(&self) -> NewGroup {
        NewGroup {
            idnumber: ALL_STAFF_IDNUMBER.to_string(),
            name: "All staff".to_string(),
            description: auto_populated("All staff"),
        }
    }

    fn is_eligible(&self, person: &Person, _directory: &dyn Directory, ctx: &EvalContext) -> bool {
        self.is_staff_department(&person.department) && ctx.staff.admits(person)
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Students actively enrolled on a running course tagged with the location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPolicy {
    idnumber: String,
    name: String,
}

impl LocationPolicy {
    pub fn new(location: &str) -> Self {
        Self {
            idnumber: Self::idnumber_for(location),
            name: format!("Student cohort for {}", location.trim()),
        }
    }

    pub fn idnumber_for(location: &str) -> String {
        bounded_idnumber(LOCATION_PREFIX, location, LOCATION_SUFFIX)
    }

    fn running_course_ids(
        &self,
        directory: &dyn Directory,
        ctx: &EvalContext,
    ) -> BTreeSet<cohorts_core::CourseId> {
        directory
            .courses()
            .iter()
            .filter(|c| {
                c.location
                    .as_deref()
                    .is_some_and(|loc| Self::idnumber_for(loc) == self.idnumber)
            })
            .filter(|c| course_is_running(c, ctx.session, ctx.now))
            .map(|c| c.id)
            .collect()
    }
}

impl Policy for LocationPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Location
    }

    fn idnumber(&self) -> &str {
        &self.idnumber
    }

    fn target(&self) -> NewGroup {
        NewGroup {
            idnumber: self.idnumber.clone(),
            name: self.name.clone(),
            description: auto_populated(&self.name),
        }
    }

    fn is_eligible(&self, person: &Person, directory: &dyn Directory, ctx: &EvalContext) -> bool {
        !person.suspended
            && self.desired_members(directory, ctx).contains(&person.id)
    }

    fn desired_members(&self, directory: &dyn Directory, ctx: &EvalContext) -> BTreeSet<PersonId> {
        let courses = self.running_course_ids(directory, ctx);
        if courses.is_empty() {
            return BTreeSet::new();
        }
        let people: BTreeMap<PersonId, &Person> =
            directory.people().iter().map(|p| (p.id, p)).collect();
        directory
            .enrolments()
            .iter()
            .filter(|e| courses.contains(&e.course))
            .filter(|e| e.role == EnrolmentRole::Student && e.status == EnrolmentStatus::Active)
            .filter(|e| people.get(&e.person).is_some_and(|p| !p.suspended))
            .map(|e| e.person)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// New students
// ---------------------------------------------------------------------------

/// Student accounts created within the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewStudentPolicy;

impl Policy for NewStudentPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::NewStudent
    }

    fn idnumber(&self) -> &str {
        NEW_STUDENT_IDNUMBER
    }

    fn target(&self) -> NewGroup {
        NewGroup {
            idnumber: NEW_STUDENT_IDNUMBER.to_string(),
            name: "New students".to_string(),
            description: auto_populated("students created in the last six months"),
        }
    }

    fn is_eligible(&self, person: &Person, _directory: &dyn Directory, ctx: &EvalContext) -> bool {
        is_new_student(person, ctx.now, ctx.settings.new_student_months)
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Policy governing an existing managed group, judged by its identifier.
///
/// Department groups have no prefix: any other managed group is keyed on
/// its own identifier as a department, whether or not anyone still has it.
pub fn policy_for_group(group: &Group, settings: &Settings) -> Option<Box<dyn Policy>> {
    if !group.is_managed() {
        return None;
    }
    let id = group.idnumber.as_str();
    if id == ALL_STAFF_IDNUMBER {
        return Some(Box::new(AllStaffPolicy::from_settings(settings)));
    }
    if id == NEW_STUDENT_IDNUMBER {
        return Some(Box::new(NewStudentPolicy));
    }
    if id.starts_with(LOCATION_PREFIX) && id.ends_with(LOCATION_SUFFIX) {
        return Some(Box::new(LocationPolicy {
            idnumber: id.to_string(),
            name: group.name.clone(),
        }));
    }
    if id.starts_with(INSTITUTION_PREFIX) {
        return Some(Box::new(InstitutionPolicy {
            idnumber: id.to_string(),
            name: group.name.clone(),
        }));
    }
    Some(Box::new(DepartmentPolicy::new(id)))
}

/// Distinct department keys across the whole directory.
pub fn known_departments(directory: &dyn Directory) -> BTreeSet<String> {
    directory
        .people()
        .iter()
        .map(|p| department_key(&p.department))
        .filter(|d| !d.is_empty())
        .collect()
}

/// Every policy implied by the directory's data plus existing managed groups,
/// one per target identifier, ordered by kind then identifier.
pub fn discover(
    directory: &dyn Directory,
    groups: &[Group],
    settings: &Settings,
) -> Vec<Box<dyn Policy>> {
    let mut found: BTreeMap<(PolicyKind, String), Box<dyn Policy>> = BTreeMap::new();
    let mut insert = |policy: Box<dyn Policy>| {
        found
            .entry((policy.kind(), policy.idnumber().to_string()))
            .or_insert(policy);
    };

    for department in &known_departments(directory) {
        insert(Box::new(DepartmentPolicy::new(department)));
    }
    for person in directory.people() {
        if !person.institution.trim().is_empty() {
            insert(Box::new(InstitutionPolicy::new(&person.institution)));
        }
    }
    insert(Box::new(AllStaffPolicy::from_settings(settings)));
    for course in directory.courses() {
        if let Some(location) = course.location.as_deref().filter(|l| !l.trim().is_empty()) {
            insert(Box::new(LocationPolicy::new(location)));
        }
    }
    insert(Box::new(NewStudentPolicy));

    for group in groups {
        if let Some(policy) = policy_for_group(group, settings) {
            insert(policy);
        }
    }

    found.into_values().collect()
}
