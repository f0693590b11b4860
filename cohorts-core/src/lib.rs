//! Cohorts core library: domain types, slugs, sessions, settings, snapshot store.
//!
//! - [`types`]: newtypes, directory and cohort structs
//! - [`slug`]: identifier slugs for free-text names
//! - [`session`]: academic session arithmetic
//! - [`config`]: [`Settings`] load / save
//! - [`store`]: snapshot load / save / init
//! - [`error`]: [`StoreError`]

pub mod config;
pub mod error;
pub mod session;
pub mod slug;
pub mod store;
pub mod types;

pub use config::Settings;
pub use error::StoreError;
pub use session::AcademicSession;
pub use slug::{bounded_idnumber, slugify};
pub use types::{
    CohortBook, Course, CourseId, DirectoryData, Enrolment, EnrolmentRole, EnrolmentStatus,
    Group, GroupId, GroupScope, Member, NewGroup, Person, PersonId, Snapshot,
};
