//! Error types for cohorts-sync.

use thiserror::Error;

use cohorts_core::types::{GroupId, PersonId};
use cohorts_core::StoreError;

/// Failures reported by a [`Membership`](crate::host::Membership) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    #[error("group {0} does not exist")]
    GroupNotFound(GroupId),

    #[error("person {person} is already a member of group {group}")]
    AlreadyMember { group: GroupId, person: PersonId },

    #[error("person {person} is not a member of group {group}")]
    NotMember { group: GroupId, person: PersonId },

    /// The backend refused the write for its own reasons.
    #[error("membership backend rejected the change: {0}")]
    Rejected(String),
}

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the snapshot store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A group-level membership operation failed.
    #[error("membership error: {0}")]
    Membership(#[from] MembershipError),

    /// No managed group carries this identifier.
    #[error("no managed group with identifier '{idnumber}'")]
    UnknownGroup { idnumber: String },

    /// Unrecognised policy name.
    #[error("unknown policy '{0}'; expected: department, institution, all-staff, location, new-student")]
    UnknownPolicy(String),
}
