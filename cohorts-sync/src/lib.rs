//! # cohorts-sync
//!
//! Policy evaluation and membership reconciliation.
//!
//! Call [`pipeline::run`] to bring every managed group in line with its
//! policy, or [`profile::sync_person`] to resync one person after a profile
//! change. Host data arrives through the [`Directory`] and [`Membership`]
//! traits; the `cohorts-core` snapshot types implement both.

pub mod eligibility;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod pipeline;
pub mod policy;
pub mod profile;
pub mod reconciler;

pub use error::{MembershipError, SyncError};
pub use host::{Directory, Membership};
pub use lifecycle::{adopt_group, ensure_group, migrate, set_enabled, Adoption, MigrationReport};
pub use pipeline::{run, run_snapshot, PolicyOutcome, SyncScope};
pub use policy::{discover, EvalContext, Policy, PolicyKind};
pub use profile::{sync_person, PersonSyncOutcome};
pub use reconciler::{plan_delta, Delta, ReconcileOutcome, Reconciler};
