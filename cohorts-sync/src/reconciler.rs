//! Membership reconciliation.
//!
//! ## Pass protocol
//!
//! 1. Look up the group; a missing group is a silent no-op.
//! 2. Disabled group → every current member is removed; the policy's
//!    predicate is never evaluated.
//! 3. Otherwise `to_add = desired − current`, `to_remove = current − desired`.
//! 4. Apply each add/remove on its own. A failure is logged and recorded,
//!    then the pass carries on with the next person.
//!
//! A second pass over unchanged inputs plans nothing and writes nothing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use cohorts_core::types::{GroupId, PersonId};

use crate::error::MembershipError;
use crate::host::{Directory, Membership};
use crate::policy::{EvalContext, Policy};

// ---------------------------------------------------------------------------
// Delta planning
// ---------------------------------------------------------------------------

/// Adds and removes needed to bring a group to its desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub to_add: BTreeSet<PersonId>,
    pub to_remove: BTreeSet<PersonId>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Pure set difference. `to_add` and `to_remove` are always disjoint.
pub fn plan_delta(
    enabled: bool,
    desired: &BTreeSet<PersonId>,
    current: &BTreeSet<PersonId>,
) -> Delta {
    if !enabled {
        return Delta {
            to_add: BTreeSet::new(),
            to_remove: current.clone(),
        };
    }
    Delta {
        to_add: desired.difference(current).copied().collect(),
        to_remove: current.difference(desired).copied().collect(),
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Which half of the delta a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberOp {
    Add,
    Remove,
}

/// One add or remove that the membership backend refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberFailure {
    pub person: PersonId,
    pub op: MemberOp,
    pub reason: String,
}

/// Result of reconciling one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub group: GroupId,
    pub idnumber: String,
    pub enabled: bool,
    /// Applied adds (planned adds in dry-run).
    pub added: BTreeSet<PersonId>,
    /// Applied removes (planned removes in dry-run).
    pub removed: BTreeSet<PersonId>,
    pub failures: Vec<MemberFailure>,
    pub dry_run: bool,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Applies policy deltas through injected directory and membership seams.
pub struct Reconciler<'a, M: Membership + ?Sized> {
    directory: &'a dyn Directory,
    membership: &'a mut M,
    now: DateTime<Utc>,
    dry_run: bool,
}

impl<'a, M: Membership + ?Sized> Reconciler<'a, M> {
    pub fn new(directory: &'a dyn Directory, membership: &'a mut M, now: DateTime<Utc>) -> Self {
        Self {
            directory,
            membership,
            now,
            dry_run: false,
        }
    }

    /// Plan only; never write.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Bring `group` in line with `desired`, reading current members from
    /// the membership backend.
    ///
    /// `desired` is only called when the group is enabled. Returns `None`
    /// when the group does not exist.
    pub fn reconcile_group<F>(&mut self, group: GroupId, desired: F) -> Option<ReconcileOutcome>
    where
        F: FnOnce() -> BTreeSet<PersonId>,
    {
        let Some(enabled) = self.membership.is_enabled(group) else {
            tracing::debug!("group {group} not found; skipping");
            return None;
        };
        let current = match self.membership.current_members(group) {
            Ok(current) => current,
            Err(MembershipError::GroupNotFound(_)) => {
                tracing::debug!("group {group} vanished; skipping");
                return None;
            }
            Err(err) => {
                tracing::warn!("could not read members of group {group}: {err}");
                return None;
            }
        };
        let desired = if enabled { desired() } else { BTreeSet::new() };
        self.reconcile(group, &desired, &current)
    }

    /// Evaluate `policy` against its target group and reconcile.
    pub fn reconcile_policy(
        &mut self,
        policy: &dyn Policy,
        ctx: &EvalContext,
    ) -> Option<ReconcileOutcome> {
        let group = self.membership.find_group(policy.idnumber())?;
        let directory = self.directory;
        self.reconcile_group(group, || policy.desired_members(directory, ctx))
    }

    /// Apply the delta between `desired` and `current` to `group`.
    ///
    /// Returns `None` when the group does not exist.
    pub fn reconcile(
        &mut self,
        group: GroupId,
        desired: &BTreeSet<PersonId>,
        current: &BTreeSet<PersonId>,
    ) -> Option<ReconcileOutcome> {
        let record = self.membership.group(group)?;
        let delta = plan_delta(record.enabled, desired, current);

        let mut outcome = ReconcileOutcome {
            group,
            idnumber: record.idnumber.clone(),
            enabled: record.enabled,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            failures: Vec::new(),
            dry_run: self.dry_run,
        };

        if !record.enabled && !current.is_empty() {
            tracing::info!(
                "cohort \"{}\" is disabled; removing all {} members",
                record.name,
                current.len()
            );
        } else if record.enabled && desired.is_empty() && !current.is_empty() {
            tracing::warn!(
                "no eligible members for \"{}\" ({}); emptying a group of {}",
                record.name,
                record.idnumber,
                current.len()
            );
        }

        if self.dry_run {
            for person in &delta.to_add {
                tracing::info!("[dry-run] would add {person} to {}", record.idnumber);
            }
            for person in &delta.to_remove {
                tracing::info!("[dry-run] would remove {person} from {}", record.idnumber);
            }
            outcome.added = delta.to_add;
            outcome.removed = delta.to_remove;
            return Some(outcome);
        }

        for person in delta.to_remove {
            match self.membership.remove_member(group, person) {
                Ok(()) => {
                    tracing::info!(" - removed {person} from {}", record.idnumber);
                    outcome.removed.insert(person);
                }
                Err(err) => {
                    tracing::warn!("failed to remove {person} from {}: {err}", record.idnumber);
                    outcome.failures.push(MemberFailure {
                        person,
                        op: MemberOp::Remove,
                        reason: err.to_string(),
                    });
                }
            }
        }

        for person in delta.to_add {
            match self.membership.add_member(group, person, self.now) {
                Ok(()) => {
                    tracing::info!(" - added {person} to {}", record.idnumber);
                    outcome.added.insert(person);
                }
                Err(err) => {
                    tracing::warn!("failed to add {person} to {}: {err}", record.idnumber);
                    outcome.failures.push(MemberFailure {
                        person,
                        op: MemberOp::Add,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Some(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
