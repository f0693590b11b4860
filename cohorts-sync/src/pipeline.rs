//! Shared sync pipeline entrypoint used by the CLI.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use cohorts_core::types::{PersonId, Snapshot};
use cohorts_core::Settings;

use crate::error::SyncError;
use crate::host::{Directory, Membership};
use crate::lifecycle::ensure_group;
use crate::policy::{discover, EvalContext, Policy, PolicyKind};
use crate::reconciler::{MemberFailure, Reconciler};

/// Scope for a sync pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Every discovered policy.
    All,
    /// Every policy of one kind.
    Kind(PolicyKind),
    /// The single policy targeting this group identifier.
    Group(String),
}

impl SyncScope {
    fn admits(&self, policy: &dyn Policy) -> bool {
        match self {
            SyncScope::All => true,
            SyncScope::Kind(kind) => policy.kind() == *kind,
            SyncScope::Group(idnumber) => policy.idnumber() == idnumber,
        }
    }
}

/// Per-policy result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyOutcome {
    pub kind: PolicyKind,
    pub idnumber: String,
    pub name: String,
    /// Group was created by this run (would be, in dry-run).
    pub created: bool,
    pub enabled: bool,
    pub added: BTreeSet<PersonId>,
    pub removed: BTreeSet<PersonId>,
    pub failures: Vec<MemberFailure>,
    pub dry_run: bool,
}

impl PolicyOutcome {
    pub fn is_noop(&self) -> bool {
        !self.created && self.added.is_empty() && self.removed.is_empty() && self.failures.is_empty()
    }
}

/// Run the sync pipeline for a scope.
///
/// Discovers policies from the directory and the existing groups, ensures
/// each target group exists, then reconciles its membership. With
/// `dry_run` nothing is written; absent groups are reported as
/// would-create together with the members they would receive.
pub fn run<M: Membership + ?Sized>(
    directory: &dyn Directory,
    membership: &mut M,
    settings: &Settings,
    scope: &SyncScope,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<Vec<PolicyOutcome>, SyncError> {
    let ctx = EvalContext::new(settings, now);
    let has_locations = directory
        .courses()
        .iter()
        .any(|c| c.location.as_deref().is_some_and(|l| !l.trim().is_empty()));

    let policies: Vec<Box<dyn Policy>> = discover(directory, &membership.groups(), settings)
        .into_iter()
        .filter(|p| scope.admits(p.as_ref()))
        .collect();

    if let SyncScope::Group(idnumber) = scope {
        if policies.is_empty() {
            return Err(SyncError::UnknownGroup {
                idnumber: idnumber.clone(),
            });
        }
    }

    let mut outcomes = Vec::with_capacity(policies.len());
    let mut skipped_locations = false;

    for policy in &policies {
        let target = policy.target();
        let existing = membership.find_group(&target.idnumber);
        // Without location data only the existing location cohorts are
        // reconciled; their desired set is empty, so they drain.
        if policy.kind() == PolicyKind::Location && !has_locations && existing.is_none() {
            skipped_locations = true;
            continue;
        }
        tracing::debug!("evaluating {} policy for {}", policy.kind(), target.idnumber);

        if existing.is_none() && dry_run {
            let added = policy.desired_members(directory, &ctx);
            tracing::info!(
                "[dry-run] would create \"{}\" ({}) with {} members",
                target.name,
                target.idnumber,
                added.len()
            );
            outcomes.push(PolicyOutcome {
                kind: policy.kind(),
                idnumber: target.idnumber,
                name: target.name,
                created: true,
                enabled: true,
                added,
                removed: BTreeSet::new(),
                failures: Vec::new(),
                dry_run,
            });
            continue;
        }

        let name = target.name.clone();
        let created = match existing {
            Some(_) => false,
            None => ensure_group(membership, target, now)?.was_created(),
        };

        let reconciled = Reconciler::new(directory, &mut *membership, now)
            .dry_run(dry_run)
            .reconcile_policy(policy.as_ref(), &ctx);
        let Some(result) = reconciled else {
            continue;
        };
        outcomes.push(PolicyOutcome {
            kind: policy.kind(),
            idnumber: result.idnumber,
            name,
            created,
            enabled: result.enabled,
            added: result.added,
            removed: result.removed,
            failures: result.failures,
            dry_run,
        });
    }

    if skipped_locations {
        tracing::info!("no courses carry a location; not creating location cohorts");
    }

    let added: usize = outcomes.iter().map(|o| o.added.len()).sum();
    let removed: usize = outcomes.iter().map(|o| o.removed.len()).sum();
    let failures: usize = outcomes.iter().map(|o| o.failures.len()).sum();
    tracing::info!(
        "{}sync: {} cohorts, {added} added, {removed} removed, {failures} failures",
        if dry_run { "[dry-run] " } else { "" },
        outcomes.len()
    );

    Ok(outcomes)
}

/// [`run`] against a loaded snapshot.
pub fn run_snapshot(
    snapshot: &mut Snapshot,
    settings: &Settings,
    scope: &SyncScope,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<Vec<PolicyOutcome>, SyncError> {
    let Snapshot {
        directory, cohorts, ..
    } = snapshot;
    run(&*directory, cohorts, settings, scope, now, dry_run)
}
