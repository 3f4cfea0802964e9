//! Bulk task operation engine: validation, per-item dispatch, and
//! bulk-path activity derivation.
//!
//! The engine performs no I/O. Every mutation is delegated to an injected
//! [`BulkMutator`], invoked strictly sequentially in target order. A failing
//! item never aborts the batch and never rolls back items that already
//! succeeded.

use std::collections::HashSet;
use std::time::Duration;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::history::ActivityRecord;
use crate::task::TaskChanges;
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Policy constants
// ---------------------------------------------------------------------------

/// Default maximum number of targets in one bulk operation.
pub const DEFAULT_MAX_TARGETS: usize = 100;

/// Default per-item processing estimate, in milliseconds.
pub const DEFAULT_PER_ITEM_ESTIMATE_MS: u64 = 50;

// ---------------------------------------------------------------------------
// Failure reasons
// ---------------------------------------------------------------------------

/// Validation reason when no targets were supplied.
pub const REASON_NO_TARGETS: &str = "No targets selected";

/// Validation reason when an update carries no field changes.
pub const REASON_NO_CHANGES: &str = "No changes specified";

/// Per-item reason when a target id does not match any entity.
pub const REASON_NOT_FOUND: &str = "Task not found";

// ---------------------------------------------------------------------------
// Entity lookup seam
// ---------------------------------------------------------------------------

/// Anything the engine can match against a target id.
pub trait Identified {
    fn id(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Mutation seam
// ---------------------------------------------------------------------------

/// Per-item mutation capability supplied by the caller.
///
/// Each call is final: the engine never undoes a successful call when a
/// later item fails.
pub trait BulkMutator {
    fn update(&mut self, id: &str, changes: &TaskChanges) -> Result<(), CoreError>;
    fn archive(&mut self, id: &str) -> Result<(), CoreError>;
    fn delete(&mut self, id: &str) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// The kind of bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperationKind {
    Update,
    Archive,
    Delete,
}

impl BulkOperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Archive => "archive",
            Self::Delete => "delete",
        }
    }

    /// Past-tense verb used in activity descriptions.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Update => "Updated",
            Self::Archive => "Archived",
            Self::Delete => "Deleted",
        }
    }
}

impl std::fmt::Display for BulkOperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch request: one operation applied uniformly to every target.
///
/// `target_ids` is an ordered set. Duplicate ids collapse onto their first
/// occurrence, so each target is processed at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    pub kind: BulkOperationKind,
    #[serde(default)]
    pub target_ids: IndexSet<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_changes: Option<TaskChanges>,
}

impl BulkOperation {
    pub fn update<I, S>(target_ids: I, changes: TaskChanges) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        Self {
            kind: BulkOperationKind::Update,
            target_ids: target_ids.into_iter().map(Into::into).collect(),
            field_changes: Some(changes),
        }
    }

    pub fn archive<I, S>(target_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        Self {
            kind: BulkOperationKind::Archive,
            target_ids: target_ids.into_iter().map(Into::into).collect(),
            field_changes: None,
        }
    }

    pub fn delete<I, S>(target_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        Self {
            kind: BulkOperationKind::Delete,
            target_ids: target_ids.into_iter().map(Into::into).collect(),
            field_changes: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// One failed item. `target_id` is `None` for a batch-level validation
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub target_id: Option<EntityId>,
    pub reason: String,
}

/// Outcome of a bulk operation.
///
/// When validation passed, `succeeded_count + failed_count` equals the
/// number of targets. `overall_success` is `failed_count == 0` in that case,
/// and always `false` for a rejected batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub overall_success: bool,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub failures: Vec<BulkFailure>,
    /// Ids that were mutated, in processing order.
    pub succeeded_ids: Vec<EntityId>,
}

impl BulkOperationResult {
    /// A batch rejected before any mutation.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            overall_success: false,
            succeeded_count: 0,
            failed_count: 0,
            failures: vec![BulkFailure {
                target_id: None,
                reason: reason.into(),
            }],
            succeeded_ids: Vec::new(),
        }
    }

    /// Returns `true` when the batch failed validation.
    pub fn is_rejected(&self) -> bool {
        self.failures.len() == 1 && self.failures[0].target_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable policy limits for bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPolicy {
    pub max_targets: usize,
    pub per_item_estimate: Duration,
}

impl Default for BulkPolicy {
    fn default() -> Self {
        Self {
            max_targets: DEFAULT_MAX_TARGETS,
            per_item_estimate: Duration::from_millis(DEFAULT_PER_ITEM_ESTIMATE_MS),
        }
    }
}

/// Projected processing time for a batch of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkEstimate {
    pub target_count: usize,
    pub estimated_ms: u64,
    pub max_targets: usize,
    pub within_limit: bool,
}

impl BulkPolicy {
    /// Reject policies that could never accept a batch.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_targets == 0 {
            return Err(CoreError::Validation(
                "Bulk max_targets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Estimated wall-clock time to process `count` targets.
    pub fn estimate_duration(&self, count: usize) -> Duration {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.per_item_estimate.saturating_mul(count)
    }

    pub fn estimate(&self, count: usize) -> BulkEstimate {
        let millis = self.estimate_duration(count).as_millis();
        BulkEstimate {
            target_count: count,
            estimated_ms: u64::try_from(millis).unwrap_or(u64::MAX),
            max_targets: self.max_targets,
            within_limit: count <= self.max_targets,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The validated per-item action.
enum Action<'a> {
    Update(&'a TaskChanges),
    Archive,
    Delete,
}

/// Applies bulk operations under a [`BulkPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkEngine {
    policy: BulkPolicy,
}

impl BulkEngine {
    pub fn new(policy: BulkPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BulkPolicy {
        &self.policy
    }

    /// Validate a batch without touching any entity.
    pub fn validate(&self, operation: &BulkOperation) -> Result<(), CoreError> {
        self.resolve_action(operation)
            .map(|_| ())
            .map_err(CoreError::Validation)
    }

    fn resolve_action<'a>(&self, operation: &'a BulkOperation) -> Result<Action<'a>, String> {
        if operation.target_ids.is_empty() {
            return Err(REASON_NO_TARGETS.to_string());
        }
        if operation.target_ids.len() > self.policy.max_targets {
            return Err(format!(
                "Cannot process more than {} tasks at once ({} selected)",
                self.policy.max_targets,
                operation.target_ids.len()
            ));
        }
        match operation.kind {
            BulkOperationKind::Update => match &operation.field_changes {
                Some(changes) if !changes.is_empty() => Ok(Action::Update(changes)),
                _ => Err(REASON_NO_CHANGES.to_string()),
            },
            BulkOperationKind::Archive => Ok(Action::Archive),
            BulkOperationKind::Delete => Ok(Action::Delete),
        }
    }

    /// Validate, then apply `operation` to each target in input order.
    ///
    /// Targets absent from `entities` fail with [`REASON_NOT_FOUND`] and no
    /// mutator call. Mutator errors are recorded against their item and
    /// processing continues.
    pub fn apply<E, M>(
        &self,
        entities: &[E],
        operation: &BulkOperation,
        mutators: &mut M,
    ) -> BulkOperationResult
    where
        E: Identified,
        M: BulkMutator + ?Sized,
    {
        let action = match self.resolve_action(operation) {
            Ok(action) => action,
            Err(reason) => return BulkOperationResult::rejected(reason),
        };

        let known: HashSet<&str> = entities.iter().map(Identified::id).collect();
        let mut failures = Vec::new();
        let mut succeeded_ids = Vec::new();

        for id in &operation.target_ids {
            if !known.contains(id.as_str()) {
                failures.push(BulkFailure {
                    target_id: Some(id.clone()),
                    reason: REASON_NOT_FOUND.to_string(),
                });
                continue;
            }

            let outcome = match action {
                Action::Update(changes) => mutators.update(id, changes),
                Action::Archive => mutators.archive(id),
                Action::Delete => mutators.delete(id),
            };

            match outcome {
                Ok(()) => succeeded_ids.push(id.clone()),
                Err(err) => failures.push(BulkFailure {
                    target_id: Some(id.clone()),
                    reason: err.to_string(),
                }),
            }
        }

        BulkOperationResult {
            overall_success: failures.is_empty(),
            succeeded_count: succeeded_ids.len(),
            failed_count: failures.len(),
            failures,
            succeeded_ids,
        }
    }
}

/// Apply `operation` under the default policy.
pub fn apply<E, M>(
    entities: &[E],
    operation: &BulkOperation,
    mutators: &mut M,
) -> BulkOperationResult
where
    E: Identified,
    M: BulkMutator + ?Sized,
{
    BulkEngine::default().apply(entities, operation, mutators)
}

// ---------------------------------------------------------------------------
// Bulk-path activity
// ---------------------------------------------------------------------------

/// Derive one activity record per succeeded target of a bulk operation.
///
/// This is the bulk pathway only. Status-transition activity comes from
/// [`crate::history::derive_changes`] and is not generated here.
pub fn bulk_activity(
    operation: &BulkOperation,
    result: &BulkOperationResult,
    occurred_at: Timestamp,
) -> Vec<ActivityRecord> {
    let fields = operation
        .field_changes
        .as_ref()
        .map(changed_field_names)
        .unwrap_or_default();

    result
        .succeeded_ids
        .iter()
        .map(|id| ActivityRecord::bulk(id.clone(), operation.kind, &fields, occurred_at))
        .collect()
}

/// Names of the fields a change set specifies, in declaration order.
pub fn changed_field_names(changes: &TaskChanges) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if changes.status.is_some() {
        fields.push("status");
    }
    if changes.priority.is_some() {
        fields.push("priority");
    }
    if changes.project_id.is_some() {
        fields.push("project_id");
    }
    if changes.due_date.is_some() {
        fields.push("due_date");
    }
    if changes.subcategory.is_some() {
        fields.push("subcategory");
    }
    fields
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
