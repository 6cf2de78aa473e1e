//! Bulk import planning and application
//!
//! An import runs in three stages:
//!
//! 1. [`validate_concurrently`]: envelope check, then per-element validation
//!    on blocking worker tasks, results reassembled in element order
//! 2. [`plan`]: each accepted element is matched against the store and given
//!    an [`ImportDecision`] under the request's duplicate policy
//! 3. [`run_import`]: depending on the request mode, stop after validation,
//!    report the plan, or write it through the [`PatientStore`]

use super::lifecycle::{materialize, replace_record};
use super::validator::Validator;
use crate::adapters::traits::PatientStore;
use crate::domain::{ContractError, FieldPath, PatientId, Result, StoreError};
use crate::dto::import::{assemble, validate_item};
use crate::dto::{
    BulkImportDto, CreatePatientDto, DuplicatePolicy, ImportEnvelope, ImportFailure, ImportMode,
};
use crate::schema::context::ValidationContext;
use crate::schema::node::parse;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// What happens to one accepted element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ImportDecision {
    /// No stored match; insert as new
    Create,
    /// Matches `existing`; left alone
    Skip { existing: PatientId },
    /// Matches `existing`; its record body is overwritten
    Update { existing: PatientId },
    /// Matches `existing` and the policy forbids touching it
    Conflict { existing: PatientId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedItem {
    pub index: usize,
    #[serde(flatten)]
    pub decision: ImportDecision,
}

/// Outcome of an import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub mode: ImportMode,
    /// Elements in the request
    pub total: usize,
    /// Elements rejected by validation or in-batch duplicate detection
    pub invalid: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub conflicts: usize,
    /// False unless the plan was written to the store
    pub applied: bool,
    pub plan: Vec<PlannedItem>,
    pub failures: Vec<ImportFailure>,
    #[serde(skip)]
    pub duration: Duration,
}

impl Default for ImportSummary {
    fn default() -> Self {
        Self {
            mode: ImportMode::ValidateOnly,
            total: 0,
            invalid: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            conflicts: 0,
            applied: false,
            plan: Vec::new(),
            failures: Vec::new(),
            duration: Duration::ZERO,
        }
    }
}

impl ImportSummary {
    /// True if every element was accepted and nothing conflicted
    pub fn is_clean(&self) -> bool {
        self.invalid == 0 && self.conflicts == 0
    }

    fn count(&mut self, decision: &ImportDecision) {
        match decision {
            ImportDecision::Create => self.created += 1,
            ImportDecision::Skip { .. } => self.skipped += 1,
            ImportDecision::Update { .. } => self.updated += 1,
            ImportDecision::Conflict { .. } => self.conflicts += 1,
        }
    }
}

/// Validates an import request with element validation spread over workers
///
/// Elements are split into at most `concurrency` contiguous chunks, each
/// validated on a blocking task. The result is identical to
/// [`Validator::validate_bulk_import`].
///
/// # Errors
///
/// - [`ContractError::Validation`] if the envelope is invalid
/// - [`ContractError::Other`] if a worker task panicked
pub async fn validate_concurrently(
    validator: &Validator,
    raw: &Value,
    concurrency: usize,
) -> Result<BulkImportDto> {
    let (options, now) = (*validator.options(), validator.now());

    let mut cx = ValidationContext::new(options, now);
    let envelope = parse::<ImportEnvelope>(raw, &FieldPath::root(), &mut cx);
    let mut envelope = cx.finish(envelope).inspect_err(|errors| {
        crate::log_validation_failed!("bulk_import", errors);
    })?;

    let elements: Vec<(usize, Value)> = std::mem::take(&mut envelope.patients)
        .into_iter()
        .enumerate()
        .collect();
    let chunk_size = elements.len().div_ceil(concurrency.max(1)).max(1);

    let mut chunks = Vec::new();
    let mut rest = elements;
    while !rest.is_empty() {
        let tail = rest.split_off(chunk_size.min(rest.len()));
        chunks.push(std::mem::replace(&mut rest, tail));
    }

    tracing::debug!(
        elements = chunks.iter().map(Vec::len).sum::<usize>(),
        workers = chunks.len(),
        "Validating import elements"
    );

    let tasks = chunks.into_iter().map(|chunk| {
        tokio::task::spawn_blocking(move || {
            chunk
                .into_iter()
                .map(|(index, value)| validate_item(index, &value, options, now))
                .collect::<Vec<_>>()
        })
    });

    let mut results = Vec::new();
    for joined in futures::future::join_all(tasks).await {
        let chunk = joined
            .map_err(|e| ContractError::Other(format!("Import validation worker failed: {e}")))?;
        results.extend(chunk);
    }

    Ok(assemble(&envelope, results))
}

/// Decides what to do with each accepted element
///
/// A match against an archived or merged record is always a conflict; the
/// duplicate policy only applies to live matches.
///
/// # Errors
///
/// Returns [`ContractError::Store`] if a duplicate lookup fails.
pub async fn plan(store: &dyn PatientStore, import: &BulkImportDto) -> Result<Vec<PlannedItem>> {
    let policy = import.flags.duplicate_policy();
    let mut planned = Vec::with_capacity(import.items.len());

    for item in &import.items {
        let decision = match store.find_duplicate(&item.patient).await? {
            None => ImportDecision::Create,
            Some(existing) if existing.is_deleted() => ImportDecision::Conflict {
                existing: existing.id,
            },
            Some(existing) => match policy {
                DuplicatePolicy::Update => ImportDecision::Update {
                    existing: existing.id,
                },
                DuplicatePolicy::Skip => ImportDecision::Skip {
                    existing: existing.id,
                },
                DuplicatePolicy::Reject => ImportDecision::Conflict {
                    existing: existing.id,
                },
            },
        };
        planned.push(PlannedItem {
            index: item.index,
            decision,
        });
    }

    Ok(planned)
}

/// Runs a validated import to the depth its flags ask for
///
/// Validate-only requests are summarized without touching the store. Dry
/// runs are planned and counted but nothing is written. Otherwise creates
/// and updates go through `store`; a record the store refuses as a duplicate
/// is counted as a conflict.
///
/// # Errors
///
/// Returns [`ContractError::Store`] on store failures other than duplicate
/// refusals.
pub async fn run_import(
    validator: &Validator,
    store: &dyn PatientStore,
    import: BulkImportDto,
    actor: &str,
) -> Result<ImportSummary> {
    let started = Instant::now();
    let mode = import.flags.mode();

    let mut summary = ImportSummary {
        mode,
        total: import.total(),
        invalid: import.failures.len(),
        ..ImportSummary::default()
    };

    if mode != ImportMode::ValidateOnly {
        let planned = plan(store, &import).await?;

        if mode == ImportMode::DryRun {
            for item in &planned {
                summary.count(&item.decision);
            }
        } else {
            for (item, planned_item) in import.items.into_iter().zip(&planned) {
                let decision =
                    apply_decision(validator, store, item.patient, planned_item.decision, actor)
                        .await;
                match decision {
                    Ok(outcome) => summary.count(&outcome),
                    Err(ContractError::Validation(errors)) => {
                        let at = FieldPath::root().key("patients").index(item.index);
                        summary.invalid += 1;
                        summary.failures.push(ImportFailure {
                            index: item.index,
                            errors: errors.prefixed(&at),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            summary.applied = true;
        }
        summary.plan = planned;
    }

    let mut failures = import.failures;
    failures.append(&mut summary.failures);
    summary.failures = failures;
    summary.duration = started.elapsed();
    crate::log_import_summary!(&summary);
    Ok(summary)
}

async fn apply_decision(
    validator: &Validator,
    store: &dyn PatientStore,
    patient: CreatePatientDto,
    decision: ImportDecision,
    actor: &str,
) -> Result<ImportDecision> {
    match decision {
        ImportDecision::Create => {
            let number = match &patient.patient_number {
                Some(number) => number.clone(),
                None => store.next_patient_number(patient.tenant_id).await?,
            };
            let candidate = patient.clone();
            let record = materialize(validator, patient, number, actor)?;
            match store.insert(record).await {
                Ok(_) => Ok(ImportDecision::Create),
                Err(StoreError::Duplicate(key)) => {
                    tracing::warn!(key = %key, "Import insert refused as duplicate");
                    match store.find_duplicate(&candidate).await? {
                        Some(existing) => Ok(ImportDecision::Conflict {
                            existing: existing.id,
                        }),
                        None => Err(StoreError::Duplicate(key).into()),
                    }
                }
                Err(e) => Err(e.into()),
            }
        }
        ImportDecision::Update { existing } => {
            let stored = store.get(patient.tenant_id, existing).await?;
            let next = replace_record(validator, &stored, patient, actor)?;
            match store.update(next, stored.version).await {
                Ok(_) => Ok(decision),
                Err(StoreError::VersionConflict { .. }) => Ok(ImportDecision::Conflict { existing }),
                Err(e) => Err(e.into()),
            }
        }
        other => Ok(other),
    }
}
