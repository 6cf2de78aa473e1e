//! Bulk import request
//!
//! The envelope is validated as a whole; a broken envelope rejects the
//! request. Each element of `patients` is then validated on its own against
//! the create projection, so one bad record never hides or blocks the others.
//! The result keeps the original indices of accepted and rejected elements.

use super::create::{normalize_create, CreatePatientDto};
use crate::domain::{FieldPath, TenantId, ValidationErrors, Violation, ViolationCode};
use crate::schema::context::{ValidationContext, ValidationOptions};
use crate::schema::enums::ImportSource;
use crate::schema::fields::Fields;
use crate::schema::node::{parse, Schema};
use crate::schema::primitives::{boolean, enum_value, list};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Processing switches of an import request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFlags {
    pub validate_only: bool,
    pub skip_duplicates: bool,
    pub update_existing: bool,
    pub dry_run: bool,
}

impl Default for ImportFlags {
    fn default() -> Self {
        Self {
            validate_only: false,
            skip_duplicates: true,
            update_existing: false,
            dry_run: false,
        }
    }
}

/// How far an import proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Stop after validation
    ValidateOnly,
    /// Plan against the store without writing
    DryRun,
    /// Plan and write
    Apply,
}

/// What happens to an accepted record that matches a stored patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    Update,
    Skip,
    Reject,
}

impl ImportFlags {
    pub fn mode(&self) -> ImportMode {
        if self.validate_only {
            ImportMode::ValidateOnly
        } else if self.dry_run {
            ImportMode::DryRun
        } else {
            ImportMode::Apply
        }
    }

    /// `updateExisting` takes precedence over `skipDuplicates`
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        if self.update_existing {
            DuplicatePolicy::Update
        } else if self.skip_duplicates {
            DuplicatePolicy::Skip
        } else {
            DuplicatePolicy::Reject
        }
    }
}

/// The request as received, elements not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEnvelope {
    pub source: ImportSource,
    pub patients: Vec<Value>,
    pub flags: ImportFlags,
}

pub struct ImportEnvelopeRaw {
    source: Option<ImportSource>,
    patients: Option<Vec<Value>>,
    validate_only: Option<bool>,
    skip_duplicates: Option<bool>,
    update_existing: Option<bool>,
    dry_run: Option<bool>,
}

fn raw_element(value: &Value, _: &FieldPath, _: &mut ValidationContext) -> Option<Value> {
    Some(value.clone())
}

impl Schema for ImportEnvelope {
    type Raw = ImportEnvelopeRaw;
    const KEYS: &'static [&'static str] = &[
        "source",
        "patients",
        "validateOnly",
        "skipDuplicates",
        "updateExisting",
        "dryRun",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> ImportEnvelopeRaw {
        let max_batch = cx.options().max_import_batch;
        ImportEnvelopeRaw {
            source: fields.required(cx, "source", enum_value::<ImportSource>),
            patients: fields.required(cx, "patients", list(raw_element, 1, max_batch)),
            validate_only: fields.optional(cx, "validateOnly", boolean),
            skip_duplicates: fields.optional(cx, "skipDuplicates", boolean),
            update_existing: fields.optional(cx, "updateExisting", boolean),
            dry_run: fields.optional(cx, "dryRun", boolean),
        }
    }

    fn build(raw: ImportEnvelopeRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        let defaults = ImportFlags::default();
        Some(Self {
            source: raw.source?,
            patients: raw.patients?,
            flags: ImportFlags {
                validate_only: raw.validate_only.unwrap_or(defaults.validate_only),
                skip_duplicates: raw.skip_duplicates.unwrap_or(defaults.skip_duplicates),
                update_existing: raw.update_existing.unwrap_or(defaults.update_existing),
                dry_run: raw.dry_run.unwrap_or(defaults.dry_run),
            },
        })
    }
}

/// An element that passed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportItem {
    pub index: usize,
    pub patient: CreatePatientDto,
}

/// An element that did not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFailure {
    pub index: usize,
    pub errors: ValidationErrors,
}

/// A validated bulk import
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportDto {
    pub source: ImportSource,
    pub flags: ImportFlags,
    pub items: Vec<ImportItem>,
    pub failures: Vec<ImportFailure>,
}

impl BulkImportDto {
    /// Number of elements in the request
    pub fn total(&self) -> usize {
        self.items.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn element_path(index: usize) -> FieldPath {
    FieldPath::root().key("patients").index(index)
}

/// Validates element `index` in a context of its own
///
/// Violations are rooted at `patients[index]`.
pub fn validate_item(
    index: usize,
    value: &Value,
    options: ValidationOptions,
    now: DateTime<Utc>,
) -> Result<CreatePatientDto, ValidationErrors> {
    let mut cx = ValidationContext::new(options, now);
    let result = normalize_create(value, &FieldPath::root(), &mut cx);
    cx.finish(result)
        .map_err(|errors| errors.prefixed(&element_path(index)))
}

#[derive(Hash, PartialEq, Eq)]
struct PersonKey {
    tenant_id: TenantId,
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
}

impl PersonKey {
    fn of(dto: &CreatePatientDto) -> Self {
        Self {
            tenant_id: dto.tenant_id,
            first_name: dto.record.name.first_name.to_lowercase(),
            last_name: dto.record.name.last_name.to_lowercase(),
            date_of_birth: dto.record.demographics.date_of_birth,
        }
    }
}

/// Splits per-element results into accepted items and failures
///
/// An accepted element that repeats an earlier one of the same tenant, by
/// patient number or by name and date of birth, becomes a `DuplicateEntry`
/// failure.
pub fn assemble(
    envelope: &ImportEnvelope,
    results: Vec<Result<CreatePatientDto, ValidationErrors>>,
) -> BulkImportDto {
    let mut items = Vec::new();
    let mut failures = Vec::new();
    let mut by_number: HashMap<(TenantId, String), usize> = HashMap::new();
    let mut by_person: HashMap<PersonKey, usize> = HashMap::new();

    for (index, result) in results.into_iter().enumerate() {
        let patient = match result {
            Ok(patient) => patient,
            Err(errors) => {
                failures.push(ImportFailure { index, errors });
                continue;
            }
        };

        let path = element_path(index);
        let earlier_number = patient
            .patient_number
            .as_ref()
            .and_then(|number| {
                by_number
                    .get(&(patient.tenant_id, number.clone()))
                    .copied()
            });
        let duplicate = match earlier_number {
            Some(earlier) => Some((path.key("patientNumber"), earlier)),
            None => by_person
                .get(&PersonKey::of(&patient))
                .map(|earlier| (path.key("name"), *earlier)),
        };

        if let Some((at, earlier)) = duplicate {
            failures.push(ImportFailure {
                index,
                errors: Violation::new(
                    at,
                    ViolationCode::DuplicateEntry,
                    format!("duplicates patients[{earlier}] in the same batch"),
                )
                .into(),
            });
            continue;
        }

        if let Some(number) = &patient.patient_number {
            by_number.insert((patient.tenant_id, number.clone()), index);
        }
        by_person.insert(PersonKey::of(&patient), index);
        items.push(ImportItem { index, patient });
    }

    BulkImportDto {
        source: envelope.source,
        flags: envelope.flags,
        items,
        failures,
    }
}

/// Validates the envelope, then every element in turn
///
/// Returns `None` only when the envelope itself is invalid; element failures
/// are carried in the result.
pub fn normalize_bulk_import(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<BulkImportDto> {
    let envelope = parse::<ImportEnvelope>(value, path, cx)?;
    let (options, now) = (*cx.options(), cx.now());
    let results = envelope
        .patients
        .iter()
        .enumerate()
        .map(|(index, element)| validate_item(index, element, options, now))
        .collect();
    Some(assemble(&envelope, results))
}
