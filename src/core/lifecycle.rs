//! Applying validated requests to stored records
//!
//! Every function here takes a canonical [`Patient`] and a request that has
//! already passed its contract, checks that the transition is allowed, and
//! returns the next state with the version bumped. The result is serialized
//! and pushed back through the canonical contract, so a transition can never
//! produce a record the store would reject on read.
//!
//! State rules:
//!
//! | From       | Archive | Restore | Merge (either side) | Update |
//! |------------|---------|---------|---------------------|--------|
//! | `Active`   | yes     | no      | yes                 | yes    |
//! | `Archived` | no      | yes     | no                  | no     |
//! | `Merged`   | no      | no      | no                  | no     |

use super::validator::Validator;
use crate::domain::{
    ContractError, FieldPath, PatientId, Result, StoreError, ValidationErrors, Violation,
    ViolationCode,
};
use crate::dto::{
    ArchivePatientDto, CreatePatientDto, MergePatientsDto, RestorePatientDto, UpdatePatientDto,
};
use crate::schema::collections::dedupe;
use crate::schema::enums::PatientStatus;
use crate::schema::medical::{MedicalFlags, MAX_ENTRIES as MAX_MEDICAL_ENTRIES};
use crate::schema::patient::{AuditStamp, Patient, MAX_TAGS};
use chrono::{DateTime, Utc};
use serde_json::Value;

const MERGED_INTO: &str = "mergedInto";

/// Runs the canonical contract over a computed state
pub(crate) fn revalidate(validator: &Validator, patient: &Patient) -> Result<Patient> {
    let value = serde_json::to_value(patient)?;
    Ok(validator.validate_patient(&value)?)
}

/// Stamps the modification and bumps the version
pub(crate) fn touch(patient: &mut Patient, actor: &str, now: DateTime<Utc>) {
    patient.audit.updated_at = now.max(patient.audit.created_at);
    patient.audit.updated_by = actor.to_string();
    patient.version += 1;
}

fn transition(key: &str, message: impl Into<String>) -> Violation {
    let path = if key.is_empty() {
        FieldPath::root()
    } else {
        FieldPath::root().key(key)
    };
    Violation::new(path, ViolationCode::InvalidTransition, message)
}

fn target_check(errors: &mut ValidationErrors, key: &str, requested: PatientId, patient: &Patient) {
    if requested != patient.id {
        errors.push(transition(
            key,
            format!("request targets {requested} but patient {} was supplied", patient.id),
        ));
    }
}

fn into_result(errors: ValidationErrors) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

/// Builds the first stored state of a created patient
///
/// # Errors
///
/// Returns [`ContractError::Validation`] if the resulting record fails the
/// canonical contract.
pub fn materialize(
    validator: &Validator,
    dto: CreatePatientDto,
    patient_number: String,
    actor: &str,
) -> Result<Patient> {
    let now = validator.now();
    let patient = Patient {
        id: PatientId::generate(),
        tenant_id: dto.tenant_id,
        organization_id: dto.organization_id,
        clinic_id: dto.clinic_id,
        patient_number: dto.patient_number.unwrap_or(patient_number),
        record: dto.record,
        audit: AuditStamp {
            created_at: now,
            created_by: actor.to_string(),
            updated_at: now,
            updated_by: actor.to_string(),
            deleted_at: None,
            deleted_by: None,
        },
        version: 0,
    };
    revalidate(validator, &patient)
}

/// Overwrites the client-editable body of `existing` with an imported record
///
/// Identity, tenancy and audit history are kept.
///
/// # Errors
///
/// Returns [`ContractError::Validation`] if `existing` is not active or the
/// result fails the canonical contract.
pub fn replace_record(
    validator: &Validator,
    existing: &Patient,
    dto: CreatePatientDto,
    actor: &str,
) -> Result<Patient> {
    if existing.record.status != PatientStatus::Active || existing.is_deleted() {
        return Err(ValidationErrors::from(transition(
            "",
            format!("patient {} is {} and cannot be overwritten", existing.id, existing.record.status),
        ))
        .into());
    }

    let mut next = existing.clone();
    next.organization_id = dto.organization_id;
    next.clinic_id = dto.clinic_id.or(existing.clinic_id);
    next.record = dto.record;
    touch(&mut next, actor, validator.now());
    revalidate(validator, &next)
}

/// Applies an update patch
///
/// Absent keys keep their stored value; supplied keys replace it wholesale.
/// An explicit `null` for `assignedProviderId` clears the assignment.
///
/// # Errors
///
/// - [`ContractError::Store`] with [`StoreError::VersionConflict`] if the
///   request's version is not the stored one
/// - [`ContractError::Validation`] if the record is archived or merged, the
///   patch moves the status into `archived` or `merged`, or the result fails
///   the canonical contract
pub fn apply_update(
    validator: &Validator,
    patient: &Patient,
    dto: &UpdatePatientDto,
    actor: &str,
) -> Result<Patient> {
    if dto.version != patient.version {
        return Err(StoreError::VersionConflict {
            expected: dto.version,
            actual: patient.version,
        }
        .into());
    }

    let mut errors = ValidationErrors::new();
    if patient.is_deleted() || patient.record.status == PatientStatus::Merged {
        errors.push(transition(
            "",
            format!("patient {} is {} and cannot be updated", patient.id, patient.record.status),
        ));
    }
    if let Some(status @ (PatientStatus::Archived | PatientStatus::Merged)) = dto.changes.status {
        errors.push(transition(
            "status",
            format!("status '{status}' is set by its own operation, not by update"),
        ));
    }
    into_result(errors)?;

    let changes = dto.changes.clone();
    let mut next = patient.clone();
    let record = &mut next.record;

    if let Some(organization_id) = changes.organization_id {
        next.organization_id = organization_id;
    }
    if let Some(clinic_id) = changes.clinic_id {
        next.clinic_id = Some(clinic_id);
    }
    if let Some(patient_number) = changes.patient_number {
        next.patient_number = patient_number;
    }
    if let Some(name) = changes.name {
        record.name = name;
    }
    if let Some(demographics) = changes.demographics {
        record.demographics = demographics;
    }
    if let Some(contacts) = changes.contacts {
        record.contacts = contacts;
    }
    if let Some(emergency_contacts) = changes.emergency_contacts {
        record.emergency_contacts = emergency_contacts;
    }
    if let Some(insurance) = changes.insurance {
        record.insurance = Some(insurance);
    }
    if let Some(medical) = changes.medical {
        record.medical = Some(medical);
    }
    if let Some(prefs) = changes.communication_preferences {
        record.communication_preferences = prefs;
    }
    if let Some(consents) = changes.consents {
        record.consents = consents;
    }
    if let Some(status) = changes.status {
        record.status = status;
    }
    if let Some(assignment) = changes.assigned_provider_id {
        record.assigned_provider_id = assignment.into_option();
    }
    if let Some(referral_source) = changes.referral_source {
        record.referral_source = Some(referral_source);
    }
    if let Some(tags) = changes.tags {
        record.tags = tags;
    }
    if let Some(notes) = changes.notes {
        record.notes = Some(notes);
    }
    if let Some(metadata) = changes.metadata {
        record.metadata = metadata;
    }

    touch(&mut next, actor, validator.now());
    revalidate(validator, &next)
}

/// Soft-deletes an active patient
///
/// # Errors
///
/// Returns [`ContractError::Validation`] with `InvalidTransition` if the
/// request names another patient, or the patient is already archived or merged.
pub fn apply_archive(
    validator: &Validator,
    patient: &Patient,
    dto: &ArchivePatientDto,
) -> Result<Patient> {
    let mut errors = ValidationErrors::new();
    target_check(&mut errors, "patientId", dto.patient_id, patient);
    match patient.record.status {
        PatientStatus::Merged | PatientStatus::Archived => errors.push(transition(
            "patientId",
            format!("patient {} is already {}", patient.id, patient.record.status),
        )),
        _ if patient.is_deleted() => errors.push(transition(
            "patientId",
            format!("patient {} is already deleted", patient.id),
        )),
        _ => {}
    }
    into_result(errors)?;

    let now = validator.now().max(patient.audit.created_at);
    let mut next = patient.clone();
    next.record.status = PatientStatus::Archived;
    next.audit.deleted_at = Some(now);
    next.audit.deleted_by = Some(dto.performed_by.clone());
    touch(&mut next, &dto.performed_by, now);

    tracing::info!(patient_id = %patient.id, "Patient archived");
    revalidate(validator, &next)
}

/// Brings an archived patient back to `Active`
///
/// # Errors
///
/// Returns [`ContractError::Validation`] with `InvalidTransition` unless the
/// request names this patient and the patient is archived.
pub fn apply_restore(
    validator: &Validator,
    patient: &Patient,
    dto: &RestorePatientDto,
) -> Result<Patient> {
    let mut errors = ValidationErrors::new();
    target_check(&mut errors, "patientId", dto.patient_id, patient);
    if patient.record.status != PatientStatus::Archived {
        errors.push(transition(
            "patientId",
            format!(
                "only archived patients can be restored; patient {} is {}",
                patient.id, patient.record.status
            ),
        ));
    }
    into_result(errors)?;

    let mut next = patient.clone();
    next.record.status = PatientStatus::Active;
    next.audit.deleted_at = None;
    next.audit.deleted_by = None;
    touch(&mut next, &dto.performed_by, validator.now());

    tracing::info!(patient_id = %patient.id, "Patient restored");
    revalidate(validator, &next)
}

/// Both records after a merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Retired record, status `Merged`
    pub source: Patient,
    /// Surviving record
    pub target: Patient,
    /// Related collections the caller still has to move
    /// (`appointments`, `treatments`, `documents`)
    pub pending_transfers: Vec<&'static str>,
}

fn merge_medical(target: &mut Option<MedicalFlags>, source: &Option<MedicalFlags>) {
    let Some(source) = source else {
        return;
    };
    match target {
        None => *target = Some(source.clone()),
        Some(target) => {
            target.allergies.extend(source.allergies.iter().cloned());
            dedupe(&mut target.allergies);
            target.medications.extend(source.medications.iter().cloned());
            dedupe(&mut target.medications);
            target.conditions.extend(source.conditions.iter().cloned());
            dedupe(&mut target.conditions);
            target.alerts.extend(source.alerts.iter().cloned());
            dedupe(&mut target.alerts);
        }
    }
}

/// Medical lists that outgrew their limit after a merge
fn medical_overflow(medical: &MedicalFlags) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let path = FieldPath::root()
        .key("conflictResolution")
        .key("mergeMedicalHistory");
    for (list, len) in [
        ("allergies", medical.allergies.len()),
        ("medications", medical.medications.len()),
        ("conditions", medical.conditions.len()),
        ("alerts", medical.alerts.len()),
    ] {
        if len > MAX_MEDICAL_ENTRIES {
            errors.push(Violation::new(
                path.clone(),
                ViolationCode::TooManyItems,
                format!(
                    "merged medical.{list} would hold {len} entries, at most {MAX_MEDICAL_ENTRIES} allowed"
                ),
            ));
        }
    }
    errors
}

/// Folds `source` into `target` and retires `source`
///
/// # Errors
///
/// Returns [`ContractError::Validation`] with `InvalidTransition` if either
/// record is not the one named by the request, the two belong to different
/// tenants, or either side is archived or already merged. Every such problem
/// is reported together. A merged medical list over its limit is reported as
/// `TooManyItems`. Merged tags beyond the limit are dropped, keeping the
/// target's own tags first.
pub fn apply_merge_status(
    validator: &Validator,
    source: &Patient,
    target: &Patient,
    dto: &MergePatientsDto,
) -> Result<MergeOutcome> {
    let mut errors = ValidationErrors::new();
    target_check(&mut errors, "sourcePatientId", dto.source_patient_id, source);
    target_check(&mut errors, "targetPatientId", dto.target_patient_id, target);
    if source.tenant_id != target.tenant_id {
        errors.push(transition(
            "targetPatientId",
            "source and target belong to different tenants",
        ));
    }
    for (key, patient) in [("sourcePatientId", source), ("targetPatientId", target)] {
        if patient.is_deleted() || patient.record.status == PatientStatus::Merged {
            errors.push(transition(
                key,
                format!("patient {} is {} and cannot be merged", patient.id, patient.record.status),
            ));
        }
    }
    into_result(errors)?;

    let now = validator.now();
    let resolution = &dto.conflict_resolution;
    let mut survivor = target.clone();
    let record = &mut survivor.record;

    if resolution.prefer_source_demographics {
        record.demographics = source.record.demographics.clone();
    }
    if resolution.prefer_source_contacts {
        record.contacts = source.record.contacts.clone();
    }
    if resolution.merge_insurance && record.insurance.is_none() {
        record.insurance = source.record.insurance.clone();
    }
    if resolution.merge_medical_history {
        merge_medical(&mut record.medical, &source.record.medical);
        if let Some(medical) = &record.medical {
            into_result(medical_overflow(medical))?;
        }
    }
    if resolution.merge_tags {
        record.tags.extend(source.record.tags.iter().cloned());
        dedupe(&mut record.tags);
        if record.tags.len() > MAX_TAGS {
            tracing::warn!(
                target_id = %target.id,
                dropped = record.tags.len() - MAX_TAGS,
                "Merged tags truncated"
            );
            record.tags.truncate(MAX_TAGS);
        }
    }
    touch(&mut survivor, &dto.performed_by, now);

    let mut retired = source.clone();
    retired.record.status = PatientStatus::Merged;
    retired
        .record
        .metadata
        .insert(MERGED_INTO.to_string(), Value::String(target.id.to_string()));
    retired.audit.deleted_at = Some(now.max(source.audit.created_at));
    retired.audit.deleted_by = Some(dto.performed_by.clone());
    touch(&mut retired, &dto.performed_by, now);

    let pending_transfers = [
        ("appointments", resolution.merge_appointments),
        ("treatments", resolution.merge_treatments),
        ("documents", resolution.merge_documents),
    ]
    .into_iter()
    .filter_map(|(name, enabled)| enabled.then_some(name))
    .collect();

    tracing::info!(
        source_id = %source.id,
        target_id = %target.id,
        "Patients merged"
    );

    Ok(MergeOutcome {
        source: revalidate(validator, &retired)?,
        target: revalidate(validator, &survivor)?,
        pending_transfers,
    })
}

/// True if `error` is a transition refusal rather than bad data
pub fn is_transition_error(error: &ContractError) -> bool {
    error
        .violations()
        .is_some_and(|v| v.has_code(ViolationCode::InvalidTransition))
}
