//! In-memory patient store
//!
//! Backs the CLI's dry-run planning and the test suites. Records live in a
//! `tokio` read-write lock; patient numbers are allocated per tenant from a
//! counter seeded past any numeric suffix already stored.

use super::traits::{PatientStore, StoreResult};
use crate::domain::{PatientId, StoreError, TenantId};
use crate::dto::CreatePatientDto;
use crate::schema::patient::Patient;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

const NUMBER_PREFIX: &str = "P-";

#[derive(Default)]
struct Inner {
    patients: HashMap<PatientId, Patient>,
    counters: HashMap<TenantId, u64>,
}

#[derive(Default)]
pub struct MemoryPatientStore {
    inner: RwLock<Inner>,
}

impl MemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with `patients`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if two seeds share an id or number.
    pub async fn seeded(patients: impl IntoIterator<Item = Patient>) -> StoreResult<Self> {
        let store = Self::new();
        for patient in patients {
            store.insert(patient).await?;
        }
        Ok(store)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.patients.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every record of a tenant, ordered by patient number
    pub async fn list(&self, tenant_id: TenantId) -> Vec<Patient> {
        let inner = self.inner.read().await;
        let mut patients: Vec<Patient> = inner
            .patients
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.patient_number.cmp(&b.patient_number));
        patients
    }
}

fn numeric_suffix(number: &str) -> Option<u64> {
    number.strip_prefix(NUMBER_PREFIX)?.parse().ok()
}

fn same_person(patient: &Patient, candidate: &CreatePatientDto) -> bool {
    let (a, b) = (&patient.record, &candidate.record);
    a.demographics.date_of_birth == b.demographics.date_of_birth
        && a.name.first_name.eq_ignore_ascii_case(&b.name.first_name)
        && a.name.last_name.eq_ignore_ascii_case(&b.name.last_name)
}

#[async_trait]
impl PatientStore for MemoryPatientStore {
    async fn insert(&self, patient: Patient) -> StoreResult<Patient> {
        let mut inner = self.inner.write().await;

        if inner.patients.contains_key(&patient.id) {
            return Err(StoreError::Duplicate(patient.id.to_string()));
        }
        let number_taken = inner.patients.values().any(|p| {
            p.tenant_id == patient.tenant_id && p.patient_number == patient.patient_number
        });
        if number_taken {
            return Err(StoreError::Duplicate(patient.patient_number.clone()));
        }

        if let Some(suffix) = numeric_suffix(&patient.patient_number) {
            let counter = inner.counters.entry(patient.tenant_id).or_insert(0);
            *counter = (*counter).max(suffix);
        }

        inner.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get(&self, tenant_id: TenantId, id: PatientId) -> StoreResult<Patient> {
        let inner = self.inner.read().await;
        inner
            .patients
            .get(&id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, patient: Patient, expected_version: u64) -> StoreResult<Patient> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .patients
            .get_mut(&patient.id)
            .filter(|p| p.tenant_id == patient.tenant_id)
            .ok_or_else(|| StoreError::NotFound(patient.id.to_string()))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            });
        }

        *stored = patient.clone();
        Ok(patient)
    }

    async fn find_duplicate(&self, candidate: &CreatePatientDto) -> StoreResult<Option<Patient>> {
        let inner = self.inner.read().await;
        let in_tenant = || {
            inner
                .patients
                .values()
                .filter(move |p| p.tenant_id == candidate.tenant_id)
        };

        let by_number = candidate
            .patient_number
            .as_ref()
            .and_then(|number| in_tenant().find(|p| &p.patient_number == number));
        let found = by_number.or_else(|| in_tenant().find(|p| same_person(p, candidate)));
        Ok(found.cloned())
    }

    async fn next_patient_number(&self, tenant_id: TenantId) -> StoreResult<String> {
        let mut inner = self.inner.write().await;
        let counter = inner.counters.entry(tenant_id).or_insert(0);
        *counter += 1;
        Ok(format!("{NUMBER_PREFIX}{:06}", *counter))
    }
}
