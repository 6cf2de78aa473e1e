//! Collaborator traits
//!
//! The contract layer never talks to a database, a message gateway or a file
//! format directly. Lifecycle and import code is written against these traits;
//! [`super::memory`], [`super::audit`] and [`super::export`] provide the
//! in-process implementations.

use crate::domain::{PatientId, Result, StoreError, TenantId};
use crate::dto::{CreatePatientDto, ExportPatientsDto, Recipient, SendCommunicationDto};
use crate::schema::enums::{Channel, ExportFormat};
use crate::schema::patient::Patient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence for canonical patient records
///
/// Implementations own the version counter: `update` succeeds only when the
/// stored version equals `expected_version`.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Insert a new record
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id or the tenant's patient
    /// number is already taken.
    async fn insert(&self, patient: Patient) -> StoreResult<Patient>;

    /// Fetch one record of a tenant
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such record exists for `tenant_id`.
    async fn get(&self, tenant_id: TenantId, id: PatientId) -> StoreResult<Patient>;

    /// Replace a record
    ///
    /// # Arguments
    ///
    /// * `patient` - The new state, carrying the next version
    /// * `expected_version` - The version the caller read
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] if the stored version moved on,
    /// or [`StoreError::NotFound`] if the record is gone.
    async fn update(&self, patient: Patient, expected_version: u64) -> StoreResult<Patient>;

    /// Look for an existing record the candidate would duplicate
    ///
    /// A match is the same patient number within the tenant, or the same
    /// first name, last name and date of birth (case-insensitive names).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lookup cannot run.
    async fn find_duplicate(&self, candidate: &CreatePatientDto) -> StoreResult<Option<Patient>>;

    /// Next free patient number for a tenant
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if no number can be allocated.
    async fn next_patient_number(&self, tenant_id: TenantId) -> StoreResult<String>;
}

/// Delivery receipt returned by a sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub message_id: Uuid,
    pub channel: Channel,
    pub accepted_at: DateTime<Utc>,
}

/// Delivers messages on one channel
#[async_trait]
pub trait CommunicationSender: Send + Sync {
    /// The channel this sender serves
    fn channel(&self) -> Channel;

    /// Send a validated message to a resolved recipient
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Delivery`](crate::domain::ContractError::Delivery)
    /// if the gateway rejects the message.
    async fn send(
        &self,
        recipient: &Recipient,
        message: &SendCommunicationDto,
    ) -> Result<DeliveryReceipt>;
}

/// Renders patients into one export format
#[async_trait]
pub trait ExportGenerator: Send + Sync {
    /// The format tag this generator produces
    fn format(&self) -> ExportFormat;

    /// Render `patients` restricted to the request's field selection
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Export`](crate::domain::ContractError::Export)
    /// if the request asks for a different format or rendering fails.
    async fn generate(&self, request: &ExportPatientsDto, patients: &[Patient]) -> Result<Vec<u8>>;
}

/// Audited lifecycle operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Update,
    Merge,
    Anonymize,
    Archive,
    Restore,
    Import,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Update => "update",
            AuditAction::Merge => "merge",
            AuditAction::Anonymize => "anonymize",
            AuditAction::Archive => "archive",
            AuditAction::Restore => "restore",
            AuditAction::Import => "import",
        }
    }
}

/// One audit trail entry
///
/// Holds identifiers and the operator's stated reason, never record content.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub action: AuditAction,
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    /// The other side of a merge
    pub related_patient_id: Option<PatientId>,
    pub performed_by: String,
    pub reason: Option<String>,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        patient: &Patient,
        performed_by: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at,
            action,
            tenant_id: patient.tenant_id,
            patient_id: patient.id,
            related_patient_id: None,
            performed_by: performed_by.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_related(mut self, related: PatientId) -> Self {
        self.related_patient_id = Some(related);
        self
    }
}

/// Sink for audit events
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record one event
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Audit`](crate::domain::ContractError::Audit)
    /// if the event cannot be persisted.
    async fn record(&self, event: &AuditEvent) -> Result<()>;
}
