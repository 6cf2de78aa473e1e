//! Audit log sinks
//!
//! [`FileAuditLog`] appends one JSON object per line. Lines carry identifiers,
//! the action, the operator and a SHA-256 digest of the reason; free-text
//! reasons can mention clinical detail and are never written in plain text.
//! [`TracingAuditLog`] emits the same fields as `tracing` events.

use super::traits::{AuditEvent, AuditLog};
use crate::domain::{ContractError, PatientId, Result, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Hex SHA-256 of a free-text value
pub fn digest(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditLine<'a> {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    action: &'static str,
    tenant_id: TenantId,
    patient_id: PatientId,
    #[serde(skip_serializing_if = "Option::is_none")]
    related_patient_id: Option<PatientId>,
    performed_by: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason_sha256: Option<String>,
}

impl<'a> From<&'a AuditEvent> for AuditLine<'a> {
    fn from(event: &'a AuditEvent) -> Self {
        Self {
            id: event.id,
            occurred_at: event.occurred_at,
            action: event.action.as_str(),
            tenant_id: event.tenant_id,
            patient_id: event.patient_id,
            related_patient_id: event.related_patient_id,
            performed_by: &event.performed_by,
            reason_sha256: event.reason.as_deref().map(digest),
        }
    }
}

/// Appends audit events to a JSON-lines file
pub struct FileAuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileAuditLog {
    /// Creates the parent directory if needed
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Audit`] if the directory cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ContractError::Audit(format!(
                    "Failed to create audit directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        let mut line = serde_json::to_string(&AuditLine::from(event))?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                ContractError::Audit(format!(
                    "Failed to open audit log {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| ContractError::Audit(format!("Failed to write audit event: {e}")))?;
        file.flush()
            .await
            .map_err(|e| ContractError::Audit(format!("Failed to flush audit log: {e}")))?;

        tracing::debug!(
            action = event.action.as_str(),
            patient_id = %event.patient_id,
            "Audit event recorded"
        );
        Ok(())
    }
}

/// Writes audit events to the tracing subscriber
#[derive(Debug, Default)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        tracing::info!(
            audit_id = %event.id,
            action = event.action.as_str(),
            tenant_id = %event.tenant_id,
            patient_id = %event.patient_id,
            related_patient_id = ?event.related_patient_id.map(|id| id.to_string()),
            performed_by = %event.performed_by,
            reason_sha256 = ?event.reason.as_deref().map(digest),
            "Audit event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::traits::AuditAction;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn event(reason: Option<&str>) -> AuditEvent {
        AuditEvent {
            id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            action: AuditAction::Archive,
            tenant_id: TenantId::generate(),
            patient_id: PatientId::generate(),
            related_patient_id: None,
            performed_by: "dr.smith".to_string(),
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let a = digest("duplicate chart");
        assert_eq!(a.len(), 64);
        assert_eq!(a, digest("duplicate chart"));
        assert_ne!(a, digest("duplicate chart."));
    }

    #[tokio::test]
    async fn test_file_log_appends_lines_without_plain_reason() {
        let dir = TempDir::new().unwrap();
        let log = FileAuditLog::new(dir.path().join("audit/trail.jsonl")).unwrap();

        log.record(&event(Some("patient diagnosed with HIV"))).await.unwrap();
        log.record(&event(None)).await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!contents.contains("HIV"));

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["action"], "archive");
        assert_eq!(first["performedBy"], "dr.smith");
        assert_eq!(first["reasonSha256"], digest("patient diagnosed with HIV"));

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second.get("reasonSha256").is_none());
    }

    #[tokio::test]
    async fn test_tracing_log_accepts_events() {
        TracingAuditLog.record(&event(Some("r"))).await.unwrap();
    }
}
