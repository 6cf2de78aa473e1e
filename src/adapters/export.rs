//! JSON export generator

use super::traits::ExportGenerator;
use crate::anonymization::Anonymizer;
use crate::domain::{ContractError, Result};
use crate::dto::ExportPatientsDto;
use crate::schema::enums::{AnonymizationStrategy, ExportFormat};
use crate::schema::patient::Patient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    format: ExportFormat,
    exported_at: DateTime<Utc>,
    requested_by: &'a str,
    anonymized: bool,
    fields: &'a [&'static str],
    count: usize,
    patients: Vec<Map<String, Value>>,
}

/// Renders a single JSON document holding every selected patient
///
/// Each patient keeps only the request's selected canonical keys. With
/// `anonymize` set, records are redacted before projection.
#[derive(Debug, Clone, Default)]
pub struct JsonExportGenerator {
    pretty: bool,
}

impl JsonExportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn project(patient: &Patient, fields: &[&'static str]) -> Result<Map<String, Value>> {
        let value = serde_json::to_value(patient)?;
        let Value::Object(mut all) = value else {
            return Err(ContractError::Export(format!(
                "patient {} did not serialize to an object",
                patient.id
            )));
        };
        Ok(fields
            .iter()
            .filter_map(|key| all.remove(*key).map(|v| (key.to_string(), v)))
            .collect())
    }
}

#[async_trait]
impl ExportGenerator for JsonExportGenerator {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    async fn generate(&self, request: &ExportPatientsDto, patients: &[Patient]) -> Result<Vec<u8>> {
        if request.format != self.format() {
            return Err(ContractError::Export(format!(
                "generator produces '{}' but '{}' was requested",
                self.format(),
                request.format
            )));
        }

        let fields = request.selected_fields();
        let anonymizer = Anonymizer::new(AnonymizationStrategy::Redact);

        let rendered = patients
            .iter()
            .map(|patient| {
                if request.anonymize {
                    Self::project(&anonymizer.scrub(patient), &fields)
                } else {
                    Self::project(patient, &fields)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let document = ExportDocument {
            format: self.format(),
            exported_at: Utc::now(),
            requested_by: &request.requested_by,
            anonymized: request.anonymize,
            fields: &fields,
            count: rendered.len(),
            patients: rendered,
        };

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&document)?
        } else {
            serde_json::to_vec(&document)?
        };

        tracing::info!(
            count = document.count,
            fields = fields.len(),
            anonymized = request.anonymize,
            bytes = bytes.len(),
            "Export generated"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::Validator;
    use serde_json::json;

    fn patient() -> Patient {
        Validator::default()
            .validate_patient(&json!({
                "id": "7d44b88c-4199-4bad-97dc-d78268e01398",
                "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11",
                "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
                "patientNumber": "P-000001",
                "name": {"firstName": "Ada", "lastName": "Lovelace"},
                "demographics": {"dateOfBirth": "1985-12-10", "gender": "female"},
                "insurance": {},
                "createdAt": "2024-01-01T00:00:00Z",
                "createdBy": "system",
                "updatedAt": "2024-01-01T00:00:00Z",
                "updatedBy": "system"
            }))
            .unwrap()
    }

    fn request(extra: Value) -> ExportPatientsDto {
        let mut raw = json!({
            "patientIds": ["7d44b88c-4199-4bad-97dc-d78268e01398"],
            "requestedBy": "analyst"
        });
        for (k, v) in extra.as_object().unwrap() {
            raw[k] = v.clone();
        }
        Validator::default().validate_export(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_projection_follows_selection() {
        let request = request(json!({"includeFields": ["id", "name", "insurance"]}));
        let bytes = JsonExportGenerator::new()
            .generate(&request, &[patient()])
            .await
            .unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(doc["count"], 1);
        let exported = doc["patients"][0].as_object().unwrap();
        assert_eq!(exported.len(), 2);
        assert!(exported.contains_key("name"));
        assert!(!exported.contains_key("insurance"));
    }

    #[tokio::test]
    async fn test_anonymized_export_hides_names() {
        let request = request(json!({"anonymize": true}));
        let bytes = JsonExportGenerator::new()
            .pretty()
            .generate(&request, &[patient()])
            .await
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("Lovelace"));
        assert!(text.contains("\"anonymized\": true"));
    }

    #[tokio::test]
    async fn test_format_mismatch() {
        let request = request(json!({"format": "csv"}));
        let err = JsonExportGenerator::new()
            .generate(&request, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Export(_)));
    }
}
