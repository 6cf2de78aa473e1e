//! Consent records

use super::context::{ConsentRevocationPolicy, ValidationContext};
use super::enums::{ConsentType, SignatureType};
use super::fields::Fields;
use super::node::{parse, Refinement, Schema};
use super::primitives::{boolean, datetime, enum_value, list, text, Text, ACTOR, NOTES};
use crate::domain::{FieldPath, ViolationCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

const VERSION: Text = Text::new(1, 20);
const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    #[serde(rename = "type")]
    pub kind: ConsentType,
    pub granted: bool,
    pub granted_at: DateTime<Utc>,
    pub granted_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub signature_type: SignatureType,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ConsentRecord {
    /// Granted, not revoked, and not expired at `now`
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.granted
            && self.revoked_at.map_or(true, |revoked| revoked > now)
            && self.expires_at.map_or(true, |expires| expires > now)
    }
}

pub struct ConsentRecordRaw {
    kind: Option<ConsentType>,
    granted: Option<bool>,
    granted_at: Option<DateTime<Utc>>,
    granted_by: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    signature_type: Option<SignatureType>,
    version: Option<String>,
    notes: Option<String>,
}

fn consent_dates(node: &mut ConsentRecord, path: &FieldPath, cx: &mut ValidationContext) {
    if node.revoked_at.is_some_and(|revoked| revoked < node.granted_at) {
        cx.report(
            &path.key("revokedAt"),
            ViolationCode::DateOrdering,
            "revokedAt must not be before grantedAt",
        );
    }
    if node.expires_at.is_some_and(|expires| expires < node.granted_at) {
        cx.report(
            &path.key("expiresAt"),
            ViolationCode::DateOrdering,
            "expiresAt must not be before grantedAt",
        );
    }
}

fn revocation_details(node: &mut ConsentRecord, path: &FieldPath, cx: &mut ValidationContext) {
    if node.granted || (node.revoked_at.is_some() && node.revoked_by.is_some()) {
        return;
    }
    match cx.options().consent_revocation {
        ConsentRevocationPolicy::Ignore => {}
        ConsentRevocationPolicy::Warn => {
            warn!(
                path = %path,
                consent_type = %node.kind,
                "Consent not granted but revocation details are missing"
            );
        }
        ConsentRevocationPolicy::Enforce => {
            cx.report(
                path,
                ViolationCode::MissingRevocation,
                "a consent with granted = false requires revokedAt and revokedBy",
            );
        }
    }
}

impl Schema for ConsentRecord {
    type Raw = ConsentRecordRaw;
    const KEYS: &'static [&'static str] = &[
        "type",
        "granted",
        "grantedAt",
        "grantedBy",
        "revokedAt",
        "revokedBy",
        "expiresAt",
        "signatureType",
        "version",
        "notes",
    ];
    const REFINEMENTS: &'static [Refinement<Self>] = &[consent_dates, revocation_details];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> ConsentRecordRaw {
        ConsentRecordRaw {
            kind: fields.required(cx, "type", enum_value::<ConsentType>),
            granted: fields.required(cx, "granted", boolean),
            granted_at: fields.required(cx, "grantedAt", datetime),
            granted_by: fields.required(cx, "grantedBy", text(ACTOR)),
            revoked_at: fields.optional(cx, "revokedAt", datetime),
            revoked_by: fields.optional(cx, "revokedBy", text(ACTOR)),
            expires_at: fields.optional(cx, "expiresAt", datetime),
            signature_type: fields.optional(cx, "signatureType", enum_value::<SignatureType>),
            version: fields.optional(cx, "version", text(VERSION)),
            notes: fields.optional(cx, "notes", text(NOTES)),
        }
    }

    fn build(raw: ConsentRecordRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            kind: raw.kind?,
            granted: raw.granted?,
            granted_at: raw.granted_at?,
            granted_by: raw.granted_by?,
            revoked_at: raw.revoked_at,
            revoked_by: raw.revoked_by,
            expires_at: raw.expires_at,
            signature_type: raw.signature_type.unwrap_or_default(),
            version: raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            notes: raw.notes,
        })
    }
}

/// Parser for a patient's consent sequence
pub fn consents(
    value: &serde_json::Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<Vec<ConsentRecord>> {
    list(parse::<ConsentRecord>, 0, 100)(value, path, cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::context::ValidationOptions;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use test_case::test_case;

    fn consent(extra: Value) -> Value {
        let mut value = json!({
            "type": "hipaa",
            "granted": true,
            "grantedAt": "2024-01-01T09:00:00Z",
            "grantedBy": "front-desk"
        });
        if let (Some(target), Some(source)) = (value.as_object_mut(), extra.as_object()) {
            for (k, v) in source {
                target.insert(k.clone(), v.clone());
            }
        }
        value
    }

    fn cx(policy: ConsentRevocationPolicy) -> ValidationContext {
        let options = ValidationOptions {
            consent_revocation: policy,
            ..ValidationOptions::default()
        };
        ValidationContext::new(options, Utc::now())
    }

    #[test]
    fn test_defaults() {
        let mut cx = cx(ConsentRevocationPolicy::Warn);
        let record: ConsentRecord =
            parse(&consent(json!({})), &FieldPath::root(), &mut cx).unwrap();
        assert_eq!(record.signature_type, SignatureType::Digital);
        assert_eq!(record.version, "1.0");
    }

    #[test]
    fn test_revoked_before_granted() {
        let mut cx = cx(ConsentRevocationPolicy::Warn);
        let result: Option<ConsentRecord> = parse(
            &consent(json!({"revokedAt": "2023-12-31T00:00:00Z", "revokedBy": "x"})),
            &FieldPath::root(),
            &mut cx,
        );
        assert!(result.is_none());
        assert_eq!(
            cx.into_errors().at("revokedAt").next().unwrap().code,
            ViolationCode::DateOrdering
        );
    }

    #[test_case(ConsentRevocationPolicy::Ignore, true; "ignore accepts")]
    #[test_case(ConsentRevocationPolicy::Warn, true; "warn accepts")]
    #[test_case(ConsentRevocationPolicy::Enforce, false; "enforce rejects")]
    fn test_revocation_policy(policy: ConsentRevocationPolicy, accepted: bool) {
        let mut cx = cx(policy);
        let result: Option<ConsentRecord> =
            parse(&consent(json!({"granted": false})), &FieldPath::root(), &mut cx);
        assert_eq!(result.is_some(), accepted);
        if !accepted {
            assert!(cx.into_errors().has_code(ViolationCode::MissingRevocation));
        }
    }

    #[test]
    fn test_is_effective() {
        let mut cx = cx(ConsentRevocationPolicy::Warn);
        let record: ConsentRecord = parse(
            &consent(json!({"expiresAt": "2025-01-01T00:00:00Z"})),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert!(record.is_effective(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        assert!(!record.is_effective(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
    }
}
