//! Send-communication request and the deliverability check

use crate::domain::{FieldPath, PatientId, ValidationErrors, Violation, ViolationCode};
use crate::schema::collections::effective_primary;
use crate::schema::context::ValidationContext;
use crate::schema::enums::{Channel, Priority};
use crate::schema::fields::Fields;
use crate::schema::node::Schema;
use crate::schema::patient::Patient;
use crate::schema::primitives::{datetime, enum_value, id, object, text, Text, ACTOR};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

const SUBJECT: Text = Text::new(1, 200);
const BODY: Text = Text::new(1, 5000);
const TEMPLATE_ID: Text = Text::new(1, 100);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommunicationDto {
    pub patient_id: PatientId,
    pub channel: Channel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub metadata: Map<String, Value>,
    pub sent_by: String,
}

/// Where a message will be delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub channel: Channel,
    /// Phone number, email or postal address; `None` for the portal inbox
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl SendCommunicationDto {
    /// Resolves the recipient on `patient`, or explains why nothing can be sent
    pub fn check_deliverable(&self, patient: &Patient) -> Result<Recipient, ValidationErrors> {
        let unreachable = |key: &str, message: String| -> ValidationErrors {
            Violation::new(
                FieldPath::root().key(key),
                ViolationCode::RecipientUnreachable,
                message,
            )
            .into()
        };

        if patient.id != self.patient_id {
            return Err(unreachable(
                "patientId",
                format!("request targets {} but patient {} was supplied", self.patient_id, patient.id),
            ));
        }

        let prefs = &patient.record.communication_preferences;
        if prefs.do_not_contact {
            return Err(unreachable("channel", "patient has opted out of all contact".into()));
        }
        if !prefs.allows(self.channel) {
            return Err(unreachable(
                "channel",
                format!("channel '{}' is not enabled for this patient", self.channel),
            ));
        }

        let contacts = &patient.record.contacts;
        let address = match self.channel {
            Channel::Email => effective_primary(&contacts.emails).map(|e| e.email.clone()),
            Channel::Phone => effective_primary(&contacts.phones).map(|p| p.number.clone()),
            Channel::Sms => {
                let capable: Vec<_> = contacts
                    .phones
                    .iter()
                    .filter(|p| p.can_receive_sms)
                    .cloned()
                    .collect();
                effective_primary(&capable).map(|p| p.number.clone())
            }
            Channel::Mail => effective_primary(&contacts.addresses)
                .map(|a| format!("{}, {}, {} {}", a.line1, a.city, a.state, a.postal_code)),
            Channel::Portal => {
                return Ok(Recipient {
                    channel: self.channel,
                    address: None,
                })
            }
        };

        match address {
            Some(address) => Ok(Recipient {
                channel: self.channel,
                address: Some(address),
            }),
            None => Err(unreachable(
                "channel",
                format!("patient has no contact usable for '{}'", self.channel),
            )),
        }
    }
}

pub struct SendCommunicationRaw {
    patient_id: Option<PatientId>,
    channel: Option<Channel>,
    subject: Option<String>,
    body: Option<String>,
    template_id: Option<String>,
    priority: Option<Priority>,
    scheduled_at: Option<DateTime<Utc>>,
    metadata: Option<Map<String, Value>>,
    sent_by: Option<String>,
}

fn schedule_time(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<DateTime<Utc>> {
    let at = datetime(value, path, cx)?;
    if at < cx.now() {
        cx.report(path, ViolationCode::PastDate, "must not be in the past");
        return None;
    }
    Some(at)
}

impl Schema for SendCommunicationDto {
    type Raw = SendCommunicationRaw;
    const KEYS: &'static [&'static str] = &[
        "patientId",
        "channel",
        "subject",
        "body",
        "templateId",
        "priority",
        "scheduledAt",
        "metadata",
        "sentBy",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> SendCommunicationRaw {
        let channel = fields.required(cx, "channel", enum_value::<Channel>);
        if channel == Some(Channel::Email) && !fields.contains("subject") {
            cx.report(
                &fields.path().key("subject"),
                ViolationCode::SubjectRequired,
                "email messages need a subject",
            );
        }

        SendCommunicationRaw {
            patient_id: fields.required(cx, "patientId", id::<PatientId>),
            channel,
            subject: fields.optional(cx, "subject", text(SUBJECT)),
            body: fields.required(cx, "body", text(BODY)),
            template_id: fields.optional(cx, "templateId", text(TEMPLATE_ID)),
            priority: fields.optional(cx, "priority", enum_value::<Priority>),
            scheduled_at: fields.optional(cx, "scheduledAt", schedule_time),
            metadata: fields.optional(cx, "metadata", object),
            sent_by: fields.required(cx, "sentBy", text(ACTOR)),
        }
    }

    fn build(raw: SendCommunicationRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            patient_id: raw.patient_id?,
            channel: raw.channel?,
            subject: raw.subject,
            body: raw.body?,
            template_id: raw.template_id,
            priority: raw.priority.unwrap_or_default(),
            scheduled_at: raw.scheduled_at,
            metadata: raw.metadata.unwrap_or_default(),
            sent_by: raw.sent_by?,
        })
    }
}
