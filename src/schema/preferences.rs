//! Communication preferences

use super::collections::dedupe;
use super::context::ValidationContext;
use super::enums::Channel;
use super::fields::Fields;
use super::node::{parse, Refinement, Schema};
use super::primitives::{boolean, enum_value, list, text, Pattern, Text};
use crate::domain::{FieldPath, ViolationCode};
use serde::Serialize;

const CLOCK_TIME: Text = Text::new(5, 5).pattern(Pattern::ClockTime);
const TIMEZONE: Text = Text::new(1, 64);
const DEFAULT_TIMEZONE: &str = "UTC";

/// Daily window in which the patient prefers to be contacted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactTimeWindow {
    pub start: String,
    pub end: String,
    pub timezone: String,
}

pub struct ContactTimeWindowRaw {
    start: Option<String>,
    end: Option<String>,
    timezone: Option<String>,
}

// Zero-padded HH:MM compares correctly as text.
fn window_order(node: &mut ContactTimeWindow, path: &FieldPath, cx: &mut ValidationContext) {
    if node.start >= node.end {
        cx.report(
            &path.key("end"),
            ViolationCode::DateOrdering,
            "end must be later than start",
        );
    }
}

impl Schema for ContactTimeWindow {
    type Raw = ContactTimeWindowRaw;
    const KEYS: &'static [&'static str] = &["start", "end", "timezone"];
    const REFINEMENTS: &'static [Refinement<Self>] = &[window_order];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> ContactTimeWindowRaw {
        ContactTimeWindowRaw {
            start: fields.required(cx, "start", text(CLOCK_TIME)),
            end: fields.required(cx, "end", text(CLOCK_TIME)),
            timezone: fields.optional(cx, "timezone", text(TIMEZONE)),
        }
    }

    fn build(raw: ContactTimeWindowRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            start: raw.start?,
            end: raw.end?,
            timezone: raw
                .timezone
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPreferences {
    pub preferred_channel: Channel,
    pub enabled_channels: Vec<Channel>,
    pub appointment_reminders: bool,
    pub medication_reminders: bool,
    pub health_education: bool,
    pub marketing_messages: bool,
    pub surveys: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_contact_time: Option<ContactTimeWindow>,
    pub do_not_contact: bool,
}

impl CommunicationPreferences {
    /// True if messages may be sent to the patient over `channel`
    pub fn allows(&self, channel: Channel) -> bool {
        !self.do_not_contact && self.enabled_channels.contains(&channel)
    }
}

pub struct CommunicationPreferencesRaw {
    preferred_channel: Option<Channel>,
    enabled_channels: Option<Vec<Channel>>,
    appointment_reminders: Option<bool>,
    medication_reminders: Option<bool>,
    health_education: Option<bool>,
    marketing_messages: Option<bool>,
    surveys: Option<bool>,
    preferred_contact_time: Option<ContactTimeWindow>,
    do_not_contact: Option<bool>,
}

fn preferred_channel_enabled(
    node: &mut CommunicationPreferences,
    path: &FieldPath,
    cx: &mut ValidationContext,
) {
    if !node.enabled_channels.contains(&node.preferred_channel) {
        cx.report(
            &path.key("preferredChannel"),
            ViolationCode::ChannelNotEnabled,
            format!(
                "preferred channel '{}' is not in enabledChannels",
                node.preferred_channel
            ),
        );
    }
}

fn do_not_contact_cascade(
    node: &mut CommunicationPreferences,
    _: &FieldPath,
    _: &mut ValidationContext,
) {
    if node.do_not_contact {
        node.appointment_reminders = false;
        node.medication_reminders = false;
        node.health_education = false;
        node.marketing_messages = false;
        node.surveys = false;
    }
}

impl Schema for CommunicationPreferences {
    type Raw = CommunicationPreferencesRaw;
    const KEYS: &'static [&'static str] = &[
        "preferredChannel",
        "enabledChannels",
        "appointmentReminders",
        "medicationReminders",
        "healthEducation",
        "marketingMessages",
        "surveys",
        "preferredContactTime",
        "doNotContact",
    ];
    const REFINEMENTS: &'static [Refinement<Self>] =
        &[preferred_channel_enabled, do_not_contact_cascade];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> CommunicationPreferencesRaw {
        CommunicationPreferencesRaw {
            preferred_channel: fields.optional(cx, "preferredChannel", enum_value::<Channel>),
            enabled_channels: fields.optional(
                cx,
                "enabledChannels",
                list(enum_value::<Channel>, 1, 20),
            ),
            appointment_reminders: fields.optional(cx, "appointmentReminders", boolean),
            medication_reminders: fields.optional(cx, "medicationReminders", boolean),
            health_education: fields.optional(cx, "healthEducation", boolean),
            marketing_messages: fields.optional(cx, "marketingMessages", boolean),
            surveys: fields.optional(cx, "surveys", boolean),
            preferred_contact_time: fields.optional(
                cx,
                "preferredContactTime",
                parse::<ContactTimeWindow>,
            ),
            do_not_contact: fields.optional(cx, "doNotContact", boolean),
        }
    }

    fn build(
        raw: CommunicationPreferencesRaw,
        _: &FieldPath,
        _: &mut ValidationContext,
    ) -> Option<Self> {
        let mut enabled_channels = raw
            .enabled_channels
            .unwrap_or_else(|| vec![Channel::Email]);
        dedupe(&mut enabled_channels);

        Some(Self {
            preferred_channel: raw.preferred_channel.unwrap_or_default(),
            enabled_channels,
            appointment_reminders: raw.appointment_reminders.unwrap_or(true),
            medication_reminders: raw.medication_reminders.unwrap_or(true),
            health_education: raw.health_education.unwrap_or(true),
            marketing_messages: raw.marketing_messages.unwrap_or(false),
            surveys: raw.surveys.unwrap_or(false),
            preferred_contact_time: raw.preferred_contact_time,
            do_not_contact: raw.do_not_contact.unwrap_or(false),
        })
    }
}
