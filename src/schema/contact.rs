//! Contact value objects and the collections that own them

use super::collections::{effective_primary, enforce_single_primary, Primary};
use super::context::ValidationContext;
use super::enums::{AddressType, ContactMethod, EmailType, PhoneType};
use super::fields::Fields;
use super::node::{parse, Refinement, Schema};
use super::primitives::{
    boolean, datetime, enum_value, list, text, Pattern, Text, Transform, EMAIL_ADDRESS, NOTES,
    PHONE_NUMBER,
};
use crate::domain::FieldPath;
use chrono::{DateTime, Utc};
use serde::Serialize;

const EXTENSION: Text = Text::new(1, 10).pattern(Pattern::Extension);
const ADDRESS_LINE: Text = Text::new(1, 200);
const LOCALITY: Text = Text::new(1, 100);
const POSTAL_CODE: Text = Text::new(3, 10)
    .transform(Transform::Upper)
    .pattern(Pattern::PostalCode);
const COUNTRY: Text = Text::new(2, 2)
    .transform(Transform::Upper)
    .pattern(Pattern::Country);
const DEFAULT_COUNTRY: &str = "US";
const MAX_ENTRIES: usize = 20;

macro_rules! impl_primary {
    ($($ty:ty),+) => {
        $(impl Primary for $ty {
            fn is_primary(&self) -> bool {
                self.is_primary
            }
            fn set_primary(&mut self, primary: bool) {
                self.is_primary = primary;
            }
        })+
    };
}

impl_primary!(PhoneContact, EmailContact, PhysicalAddress, EmergencyContact);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneContact {
    #[serde(rename = "type")]
    pub kind: PhoneType,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub is_primary: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    pub can_receive_sms: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub struct PhoneContactRaw {
    kind: Option<PhoneType>,
    number: Option<String>,
    extension: Option<String>,
    is_primary: Option<bool>,
    is_verified: Option<bool>,
    verified_at: Option<DateTime<Utc>>,
    can_receive_sms: Option<bool>,
    notes: Option<String>,
}

impl Schema for PhoneContact {
    type Raw = PhoneContactRaw;
    const KEYS: &'static [&'static str] = &[
        "type",
        "number",
        "extension",
        "isPrimary",
        "isVerified",
        "verifiedAt",
        "canReceiveSms",
        "notes",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> PhoneContactRaw {
        PhoneContactRaw {
            kind: fields.optional(cx, "type", enum_value::<PhoneType>),
            number: fields.required(cx, "number", text(PHONE_NUMBER)),
            extension: fields.optional(cx, "extension", text(EXTENSION)),
            is_primary: fields.optional(cx, "isPrimary", boolean),
            is_verified: fields.optional(cx, "isVerified", boolean),
            verified_at: fields.optional(cx, "verifiedAt", datetime),
            can_receive_sms: fields.optional(cx, "canReceiveSms", boolean),
            notes: fields.optional(cx, "notes", text(NOTES)),
        }
    }

    fn build(raw: PhoneContactRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            kind: raw.kind.unwrap_or_default(),
            number: raw.number?,
            extension: raw.extension,
            is_primary: raw.is_primary.unwrap_or(false),
            is_verified: raw.is_verified.unwrap_or(false),
            verified_at: raw.verified_at,
            can_receive_sms: raw.can_receive_sms.unwrap_or(false),
            notes: raw.notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailContact {
    #[serde(rename = "type")]
    pub kind: EmailType,
    pub email: String,
    pub is_primary: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub struct EmailContactRaw {
    kind: Option<EmailType>,
    email: Option<String>,
    is_primary: Option<bool>,
    is_verified: Option<bool>,
    verified_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl Schema for EmailContact {
    type Raw = EmailContactRaw;
    const KEYS: &'static [&'static str] =
        &["type", "email", "isPrimary", "isVerified", "verifiedAt", "notes"];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> EmailContactRaw {
        EmailContactRaw {
            kind: fields.optional(cx, "type", enum_value::<EmailType>),
            email: fields.required(cx, "email", text(EMAIL_ADDRESS)),
            is_primary: fields.optional(cx, "isPrimary", boolean),
            is_verified: fields.optional(cx, "isVerified", boolean),
            verified_at: fields.optional(cx, "verifiedAt", datetime),
            notes: fields.optional(cx, "notes", text(NOTES)),
        }
    }

    fn build(raw: EmailContactRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            kind: raw.kind.unwrap_or_default(),
            email: raw.email?,
            is_primary: raw.is_primary.unwrap_or(false),
            is_verified: raw.is_verified.unwrap_or(false),
            verified_at: raw.verified_at,
            notes: raw.notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalAddress {
    #[serde(rename = "type")]
    pub kind: AddressType,
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_primary: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub struct PhysicalAddressRaw {
    kind: Option<AddressType>,
    line1: Option<String>,
    line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    is_primary: Option<bool>,
    is_verified: Option<bool>,
    verified_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl Schema for PhysicalAddress {
    type Raw = PhysicalAddressRaw;
    const KEYS: &'static [&'static str] = &[
        "type",
        "line1",
        "line2",
        "city",
        "state",
        "postalCode",
        "country",
        "isPrimary",
        "isVerified",
        "verifiedAt",
        "notes",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> PhysicalAddressRaw {
        PhysicalAddressRaw {
            kind: fields.optional(cx, "type", enum_value::<AddressType>),
            line1: fields.required(cx, "line1", text(ADDRESS_LINE)),
            line2: fields.optional(cx, "line2", text(ADDRESS_LINE)),
            city: fields.required(cx, "city", text(LOCALITY)),
            state: fields.required(cx, "state", text(LOCALITY)),
            postal_code: fields.required(cx, "postalCode", text(POSTAL_CODE)),
            country: fields.optional(cx, "country", text(COUNTRY)),
            is_primary: fields.optional(cx, "isPrimary", boolean),
            is_verified: fields.optional(cx, "isVerified", boolean),
            verified_at: fields.optional(cx, "verifiedAt", datetime),
            notes: fields.optional(cx, "notes", text(NOTES)),
        }
    }

    fn build(raw: PhysicalAddressRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            kind: raw.kind.unwrap_or_default(),
            line1: raw.line1?,
            line2: raw.line2,
            city: raw.city?,
            state: raw.state?,
            postal_code: raw.postal_code?,
            country: raw.country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            is_primary: raw.is_primary.unwrap_or(false),
            is_verified: raw.is_verified.unwrap_or(false),
            verified_at: raw.verified_at,
            notes: raw.notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContacts {
    pub phones: Vec<PhoneContact>,
    pub emails: Vec<EmailContact>,
    pub addresses: Vec<PhysicalAddress>,
    pub preferred_contact_method: ContactMethod,
}

impl PatientContacts {
    pub fn primary_phone(&self) -> Option<&PhoneContact> {
        effective_primary(&self.phones)
    }

    pub fn primary_email(&self) -> Option<&EmailContact> {
        effective_primary(&self.emails)
    }

    pub fn primary_address(&self) -> Option<&PhysicalAddress> {
        effective_primary(&self.addresses)
    }
}

pub struct PatientContactsRaw {
    phones: Option<Vec<PhoneContact>>,
    emails: Option<Vec<EmailContact>>,
    addresses: Option<Vec<PhysicalAddress>>,
    preferred_contact_method: Option<ContactMethod>,
}

fn single_primary_phone(node: &mut PatientContacts, path: &FieldPath, cx: &mut ValidationContext) {
    enforce_single_primary(&mut node.phones, &path.key("phones"), cx);
}

fn single_primary_email(node: &mut PatientContacts, path: &FieldPath, cx: &mut ValidationContext) {
    enforce_single_primary(&mut node.emails, &path.key("emails"), cx);
}

fn single_primary_address(
    node: &mut PatientContacts,
    path: &FieldPath,
    cx: &mut ValidationContext,
) {
    enforce_single_primary(&mut node.addresses, &path.key("addresses"), cx);
}

impl Schema for PatientContacts {
    type Raw = PatientContactsRaw;
    const KEYS: &'static [&'static str] =
        &["phones", "emails", "addresses", "preferredContactMethod"];
    const REFINEMENTS: &'static [Refinement<Self>] = &[
        single_primary_phone,
        single_primary_email,
        single_primary_address,
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> PatientContactsRaw {
        PatientContactsRaw {
            phones: fields.optional(cx, "phones", list(parse::<PhoneContact>, 0, MAX_ENTRIES)),
            emails: fields.optional(cx, "emails", list(parse::<EmailContact>, 0, MAX_ENTRIES)),
            addresses: fields.optional(
                cx,
                "addresses",
                list(parse::<PhysicalAddress>, 0, MAX_ENTRIES),
            ),
            preferred_contact_method: fields.optional(
                cx,
                "preferredContactMethod",
                enum_value::<ContactMethod>,
            ),
        }
    }

    fn build(raw: PatientContactsRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            phones: raw.phones.unwrap_or_default(),
            emails: raw.emails.unwrap_or_default(),
            addresses: raw.addresses.unwrap_or_default(),
            preferred_contact_method: raw.preferred_contact_method.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<PhysicalAddress>,
    pub is_primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub struct EmergencyContactRaw {
    name: Option<String>,
    relationship: Option<String>,
    phone_number: Option<String>,
    alternate_phone: Option<String>,
    email: Option<String>,
    address: Option<PhysicalAddress>,
    is_primary: Option<bool>,
    notes: Option<String>,
}

impl Schema for EmergencyContact {
    type Raw = EmergencyContactRaw;
    const KEYS: &'static [&'static str] = &[
        "name",
        "relationship",
        "phoneNumber",
        "alternatePhone",
        "email",
        "address",
        "isPrimary",
        "notes",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> EmergencyContactRaw {
        EmergencyContactRaw {
            name: fields.required(cx, "name", text(Text::new(1, 200))),
            relationship: fields.required(cx, "relationship", text(Text::new(1, 100))),
            phone_number: fields.required(cx, "phoneNumber", text(PHONE_NUMBER)),
            alternate_phone: fields.optional(cx, "alternatePhone", text(PHONE_NUMBER)),
            email: fields.optional(cx, "email", text(EMAIL_ADDRESS)),
            address: fields.optional(cx, "address", parse::<PhysicalAddress>),
            is_primary: fields.optional(cx, "isPrimary", boolean),
            notes: fields.optional(cx, "notes", text(NOTES)),
        }
    }

    fn build(raw: EmergencyContactRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            name: raw.name?,
            relationship: raw.relationship?,
            phone_number: raw.phone_number?,
            alternate_phone: raw.alternate_phone,
            email: raw.email,
            address: raw.address,
            is_primary: raw.is_primary.unwrap_or(false),
            notes: raw.notes,
        })
    }
}

/// Parser for an owned sequence of emergency contacts
pub fn emergency_contacts(
    value: &serde_json::Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<Vec<EmergencyContact>> {
    list(parse::<EmergencyContact>, 0, MAX_ENTRIES)(value, path, cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ViolationCode;
    use crate::schema::context::{ImplicitPrimaryPolicy, ValidationOptions};
    use serde_json::json;

    fn cx() -> ValidationContext {
        ValidationContext::new(ValidationOptions::default(), Utc::now())
    }

    #[test]
    fn test_contacts_default_to_empty() {
        let mut cx = cx();
        let contacts: PatientContacts = parse(&json!({}), &FieldPath::root(), &mut cx).unwrap();
        assert!(contacts.phones.is_empty());
        assert_eq!(contacts.preferred_contact_method, ContactMethod::Phone);
        assert!(contacts.primary_phone().is_none());
    }

    #[test]
    fn test_phone_defaults_and_normalization() {
        let mut cx = cx();
        let phone: PhoneContact =
            parse(&json!({"number": "555.123.4567"}), &FieldPath::root(), &mut cx).unwrap();
        assert_eq!(phone.kind, PhoneType::Mobile);
        assert_eq!(phone.number, "5551234567");
        assert!(!phone.is_primary);
        assert!(!phone.can_receive_sms);
    }

    #[test]
    fn test_address_defaults_country_and_uppercases() {
        let mut cx = cx();
        let address: PhysicalAddress = parse(
            &json!({"line1": "1 Main St", "city": "Leeds", "state": "WY", "postalCode": "ls1 4ap", "country": "gb"}),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert_eq!(address.postal_code, "LS1 4AP");
        assert_eq!(address.country, "GB");
        assert_eq!(address.kind, AddressType::Home);

        let mut cx = self::cx();
        let address: PhysicalAddress = parse(
            &json!({"line1": "1 Main St", "city": "Austin", "state": "TX", "postalCode": "78701"}),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert_eq!(address.country, "US");
    }

    #[test]
    fn test_duplicate_primary_phone() {
        let mut cx = cx();
        let result: Option<PatientContacts> = parse(
            &json!({"phones": [
                {"number": "5551234567", "isPrimary": true},
                {"number": "5559876543", "isPrimary": true}
            ]}),
            &FieldPath::root().key("contacts"),
            &mut cx,
        );
        assert!(result.is_none());
        let errors = cx.into_errors();
        assert_eq!(
            errors.at("contacts.phones").next().unwrap().code,
            ViolationCode::DuplicatePrimary
        );
    }

    #[test]
    fn test_each_sequence_checked_independently() {
        let mut cx = cx();
        let contacts: PatientContacts = parse(
            &json!({
                "phones": [{"number": "5551234567", "isPrimary": true}],
                "emails": [{"email": "a@example.com", "isPrimary": true}]
            }),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert_eq!(contacts.primary_email().unwrap().email, "a@example.com");
    }

    #[test]
    fn test_promote_first_policy() {
        let options = ValidationOptions {
            implicit_primary: ImplicitPrimaryPolicy::PromoteFirst,
            ..ValidationOptions::default()
        };
        let mut cx = ValidationContext::new(options, Utc::now());
        let contacts: PatientContacts = parse(
            &json!({"emails": [{"email": "a@example.com"}, {"email": "b@example.com"}]}),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert!(contacts.emails[0].is_primary);
        assert!(!contacts.emails[1].is_primary);
    }

    #[test]
    fn test_nested_paths() {
        let mut cx = cx();
        let result = emergency_contacts(
            &json!([
                {"name": "Bob", "relationship": "brother", "phoneNumber": "5551234567"},
                {"name": "Eve", "relationship": "friend", "phoneNumber": "abc",
                 "address": {"line1": "1 Main", "city": "X", "state": "Y"}}
            ]),
            &FieldPath::root().key("emergencyContacts"),
            &mut cx,
        );
        assert!(result.is_none());
        let errors = cx.into_errors();
        assert_eq!(errors.at("emergencyContacts[1].phoneNumber").count(), 1);
        assert_eq!(
            errors
                .at("emergencyContacts[1].address.postalCode")
                .next()
                .unwrap()
                .code,
            ViolationCode::MissingField
        );
    }
}
