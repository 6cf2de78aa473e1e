//! Bounded string enums used across the record
//!
//! Every enum here has a fixed snake_case (or camelCase, for sort fields)
//! wire spelling shared by parsing, serialization and error messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An enum whose variants each have one wire spelling
pub trait FieldEnum: Sized + Copy + 'static {
    /// Every variant in declaration order
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse_str(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == value)
    }
}

macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl FieldEnum for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

field_enum! {
    #[derive(Default)]
    PhoneType {
        #[default]
        Mobile => "mobile",
        Home => "home",
        Work => "work",
        Fax => "fax",
        Other => "other",
    }
}

field_enum! {
    #[derive(Default)]
    EmailType {
        #[default]
        Personal => "personal",
        Work => "work",
        Other => "other",
    }
}

field_enum! {
    #[derive(Default)]
    AddressType {
        #[default]
        Home => "home",
        Work => "work",
        Mailing => "mailing",
        Billing => "billing",
        Temporary => "temporary",
        Other => "other",
    }
}

field_enum! {
    /// Preferred way of reaching the patient for care coordination
    #[derive(Default)]
    ContactMethod {
        #[default]
        Phone => "phone",
        Email => "email",
        Sms => "sms",
        Mail => "mail",
        Portal => "portal",
    }
}

field_enum! {
    Gender {
        Male => "male",
        Female => "female",
        NonBinary => "non_binary",
        Other => "other",
        Unknown => "unknown",
        PreferNotToSay => "prefer_not_to_say",
    }
}

field_enum! {
    MaritalStatus {
        Single => "single",
        Married => "married",
        Divorced => "divorced",
        Widowed => "widowed",
        Separated => "separated",
        DomesticPartner => "domestic_partner",
        Unknown => "unknown",
    }
}

field_enum! {
    #[derive(Default)]
    AllergySeverity {
        Mild => "mild",
        #[default]
        Moderate => "moderate",
        Severe => "severe",
        LifeThreatening => "life_threatening",
    }
}

field_enum! {
    #[derive(Default)]
    ConditionStatus {
        #[default]
        Active => "active",
        Resolved => "resolved",
        Chronic => "chronic",
        InRemission => "in_remission",
    }
}

field_enum! {
    #[derive(Default)]
    AlertType {
        #[default]
        Clinical => "clinical",
        Administrative => "administrative",
        Safety => "safety",
        Billing => "billing",
        Other => "other",
    }
}

field_enum! {
    #[derive(Default)]
    AlertSeverity {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

field_enum! {
    /// Relationship of the policy subscriber to the patient
    #[derive(Default)]
    SubscriberRelationship {
        #[default]
        SelfInsured => "self",
        Spouse => "spouse",
        Child => "child",
        Other => "other",
    }
}

field_enum! {
    /// Insurance tier; also names the slot a coverage occupies
    CoverageType {
        Primary => "primary",
        Secondary => "secondary",
        Tertiary => "tertiary",
    }
}

field_enum! {
    /// Outbound communication channel
    #[derive(Default)]
    Channel {
        #[default]
        Email => "email",
        Sms => "sms",
        Phone => "phone",
        Mail => "mail",
        Portal => "portal",
    }
}

field_enum! {
    ConsentType {
        Treatment => "treatment",
        PrivacyNotice => "privacy_notice",
        Hipaa => "hipaa",
        FinancialPolicy => "financial_policy",
        Photography => "photography",
        Communication => "communication",
        Research => "research",
        Minors => "minors",
    }
}

field_enum! {
    #[derive(Default)]
    SignatureType {
        #[default]
        Digital => "digital",
        Written => "written",
        Verbal => "verbal",
        Electronic => "electronic",
    }
}

field_enum! {
    /// Record lifecycle state
    #[derive(Default)]
    PatientStatus {
        #[default]
        Active => "active",
        Inactive => "inactive",
        Archived => "archived",
        Deceased => "deceased",
        Merged => "merged",
    }
}

field_enum! {
    #[derive(Default)]
    SortField {
        #[default]
        LastName => "lastName",
        FirstName => "firstName",
        DateOfBirth => "dateOfBirth",
        PatientNumber => "patientNumber",
        CreatedAt => "createdAt",
        UpdatedAt => "updatedAt",
    }
}

field_enum! {
    #[derive(Default)]
    SortOrder {
        #[default]
        Asc => "asc",
        Desc => "desc",
    }
}

field_enum! {
    /// Format the bulk payload was converted from
    ImportSource {
        Csv => "csv",
        Json => "json",
        Hl7 => "hl7",
        Fhir => "fhir",
        Legacy => "legacy",
    }
}

field_enum! {
    #[derive(Default)]
    ExportFormat {
        #[default]
        Json => "json",
        Csv => "csv",
        Pdf => "pdf",
        Hl7 => "hl7",
        Fhir => "fhir",
    }
}

field_enum! {
    /// How scrubbed values are replaced
    #[derive(Default)]
    AnonymizationStrategy {
        /// Fixed redaction markers
        #[default]
        Redact => "redact",
        /// Stable per-patient tokens
        Token => "token",
    }
}

field_enum! {
    #[derive(Default)]
    Priority {
        Low => "low",
        #[default]
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}
