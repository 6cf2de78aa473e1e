//! Domain identifier types
//!
//! Newtype wrappers around UUIDs so a tenant id can never be passed where a
//! patient id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parses the hyphenated UUID form
            pub fn parse(id: &str) -> Result<Self, String> {
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err(format!("{} cannot be empty", $label));
                }
                Uuid::parse_str(trimmed)
                    .map(Self)
                    .map_err(|_| format!("{} must be a UUID, got '{}'", $label, trimmed))
            }

            /// Returns the wrapped UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Patient record identifier, assigned by the store
    PatientId,
    "patient id"
);
uuid_id!(
    /// Tenant (customer) identifier
    TenantId,
    "tenant id"
);
uuid_id!(
    /// Organization identifier within a tenant
    OrganizationId,
    "organization id"
);
uuid_id!(
    /// Clinic identifier within an organization
    ClinicId,
    "clinic id"
);
uuid_id!(
    /// Care provider identifier
    ProviderId,
    "provider id"
);
