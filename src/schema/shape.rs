//! Field-table projections
//!
//! A [`Shape`] is an ordered list of [`FieldSpec`]s describing which keys a
//! projection accepts and how each must be present. Projections are derived
//! from the canonical table with combinators, so a change to the table
//! reaches every projection.
//!
//! ```rust
//! use patient_contracts::schema::shape::{FieldSpec, Presence, Shape};
//!
//! const FIELDS: &[FieldSpec] = &[
//!     FieldSpec::server("id"),
//!     FieldSpec::required("name"),
//!     FieldSpec::defaulted("tags"),
//! ];
//!
//! let create = Shape::new(FIELDS).without_server_assigned();
//! assert_eq!(create.keys(), vec!["name", "tags"]);
//!
//! let update = create.partial();
//! assert_eq!(update.get("name").unwrap().presence, Presence::Optional);
//! ```

/// How a field must appear in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-null
    Required,
    /// May be absent; a default is injected
    Defaulted,
    /// May be absent; no default
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub presence: Presence,
    /// Explicit `null` is accepted and means "clear"
    pub nullable: bool,
    /// Assigned by the store, never by the client
    pub server_assigned: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str) -> Self {
        Self::with(name, Presence::Required)
    }

    pub const fn defaulted(name: &'static str) -> Self {
        Self::with(name, Presence::Defaulted)
    }

    pub const fn optional(name: &'static str) -> Self {
        Self::with(name, Presence::Optional)
    }

    /// A required field the store assigns
    pub const fn server(name: &'static str) -> Self {
        let mut spec = Self::with(name, Presence::Required);
        spec.server_assigned = true;
        spec
    }

    /// Marks the field server-assigned
    pub const fn assigned(mut self) -> Self {
        self.server_assigned = true;
        self
    }

    const fn with(name: &'static str, presence: Presence) -> Self {
        Self {
            name,
            presence,
            nullable: false,
            server_assigned: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    fields: Vec<FieldSpec>,
}

impl Shape {
    pub fn new(fields: &[FieldSpec]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Drops the named fields
    pub fn omit(mut self, names: &[&str]) -> Self {
        self.assert_known(names);
        self.fields.retain(|f| !names.contains(&f.name));
        self
    }

    /// Keeps only the named fields
    pub fn pick(mut self, names: &[&str]) -> Self {
        self.assert_known(names);
        self.fields.retain(|f| names.contains(&f.name));
        self
    }

    /// Drops every server-assigned field
    pub fn without_server_assigned(mut self) -> Self {
        self.fields.retain(|f| !f.server_assigned);
        self
    }

    /// Every field optional with no default: absent means "no change"
    pub fn partial(mut self) -> Self {
        for field in &mut self.fields {
            field.presence = Presence::Optional;
        }
        self
    }

    pub fn require(self, names: &[&str]) -> Self {
        self.set_presence(names, Presence::Required)
    }

    pub fn optional(self, names: &[&str]) -> Self {
        self.set_presence(names, Presence::Optional)
    }

    pub fn nullable(mut self, names: &[&str]) -> Self {
        self.assert_known(names);
        for field in &mut self.fields {
            if names.contains(&field.name) {
                field.nullable = true;
            }
        }
        self
    }

    /// Appends fields, replacing any existing field of the same name
    pub fn extend(mut self, extra: &[FieldSpec]) -> Self {
        for spec in extra {
            match self.fields.iter_mut().find(|f| f.name == spec.name) {
                Some(existing) => *existing = *spec,
                None => self.fields.push(*spec),
            }
        }
        self
    }

    fn set_presence(mut self, names: &[&str], presence: Presence) -> Self {
        self.assert_known(names);
        for field in &mut self.fields {
            if names.contains(&field.name) {
                field.presence = presence;
            }
        }
        self
    }

    fn assert_known(&self, names: &[&str]) {
        for name in names {
            debug_assert!(self.contains(name), "shape has no field '{name}'");
        }
    }
}
