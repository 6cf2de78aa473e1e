//! Field paths for violation reporting
//!
//! A path renders the way API clients address fields:
//! `contacts.phones[2].number`.

use serde::{Serialize, Serializer};
use std::fmt;

/// One step in a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
}

/// Location of a value inside a JSON input tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// The empty path (the input document itself)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path extended with an object key
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_string()));
        Self(segments)
    }

    /// Returns a new path extended with an array index
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// Returns `prefix` followed by this path
    pub fn prefixed(&self, prefix: &FieldPath) -> Self {
        let mut segments = prefix.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    /// True for the document root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = FieldPath::root().key("contacts").key("phones").index(2).key("number");
        assert_eq!(path.to_string(), "contacts.phones[2].number");
    }

    #[test]
    fn test_root_path_display() {
        assert_eq!(FieldPath::root().to_string(), "");
        assert!(FieldPath::root().is_root());
    }

    #[test]
    fn test_index_at_root() {
        let path = FieldPath::root().index(0).key("name");
        assert_eq!(path.to_string(), "[0].name");
    }

    #[test]
    fn test_prefixed() {
        let inner = FieldPath::root().key("name").key("firstName");
        let prefix = FieldPath::root().key("patients").index(1);
        assert_eq!(
            inner.prefixed(&prefix).to_string(),
            "patients[1].name.firstName"
        );
    }

    #[test]
    fn test_path_serializes_as_string() {
        let path = FieldPath::root().key("emails").index(0);
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            serde_json::json!("emails[0]")
        );
    }
}
