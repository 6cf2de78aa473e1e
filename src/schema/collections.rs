//! Rules that only hold across a sequence of value objects

use super::context::{ImplicitPrimaryPolicy, ValidationContext};
use crate::domain::{FieldPath, ViolationCode};

/// An element that can be flagged as the primary entry of its sequence
pub trait Primary {
    fn is_primary(&self) -> bool;
    fn set_primary(&mut self, primary: bool);
}

/// At most one element of `items` may be primary
///
/// More than one reports a single `DuplicatePrimary` at the collection path,
/// naming the offending indices. An empty marking is accepted; under
/// [`ImplicitPrimaryPolicy::PromoteFirst`] the first element is marked.
pub fn enforce_single_primary<T: Primary>(
    items: &mut [T],
    path: &FieldPath,
    cx: &mut ValidationContext,
) {
    let marked: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_primary())
        .map(|(index, _)| index)
        .collect();

    match marked.len() {
        0 => {
            if cx.options().implicit_primary == ImplicitPrimaryPolicy::PromoteFirst {
                if let Some(first) = items.first_mut() {
                    first.set_primary(true);
                }
            }
        }
        1 => {}
        _ => {
            let indices: Vec<String> = marked.iter().map(usize::to_string).collect();
            let name = if path.is_root() {
                "collection".to_string()
            } else {
                path.to_string()
            };
            cx.report(
                path,
                ViolationCode::DuplicatePrimary,
                format!(
                    "{name} has more than one primary entry (indices {})",
                    indices.join(", ")
                ),
            );
        }
    }
}

/// The explicitly marked primary, or the first element when none is marked
pub fn effective_primary<T: Primary>(items: &[T]) -> Option<&T> {
    items
        .iter()
        .find(|item| item.is_primary())
        .or_else(|| items.first())
}

/// Removes repeated values, keeping the first occurrence
pub fn dedupe<T: PartialEq>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    *items = seen;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::context::ValidationOptions;
    use chrono::Utc;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(bool);

    impl Primary for Entry {
        fn is_primary(&self) -> bool {
            self.0
        }
        fn set_primary(&mut self, primary: bool) {
            self.0 = primary;
        }
    }

    fn cx(policy: ImplicitPrimaryPolicy) -> ValidationContext {
        let options = ValidationOptions {
            implicit_primary: policy,
            ..ValidationOptions::default()
        };
        ValidationContext::new(options, Utc::now())
    }

    #[test]
    fn test_duplicate_primary_names_indices() {
        let mut cx = cx(ImplicitPrimaryPolicy::Preserve);
        let mut items = vec![Entry(true), Entry(false), Entry(true)];
        let path = FieldPath::root().key("contacts").key("phones");
        enforce_single_primary(&mut items, &path, &mut cx);

        let errors = cx.into_errors();
        assert_eq!(errors.len(), 1);
        let violation = errors.at("contacts.phones").next().unwrap();
        assert_eq!(violation.code, ViolationCode::DuplicatePrimary);
        assert!(violation.message.contains("indices 0, 2"));
    }

    #[test]
    fn test_no_primary_preserved_by_default() {
        let mut cx = cx(ImplicitPrimaryPolicy::Preserve);
        let mut items = vec![Entry(false), Entry(false)];
        enforce_single_primary(&mut items, &FieldPath::root(), &mut cx);
        assert!(cx.into_errors().is_empty());
        assert_eq!(items, vec![Entry(false), Entry(false)]);
        assert_eq!(effective_primary(&items), Some(&items[0]));
    }

    #[test]
    fn test_promote_first() {
        let mut cx = cx(ImplicitPrimaryPolicy::PromoteFirst);
        let mut items = vec![Entry(false), Entry(false)];
        enforce_single_primary(&mut items, &FieldPath::root(), &mut cx);
        assert_eq!(items, vec![Entry(true), Entry(false)]);
    }

    #[test]
    fn test_effective_primary_prefers_marked() {
        let items = vec![Entry(false), Entry(true)];
        assert!(std::ptr::eq(effective_primary(&items).unwrap(), &items[1]));
        assert!(effective_primary::<Entry>(&[]).is_none());
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut tags = vec!["b", "a", "b", "c", "a"];
        dedupe(&mut tags);
        assert_eq!(tags, vec!["b", "a", "c"]);
    }
}
