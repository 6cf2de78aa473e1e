//! Schema nodes
//!
//! A node is a normalized struct paired with a `Raw` struct holding its
//! pre-default input. Parsing one node runs, in order:
//!
//! 1. structural check of the object and its keys ([`Fields::open`])
//! 2. [`Schema::read`]: primitive checks and child recursion into `Raw`
//! 3. [`Schema::build`]: default injection into the normalized value
//! 4. every function in [`Schema::REFINEMENTS`], in declaration order
//!
//! Steps 3 and 4 only run when step 2 recorded nothing for this subtree, so
//! refinements always see a complete, fully-defaulted node whose children are
//! already normalized.

use super::context::ValidationContext;
use super::fields::Fields;
use crate::domain::FieldPath;
use serde_json::{Map, Value};

/// A local or collection rule run after defaults are applied
pub type Refinement<T> = fn(&mut T, &FieldPath, &mut ValidationContext);

pub trait Schema: Sized + 'static {
    /// Input as read, before defaults
    type Raw;

    /// Keys accepted in the input object
    const KEYS: &'static [&'static str];

    /// Rules run on the normalized node, in order
    const REFINEMENTS: &'static [Refinement<Self>] = &[];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> Self::Raw;

    fn build(raw: Self::Raw, path: &FieldPath, cx: &mut ValidationContext) -> Option<Self>;
}

/// Parses `value` as node `S`
pub fn parse<S: Schema>(value: &Value, path: &FieldPath, cx: &mut ValidationContext) -> Option<S> {
    parse_with::<S>(|_| {})(value, path, cx)
}

/// Parses node `S`, letting the owner adjust the raw input before defaults
pub fn parse_with<S: Schema>(
    adjust: impl FnOnce(&mut S::Raw),
) -> impl FnOnce(&Value, &FieldPath, &mut ValidationContext) -> Option<S> {
    move |value: &Value, path: &FieldPath, cx: &mut ValidationContext| {
        let before = cx.error_count();
        let fields = Fields::open(value, path, S::KEYS, cx)?;
        let mut raw = S::read(&fields, cx);
        if cx.error_count() > before {
            return None;
        }
        adjust(&mut raw);
        let node = S::build(raw, path, cx)?;
        refine(node, S::REFINEMENTS, path, cx)
    }
}

/// Runs `rules` over `node`; the node survives only if none of them reported
pub fn refine<T>(
    mut node: T,
    rules: &[Refinement<T>],
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<T> {
    let before = cx.error_count();
    for rule in rules {
        rule(&mut node, path, cx);
    }
    (cx.error_count() == before).then_some(node)
}

/// Node `S` with every field defaulted, as if `{}` had been supplied
pub fn defaulted<S: Schema>(path: &FieldPath, cx: &mut ValidationContext) -> Option<S> {
    parse::<S>(&Value::Object(Map::new()), path, cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ViolationCode;
    use crate::schema::context::ValidationOptions;
    use crate::schema::primitives::{boolean, text, unsigned, Text};
    use chrono::Utc;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Window {
        low: u64,
        high: u64,
        label: String,
        open: bool,
    }

    struct WindowRaw {
        low: Option<u64>,
        high: Option<u64>,
        label: Option<String>,
        open: Option<bool>,
    }

    fn ordered(node: &mut Window, path: &FieldPath, cx: &mut ValidationContext) {
        if node.low > node.high {
            cx.report(&path.key("high"), ViolationCode::InvalidRange, "high must be >= low");
        }
    }

    impl Schema for Window {
        type Raw = WindowRaw;
        const KEYS: &'static [&'static str] = &["low", "high", "label", "open"];
        const REFINEMENTS: &'static [Refinement<Self>] = &[ordered];

        fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> WindowRaw {
            WindowRaw {
                low: fields.required(cx, "low", unsigned(0, 100)),
                high: fields.optional(cx, "high", unsigned(0, 100)),
                label: fields.optional(cx, "label", text(Text::new(1, 10))),
                open: fields.optional(cx, "open", boolean),
            }
        }

        fn build(raw: WindowRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
            Some(Self {
                low: raw.low?,
                high: raw.high.unwrap_or(100),
                label: raw.label.unwrap_or_else(|| "default".into()),
                open: raw.open.unwrap_or(true),
            })
        }
    }

    fn cx() -> ValidationContext {
        ValidationContext::new(ValidationOptions::default(), Utc::now())
    }

    #[test]
    fn test_defaults_applied() {
        let mut cx = cx();
        let window: Window = parse(&json!({"low": 5}), &FieldPath::root(), &mut cx).unwrap();
        assert_eq!(window.high, 100);
        assert_eq!(window.label, "default");
        assert!(window.open);
    }

    #[test]
    fn test_refinement_sees_defaults() {
        let mut cx = cx();
        let result: Option<Window> =
            parse(&json!({"low": 50, "high": 10}), &FieldPath::root(), &mut cx);
        assert!(result.is_none());
        assert!(cx.into_errors().has_code(ViolationCode::InvalidRange));
    }

    #[test]
    fn test_all_field_errors_collected() {
        let mut cx = cx();
        let result: Option<Window> = parse(
            &json!({"high": "x", "label": "", "open": 1, "extra": true}),
            &FieldPath::root(),
            &mut cx,
        );
        assert!(result.is_none());
        assert_eq!(cx.into_errors().len(), 5);
    }

    #[test]
    fn test_adjust_runs_before_defaults() {
        let mut cx = cx();
        let window: Window = parse_with::<Window>(|raw| raw.high = raw.high.or(Some(7)))(
            &json!({"low": 1}),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert_eq!(window.high, 7);
    }
}
