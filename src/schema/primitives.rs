//! Primitive value parsers
//!
//! Each parser takes the raw JSON value, its path and the validation context,
//! and returns the typed value or `None` after reporting a violation. Parsers
//! are plain functions or `Copy` closures so they can be passed straight to
//! [`Fields`](super::fields::Fields) getters and to [`list`].
//!
//! A present value of the wrong scalar type is a constraint violation
//! (`InvalidType`); container mismatches are structural.

use super::context::ValidationContext;
use super::enums::FieldEnum;
use crate::domain::{FieldPath, ViolationCode};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use uuid::Uuid;

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$")
        .expect("valid email regex")
});
static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9 -]{3,10}$").expect("valid postal code regex"));
static COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid country regex"));
static SSN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}-[0-9]{2}-[0-9]{4}$").expect("valid ssn regex"));
static LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,3}(-[A-Z]{2})?$").expect("valid language regex"));
static POLICY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{1,50}$").expect("valid policy number regex"));
static PATIENT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{1,30}$").expect("valid patient number regex"));
static ICD10: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-TV-Z][0-9][0-9A-Z](\.[0-9A-Z]{1,4})?$").expect("valid icd-10 regex")
});
static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,10}$").expect("valid extension regex"));
static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

/// Named format a string must match after its transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Phone,
    Email,
    PostalCode,
    Country,
    Ssn,
    Language,
    PolicyNumber,
    PatientNumber,
    Icd10,
    Extension,
    ClockTime,
}

impl Pattern {
    pub fn regex(self) -> &'static Regex {
        match self {
            Pattern::Phone => &PHONE,
            Pattern::Email => &EMAIL,
            Pattern::PostalCode => &POSTAL_CODE,
            Pattern::Country => &COUNTRY,
            Pattern::Ssn => &SSN,
            Pattern::Language => &LANGUAGE,
            Pattern::PolicyNumber => &POLICY_NUMBER,
            Pattern::PatientNumber => &PATIENT_NUMBER,
            Pattern::Icd10 => &ICD10,
            Pattern::Extension => &EXTENSION,
            Pattern::ClockTime => &CLOCK_TIME,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Pattern::Phone => "a phone number of 7 to 15 digits with optional leading '+'",
            Pattern::Email => "an email address",
            Pattern::PostalCode => "a postal code of 3 to 10 letters, digits, spaces or dashes",
            Pattern::Country => "an ISO 3166 alpha-2 country code",
            Pattern::Ssn => "a social security number (###-##-####)",
            Pattern::Language => "a language tag such as 'en' or 'pt-BR'",
            Pattern::PolicyNumber => "letters, digits and dashes",
            Pattern::PatientNumber => "letters, digits and dashes",
            Pattern::Icd10 => "an ICD-10 code such as 'E11.9'",
            Pattern::Extension => "1 to 10 digits",
            Pattern::ClockTime => "a 24-hour time (HH:MM)",
        }
    }
}

/// Normalization applied to a trimmed string before checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    Lower,
    Upper,
    /// Drop phone formatting characters (space, dash, parentheses, dot)
    StripPhone,
    /// Render nine bare digits as `###-##-####`
    DashedSsn,
}

impl Transform {
    fn apply(self, value: &str) -> String {
        match self {
            Transform::None => value.to_string(),
            Transform::Lower => value.to_lowercase(),
            Transform::Upper => value.to_uppercase(),
            Transform::StripPhone => value
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
                .collect(),
            Transform::DashedSsn => {
                if value.len() == 9 && value.chars().all(|c| c.is_ascii_digit()) {
                    format!("{}-{}-{}", &value[0..3], &value[3..5], &value[5..9])
                } else {
                    value.to_string()
                }
            }
        }
    }
}

/// String rule: trimmed length bounds, optional transform and pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Text {
    min: usize,
    max: usize,
    pattern: Option<Pattern>,
    transform: Transform,
}

impl Text {
    pub const fn new(min: usize, max: usize) -> Self {
        Self {
            min,
            max,
            pattern: None,
            transform: Transform::None,
        }
    }

    pub const fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub const fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Checks an already-extracted string
    pub fn check(&self, raw: &str, path: &FieldPath, cx: &mut ValidationContext) -> Option<String> {
        let value = self.transform.apply(raw.trim());
        let length = value.chars().count();

        if length < self.min {
            let message = if self.min == 1 {
                "must not be empty".to_string()
            } else {
                format!("must be at least {} characters", self.min)
            };
            cx.report(path, ViolationCode::TooShort, message);
            return None;
        }
        if length > self.max {
            cx.report(
                path,
                ViolationCode::TooLong,
                format!("must be at most {} characters", self.max),
            );
            return None;
        }
        if let Some(pattern) = self.pattern {
            if !pattern.regex().is_match(&value) {
                cx.report(
                    path,
                    ViolationCode::InvalidFormat,
                    format!("must be {}", pattern.describe()),
                );
                return None;
            }
        }
        Some(value)
    }
}

// Shared rules
pub const NAME: Text = Text::new(1, 100);
pub const SHORT_NAME: Text = Text::new(1, 20);
pub const ACTOR: Text = Text::new(1, 100);
pub const REASON: Text = Text::new(1, 500);
pub const NOTES: Text = Text::new(0, 500);
pub const PHONE_NUMBER: Text = Text::new(1, 20)
    .transform(Transform::StripPhone)
    .pattern(Pattern::Phone);
pub const EMAIL_ADDRESS: Text = Text::new(3, 254)
    .transform(Transform::Lower)
    .pattern(Pattern::Email);

/// Human-readable JSON type of `value`
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn expect_str<'v>(
    value: &'v Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<&'v str> {
    match value.as_str() {
        Some(s) => Some(s),
        None => {
            cx.report(
                path,
                ViolationCode::InvalidType,
                format!("expected a string, found {}", describe(value)),
            );
            None
        }
    }
}

pub fn text(
    rule: Text,
) -> impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<String> + Copy {
    move |value: &Value, path: &FieldPath, cx: &mut ValidationContext| {
        let raw = expect_str(value, path, cx)?;
        rule.check(raw, path, cx)
    }
}

pub fn boolean(value: &Value, path: &FieldPath, cx: &mut ValidationContext) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        other => {
            cx.report(
                path,
                ViolationCode::InvalidType,
                format!("expected a boolean, found {}", describe(other)),
            );
            None
        }
    }
}

/// Non-negative integer within `min..=max`
pub fn unsigned(
    min: u64,
    max: u64,
) -> impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<u64> + Copy {
    move |value: &Value, path: &FieldPath, cx: &mut ValidationContext| {
        let Value::Number(number) = value else {
            cx.report(
                path,
                ViolationCode::InvalidType,
                format!("expected an integer, found {}", describe(value)),
            );
            return None;
        };
        check_unsigned(number.as_u64(), number.as_i64(), min, max, path, cx)
    }
}

fn check_unsigned(
    as_u64: Option<u64>,
    as_i64: Option<i64>,
    min: u64,
    max: u64,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<u64> {
    match (as_u64, as_i64) {
        (Some(n), _) if (min..=max).contains(&n) => Some(n),
        (Some(_), _) | (None, Some(_)) => {
            cx.report(
                path,
                ViolationCode::OutOfRange,
                format!("must be between {min} and {max}"),
            );
            None
        }
        (None, None) => {
            cx.report(path, ViolationCode::InvalidType, "expected an integer");
            None
        }
    }
}

/// Like [`unsigned`], also accepting the decimal string spelling
pub fn unsigned_lenient(
    min: u64,
    max: u64,
) -> impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<u64> + Copy {
    move |value: &Value, path: &FieldPath, cx: &mut ValidationContext| match value {
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(n) => check_unsigned(u64::try_from(n).ok(), Some(n), min, max, path, cx),
                Err(_) => {
                    cx.report(
                        path,
                        ViolationCode::InvalidType,
                        format!("expected an integer, found '{trimmed}'"),
                    );
                    None
                }
            }
        }
        other => unsigned(min, max)(other, path, cx),
    }
}

/// Boolean that also accepts "true"/"false"/"1"/"0"
pub fn boolean_lenient(value: &Value, path: &FieldPath, cx: &mut ValidationContext) -> Option<bool> {
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            other => {
                cx.report(
                    path,
                    ViolationCode::InvalidType,
                    format!("expected a boolean, found '{other}'"),
                );
                None
            }
        },
        other => boolean(other, path, cx),
    }
}

pub fn enum_value<E: FieldEnum>(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<E> {
    let raw = expect_str(value, path, cx)?;
    match E::parse_str(raw.trim()) {
        Some(variant) => Some(variant),
        None => {
            let allowed: Vec<&str> = E::ALL.iter().map(|v| v.as_str()).collect();
            cx.report(
                path,
                ViolationCode::InvalidEnumValue,
                format!("'{raw}' is not one of: {}", allowed.join(", ")),
            );
            None
        }
    }
}

/// UUID-backed identifier
pub fn id<I: From<Uuid>>(value: &Value, path: &FieldPath, cx: &mut ValidationContext) -> Option<I> {
    let raw = expect_str(value, path, cx)?;
    match Uuid::parse_str(raw.trim()) {
        Ok(uuid) => Some(I::from(uuid)),
        Err(_) => {
            cx.report(path, ViolationCode::InvalidFormat, format!("'{raw}' is not a UUID"));
            None
        }
    }
}

/// Calendar date in `YYYY-MM-DD` form
pub fn date(value: &Value, path: &FieldPath, cx: &mut ValidationContext) -> Option<NaiveDate> {
    let raw = expect_str(value, path, cx)?;
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            cx.report(
                path,
                ViolationCode::InvalidFormat,
                format!("'{raw}' is not an ISO date (YYYY-MM-DD)"),
            );
            None
        }
    }
}

/// Calendar date that is not after the context's current day
pub fn past_date(value: &Value, path: &FieldPath, cx: &mut ValidationContext) -> Option<NaiveDate> {
    let parsed = date(value, path, cx)?;
    if parsed > cx.today() {
        cx.report(path, ViolationCode::FutureDate, "must not be in the future");
        return None;
    }
    Some(parsed)
}

/// RFC 3339 timestamp, normalized to UTC
pub fn datetime(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<DateTime<Utc>> {
    let raw = expect_str(value, path, cx)?;
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(_) => {
            cx.report(
                path,
                ViolationCode::InvalidFormat,
                format!("'{raw}' is not an RFC 3339 timestamp"),
            );
            None
        }
    }
}

/// Free-form JSON object
pub fn object(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        other => {
            cx.report(
                path,
                ViolationCode::ExpectedObject,
                format!("expected an object, found {}", describe(other)),
            );
            None
        }
    }
}

/// Array whose length is within `min..=max`, each element parsed by `item`
///
/// Every element is visited even after a failure; the list is returned only
/// when all elements parsed.
pub fn list<T>(
    item: impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<T> + Copy,
    min: usize,
    max: usize,
) -> impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<Vec<T>> + Copy {
    move |value: &Value, path: &FieldPath, cx: &mut ValidationContext| {
        let Value::Array(elements) = value else {
            cx.report(
                path,
                ViolationCode::ExpectedArray,
                format!("expected an array, found {}", describe(value)),
            );
            return None;
        };
        parse_elements(elements, item, min, max, path, cx)
    }
}

/// Like [`list`], also accepting a comma-separated string
pub fn list_or_csv<T>(
    item: impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<T> + Copy,
    min: usize,
    max: usize,
) -> impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<Vec<T>> + Copy {
    move |value: &Value, path: &FieldPath, cx: &mut ValidationContext| match value {
        Value::String(joined) => {
            let elements: Vec<Value> = joined
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect();
            parse_elements(&elements, item, min, max, path, cx)
        }
        other => list(item, min, max)(other, path, cx),
    }
}

fn parse_elements<T>(
    elements: &[Value],
    item: impl Fn(&Value, &FieldPath, &mut ValidationContext) -> Option<T>,
    min: usize,
    max: usize,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<Vec<T>> {
    if elements.len() < min {
        cx.report(
            path,
            ViolationCode::TooFewItems,
            format!("must contain at least {min} item(s)"),
        );
        return None;
    }
    if elements.len() > max {
        cx.report(
            path,
            ViolationCode::TooManyItems,
            format!("must contain at most {max} item(s)"),
        );
        return None;
    }

    let mut parsed = Vec::with_capacity(elements.len());
    let mut complete = true;
    for (index, element) in elements.iter().enumerate() {
        match item(element, &path.index(index), cx) {
            Some(value) => parsed.push(value),
            None => complete = false,
        }
    }
    complete.then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::context::ValidationOptions;
    use crate::schema::enums::PhoneType;
    use chrono::TimeZone;
    use serde_json::json;
    use test_case::test_case;

    fn cx() -> ValidationContext {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        ValidationContext::new(ValidationOptions::default(), now)
    }

    fn root() -> FieldPath {
        FieldPath::root()
    }

    #[test_case("(555) 123-4567", Some("5551234567"); "formatted us number")]
    #[test_case("+44 20 7946 0958", Some("+442079460958"); "international")]
    #[test_case("555-12", None; "too short")]
    #[test_case("call me", None; "letters")]
    fn test_phone_number(input: &str, expected: Option<&str>) {
        let mut cx = cx();
        let result = text(PHONE_NUMBER)(&json!(input), &root(), &mut cx);
        assert_eq!(result.as_deref(), expected);
    }

    #[test]
    fn test_email_is_lowercased() {
        let mut cx = cx();
        let result = text(EMAIL_ADDRESS)(&json!("  Jane.Doe@Example.COM "), &root(), &mut cx);
        assert_eq!(result.as_deref(), Some("jane.doe@example.com"));
    }

    #[test]
    fn test_email_rejects_missing_domain() {
        let mut cx = cx();
        assert!(text(EMAIL_ADDRESS)(&json!("jane@"), &root(), &mut cx).is_none());
        assert!(cx.into_errors().has_code(ViolationCode::InvalidFormat));
    }

    #[test]
    fn test_ssn_is_dashed() {
        let mut cx = cx();
        let rule = Text::new(9, 11)
            .transform(Transform::DashedSsn)
            .pattern(Pattern::Ssn);
        assert_eq!(
            text(rule)(&json!("123456789"), &root(), &mut cx).as_deref(),
            Some("123-45-6789")
        );
        assert_eq!(
            text(rule)(&json!("123-45-6789"), &root(), &mut cx).as_deref(),
            Some("123-45-6789")
        );
    }

    #[test]
    fn test_blank_required_text_is_too_short() {
        let mut cx = cx();
        assert!(text(NAME)(&json!("   "), &root(), &mut cx).is_none());
        assert!(cx.into_errors().has_code(ViolationCode::TooShort));
    }

    #[test]
    fn test_wrong_scalar_type_is_constraint() {
        let mut cx = cx();
        assert!(text(NAME)(&json!(42), &root(), &mut cx).is_none());
        assert!(unsigned(0, 10)(&json!("3"), &root(), &mut cx).is_none());
        assert!(boolean(&json!("yes"), &root(), &mut cx).is_none());
        let errors = cx.into_errors();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|v| v.code == ViolationCode::InvalidType));
    }

    #[test]
    fn test_unsigned_bounds() {
        let mut cx = cx();
        assert_eq!(unsigned(1, 100)(&json!(20), &root(), &mut cx), Some(20));
        assert!(unsigned(1, 100)(&json!(0), &root(), &mut cx).is_none());
        assert!(unsigned(1, 100)(&json!(-5), &root(), &mut cx).is_none());
        assert!(unsigned(1, 100)(&json!(2.5), &root(), &mut cx).is_none());
        let codes: Vec<_> = cx.into_errors().iter().map(|v| v.code).collect();
        assert_eq!(
            codes,
            vec![
                ViolationCode::OutOfRange,
                ViolationCode::OutOfRange,
                ViolationCode::InvalidType
            ]
        );
    }

    #[test]
    fn test_lenient_scalars_accept_strings() {
        let mut cx = cx();
        assert_eq!(unsigned_lenient(1, 100)(&json!(" 3 "), &root(), &mut cx), Some(3));
        assert_eq!(boolean_lenient(&json!("TRUE"), &root(), &mut cx), Some(true));
        assert_eq!(boolean_lenient(&json!("0"), &root(), &mut cx), Some(false));
        assert!(cx.into_errors().is_empty());
    }

    #[test]
    fn test_future_date_rejected() {
        let mut cx = cx();
        assert!(past_date(&json!("2024-06-01"), &root(), &mut cx).is_some());
        assert!(past_date(&json!("2024-06-02"), &root(), &mut cx).is_none());
        assert!(cx.into_errors().has_code(ViolationCode::FutureDate));
    }

    #[test]
    fn test_datetime_normalized_to_utc() {
        let mut cx = cx();
        let parsed = datetime(&json!("2024-01-01T10:00:00+02:00"), &root(), &mut cx).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_enum_value_lists_allowed() {
        let mut cx = cx();
        assert_eq!(
            enum_value::<PhoneType>(&json!("work"), &root(), &mut cx),
            Some(PhoneType::Work)
        );
        assert!(enum_value::<PhoneType>(&json!("pager"), &root(), &mut cx).is_none());
        let errors = cx.into_errors();
        let violation = errors.iter().next().unwrap();
        assert_eq!(violation.code, ViolationCode::InvalidEnumValue);
        assert!(violation.message.contains("mobile, home, work, fax, other"));
    }

    #[test]
    fn test_list_reports_every_bad_element() {
        let mut cx = cx();
        let parse = list(text(Text::new(1, 5)), 0, 10);
        let result = parse(&json!(["ok", "", "toolong"]), &root().key("tags"), &mut cx);
        assert!(result.is_none());
        let errors = cx.into_errors();
        assert_eq!(errors.at("tags[1]").count(), 1);
        assert_eq!(errors.at("tags[2]").count(), 1);
    }

    #[test]
    fn test_list_or_csv_splits_strings() {
        let mut cx = cx();
        let parse = list_or_csv(text(Text::new(1, 50)), 0, 50);
        assert_eq!(
            parse(&json!("vip, diabetic,,"), &root(), &mut cx),
            Some(vec!["vip".to_string(), "diabetic".to_string()])
        );
    }

    #[test]
    fn test_list_requires_array() {
        let mut cx = cx();
        assert!(list(boolean, 0, 3)(&json!({"a": true}), &root(), &mut cx).is_none());
        assert!(cx.into_errors().has_code(ViolationCode::ExpectedArray));
    }
}
