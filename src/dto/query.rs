//! Query projection
//!
//! A flat filter/sort/page shape, independent of the record's nesting. Query
//! strings arrive as text, so numeric and boolean keys also accept their
//! string spellings and list filters accept comma-separated strings.

use crate::domain::{ClinicId, FieldPath, OrganizationId, ProviderId, ViolationCode};
use crate::schema::collections::dedupe;
use crate::schema::context::ValidationContext;
use crate::schema::enums::{Gender, PatientStatus, SortField, SortOrder};
use crate::schema::fields::Fields;
use crate::schema::node::{Refinement, Schema};
use crate::schema::primitives::{
    boolean_lenient, datetime, enum_value, id, list_or_csv, text, unsigned_lenient, Text,
};
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
const MAX_AGE: u64 = 150;
const SEARCH: Text = Text::new(1, 200);
const TAG: Text = Text::new(1, 50);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPatientsDto {
    pub organization_id: OrganizationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<ClinicId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub status: Vec<PatientStatus>,
    pub tags: Vec<String>,
    pub match_all_tags: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_provider_id: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_before: Option<DateTime<Utc>>,
    pub page: u64,
    pub page_size: u64,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub include_deleted: bool,
    pub include_inactive: bool,
    pub include_all_clinics: bool,
}

/// Inclusive date-of-birth bounds equivalent to an age range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthDateRange {
    pub born_on_or_after: Option<NaiveDate>,
    pub born_on_or_before: Option<NaiveDate>,
}

impl BirthDateRange {
    pub fn contains(&self, date_of_birth: NaiveDate) -> bool {
        self.born_on_or_after.map_or(true, |from| date_of_birth >= from)
            && self.born_on_or_before.map_or(true, |to| date_of_birth <= to)
    }
}

fn years_before(today: NaiveDate, years: u64) -> Option<NaiveDate> {
    let months = u32::try_from(years.checked_mul(12)?).ok()?;
    today.checked_sub_months(Months::new(months))
}

impl QueryPatientsDto {
    /// Number of rows to skip for the requested page
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    /// Converts `minAge`/`maxAge` into date-of-birth bounds as of `today`
    ///
    /// Someone is `maxAge` until the day before their `maxAge + 1` birthday,
    /// so the lower bound is one day after that birthday's date.
    pub fn birth_date_bounds(&self, today: NaiveDate) -> BirthDateRange {
        BirthDateRange {
            born_on_or_after: self
                .max_age
                .and_then(|max| years_before(today, max + 1))
                .and_then(|date| date.succ_opt()),
            born_on_or_before: self.min_age.and_then(|min| years_before(today, min)),
        }
    }

    /// True if the query is limited to the caller's clinic
    pub fn is_clinic_scoped(&self) -> bool {
        !self.include_all_clinics
    }
}

pub struct QueryPatientsRaw {
    organization_id: Option<OrganizationId>,
    clinic_id: Option<ClinicId>,
    search: Option<String>,
    status: Option<Vec<PatientStatus>>,
    tags: Option<Vec<String>>,
    match_all_tags: Option<bool>,
    gender: Option<Gender>,
    assigned_provider_id: Option<ProviderId>,
    min_age: Option<u64>,
    max_age: Option<u64>,
    created_after: Option<DateTime<Utc>>,
    created_before: Option<DateTime<Utc>>,
    updated_after: Option<DateTime<Utc>>,
    updated_before: Option<DateTime<Utc>>,
    page: Option<u64>,
    page_size: Option<u64>,
    sort_by: Option<SortField>,
    sort_order: Option<SortOrder>,
    include_deleted: Option<bool>,
    include_inactive: Option<bool>,
    include_all_clinics: Option<bool>,
}

fn age_range(query: &mut QueryPatientsDto, path: &FieldPath, cx: &mut ValidationContext) {
    if let (Some(min), Some(max)) = (query.min_age, query.max_age) {
        if min > max {
            cx.report(
                &path.key("maxAge"),
                ViolationCode::InvalidRange,
                "maxAge must not be less than minAge",
            );
        }
    }
}

fn timestamp_ranges(query: &mut QueryPatientsDto, path: &FieldPath, cx: &mut ValidationContext) {
    let ranges = [
        ("createdBefore", query.created_after, query.created_before),
        ("updatedBefore", query.updated_after, query.updated_before),
    ];
    for (key, after, before) in ranges {
        if let (Some(after), Some(before)) = (after, before) {
            if after > before {
                cx.report(
                    &path.key(key),
                    ViolationCode::DateOrdering,
                    format!("{key} must not be earlier than the matching 'after' bound"),
                );
            }
        }
    }
}

impl Schema for QueryPatientsDto {
    type Raw = QueryPatientsRaw;
    const KEYS: &'static [&'static str] = &[
        "organizationId",
        "clinicId",
        "search",
        "status",
        "tags",
        "matchAllTags",
        "gender",
        "assignedProviderId",
        "minAge",
        "maxAge",
        "createdAfter",
        "createdBefore",
        "updatedAfter",
        "updatedBefore",
        "page",
        "pageSize",
        "sortBy",
        "sortOrder",
        "includeDeleted",
        "includeInactive",
        "includeAllClinics",
    ];
    const REFINEMENTS: &'static [Refinement<Self>] = &[age_range, timestamp_ranges];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> QueryPatientsRaw {
        QueryPatientsRaw {
            organization_id: fields.required(cx, "organizationId", id::<OrganizationId>),
            clinic_id: fields.optional(cx, "clinicId", id::<ClinicId>),
            search: fields.optional(cx, "search", text(SEARCH)),
            status: fields.optional(cx, "status", list_or_csv(enum_value::<PatientStatus>, 0, 5)),
            tags: fields.optional(cx, "tags", list_or_csv(text(TAG), 0, 50)),
            match_all_tags: fields.optional(cx, "matchAllTags", boolean_lenient),
            gender: fields.optional(cx, "gender", enum_value::<Gender>),
            assigned_provider_id: fields.optional(cx, "assignedProviderId", id::<ProviderId>),
            min_age: fields.optional(cx, "minAge", unsigned_lenient(0, MAX_AGE)),
            max_age: fields.optional(cx, "maxAge", unsigned_lenient(0, MAX_AGE)),
            created_after: fields.optional(cx, "createdAfter", datetime),
            created_before: fields.optional(cx, "createdBefore", datetime),
            updated_after: fields.optional(cx, "updatedAfter", datetime),
            updated_before: fields.optional(cx, "updatedBefore", datetime),
            page: fields.optional(cx, "page", unsigned_lenient(1, u32::MAX as u64)),
            page_size: fields.optional(cx, "pageSize", unsigned_lenient(1, MAX_PAGE_SIZE)),
            sort_by: fields.optional(cx, "sortBy", enum_value::<SortField>),
            sort_order: fields.optional(cx, "sortOrder", enum_value::<SortOrder>),
            include_deleted: fields.optional(cx, "includeDeleted", boolean_lenient),
            include_inactive: fields.optional(cx, "includeInactive", boolean_lenient),
            include_all_clinics: fields.optional(cx, "includeAllClinics", boolean_lenient),
        }
    }

    fn build(raw: QueryPatientsRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        let mut status = raw.status.unwrap_or_default();
        dedupe(&mut status);
        let mut tags = raw.tags.unwrap_or_default();
        dedupe(&mut tags);

        Some(Self {
            organization_id: raw.organization_id?,
            clinic_id: raw.clinic_id,
            search: raw.search,
            status,
            tags,
            match_all_tags: raw.match_all_tags.unwrap_or(false),
            gender: raw.gender,
            assigned_provider_id: raw.assigned_provider_id,
            min_age: raw.min_age,
            max_age: raw.max_age,
            created_after: raw.created_after,
            created_before: raw.created_before,
            updated_after: raw.updated_after,
            updated_before: raw.updated_before,
            page: raw.page.unwrap_or(1),
            page_size: raw.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort_by: raw.sort_by.unwrap_or_default(),
            sort_order: raw.sort_order.unwrap_or_default(),
            include_deleted: raw.include_deleted.unwrap_or(false),
            include_inactive: raw.include_inactive.unwrap_or(false),
            include_all_clinics: raw.include_all_clinics.unwrap_or(false),
        })
    }
}
