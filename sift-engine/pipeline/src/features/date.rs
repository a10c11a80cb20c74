use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use query_builder::{Aggregation, Clause, QueryBuilder, Request, ResultBucket, SearchResult};
use serde_json::Value;

use super::buckets::{parse_buckets, BucketKey};
use super::process_facet;
use crate::error::UnwrapError;
use crate::feature::{FacetFilter, Feature, Next};

static DATE_FORMAT: &str = "%Y-%m-%d";
static BUCKET_FORMAT: &str = "yyyy-MM-dd";

/// Filters a date field by the `<property>.min` / `<property>.max`
/// parameters and buckets the hits by calendar interval.
///
/// Bounds are RFC 3339 date times or plain `YYYY-MM-DD` dates, a plain
/// upper bound date includes that whole day down to the last millisecond.
#[derive(Debug, Clone)]
pub struct DateHistogramFilter {
    property: String,
    field: String,
    calendar_interval: String,
    post_filter: bool,
}

impl DateHistogramFilter {
    pub fn new(
        property: impl Into<String>,
        field: impl Into<String>,
        calendar_interval: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            field: field.into(),
            calendar_interval: calendar_interval.into(),
            post_filter: false,
        }
    }

    pub fn disjunctive(mut self, enabled: bool) -> Self {
        self.post_filter = enabled;
        self
    }
}

fn parse_date(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()?;
    let time: Option<NaiveDateTime> = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };

    time.map(|naive| Utc.from_utc_datetime(&naive))
}

fn render(dt: DateTime<Utc>) -> Value {
    Value::from(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl FacetFilter for DateHistogramFilter {
    fn property(&self) -> &str {
        &self.property
    }

    fn build_clause(&self, request: &Request) -> Option<Clause> {
        let param = request.get(&self.property)?;

        let min = param.min_raw().and_then(|raw| parse_date(raw, false));
        let max = param.max_raw().and_then(|raw| parse_date(raw, true));

        if min.is_none() && max.is_none() {
            return None;
        }

        Some(Clause::Range {
            field: self.field.clone(),
            gte: min.map(render),
            lte: max.map(render),
            format: Some("strict_date_optional_time".to_string()),
        })
    }

    fn build_aggregation(&self) -> Aggregation {
        Aggregation::date_histogram(
            &self.field,
            &self.calendar_interval,
            Some(BUCKET_FORMAT.to_string()),
        )
    }

    fn unwrap_result(&self, raw: &Value) -> Result<Vec<ResultBucket>, UnwrapError> {
        parse_buckets(raw, BucketKey::Formatted)
    }
}

impl Feature for DateHistogramFilter {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        process_facet(self, self.post_filter, query, next)
    }

    fn as_facet(&self) -> Option<&dyn FacetFilter> {
        Some(self)
    }
}
