//! Filter layer: turns UI filter state into a predicate over reports.
//!
//! Raw query parameters arrive as a [`FilterQuery`] of optional strings and are
//! parsed into a [`ReportFilter`]. Under [`FilterMode::Lenient`] an
//! unrecognized value simply disables that part of the filter; under
//! [`FilterMode::Strict`] it is rejected with a [`FilterError`].
//!
//! Filtering preserves the input order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FilterError;
use crate::model::{NoiseCategory, NoiseReport, ReportStatus};

/// Number of time buckets charted when no window is selected.
const DEFAULT_BUCKET_COUNT: usize = 30;

/// The time window a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Reports less than 7 full days old.
    Week,
    /// Reports less than 30 full days old.
    Month,
    /// No time restriction.
    #[default]
    All,
}

impl TimeRange {
    /// Match a time range name, ignoring case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "week" | "7d" | "7days" => Some(TimeRange::Week),
            "month" | "30d" | "30days" => Some(TimeRange::Month),
            "all" => Some(TimeRange::All),
            _ => None,
        }
    }

    /// Length of the window in days, `None` for [`TimeRange::All`].
    pub fn window_days(&self) -> Option<i64> {
        match self {
            TimeRange::Week => Some(7),
            TimeRange::Month => Some(30),
            TimeRange::All => None,
        }
    }

    /// Number of daily buckets in the trend chart for this range.
    pub fn bucket_count(&self) -> usize {
        match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::All => DEFAULT_BUCKET_COUNT,
        }
    }

    /// Whether a report of the given age (whole elapsed days) is inside the window.
    ///
    /// The boundary is exclusive: a report exactly 7 full days old is outside
    /// the week.
    pub fn contains_age(&self, age_days: i64) -> bool {
        match self.window_days() {
            Some(days) => age_days < days,
            None => true,
        }
    }
}

/// How unrecognized filter values are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Unrecognized values are ignored (treated as "no filter").
    #[default]
    Lenient,
    /// Unrecognized values are rejected.
    Strict,
}

impl FilterMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            FilterMode::Strict
        } else {
            FilterMode::Lenient
        }
    }
}

/// Filter state exactly as the client sent it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default, alias = "timeRange")]
    pub time_range: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, alias = "noiseType")]
    pub category: Option<String>,

    #[serde(default, alias = "minDb")]
    pub min_db: Option<String>,

    #[serde(default, alias = "maxDb")]
    pub max_db: Option<String>,
}

/// An inclusive decibel interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecibelRange {
    pub min: f64,
    pub max: f64,
}

impl DecibelRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, level: f64) -> bool {
        self.min <= level && level <= self.max
    }
}

/// A validated filter over reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub time_range: TimeRange,
    pub status: Option<ReportStatus>,
    pub category: Option<NoiseCategory>,
    pub decibel_range: Option<DecibelRange>,
}

impl ReportFilter {
    /// A filter that only restricts the time window.
    pub fn for_range(time_range: TimeRange) -> Self {
        Self {
            time_range,
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category: NoiseCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_decibel_range(mut self, min: f64, max: f64) -> Self {
        self.decibel_range = Some(DecibelRange::new(min, max));
        self
    }

    /// Parse raw query parameters.
    ///
    /// Empty strings and `all` mean "no filter" in both modes. A single
    /// decibel bound leaves the other side open.
    pub fn from_query(query: &FilterQuery, mode: FilterMode) -> Result<Self, FilterError> {
        let time_range = match present(&query.time_range) {
            None => TimeRange::All,
            Some(raw) => match TimeRange::parse(raw) {
                Some(range) => range,
                None => reject(mode, FilterError::InvalidTimeRange(raw.to_string()))?
                    .unwrap_or_default(),
            },
        };

        let status = match present(&query.status) {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("all") => None,
            Some(raw) => match ReportStatus::parse(raw) {
                Some(status) => Some(status),
                None => reject(mode, FilterError::InvalidStatus(raw.to_string()))?,
            },
        };

        let category = match present(&query.category) {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("all") => None,
            Some(raw) => match NoiseCategory::parse(raw) {
                Some(category) => Some(category),
                None => reject(mode, FilterError::InvalidCategory(raw.to_string()))?,
            },
        };

        let min = parse_bound(&query.min_db, mode)?;
        let max = parse_bound(&query.max_db, mode)?;

        let decibel_range = match (min, max) {
            (None, None) => None,
            (min, max) => {
                let min = min.unwrap_or(f64::NEG_INFINITY);
                let max = max.unwrap_or(f64::INFINITY);
                if min > max {
                    reject(mode, FilterError::InvertedDecibelRange { min, max })?
                } else {
                    Some(DecibelRange::new(min, max))
                }
            }
        };

        Ok(Self {
            time_range,
            status,
            category,
            decibel_range,
        })
    }

    /// Whether `report` passes every part of this filter.
    pub fn matches(&self, report: &NoiseReport, now: DateTime<Utc>) -> bool {
        if !self.time_range.contains_age(report.age_days(now)) {
            return false;
        }

        if let Some(status) = self.status {
            if report.status != status {
                return false;
            }
        }

        if let Some(category) = self.category {
            if report.category != category {
                return false;
            }
        }

        if let Some(range) = self.decibel_range {
            if !range.contains(report.decibel_level) {
                return false;
            }
        }

        true
    }

    /// This filter as a standalone predicate evaluated against `now`.
    pub fn predicate(&self, now: DateTime<Utc>) -> impl Fn(&NoiseReport) -> bool + '_ {
        move |report| self.matches(report, now)
    }

    /// The reports that pass this filter, in their original order.
    pub fn apply(&self, reports: &[NoiseReport], now: DateTime<Utc>) -> Vec<NoiseReport> {
        reports
            .iter()
            .filter(|report| self.matches(report, now))
            .cloned()
            .collect()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Strict mode turns the error into a failure; lenient mode drops the value.
fn reject<T>(mode: FilterMode, err: FilterError) -> Result<Option<T>, FilterError> {
    match mode {
        FilterMode::Strict => Err(err),
        FilterMode::Lenient => {
            debug!(error = %err, "Ignoring unrecognized filter value");
            Ok(None)
        }
    }
}

fn parse_bound(value: &Option<String>, mode: FilterMode) -> Result<Option<f64>, FilterError> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };

    match raw.parse::<f64>() {
        Ok(level) if level.is_finite() => Ok(Some(level)),
        _ => reject(mode, FilterError::InvalidDecibel(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use chrono::Duration;

    fn report(decibel_level: f64, category: NoiseCategory, created_at: DateTime<Utc>) -> NoiseReport {
        NoiseReport {
            id: format!("{category}-{decibel_level}"),
            location: Location {
                lat: 19.07,
                lng: 72.87,
            },
            decibel_level,
            category,
            created_at,
            status: ReportStatus::Pending,
            notes: None,
            address: None,
            reported_by: None,
            flagged: false,
        }
    }

    fn query(pairs: &[(&str, &str)]) -> FilterQuery {
        let mut query = FilterQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "time_range" => query.time_range = value,
                "status" => query.status = value,
                "category" => query.category = value,
                "min_db" => query.min_db = value,
                "max_db" => query.max_db = value,
                other => panic!("unknown key {other}"),
            }
        }
        query
    }

    #[test]
    fn test_week_boundary_is_exclusive() {
        let now = Utc::now();
        let filter = ReportFilter::for_range(TimeRange::Week);

        let inside = report(60.0, NoiseCategory::Traffic, now - Duration::days(6) - Duration::hours(23));
        let boundary = report(60.0, NoiseCategory::Traffic, now - Duration::days(7));

        assert!(filter.matches(&inside, now));
        assert!(!filter.matches(&boundary, now));
    }

    #[test]
    fn test_month_window() {
        let now = Utc::now();
        let filter = ReportFilter::for_range(TimeRange::Month);

        assert!(filter.matches(&report(60.0, NoiseCategory::Traffic, now - Duration::days(29)), now));
        assert!(!filter.matches(&report(60.0, NoiseCategory::Traffic, now - Duration::days(30)), now));
    }

    #[test]
    fn test_all_keeps_everything() {
        let now = Utc::now();
        let filter = ReportFilter::default();

        assert!(filter.matches(&report(60.0, NoiseCategory::Traffic, now - Duration::days(400)), now));
    }

    #[test]
    fn test_decibel_range_is_inclusive() {
        let now = Utc::now();
        let filter = ReportFilter::default().with_decibel_range(60.0, 100.0);

        assert!(filter.matches(&report(60.0, NoiseCategory::Traffic, now), now));
        assert!(filter.matches(&report(100.0, NoiseCategory::Traffic, now), now));
        assert!(!filter.matches(&report(50.0, NoiseCategory::Traffic, now), now));
        assert!(!filter.matches(&report(100.5, NoiseCategory::Traffic, now), now));
    }

    #[test]
    fn test_status_and_category() {
        let now = Utc::now();
        let mut resolved = report(70.0, NoiseCategory::Construction, now);
        resolved.status = ReportStatus::Resolved;

        let filter = ReportFilter::default()
            .with_status(ReportStatus::Resolved)
            .with_category(NoiseCategory::Construction);

        assert!(filter.matches(&resolved, now));
        assert!(!filter.matches(&report(70.0, NoiseCategory::Construction, now), now));

        resolved.category = NoiseCategory::Traffic;
        assert!(!filter.matches(&resolved, now));
    }

    #[test]
    fn test_apply_preserves_order() {
        let now = Utc::now();
        let reports = vec![
            report(90.0, NoiseCategory::Traffic, now - Duration::hours(1)),
            report(40.0, NoiseCategory::Other, now - Duration::hours(2)),
            report(75.0, NoiseCategory::Event, now - Duration::hours(3)),
        ];

        let filtered = ReportFilter::default()
            .with_decibel_range(70.0, 200.0)
            .apply(&reports, now);

        let levels: Vec<f64> = filtered.iter().map(|r| r.decibel_level).collect();
        assert_eq!(levels, vec![90.0, 75.0]);
    }

    #[test]
    fn test_predicate_matches_apply() {
        let now = Utc::now();
        let reports = vec![
            report(90.0, NoiseCategory::Traffic, now),
            report(40.0, NoiseCategory::Other, now - Duration::days(10)),
        ];
        let filter = ReportFilter::for_range(TimeRange::Week);
        let predicate = filter.predicate(now);

        let count = reports.iter().filter(|r| predicate(r)).count();
        assert_eq!(count, filter.apply(&reports, now).len());
    }

    #[test]
    fn test_from_query_parses_everything() {
        let filter = ReportFilter::from_query(
            &query(&[
                ("time_range", "Week"),
                ("status", "investigating"),
                ("category", "TRAFFIC"),
                ("min_db", "60"),
                ("max_db", "100"),
            ]),
            FilterMode::Strict,
        )
        .unwrap();

        assert_eq!(filter.time_range, TimeRange::Week);
        assert_eq!(filter.status, Some(ReportStatus::Reviewed));
        assert_eq!(filter.category, Some(NoiseCategory::Traffic));
        assert_eq!(filter.decibel_range, Some(DecibelRange::new(60.0, 100.0)));
    }

    #[test]
    fn test_from_query_all_means_no_filter() {
        let filter = ReportFilter::from_query(
            &query(&[("time_range", "all"), ("status", "all"), ("category", "ALL")]),
            FilterMode::Strict,
        )
        .unwrap();

        assert_eq!(filter, ReportFilter::default());
    }

    #[test]
    fn test_lenient_ignores_unknown_values() {
        let filter = ReportFilter::from_query(
            &query(&[
                ("time_range", "fortnight"),
                ("status", "archived"),
                ("category", "jackhammer"),
                ("min_db", "loud"),
            ]),
            FilterMode::Lenient,
        )
        .unwrap();

        assert_eq!(filter, ReportFilter::default());
    }

    #[test]
    fn test_strict_rejects_unknown_values() {
        let err = ReportFilter::from_query(&query(&[("time_range", "fortnight")]), FilterMode::Strict)
            .unwrap_err();
        assert_eq!(err, FilterError::InvalidTimeRange("fortnight".to_string()));

        let err = ReportFilter::from_query(&query(&[("status", "archived")]), FilterMode::Strict)
            .unwrap_err();
        assert_eq!(err, FilterError::InvalidStatus("archived".to_string()));

        let err = ReportFilter::from_query(&query(&[("category", "jackhammer")]), FilterMode::Strict)
            .unwrap_err();
        assert_eq!(err, FilterError::InvalidCategory("jackhammer".to_string()));

        let err = ReportFilter::from_query(&query(&[("max_db", "NaN")]), FilterMode::Strict)
            .unwrap_err();
        assert_eq!(err, FilterError::InvalidDecibel("NaN".to_string()));
    }

    #[test]
    fn test_inverted_range() {
        let inverted = query(&[("min_db", "100"), ("max_db", "60")]);

        let lenient = ReportFilter::from_query(&inverted, FilterMode::Lenient).unwrap();
        assert!(lenient.decibel_range.is_none());

        let err = ReportFilter::from_query(&inverted, FilterMode::Strict).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvertedDecibelRange {
                min: 100.0,
                max: 60.0
            }
        );
    }

    #[test]
    fn test_single_bound_is_open_ended() {
        let now = Utc::now();
        let filter =
            ReportFilter::from_query(&query(&[("min_db", "80")]), FilterMode::Strict).unwrap();

        assert!(filter.matches(&report(140.0, NoiseCategory::Traffic, now), now));
        assert!(!filter.matches(&report(79.9, NoiseCategory::Traffic, now), now));
    }
}
