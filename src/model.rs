//! Data models for Noisemap.
//!
//! A [`NoiseReport`] is a single crowdsourced measurement. Category and status
//! are closed enums: free text from submissions is normalized once, at the
//! boundary, and every comparison downstream works on the enum.
//!
//! The aggregate types at the bottom of this module ([`TimeSeriesPoint`],
//! [`CategoryCount`], [`HeatPoint`], [`SummaryStats`], [`Analytics`]) are
//! derived on every query and never persisted.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::TimeRange;

/// The kind of noise being reported.
///
/// Deserializing from any string never fails: recognized names and aliases are
/// matched case-insensitively and anything else becomes [`NoiseCategory::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NoiseCategory {
    /// Vehicles, horns, traffic jams.
    Traffic,
    /// Building sites, demolition, road works.
    Construction,
    /// Factories, generators, workshops.
    Industrial,
    /// Concerts, parties, amplified music.
    Event,
    /// Religious or seasonal festivals and processions.
    Festival,
    /// Neighbours, dogs, household noise.
    Residential,
    /// Anything else.
    Other,
}

impl NoiseCategory {
    /// Every category, in display order.
    pub const ALL: [NoiseCategory; 7] = [
        NoiseCategory::Traffic,
        NoiseCategory::Construction,
        NoiseCategory::Industrial,
        NoiseCategory::Event,
        NoiseCategory::Festival,
        NoiseCategory::Residential,
        NoiseCategory::Other,
    ];

    /// Match a category name or alias, ignoring case and surrounding whitespace.
    ///
    /// Returns `None` for unrecognized text. Use [`NoiseCategory::normalize`]
    /// when an unknown value should fall back to [`NoiseCategory::Other`].
    pub fn parse(raw: &str) -> Option<Self> {
        let category = match raw.trim().to_ascii_lowercase().as_str() {
            "traffic" | "vehicle" | "vehicles" | "honking" => NoiseCategory::Traffic,
            "construction" | "demolition" | "roadwork" | "roadworks" => {
                NoiseCategory::Construction
            }
            "industrial" | "industry" | "factory" => NoiseCategory::Industrial,
            "event" | "events" | "entertainment" | "event/entertainment" | "music" | "party" => {
                NoiseCategory::Event
            }
            "festival" | "festivals" | "religious" => NoiseCategory::Festival,
            "residential" | "neighbor" | "neighbour" | "neighborhood" | "neighbourhood" => {
                NoiseCategory::Residential
            }
            "other" => NoiseCategory::Other,
            _ => return None,
        };
        Some(category)
    }

    /// Normalize free text into a category, falling back to `Other`.
    pub fn normalize(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(NoiseCategory::Other)
    }

    /// Canonical lowercase identifier, as used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseCategory::Traffic => "traffic",
            NoiseCategory::Construction => "construction",
            NoiseCategory::Industrial => "industrial",
            NoiseCategory::Event => "event",
            NoiseCategory::Festival => "festival",
            NoiseCategory::Residential => "residential",
            NoiseCategory::Other => "other",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            NoiseCategory::Traffic => "Traffic",
            NoiseCategory::Construction => "Construction",
            NoiseCategory::Industrial => "Industrial",
            NoiseCategory::Event => "Event/Entertainment",
            NoiseCategory::Festival => "Festival",
            NoiseCategory::Residential => "Residential",
            NoiseCategory::Other => "Other",
        }
    }
}

impl From<String> for NoiseCategory {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl fmt::Display for NoiseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative review state of a report.
///
/// Transitions are unconstrained: any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Newly submitted, not yet looked at.
    #[default]
    Pending,
    /// Seen by an administrator and under investigation.
    #[serde(alias = "investigating")]
    Reviewed,
    /// Closed.
    Resolved,
}

impl ReportStatus {
    /// Match a status name, ignoring case. `investigating` is accepted for `reviewed`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ReportStatus::Pending),
            "reviewed" | "investigating" => Some(ReportStatus::Reviewed),
            "resolved" => Some(ReportStatus::Resolved),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A latitude/longitude pair in decimal degrees. Not bounds-checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: f64,
}

/// A single crowdsourced noise measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseReport {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,

    pub location: Location,

    /// Measured loudness in dB. No bounds are enforced.
    pub decibel_level: f64,

    pub category: NoiseCategory,

    /// Server-assigned creation time. Never changes; the only ordering and
    /// bucketing key.
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub status: ReportStatus,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub reported_by: Option<String>,

    #[serde(default)]
    pub flagged: bool,
}

impl NoiseReport {
    /// Build a stored report from a public submission.
    ///
    /// The id and timestamp come from the server; status starts as `pending`.
    pub fn from_submission(id: String, submission: NewReport, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            location: submission.location,
            decibel_level: submission.decibel_level,
            category: submission.category,
            created_at,
            status: ReportStatus::Pending,
            notes: submission.notes,
            address: submission.address,
            reported_by: submission.reported_by,
            flagged: false,
        }
    }

    /// Age in whole elapsed days relative to `now`.
    ///
    /// Negative for reports stamped in the future.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// Request body for `POST /reports`.
///
/// The legacy camelCase field names are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub location: Location,

    #[serde(alias = "decibelLevel", alias = "noiseLevel")]
    pub decibel_level: f64,

    #[serde(alias = "noiseType")]
    pub category: NoiseCategory,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default, alias = "reportedBy")]
    pub reported_by: Option<String>,
}

/// Request body for `PATCH /reports/:id/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: ReportStatus,
}

/// Request body for `PATCH /reports/:id/flag`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagUpdate {
    pub flagged: bool,
}

/// Request body for `POST /reports/sample`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleRequest {
    /// Number of synthetic reports to generate (default: 50).
    #[serde(default = "default_sample_count")]
    pub count: usize,
}

fn default_sample_count() -> usize {
    50
}

/// Response for `POST /reports/sample`.
#[derive(Debug, Clone, Serialize)]
pub struct SampleResponse {
    pub inserted: usize,
}

// ============================================================================
// Aggregates
// ============================================================================

/// One time bucket (a UTC calendar day) of a trend chart.
///
/// Empty buckets report zero for every level and `has_data: false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// Display label: weekday abbreviation for the week view, `Oct 19`-style
    /// dates otherwise.
    pub label: String,
    pub date: NaiveDate,
    pub average_level: f64,
    pub max_level: f64,
    pub min_level: f64,
    pub count: usize,
    pub dominant_category: Option<NoiseCategory>,
    pub has_data: bool,
}

/// Number of reports in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: NoiseCategory,
    pub count: usize,
}

/// A location and intensity in `[0, 1]` for heatmap rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}

impl HeatPoint {
    /// The `[lat, lng, intensity]` tuple shape heatmap layers consume.
    pub fn as_tuple(&self) -> [f64; 3] {
        [self.lat, self.lng, self.intensity]
    }
}

/// Report counts by review status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub reviewed: usize,
    pub resolved: usize,
}

/// Headline numbers for a set of reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_reports: usize,
    /// Mean decibel level, 0 when there are no reports.
    pub average_decibel: f64,
    /// Loudest level seen, 0 when there are no reports.
    pub peak_decibel: f64,
    /// Most frequent category; ties go to the one encountered first.
    pub most_common_category: Option<NoiseCategory>,
    pub flagged_count: usize,
    pub by_status: StatusCounts,
}

/// Everything the analytics views need for one filtered query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub generated_at: DateTime<Utc>,
    pub time_range: TimeRange,
    pub summary: SummaryStats,
    pub time_series: Vec<TimeSeriesPoint>,
    pub categories: Vec<CategoryCount>,
    pub heat_points: Vec<HeatPoint>,
}
