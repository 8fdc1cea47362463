//! Synthetic noise reports for demos and for an empty store.
//!
//! 70% of reports land near one of ten hotspot areas and take one of that
//! area's characteristic categories; the rest are spread uniformly over the
//! city bounds with a uniformly random category. Levels come from a
//! per-category range, and timestamps fall in the trailing week 60% of the
//! time and the trailing month otherwise.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::model::{Location, NoiseCategory, NoiseReport, ReportStatus};

/// Probability that a report is placed near a hotspot.
const HOTSPOT_PROBABILITY: f64 = 0.7;

/// Probability that a report is dated within the last week.
const RECENT_WEEK_PROBABILITY: f64 = 0.6;

/// Maximum offset, in degrees, applied around a hotspot centre (about 1 km).
const JITTER_DEGREES: f64 = 0.01;

const SECONDS_PER_DAY: i64 = 86_400;

/// Marks generated reports so they can be told apart from real submissions.
pub const SAMPLE_REPORTER: &str = "sample-generator";

/// A named area where reports cluster.
#[derive(Debug, Clone, Copy)]
pub struct Hotspot {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub categories: &'static [NoiseCategory],
}

/// Rectangle that uniformly placed reports fall into.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

pub const CITY_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 18.43,
    max_lat: 18.65,
    min_lng: 73.73,
    max_lng: 73.98,
};

pub const HOTSPOTS: [Hotspot; 10] = [
    Hotspot {
        name: "Shivajinagar",
        lat: 18.5308,
        lng: 73.8475,
        categories: &[NoiseCategory::Traffic, NoiseCategory::Event],
    },
    Hotspot {
        name: "Kothrud",
        lat: 18.5074,
        lng: 73.8077,
        categories: &[NoiseCategory::Residential, NoiseCategory::Construction],
    },
    Hotspot {
        name: "Hinjewadi",
        lat: 18.5913,
        lng: 73.7389,
        categories: &[NoiseCategory::Construction, NoiseCategory::Industrial],
    },
    Hotspot {
        name: "Hadapsar",
        lat: 18.5089,
        lng: 73.9260,
        categories: &[NoiseCategory::Industrial, NoiseCategory::Traffic],
    },
    Hotspot {
        name: "Viman Nagar",
        lat: 18.5679,
        lng: 73.9143,
        categories: &[NoiseCategory::Traffic, NoiseCategory::Event],
    },
    Hotspot {
        name: "Swargate",
        lat: 18.5018,
        lng: 73.8636,
        categories: &[NoiseCategory::Traffic, NoiseCategory::Festival],
    },
    Hotspot {
        name: "Koregaon Park",
        lat: 18.5362,
        lng: 73.8940,
        categories: &[NoiseCategory::Event, NoiseCategory::Residential],
    },
    Hotspot {
        name: "Pimpri",
        lat: 18.6298,
        lng: 73.7997,
        categories: &[NoiseCategory::Industrial, NoiseCategory::Construction],
    },
    Hotspot {
        name: "Kasba Peth",
        lat: 18.5196,
        lng: 73.8553,
        categories: &[NoiseCategory::Festival, NoiseCategory::Residential],
    },
    Hotspot {
        name: "Wakad",
        lat: 18.5987,
        lng: 73.7688,
        categories: &[NoiseCategory::Construction, NoiseCategory::Residential],
    },
];

/// Typical decibel range `(low, high)` for a category.
pub fn decibel_range(category: NoiseCategory) -> (f64, f64) {
    match category {
        NoiseCategory::Traffic => (65.0, 85.0),
        NoiseCategory::Construction => (70.0, 95.0),
        NoiseCategory::Industrial => (70.0, 90.0),
        NoiseCategory::Event => (75.0, 100.0),
        NoiseCategory::Festival => (80.0, 105.0),
        NoiseCategory::Residential => (50.0, 75.0),
        NoiseCategory::Other => (45.0, 80.0),
    }
}

/// Generate one report relative to `now`.
pub fn generate_report<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> NoiseReport {
    let (location, category, address) = if rng.random_bool(HOTSPOT_PROBABILITY) {
        let hotspot = &HOTSPOTS[rng.random_range(0..HOTSPOTS.len())];
        let location = Location {
            lat: hotspot.lat + rng.random_range(-JITTER_DEGREES..=JITTER_DEGREES),
            lng: hotspot.lng + rng.random_range(-JITTER_DEGREES..=JITTER_DEGREES),
        };
        let category = hotspot.categories[rng.random_range(0..hotspot.categories.len())];
        (location, category, Some(format!("Near {}", hotspot.name)))
    } else {
        let location = Location {
            lat: rng.random_range(CITY_BOUNDS.min_lat..=CITY_BOUNDS.max_lat),
            lng: rng.random_range(CITY_BOUNDS.min_lng..=CITY_BOUNDS.max_lng),
        };
        let category = NoiseCategory::ALL[rng.random_range(0..NoiseCategory::ALL.len())];
        (location, category, None)
    };

    let (low, high) = decibel_range(category);
    let decibel_level = (rng.random_range(low..=high) * 10.0).round() / 10.0;

    let window_days = if rng.random_bool(RECENT_WEEK_PROBABILITY) {
        7
    } else {
        30
    };
    let created_at = now - Duration::seconds(rng.random_range(0..window_days * SECONDS_PER_DAY));

    let status = match rng.random_range(0..10) {
        0..=6 => ReportStatus::Pending,
        7 | 8 => ReportStatus::Reviewed,
        _ => ReportStatus::Resolved,
    };

    NoiseReport {
        id: uuid::Builder::from_random_bytes(rng.random()).into_uuid().to_string(),
        location,
        decibel_level,
        category,
        created_at,
        status,
        notes: None,
        address,
        reported_by: Some(SAMPLE_REPORTER.to_string()),
        flagged: false,
    }
}

/// Generate `count` reports relative to `now`.
pub fn generate_reports<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<NoiseReport> {
    (0..count).map(|_| generate_report(rng, now)).collect()
}

/// Generate `count` reports from the thread-local RNG.
pub fn generate_sample_reports(count: usize, now: DateTime<Utc>) -> Vec<NoiseReport> {
    generate_reports(&mut rand::rng(), count, now)
}
