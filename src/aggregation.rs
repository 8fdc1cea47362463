//! Aggregation pipeline: reduces a set of reports into chart-ready structures.
//!
//! Every function here except [`compute_analytics`] is pure: no I/O, no hidden
//! state, and the reference time is always passed in. Empty input yields
//! zeroed or empty structures, never an error.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::StoreError;
use crate::filter::{ReportFilter, TimeRange};
use crate::model::{
    Analytics, CategoryCount, HeatPoint, NoiseCategory, NoiseReport, ReportStatus, StatusCounts,
    SummaryStats, TimeSeriesPoint,
};
use crate::storage::ReportStore;

/// Decibel level that maps to full heat intensity.
const FULL_INTENSITY_DECIBELS: f64 = 100.0;

/// Category counts in first-encountered order.
#[derive(Debug, Default)]
struct CategoryTally {
    counts: Vec<(NoiseCategory, usize)>,
}

impl CategoryTally {
    fn record(&mut self, category: NoiseCategory) {
        match self.counts.iter_mut().find(|(c, _)| *c == category) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((category, 1)),
        }
    }

    /// The most frequent category. Ties go to the earliest seen.
    fn dominant(&self) -> Option<NoiseCategory> {
        let mut best: Option<(NoiseCategory, usize)> = None;
        for &(category, count) in &self.counts {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((category, count));
            }
        }
        best.map(|(category, _)| category)
    }

    fn into_counts(self) -> Vec<CategoryCount> {
        self.counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect()
    }
}

/// Running totals for one time bucket.
#[derive(Debug, Default)]
struct Bucket {
    sum: f64,
    count: usize,
    max: f64,
    min: f64,
    categories: CategoryTally,
}

impl Bucket {
    fn add(&mut self, report: &NoiseReport) {
        let level = report.decibel_level;
        if self.count == 0 {
            self.max = level;
            self.min = level;
        } else {
            self.max = self.max.max(level);
            self.min = self.min.min(level);
        }
        self.sum += level;
        self.count += 1;
        self.categories.record(report.category);
    }

    fn into_point(self, label: String, date: NaiveDate) -> TimeSeriesPoint {
        let average_level = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };

        TimeSeriesPoint {
            label,
            date,
            average_level,
            max_level: self.max,
            min_level: self.min,
            count: self.count,
            dominant_category: self.categories.dominant(),
            has_data: self.count > 0,
        }
    }
}

fn bucket_label(range: TimeRange, date: NaiveDate) -> String {
    match range {
        TimeRange::Week => date.format("%a").to_string(),
        TimeRange::Month | TimeRange::All => date.format("%b %d").to_string(),
    }
}

/// Bucket reports by age in whole elapsed days over the trailing window of `range`.
///
/// Always returns exactly `range.bucket_count()` points, oldest first, the
/// last one holding reports less than a day old. A report `n` days old lands
/// in bucket `last - n`, labelled with the UTC date `n` days before `now`, so
/// the series agrees with the time-range filter. Reports older than the window
/// or stamped in the future are left out of the series.
pub fn time_series(
    reports: &[NoiseReport],
    range: TimeRange,
    now: DateTime<Utc>,
) -> Vec<TimeSeriesPoint> {
    let bucket_count = range.bucket_count();
    let last_index = bucket_count - 1;
    let today = now.date_naive();

    let mut buckets: Vec<Bucket> = (0..bucket_count).map(|_| Bucket::default()).collect();

    for report in reports {
        let Ok(age) = usize::try_from(report.age_days(now)) else {
            continue;
        };
        if age > last_index {
            continue;
        }

        buckets[last_index - age].add(report);
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(index, bucket)| {
            let days_back = (last_index - index) as i64;
            let date = today - Duration::days(days_back);
            bucket.into_point(bucket_label(range, date), date)
        })
        .collect()
}

/// Count reports per category, in the order categories are first seen.
///
/// The counts always sum to `reports.len()`.
pub fn category_distribution(reports: &[NoiseReport]) -> Vec<CategoryCount> {
    let mut tally = CategoryTally::default();
    for report in reports {
        tally.record(report.category);
    }
    tally.into_counts()
}

/// Heat intensity for a decibel level: `level / 100`, clamped to `[0, 1]`.
pub fn heat_intensity(decibel_level: f64) -> f64 {
    (decibel_level / FULL_INTENSITY_DECIBELS).clamp(0.0, 1.0)
}

/// One heat point per report. No clustering or deduplication.
pub fn heat_points(reports: &[NoiseReport]) -> Vec<HeatPoint> {
    reports
        .iter()
        .map(|report| HeatPoint {
            lat: report.location.lat,
            lng: report.location.lng,
            intensity: heat_intensity(report.decibel_level),
        })
        .collect()
}

/// Totals, mean and mode for a set of reports.
pub fn summary_stats(reports: &[NoiseReport]) -> SummaryStats {
    let mut tally = CategoryTally::default();
    let mut by_status = StatusCounts::default();
    let mut sum = 0.0;
    let mut peak: Option<f64> = None;
    let mut flagged_count = 0;

    for report in reports {
        sum += report.decibel_level;
        peak = Some(peak.map_or(report.decibel_level, |p| p.max(report.decibel_level)));
        tally.record(report.category);

        if report.flagged {
            flagged_count += 1;
        }

        match report.status {
            ReportStatus::Pending => by_status.pending += 1,
            ReportStatus::Reviewed => by_status.reviewed += 1,
            ReportStatus::Resolved => by_status.resolved += 1,
        }
    }

    let average_decibel = if reports.is_empty() {
        0.0
    } else {
        sum / reports.len() as f64
    };

    SummaryStats {
        total_reports: reports.len(),
        average_decibel,
        peak_decibel: peak.unwrap_or(0.0),
        most_common_category: tally.dominant(),
        flagged_count,
        by_status,
    }
}

/// Filter `reports` and compute every aggregate over the result.
pub fn aggregate(reports: &[NoiseReport], filter: &ReportFilter, now: DateTime<Utc>) -> Analytics {
    let filtered = filter.apply(reports, now);

    Analytics {
        generated_at: now,
        time_range: filter.time_range,
        summary: summary_stats(&filtered),
        time_series: time_series(&filtered, filter.time_range, now),
        categories: category_distribution(&filtered),
        heat_points: heat_points(&filtered),
    }
}

/// Fetch every report from `store`, then filter and aggregate.
///
/// The fetch is the only suspending step.
pub async fn compute_analytics<S: ReportStore>(
    store: &S,
    filter: &ReportFilter,
    now: DateTime<Utc>,
) -> Result<Analytics, StoreError> {
    let reports = store.list().await?;
    Ok(aggregate(&reports, filter, now))
}
