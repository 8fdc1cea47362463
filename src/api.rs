//! HTTP API handlers for Noisemap.
//!
//! Handlers are thin: they parse the request, call the store and the
//! aggregation pipeline, and shape the result. Reporter-supplied free text
//! (`notes`, `reported_by`, `address`) is never logged.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::aggregation::{category_distribution, compute_analytics, heat_points};
use crate::error::ApiError;
use crate::filter::{FilterMode, FilterQuery, ReportFilter};
use crate::model::{
    Analytics, CategoryCount, FlagUpdate, NewReport, NoiseReport, SampleRequest, SampleResponse,
    StatusUpdate,
};
use crate::sample::generate_sample_reports;
use crate::storage::{ReportStore, Storage};

/// Upper bound on reports generated by a single `POST /reports/sample`.
pub const MAX_SAMPLE_REPORTS: usize = 5_000;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub filter_mode: FilterMode,
}

/// Build the full router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/reports", post(create_report).get(list_reports))
        .route("/reports/sample", post(seed_sample_reports))
        .route("/reports/:id", get(get_report).delete(delete_report))
        .route("/reports/:id/status", patch(update_report_status))
        .route("/reports/:id/flag", patch(flag_report))
        .route("/analytics", get(get_analytics))
        .route("/analytics/heatmap", get(get_heatmap))
        .route("/analytics/categories", get(get_categories))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fetch every report and keep those passing the query's filter.
async fn filtered_reports(
    state: &AppState,
    query: &FilterQuery,
) -> Result<Vec<NoiseReport>, ApiError> {
    let filter = ReportFilter::from_query(query, state.filter_mode)?;
    let reports = state.storage.list().await?;
    Ok(filter.apply(&reports, Utc::now()))
}

/// POST /reports - Submit a noise report.
///
/// # Request Body
///
/// ```json
/// {
///     "location": {"lat": 18.5308, "lng": 73.8475},
///     "decibel_level": 82.5,
///     "category": "traffic",
///     "notes": "Honking all night"
/// }
/// ```
///
/// The id, timestamp and `pending` status are assigned here.
///
/// # Response
///
/// Returns `201 Created` with the stored report.
#[instrument(skip(state, submission))]
pub async fn create_report(
    State(state): State<AppState>,
    Json(submission): Json<NewReport>,
) -> Result<(StatusCode, Json<NoiseReport>), ApiError> {
    let report = state.storage.create(submission, Utc::now()).await?;

    info!(
        id = %report.id,
        category = %report.category,
        decibel_level = report.decibel_level,
        "Noise report recorded"
    );

    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /reports - List reports matching the filter query.
///
/// # Query Parameters
///
/// - `time_range`: `week`, `month` or `all`
/// - `status`: `pending`, `reviewed`, `resolved` or `all`
/// - `category`: a category name
/// - `min_db`, `max_db`: inclusive decibel bounds
#[instrument(skip(state))]
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<NoiseReport>>, ApiError> {
    let reports = filtered_reports(&state, &query).await?;
    info!(count = reports.len(), "Reports listed");
    Ok(Json(reports))
}

/// GET /reports/:id
#[instrument(skip(state))]
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoiseReport>, ApiError> {
    Ok(Json(state.storage.get(&id).await?))
}

/// PATCH /reports/:id/status - Set the review status.
///
/// Any status may be set from any other.
#[instrument(skip(state))]
pub async fn update_report_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<NoiseReport>, ApiError> {
    let report = state.storage.update_status(&id, update.status).await?;
    info!(id = %report.id, status = %report.status, "Report status updated");
    Ok(Json(report))
}

/// PATCH /reports/:id/flag - Flag or unflag a report.
#[instrument(skip(state))]
pub async fn flag_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<FlagUpdate>,
) -> Result<Json<NoiseReport>, ApiError> {
    let report = state.storage.set_flagged(&id, update.flagged).await?;
    info!(id = %report.id, flagged = report.flagged, "Report flag updated");
    Ok(Json(report))
}

/// DELETE /reports/:id
///
/// Returns `204 No Content`, or `404` if the report does not exist.
#[instrument(skip(state))]
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete(&id).await?;
    info!(id = %id, "Report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /reports/sample - Generate and store synthetic reports.
#[instrument(skip(state))]
pub async fn seed_sample_reports(
    State(state): State<AppState>,
    Json(request): Json<SampleRequest>,
) -> Result<(StatusCode, Json<SampleResponse>), ApiError> {
    if request.count > MAX_SAMPLE_REPORTS {
        return Err(ApiError::BadRequest(format!(
            "count {} exceeds the limit of {MAX_SAMPLE_REPORTS}",
            request.count
        )));
    }

    let inserted = seed_reports(&state.storage, request.count).await?;
    Ok((StatusCode::CREATED, Json(SampleResponse { inserted })))
}

/// Generate `count` synthetic reports and store them as one batch.
///
/// On error nothing from the batch is stored.
pub async fn seed_reports<S: ReportStore>(store: &S, count: usize) -> Result<usize, ApiError> {
    let reports = generate_sample_reports(count, Utc::now());
    store.insert_batch(reports).await?;

    info!(count, "Sample reports generated");
    Ok(count)
}

/// GET /analytics - Summary, trend, distribution and heat points for the filter.
///
/// # Response
///
/// ```json
/// {
///     "generated_at": "2026-10-19T12:00:00Z",
///     "time_range": "week",
///     "summary": {"total_reports": 1, "average_decibel": 90.0, ...},
///     "time_series": [{"label": "Tue", "date": "2026-10-13", ...}, ...],
///     "categories": [{"category": "traffic", "count": 1}],
///     "heat_points": [{"lat": 18.5308, "lng": 73.8475, "intensity": 0.9}]
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Analytics>, ApiError> {
    let filter = ReportFilter::from_query(&query, state.filter_mode)?;
    let analytics = compute_analytics(&state.storage, &filter, Utc::now()).await?;

    info!(
        time_range = ?analytics.time_range,
        total = analytics.summary.total_reports,
        average = %analytics.summary.average_decibel,
        "Analytics queried"
    );

    Ok(Json(analytics))
}

/// GET /analytics/heatmap - Heat points as `[lat, lng, intensity]` tuples.
#[instrument(skip(state))]
pub async fn get_heatmap(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<[f64; 3]>>, ApiError> {
    let reports = filtered_reports(&state, &query).await?;
    let points = heat_points(&reports)
        .iter()
        .map(|point| point.as_tuple())
        .collect();
    Ok(Json(points))
}

/// GET /analytics/categories - Category distribution for the filter.
#[instrument(skip(state))]
pub async fn get_categories(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    let reports = filtered_reports(&state, &query).await?;
    Ok(Json(category_distribution(&reports)))
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
