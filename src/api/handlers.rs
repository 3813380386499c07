use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};
use axum::extract::multipart::Multipart;
use futures::stream::{self, StreamExt};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::FlightHeightResult;
use crate::elevation::ConnectivityReport;
use crate::error::Error;
use crate::gsd::{GsdPreset, PRESETS};
use crate::report::{self, ResultView};
use crate::session::{Accepted, AnalysisOutcome, Recalculation, Ticket};
use crate::worker;
use super::models::*;
use super::AppState;

/// Number of batch rows analyzed concurrently
const BATCH_CONCURRENCY: usize = 4;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

impl From<Error> for (StatusCode, Json<ErrorResponse>) {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::InvalidTransition(_) => StatusCode::CONFLICT,
            Error::MissingAltitude(_) | Error::MissingCoordinates(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::AllSourcesFailed(_) => StatusCode::BAD_GATEWAY,
            Error::UnknownPreset(_) => StatusCode::NOT_FOUND,
            e if e.is_user_input() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, e.to_string())
    }
}

pub async fn list_presets() -> Json<Vec<GsdPreset>> {
    Json(PRESETS.to_vec())
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ConnectivityReport> {
    Json(state.analyzer.aggregator().check_connectivity().await)
}

pub async fn select_image(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ResultView>, ApiError> {
    let record = req.into_record()?;
    let ticket = state
        .sessions
        .entry(session_id.clone())
        .or_default()
        .select_image(record.image_id());

    let result = state.analyzer.analyze(&record).await;
    settle(&state, &session_id, AnalysisOutcome { ticket, result })
}

pub async fn recalculate(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<RecalculateRequest>,
) -> Result<Json<ResultView>, ApiError> {
    let recalculation = req.into_recalculation()?;
    run_recalculation(&state, &session_id, recalculation).await
}

pub async fn override_height(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<ResultView>, ApiError> {
    let height_m = match req.manual_height {
        ManualHeight::Number(value) => value,
        ManualHeight::Text(text) => state.analyzer.policy().parse_manual(&text)?,
    };
    run_recalculation(&state, &session_id, Recalculation::Manual { height_m }).await
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Unknown session '{}'", session_id)))?;

    Ok(Json(SessionResponse {
        session_id: session_id.clone(),
        image_id: session.current_image().map(|id| id.to_string()),
        state: session.state().map(|s| s.to_string()),
        result: session.result().map(ResultView::from),
    }))
}

pub async fn upload_batch(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let start = Instant::now();

    let mut csv_data: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("csv") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Failed to read CSV: {}", e)))?;
            csv_data = Some(bytes.to_vec());
        }
    }
    let csv_data = csv_data.ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Missing CSV file"))?;

    let (records, skipped) = report::read_batch_csv(Cursor::new(csv_data))?;
    let total = records.len() + skipped.len();

    let analyzer = &state.analyzer;
    let pending: Vec<_> = records
        .iter()
        .map(|record| async move { (record, analyzer.analyze(record).await) })
        .collect();
    let outcomes: Vec<_> = stream::iter(pending)
        .buffered(BATCH_CONCURRENCY)
        .collect()
        .await;

    let mut results: Vec<FlightHeightResult> = Vec::with_capacity(outcomes.len());
    let mut rejected: Vec<String> = Vec::new();
    for (record, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => rejected.push(format!("{}: {}", record.filename, e)),
        }
    }

    let failed = results.iter().filter(|r| r.effective_height_m().is_none()).count();
    let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(total, analyzed = results.len(), failed, execution_time_ms, "batch finished");

    let mut output = String::with_capacity(results.len() * 120 + 256);
    output.push_str("# Statistics\n");
    output.push_str(&format!("# Total images: {}\n", total));
    output.push_str(&format!("# Analyzed: {}\n", results.len() - failed));
    output.push_str(&format!("# Elevation unavailable: {}\n", failed));
    output.push_str(&format!("# Skipped: {}\n", skipped.len() + rejected.len()));
    for row in &skipped {
        output.push_str(&format!("# Row {}: {}\n", row.row, row.reason));
    }
    for reason in &rejected {
        output.push_str(&format!("# {}\n", reason));
    }
    output.push_str(&format!("# Execution time: {:.2} ms\n", execution_time_ms));

    let mut body = output.into_bytes();
    report::write_csv(&mut body, &results)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"flight_heights.csv\""),
        ],
        body,
    )
        .into_response())
}

async fn run_recalculation(
    state: &AppState,
    session_id: &str,
    recalculation: Recalculation,
) -> Result<Json<ResultView>, ApiError> {
    let (ticket, event) = state
        .sessions
        .get(session_id)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Unknown session '{}'", session_id)))?
        .recalculate(recalculation)?;

    let result = worker::process(&state.analyzer, event).await;
    settle(state, session_id, AnalysisOutcome { ticket, result })
}

/// Hands an outcome to the session and renders what it now holds
fn settle(state: &AppState, session_id: &str, outcome: AnalysisOutcome) -> Result<Json<ResultView>, ApiError> {
    let ticket: Ticket = outcome.ticket.clone();
    let mut session = state
        .sessions
        .get_mut(session_id)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Unknown session '{}'", session_id)))?;

    match session.accept(outcome) {
        Accepted::Current => session
            .result()
            .map(|r| Json(ResultView::from(r)))
            .ok_or_else(|| error_response(StatusCode::INTERNAL_SERVER_ERROR, "Result missing after accept")),
        Accepted::Stale => Err(error_response(
            StatusCode::CONFLICT,
            format!("Result for '{}' superseded by a newer selection or result", ticket.image_id),
        )),
        Accepted::Rejected(e) => Err(e.into()),
    }
}
