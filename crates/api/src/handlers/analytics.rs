//! Handlers for trend analytics over numeric series.
//!
//! Series elements may be bare numbers or `{ "value": n }` objects.

use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use taskdeck_core::analytics::{moving_average, trend_line, trend_line_coordinates, SeriesPoint};

use crate::error::AppResult;
use crate::response::DataResponse;

/// Request body for [`moving_average_handler`].
#[derive(Debug, Deserialize)]
pub struct MovingAverageRequest {
    pub series: Vec<SeriesPoint>,
    pub window: usize,
}

/// Request body carrying just a series.
#[derive(Debug, Deserialize)]
pub struct SeriesRequest {
    pub series: Vec<SeriesPoint>,
}

/// POST /api/v1/analytics/moving-average
///
/// Returns one entry per input point; entries before the first full window
/// are `null`.
pub async fn moving_average_handler(
    payload: Result<Json<MovingAverageRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let averages = moving_average(&input.series, input.window)?;
    Ok(Json(DataResponse { data: averages }))
}

/// POST /api/v1/analytics/trend
pub async fn trend(
    payload: Result<Json<SeriesRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    Ok(Json(DataResponse {
        data: trend_line(&input.series),
    }))
}

/// POST /api/v1/analytics/trend-line
///
/// Fitted `{x, y}` coordinates, one per input point.
pub async fn trend_line_points(
    payload: Result<Json<SeriesRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    Ok(Json(DataResponse {
        data: trend_line_coordinates(&input.series),
    }))
}
