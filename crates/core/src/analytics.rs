//! Trend analytics for dashboard charts.
//!
//! Stateless numeric helpers over in-memory series: a trailing moving
//! average, an ordinary least-squares trend classification, and fitted
//! trend-line coordinates. Every function accepts raw numbers or
//! `{ "value": n }` wrappers through [`SeriesValue`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Absolute slope below which a trend is classified as stable.
pub const STABLE_SLOPE_THRESHOLD: f64 = 0.1;

// ---------------------------------------------------------------------------
// Series values
// ---------------------------------------------------------------------------

/// Extracts the numeric value of one series element.
pub trait SeriesValue {
    fn value(&self) -> f64;
}

impl SeriesValue for f64 {
    fn value(&self) -> f64 {
        *self
    }
}

impl SeriesValue for i64 {
    fn value(&self) -> f64 {
        *self as f64
    }
}

impl<T: SeriesValue + ?Sized> SeriesValue for &T {
    fn value(&self) -> f64 {
        (**self).value()
    }
}

/// A wrapped data point, `{ "value": n }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub value: f64,
}

impl SeriesValue for DataPoint {
    fn value(&self) -> f64 {
        self.value
    }
}

/// A series element as it arrives over the wire: a bare number or a
/// wrapped data point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesPoint {
    Raw(f64),
    Wrapped(DataPoint),
}

impl SeriesValue for SeriesPoint {
    fn value(&self) -> f64 {
        match self {
            Self::Raw(v) => *v,
            Self::Wrapped(point) => point.value,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Direction of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    /// Classify a (rounded) slope.
    pub fn from_slope(slope: f64) -> Self {
        if slope.abs() < STABLE_SLOPE_THRESHOLD {
            Self::Stable
        } else if slope > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Least-squares trend summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub slope: f64,
    pub percentage_change: f64,
}

impl TrendResult {
    /// The result for series too short to regress.
    pub const FLAT: TrendResult = TrendResult {
        direction: TrendDirection::Stable,
        slope: 0.0,
        percentage_change: 0.0,
    };
}

/// One point on a fitted trend line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub x: usize,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fit `y = slope * x + intercept` against `x = 0..n-1`.
///
/// Returns `None` for fewer than two points, where the closed-form
/// denominator is zero.
fn fit<T: SeriesValue>(series: &[T]) -> Option<(f64, f64)> {
    let n = series.len();
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, point) in series.iter().enumerate() {
        let x = i as f64;
        let y = point.value();
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n_f * sum_xx - sum_x * sum_x;
    let slope = (n_f * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n_f;
    Some((slope, intercept))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Trailing moving average over `window` points.
///
/// The output has the same length as `series`. Positions before the first
/// full window are `None`; the rest hold the mean of the trailing `window`
/// values (inclusive), rounded to two decimals.
pub fn moving_average<T: SeriesValue>(
    series: &[T],
    window: usize,
) -> Result<Vec<Option<f64>>, CoreError> {
    if window == 0 {
        return Err(CoreError::InvalidArgument(
            "Moving average window size must be a positive integer".to_string(),
        ));
    }

    let values: Vec<f64> = series.iter().map(SeriesValue::value).collect();
    let out = (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            // No running sum: each window is summed from its own values.
            let sum: f64 = values[i + 1 - window..=i].iter().sum();
            Some(round2(sum / window as f64))
        })
        .collect();

    Ok(out)
}

/// Least-squares trend of `series` against its index.
///
/// Series with fewer than two points are [`TrendResult::FLAT`]. The slope is
/// rounded to two decimals and the direction is classified on the rounded
/// slope. Percentage change is `(last - first) / first * 100`, rounded, or
/// zero when the first value is zero.
pub fn trend_line<T: SeriesValue>(series: &[T]) -> TrendResult {
    let Some((raw_slope, _)) = fit(series) else {
        return TrendResult::FLAT;
    };

    let slope = round2(raw_slope);
    let first = series[0].value();
    let last = series[series.len() - 1].value();
    let percentage_change = if first != 0.0 {
        ((last - first) / first * 100.0).round()
    } else {
        0.0
    };

    TrendResult {
        direction: TrendDirection::from_slope(slope),
        slope,
        percentage_change,
    }
}

/// Fitted trend-line coordinates, one per input element.
///
/// A single point yields itself (flat line through it).
pub fn trend_line_coordinates<T: SeriesValue>(series: &[T]) -> Vec<TrendPoint> {
    let (slope, intercept) = match (fit(series), series.first()) {
        (Some(line), _) => line,
        (None, Some(only)) => (0.0, only.value()),
        (None, None) => return Vec::new(),
    };

    (0..series.len())
        .map(|x| TrendPoint {
            x,
            y: round2(slope * x as f64 + intercept),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
