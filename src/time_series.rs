use serde::Serialize;

/// One sample of a quantity over video time, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub t: f64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, value: f64) -> Self {
        Self { t, value }
    }
}

impl From<(f64, f64)> for TimeSeriesPoint {
    fn from(v: (f64, f64)) -> Self {
        TimeSeriesPoint { t: v.0, value: v.1 }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.t, p.value)
    }
}

/// Pair up times with values, stopping at the shorter of the two
pub fn zip_series(times: &[f64], values: &[f64]) -> Vec<TimeSeriesPoint> {
    times
        .iter()
        .zip(values)
        .map(|(&t, &value)| TimeSeriesPoint::new(t, value))
        .collect()
}

/// Closed `[min, max]` range of the times, or `None` when empty
pub fn time_span(times: &[f64]) -> Option<(f64, f64)> {
    times.iter().fold(None, |acc, &t| match acc {
        None => Some((t, t)),
        Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
    })
}
