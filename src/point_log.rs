use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LogError;
use crate::session::Mode;

/// One marked object position on one video frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub timestamp: f64,
}

impl DataPoint {
    pub fn new(pixel_x: f64, pixel_y: f64, timestamp: f64) -> Self {
        Self {
            pixel_x,
            pixel_y,
            timestamp,
        }
    }
}

impl From<(f64, f64, f64)> for DataPoint {
    fn from(v: (f64, f64, f64)) -> Self {
        DataPoint::new(v.0, v.1, v.2)
    }
}

/// Recorded observations in click order.
///
/// The sequence only grows through [`PointLog::record_click`] and only shrinks
/// through [`PointLog::undo_last`] and [`PointLog::clear_all`]. Timestamps are
/// not required to be monotonic: scrubbing the frame slider backwards between
/// clicks yields out-of-order times, and they are kept as clicked.
#[derive(Debug, Clone, Default)]
pub struct PointLog {
    points: Vec<DataPoint>,
}

impl PointLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    /// Append a point. Only legal once calibration is done; otherwise the log
    /// is left untouched.
    pub fn record_click(
        &mut self,
        mode: Mode,
        pixel_x: f64,
        pixel_y: f64,
        timestamp: f64,
    ) -> Result<DataPoint, LogError> {
        if mode != Mode::Ready {
            warn!(%mode, "data point rejected before calibration");
            return Err(LogError::NotCalibrated);
        }
        if !pixel_x.is_finite() || !pixel_y.is_finite() {
            warn!(pixel_x, pixel_y, "data point rejected for invalid position");
            return Err(LogError::InvalidPixel {
                x: pixel_x,
                y: pixel_y,
            });
        }
        if !timestamp.is_finite() || timestamp < 0.0 {
            warn!(timestamp, "data point rejected for invalid timestamp");
            return Err(LogError::InvalidTimestamp(timestamp));
        }

        let point = DataPoint::new(pixel_x, pixel_y, timestamp);
        if let Some(prev) = self.points.last() {
            if timestamp < prev.timestamp {
                debug!(
                    previous = prev.timestamp,
                    timestamp, "data point recorded out of chronological order"
                );
            }
        }
        self.points.push(point);
        Ok(point)
    }

    /// Remove the most recent point. Returns `None` when there is nothing to undo.
    pub fn undo_last(&mut self) -> Option<DataPoint> {
        self.points.pop()
    }

    /// Remove every point and return how many were dropped
    pub fn clear_all(&mut self) -> usize {
        let n = self.points.len();
        self.points.clear();
        n
    }
}
