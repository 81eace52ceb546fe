use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calibration::{
    CalibrationPoint, CalibrationProgress, ScaleCalibrator, ScaleFactor, DEFAULT_REAL_DISTANCE_M,
};
use crate::error::{CalibrationError, FitError, Result};
use crate::fit::{TrajectoryFit, TrajectoryFitter};
use crate::point_log::{DataPoint, PointLog};

const DEFAULT_CONSOLE_CAPACITY: usize = 200;

/// Which kind of input a click on the frame is taken as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum Mode {
    /// Nothing calibrated and calibration not started
    Uncalibrated,
    /// Collecting the two reference points
    Calibrating,
    /// Scale known; clicks record data points
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub real_distance_m: f64,
    pub console_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            real_distance_m: DEFAULT_REAL_DISTANCE_M,
            console_capacity: DEFAULT_CONSOLE_CAPACITY,
        }
    }
}

/// Result of routing one click
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// Reference point stored; `index` is 1-based
    CalibrationPoint {
        index: usize,
        point: CalibrationPoint,
    },
    /// Second reference point stored and the scale derived
    Calibrated {
        point: CalibrationPoint,
        scale: ScaleFactor,
    },
    Recorded(DataPoint),
    /// Click arrived before calibration was requested
    Ignored,
}

/// Bounded history of status lines, oldest first
#[derive(Debug, Clone)]
pub struct Console {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Console {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(DEFAULT_CONSOLE_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, message: &str) {
        for line in message.lines() {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line.to_string());
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Owns the measurement state and routes GUI events to it.
///
/// Starts [`Mode::Uncalibrated`]. `on_calibrate_requested` enters
/// [`Mode::Calibrating`] from any mode; the second valid reference click moves
/// to [`Mode::Ready`]. There is no terminal state, so one controller can serve
/// any number of video loads.
#[derive(Debug, Clone)]
pub struct SessionController {
    mode: Mode,
    calibrator: ScaleCalibrator,
    log: PointLog,
    fitter: TrajectoryFitter,
    console: Console,
}

impl Default for SessionController {
    fn default() -> Self {
        Self {
            mode: Mode::Uncalibrated,
            calibrator: ScaleCalibrator::default(),
            log: PointLog::new(),
            fitter: TrajectoryFitter::default(),
            console: Console::with_capacity(DEFAULT_CONSOLE_CAPACITY),
        }
    }
}

impl SessionController {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        Ok(Self {
            calibrator: ScaleCalibrator::new(config.real_distance_m)?,
            console: Console::with_capacity(config.console_capacity),
            ..Self::default()
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn scale(&self) -> Option<ScaleFactor> {
        self.calibrator.scale()
    }

    pub fn calibration_points(&self) -> &[CalibrationPoint] {
        self.calibrator.points()
    }

    pub fn points(&self) -> &[DataPoint] {
        self.log.points()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn real_distance_m(&self) -> f64 {
        self.calibrator.real_distance_m()
    }

    /// Takes effect at the next calibration
    pub fn set_real_distance_m(&mut self, meters: f64) -> Result<(), CalibrationError> {
        self.calibrator.set_real_distance_m(meters)
    }

    /// Route a click by mode. Nothing changes when an error is returned.
    pub fn handle_click(
        &mut self,
        pixel_x: f64,
        pixel_y: f64,
        current_time: f64,
    ) -> Result<ClickOutcome> {
        debug!(mode = %self.mode, pixel_x, pixel_y, current_time, "click");
        match self.mode {
            Mode::Uncalibrated => Ok(ClickOutcome::Ignored),
            Mode::Calibrating => {
                let point = CalibrationPoint::from_pixel(pixel_x, pixel_y)?;
                match self.calibrator.add_point(point)? {
                    CalibrationProgress::AwaitingSecond(point) => {
                        Ok(ClickOutcome::CalibrationPoint { index: 1, point })
                    }
                    CalibrationProgress::Complete(scale) => {
                        self.mode = Mode::Ready;
                        Ok(ClickOutcome::Calibrated { point, scale })
                    }
                }
            }
            Mode::Ready => {
                let point = self
                    .log
                    .record_click(self.mode, pixel_x, pixel_y, current_time)?;
                Ok(ClickOutcome::Recorded(point))
            }
        }
    }

    pub fn on_click(&mut self, pixel_x: f64, pixel_y: f64, current_time: f64) -> String {
        let status = match self.handle_click(pixel_x, pixel_y, current_time) {
            Ok(ClickOutcome::CalibrationPoint { index, point }) => {
                format!("Calibration point: {index} at ({}, {})", point.x, point.y)
            }
            Ok(ClickOutcome::Calibrated { point, scale }) => format!(
                "Calibration point: 2 at ({}, {})\nCalibration complete. Scale factor: {:.4} meters/pixel",
                point.x,
                point.y,
                scale.meters_per_pixel()
            ),
            Ok(ClickOutcome::Recorded(p)) => format!(
                "Data point: ({}, {}) at time {:.2} seconds",
                p.pixel_x, p.pixel_y, p.timestamp
            ),
            Ok(ClickOutcome::Ignored) => {
                warn!("click ignored before calibration was requested");
                "Please calibrate the system first.".to_string()
            }
            Err(e) => {
                warn!(error = %e, "click rejected");
                e.to_string()
            }
        };
        self.report(status)
    }

    /// Start (or restart) calibration from any mode. Data points are kept.
    pub fn on_calibrate_requested(&mut self) -> String {
        self.calibrator.reset();
        self.mode = Mode::Calibrating;
        let status = format!(
            "Calibration mode. Click on the two ends of the {} m reference.",
            self.calibrator.real_distance_m()
        );
        self.report(status)
    }

    pub fn on_collect_requested(&mut self) -> String {
        let status = match self.mode {
            Mode::Ready => {
                "Data collection mode. Click on the object to record positions.".to_string()
            }
            Mode::Calibrating => format!(
                "Finish calibration first: {} of 2 reference points marked.",
                self.calibrator.points().len()
            ),
            Mode::Uncalibrated => "Please calibrate the system first.".to_string(),
        };
        self.report(status)
    }

    pub fn on_undo_requested(&mut self) -> String {
        let status = match self.log.undo_last() {
            Some(_) => format!("Last point removed. {} remaining.", self.log.len()),
            None => "No points to remove.".to_string(),
        };
        self.report(status)
    }

    pub fn on_clear_requested(&mut self) -> String {
        let cleared = self.log.clear_all();
        debug!(cleared, "points cleared");
        self.report("All points cleared.".to_string())
    }

    /// Fit the logged points. Drawing is left to the caller.
    pub fn on_plot_requested(&mut self) -> Result<TrajectoryFit, FitError> {
        // An empty log is reported before a missing calibration
        if self.log.is_empty() {
            self.report(FitError::InsufficientData.to_string());
            return Err(FitError::InsufficientData);
        }

        match self.fitter.compute_fit(self.log.points(), self.calibrator.scale()) {
            Ok(fit) => {
                let status = format!(
                    "Fit: {}\nFit: {}",
                    fit.x_fit.equation("x"),
                    fit.y_fit.equation("y")
                );
                self.report(status);
                Ok(fit)
            }
            Err(e) => {
                warn!(error = %e, "plot rejected");
                self.report(e.to_string());
                Err(e)
            }
        }
    }

    fn report(&mut self, status: String) -> String {
        self.console.push(&status);
        status
    }
}
