use thiserror::Error;

/// Failures while deriving the pixel to meter scale
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration points coincide at ({x}, {y}); pick two distinct points")]
    Degenerate { x: i32, y: i32 },
    #[error("Invalid reference distance {0}; it must be a positive number of meters")]
    InvalidDistance(f64),
    #[error("Invalid scale factor {0}; it must be a positive number of meters per pixel")]
    InvalidScale(f64),
    #[error("Calibration already has two points; press calibrate to start over")]
    InvalidState,
    #[error("Invalid calibration click ({x}, {y}); it must be a finite pixel position")]
    InvalidPixel { x: f64, y: f64 },
}

/// Failures while recording data points
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogError {
    #[error("Please calibrate the system first.")]
    NotCalibrated,
    #[error("Invalid timestamp {0}; it must be a non-negative number of seconds")]
    InvalidTimestamp(f64),
    #[error("Invalid click position ({x}, {y}); it must be a finite pixel position")]
    InvalidPixel { x: f64, y: f64 },
}

/// Failures while fitting trajectories
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("No data to plot. Please collect data first.")]
    InsufficientData,
    #[error("Please calibrate the system before plotting.")]
    NotCalibrated,
    #[error("A degree {degree} fit needs {required} distinct timestamps, got {got}")]
    UnderdeterminedFit {
        degree: usize,
        required: usize,
        got: usize,
    },
    #[error("Least squares solve failed: {0}")]
    Solver(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameClockError {
    #[error("Invalid frame rate {0}; it must be a positive number of frames per second")]
    InvalidFrameRate(f64),
}

/// Failures while reading an event script
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("Row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("Row {row}: {message}")]
    Invalid { row: usize, message: String },
}

/// Every failure the measurement core can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Fit(#[from] FitError),
    #[error(transparent)]
    FrameClock(#[from] FrameClockError),
}

pub type Result<T, E = MeasureError> = std::result::Result<T, E>;
