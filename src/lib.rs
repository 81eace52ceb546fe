// Library surface: the headless measurement core plus the terminal plot view.
// The binary in main.rs only wires CLI arguments and the terminal to it.
pub mod calibration;
pub mod config;
pub mod error;
pub mod fit;
pub mod frame_clock;
pub mod point_log;
pub mod runtime;
pub mod script;
pub mod session;
pub mod time_series;
pub mod ui;
pub mod util;

pub use calibration::{CalibrationPoint, ScaleCalibrator, ScaleFactor};
pub use error::{CalibrationError, FitError, LogError, MeasureError};
pub use fit::{FitResult, TrajectoryFit, TrajectoryFitter};
pub use point_log::{DataPoint, PointLog};
pub use session::{Mode, SessionConfig, SessionController};
