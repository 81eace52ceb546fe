use crate::error::FrameClockError;

/// Maps frame indices onto video time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: f64,
}

impl FrameClock {
    pub fn new(fps: f64) -> Result<Self, FrameClockError> {
        if fps.is_finite() && fps > 0.0 {
            Ok(Self { fps })
        } else {
            Err(FrameClockError::InvalidFrameRate(fps))
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Seconds from the start of the video to `frame`
    pub fn time_at(&self, frame: u64) -> f64 {
        frame as f64 / self.fps
    }
}
