use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CalibrationError;

/// Reference length assumed when nothing else is configured (a meter stick)
pub const DEFAULT_REAL_DISTANCE_M: f64 = 1.0;

/// A clicked pixel on the calibration reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub x: i32,
    pub y: i32,
}

impl CalibrationPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Round a click position to the nearest pixel. Non-finite positions and
    /// positions outside the `i32` range are rejected.
    pub fn from_pixel(x: f64, y: f64) -> Result<Self, CalibrationError> {
        match (round_pixel(x), round_pixel(y)) {
            (Some(px), Some(py)) => Ok(Self::new(px, py)),
            _ => Err(CalibrationError::InvalidPixel { x, y }),
        }
    }

    pub fn distance_to(&self, other: &CalibrationPoint) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        (dx * dx + dy * dy).sqrt()
    }
}

fn round_pixel(v: f64) -> Option<i32> {
    let r = v.round();
    (r.is_finite() && r >= f64::from(i32::MIN) && r <= f64::from(i32::MAX)).then_some(r as i32)
}

impl From<(i32, i32)> for CalibrationPoint {
    fn from(v: (i32, i32)) -> Self {
        CalibrationPoint { x: v.0, y: v.1 }
    }
}

/// Meters per pixel. Only constructed from a successful calibration, so it is
/// always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// Wrap a known meters-per-pixel ratio, e.g. one measured elsewhere
    pub fn new(meters_per_pixel: f64) -> Result<Self, CalibrationError> {
        if meters_per_pixel.is_finite() && meters_per_pixel > 0.0 {
            Ok(Self(meters_per_pixel))
        } else {
            Err(CalibrationError::InvalidScale(meters_per_pixel))
        }
    }

    pub fn meters_per_pixel(&self) -> f64 {
        self.0
    }

    pub fn to_meters(&self, pixels: f64) -> f64 {
        pixels * self.0
    }
}

/// What happened after a calibration click
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationProgress {
    /// First reference point stored, waiting for the second
    AwaitingSecond(CalibrationPoint),
    /// Both points stored and the scale derived
    Complete(ScaleFactor),
}

/// Turns two reference clicks and a known length into a [`ScaleFactor`]
#[derive(Debug, Clone)]
pub struct ScaleCalibrator {
    points: Vec<CalibrationPoint>,
    scale: Option<ScaleFactor>,
    real_distance_m: f64,
}

impl Default for ScaleCalibrator {
    fn default() -> Self {
        Self {
            points: Vec::with_capacity(2),
            scale: None,
            real_distance_m: DEFAULT_REAL_DISTANCE_M,
        }
    }
}

impl ScaleCalibrator {
    pub fn new(real_distance_m: f64) -> Result<Self, CalibrationError> {
        validate_distance(real_distance_m)?;
        Ok(Self {
            real_distance_m,
            ..Self::default()
        })
    }

    pub fn real_distance_m(&self) -> f64 {
        self.real_distance_m
    }

    /// Change the reference length used by the next calibration.
    /// An existing scale factor is left alone until the next `reset`.
    pub fn set_real_distance_m(&mut self, meters: f64) -> Result<(), CalibrationError> {
        validate_distance(meters)?;
        self.real_distance_m = meters;
        Ok(())
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn scale(&self) -> Option<ScaleFactor> {
        self.scale
    }

    pub fn is_calibrated(&self) -> bool {
        self.scale.is_some()
    }

    /// Drop the stored points and scale so a new calibration can begin
    pub fn reset(&mut self) {
        debug!(had_scale = self.scale.is_some(), "calibration reset");
        self.points.clear();
        self.scale = None;
    }

    /// Store a reference click. The second click derives the scale from the
    /// configured reference length. If the two clicks coincide the second one
    /// is discarded so the user can click again.
    pub fn add_point(
        &mut self,
        point: CalibrationPoint,
    ) -> Result<CalibrationProgress, CalibrationError> {
        if self.points.len() >= 2 || self.scale.is_some() {
            return Err(CalibrationError::InvalidState);
        }

        self.points.push(point);
        if self.points.len() < 2 {
            return Ok(CalibrationProgress::AwaitingSecond(point));
        }

        match self.compute_scale(self.real_distance_m) {
            Ok(scale) => Ok(CalibrationProgress::Complete(scale)),
            Err(e) => {
                self.points.pop();
                Err(e)
            }
        }
    }

    /// Derive `real_distance_m / pixel_distance` from the two stored points.
    /// A scale that is already set stays fixed until the next `reset`.
    pub fn compute_scale(&mut self, real_distance_m: f64) -> Result<ScaleFactor, CalibrationError> {
        validate_distance(real_distance_m)?;
        if self.scale.is_some() {
            return Err(CalibrationError::InvalidState);
        }
        let (a, b) = match self.points.as_slice() {
            [a, b] => (*a, *b),
            _ => return Err(CalibrationError::InvalidState),
        };

        let pixel_distance = a.distance_to(&b);
        if pixel_distance == 0.0 {
            return Err(CalibrationError::Degenerate { x: a.x, y: a.y });
        }

        let scale = ScaleFactor(real_distance_m / pixel_distance);
        info!(
            pixel_distance,
            real_distance_m,
            meters_per_pixel = scale.meters_per_pixel(),
            "calibration complete"
        );
        self.scale = Some(scale);
        Ok(scale)
    }
}

fn validate_distance(meters: f64) -> Result<(), CalibrationError> {
    if meters.is_finite() && meters > 0.0 {
        Ok(())
    } else {
        Err(CalibrationError::InvalidDistance(meters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn calibrate(real: f64, a: (i32, i32), b: (i32, i32)) -> Result<ScaleFactor, CalibrationError> {
        let mut cal = ScaleCalibrator::new(real).unwrap();
        cal.add_point(a.into())?;
        match cal.add_point(b.into())? {
            CalibrationProgress::Complete(scale) => Ok(scale),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_default_distance_is_one_meter() {
        let cal = ScaleCalibrator::default();
        assert_eq!(cal.real_distance_m(), 1.0);
        assert!(!cal.is_calibrated());
    }

    #[test]
    fn test_scale_is_real_over_pixel_distance() {
        let scale = calibrate(2.0, (0, 0), (100, 0)).unwrap();
        assert!((scale.meters_per_pixel() - 0.02).abs() < 1e-12);

        // 3-4-5 triangle
        let scale = calibrate(1.0, (10, 10), (13, 14)).unwrap();
        assert!((scale.meters_per_pixel() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_from_pixel_rounds_and_rejects_unrepresentable() {
        assert_eq!(
            CalibrationPoint::from_pixel(10.4, 19.6),
            Ok(CalibrationPoint::new(10, 20))
        );
        for (x, y) in [
            (f64::NAN, 0.0),
            (0.0, f64::INFINITY),
            (3e9, 0.0),
            (0.0, -3e9),
        ] {
            assert_matches!(
                CalibrationPoint::from_pixel(x, y),
                Err(CalibrationError::InvalidPixel { .. })
            );
        }
    }

    #[test]
    fn test_first_point_awaits_second() {
        let mut cal = ScaleCalibrator::default();
        let progress = cal.add_point(CalibrationPoint::new(5, 6)).unwrap();
        assert_eq!(
            progress,
            CalibrationProgress::AwaitingSecond(CalibrationPoint::new(5, 6))
        );
        assert_eq!(cal.points().len(), 1);
        assert!(cal.scale().is_none());
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let mut cal = ScaleCalibrator::default();
        cal.add_point((42, 7).into()).unwrap();
        let err = cal.add_point((42, 7).into()).unwrap_err();
        assert_matches!(err, CalibrationError::Degenerate { x: 42, y: 7 });
        assert!(cal.scale().is_none());
        // The coincident click is dropped so a new second point can follow
        assert_eq!(cal.points(), &[CalibrationPoint::new(42, 7)]);

        let progress = cal.add_point((42, 57).into()).unwrap();
        assert_matches!(progress, CalibrationProgress::Complete(s) if (s.meters_per_pixel() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_third_point_is_rejected() {
        let mut cal = ScaleCalibrator::default();
        cal.add_point((0, 0).into()).unwrap();
        cal.add_point((50, 0).into()).unwrap();
        let before = cal.scale();
        assert_matches!(
            cal.add_point((1, 1).into()),
            Err(CalibrationError::InvalidState)
        );
        assert_eq!(cal.scale(), before);
        assert_eq!(cal.points().len(), 2);
    }

    #[test]
    fn test_reset_discards_points_and_scale() {
        let mut cal = ScaleCalibrator::default();
        cal.add_point((0, 0).into()).unwrap();
        cal.add_point((10, 0).into()).unwrap();
        assert!(cal.is_calibrated());

        cal.reset();
        assert!(cal.points().is_empty());
        assert!(cal.scale().is_none());

        cal.reset();
        assert!(cal.points().is_empty());
    }

    #[test]
    fn test_invalid_distance_rejected() {
        assert_matches!(
            ScaleCalibrator::new(0.0),
            Err(CalibrationError::InvalidDistance(_))
        );
        assert_matches!(
            ScaleCalibrator::new(-1.5),
            Err(CalibrationError::InvalidDistance(_))
        );
        let mut cal = ScaleCalibrator::default();
        assert_matches!(
            cal.set_real_distance_m(f64::NAN),
            Err(CalibrationError::InvalidDistance(_))
        );
        assert_eq!(cal.real_distance_m(), 1.0);
    }

    #[test]
    fn test_scale_factor_new_rejects_non_positive() {
        assert!(ScaleFactor::new(0.01).is_ok());
        assert_matches!(ScaleFactor::new(0.0), Err(CalibrationError::InvalidScale(_)));
        assert_matches!(
            ScaleFactor::new(f64::INFINITY),
            Err(CalibrationError::InvalidScale(_))
        );
    }

    #[test]
    fn test_compute_scale_requires_two_points() {
        let mut cal = ScaleCalibrator::default();
        cal.add_point((0, 0).into()).unwrap();
        assert_matches!(cal.compute_scale(1.0), Err(CalibrationError::InvalidState));
    }

    #[test]
    fn test_scale_is_fixed_until_reset() {
        let mut cal = ScaleCalibrator::default();
        cal.add_point((0, 0).into()).unwrap();
        cal.add_point((0, 200).into()).unwrap();
        let scale = cal.scale().unwrap();
        assert!((scale.meters_per_pixel() - 0.005).abs() < 1e-12);

        assert_matches!(cal.compute_scale(4.0), Err(CalibrationError::InvalidState));
        assert_eq!(cal.scale(), Some(scale));
    }

    #[test]
    fn test_distance_change_applies_to_next_calibration() {
        let mut cal = ScaleCalibrator::default();
        cal.add_point((0, 0).into()).unwrap();
        cal.add_point((0, 200).into()).unwrap();
        cal.set_real_distance_m(4.0).unwrap();
        assert!((cal.scale().unwrap().meters_per_pixel() - 0.005).abs() < 1e-12);

        cal.reset();
        cal.add_point((0, 0).into()).unwrap();
        cal.add_point((0, 200).into()).unwrap();
        assert!((cal.scale().unwrap().meters_per_pixel() - 0.02).abs() < 1e-12);
    }
}
