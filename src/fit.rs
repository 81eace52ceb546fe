//! Least-squares trajectory fitting.
//!
//! Horizontal motion is fitted with a line (constant velocity) and vertical
//! motion with a parabola (constant acceleration), each independently against
//! video time.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, info};

use crate::calibration::ScaleFactor;
use crate::error::FitError;
use crate::point_log::DataPoint;
use crate::time_series::{time_span, zip_series, TimeSeriesPoint};
use crate::util::rms_residual;

/// Singular values below this fraction of the largest one are treated as zero
const SVD_RELATIVE_EPS: f64 = 1e-12;

/// A fitted polynomial together with the samples it was fitted on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub degree: usize,
    /// Highest degree first, as `c[0] * t^n + ... + c[n]`
    pub coefficients: Vec<f64>,
    /// Timestamps of the fitted samples
    pub domain: Vec<f64>,
    /// Fitted values at each timestamp in `domain`
    pub range: Vec<f64>,
    pub rms_residual: f64,
}

impl FitResult {
    /// Evaluate the polynomial at `t` (Horner's scheme)
    pub fn evaluate(&self, t: f64) -> f64 {
        self.coefficients.iter().fold(0.0, |acc, c| acc * t + c)
    }

    /// Evenly spaced samples of the curve across the fitted time span, for
    /// drawing a smooth line rather than joining the data timestamps.
    pub fn sampled(&self, steps: usize) -> Vec<TimeSeriesPoint> {
        let Some((lo, hi)) = time_span(&self.domain) else {
            return Vec::new();
        };
        if steps < 2 || hi <= lo {
            return vec![TimeSeriesPoint::new(lo, self.evaluate(lo))];
        }

        let step = (hi - lo) / (steps - 1) as f64;
        (0..steps)
            .map(|i| {
                let t = lo + step * i as f64;
                TimeSeriesPoint::new(t, self.evaluate(t))
            })
            .collect()
    }

    /// Human readable equation, e.g. `y = -4.90t^2 + 2.00t - 1.00`
    pub fn equation(&self, var: &str) -> String {
        let mut out = format!("{var} =");
        for (i, c) in self.coefficients.iter().enumerate() {
            let power = self.degree - i;
            let term = match power {
                0 => format!("{:.2}", c.abs()),
                1 => format!("{:.2}t", c.abs()),
                p => format!("{:.2}t^{p}", c.abs()),
            };
            if i == 0 {
                let sign = if *c < 0.0 { "-" } else { "" };
                out.push_str(&format!(" {sign}{term}"));
            } else {
                let sign = if *c < 0.0 { '-' } else { '+' };
                out.push_str(&format!(" {sign} {term}"));
            }
        }
        out
    }
}

/// Least-squares polynomial of `degree` through `samples`.
///
/// Needs at least `degree + 1` distinct timestamps. Fewer would leave the fit
/// underdetermined, and that is reported as an error instead of returning a
/// minimum-norm solution.
pub fn polyfit(samples: &[TimeSeriesPoint], degree: usize) -> Result<FitResult, FitError> {
    if samples.is_empty() {
        return Err(FitError::InsufficientData);
    }

    let required = degree + 1;
    let distinct = distinct_times(samples);
    if distinct < required {
        return Err(FitError::UnderdeterminedFit {
            degree,
            required,
            got: distinct,
        });
    }

    let n = samples.len();
    let design = DMatrix::from_fn(n, required, |r, c| {
        samples[r].t.powi((degree - c) as i32)
    });
    let observed = DVector::from_iterator(n, samples.iter().map(|s| s.value));

    let svd = design.svd(true, true);
    let largest = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let solution = svd
        .solve(&observed, SVD_RELATIVE_EPS * largest)
        .map_err(|e| FitError::Solver(e.to_string()))?;
    let coefficients: Vec<f64> = solution.iter().copied().collect();

    let mut fit = FitResult {
        degree,
        coefficients,
        domain: samples.iter().map(|s| s.t).collect(),
        range: Vec::with_capacity(n),
        rms_residual: 0.0,
    };
    fit.range = fit.domain.iter().map(|&t| fit.evaluate(t)).collect();
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    fit.rms_residual = rms_residual(&values, &fit.range).unwrap_or(0.0);

    debug!(degree, n, rms = fit.rms_residual, "polynomial fitted");
    Ok(fit)
}

fn distinct_times(samples: &[TimeSeriesPoint]) -> usize {
    let mut times: Vec<f64> = samples.iter().map(|s| s.t).collect();
    times.sort_by(f64::total_cmp);
    times.dedup();
    times.len()
}

/// Data points converted to meters, with vertical pointing up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledTrack {
    pub times: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ScaledTrack {
    pub fn x_series(&self) -> Vec<TimeSeriesPoint> {
        zip_series(&self.times, &self.x)
    }

    pub fn y_series(&self) -> Vec<TimeSeriesPoint> {
        zip_series(&self.times, &self.y)
    }
}

/// Both axis fits plus the scaled samples they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryFit {
    pub meters_per_pixel: f64,
    pub track: ScaledTrack,
    pub x_fit: FitResult,
    pub y_fit: FitResult,
}

impl TrajectoryFit {
    /// Slope of the horizontal fit, in m/s
    pub fn horizontal_velocity(&self) -> f64 {
        self.x_fit.coefficients.first().copied().unwrap_or(0.0)
    }

    /// Second derivative of the vertical fit, in m/s² (negative is downwards)
    pub fn vertical_acceleration(&self) -> f64 {
        self.y_fit.coefficients.first().copied().unwrap_or(0.0) * 2.0
    }
}

/// Scales logged points and fits x(t) and y(t)
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryFitter {
    pub horizontal_degree: usize,
    pub vertical_degree: usize,
}

impl Default for TrajectoryFitter {
    fn default() -> Self {
        Self {
            horizontal_degree: 1,
            vertical_degree: 2,
        }
    }
}

impl TrajectoryFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert pixels to meters. Pixel rows grow downwards, so y is negated to
    /// make up positive.
    pub fn scale_points(
        &self,
        points: &[DataPoint],
        scale: Option<ScaleFactor>,
    ) -> Result<ScaledTrack, FitError> {
        calibrated_track(points, scale).map(|(_, track)| track)
    }

    pub fn fit_horizontal(
        &self,
        points: &[DataPoint],
        scale: Option<ScaleFactor>,
    ) -> Result<FitResult, FitError> {
        let track = self.scale_points(points, scale)?;
        polyfit(&track.x_series(), self.horizontal_degree)
    }

    pub fn fit_vertical(
        &self,
        points: &[DataPoint],
        scale: Option<ScaleFactor>,
    ) -> Result<FitResult, FitError> {
        let track = self.scale_points(points, scale)?;
        polyfit(&track.y_series(), self.vertical_degree)
    }

    pub fn compute_fit(
        &self,
        points: &[DataPoint],
        scale: Option<ScaleFactor>,
    ) -> Result<TrajectoryFit, FitError> {
        let (scale, track) = calibrated_track(points, scale)?;
        let x_fit = polyfit(&track.x_series(), self.horizontal_degree)?;
        let y_fit = polyfit(&track.y_series(), self.vertical_degree)?;

        let fit = TrajectoryFit {
            meters_per_pixel: scale.meters_per_pixel(),
            track,
            x_fit,
            y_fit,
        };
        info!(
            points = points.len(),
            vx = fit.horizontal_velocity(),
            ay = fit.vertical_acceleration(),
            "trajectory fitted"
        );
        Ok(fit)
    }
}

fn calibrated_track(
    points: &[DataPoint],
    scale: Option<ScaleFactor>,
) -> Result<(ScaleFactor, ScaledTrack), FitError> {
    let scale = scale.ok_or(FitError::NotCalibrated)?;
    if points.is_empty() {
        return Err(FitError::InsufficientData);
    }

    let track = ScaledTrack {
        times: points.iter().map(|p| p.timestamp).collect(),
        x: points.iter().map(|p| scale.to_meters(p.pixel_x)).collect(),
        y: points.iter().map(|p| -scale.to_meters(p.pixel_y)).collect(),
    };
    Ok((scale, track))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const TOL: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < TOL
    }

    fn scale(mpp: f64) -> Option<ScaleFactor> {
        Some(ScaleFactor::new(mpp).unwrap())
    }

    fn scenario_points() -> Vec<DataPoint> {
        vec![
            DataPoint::new(50.0, 50.0, 0.0),
            DataPoint::new(60.0, 30.0, 0.5),
            DataPoint::new(70.0, 10.0, 1.0),
        ]
    }

    #[test]
    fn test_scale_points_negates_vertical() {
        let track = TrajectoryFitter::new()
            .scale_points(&scenario_points(), scale(0.02))
            .unwrap();
        let expect_x = [1.0, 1.2, 1.4];
        let expect_y = [-1.0, -0.6, -0.2];
        for i in 0..3 {
            assert!(close(track.x[i], expect_x[i]), "x[{i}] = {}", track.x[i]);
            assert!(close(track.y[i], expect_y[i]), "y[{i}] = {}", track.y[i]);
        }
        assert_eq!(track.times, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_scenario_fit() {
        let fit = TrajectoryFitter::new()
            .compute_fit(&scenario_points(), scale(0.02))
            .unwrap();

        assert_eq!(fit.x_fit.coefficients.len(), 2);
        assert!(close(fit.x_fit.coefficients[0], 0.4));
        assert!(close(fit.x_fit.coefficients[1], 1.0));

        // Three points determine the parabola exactly
        assert_eq!(fit.y_fit.coefficients.len(), 3);
        for (t, y) in [(0.0, -1.0), (0.5, -0.6), (1.0, -0.2)] {
            assert!(close(fit.y_fit.evaluate(t), y));
        }
        assert!(fit.y_fit.rms_residual < TOL);
        assert!(close(fit.horizontal_velocity(), 0.4));
        assert!(close(fit.meters_per_pixel, 0.02));
    }

    #[test]
    fn test_free_fall_parabola_recovered() {
        // y(t) = -4.9 t^2 + 3 t + 2 in meters, at 1 px = 1 cm
        let points: Vec<DataPoint> = [0.0, 0.1, 0.2, 0.3, 0.4]
            .iter()
            .map(|&t: &f64| {
                let y_m = -4.9 * t * t + 3.0 * t + 2.0;
                DataPoint::new(100.0 * t, -y_m / 0.01, t)
            })
            .collect();

        let fit = TrajectoryFitter::new()
            .compute_fit(&points, scale(0.01))
            .unwrap();
        assert!((fit.y_fit.coefficients[0] + 4.9).abs() < 1e-6);
        assert!((fit.y_fit.coefficients[1] - 3.0).abs() < 1e-6);
        assert!((fit.y_fit.coefficients[2] - 2.0).abs() < 1e-6);
        assert!((fit.vertical_acceleration() + 9.8).abs() < 1e-6);
        assert!((fit.horizontal_velocity() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_points_reproduce_line() {
        let points = vec![DataPoint::new(10.0, 0.0, 0.0), DataPoint::new(30.0, 0.0, 2.0)];
        let fitter = TrajectoryFitter::new();

        let x_fit = fitter.fit_horizontal(&points, scale(0.5)).unwrap();
        assert!(close(x_fit.coefficients[0], 5.0));
        assert!(close(x_fit.coefficients[1], 5.0));

        assert_matches!(
            fitter.fit_vertical(&points, scale(0.5)),
            Err(FitError::UnderdeterminedFit {
                degree: 2,
                required: 3,
                got: 2
            })
        );
        assert_matches!(
            fitter.compute_fit(&points, scale(0.5)),
            Err(FitError::UnderdeterminedFit { .. })
        );
    }

    #[test]
    fn test_least_squares_overdetermined_line() {
        let samples: Vec<TimeSeriesPoint> = vec![
            (0.0, 0.0).into(),
            (1.0, 1.0).into(),
            (2.0, 1.0).into(),
            (3.0, 2.0).into(),
        ];
        let fit = polyfit(&samples, 1).unwrap();
        // Normal equations give slope 0.6, intercept 0.1
        assert!(close(fit.coefficients[0], 0.6));
        assert!(close(fit.coefficients[1], 0.1));
        assert!(fit.rms_residual > 0.0);
    }

    #[test]
    fn test_closely_spaced_timestamps_still_fit() {
        let times = [0.0, 1e-5, 2e-5, 3e-5];
        let line: Vec<TimeSeriesPoint> = times
            .iter()
            .map(|&t| TimeSeriesPoint::new(t, 2.0 + 100.0 * t))
            .collect();
        let fit = polyfit(&line, 1).unwrap();
        assert!((fit.coefficients[0] - 100.0).abs() < 1e-6, "{:?}", fit.coefficients);
        assert!(close(fit.coefficients[1], 2.0));

        let parabola: Vec<TimeSeriesPoint> = times
            .iter()
            .map(|&t| TimeSeriesPoint::new(t, 1.0 + t + t * t))
            .collect();
        let fit = polyfit(&parabola, 2).unwrap();
        assert!(fit.rms_residual < 1e-12, "rms = {}", fit.rms_residual);
    }

    #[test]
    fn test_fit_reports_calibrated_scale() {
        let fit = TrajectoryFitter::new()
            .compute_fit(&scenario_points(), scale(0.02))
            .unwrap();
        assert_eq!(fit.meters_per_pixel, 0.02);
    }

    #[test]
    fn test_repeated_timestamps_are_underdetermined() {
        let points = vec![
            DataPoint::new(1.0, 1.0, 0.5),
            DataPoint::new(2.0, 2.0, 0.5),
            DataPoint::new(3.0, 3.0, 0.5),
        ];
        assert_matches!(
            TrajectoryFitter::new().fit_horizontal(&points, scale(1.0)),
            Err(FitError::UnderdeterminedFit {
                degree: 1,
                required: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_preconditions() {
        let fitter = TrajectoryFitter::new();
        assert_matches!(
            fitter.compute_fit(&[], scale(1.0)),
            Err(FitError::InsufficientData)
        );
        assert_matches!(
            fitter.compute_fit(&scenario_points(), None),
            Err(FitError::NotCalibrated)
        );
        assert_matches!(polyfit(&[], 1), Err(FitError::InsufficientData));
    }

    #[test]
    fn test_out_of_order_timestamps_fit_the_same() {
        let mut points = scenario_points();
        points.swap(0, 2);
        let fit = TrajectoryFitter::new()
            .compute_fit(&points, scale(0.02))
            .unwrap();
        assert!(close(fit.x_fit.coefficients[0], 0.4));
        assert_eq!(fit.x_fit.domain, vec![1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_equation_formatting() {
        let fit = FitResult {
            degree: 2,
            coefficients: vec![-4.9, 2.0, -1.0],
            domain: vec![],
            range: vec![],
            rms_residual: 0.0,
        };
        assert_eq!(fit.equation("y"), "y = -4.90t^2 + 2.00t - 1.00");

        let line = FitResult {
            degree: 1,
            coefficients: vec![0.4, 1.0],
            domain: vec![],
            range: vec![],
            rms_residual: 0.0,
        };
        assert_eq!(line.equation("x"), "x = 0.40t + 1.00");
    }

    #[test]
    fn test_sampled_spans_domain() {
        let samples = [TimeSeriesPoint::new(0.0, 0.0), TimeSeriesPoint::new(2.0, 4.0)];
        let fit = polyfit(&samples, 1).unwrap();
        let samples = fit.sampled(5);
        assert_eq!(samples.len(), 5);
        assert!(close(samples[0].t, 0.0));
        assert!(close(samples[4].t, 2.0));
        assert!(close(samples[2].value, 2.0));
    }
}
