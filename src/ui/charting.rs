/// Axis bounds `([t_min, t_max], [v_min, v_max])` covering every series.
/// Degenerate spans are widened so the chart never collapses to a line.
pub fn compute_chart_bounds(series: &[&[(f64, f64)]]) -> ([f64; 2], [f64; 2]) {
    let mut t = [f64::INFINITY, f64::NEG_INFINITY];
    let mut v = [f64::INFINITY, f64::NEG_INFINITY];
    for &(x, y) in series.iter().flat_map(|s| s.iter()) {
        t = [t[0].min(x), t[1].max(x)];
        v = [v[0].min(y), v[1].max(y)];
    }

    if !t[0].is_finite() {
        return ([0.0, 1.0], [0.0, 1.0]);
    }
    (widen(t, 0.0), widen(v, 0.05))
}

fn widen(bounds: [f64; 2], pad_ratio: f64) -> [f64; 2] {
    let span = bounds[1] - bounds[0];
    if span <= f64::EPSILON {
        return [bounds[0] - 0.5, bounds[1] + 0.5];
    }
    let pad = span * pad_ratio;
    [bounds[0] - pad, bounds[1] + pad]
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
