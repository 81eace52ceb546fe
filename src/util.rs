pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Root mean square of `observed - predicted`, pairwise
pub fn rms_residual(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    let squares: Vec<f64> = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| {
            let diff = o - p;

            diff * diff
        })
        .collect();

    mean(&squares).map(f64::sqrt)
}
