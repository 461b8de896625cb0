/// Seconds in a minute, used to convert hydrograph time steps.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Helper function for integrating a rate series over a time series given
/// in minutes, with the same right-rectangle rule the simulator uses: the
/// rate at sample `i` is held over the interval `(t[i-1], t[i]]` and the
/// rate at sample 0 is never integrated. The slices are expected to have
/// the same length.
///
/// ## Example
///
/// ```
/// let time_min = vec![0.0, 1.0, 2.0];
/// let rate = vec![5.0, 1.0, 2.0];
///
/// let volume = soakwell_rs::utils::integrate_rate(&time_min, &rate);
/// assert_eq!(volume, 180.0);
/// ```
pub fn integrate_rate(time_min: &[f64], rate: &[f64]) -> f64 {
    assert_eq!(time_min.len(), rate.len());
    let mut total = 0.0;
    for i in 1..time_min.len() {
        let dt = (time_min[i] - time_min[i - 1]) * SECONDS_PER_MINUTE;
        total += rate[i] * dt;
    }
    total
}

/// Helper function for the largest value of a series, `0.0` when empty.
/// Series produced by the simulator are non-negative, so zero is a safe
/// floor.
///
/// ## Example
///
/// ```
/// let peak = soakwell_rs::utils::peak(&[0.0, 3.5, 1.0]);
/// assert_eq!(peak, 3.5);
/// ```
pub fn peak(series: &[f64]) -> f64 {
    series.iter().copied().fold(0.0, f64::max)
}

/// Index of the first occurrence of the maximum value.
pub fn first_peak_index(series: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in series.iter().enumerate() {
        match best {
            Some((_, current)) if *value <= current => {}
            _ => best = Some((index, *value)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrate_rate_skips_first_sample() {
        let time_min = vec![0.0, 0.5];
        let rate = vec![100.0, 2.0];
        assert_eq!(integrate_rate(&time_min, &rate), 60.0);
    }

    #[test]
    fn test_integrate_rate_single_sample() {
        assert_eq!(integrate_rate(&[10.0], &[4.0]), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_integrate_rate_length_mismatch() {
        integrate_rate(&[0.0, 1.0], &[1.0]);
    }

    #[test]
    fn test_first_peak_index_prefers_first() {
        assert_eq!(first_peak_index(&[1.0, 4.0, 2.0, 4.0]), Some(1));
        assert_eq!(first_peak_index(&[]), None);
    }

    #[test]
    fn test_peak_of_empty_is_zero() {
        assert_eq!(peak(&[]), 0.0);
    }
}
