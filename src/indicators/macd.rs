// =============================================================================
// Moving Average Convergence / Divergence (MACD)
// =============================================================================
//
//   line      = EMA(fast) - EMA(slow)        (defined from index slow - 1)
//   signal    = EMA(line, signal_period)
//   histogram = line - signal
//
// The signal EMA runs over the whole line, including the zero prefix before
// the slow EMA is defined. Its seed window can therefore average in synthetic
// zeros, which drags the first signal values towards zero until enough real
// line values have entered the window.
// =============================================================================

use super::ema::calculate_ema;

/// Standard MACD parameters (12, 26, 9).
pub const FAST_PERIOD: usize = 12;
pub const SLOW_PERIOD: usize = 26;
pub const SIGNAL_PERIOD: usize = 9;

/// Index-aligned MACD output. All three vectors have the input's length, or
/// are all empty when the input is shorter than the slow period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdSeries {
    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// The last `(line, signal, histogram)` triple, if any.
    pub fn last(&self) -> Option<(f64, f64, f64)> {
        Some((
            *self.line.last()?,
            *self.signal.last()?,
            *self.histogram.last()?,
        ))
    }
}

/// Compute MACD over `prices` (oldest first).
///
/// Returns an empty [`MacdSeries`] when `prices.len() < slow` or any period
/// is zero.
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if fast == 0 || slow == 0 || signal == 0 || prices.len() < slow {
        return MacdSeries::default();
    }

    let ema_fast = calculate_ema(prices, fast);
    let ema_slow = calculate_ema(prices, slow);

    let mut line = vec![0.0; prices.len()];
    for i in slow - 1..prices.len() {
        line[i] = ema_fast[i] - ema_slow[i];
    }

    let signal_line = calculate_ema(&line, signal);

    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| l - s)
        .collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.3)
            .collect()
    }

    #[test]
    fn macd_insufficient_data_is_empty() {
        let macd = calculate_macd(&wavy(25), 12, 26, 9);
        assert!(macd.is_empty());
        assert!(macd.signal.is_empty());
        assert!(macd.histogram.is_empty());
        assert_eq!(macd.last(), None);
    }

    #[test]
    fn macd_histogram_identity_is_exact() {
        let macd = calculate_macd(&wavy(120), FAST_PERIOD, SLOW_PERIOD, SIGNAL_PERIOD);
        assert_eq!(macd.line.len(), 120);
        for i in 0..120 {
            assert_eq!(macd.histogram[i], macd.line[i] - macd.signal[i]);
        }
    }

    #[test]
    fn macd_line_zero_before_slow_window() {
        let prices = wavy(60);
        let macd = calculate_macd(&prices, 12, 26, 9);
        assert!(macd.line[..25].iter().all(|&v| v == 0.0));

        let fast = calculate_ema(&prices, 12);
        let slow = calculate_ema(&prices, 26);
        for i in 25..60 {
            assert_eq!(macd.line[i], fast[i] - slow[i]);
        }
    }

    #[test]
    fn macd_signal_runs_over_zero_prefix() {
        let prices = wavy(40);
        let macd = calculate_macd(&prices, 12, 26, 9);
        // Signal seeds at index 8, well inside the line's zero prefix.
        assert_eq!(macd.signal, calculate_ema(&macd.line, 9));
        assert_eq!(macd.signal[8], 0.0);
    }

    #[test]
    fn macd_flat_series_is_zero() {
        let macd = calculate_macd(&[50.0; 40], 12, 26, 9);
        let (line, signal, hist) = macd.last().unwrap();
        assert!(line.abs() < 1e-10);
        assert!(signal.abs() < 1e-10);
        assert!(hist.abs() < 1e-10);
    }

    #[test]
    fn macd_rising_series_has_positive_line() {
        let prices: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let (line, _, _) = calculate_macd(&prices, 12, 26, 9).last().unwrap();
        assert!(line > 0.0);
    }
}
