// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Seed average gain / average loss with the plain mean of the first
//          `period` price changes.
// Step 2 — Apply Wilder's smoothing for every later change:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// A window with zero average loss reports 100, including a completely flat
// window.
// =============================================================================

/// Running state of Wilder's smoothing: the current average gain and loss.
#[derive(Debug, Clone, Copy)]
struct WilderAverages {
    gain: f64,
    loss: f64,
}

impl WilderAverages {
    fn smooth(self, change: f64, period: f64) -> Self {
        let (gain, loss) = split_change(change);
        Self {
            gain: (self.gain * (period - 1.0) + gain) / period,
            loss: (self.loss * (period - 1.0) + loss) / period,
        }
    }

    fn rsi(self) -> f64 {
        if self.loss == 0.0 {
            return 100.0;
        }
        let rs = self.gain / self.loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Split a price change into its (gain, loss) parts, both non-negative.
fn split_change(change: f64) -> (f64, f64) {
    if change > 0.0 {
        (change, 0.0)
    } else {
        (0.0, -change)
    }
}

/// Compute the RSI series for `prices` (oldest first).
///
/// The result has `prices.len()` elements. The first value sits at index
/// `period`; all earlier positions are 0.0.
///
/// # Edge cases
/// - `prices.len() <= period` => all-zero series
/// - `period == 0` => all-zero series
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<f64> {
    let mut rsi = vec![0.0; prices.len()];
    if period == 0 || prices.len() <= period {
        return rsi;
    }

    let period_f = period as f64;
    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let (gains, losses) = changes[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &change| {
            let (gain, loss) = split_change(change);
            (g + gain, l + loss)
        });

    let mut averages = WilderAverages {
        gain: gains / period_f,
        loss: losses / period_f,
    };
    rsi[period] = averages.rsi();

    // changes[i - 1] is the move into prices[i].
    for i in period + 1..prices.len() {
        averages = averages.smooth(changes[i - 1], period_f);
        rsi[i] = averages.rsi();
    }

    rsi
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_zero_loss_is_exactly_100() {
        let rsi = calculate_rsi(&[44.0, 44.25, 44.5], 2);
        assert_eq!(rsi, vec![0.0, 0.0, 100.0]);
    }

    #[test]
    fn rsi_flat_market_reports_100() {
        let rsi = calculate_rsi(&[100.0; 30], 14);
        assert!(rsi[..14].iter().all(|&v| v == 0.0));
        assert!(rsi[14..].iter().all(|&v| v == 100.0));
    }

    #[test]
    fn rsi_insufficient_data() {
        let prices: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert_eq!(calculate_rsi(&prices, 14), vec![0.0; 14]);
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert_eq!(calculate_rsi(&[1.0, 2.0, 3.0], 0), vec![0.0; 3]);
    }

    #[test]
    fn rsi_all_losses() {
        let prices: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let rsi = calculate_rsi(&prices, 14);
        assert_eq!(rsi.len(), 30);
        for &v in &rsi[14..] {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_seed_and_wilder_step() {
        // changes: +2, -1, +3 ; period 2
        // seed: gain = 2/2 = 1, loss = 1/2 = 0.5 -> RS 2 -> 66.666..
        // next: gain = (1*1 + 3)/2 = 2, loss = (0.5*1 + 0)/2 = 0.25 -> RS 8
        let rsi = calculate_rsi(&[10.0, 12.0, 11.0, 14.0], 2);
        assert!((rsi[2] - (100.0 - 100.0 / 3.0)).abs() < 1e-10);
        assert!((rsi[3] - (100.0 - 100.0 / 9.0)).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let prices = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for &v in &calculate_rsi(&prices, 14) {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }
}
