// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   k     = 2 / (period + 1)
//   EMA_t = price_t * k + EMA_{t-1} * (1 - k)
//
// The first EMA value is seeded with the SMA of the first `period` prices and
// placed at index `period - 1`. The output is index-aligned with the input:
// positions before the seed hold 0.0.
// =============================================================================

/// Compute the EMA series for `prices` (oldest first) and look-back `period`.
///
/// The result always has `prices.len()` elements.
///
/// # Edge cases
/// - `prices.len() < period` => all-zero series
/// - `period == 0` => all-zero series
pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    let mut ema = vec![0.0; prices.len()];
    if period == 0 || prices.len() < period {
        return ema;
    }

    let k = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let seed = prices[..period].iter().sum::<f64>() / period as f64;
    ema[period - 1] = seed;

    let mut prev = seed;
    for (i, &price) in prices.iter().enumerate().skip(period) {
        prev = price * k + prev * (1.0 - k);
        ema[i] = prev;
    }

    ema
}
