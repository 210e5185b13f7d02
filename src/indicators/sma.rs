// =============================================================================
// Simple Moving Average helpers
// =============================================================================

/// Arithmetic mean of `values`, or 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
