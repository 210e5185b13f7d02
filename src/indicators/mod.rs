// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator computations over price sequences ordered
// oldest to newest. Output series are index-aligned with their input; indices
// where an indicator is not yet computable hold 0.0.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdSeries, FAST_PERIOD, SIGNAL_PERIOD, SLOW_PERIOD};
pub use rsi::calculate_rsi;
pub use sma::mean;

/// Look-back used for the stored RSI reading.
pub const RSI_PERIOD: usize = 14;

/// Number of most-recent observations averaged into the SMA fields.
pub const SMA_WINDOW: usize = 5;
