pub mod signal_bars;
pub mod status_indicator;
