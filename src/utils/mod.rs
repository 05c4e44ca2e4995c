pub mod env;
pub mod matching_config;
pub mod progress_bars;
