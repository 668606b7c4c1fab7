pub mod config;
pub mod types;

pub use config::TunerConfig;
pub use types::*;
