pub mod config;
pub mod targets;
pub mod types;

pub use config::MonitorConfig;
pub use targets::{parse_targets, TargetError};
pub use types::*;
