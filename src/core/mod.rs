// Infrastructure shared by every barrier session

pub mod config;
pub mod errors;

// Re-export commonly used types
pub use config::{BarrierConfig, CounterMode};
pub use errors::{BarrierError, Result};
