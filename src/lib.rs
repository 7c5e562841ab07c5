//! Counting completion barrier for callback-style asynchronous work.
//!
//! Ask the factory for one guard per unit of work and invoke each guard when
//! its work finishes; the completion callback runs when the last one does.

// Core infrastructure modules
pub mod core;

pub mod barrier;

// Re-exports for convenience
pub use crate::core::config::{BarrierConfig, CounterMode};
pub use crate::core::errors::{BarrierError, Result};
pub use barrier::{
    create_barrier, create_barrier_with_config, BarrierBuilder, BarrierEvent,
    BarrierEventEnvelope, BarrierStats, BufferingEventSink, EventSink, Guard, GuardFactory,
    GuardOutcome, LoggingEventSink,
};
