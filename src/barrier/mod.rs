//! Counting completion barrier
//!
//! A [`GuardFactory`] hands out [`Guard`]s, one per unit of work. Each guard
//! invocation decrements a shared count and the completion callback runs when
//! that count lands on zero.

pub mod builder;
pub mod events;
pub mod factory;
pub mod guard;
mod state;

pub use builder::BarrierBuilder;
pub use events::{
    BarrierEvent, BarrierEventEnvelope, BufferingEventSink, EventSink, LoggingEventSink,
};
pub use factory::{create_barrier, create_barrier_with_config, GuardFactory};
pub use guard::{Guard, GuardOutcome};
pub use state::BarrierStats;
