use crate::barrier::state::BarrierState;
use crate::core::config::CounterMode;
use crate::core::errors::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a single guard invocation did to its barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardOutcome {
    /// Other guards are still outstanding
    Pending { remaining: isize },
    /// This invocation brought the count to zero and the completion ran
    Completed,
    /// The counter is now below zero (faithful mode only)
    Overrun { pending: isize },
}

impl GuardOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// One outstanding prerequisite of a barrier.
///
/// Dropping a guard without invoking it leaves the barrier waiting forever.
pub struct Guard {
    id: u64,
    invoked: AtomicBool,
    state: Arc<BarrierState>,
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("id", &self.id)
            .field("barrier", &self.state.label())
            .field("invoked", &self.invoked.load(Ordering::SeqCst))
            .finish()
    }
}

impl Guard {
    pub(crate) fn new(id: u64, state: Arc<BarrierState>) -> Self {
        Self {
            id,
            invoked: AtomicBool::new(false),
            state,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this guard has been invoked at least once
    pub fn is_invoked(&self) -> bool {
        self.invoked.load(Ordering::SeqCst)
    }

    /// Signal that this guard's unit of work finished.
    ///
    /// Decrements the shared count; if it lands on zero the completion runs
    /// on this call stack before returning, and any error it returns comes
    /// back here as [`BarrierError::Completion`](crate::BarrierError::Completion).
    ///
    /// In faithful mode a guard may be invoked again and each call decrements
    /// once more. In hardened mode a second call fails with
    /// [`BarrierError::GuardReused`](crate::BarrierError::GuardReused) and
    /// leaves the count alone.
    pub fn invoke(&self) -> Result<GuardOutcome> {
        let already_invoked = self.invoked.swap(true, Ordering::SeqCst);
        if already_invoked && self.state.mode() == CounterMode::Hardened {
            return Err(self.state.reject_reuse(self.id));
        }

        let remaining = self.state.release(self.id)?;
        Ok(match remaining {
            0 => GuardOutcome::Completed,
            n if n < 0 => GuardOutcome::Overrun { pending: n },
            n => GuardOutcome::Pending { remaining: n },
        })
    }

    /// Turn the guard into a plain callback for callback-style APIs
    pub fn into_callback(self) -> impl FnMut() -> Result<GuardOutcome> + Send + 'static {
        move || self.invoke()
    }
}

#[cfg(test)]
mod tests {
    use crate::barrier::create_barrier;
    use crate::{BarrierBuilder, BarrierError, CounterMode, GuardOutcome};

    #[test]
    fn test_outcomes_in_order() {
        let after = create_barrier(|| Ok(()));
        let g1 = after.guard().unwrap();
        let g2 = after.guard().unwrap();

        assert_eq!(g1.invoke().unwrap(), GuardOutcome::Pending { remaining: 1 });
        assert!(g1.is_invoked());
        assert!(!g2.is_invoked());
        assert_eq!(g2.invoke().unwrap(), GuardOutcome::Completed);
    }

    #[test]
    fn test_faithful_reinvoke_reports_overrun() {
        let after = create_barrier(|| Ok(()));
        let g = after.guard().unwrap();
        assert!(g.invoke().unwrap().is_completed());
        assert_eq!(g.invoke().unwrap(), GuardOutcome::Overrun { pending: -1 });
    }

    #[test]
    fn test_hardened_reinvoke_is_rejected() {
        let after = BarrierBuilder::new()
            .mode(CounterMode::Hardened)
            .build(|| Ok(()))
            .unwrap();
        let g1 = after.guard().unwrap();
        let _g2 = after.guard().unwrap();

        g1.invoke().unwrap();
        let err = g1.invoke().unwrap_err();
        assert!(matches!(err, BarrierError::GuardReused { guard_id, .. } if guard_id == g1.id()));
        assert_eq!(after.pending(), 1);
    }

    #[test]
    fn test_into_callback() {
        let after = create_barrier(|| Ok(()));
        let mut callback = after.guard().unwrap().into_callback();
        assert_eq!(callback().unwrap(), GuardOutcome::Completed);
        assert_eq!(after.fire_count(), 1);
    }
}
