use crate::barrier::events::{now_ms, BarrierEvent, BarrierEventEnvelope, EventSink};
use crate::core::config::{BarrierConfig, CounterMode};
use crate::core::errors::{BarrierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicIsize, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Boxed completion callback
pub(crate) type Completion = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// Counter value marking a hardened session whose completion already fired.
/// Never produced in faithful mode.
const SEALED: isize = isize::MIN;

/// Point-in-time view of a barrier session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierStats {
    pub session_id: String,
    pub label: String,
    pub mode: CounterMode,
    pub pending: isize,
    pub issued: u64,
    pub invoked: u64,
    pub fire_count: u64,
    pub done: bool,
}

/// State shared by a guard factory and every guard it issued
pub(crate) struct BarrierState {
    session_id: String,
    config: BarrierConfig,
    pending: AtomicIsize,
    issued: AtomicU64,
    invoked: AtomicU64,
    fire_count: AtomicU64,
    next_guard_id: AtomicU64,
    event_sequence: AtomicU64,
    completion: Mutex<Completion>,
    event_sink: Option<Arc<dyn EventSink>>,
    fired_tx: watch::Sender<u64>,
}

impl fmt::Debug for BarrierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarrierState")
            .field("session_id", &self.session_id)
            .field("label", &self.config.label)
            .field("mode", &self.config.mode)
            .field("pending", &self.pending())
            .field("fire_count", &self.fire_count())
            .finish_non_exhaustive()
    }
}

impl BarrierState {
    pub(crate) fn new(
        config: BarrierConfig,
        event_sink: Option<Arc<dyn EventSink>>,
        completion: Completion,
    ) -> Self {
        let (fired_tx, _) = watch::channel(0);
        Self {
            session_id: Uuid::new_v4().to_string(),
            config,
            pending: AtomicIsize::new(0),
            issued: AtomicU64::new(0),
            invoked: AtomicU64::new(0),
            fire_count: AtomicU64::new(0),
            next_guard_id: AtomicU64::new(0),
            event_sequence: AtomicU64::new(0),
            completion: Mutex::new(completion),
            event_sink,
            fired_tx,
        }
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn label(&self) -> &str {
        &self.config.label
    }

    pub(crate) fn mode(&self) -> CounterMode {
        self.config.mode
    }

    /// Outstanding guards. A sealed hardened session reports 0.
    pub(crate) fn pending(&self) -> isize {
        match self.pending.load(Ordering::SeqCst) {
            SEALED => 0,
            n => n,
        }
    }

    pub(crate) fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub(crate) fn invoked(&self) -> u64 {
        self.invoked.load(Ordering::SeqCst)
    }

    pub(crate) fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::SeqCst)
    }

    pub(crate) fn is_done(&self) -> bool {
        match self.config.mode {
            CounterMode::Hardened => self.pending.load(Ordering::SeqCst) == SEALED,
            CounterMode::Faithful => self.fire_count() > 0 && self.pending() == 0,
        }
    }

    pub(crate) fn stats(&self) -> BarrierStats {
        BarrierStats {
            session_id: self.session_id.clone(),
            label: self.config.label.clone(),
            mode: self.config.mode,
            pending: self.pending(),
            issued: self.issued(),
            invoked: self.invoked(),
            fire_count: self.fire_count(),
            done: self.is_done(),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.fired_tx.subscribe()
    }

    /// Increment the counter for a new guard and hand back its id.
    pub(crate) fn issue(&self) -> Result<u64> {
        let hardened = self.config.mode == CounterMode::Hardened;
        let max = self
            .config
            .max_outstanding
            .map(|m| isize::try_from(m).unwrap_or(isize::MAX));

        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if hardened && current == SEALED {
                    return None;
                }
                if max.is_some_and(|max| current >= max) {
                    return None;
                }
                Some(current + 1)
            });

        let previous = match previous {
            Ok(previous) => previous,
            Err(SEALED) if hardened => {
                warn!("Barrier {} rejected a new guard: already completed", self.label());
                self.emit(BarrierEvent::Rejected {
                    guard_id: None,
                    reason: "sealed".to_string(),
                });
                return Err(BarrierError::sealed(self.label()));
            }
            Err(current) => {
                let limit = self.config.max_outstanding.unwrap_or_default() as u64;
                warn!(
                    "Barrier {} rejected a new guard: {} outstanding, limit {}",
                    self.label(),
                    current,
                    limit
                );
                self.emit(BarrierEvent::Rejected {
                    guard_id: None,
                    reason: "max_outstanding".to_string(),
                });
                return Err(BarrierError::resource_exhausted(
                    "outstanding_guards",
                    (current + 1).max(0) as u64,
                    limit,
                ));
            }
        };

        let guard_id = self.next_guard_id.fetch_add(1, Ordering::SeqCst);
        self.issued.fetch_add(1, Ordering::SeqCst);
        let pending = previous + 1;
        debug!(
            "Barrier {} issued guard {}, pending: {}",
            self.label(),
            guard_id,
            pending
        );
        self.emit(BarrierEvent::GuardIssued { guard_id, pending });
        Ok(guard_id)
    }

    /// Decrement the counter on behalf of `guard_id`, firing the completion
    /// when the decrement lands on zero. Returns the post-decrement value.
    pub(crate) fn release(&self, guard_id: u64) -> Result<isize> {
        let remaining = match self.config.mode {
            CounterMode::Faithful => self.pending.fetch_sub(1, Ordering::SeqCst) - 1,
            CounterMode::Hardened => {
                // Seal in the same step as the last decrement so no guard can
                // be issued between reaching zero and firing.
                let previous = self
                    .pending
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                        if current == 1 {
                            Some(SEALED)
                        } else {
                            Some(current - 1)
                        }
                    })
                    .unwrap_or_else(|current| current);
                previous - 1
            }
        };
        self.invoked.fetch_add(1, Ordering::SeqCst);

        if remaining < 0 {
            warn!(
                "Barrier {} guard {} over-invoked, pending: {}",
                self.label(),
                guard_id,
                remaining
            );
            self.emit(BarrierEvent::Overrun {
                guard_id,
                pending: remaining,
            });
            return Ok(remaining);
        }

        debug!(
            "Barrier {} guard {} invoked, remaining: {}",
            self.label(),
            guard_id,
            remaining
        );
        self.emit(BarrierEvent::GuardInvoked { guard_id, remaining });

        if remaining == 0 {
            self.fire()?;
        }
        Ok(remaining)
    }

    /// Note a rejected second invocation of a single-use guard.
    pub(crate) fn reject_reuse(&self, guard_id: u64) -> BarrierError {
        warn!(
            "Barrier {} guard {} invoked more than once",
            self.label(),
            guard_id
        );
        self.emit(BarrierEvent::Rejected {
            guard_id: Some(guard_id),
            reason: "guard_reused".to_string(),
        });
        BarrierError::guard_reused(self.label(), guard_id)
    }

    fn fire(&self) -> Result<()> {
        let mut completion = match self.completion.try_lock() {
            Ok(completion) => completion,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!(
                    "Barrier {} reached zero while its completion was still running",
                    self.label()
                );
                return Err(BarrierError::concurrency(format!(
                    "completion of barrier {} is already running",
                    self.label()
                )));
            }
        };

        let callback: &mut (dyn FnMut() -> anyhow::Result<()> + Send) = &mut **completion;
        let outcome = panic::catch_unwind(AssertUnwindSafe(callback));
        drop(completion);

        // A panicking completion still counts as fired.
        let fire_count = self.fire_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.fired_tx.send_replace(fire_count);
        self.emit(BarrierEvent::Completed {
            fire_count,
            success: matches!(outcome, Ok(Ok(()))),
        });

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                warn!("Barrier {} completion panicked", self.label());
                panic::resume_unwind(payload)
            }
        };

        match outcome {
            Ok(()) => {
                info!("Barrier {} completed (fire #{})", self.label(), fire_count);
                Ok(())
            }
            Err(err) => {
                warn!("Barrier {} completion failed: {}", self.label(), err);
                Err(BarrierError::completion(self.label(), err))
            }
        }
    }

    fn emit(&self, event: BarrierEvent) {
        if let Some(sink) = &self.event_sink {
            let envelope = BarrierEventEnvelope {
                sequence: self.event_sequence.fetch_add(1, Ordering::SeqCst),
                session_id: self.session_id.clone(),
                label: self.config.label.clone(),
                timestamp: now_ms(),
                event,
            };
            sink.emit(&envelope);
        }
    }
}
