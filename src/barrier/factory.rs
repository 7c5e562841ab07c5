use crate::barrier::guard::Guard;
use crate::barrier::state::{BarrierState, BarrierStats};
use crate::core::config::{BarrierConfig, CounterMode};
use crate::core::errors::Result;
use std::sync::Arc;

/// Create a barrier that runs `completion` once every guard issued by the
/// returned factory has been invoked.
///
/// Uses the default configuration: faithful counter semantics, no limit on
/// outstanding guards.
///
/// ```
/// use allset::create_barrier;
///
/// let after = create_barrier(|| {
///     println!("done");
///     Ok(())
/// });
/// let first = after.guard()?;
/// let second = after.guard()?;
/// first.invoke()?;
/// second.invoke()?;
/// assert_eq!(after.fire_count(), 1);
/// # Ok::<(), allset::BarrierError>(())
/// ```
pub fn create_barrier<F>(completion: F) -> GuardFactory
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    GuardFactory::from_state(BarrierState::new(
        BarrierConfig::default(),
        None,
        Box::new(completion),
    ))
}

/// Like [`create_barrier`], with an explicit configuration.
pub fn create_barrier_with_config<F>(config: BarrierConfig, completion: F) -> Result<GuardFactory>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    config.validate()?;
    Ok(GuardFactory::from_state(BarrierState::new(
        config,
        None,
        Box::new(completion),
    )))
}

/// Issues guards for one barrier session. Clones share the session.
#[derive(Debug, Clone)]
pub struct GuardFactory {
    state: Arc<BarrierState>,
}

impl GuardFactory {
    pub(crate) fn from_state(state: BarrierState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Issue a new guard, incrementing the pending count before returning.
    pub fn guard(&self) -> Result<Guard> {
        let id = self.state.issue()?;
        Ok(Guard::new(id, self.state.clone()))
    }

    pub fn session_id(&self) -> &str {
        self.state.session_id()
    }

    pub fn label(&self) -> &str {
        self.state.label()
    }

    pub fn mode(&self) -> CounterMode {
        self.state.mode()
    }

    /// Guards issued minus invocations; negative after over-invocation
    pub fn pending(&self) -> isize {
        self.state.pending()
    }

    /// Guards issued over the session's lifetime
    pub fn issued(&self) -> u64 {
        self.state.issued()
    }

    /// Guard invocations over the session's lifetime, including repeats
    pub fn invoked(&self) -> u64 {
        self.state.invoked()
    }

    pub fn fire_count(&self) -> u64 {
        self.state.fire_count()
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn stats(&self) -> BarrierStats {
        self.state.stats()
    }

    /// Resolves once the completion has run at least once.
    ///
    /// Never resolves if a guard is never invoked; wrap in
    /// `tokio::time::timeout` when a deadline is needed.
    pub async fn completed(&self) {
        let mut fired = self.state.subscribe();
        // The sender lives in the state this factory keeps alive.
        let _ = fired.wait_for(|count| *count > 0).await;
    }
}
