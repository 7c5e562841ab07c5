use crate::barrier::events::EventSink;
use crate::barrier::factory::GuardFactory;
use crate::barrier::state::BarrierState;
use crate::core::config::{BarrierConfig, CounterMode};
use crate::core::errors::Result;
use std::sync::Arc;

/// Builder for barrier sessions that need more than the defaults
#[derive(Default)]
pub struct BarrierBuilder {
    config: BarrierConfig,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl BarrierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: BarrierConfig) -> Self {
        Self {
            config,
            event_sink: None,
        }
    }

    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.config.label = label.into();
        self
    }

    pub fn mode(mut self, mode: CounterMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn hardened(self) -> Self {
        self.mode(CounterMode::Hardened)
    }

    pub fn max_outstanding(mut self, max: usize) -> Self {
        self.config.max_outstanding = Some(max);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    /// Validate the configuration and create the barrier
    pub fn build<F>(self, completion: F) -> Result<GuardFactory>
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.config.validate()?;
        Ok(GuardFactory::from_state(BarrierState::new(
            self.config,
            self.event_sink,
            Box::new(completion),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::events::{BarrierEvent, BufferingEventSink};
    use crate::BarrierError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_sets_config() {
        let builder = BarrierBuilder::new()
            .label("uploads")
            .hardened()
            .max_outstanding(3);
        assert_eq!(builder.config().label, "uploads");
        assert_eq!(builder.config().mode, CounterMode::Hardened);
        assert_eq!(builder.config().max_outstanding, Some(3));
    }

    #[test]
    fn test_from_config_carries_settings_into_factory() {
        let config = BarrierConfig::hardened().with_label("imports");
        let after = BarrierBuilder::from_config(config).build(|| Ok(())).unwrap();
        assert_eq!(after.label(), "imports");
        assert_eq!(after.mode(), CounterMode::Hardened);

        let defaults = BarrierBuilder::new().build(|| Ok(())).unwrap();
        assert_eq!(defaults.mode(), CounterMode::Faithful);
        assert!(defaults.label().starts_with("barrier_"));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = BarrierBuilder::new().max_outstanding(0).build(|| Ok(()));
        assert!(matches!(result, Err(BarrierError::Configuration { .. })));
    }

    #[test]
    fn test_events_follow_lifecycle() {
        let sink = BufferingEventSink::new();
        let after = BarrierBuilder::new()
            .label("events")
            .event_sink(Arc::new(sink.clone()))
            .build(|| Ok(()))
            .unwrap();

        let g0 = after.guard().unwrap();
        let g1 = after.guard().unwrap();
        g1.invoke().unwrap();
        g0.invoke().unwrap();

        assert_eq!(
            sink.kinds(),
            vec![
                BarrierEvent::GuardIssued { guard_id: 0, pending: 1 },
                BarrierEvent::GuardIssued { guard_id: 1, pending: 2 },
                BarrierEvent::GuardInvoked { guard_id: 1, remaining: 1 },
                BarrierEvent::GuardInvoked { guard_id: 0, remaining: 0 },
                BarrierEvent::Completed { fire_count: 1, success: true },
            ]
        );

        let events = sink.get_events();
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert!(events.iter().all(|e| e.label == "events" && e.session_id == after.session_id()));
    }

    #[test]
    fn test_rejections_are_reported() {
        let sink = BufferingEventSink::new();
        let after = BarrierBuilder::new()
            .hardened()
            .event_sink(Arc::new(sink.clone()))
            .build(|| Ok(()))
            .unwrap();

        after.guard().unwrap().invoke().unwrap();
        assert!(after.guard().is_err());

        assert_eq!(
            sink.kinds().last(),
            Some(&BarrierEvent::Rejected {
                guard_id: None,
                reason: "sealed".to_string(),
            })
        );
    }
}
