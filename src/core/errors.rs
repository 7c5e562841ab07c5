use thiserror::Error;

/// Unified error type for barrier sessions
#[derive(Debug, Error)]
pub enum BarrierError {
    /// The completion callback returned an error while firing
    #[error("Completion failed for barrier {label}")]
    Completion {
        label: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A single-use guard was invoked a second time
    #[error("Guard {guard_id} of barrier {label} was already invoked")]
    GuardReused { label: String, guard_id: u64 },

    /// The barrier already completed and accepts no new guards
    #[error("Barrier {label} is sealed: completion already fired")]
    Sealed { label: String },

    /// Resource exhaustion errors
    #[error("Resource exhausted: {resource} (current: {current}, limit: {limit})")]
    ResourceExhaustion {
        resource: String,
        current: u64,
        limit: u64,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Concurrency errors (re-entrant completion and the like)
    #[error("Concurrency error: {operation}")]
    Concurrency { operation: String },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BarrierError {
    /// Wrap an error raised by a completion callback
    pub fn completion<S: Into<String>>(label: S, source: anyhow::Error) -> Self {
        Self::Completion {
            label: label.into(),
            source: source.into(),
        }
    }

    pub fn guard_reused<S: Into<String>>(label: S, guard_id: u64) -> Self {
        Self::GuardReused {
            label: label.into(),
            guard_id,
        }
    }

    pub fn sealed<S: Into<String>>(label: S) -> Self {
        Self::Sealed {
            label: label.into(),
        }
    }

    /// Create a resource exhaustion error
    pub fn resource_exhausted<S: Into<String>>(resource: S, current: u64, limit: u64) -> Self {
        Self::ResourceExhaustion {
            resource: resource.into(),
            current,
            limit,
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error pointing at a field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a concurrency error
    pub fn concurrency<S: Into<String>>(operation: S) -> Self {
        Self::Concurrency {
            operation: operation.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Outstanding guards may drain and free up room
            Self::ResourceExhaustion { .. } => true,
            Self::Concurrency { .. } => true,
            Self::Completion { .. } => false,
            Self::GuardReused { .. } | Self::Sealed { .. } => false,
            Self::Configuration { .. } | Self::Serialization { .. } => false,
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Completion { .. } => "completion",
            Self::GuardReused { .. } => "guard_reused",
            Self::Sealed { .. } => "sealed",
            Self::ResourceExhaustion { .. } => "resource",
            Self::Configuration { .. } => "configuration",
            Self::Concurrency { .. } => "concurrency",
            Self::Serialization { .. } => "serialization",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BarrierError>;

impl From<serde_json::Error> for BarrierError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

impl From<serde_yaml::Error> for BarrierError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}
