// src/error.rs

/// Result type used throughout the scalecast library
pub type ScalecastResult<T> = Result<T, ScalecastError>;

/// All possible errors that can occur in the scalecast library
#[derive(thiserror::Error, Debug)]
pub enum ScalecastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A submitted sample was malformed or out of range
    #[error("Invalid metric sample: {message}")]
    InvalidSample { message: String },

    /// Not enough history to build features for the requested operation
    #[error("Insufficient history: need {needed} samples, have {have}")]
    InsufficientHistory { needed: usize, have: usize },

    /// A component has no information to offer yet (cold start)
    #[error("Not ready: {message}")]
    NotReady { message: String },

    /// Model fitting failed (singular or rank-deficient feature matrix)
    #[error("Training failed: {message}")]
    TrainingFailed { message: String },

    /// Engine is not running or has stopped
    #[error("Scalecast engine is not running: {message}")]
    EngineNotRunning { message: String },

    /// Callback execution failed
    #[error("Callback execution failed for '{operation}': {message}")]
    CallbackFailed { operation: String, message: String },

    /// Channel communication error (internal)
    #[error("Internal channel error: {message}")]
    ChannelError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Helper methods for creating common errors
impl ScalecastError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_sample<S: Into<String>>(message: S) -> Self {
        Self::InvalidSample {
            message: message.into(),
        }
    }

    pub fn insufficient_history(needed: usize, have: usize) -> Self {
        Self::InsufficientHistory { needed, have }
    }

    pub fn not_ready<S: Into<String>>(message: S) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    pub fn training_failed<S: Into<String>>(message: S) -> Self {
        Self::TrainingFailed {
            message: message.into(),
        }
    }

    pub fn engine_not_running<S: Into<String>>(message: S) -> Self {
        Self::EngineNotRunning {
            message: message.into(),
        }
    }

    pub fn callback_failed<S: Into<String>>(operation: S, message: S) -> Self {
        Self::CallbackFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// True for the "no information yet" family of errors, which callers
    /// recover from by waiting for more data.
    pub fn is_cold_start(&self) -> bool {
        matches!(
            self,
            Self::InsufficientHistory { .. } | Self::NotReady { .. }
        )
    }
}

/// Convert from channel send errors
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ScalecastError {
    fn from(error: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::ChannelError {
            message: format!("Failed to send on channel: {}", error),
        }
    }
}

/// Convert from channel receive errors
impl From<tokio::sync::oneshot::error::RecvError> for ScalecastError {
    fn from(error: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelError {
            message: format!("Failed to receive on channel: {}", error),
        }
    }
}
