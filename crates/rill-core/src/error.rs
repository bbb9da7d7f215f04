//! Error types carried on the observable error channel

use thiserror::Error;

/// Errors delivered through `Observer::error`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    // Upstream / user errors
    #[error("{0}")]
    Message(String),

    // Guarded user code
    #[error("projection panicked: {0}")]
    ProjectionPanicked(String),

    #[error("predicate panicked: {0}")]
    PredicatePanicked(String),

    // Timer errors
    #[error("Scheduler closed")]
    SchedulerClosed,
}

impl StreamError {
    /// Build a plain message error
    pub fn msg(message: impl Into<String>) -> Self {
        StreamError::Message(message.into())
    }

    /// Is this error the result of a panic in user-supplied code?
    pub fn is_panic(&self) -> bool {
        matches!(
            self,
            StreamError::ProjectionPanicked(_) | StreamError::PredicatePanicked(_)
        )
    }
}

impl From<String> for StreamError {
    fn from(message: String) -> Self {
        StreamError::Message(message)
    }
}

impl From<&str> for StreamError {
    fn from(message: &str) -> Self {
        StreamError::Message(message.to_owned())
    }
}

/// Result type for fallible user code and host collaborators
pub type StreamResult<T> = Result<T, StreamError>;

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
