//! Error taxonomy
//!
//! Configuration mistakes surface synchronously at registration or
//! reassignment time; nothing in the dispatch path returns an error.

use crate::association::MAX_BINDINGS;
use crate::binding::TriggerKind;
use crate::listener::ListenerKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// Binding slot index out of range
    #[error("binding slot {slot} out of range (capacity {capacity})", capacity = MAX_BINDINGS)]
    InvalidSlot { slot: usize },

    /// Listener capability and trigger kind cannot be combined, e.g. a
    /// compound listener bound to a wheel trigger
    #[error("a {listener:?} listener cannot be bound to a {trigger} trigger")]
    UnsupportedBinding {
        listener: ListenerKind,
        trigger: TriggerKind,
    },

    /// The listener has no association in this context
    #[error("listener is not registered in this context")]
    UnknownListener,

    /// The listener declined reassignment via `is_reassignable`
    #[error("control is not reassignable")]
    NotReassignable,

    /// A capture is already in progress for this context
    #[error("a binding capture is already in progress")]
    CaptureInProgress,

    /// No capture is in progress
    #[error("no binding capture is in progress")]
    NoCaptureInProgress,
}

/// Errors from the bindings persistence layer
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read bindings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse bindings file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid trigger string: {0:?}")]
    InvalidTrigger(String),

    #[error("no registered control titled {0:?}")]
    UnknownListener(String),
}
