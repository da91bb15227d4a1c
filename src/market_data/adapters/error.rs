use thiserror::Error;

use crate::config::ConfigError;

/// Errors a websocket data handler can report to its connection driver.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Construction-time failure; the handler was never built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no handler registered for venue {0:?}")]
    UnknownVenue(String),

    /// The frame is not even a JSON object with an `event` string.
    #[error("failed to decode message envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The envelope matched but the body does not fit the declared event.
    #[error("failed to decode {kind} message: {source}")]
    Body {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unrecognized event {0:?}")]
    UnknownEvent(String),

    #[error("unexpected channel {found:?}, expected {expected:?}")]
    UnexpectedChannel { expected: &'static str, found: String },

    #[error("no ticker configured for venue symbol {0:?}")]
    UnknownSymbol(String),

    #[error("failed to encode subscription: {0}")]
    Encode(#[source] serde_json::Error),
}

impl HandlerError {
    /// True for per-frame failures that leave the handler usable.
    pub fn is_frame_error(&self) -> bool {
        !matches!(
            self,
            HandlerError::Config(_) | HandlerError::UnknownVenue(_) | HandlerError::Encode(_)
        )
    }
}
