//! WolfSync Error Types

use std::fmt;

use thiserror::Error;

/// Result type alias for WolfSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfSync error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Node API errors
    #[error("HTTP request to {node} failed: {reason}")]
    Http { node: String, reason: String },

    #[error("{node} responded with {status}: {message}")]
    Api {
        node: String,
        status: u16,
        message: String,
    },

    #[error("Authentication failed for {node}: {reason}")]
    Auth { node: String, reason: String },

    // Document errors
    #[error("Type mismatch at '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Run errors
    #[error("{phase}: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the run phase it was raised in
    pub fn in_phase(self, phase: Phase) -> Self {
        Error::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// Phase of a wrapped run error, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Stage of a sync run, used to give fatal errors context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Authenticate,
    Teleporter,
    Config,
    Gravity,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Authenticate => "authenticate",
            Phase::Teleporter => "sync teleporters",
            Phase::Config => "sync configs",
            Phase::Gravity => "run gravity",
        };
        f.write_str(name)
    }
}

/// Errors raised while applying a key filter to a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("key '{0}' does not hold an object")]
    NotAnObject(String),

    #[error("filter has no keys")]
    NoKeys,
}
