//! Error handling for the hud-sim crate.

use std::{io, result};

use thiserror::Error;

/// Convenient result type for hud-sim operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while playing a scenario.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Settings, flag or scenario files failed to load.
    #[error("{}", .0.pretty())]
    Config(#[from] hud_config::Error),
    /// The engine rejected a step.
    #[error("Engine error: {0}")]
    Engine(#[from] hud_engine::Error),
    /// A step or token names a token the scenario does not define.
    #[error("Unknown token: {0}")]
    UnknownToken(String),
    /// A token or the user names an actor the scenario does not define.
    #[error("Unknown actor: {0}")]
    UnknownActor(String),
    /// Generic error for unexpected conditions.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Helper to build a generic error from an arbitrary message.
    pub fn other<M: Into<String>>(msg: M) -> Self {
        Self::Other(msg.into())
    }
}
