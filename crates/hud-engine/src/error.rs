use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the HUD engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The action source could not build a tree.
    #[error("Action source error: {0}")]
    ActionSource(String),

    /// The roll dispatcher rejected an action.
    #[error("Roll dispatch error: {0}")]
    Dispatch(String),

    /// Settings could not be read or written.
    #[error(transparent)]
    Config(#[from] hud_config::Error),

    /// A state transition was rejected.
    #[error(transparent)]
    State(#[from] hud_state::StateError),

    /// The view channel has been closed by the receiver.
    #[error("View channel closed")]
    ChannelClosed,

    /// Generic error with context.
    #[error("Engine error: {0}")]
    Msg(String),
}
