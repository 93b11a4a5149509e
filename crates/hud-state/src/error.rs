use hud_protocol::GroupId;
use thiserror::Error;

/// Error type for HUD state transitions
#[derive(Debug, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StateError {
    /// An event referenced a group that is not in the current tree
    #[error("Unknown group '{id}'")]
    UnknownGroup { id: GroupId },
}
