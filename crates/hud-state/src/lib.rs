//! Pure state machines behind the HUD.
//!
//! Each machine owns its state and returns a list of [`Effect`]s from every
//! transition. Nothing here performs I/O or awaits; the engine applies the
//! effects in order.

mod collapse;
mod effect;
mod error;
mod frame;
mod hovered;
mod interaction;
mod lock;
mod tree;

pub use collapse::HudCollapse;
pub use effect::Effect;
pub use error::StateError;
pub use frame::{FrameController, clamp_coordinate, infer_direction, validate_position};
pub use hovered::HoveredGroups;
pub use interaction::{GroupEvent, Interaction, OpenMode};
pub use lock::EditLock;
pub use tree::{GroupInfo, GroupTree};
