use hud_config::FlagUpdate;
use hud_protocol::{GroupId, GroupMeta, ViewMsg};

/// Side effect produced by a state transition.
///
/// Transitions never perform I/O; the engine applies these in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Forward a message to the rendering adapter.
    View(ViewMsg),
    /// Size a group's flyout for the current direction and layout.
    Resize(GroupId),
    /// Write a user flag.
    Persist(FlagUpdate),
    /// Open the group configuration dialog.
    ShowGroupConfig(GroupMeta),
    /// Open the action configuration dialog.
    ShowActionConfig(GroupMeta),
    /// Open the HUD configuration dialog.
    ShowHudConfig,
}

impl From<ViewMsg> for Effect {
    fn from(msg: ViewMsg) -> Self {
        Self::View(msg)
    }
}
