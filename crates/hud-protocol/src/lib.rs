//! Shared model and view protocol for the token action HUD.
//!
//! The engine produces [`ViewMsg`] values; a thin rendering adapter applies
//! them to whatever widget tree hosts the HUD.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

mod ids;
mod tree;

pub use ids::{ActionId, ActorId, GroupId, NestId, TokenId, UserId};
pub use tree::{ActionRef, GroupNode, GroupType, HudSnapshot};

/// The actor/token currently driving the HUD's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSubject {
    /// Actor behind the HUD; `None` only for the multiple-selection sentinel.
    pub actor_id: Option<ActorId>,
    /// Token the actor is represented by, if placed.
    pub token_id: Option<TokenId>,
    /// Name shown as the HUD title.
    pub display_name: String,
    /// True when several tokens are selected and no single actor applies.
    pub is_multiple: bool,
}

impl ActiveSubject {
    /// Display name used for the multiple-selection HUD.
    pub const MULTIPLE_NAME: &'static str = "Multiple";

    /// Subject for a single actor.
    pub fn single(
        actor_id: ActorId,
        token_id: Option<TokenId>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: Some(actor_id),
            token_id,
            display_name: display_name.into(),
            is_multiple: false,
        }
    }

    /// The action-less "Multiple" sentinel.
    pub fn multiple() -> Self {
        Self {
            actor_id: None,
            token_id: None,
            display_name: Self::MULTIPLE_NAME.to_string(),
            is_multiple: true,
        }
    }
}

/// Why a rebuild was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    /// The set of controlled tokens changed.
    Selection {
        /// Tokens controlled after the change.
        tokens: Vec<TokenId>,
    },
    /// Data on an actor (or one of its items) changed.
    ActorUpdate {
        /// The changed actor.
        actor: ActorId,
    },
    /// Module settings changed.
    SettingsChanged,
    /// Explicit refresh from a command or another subsystem.
    Manual {
        /// Free-form origin, used for logging only.
        reason: String,
    },
}

impl RefreshTrigger {
    /// Convenience constructor for a manual trigger.
    pub fn manual(reason: impl Into<String>) -> Self {
        Self::Manual {
            reason: reason.into(),
        }
    }

    /// True for selection changes.
    pub fn is_selection(&self) -> bool {
        matches!(self, Self::Selection { .. })
    }
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selection { tokens } => write!(f, "selection({})", tokens.len()),
            Self::ActorUpdate { actor } => write!(f, "actor_update({actor})"),
            Self::SettingsChanged => f.write_str("settings_changed"),
            Self::Manual { reason } => write!(f, "manual({reason})"),
        }
    }
}

/// Direction in which group flyouts expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Flyouts open above the button bar.
    Up,
    /// Flyouts open below the button bar.
    #[default]
    Down,
}

/// Configured expansion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectionSetting {
    /// Always expand upward.
    Up,
    /// Always expand downward.
    #[default]
    Down,
    /// Pick from the frame position.
    Auto,
}

/// Frame position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Distance from the top of the viewport.
    pub top: i32,
    /// Distance from the left of the viewport.
    pub left: i32,
}

impl Position {
    /// Construct a position.
    pub const fn new(top: i32, left: i32) -> Self {
        Self { top, left }
    }
}

/// Visible area of the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

/// Pointer coordinates (mouse or first touch point), in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Construct a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Button used to trigger an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    /// Primary click.
    #[default]
    Left,
    /// Secondary click (context menu).
    Right,
    /// Middle click.
    Middle,
}

/// The interaction that triggered an action, forwarded to the roll dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionEvent {
    /// Which button was used.
    pub button: PointerButton,
    /// Shift held.
    #[serde(default)]
    pub shift: bool,
    /// Control held.
    #[serde(default)]
    pub ctrl: bool,
    /// Alt held.
    #[serde(default)]
    pub alt: bool,
}

/// Metadata passed to the group/action configuration dialogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMeta {
    /// Path of the group being configured.
    pub nest_id: NestId,
    /// Display name.
    pub name: String,
    /// Level of the group.
    pub level: u32,
    /// Group type.
    #[serde(rename = "type")]
    pub kind: GroupType,
}

impl From<&GroupNode> for GroupMeta {
    fn from(g: &GroupNode) -> Self {
        Self {
            nest_id: g.nest_id.clone(),
            name: g.name.clone(),
            level: g.level,
            kind: g.kind,
        }
    }
}

/// Element of the rendered HUD whose visibility the engine controls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewTarget {
    /// A whole group (button plus contents).
    Group(GroupId),
    /// The flyout contents of a group, leaving its button visible.
    Contents(GroupId),
    /// The title row of a sub-group.
    Subtitle(GroupId),
    /// The character name label.
    CharacterName,
    /// The container of all groups.
    GroupsArea,
    /// The bar holding the lock/edit/collapse buttons.
    ButtonBar,
    /// The "unlock" button.
    UnlockButton,
    /// The "lock" button.
    LockButton,
    /// The "edit HUD" button.
    EditHudButton,
    /// The "collapse HUD" button.
    CollapseHudButton,
    /// The "expand HUD" button.
    ExpandHudButton,
}

/// Messages sent from the engine to the rendering adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMsg {
    /// Replace the rendered HUD with a new snapshot.
    Render {
        /// The snapshot to draw.
        snapshot: Arc<HudSnapshot>,
        /// Scale factor, already clamped.
        scale: f32,
        /// Style name.
        style: String,
    },
    /// Remove the HUD from the screen.
    Close,
    /// Mark a group open (hover class) or closed.
    SetOpen {
        /// Target group.
        group: GroupId,
        /// New state.
        open: bool,
    },
    /// Show or hide an element.
    SetHidden {
        /// Element to change.
        target: ViewTarget,
        /// True to hide.
        hidden: bool,
    },
    /// Collapse or expand a sub-group's contents in place.
    SetCollapsed {
        /// Target group.
        group: GroupId,
        /// True when collapsed.
        collapsed: bool,
    },
    /// Enable or disable edit affordances (right-click customization).
    SetEditable(bool),
    /// Apply the expansion direction to all group containers.
    SetDirection(Direction),
    /// Move the frame.
    MoveFrame(Position),
    /// Ask for an animation-frame callback to flush pending frame moves.
    RequestAnimationFrame,
    /// Clear focus from the control that was just used.
    Blur,
    /// Raise the HUD above other overlays.
    BringToTop,
}

/// Channel helpers between the engine and the rendering adapter.
pub mod ipc {
    use super::ViewMsg;

    /// Tokio unbounded sender for view messages.
    pub type ViewTx = tokio::sync::mpsc::UnboundedSender<ViewMsg>;
    /// Tokio unbounded receiver for view messages.
    pub type ViewRx = tokio::sync::mpsc::UnboundedReceiver<ViewMsg>;

    /// Create a standard unbounded view channel (sender, receiver).
    pub fn view_channel() -> (ViewTx, ViewRx) {
        tokio::sync::mpsc::unbounded_channel::<ViewMsg>()
    }
}
