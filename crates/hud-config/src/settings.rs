//! World-level HUD settings (feature toggles).

use hud_protocol::DirectionSetting;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    SCALE_MAX, SCALE_MIN, default_debounce_ms, default_scale, default_style, default_true,
};

/// Permission level of a user in the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular player.
    #[default]
    Player,
    /// Trusted player.
    Trusted,
    /// Assistant game master.
    Assistant,
    /// Game master.
    Gamemaster,
}

/// Feature toggles read by the engine on every rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Master switch for the HUD.
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Fall back to the user's default character when nothing is selected.
    #[serde(default)]
    pub always_show: bool,
    /// Open groups by clicking rather than hovering.
    #[serde(default)]
    pub click_open: bool,
    /// Allow unlocking the HUD for customization.
    #[serde(default = "default_true")]
    pub customization_enabled: bool,
    /// Show action icons.
    #[serde(default = "default_true")]
    pub display_icons: bool,
    /// Allow dragging the frame.
    #[serde(default = "default_true")]
    pub drag: bool,
    /// Lay out actions in a grid.
    #[serde(default)]
    pub grid: bool,
    /// Flyout expansion direction.
    #[serde(default)]
    pub direction: DirectionSetting,
    /// Raw scale as configured; read through [`Settings::clamped_scale`].
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Visual style name.
    #[serde(default = "default_style")]
    pub style: String,
    /// Debounce window for rebuilds, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Lowest role allowed to see the HUD.
    #[serde(default)]
    pub min_role: Role,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable: true,
            always_show: false,
            click_open: false,
            customization_enabled: true,
            display_icons: true,
            drag: true,
            grid: false,
            direction: DirectionSetting::default(),
            scale: default_scale(),
            style: default_style(),
            debounce_ms: default_debounce_ms(),
            min_role: Role::default(),
        }
    }
}

impl Settings {
    /// Scale clamped to the supported range; non-finite values fall back to 1.
    pub fn clamped_scale(&self) -> f32 {
        if self.scale.is_finite() {
            self.scale.clamp(SCALE_MIN, SCALE_MAX)
        } else {
            default_scale()
        }
    }

    /// Whether the HUD should be shown at all for a user with `role`.
    pub fn hud_enabled_for(&self, role: Role) -> bool {
        if !self.enable {
            return false;
        }
        role >= self.min_role
    }
}
