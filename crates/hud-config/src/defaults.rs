// Defaults and constants for HUD settings and user flags

use hud_protocol::Position;

// Frame placement
/// Default distance from the top of the viewport.
pub const DEFAULT_TOP: i32 = 80;
/// Default distance from the left of the viewport.
pub const DEFAULT_LEFT: i32 = 150;
/// Default frame position.
pub const DEFAULT_POSITION: Position = Position::new(DEFAULT_TOP, DEFAULT_LEFT);
/// Stored coordinates closer than this to a viewport edge are treated as stale.
pub const EDGE_MARGIN: i32 = 5;

// Scale bounds
/// Smallest accepted scale.
pub const SCALE_MIN: f32 = 0.5;
/// Largest accepted scale.
pub const SCALE_MAX: f32 = 2.0;
/// Scale used when none is configured.
pub const SCALE_DEFAULT: f32 = 1.0;

/// Delay after the last trigger before a rebuild runs.
pub const DEBOUNCE_MS: u64 = 20;

/// Maximum number of remembered open groups before the set is reset.
pub const HOVERED_CAPACITY: usize = 10;

/// Style used when none is configured.
pub const STYLE_DEFAULT: &str = "foundry-vtt";

// Serde default functions
pub(crate) const fn default_true() -> bool {
    true
}
pub(crate) const fn default_scale() -> f32 {
    SCALE_DEFAULT
}
pub(crate) const fn default_debounce_ms() -> u64 {
    DEBOUNCE_MS
}
pub(crate) fn default_style() -> String {
    STYLE_DEFAULT.to_string()
}
