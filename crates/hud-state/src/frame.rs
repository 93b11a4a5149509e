//! Frame placement: stored-position validation, pointer dragging coalesced
//! to animation frames, and expansion-direction inference.

use hud_config::{FlagUpdate, defaults};
use hud_protocol::{Direction, DirectionSetting, Point, Position, ViewMsg, ViewTarget, Viewport};
use tracing::{debug, trace};

use crate::Effect;

/// Validate one stored coordinate against the viewport extent on that axis.
///
/// Values within [`defaults::EDGE_MARGIN`] of either edge are stale and
/// replaced by `fallback`.
pub fn clamp_coordinate(value: i32, extent: i32, fallback: i32) -> i32 {
    if value < defaults::EDGE_MARGIN || value > extent.saturating_sub(defaults::EDGE_MARGIN) {
        fallback
    } else {
        value
    }
}

/// Validate a stored position, replacing stale coordinates with defaults.
pub fn validate_position(stored: Option<Position>, viewport: Viewport) -> Position {
    let Some(p) = stored else {
        return defaults::DEFAULT_POSITION;
    };
    let validated = Position {
        top: clamp_coordinate(p.top, viewport.height, defaults::DEFAULT_TOP),
        left: clamp_coordinate(p.left, viewport.width, defaults::DEFAULT_LEFT),
    };
    if validated != p {
        debug!(?p, ?validated, "stale_position_replaced");
    }
    validated
}

/// Expansion direction for a frame at `position`.
pub fn infer_direction(
    setting: DirectionSetting,
    position: Position,
    viewport: Viewport,
) -> Direction {
    match setting {
        DirectionSetting::Up => Direction::Up,
        DirectionSetting::Down => Direction::Down,
        DirectionSetting::Auto if i64::from(position.top) * 2 > i64::from(viewport.height) => {
            Direction::Up
        }
        DirectionSetting::Auto => Direction::Down,
    }
}

/// An in-progress drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragSession {
    /// Pointer position at the previous move.
    last_pointer: Point,
    /// Frame position when the drag began.
    start: Position,
    /// True when a move is waiting for the next animation frame.
    dirty: bool,
    /// True once a move has reached the view.
    shown: bool,
}

/// Position and direction of the HUD frame.
#[derive(Debug, Clone)]
pub struct FrameController {
    /// Current frame position.
    position: Position,
    /// Configured direction.
    setting: DirectionSetting,
    /// Whether dragging is enabled.
    drag_enabled: bool,
    /// Current viewport.
    viewport: Viewport,
    /// Active drag, if any.
    drag: Option<DragSession>,
    /// True while an animation frame request is outstanding.
    frame_requested: bool,
}

impl FrameController {
    /// Create a controller at the default position.
    pub fn new(setting: DirectionSetting, drag_enabled: bool, viewport: Viewport) -> Self {
        Self {
            position: defaults::DEFAULT_POSITION,
            setting,
            drag_enabled,
            viewport,
            drag: None,
            frame_requested: false,
        }
    }

    /// Current frame position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Current expansion direction.
    pub fn direction(&self) -> Direction {
        infer_direction(self.setting, self.position, self.viewport)
    }

    /// True while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Update settings-derived behavior.
    pub fn configure(&mut self, setting: DirectionSetting, drag_enabled: bool) {
        self.setting = setting;
        self.drag_enabled = drag_enabled;
    }

    /// Update the viewport used for validation and direction inference.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Place the frame at the validated stored position.
    pub fn mount(&mut self, stored: Option<Position>) -> Vec<Effect> {
        self.position = validate_position(stored, self.viewport);
        let mut fx = vec![ViewMsg::MoveFrame(self.position).into()];
        self.push_direction(&mut fx);
        fx
    }

    /// Start a drag at `pointer`. Returns false when dragging is disabled.
    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        if !self.drag_enabled {
            return false;
        }
        self.drag = Some(DragSession {
            last_pointer: pointer,
            start: self.position,
            dirty: false,
            shown: false,
        });
        trace!(?pointer, "drag_begin");
        true
    }

    /// Apply a pointer move; at most one animation frame is requested per flush.
    pub fn pointer_move(&mut self, pointer: Point) -> Vec<Effect> {
        let Some(drag) = self.drag.as_mut() else {
            return Vec::new();
        };
        let dx = pointer.x.saturating_sub(drag.last_pointer.x);
        let dy = pointer.y.saturating_sub(drag.last_pointer.y);
        drag.last_pointer = pointer;
        self.position.top = self.position.top.saturating_add(dy);
        self.position.left = self.position.left.saturating_add(dx);
        drag.dirty = true;
        if self.frame_requested {
            return Vec::new();
        }
        self.frame_requested = true;
        vec![ViewMsg::RequestAnimationFrame.into()]
    }

    /// Animation frame callback: flush the pending move.
    pub fn animation_frame(&mut self) -> Vec<Effect> {
        self.frame_requested = false;
        match self.drag.as_mut() {
            Some(drag) if drag.dirty => {
                drag.dirty = false;
                drag.shown = true;
                vec![ViewMsg::MoveFrame(self.position).into()]
            }
            _ => Vec::new(),
        }
    }

    /// Finish the drag, persisting the new position if it moved.
    pub fn end_drag(&mut self) -> Vec<Effect> {
        let Some(drag) = self.drag.take() else {
            return Vec::new();
        };
        self.frame_requested = false;
        if drag.start == self.position {
            trace!("drag_end_unchanged");
            if drag.shown {
                return vec![ViewMsg::MoveFrame(self.position).into()];
            }
            return Vec::new();
        }
        let mut fx = Vec::new();
        if drag.dirty {
            fx.push(ViewMsg::MoveFrame(self.position).into());
        }
        self.push_direction(&mut fx);
        fx.push(Effect::Persist(FlagUpdate::Position(self.position)));
        debug!(position = ?self.position, "drag_end");
        fx
    }

    /// Move back to the default position and persist it.
    pub fn reset_position(&mut self) -> Vec<Effect> {
        self.drag = None;
        self.frame_requested = false;
        self.position = defaults::DEFAULT_POSITION;
        let mut fx = vec![ViewMsg::MoveFrame(self.position).into()];
        self.push_direction(&mut fx);
        fx.push(Effect::Persist(FlagUpdate::Position(self.position)));
        fx
    }

    /// Direction class plus character-name visibility.
    fn push_direction(&self, fx: &mut Vec<Effect>) {
        let direction = self.direction();
        fx.push(ViewMsg::SetDirection(direction).into());
        fx.push(
            ViewMsg::SetHidden {
                target: ViewTarget::CharacterName,
                hidden: direction == Direction::Up,
            }
            .into(),
        );
    }
}
