//! Whole-HUD collapse: hides every group and the button bar behind a single
//! expand button.

use hud_config::FlagUpdate;
use hud_protocol::{ViewMsg, ViewTarget};

use crate::Effect;

/// Collapsed/expanded state of the HUD frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HudCollapse {
    /// True when collapsed.
    collapsed: bool,
}

impl HudCollapse {
    /// Create from the persisted flag.
    pub fn new(collapsed: bool) -> Self {
        Self { collapsed }
    }

    /// True when collapsed.
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Apply the state to a fresh render; expanded is the rendered default.
    pub fn mount(&self) -> Vec<Effect> {
        if self.collapsed {
            Self::visibility(true)
        } else {
            Vec::new()
        }
    }

    /// Collapse the HUD.
    pub fn collapse(&mut self) -> Vec<Effect> {
        self.set(true)
    }

    /// Expand the HUD.
    pub fn expand(&mut self) -> Vec<Effect> {
        self.set(false)
    }

    /// Move to `collapsed`, persisting only a change.
    fn set(&mut self, collapsed: bool) -> Vec<Effect> {
        let mut fx = Self::visibility(collapsed);
        if self.collapsed != collapsed {
            self.collapsed = collapsed;
            fx.push(Effect::Persist(FlagUpdate::Collapsed(collapsed)));
        }
        fx
    }

    /// Visibility of the frame parts for a collapsed or expanded HUD.
    fn visibility(collapsed: bool) -> Vec<Effect> {
        [
            (ViewTarget::CollapseHudButton, collapsed),
            (ViewTarget::ExpandHudButton, !collapsed),
            (ViewTarget::GroupsArea, collapsed),
            (ViewTarget::ButtonBar, collapsed),
        ]
        .into_iter()
        .map(|(target, hidden)| ViewMsg::SetHidden { target, hidden }.into())
        .collect()
    }
}
