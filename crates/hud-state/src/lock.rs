//! Edit lock: locked mode prunes empty groups and hides subtitles; unlocked
//! mode shows everything and enables the configuration dialogs.

use hud_config::FlagUpdate;
use hud_protocol::{GroupId, ViewMsg, ViewTarget};
use tracing::debug;

use crate::{Effect, GroupTree, StateError};

/// Locked/unlocked state of the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditLock {
    /// True when edit affordances are available.
    unlocked: bool,
    /// When false the HUD is permanently locked.
    customization_enabled: bool,
}

/// Push a visibility change.
fn hide(fx: &mut Vec<Effect>, target: ViewTarget, hidden: bool) {
    fx.push(ViewMsg::SetHidden { target, hidden }.into());
}

impl EditLock {
    /// Create from the persisted flag and the customization setting.
    pub fn new(unlocked: bool, customization_enabled: bool) -> Self {
        Self {
            unlocked,
            customization_enabled,
        }
    }

    /// True when unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Change the customization setting; takes effect on the next mount.
    pub fn set_customization_enabled(&mut self, enabled: bool) {
        self.customization_enabled = enabled;
    }

    /// Apply the current state to a freshly rendered tree.
    ///
    /// With customization disabled the HUD is forced locked and the unlock
    /// button hidden; a persisted unlocked flag is cleared.
    pub fn mount(&mut self, tree: &GroupTree) -> Vec<Effect> {
        let mut fx = Vec::new();
        if !self.customization_enabled {
            if self.unlocked {
                self.unlocked = false;
                fx.push(Effect::Persist(FlagUpdate::Unlocked(false)));
            }
            self.lock_effects(tree, &mut fx);
            hide(&mut fx, ViewTarget::UnlockButton, true);
        } else if self.unlocked {
            self.unlock_effects(tree, &mut fx);
        } else {
            self.lock_effects(tree, &mut fx);
        }
        fx
    }

    /// Enter locked mode.
    pub fn lock(&mut self, tree: &GroupTree) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.lock_effects(tree, &mut fx);
        if self.unlocked {
            self.unlocked = false;
            fx.push(Effect::Persist(FlagUpdate::Unlocked(false)));
        }
        debug!("hud_locked");
        fx
    }

    /// Enter unlocked mode. No effect while customization is disabled.
    pub fn unlock(&mut self, tree: &GroupTree) -> Vec<Effect> {
        let mut fx = Vec::new();
        if !self.customization_enabled {
            debug!("unlock_ignored_customization_disabled");
            return fx;
        }
        self.unlock_effects(tree, &mut fx);
        if !self.unlocked {
            self.unlocked = true;
            fx.push(Effect::Persist(FlagUpdate::Unlocked(true)));
        }
        debug!("hud_unlocked");
        fx
    }

    /// Right-click on a group: open the matching dialog when unlocked.
    pub fn context_menu(&self, tree: &GroupTree, id: &GroupId) -> Result<Vec<Effect>, StateError> {
        let info = tree
            .get(id)
            .ok_or_else(|| StateError::UnknownGroup { id: id.clone() })?;
        if !self.unlocked {
            return Ok(Vec::new());
        }
        let meta = info.meta();
        Ok(vec![if info.level == 1 {
            Effect::ShowGroupConfig(meta)
        } else {
            Effect::ShowActionConfig(meta)
        }])
    }

    /// The "edit HUD" button.
    pub fn edit_hud(&self) -> Vec<Effect> {
        if self.unlocked {
            vec![Effect::ShowHudConfig]
        } else {
            Vec::new()
        }
    }

    /// Locked view: edit buttons off, empty groups and untitled subtitles hidden.
    fn lock_effects(&self, tree: &GroupTree, fx: &mut Vec<Effect>) {
        hide(fx, ViewTarget::LockButton, true);
        hide(fx, ViewTarget::EditHudButton, true);
        hide(fx, ViewTarget::UnlockButton, false);
        fx.push(ViewMsg::SetEditable(false).into());
        for g in tree.iter() {
            if g.action_count == 0 {
                hide(fx, ViewTarget::Group(g.id.clone()), true);
            }
            if !g.is_top_level() && !g.show_title {
                hide(fx, ViewTarget::Subtitle(g.id.clone()), true);
            }
        }
    }

    /// Unlocked view: every group and subtitle shown, edit buttons on.
    fn unlock_effects(&self, tree: &GroupTree, fx: &mut Vec<Effect>) {
        for g in tree.iter() {
            hide(fx, ViewTarget::Group(g.id.clone()), false);
            if !g.is_top_level() {
                hide(fx, ViewTarget::Subtitle(g.id.clone()), false);
            }
        }
        fx.push(ViewMsg::SetEditable(true).into());
        hide(fx, ViewTarget::LockButton, false);
        hide(fx, ViewTarget::EditHudButton, false);
        hide(fx, ViewTarget::UnlockButton, true);
    }
}
