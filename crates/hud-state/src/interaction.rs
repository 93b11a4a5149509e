//! Open/closed/collapsed state of the group tree and its transitions.
//!
//! Every group starts closed. Hover mode opens groups on pointer enter and
//! closes them on leave; click mode toggles them, keeping at most one
//! top-level group open. The machine records open groups in a
//! [`HoveredGroups`] set that survives rebuilds and is replayed against the
//! next tree by [`Interaction::restore`].

use std::collections::HashSet;

use hud_config::{FlagUpdate, UserFlags};
use hud_protocol::{GroupId, ViewMsg, ViewTarget};
use tracing::{debug, trace};

use crate::{Effect, GroupTree, HoveredGroups, StateError, tree::GroupInfo};

/// How groups are opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Pointer enter opens, pointer leave closes.
    #[default]
    Hover,
    /// Clicking a group button toggles it.
    Click,
}

impl OpenMode {
    /// Mode selected by the `click_open` setting.
    pub fn from_click_open(click_open: bool) -> Self {
        if click_open { Self::Click } else { Self::Hover }
    }
}

/// User input on a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    /// Pointer entered the group.
    PointerEnter(GroupId),
    /// Pointer left the group.
    PointerLeave(GroupId),
    /// The group button was clicked.
    Click(GroupId),
    /// The group was touched (touch start).
    Touch(GroupId),
    /// A sub-group title was clicked (collapse/expand).
    TitleClick(GroupId),
}

impl GroupEvent {
    /// The group this event targets.
    pub fn group(&self) -> &GroupId {
        match self {
            Self::PointerEnter(id)
            | Self::PointerLeave(id)
            | Self::Click(id)
            | Self::Touch(id)
            | Self::TitleClick(id) => id,
        }
    }
}

/// Group interaction state for the currently rendered tree.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    /// Hover or click mode.
    mode: OpenMode,
    /// Whether collapse toggles are persisted.
    customization_enabled: bool,
    /// The rendered tree.
    tree: GroupTree,
    /// Currently open groups.
    open: HashSet<GroupId>,
    /// Sub-groups whose contents are collapsed.
    collapsed: HashSet<GroupId>,
    /// Open groups remembered across rebuilds.
    hovered: HoveredGroups,
    /// True between `begin_render` and `finish_render`.
    rendering: bool,
}

impl Interaction {
    /// Create an empty machine.
    pub fn new(mode: OpenMode, customization_enabled: bool) -> Self {
        Self {
            mode,
            customization_enabled,
            ..Self::default()
        }
    }

    /// Current open mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Switch modes. Takes effect for subsequent events and the next restore.
    pub fn set_mode(&mut self, mode: OpenMode) {
        self.mode = mode;
    }

    /// Enable or disable persistence of collapse toggles.
    pub fn set_customization_enabled(&mut self, enabled: bool) {
        self.customization_enabled = enabled;
    }

    /// The rendered tree.
    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }

    /// Groups remembered as open.
    pub fn hovered(&self) -> &HoveredGroups {
        &self.hovered
    }

    /// True if `id` is open.
    pub fn is_open(&self, id: &GroupId) -> bool {
        self.open.contains(id)
    }

    /// True if the contents of `id` are collapsed.
    pub fn is_collapsed(&self, id: &GroupId) -> bool {
        self.collapsed.contains(id)
    }

    /// True while a render pass is in progress.
    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Open groups in display order.
    pub fn open_groups(&self) -> Vec<GroupId> {
        self.tree
            .iter()
            .filter(|g| self.open.contains(&g.id))
            .map(|g| g.id.clone())
            .collect()
    }

    /// Install the tree of a fresh render.
    ///
    /// The new view starts with every group closed; the hovered record is
    /// kept for [`Interaction::restore`]. Persisted collapsed flags are applied.
    pub fn begin_render(&mut self, tree: GroupTree, flags: &UserFlags) -> Vec<Effect> {
        self.rendering = true;
        self.open.clear();
        self.collapsed = tree
            .iter()
            .filter(|g| !g.is_top_level() && flags.is_group_collapsed(&g.nest_id))
            .map(|g| g.id.clone())
            .collect();
        self.tree = tree;
        self.tree
            .iter()
            .filter(|g| self.collapsed.contains(&g.id))
            .map(|g| {
                Effect::View(ViewMsg::SetCollapsed {
                    group: g.id.clone(),
                    collapsed: true,
                })
            })
            .collect()
    }

    /// End the render pass started by [`Interaction::begin_render`].
    pub fn finish_render(&mut self) {
        self.rendering = false;
    }

    /// Forget everything; used when the HUD closes.
    pub fn reset(&mut self) {
        self.tree = GroupTree::default();
        self.open.clear();
        self.collapsed.clear();
        self.hovered.clear();
        self.rendering = false;
    }

    /// Replay the open transition for every remembered group still present.
    ///
    /// Ids missing from the current tree are dropped.
    pub fn restore(&mut self) -> Vec<Effect> {
        let previous = self.hovered.take();
        let mut fx = Vec::new();
        for id in previous {
            if !self.tree.contains(&id) {
                debug!(group = %id, "restore_skip_missing");
                continue;
            }
            match self.mode {
                OpenMode::Hover => self.open(&id, &mut fx),
                OpenMode::Click => self.toggle(&id, &mut fx),
            }
        }
        fx
    }

    /// Apply a user event.
    pub fn handle(&mut self, event: &GroupEvent) -> Result<Vec<Effect>, StateError> {
        let id = event.group();
        if !self.tree.contains(id) {
            return Err(StateError::UnknownGroup { id: id.clone() });
        }
        let mut fx = Vec::new();
        match (event, self.mode) {
            (GroupEvent::PointerEnter(_), OpenMode::Hover) => self.open(id, &mut fx),
            (GroupEvent::PointerLeave(_), OpenMode::Hover) => {
                if self.rendering {
                    trace!(group = %id, "leave_ignored_while_rendering");
                } else {
                    self.close(id, &mut fx);
                }
            }
            (GroupEvent::Click(_), mode) => {
                fx.push(ViewMsg::BringToTop.into());
                if mode == OpenMode::Click {
                    self.toggle(id, &mut fx);
                }
                fx.push(ViewMsg::Blur.into());
            }
            (GroupEvent::Touch(_), OpenMode::Hover) => self.toggle(id, &mut fx),
            (GroupEvent::TitleClick(_), _) => self.toggle_collapse(id, &mut fx),
            // Click mode ignores hover, and touch arrives as a click.
            (
                GroupEvent::PointerEnter(_) | GroupEvent::PointerLeave(_) | GroupEvent::Touch(_),
                OpenMode::Click,
            ) => {}
        }
        Ok(fx)
    }

    /// Top-level groups whose contents are hidden by an earlier open sibling.
    fn hidden_contents(&self) -> HashSet<GroupId> {
        let mut hidden = HashSet::new();
        if self.mode != OpenMode::Hover {
            return hidden;
        }
        let mut earlier_open = false;
        for g in self.tree.top_level() {
            if earlier_open {
                hidden.insert(g.id.clone());
            }
            earlier_open |= self.open.contains(&g.id);
        }
        hidden
    }

    /// Emit visibility changes relative to `before`, in display order.
    fn push_visibility_changes(&self, before: &HashSet<GroupId>, fx: &mut Vec<Effect>) {
        let after = self.hidden_contents();
        for g in self.tree.top_level() {
            let now = after.contains(&g.id);
            if before.contains(&g.id) != now {
                fx.push(
                    ViewMsg::SetHidden {
                        target: ViewTarget::Contents(g.id.clone()),
                        hidden: now,
                    }
                    .into(),
                );
            }
        }
    }

    /// Open `id`: mark it, hide later siblings' contents, resize, remember.
    fn open(&mut self, id: &GroupId, fx: &mut Vec<Effect>) {
        if self.open.contains(id) {
            return;
        }
        let before = self.hidden_contents();
        self.open.insert(id.clone());
        fx.push(
            ViewMsg::SetOpen {
                group: id.clone(),
                open: true,
            }
            .into(),
        );
        self.push_visibility_changes(&before, fx);
        fx.push(Effect::Resize(id.clone()));
        self.hovered.insert(id.clone());
        trace!(group = %id, "group_open");
    }

    /// Close `id` and any open groups below it.
    fn close(&mut self, id: &GroupId, fx: &mut Vec<Effect>) {
        let before = self.hidden_contents();
        let mut closing = self.tree.descendants(id);
        closing.reverse();
        closing.push(id.clone());
        for g in closing {
            if self.open.remove(&g) {
                fx.push(
                    ViewMsg::SetOpen {
                        group: g.clone(),
                        open: false,
                    }
                    .into(),
                );
            }
            self.hovered.remove(&g);
        }
        self.push_visibility_changes(&before, fx);
        trace!(group = %id, "group_close");
    }

    /// Close `id` if open; otherwise open it, first closing other open
    /// top-level groups when `id` is top-level.
    fn toggle(&mut self, id: &GroupId, fx: &mut Vec<Effect>) {
        if self.open.contains(id) {
            self.close(id, fx);
            return;
        }
        if self.tree.get(id).is_some_and(GroupInfo::is_top_level) {
            let others: Vec<GroupId> = self
                .tree
                .top_level()
                .filter(|g| &g.id != id && self.open.contains(&g.id))
                .map(|g| g.id.clone())
                .collect();
            for other in &others {
                self.close(other, fx);
            }
        }
        self.open(id, fx);
    }

    /// Flip a sub-group's collapsed flag.
    fn toggle_collapse(&mut self, id: &GroupId, fx: &mut Vec<Effect>) {
        let Some(info) = self.tree.get(id) else {
            return;
        };
        if info.is_top_level() {
            return;
        }
        let nest_id = info.nest_id.clone();
        let collapsed = !self.collapsed.contains(id);
        if collapsed {
            self.collapsed.insert(id.clone());
        } else {
            self.collapsed.remove(id);
        }
        fx.push(
            ViewMsg::SetCollapsed {
                group: id.clone(),
                collapsed,
            }
            .into(),
        );
        if self.customization_enabled {
            fx.push(Effect::Persist(FlagUpdate::GroupCollapsed { nest_id, collapsed }));
        }
        if !collapsed
            && let Some(top) = self.tree.top_ancestor(id)
            && self.open.contains(&top.id)
        {
            fx.push(Effect::Resize(top.id.clone()));
        }
    }
}
