//! The hierarchical action tree produced by an action source.

use serde::{Deserialize, Serialize};

use crate::{ActionId, ActorId, GroupId, NestId, TokenId};

/// Origin of a group in the action tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    /// Provided by the game system.
    #[default]
    System,
    /// Derived from system data (for example one group per item type).
    SystemDerived,
    /// Created by the user while customizing the HUD.
    Custom,
}

/// A leaf action shown inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    /// Identifier handed to the roll dispatcher.
    pub id: ActionId,
    /// Display name.
    pub name: String,
}

impl ActionRef {
    /// Create an action reference.
    pub fn new(id: impl Into<ActionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A node in the action tree: a category, sub-category, or list of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    /// View identifier derived from `nest_id`.
    pub id: GroupId,
    /// Stable path from the root.
    pub nest_id: NestId,
    /// Display name.
    pub name: String,
    /// Depth in the tree, 1 for top-level groups.
    pub level: u32,
    /// Where the group came from.
    #[serde(rename = "type")]
    pub kind: GroupType,
    /// Nested groups in display order.
    pub children: Vec<Self>,
    /// Actions in display order.
    pub actions: Vec<ActionRef>,
    /// Whether the group title is displayed when the HUD is locked.
    pub show_title: bool,
}

impl GroupNode {
    /// Create an empty group at `nest_id`; `id` and `level` are derived from the path.
    pub fn new(nest_id: NestId, name: impl Into<String>) -> Self {
        Self {
            id: nest_id.group_id(),
            level: nest_id.level(),
            nest_id,
            name: name.into(),
            kind: GroupType::default(),
            children: Vec::new(),
            actions: Vec::new(),
            show_title: true,
        }
    }

    /// Builder: set the group type.
    pub fn with_kind(mut self, kind: GroupType) -> Self {
        self.kind = kind;
        self
    }

    /// Builder: append an action.
    pub fn with_action(mut self, action: ActionRef) -> Self {
        self.actions.push(action);
        self
    }

    /// Builder: append a child group.
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: set whether the title is shown while locked.
    pub fn with_show_title(mut self, show: bool) -> Self {
        self.show_title = show;
        self
    }

    /// Number of actions in this group and every group below it.
    pub fn action_count(&self) -> usize {
        self.actions.len()
            + self
                .children
                .iter()
                .map(Self::action_count)
                .sum::<usize>()
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// The tree produced by one successful rebuild.
///
/// Snapshots are immutable; the engine replaces the whole value on every
/// rebuild rather than patching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HudSnapshot {
    /// Actor the tree was built for (`None` for the multiple-selection HUD).
    pub actor_id: Option<ActorId>,
    /// Token the tree was built for, if any.
    pub token_id: Option<TokenId>,
    /// Name shown above the groups.
    pub character_name: String,
    /// Top-level groups in display order.
    pub groups: Vec<GroupNode>,
}

impl HudSnapshot {
    /// True when there is nothing to display.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Visit every group depth-first in display order.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a GroupNode)) {
        for group in &self.groups {
            group.walk(&mut visit);
        }
    }

    /// Find a group by its view identifier.
    pub fn find(&self, id: &GroupId) -> Option<&GroupNode> {
        let mut found = None;
        self.walk(|g| {
            if found.is_none() && &g.id == id {
                found = Some(g);
            }
        });
        found
    }

    /// Total number of groups at every level.
    pub fn group_count(&self) -> usize {
        let mut n = 0;
        self.walk(|_| n += 1);
        n
    }
}
