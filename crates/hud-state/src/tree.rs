//! Flattened group tree with parent links, built once per snapshot.

use std::collections::HashMap;

use hud_protocol::{GroupId, GroupMeta, GroupNode, GroupType, HudSnapshot, NestId};

/// One group in a [`GroupTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// View identifier.
    pub id: GroupId,
    /// Stable path.
    pub nest_id: NestId,
    /// Display name.
    pub name: String,
    /// Depth, 1 for top-level groups.
    pub level: u32,
    /// Group type.
    pub kind: GroupType,
    /// Whether the title stays visible while locked.
    pub show_title: bool,
    /// Actions in this group and all groups below it.
    pub action_count: usize,
    /// Index of the parent group.
    parent: Option<usize>,
    /// Indices of child groups in display order.
    children: Vec<usize>,
}

impl GroupInfo {
    /// True for groups directly in the button bar.
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Dialog metadata for this group.
    pub fn meta(&self) -> GroupMeta {
        GroupMeta {
            nest_id: self.nest_id.clone(),
            name: self.name.clone(),
            level: self.level,
            kind: self.kind,
        }
    }
}

/// Group hierarchy indexed by id, independent of any rendering.
#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    /// Groups in depth-first display order.
    nodes: Vec<GroupInfo>,
    /// Id to node index.
    index: HashMap<GroupId, usize>,
    /// Indices of top-level groups in display order.
    roots: Vec<usize>,
}

impl GroupTree {
    /// Flatten a snapshot.
    pub fn from_snapshot(snapshot: &HudSnapshot) -> Self {
        let mut tree = Self::default();
        for group in &snapshot.groups {
            let idx = tree.push(group, None);
            tree.roots.push(idx);
        }
        tree
    }

    /// Append `node` and its descendants, returning the node's index.
    fn push(&mut self, node: &GroupNode, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(GroupInfo {
            id: node.id.clone(),
            nest_id: node.nest_id.clone(),
            name: node.name.clone(),
            level: node.level,
            kind: node.kind,
            show_title: node.show_title,
            action_count: node.action_count(),
            parent,
            children: Vec::new(),
        });
        self.index.insert(node.id.clone(), idx);
        for child in &node.children {
            let c = self.push(child, Some(idx));
            self.nodes[idx].children.push(c);
        }
        idx
    }

    /// Look up a group.
    pub fn get(&self, id: &GroupId) -> Option<&GroupInfo> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// True when `id` is in the tree.
    pub fn contains(&self, id: &GroupId) -> bool {
        self.index.contains_key(id)
    }

    /// All groups in depth-first display order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupInfo> {
        self.nodes.iter()
    }

    /// Top-level groups in display order.
    pub fn top_level(&self) -> impl Iterator<Item = &GroupInfo> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    /// Parent of `id`, if it is nested.
    pub fn parent(&self, id: &GroupId) -> Option<&GroupInfo> {
        let idx = *self.index.get(id)?;
        self.nodes[idx].parent.map(|p| &self.nodes[p])
    }

    /// The top-level group containing `id` (itself when top-level).
    pub fn top_ancestor(&self, id: &GroupId) -> Option<&GroupInfo> {
        let mut idx = *self.index.get(id)?;
        while let Some(p) = self.nodes[idx].parent {
            idx = p;
        }
        Some(&self.nodes[idx])
    }

    /// Ids of every group strictly below `id`, depth-first.
    pub fn descendants(&self, id: &GroupId) -> Vec<GroupId> {
        let mut out = Vec::new();
        let Some(&start) = self.index.get(id) else {
            return out;
        };
        let mut stack: Vec<usize> = self.nodes[start].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(self.nodes[i].id.clone());
            stack.extend(self.nodes[i].children.iter().rev());
        }
        out
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds no groups.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
