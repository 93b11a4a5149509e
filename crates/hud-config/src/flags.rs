//! Per-user persisted HUD state.

use std::collections::BTreeMap;

use hud_protocol::{NestId, Position};
use serde::{Deserialize, Serialize};

/// Everything the HUD persists for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserFlags {
    /// Last frame position, written on drag release and reset.
    pub position: Option<Position>,
    /// Whether the whole HUD is collapsed to its expand button.
    pub is_collapsed: bool,
    /// Whether edit affordances are unlocked.
    pub is_unlocked: bool,
    /// Collapsed state of sub-groups, keyed by path.
    pub collapsed_groups: BTreeMap<NestId, bool>,
}

impl UserFlags {
    /// Collapsed flag for a sub-group (absent means expanded).
    pub fn is_group_collapsed(&self, nest_id: &NestId) -> bool {
        self.collapsed_groups.get(nest_id).copied().unwrap_or(false)
    }

    /// Apply a single update in place.
    pub fn apply(&mut self, update: &FlagUpdate) {
        match update {
            FlagUpdate::Position(p) => self.position = Some(*p),
            FlagUpdate::Collapsed(v) => self.is_collapsed = *v,
            FlagUpdate::Unlocked(v) => self.is_unlocked = *v,
            FlagUpdate::GroupCollapsed { nest_id, collapsed } => {
                self.collapsed_groups.insert(nest_id.clone(), *collapsed);
            }
        }
    }
}

/// A single write to the user flag store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagUpdate {
    /// Persist the frame position.
    Position(Position),
    /// Persist the whole-HUD collapsed flag.
    Collapsed(bool),
    /// Persist the lock state.
    Unlocked(bool),
    /// Persist a sub-group's collapsed flag.
    GroupCollapsed {
        /// Group path.
        nest_id: NestId,
        /// New flag.
        collapsed: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_apply() {
        let mut flags = UserFlags::default();
        let melee = NestId::new("weapons_melee");
        assert!(!flags.is_group_collapsed(&melee));
        flags.apply(&FlagUpdate::GroupCollapsed {
            nest_id: melee.clone(),
            collapsed: true,
        });
        flags.apply(&FlagUpdate::Position(Position::new(200, 300)));
        flags.apply(&FlagUpdate::Unlocked(true));
        assert!(flags.is_group_collapsed(&melee));
        assert_eq!(flags.position, Some(Position::new(200, 300)));
        assert!(flags.is_unlocked);
        assert!(!flags.is_collapsed);
    }
}
