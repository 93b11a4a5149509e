//! Scenario files: a scripted scene plus the steps to play against it.
//!
//! Scenarios are RON documents. Group paths in steps use the same
//! underscore-joined form as the tree itself, e.g. `"weapons_melee"`.

use std::{collections::HashSet, path::Path};

use hud_config::{Role, Settings, UserFlags, validate_settings};
use hud_protocol::{ActionEvent, ActionRef, GroupNode, NestId, Point, Viewport};
use serde::Deserialize;

use crate::error::{Error, Result};

/// A complete scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Module settings at startup.
    #[serde(default)]
    pub settings: Settings,
    /// User flags at startup; ignored when `--flags` points at a file.
    #[serde(default)]
    pub flags: UserFlags,
    /// The acting user.
    pub user: UserSpec,
    /// Actors and the groups their action source produces.
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
    /// Tokens placed on the canvas.
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    /// Visible area.
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,
    /// Steps, played in order.
    pub steps: Vec<Step>,
}

/// The acting user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSpec {
    /// User id; actors list it in `owners` to grant control.
    pub id: String,
    /// Permission role.
    #[serde(default)]
    pub role: Role,
    /// Actor id of the assigned default character.
    #[serde(default)]
    pub character: Option<String>,
}

/// An actor and its action tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorSpec {
    /// Actor id.
    pub id: String,
    /// Actor name.
    pub name: String,
    /// User ids with owner permission.
    #[serde(default)]
    pub owners: Vec<String>,
    /// Top-level groups.
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// A group in an actor's tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    /// Path segment; joined with the parent's path to form the nest id.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Actions as `(id, name)` pairs.
    #[serde(default)]
    pub actions: Vec<(String, String)>,
    /// Nested groups.
    #[serde(default)]
    pub groups: Vec<Self>,
    /// Show the title while locked.
    #[serde(default = "default_true")]
    pub show_title: bool,
}

/// A token on the canvas.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSpec {
    /// Token id.
    pub id: String,
    /// Token name; empty falls back to the actor name.
    #[serde(default)]
    pub name: String,
    /// Actor id behind the token.
    #[serde(default)]
    pub actor: Option<String>,
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Step {
    /// Replace the controlled tokens and fire a selection trigger.
    Select(Vec<String>),
    /// A token changed; rebuild if it is relevant to the HUD.
    TokenUpdate(String),
    /// An actor changed; rebuild if it is the displayed actor.
    ActorUpdate(String),
    /// Manual refresh.
    Refresh,
    /// Save new settings and notify the engine.
    Configure(Settings),
    /// Toggle the master switch.
    ToggleEnabled,
    /// Pointer entered a group.
    Enter(String),
    /// Pointer left a group.
    Leave(String),
    /// Click on a group button.
    Click(String),
    /// Touch on a group button.
    Touch(String),
    /// Click on a sub-group title.
    Title(String),
    /// Right-click on a group button.
    ContextMenu(String),
    /// Trigger an action.
    Action {
        /// Action id.
        id: String,
        /// Button and modifiers.
        #[serde(default)]
        event: ActionEvent,
    },
    /// Lock the HUD.
    Lock,
    /// Unlock the HUD.
    Unlock,
    /// Open the edit-HUD dialog.
    EditHud,
    /// Open the HUD configuration dialog.
    HudConfig,
    /// Collapse the whole HUD.
    Collapse,
    /// Expand the whole HUD.
    Expand,
    /// Drag the frame handle from one point to another.
    Drag {
        /// Press location.
        from: Point,
        /// Release location.
        to: Point,
    },
    /// Restore the default frame position.
    ResetPosition,
    /// Clear the acting user's layout and flags.
    ResetUserData,
    /// Clear every user's layout and the acting user's flags.
    ResetAllUserData,
    /// Clear the displayed actor's layout.
    ResetActorData,
    /// Clear every actor's layout.
    ResetAllActorData,
    /// Reset user data and the frame position.
    Reset,
    /// Copy one user's layout onto others.
    CopyUserData {
        /// Source user id.
        from: String,
        /// Target user ids.
        to: Vec<String>,
    },
    /// Sleep for this many milliseconds.
    Wait(u64),
}

/// Default viewport for scenarios that do not declare one.
fn default_viewport() -> Viewport {
    Viewport {
        width: 1920,
        height: 1080,
    }
}

/// Serde default for flags that start enabled.
fn default_true() -> bool {
    true
}

impl GroupSpec {
    /// Convert to a tree node below `parent`.
    pub fn to_node(&self, parent: Option<&NestId>) -> GroupNode {
        let nest_id = parent.map_or_else(|| NestId::new(&self.key), |p| p.child(&self.key));
        let mut node = GroupNode::new(nest_id.clone(), &self.name).with_show_title(self.show_title);
        for (id, name) in &self.actions {
            node = node.with_action(ActionRef::new(id.as_str(), name.as_str()));
        }
        for child in &self.groups {
            node = node.with_child(child.to_node(Some(&nest_id)));
        }
        node
    }
}

impl Scenario {
    /// Parse a scenario from RON source.
    pub fn parse(source: &str, path: Option<&Path>) -> Result<Self> {
        let scenario: Self = hud_config::parse_ron(source, path)?;
        scenario.validate(path)?;
        Ok(scenario)
    }

    /// Load and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let scenario: Self = hud_config::load_ron_from_path(path)?;
        scenario.validate(Some(path))?;
        Ok(scenario)
    }

    /// Check settings and cross-references between users, actors, tokens and steps.
    pub fn validate(&self, path: Option<&Path>) -> Result<()> {
        validate_settings(&self.settings, path)?;
        let actors: HashSet<&str> = self.actors.iter().map(|a| a.id.as_str()).collect();
        let tokens: HashSet<&str> = self.tokens.iter().map(|t| t.id.as_str()).collect();
        let known_actor = |id: &str| {
            if actors.contains(id) {
                Ok(())
            } else {
                Err(Error::UnknownActor(id.to_string()))
            }
        };
        let known_token = |id: &str| {
            if tokens.contains(id) {
                Ok(())
            } else {
                Err(Error::UnknownToken(id.to_string()))
            }
        };

        if let Some(c) = &self.user.character {
            known_actor(c)?;
        }
        for t in &self.tokens {
            if let Some(a) = &t.actor {
                known_actor(a)?;
            }
        }
        for step in &self.steps {
            match step {
                Step::Select(ids) => ids.iter().try_for_each(|id| known_token(id))?,
                Step::TokenUpdate(id) => known_token(id)?,
                Step::ActorUpdate(id) => known_actor(id)?,
                Step::Configure(settings) => validate_settings(settings, path)?,
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEAPONS: &str = include_str!("../scenarios/weapons.ron");

    #[test]
    fn bundled_scenario_parses() {
        let s = Scenario::parse(WEAPONS, None).unwrap();
        assert_eq!(s.user.id, "u1");
        assert_eq!(s.actors.len(), 1);
        assert!(matches!(s.steps.first(), Some(Step::Select(ids)) if ids == &["T1"]));
        assert!(s.steps.contains(&Step::Enter("weapons".into())));
    }

    #[test]
    fn group_spec_builds_nested_paths() {
        let spec = GroupSpec {
            key: "weapons".into(),
            name: "Weapons".into(),
            actions: vec![("sword".into(), "Sword".into())],
            groups: vec![GroupSpec {
                key: "melee".into(),
                name: "Melee".into(),
                actions: Vec::new(),
                groups: Vec::new(),
                show_title: false,
            }],
            show_title: true,
        };
        let node = spec.to_node(None);
        assert_eq!(node.nest_id, NestId::new("weapons"));
        assert_eq!(node.level, 1);
        assert_eq!(node.actions.len(), 1);
        let child = &node.children[0];
        assert_eq!(child.nest_id, NestId::new("weapons_melee"));
        assert_eq!(child.level, 2);
        assert!(!child.show_title);
    }

    #[test]
    fn unknown_token_in_select_is_rejected() {
        let src = r#"(
            user: (id: "u1"),
            tokens: [(id: "T1")],
            steps: [Select(["T2"])],
        )"#;
        let err = Scenario::parse(src, None).unwrap_err();
        assert!(matches!(err, Error::UnknownToken(ref t) if t == "T2"), "{err}");
    }

    #[test]
    fn unknown_actor_on_token_is_rejected() {
        let src = r#"(
            user: (id: "u1"),
            tokens: [(id: "T1", actor: Some("ghost"))],
            steps: [],
        )"#;
        let err = Scenario::parse(src, None).unwrap_err();
        assert!(matches!(err, Error::UnknownActor(ref a) if a == "ghost"), "{err}");
    }

    #[test]
    fn invalid_configure_step_is_rejected() {
        let src = r#"(
            user: (id: "u1"),
            steps: [Configure((style: ""))],
        )"#;
        assert!(matches!(
            Scenario::parse(src, None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn parse_errors_carry_location() {
        let err = Scenario::parse("(user: (id: 1), steps: [])", None).unwrap_err();
        let Error::Config(cfg) = err else {
            panic!("expected config error, got {err}");
        };
        assert!(cfg.pretty().contains("line 1"), "{}", cfg.pretty());
    }
}
