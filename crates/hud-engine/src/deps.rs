//! Collaborators the engine consumes.
//!
//! The host shell supplies one implementation of each trait. The engine never
//! reaches into host state directly; everything it reads about tokens, users
//! and the viewport comes through [`Canvas`].

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use hud_config::{Role, Settings};
use hud_protocol::{
    ActionEvent, ActionId, ActiveSubject, ActorId, Direction, GroupId, GroupMeta, GroupNode,
    NestId, TokenId, UserId, Viewport,
};
use parking_lot::RwLock;

use crate::Result;

// ---- Host data ----

/// An actor as seen by the acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorInfo {
    /// Actor id.
    pub id: ActorId,
    /// Actor name.
    pub name: String,
    /// Users with owner permission.
    pub owners: Vec<UserId>,
}

/// A token placed on the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Token id.
    pub id: TokenId,
    /// Token name, preferred over the actor name for display.
    pub name: String,
    /// The actor behind the token, if any.
    pub actor: Option<ActorInfo>,
}

/// The acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// User id.
    pub id: UserId,
    /// Permission role.
    pub role: Role,
    /// The user's assigned default character.
    pub character: Option<ActorInfo>,
}

impl UserInfo {
    /// True for game masters, assistants included.
    pub fn is_gm(&self) -> bool {
        self.role >= Role::Assistant
    }

    /// True if this user may drive a HUD for `actor`.
    pub fn can_control(&self, actor: &ActorInfo) -> bool {
        self.is_gm() || actor.owners.contains(&self.id)
    }
}

/// Options passed to [`ActionSource::build_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    /// The subject changed because of a selection; the source should record it.
    pub save_actor: bool,
}

// ---- Collaborator traits ----

/// Builds the group tree for a subject.
#[async_trait]
pub trait ActionSource: Send + Sync {
    /// Scope subsequent builds to `subject`. Called before every build.
    fn set_subject(&self, subject: Option<&ActiveSubject>);

    /// Build the top-level groups for `subject`. An empty list closes the HUD.
    async fn build_tree(
        &self,
        subject: &ActiveSubject,
        options: BuildOptions,
    ) -> Result<Vec<GroupNode>>;

    /// Drop anything cached from earlier builds. Called after user layouts
    /// are reset.
    fn reset(&self) {}
}

/// Executes actions.
#[async_trait]
pub trait RollDispatcher: Send + Sync {
    /// Scope subsequent dispatches to `subject`.
    fn set_subject(&self, subject: Option<&ActiveSubject>);

    /// Execute `action`.
    async fn dispatch(&self, action: &ActionId, event: ActionEvent) -> Result<()>;
}

/// Module settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current settings, from cache.
    fn settings(&self) -> Settings;

    /// Replace the settings.
    async fn save(&self, settings: Settings) -> Result<()>;
}

/// Saved group layouts, kept per user and per actor.
///
/// The engine never reads layouts; the action source does. The engine only
/// clears and copies them on request.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    /// Clear `user`'s layout.
    async fn reset_user(&self, user: &UserId) -> Result<()>;

    /// Clear every user's layout.
    async fn reset_all_users(&self) -> Result<()>;

    /// Clear `actor`'s layout.
    async fn reset_actor(&self, actor: &ActorId) -> Result<()>;

    /// Clear every actor's layout.
    async fn reset_all_actors(&self) -> Result<()>;

    /// Overwrite the layout of each user in `to` with `from`'s.
    async fn copy_user(&self, from: &UserId, to: &[UserId]) -> Result<()>;
}

/// Sizes a group's flyout after it opens.
pub trait Resizer: Send + Sync {
    /// Resize `group` for `direction`, using grid layout when `grid` is set.
    fn resize(&self, group: &GroupId, direction: Direction, grid: bool);
}

/// Configuration dialogs.
pub trait Dialogs: Send + Sync {
    /// Group configuration for a top-level group.
    fn show_group_config(&self, meta: &GroupMeta);
    /// Action configuration for a sub-group.
    fn show_action_config(&self, meta: &GroupMeta);
    /// HUD-wide configuration.
    fn show_hud_config(&self);
}

/// Host scene state.
pub trait Canvas: Send + Sync {
    /// Tokens currently controlled by the acting user.
    fn controlled_tokens(&self) -> Vec<TokenInfo>;
    /// The acting user.
    fn user(&self) -> UserInfo;
    /// A placed token for `actor`, if any.
    fn placed_token(&self, actor: &ActorId) -> Option<TokenInfo>;
    /// Visible area.
    fn viewport(&self) -> Viewport;
}

/// All collaborators, bundled for [`crate::Engine::new`].
#[derive(Clone)]
pub struct Collaborators {
    /// Tree builder.
    pub actions: Arc<dyn ActionSource>,
    /// Action executor.
    pub rolls: Arc<dyn RollDispatcher>,
    /// Module settings.
    pub settings: Arc<dyn SettingsStore>,
    /// Scene state.
    pub canvas: Arc<dyn Canvas>,
    /// Flyout sizing.
    pub resizer: Arc<dyn Resizer>,
    /// Configuration dialogs.
    pub dialogs: Arc<dyn Dialogs>,
    /// Saved group layouts.
    pub layouts: Arc<dyn LayoutStore>,
}

/// Settings held in memory.
pub struct MemorySettingsStore {
    /// Current settings.
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    /// Create a store holding `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    async fn save(&self, settings: Settings) -> Result<()> {
        *self.settings.write() = settings;
        Ok(())
    }
}

/// Layouts held in memory, as ordered lists of group paths.
#[derive(Default)]
pub struct MemoryLayoutStore {
    /// Layouts by user.
    users: RwLock<HashMap<UserId, Vec<NestId>>>,
    /// Layouts by actor.
    actors: RwLock<HashMap<ActorId, Vec<NestId>>>,
}

impl MemoryLayoutStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Save `user`'s layout.
    pub fn set_user(&self, user: &UserId, groups: Vec<NestId>) {
        self.users.write().insert(user.clone(), groups);
    }

    /// `user`'s layout, if one is saved.
    pub fn user_layout(&self, user: &UserId) -> Option<Vec<NestId>> {
        self.users.read().get(user).cloned()
    }

    /// Save `actor`'s layout.
    pub fn set_actor(&self, actor: &ActorId, groups: Vec<NestId>) {
        self.actors.write().insert(actor.clone(), groups);
    }

    /// `actor`'s layout, if one is saved.
    pub fn actor_layout(&self, actor: &ActorId) -> Option<Vec<NestId>> {
        self.actors.read().get(actor).cloned()
    }
}

#[async_trait]
impl LayoutStore for MemoryLayoutStore {
    async fn reset_user(&self, user: &UserId) -> Result<()> {
        self.users.write().remove(user);
        Ok(())
    }

    async fn reset_all_users(&self) -> Result<()> {
        self.users.write().clear();
        Ok(())
    }

    async fn reset_actor(&self, actor: &ActorId) -> Result<()> {
        self.actors.write().remove(actor);
        Ok(())
    }

    async fn reset_all_actors(&self) -> Result<()> {
        self.actors.write().clear();
        Ok(())
    }

    async fn copy_user(&self, from: &UserId, to: &[UserId]) -> Result<()> {
        let mut users = self.users.write();
        let layout = users.get(from).cloned().unwrap_or_default();
        for user in to {
            users.insert(user.clone(), layout.clone());
        }
        Ok(())
    }
}

/// Resizer that does nothing; for hosts that size flyouts themselves.
pub struct NoopResizer;

impl Resizer for NoopResizer {
    fn resize(&self, _group: &GroupId, _direction: Direction, _grid: bool) {}
}
