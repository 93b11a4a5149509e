//! The simulated host: canvas, action source, roll dispatcher and dialogs
//! backed by a scenario's static scene.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use hud_engine::{
    ActionSource, ActorInfo, BuildOptions, Canvas, Collaborators, Dialogs, LayoutStore,
    NoopResizer, RollDispatcher, SettingsStore, TokenInfo, UserInfo,
};
use hud_protocol::{
    ActionEvent, ActionId, ActiveSubject, ActorId, GroupMeta, GroupNode, TokenId, UserId,
    Viewport,
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    scenario::{ActorSpec, Scenario},
};

/// A line of host output, collected for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// An action was executed.
    Rolled {
        /// Actor the action ran for.
        actor: Option<ActorId>,
        /// The action.
        action: ActionId,
    },
    /// A configuration dialog opened.
    Dialog(String),
    /// Saved layouts were reset or copied.
    Layout(String),
}

/// Static scene plus the mutable bits a scenario changes.
pub struct SimHost {
    /// Groups each actor's source produces.
    trees: HashMap<ActorId, Vec<GroupNode>>,
    /// All placed tokens.
    tokens: Vec<TokenInfo>,
    /// The acting user.
    user: UserInfo,
    /// Visible area.
    viewport: Viewport,
    /// Currently controlled tokens.
    controlled: Mutex<Vec<TokenId>>,
    /// Subject the engine scoped the source and dispatcher to.
    subject: Mutex<Option<ActiveSubject>>,
    /// Everything the host did, in order.
    events: Mutex<Vec<HostEvent>>,
}

impl SimHost {
    /// Build the scene described by `scenario`.
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let actors: HashMap<ActorId, ActorInfo> = scenario
            .actors
            .iter()
            .map(|a| (ActorId::new(&a.id), actor_info(a)))
            .collect();
        let trees = scenario
            .actors
            .iter()
            .map(|a| {
                let groups = a.groups.iter().map(|g| g.to_node(None)).collect();
                (ActorId::new(&a.id), groups)
            })
            .collect();
        let lookup = |id: &str| {
            actors
                .get(&ActorId::new(id))
                .cloned()
                .ok_or_else(|| Error::UnknownActor(id.to_string()))
        };
        let tokens = scenario
            .tokens
            .iter()
            .map(|t| {
                Ok(TokenInfo {
                    id: TokenId::new(&t.id),
                    name: t.name.clone(),
                    actor: t.actor.as_deref().map(lookup).transpose()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let user = UserInfo {
            id: UserId::new(&scenario.user.id),
            role: scenario.user.role,
            character: scenario.user.character.as_deref().map(lookup).transpose()?,
        };
        Ok(Self {
            trees,
            tokens,
            user,
            viewport: scenario.viewport,
            controlled: Mutex::new(Vec::new()),
            subject: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Bundle this host with `settings` into engine collaborators.
    pub fn collaborators(self: &Arc<Self>, settings: Arc<dyn SettingsStore>) -> Collaborators {
        Collaborators {
            actions: self.clone(),
            rolls: self.clone(),
            settings,
            canvas: self.clone(),
            resizer: Arc::new(NoopResizer),
            dialogs: self.clone(),
            layouts: self.clone(),
        }
    }

    /// Replace the controlled tokens.
    pub fn select(&self, ids: &[String]) -> Result<Vec<TokenId>> {
        let ids = ids
            .iter()
            .map(|id| self.token(id).map(|t| t.id.clone()))
            .collect::<Result<Vec<_>>>()?;
        self.controlled.lock().clone_from(&ids);
        Ok(ids)
    }

    /// Look up a placed token.
    pub fn token(&self, id: &str) -> Result<&TokenInfo> {
        self.tokens
            .iter()
            .find(|t| t.id.as_str() == id)
            .ok_or_else(|| Error::UnknownToken(id.to_string()))
    }

    /// Everything the host recorded so far.
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    /// Record and print one host event.
    fn record(&self, event: HostEvent) {
        info!(?event, "host_event");
        self.events.lock().push(event);
    }
}

/// Convert a scenario actor to the engine's view of it.
fn actor_info(a: &ActorSpec) -> ActorInfo {
    ActorInfo {
        id: ActorId::new(&a.id),
        name: a.name.clone(),
        owners: a.owners.iter().map(UserId::new).collect(),
    }
}

#[async_trait]
impl ActionSource for SimHost {
    fn set_subject(&self, subject: Option<&ActiveSubject>) {
        *self.subject.lock() = subject.cloned();
    }

    async fn build_tree(
        &self,
        subject: &ActiveSubject,
        options: BuildOptions,
    ) -> hud_engine::Result<Vec<GroupNode>> {
        let Some(actor) = &subject.actor_id else {
            return Ok(Vec::new());
        };
        debug!(%actor, save_actor = options.save_actor, "sim_build_tree");
        self.trees
            .get(actor)
            .cloned()
            .ok_or_else(|| hud_engine::Error::ActionSource(format!("no tree for actor {actor}")))
    }
}

#[async_trait]
impl RollDispatcher for SimHost {
    fn set_subject(&self, subject: Option<&ActiveSubject>) {
        *self.subject.lock() = subject.cloned();
    }

    async fn dispatch(&self, action: &ActionId, _event: ActionEvent) -> hud_engine::Result<()> {
        let actor = self.subject.lock().as_ref().and_then(|s| s.actor_id.clone());
        let known = actor
            .as_ref()
            .and_then(|a| self.trees.get(a))
            .is_some_and(|groups| contains_action(groups, action));
        if !known {
            return Err(hud_engine::Error::Dispatch(format!(
                "action {action} not found for the current subject"
            )));
        }
        self.record(HostEvent::Rolled {
            actor,
            action: action.clone(),
        });
        Ok(())
    }
}

/// True when `action` appears anywhere in `groups`.
fn contains_action(groups: &[GroupNode], action: &ActionId) -> bool {
    let mut found = false;
    for g in groups {
        g.walk(&mut |n| found |= n.actions.iter().any(|a| &a.id == action));
    }
    found
}

impl Dialogs for SimHost {
    fn show_group_config(&self, meta: &GroupMeta) {
        self.record(HostEvent::Dialog(format!("group_config {}", meta.nest_id)));
    }

    fn show_action_config(&self, meta: &GroupMeta) {
        self.record(HostEvent::Dialog(format!("action_config {}", meta.nest_id)));
    }

    fn show_hud_config(&self) {
        self.record(HostEvent::Dialog("hud_config".to_string()));
    }
}

#[async_trait]
impl LayoutStore for SimHost {
    async fn reset_user(&self, user: &UserId) -> hud_engine::Result<()> {
        self.record(HostEvent::Layout(format!("reset_user {user}")));
        Ok(())
    }

    async fn reset_all_users(&self) -> hud_engine::Result<()> {
        self.record(HostEvent::Layout("reset_all_users".to_string()));
        Ok(())
    }

    async fn reset_actor(&self, actor: &ActorId) -> hud_engine::Result<()> {
        self.record(HostEvent::Layout(format!("reset_actor {actor}")));
        Ok(())
    }

    async fn reset_all_actors(&self) -> hud_engine::Result<()> {
        self.record(HostEvent::Layout("reset_all_actors".to_string()));
        Ok(())
    }

    async fn copy_user(&self, from: &UserId, to: &[UserId]) -> hud_engine::Result<()> {
        let to: Vec<&str> = to.iter().map(UserId::as_str).collect();
        self.record(HostEvent::Layout(format!("copy_user {from} -> {}", to.join(","))));
        Ok(())
    }
}

impl Canvas for SimHost {
    fn controlled_tokens(&self) -> Vec<TokenInfo> {
        let ids = self.controlled.lock().clone();
        self.tokens
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect()
    }

    fn user(&self) -> UserInfo {
        self.user.clone()
    }

    fn placed_token(&self, actor: &ActorId) -> Option<TokenInfo> {
        self.tokens
            .iter()
            .find(|t| t.actor.as_ref().is_some_and(|a| &a.id == actor))
            .cloned()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}
