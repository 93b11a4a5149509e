//! HUD Engine
//!
//! The engine is the application-context object the host shell owns. It
//! coordinates:
//! - debounced, non-reentrant rebuilds of the HUD snapshot
//! - character resolution and subject propagation to collaborators
//! - the group, lock, collapse, and frame state machines from `hud-state`
//! - application of their effects: view messages, resizes, persistence, dialogs
//!
//! Construct an [`Engine`] with [`Engine::new`], feed it triggers via
//! [`Engine::request_update`], and forward user input through the `on_*`,
//! lock, and drag methods. View messages arrive on the channel passed at
//! construction.
use std::{
    mem,
    sync::{Arc, Weak},
    time::Duration,
};

mod deps;
mod error;
mod resolver;
mod scheduler;
pub mod test_support;
mod timer;
mod view;

use futures::FutureExt;
use hud_config::{FlagStore, Role};
use hud_protocol::{
    ActionEvent, ActionId, ActiveSubject, ActorId, Direction, GroupId, HudSnapshot, Point,
    Position, RefreshTrigger, UserId, ViewMsg, ipc::ViewTx,
};
use hud_state::{
    EditLock, Effect, FrameController, GroupEvent, GroupTree, HudCollapse, Interaction, OpenMode,
};
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use deps::{
    ActionSource, ActorInfo, BuildOptions, Canvas, Collaborators, Dialogs, LayoutStore,
    MemoryLayoutStore, MemorySettingsStore, NoopResizer, Resizer, RollDispatcher, SettingsStore,
    TokenInfo, UserInfo,
};
pub use error::{Error, Result};
pub use resolver::resolve;
pub use scheduler::{RebuildFn, Scheduler};
pub use timer::{DebounceTimer, TimerHandle};
pub use view::ViewDispatcher;

/// Rebuilds slower than this are logged at warn.
const REBUILD_WARN_MS: u64 = 100;

/// View-side state: the machines for the currently displayed HUD.
struct HudState {
    /// Group open/collapse state.
    interaction: Interaction,
    /// Edit lock.
    lock: EditLock,
    /// Whole-HUD collapse.
    collapse: HudCollapse,
    /// Frame position and direction.
    frame: FrameController,
    /// True while the HUD is on screen.
    open: bool,
}

/// Shared engine internals.
struct Inner {
    /// Host collaborators.
    deps: Collaborators,
    /// Per-user flags.
    flags: FlagStore,
    /// Outgoing view messages.
    view: ViewDispatcher,
    /// Debounced rebuild scheduler.
    scheduler: Scheduler,
    /// Current snapshot, replaced whole.
    snapshot: RwLock<Option<Arc<HudSnapshot>>>,
    /// Subject resolved by the latest rebuild.
    subject: Mutex<Option<ActiveSubject>>,
    /// Displayed HUD state.
    hud: tokio::sync::Mutex<HudState>,
}

/// Engine coordinates rebuild scheduling, character resolution, and the HUD
/// state machines.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Engine {
    /// Shared internals.
    inner: Arc<Inner>,
}

impl Engine {
    /// Create a new engine.
    ///
    /// - `deps`: host collaborators
    /// - `flags`: the acting user's flag store
    /// - `tx`: channel for view messages
    pub fn new(deps: Collaborators, flags: FlagStore, tx: ViewTx) -> Self {
        let settings = deps.settings.settings();
        let user_flags = flags.flags();
        let hud = HudState {
            interaction: Interaction::new(
                OpenMode::from_click_open(settings.click_open),
                settings.customization_enabled,
            ),
            lock: EditLock::new(user_flags.is_unlocked, settings.customization_enabled),
            collapse: HudCollapse::new(user_flags.is_collapsed),
            frame: FrameController::new(settings.direction, settings.drag, deps.canvas.viewport()),
            open: false,
        };
        let debounce = Duration::from_millis(settings.debounce_ms);
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let run: RebuildFn = Arc::new(move |trigger| {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        Self { inner }.rebuild(trigger).await;
                    }
                }
                .boxed()
            });
            Inner {
                deps,
                flags,
                view: ViewDispatcher::new(tx),
                scheduler: Scheduler::new(debounce, run),
                snapshot: RwLock::new(None),
                subject: Mutex::new(None),
                hud: tokio::sync::Mutex::new(hud),
            }
        });
        Self { inner }
    }

    // ---- Triggers ----

    /// Request a rebuild. Never blocks; see [`Scheduler::request`].
    pub fn request_update(&self, trigger: RefreshTrigger) {
        self.inner.scheduler.request(trigger);
    }

    /// Drop any rebuild waiting for its debounce window.
    pub fn cancel_pending_update(&self) {
        self.inner.scheduler.cancel_pending();
    }

    /// Whether a change to `token` should trigger a rebuild.
    ///
    /// Flag-only changes never do. Otherwise the token must be controlled,
    /// or be the displayed token while nothing is controlled, or (with
    /// always-show) belong to the user's default character.
    pub fn is_valid_token_change(&self, token: &TokenInfo, flags_only: bool) -> bool {
        if flags_only {
            return false;
        }
        let canvas = &self.inner.deps.canvas;
        let controlled = canvas.controlled_tokens();
        let relevant = controlled.iter().any(|t| t.id == token.id)
            || (controlled.is_empty()
                && self
                    .snapshot()
                    .is_some_and(|s| s.token_id.as_ref() == Some(&token.id)));
        if relevant {
            return true;
        }
        if !self.inner.deps.settings.settings().always_show {
            return false;
        }
        match (canvas.user().character, &token.actor) {
            (Some(character), Some(actor)) => character.id == actor.id,
            _ => false,
        }
    }

    /// Whether a change to `actor` (or one of its items) should trigger a
    /// rebuild: only the displayed actor counts, and flag-only changes never do.
    pub fn is_valid_actor_update(&self, actor: &ActorId, flags_only: bool) -> bool {
        if flags_only {
            debug!(%actor, "actor_update_flags_only");
            return false;
        }
        self.snapshot()
            .is_some_and(|s| s.actor_id.as_ref() == Some(actor))
    }

    /// Settings changed: reconfigure the machines and rebuild.
    pub async fn settings_changed(&self) {
        let settings = self.inner.deps.settings.settings();
        self.inner
            .scheduler
            .set_debounce(Duration::from_millis(settings.debounce_ms));
        {
            let mut hud = self.inner.hud.lock().await;
            hud.interaction
                .set_mode(OpenMode::from_click_open(settings.click_open));
            hud.interaction
                .set_customization_enabled(settings.customization_enabled);
            hud.lock
                .set_customization_enabled(settings.customization_enabled);
            hud.frame.configure(settings.direction, settings.drag);
        }
        self.request_update(RefreshTrigger::SettingsChanged);
    }

    /// Flip the `enable` setting; returns the new value.
    pub async fn toggle_enabled(&self) -> Result<bool> {
        let mut settings = self.inner.deps.settings.settings();
        settings.enable = !settings.enable;
        let enabled = settings.enable;
        self.inner.deps.settings.save(settings).await?;
        info!(enabled, "hud_toggle_enabled");
        if enabled {
            self.request_update(RefreshTrigger::manual("toggle_enabled"));
        } else {
            self.cancel_pending_update();
            self.close_hud("disabled").await;
        }
        Ok(enabled)
    }

    // ---- User input ----

    /// Pointer/click/touch/title input on a group.
    pub async fn on_group_event(&self, event: GroupEvent) -> Result<()> {
        self.transition(|hud| {
            if !hud.open {
                return Ok(Vec::new());
            }
            Ok(hud.interaction.handle(&event)?)
        })
        .await
    }

    /// Right-click on a group.
    pub async fn on_group_context_menu(&self, group: &GroupId) -> Result<()> {
        self.transition(|hud| Ok(hud.lock.context_menu(hud.interaction.tree(), group)?))
            .await
    }

    /// Execute an action. Failures are logged; focus is cleared regardless.
    pub async fn on_action(&self, action: &ActionId, event: ActionEvent) {
        match self.inner.deps.rolls.dispatch(action, event).await {
            Ok(()) => debug!(%action, "action_dispatched"),
            Err(e) => warn!(%action, error = %e, "action_dispatch_failed"),
        }
        self.send(ViewMsg::Blur);
    }

    /// Enter locked mode.
    pub async fn lock(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.lock.lock(hud.interaction.tree())))
            .await
    }

    /// Enter unlocked mode; ignored while customization is disabled.
    pub async fn unlock(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.lock.unlock(hud.interaction.tree())))
            .await
    }

    /// The "edit HUD" button: opens the HUD configuration when unlocked.
    pub async fn edit_hud(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.lock.edit_hud())).await
    }

    /// Open the HUD configuration dialog.
    pub fn open_hud_config(&self) {
        self.inner.deps.dialogs.show_hud_config();
    }

    /// Collapse the whole HUD.
    pub async fn collapse_hud(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.collapse.collapse())).await
    }

    /// Expand the whole HUD.
    pub async fn expand_hud(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.collapse.expand())).await
    }

    /// Start dragging the frame. Returns false when dragging is disabled.
    pub async fn begin_drag(&self, pointer: Point) -> bool {
        self.inner.hud.lock().await.frame.begin_drag(pointer)
    }

    /// Pointer moved during a drag.
    pub async fn drag_move(&self, pointer: Point) -> Result<()> {
        self.transition(|hud| Ok(hud.frame.pointer_move(pointer)))
            .await
    }

    /// Animation frame callback requested by a drag.
    pub async fn animation_frame(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.frame.animation_frame())).await
    }

    /// Pointer released.
    pub async fn end_drag(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.frame.end_drag())).await
    }

    /// Move the frame back to its default position and persist it.
    pub async fn reset_position(&self) -> Result<()> {
        self.transition(|hud| Ok(hud.frame.reset_position())).await
    }

    // ---- Stored data ----

    /// Clear the acting user's layout and flags, then rebuild.
    pub async fn reset_user_data(&self) -> Result<()> {
        let user = self.inner.deps.canvas.user();
        self.inner.deps.layouts.reset_user(&user.id).await?;
        self.clear_user_flags().await?;
        info!(user = %user.id, "user_data_reset");
        self.request_update(RefreshTrigger::manual("reset_user_data"));
        Ok(())
    }

    /// Clear every user's layout and the acting user's flags, then rebuild.
    pub async fn reset_all_user_data(&self) -> Result<()> {
        self.inner.deps.layouts.reset_all_users().await?;
        self.clear_user_flags().await?;
        info!("all_user_data_reset");
        self.request_update(RefreshTrigger::manual("reset_all_user_data"));
        Ok(())
    }

    /// Clear the displayed actor's layout, then rebuild. Does nothing while
    /// no single actor is displayed.
    pub async fn reset_actor_data(&self) -> Result<()> {
        let Some(actor) = self.subject().and_then(|s| s.actor_id) else {
            debug!("reset_actor_data_no_actor");
            return Ok(());
        };
        self.inner.deps.layouts.reset_actor(&actor).await?;
        info!(%actor, "actor_data_reset");
        self.request_update(RefreshTrigger::manual("reset_actor_data"));
        Ok(())
    }

    /// Clear every actor's layout, then rebuild.
    pub async fn reset_all_actor_data(&self) -> Result<()> {
        self.inner.deps.layouts.reset_all_actors().await?;
        info!("all_actor_data_reset");
        self.request_update(RefreshTrigger::manual("reset_all_actor_data"));
        Ok(())
    }

    /// Reset the user's data, then the frame position.
    pub async fn reset(&self) -> Result<()> {
        self.reset_user_data().await?;
        self.reset_position().await?;
        info!("hud_reset");
        Ok(())
    }

    /// Copy `from`'s layout onto each user in `to`. Returns false, copying
    /// nothing, when `to` is empty.
    pub async fn copy_user_data(&self, from: &UserId, to: &[UserId]) -> Result<bool> {
        if to.is_empty() {
            info!(%from, "user_data_copy_no_targets");
            return Ok(false);
        }
        self.inner.deps.layouts.copy_user(from, to).await?;
        info!(%from, targets = to.len(), "user_data_copied");
        Ok(true)
    }

    // ---- Queries ----

    /// The current snapshot, if the HUD is showing one.
    pub fn snapshot(&self) -> Option<Arc<HudSnapshot>> {
        self.inner.snapshot.read().clone()
    }

    /// The subject resolved by the latest rebuild.
    pub fn subject(&self) -> Option<ActiveSubject> {
        self.inner.subject.lock().clone()
    }

    /// True while a rebuild runs.
    pub fn is_updating(&self) -> bool {
        self.inner.scheduler.is_updating()
    }

    /// Number of rebuilds that have finished.
    pub fn rebuilds_completed(&self) -> u64 {
        self.inner.scheduler.completed()
    }

    /// True while the HUD is on screen.
    pub async fn is_open(&self) -> bool {
        self.inner.hud.lock().await.open
    }

    /// Groups remembered as open, in the order they were opened.
    pub async fn hovered_groups(&self) -> Vec<GroupId> {
        self.inner
            .hud
            .lock()
            .await
            .interaction
            .hovered()
            .as_slice()
            .to_vec()
    }

    /// Currently open groups, in display order.
    pub async fn open_groups(&self) -> Vec<GroupId> {
        self.inner.hud.lock().await.interaction.open_groups()
    }

    /// True when the HUD is unlocked.
    pub async fn is_unlocked(&self) -> bool {
        self.inner.hud.lock().await.lock.is_unlocked()
    }

    /// True when the whole HUD is collapsed.
    pub async fn is_collapsed(&self) -> bool {
        self.inner.hud.lock().await.collapse.is_collapsed()
    }

    /// Current frame position.
    pub async fn position(&self) -> Position {
        self.inner.hud.lock().await.frame.position()
    }

    // ---- Pipeline ----

    /// Resolve, build, and render. Every failure ends in a closed HUD.
    async fn rebuild(&self, trigger: RefreshTrigger) {
        let started = Instant::now();
        let deps = &self.inner.deps;
        let settings = deps.settings.settings();
        let user = deps.canvas.user();
        if !settings.hud_enabled_for(user.role) {
            self.close_hud("disabled").await;
            return;
        }

        let controlled = deps.canvas.controlled_tokens();
        let subject = resolver::resolve(
            &controlled,
            &user,
            settings.always_show,
            deps.canvas.as_ref(),
        );
        deps.actions.set_subject(subject.as_ref());
        deps.rolls.set_subject(subject.as_ref());
        let previous = mem::replace(&mut *self.inner.subject.lock(), subject.clone());
        let Some(subject) = subject else {
            self.close_hud("no_subject").await;
            return;
        };

        let snapshot = if subject.is_multiple {
            HudSnapshot {
                character_name: subject.display_name.clone(),
                ..HudSnapshot::default()
            }
        } else {
            let save_actor =
                trigger.is_selection() && previous.and_then(|s| s.actor_id) != subject.actor_id;
            match deps
                .actions
                .build_tree(&subject, BuildOptions { save_actor })
                .await
            {
                Ok(groups) if groups.is_empty() => {
                    self.close_hud("empty_tree").await;
                    return;
                }
                Ok(groups) => HudSnapshot {
                    actor_id: subject.actor_id.clone(),
                    token_id: subject.token_id.clone(),
                    character_name: subject.display_name.clone(),
                    groups,
                },
                Err(e) => {
                    warn!(error = %e, "build_tree_failed");
                    self.close_hud("build_failed").await;
                    return;
                }
            }
        };

        let groups = snapshot.group_count();
        if !self.render(Arc::new(snapshot), user.role).await {
            return;
        }

        let elapsed = started.elapsed();
        if elapsed > Duration::from_millis(REBUILD_WARN_MS) {
            warn!(ms = elapsed.as_millis() as u64, %trigger, "slow_rebuild");
        }
        debug!(
            %trigger,
            actor = ?subject.actor_id,
            token = ?subject.token_id,
            groups,
            "hud_updated"
        );
    }

    /// Swap in `snapshot`, render it, and restore the view state.
    ///
    /// Settings are re-read under the HUD lock: a disable that landed while
    /// the tree was building closes the HUD instead. The lock is held until
    /// every render effect has been applied, so user input queues behind it.
    /// Returns false when nothing was rendered.
    async fn render(&self, snapshot: Arc<HudSnapshot>, role: Role) -> bool {
        let mut guard = self.inner.hud.lock().await;
        let settings = self.inner.deps.settings.settings();
        if !settings.hud_enabled_for(role) {
            drop(guard);
            self.close_hud("disabled_during_rebuild").await;
            return false;
        }
        *self.inner.snapshot.write() = Some(snapshot.clone());
        let flags = self.inner.flags.flags();
        let tree = GroupTree::from_snapshot(&snapshot);
        let hud = &mut *guard;
        hud.open = true;
        hud.frame.set_viewport(self.inner.deps.canvas.viewport());
        let mut fx = vec![Effect::View(ViewMsg::Render {
            snapshot,
            scale: settings.clamped_scale(),
            style: settings.style.clone(),
        })];
        fx.extend(hud.interaction.begin_render(tree, &flags));
        fx.extend(hud.lock.mount(hud.interaction.tree()));
        fx.extend(hud.collapse.mount());
        fx.extend(hud.frame.mount(flags.position));
        fx.extend(hud.interaction.restore());
        self.apply(fx, hud.frame.direction(), settings.grid).await;
        hud.interaction.finish_render();
        true
    }

    /// Relock and expand the HUD, drop the action source's cache, and write
    /// default flags.
    async fn clear_user_flags(&self) -> Result<()> {
        self.transition(|hud| {
            let mut fx = hud.lock.lock(hud.interaction.tree());
            fx.extend(hud.collapse.expand());
            if !hud.open {
                fx.retain(|e| !matches!(e, Effect::View(_)));
            }
            Ok(fx)
        })
        .await?;
        self.inner.deps.actions.reset();
        self.inner.flags.reset().await?;
        Ok(())
    }

    /// Hide the HUD and forget all view state.
    async fn close_hud(&self, reason: &str) {
        *self.inner.snapshot.write() = None;
        let was_open = {
            let mut hud = self.inner.hud.lock().await;
            hud.interaction.reset();
            mem::replace(&mut hud.open, false)
        };
        if was_open {
            self.send(ViewMsg::Close);
        }
        debug!(reason, "hud_closed");
    }

    /// Run a state transition and apply its effects, all under the HUD lock.
    async fn transition<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut HudState) -> Result<Vec<Effect>>,
    {
        let grid = self.inner.deps.settings.settings().grid;
        let mut hud = self.inner.hud.lock().await;
        let fx = f(&mut *hud)?;
        self.apply(fx, hud.frame.direction(), grid).await;
        Ok(())
    }

    /// Apply effects in order.
    async fn apply(&self, fx: Vec<Effect>, direction: Direction, grid: bool) {
        let deps = &self.inner.deps;
        for effect in fx {
            match effect {
                Effect::View(msg) => self.send(msg),
                Effect::Resize(group) => deps.resizer.resize(&group, direction, grid),
                Effect::Persist(update) => {
                    if let Err(e) = self.inner.flags.apply(update).await {
                        warn!(error = %e, "flag_persist_failed");
                    }
                }
                Effect::ShowGroupConfig(meta) => deps.dialogs.show_group_config(&meta),
                Effect::ShowActionConfig(meta) => deps.dialogs.show_action_config(&meta),
                Effect::ShowHudConfig => deps.dialogs.show_hud_config(),
            }
        }
    }

    /// Send a view message; a closed channel only means nobody is watching.
    fn send(&self, msg: ViewMsg) {
        if let Err(e) = self.inner.view.send(msg) {
            debug!(error = %e, "view_send_failed");
        }
    }
}
