//! Test support utilities for hud-engine integration/unit tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.
//! They are intended for use by the test suite only.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use hud_config::{FlagStore, Role, Settings, UserFlags};
use hud_protocol::{
    ActionEvent, ActionId, ActiveSubject, ActorId, Direction, GroupId, GroupMeta, GroupNode,
    TokenId, UserId, ViewMsg, Viewport,
    ipc::{ViewRx, view_channel},
};
use parking_lot::Mutex;
use tokio::time;

use crate::{
    ActionSource, ActorInfo, BuildOptions, Canvas, Collaborators, Dialogs, Engine, Error,
    MemoryLayoutStore, MemorySettingsStore, Resizer, Result, RollDispatcher, TokenInfo, UserInfo,
};

/// Viewport used by the mocks unless overridden.
pub const TEST_VIEWPORT: Viewport = Viewport {
    width: 1600,
    height: 1000,
};

/// Action source returning canned trees per actor.
#[derive(Default)]
pub struct MockActionSource {
    /// Trees by actor.
    trees: Mutex<HashMap<ActorId, Vec<GroupNode>>>,
    /// Simulated build latency.
    latency: Mutex<Duration>,
    /// When set, builds fail.
    fail: AtomicBool,
    /// Completed builds.
    builds: AtomicUsize,
    /// Builds currently running.
    running: AtomicUsize,
    /// Highest number of concurrent builds observed.
    max_running: AtomicUsize,
    /// Subject most recently set.
    subject: Mutex<Option<ActiveSubject>>,
    /// Options of every build, in order.
    options: Mutex<Vec<BuildOptions>>,
    /// Cache resets requested by the engine.
    resets: AtomicUsize,
}

impl MockActionSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `groups` for `actor`.
    pub fn set_tree(&self, actor: &str, groups: Vec<GroupNode>) {
        self.trees.lock().insert(ActorId::new(actor), groups);
    }

    /// Make each build take `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Make builds fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of completed builds.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Highest number of builds observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Subject most recently propagated.
    pub fn subject(&self) -> Option<ActiveSubject> {
        self.subject.lock().clone()
    }

    /// Options passed to each build.
    pub fn options(&self) -> Vec<BuildOptions> {
        self.options.lock().clone()
    }

    /// Number of cache resets.
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionSource for MockActionSource {
    fn set_subject(&self, subject: Option<&ActiveSubject>) {
        *self.subject.lock() = subject.cloned();
    }

    async fn build_tree(
        &self,
        subject: &ActiveSubject,
        options: BuildOptions,
    ) -> Result<Vec<GroupNode>> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        self.options.lock().push(options);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            time::sleep(latency).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ActionSource("mock failure".into()));
        }
        let tree = subject
            .actor_id
            .as_ref()
            .and_then(|a| self.trees.lock().get(a).cloned());
        Ok(tree.unwrap_or_default())
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Roll dispatcher that records actions.
#[derive(Default)]
pub struct MockRollDispatcher {
    /// Dispatched actions.
    dispatched: Mutex<Vec<(ActionId, ActionEvent)>>,
    /// When set, dispatches fail.
    fail: AtomicBool,
    /// Subject most recently set.
    subject: Mutex<Option<ActiveSubject>>,
}

impl MockRollDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make dispatches fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Actions dispatched so far.
    pub fn dispatched(&self) -> Vec<ActionId> {
        self.dispatched.lock().iter().map(|(a, _)| a.clone()).collect()
    }

    /// Subject most recently propagated.
    pub fn subject(&self) -> Option<ActiveSubject> {
        self.subject.lock().clone()
    }
}

#[async_trait]
impl RollDispatcher for MockRollDispatcher {
    fn set_subject(&self, subject: Option<&ActiveSubject>) {
        *self.subject.lock() = subject.cloned();
    }

    async fn dispatch(&self, action: &ActionId, event: ActionEvent) -> Result<()> {
        self.dispatched.lock().push((action.clone(), event));
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Dispatch(format!("mock failure for {action}")));
        }
        Ok(())
    }
}

/// Scene with mutable selection.
pub struct MockCanvas {
    /// Controlled tokens.
    controlled: Mutex<Vec<TokenInfo>>,
    /// Placed tokens.
    placed: Mutex<Vec<TokenInfo>>,
    /// The acting user.
    user: Mutex<UserInfo>,
    /// Visible area.
    viewport: Mutex<Viewport>,
}

impl MockCanvas {
    /// Create a scene for `user` with nothing selected.
    pub fn new(user: UserInfo) -> Self {
        Self {
            controlled: Mutex::new(Vec::new()),
            placed: Mutex::new(Vec::new()),
            user: Mutex::new(user),
            viewport: Mutex::new(TEST_VIEWPORT),
        }
    }

    /// Replace the controlled tokens.
    pub fn select(&self, tokens: Vec<TokenInfo>) {
        *self.controlled.lock() = tokens;
    }

    /// Replace the placed tokens.
    pub fn place(&self, tokens: Vec<TokenInfo>) {
        *self.placed.lock() = tokens;
    }

    /// Replace the acting user.
    pub fn set_user(&self, user: UserInfo) {
        *self.user.lock() = user;
    }

    /// Replace the viewport.
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.lock() = viewport;
    }
}

impl Canvas for MockCanvas {
    fn controlled_tokens(&self) -> Vec<TokenInfo> {
        self.controlled.lock().clone()
    }

    fn user(&self) -> UserInfo {
        self.user.lock().clone()
    }

    fn placed_token(&self, actor: &ActorId) -> Option<TokenInfo> {
        self.placed
            .lock()
            .iter()
            .find(|t| t.actor.as_ref().is_some_and(|a| &a.id == actor))
            .cloned()
    }

    fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }
}

/// Resizer that records every call.
#[derive(Default)]
pub struct RecordingResizer {
    /// Calls in order.
    calls: Mutex<Vec<(GroupId, Direction)>>,
}

impl RecordingResizer {
    /// Groups resized so far.
    pub fn resized(&self) -> Vec<GroupId> {
        self.calls.lock().iter().map(|(g, _)| g.clone()).collect()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Resizer for RecordingResizer {
    fn resize(&self, group: &GroupId, direction: Direction, _grid: bool) {
        self.calls.lock().push((group.clone(), direction));
    }
}

/// A dialog opened by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogCall {
    /// Group configuration.
    Group(GroupMeta),
    /// Action configuration.
    Action(GroupMeta),
    /// HUD configuration.
    Hud,
}

/// Dialogs collaborator that records every call.
#[derive(Default)]
pub struct RecordingDialogs {
    /// Calls in order.
    calls: Mutex<Vec<DialogCall>>,
}

impl RecordingDialogs {
    /// Dialogs opened so far.
    pub fn calls(&self) -> Vec<DialogCall> {
        self.calls.lock().clone()
    }
}

impl Dialogs for RecordingDialogs {
    fn show_group_config(&self, meta: &GroupMeta) {
        self.calls.lock().push(DialogCall::Group(meta.clone()));
    }

    fn show_action_config(&self, meta: &GroupMeta) {
        self.calls.lock().push(DialogCall::Action(meta.clone()));
    }

    fn show_hud_config(&self) {
        self.calls.lock().push(DialogCall::Hud);
    }
}

/// An engine wired to mocks, plus handles to each mock.
pub struct TestHud {
    /// The engine under test.
    pub engine: Engine,
    /// View messages.
    pub rx: ViewRx,
    /// Action source mock.
    pub actions: Arc<MockActionSource>,
    /// Roll dispatcher mock.
    pub rolls: Arc<MockRollDispatcher>,
    /// Scene mock.
    pub canvas: Arc<MockCanvas>,
    /// Resizer mock.
    pub resizer: Arc<RecordingResizer>,
    /// Dialogs mock.
    pub dialogs: Arc<RecordingDialogs>,
    /// Settings.
    pub settings: Arc<MemorySettingsStore>,
    /// Saved layouts.
    pub layouts: Arc<MemoryLayoutStore>,
    /// Flag store.
    pub flags: FlagStore,
}

impl TestHud {
    /// Build an engine for user `u1` (a player) with `settings` and `flags`.
    pub fn new(settings: Settings, flags: UserFlags) -> Self {
        Self::with_flag_store(settings, FlagStore::in_memory(flags))
    }

    /// Like [`TestHud::new`], over an existing flag store.
    pub fn with_flag_store(settings: Settings, flags: FlagStore) -> Self {
        let actions = Arc::new(MockActionSource::new());
        let rolls = Arc::new(MockRollDispatcher::new());
        let canvas = Arc::new(MockCanvas::new(player("u1")));
        let resizer = Arc::new(RecordingResizer::default());
        let dialogs = Arc::new(RecordingDialogs::default());
        let settings = Arc::new(MemorySettingsStore::new(settings));
        let layouts = Arc::new(MemoryLayoutStore::new());
        let (tx, rx) = view_channel();
        let engine = Engine::new(
            Collaborators {
                actions: actions.clone(),
                rolls: rolls.clone(),
                settings: settings.clone(),
                canvas: canvas.clone(),
                resizer: resizer.clone(),
                dialogs: dialogs.clone(),
                layouts: layouts.clone(),
            },
            flags.clone(),
            tx,
        );
        Self {
            engine,
            rx,
            actions,
            rolls,
            canvas,
            resizer,
            dialogs,
            settings,
            layouts,
            flags,
        }
    }

    /// Drain every queued view message.
    pub fn drain(&mut self) -> Vec<ViewMsg> {
        drain(&mut self.rx)
    }
}

/// A player user with no default character.
pub fn player(id: &str) -> UserInfo {
    UserInfo {
        id: UserId::new(id),
        role: Role::Player,
        character: None,
    }
}

/// An actor owned by `owner`.
pub fn actor(id: &str, owner: &str) -> ActorInfo {
    ActorInfo {
        id: ActorId::new(id),
        name: format!("Actor {id}"),
        owners: vec![UserId::new(owner)],
    }
}

/// A token for an actor owned by `owner`.
pub fn token(id: &str, actor_id: &str, owner: &str) -> TokenInfo {
    TokenInfo {
        id: TokenId::new(id),
        name: format!("Token {id}"),
        actor: Some(actor(actor_id, owner)),
    }
}

/// Drain every queued view message without waiting.
pub fn drain(rx: &mut ViewRx) -> Vec<ViewMsg> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Receive view messages until `pred` matches or `timeout_ms` elapses.
pub async fn recv_until<F>(rx: &mut ViewRx, timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut(&ViewMsg) -> bool,
{
    time::timeout(Duration::from_millis(timeout_ms), async {
        while let Some(msg) = rx.recv().await {
            if pred(&msg) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}
