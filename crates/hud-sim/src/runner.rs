//! Play a scenario against a live engine.

use std::{sync::Arc, time::Duration};

use hud_config::FlagStore;
use hud_engine::{Engine, MemorySettingsStore, SettingsStore};
use hud_protocol::{
    ActionId, GroupId, NestId, Position, RefreshTrigger, UserId, ViewMsg,
    ipc::{ViewRx, view_channel},
};
use hud_state::GroupEvent;
use tokio::{runtime::Builder, task::JoinHandle, time::sleep};
use tracing::{info, warn};

use crate::{
    cli::RunArgs,
    error::{Error, Result},
    host::{HostEvent, SimHost},
    scenario::{Scenario, Step},
};

/// State at the end of a run.
#[derive(Debug)]
pub struct Summary {
    /// View messages emitted.
    pub messages: Vec<ViewMsg>,
    /// What the host did.
    pub host_events: Vec<HostEvent>,
    /// Whether the HUD ended up on screen.
    pub open: bool,
    /// Groups left open.
    pub open_groups: Vec<GroupId>,
    /// Final frame position.
    pub position: Position,
    /// Final lock state.
    pub unlocked: bool,
    /// Final collapse state.
    pub collapsed: bool,
    /// Rebuilds that ran to completion.
    pub rebuilds: u64,
}

/// How the run prints view messages.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// Print anything at all.
    pub echo: bool,
    /// JSON lines instead of the compact form.
    pub json: bool,
}

/// Entry point for the `run` subcommand.
pub fn run(args: &RunArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let flags = match &args.flags {
        Some(path) => FlagStore::open(path)?,
        None => FlagStore::in_memory(scenario.flags.clone()),
    };
    let output = Output {
        echo: true,
        json: args.json,
    };
    let rt = Builder::new_current_thread().enable_all().build()?;
    let summary = rt.block_on(play(&scenario, flags, args.settle, output))?;
    for event in &summary.host_events {
        match event {
            HostEvent::Rolled { actor, action } => match actor {
                Some(actor) => println!("# rolled {action} for {actor}"),
                None => println!("# rolled {action}"),
            },
            HostEvent::Dialog(name) => println!("# dialog {name}"),
            HostEvent::Layout(change) => println!("# layout {change}"),
        }
    }
    println!(
        "# done: messages={} open={} groups={:?} position=({}, {}) unlocked={} collapsed={} rebuilds={}",
        summary.messages.len(),
        summary.open,
        summary.open_groups,
        summary.position.top,
        summary.position.left,
        summary.unlocked,
        summary.collapsed,
        summary.rebuilds,
    );
    Ok(())
}

/// Play every step of `scenario`, letting the engine settle after each one.
pub async fn play(
    scenario: &Scenario,
    flags: FlagStore,
    settle: Duration,
    output: Output,
) -> Result<Summary> {
    let host = Arc::new(SimHost::new(scenario)?);
    let settings = Arc::new(MemorySettingsStore::new(scenario.settings.clone()));
    let (tx, rx) = view_channel();
    let engine = Engine::new(host.collaborators(settings.clone()), flags, tx);
    let printer = spawn_printer(rx, output);

    for (i, step) in scenario.steps.iter().enumerate() {
        if output.echo && !output.json {
            println!("# {}: {step:?}", i + 1);
        }
        apply(&engine, &host, settings.as_ref(), step).await?;
        sleep(settle).await;
    }

    let summary = Summary {
        messages: Vec::new(),
        host_events: host.events(),
        open: engine.is_open().await,
        open_groups: engine.open_groups().await,
        position: engine.position().await,
        unlocked: engine.is_unlocked().await,
        collapsed: engine.is_collapsed().await,
        rebuilds: engine.rebuilds_completed(),
    };
    drop(engine);
    let messages = printer
        .await
        .map_err(|e| Error::other(format!("printer task failed: {e}")))?;
    Ok(Summary { messages, ..summary })
}

/// Drain the view channel until the engine is dropped.
fn spawn_printer(mut rx: ViewRx, output: Output) -> JoinHandle<Vec<ViewMsg>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(msg) = rx.recv().await {
            if output.echo {
                print_msg(&msg, output.json);
            }
            seen.push(msg);
        }
        seen
    })
}

/// Print one view message.
fn print_msg(msg: &ViewMsg, json: bool) {
    if json {
        match serde_json::to_string(msg) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "view_msg_encode_failed"),
        }
        return;
    }
    match msg {
        ViewMsg::Render {
            snapshot,
            scale,
            style,
        } => println!(
            "render {:?} groups={} scale={scale} style={style}",
            snapshot.character_name,
            snapshot.groups.len()
        ),
        other => println!("{other:?}"),
    }
}

/// Group id for a path written in a step.
fn group(path: &str) -> GroupId {
    NestId::new(path).group_id()
}

/// Apply one step.
async fn apply(
    engine: &Engine,
    host: &SimHost,
    settings: &dyn SettingsStore,
    step: &Step,
) -> Result<()> {
    match step {
        Step::Select(ids) => {
            let tokens = host.select(ids)?;
            engine.request_update(RefreshTrigger::Selection { tokens });
        }
        Step::TokenUpdate(id) => {
            let token = host.token(id)?;
            if engine.is_valid_token_change(token, false) {
                engine.request_update(RefreshTrigger::manual(format!("token_update({id})")));
            } else {
                info!(token = %id, "token_update_ignored");
            }
        }
        Step::ActorUpdate(id) => {
            let actor = id.as_str().into();
            if engine.is_valid_actor_update(&actor, false) {
                engine.request_update(RefreshTrigger::ActorUpdate { actor });
            } else {
                info!(actor = %id, "actor_update_ignored");
            }
        }
        Step::Refresh => engine.request_update(RefreshTrigger::manual("scenario")),
        Step::Configure(new) => {
            settings.save(new.clone()).await?;
            engine.settings_changed().await;
        }
        Step::ToggleEnabled => {
            let enabled = engine.toggle_enabled().await?;
            info!(enabled, "toggled");
        }
        Step::Enter(g) => engine.on_group_event(GroupEvent::PointerEnter(group(g))).await?,
        Step::Leave(g) => engine.on_group_event(GroupEvent::PointerLeave(group(g))).await?,
        Step::Click(g) => engine.on_group_event(GroupEvent::Click(group(g))).await?,
        Step::Touch(g) => engine.on_group_event(GroupEvent::Touch(group(g))).await?,
        Step::Title(g) => engine.on_group_event(GroupEvent::TitleClick(group(g))).await?,
        Step::ContextMenu(g) => engine.on_group_context_menu(&group(g)).await?,
        Step::Action { id, event } => {
            engine.on_action(&ActionId::new(id.as_str()), *event).await;
        }
        Step::Lock => engine.lock().await?,
        Step::Unlock => engine.unlock().await?,
        Step::EditHud => engine.edit_hud().await?,
        Step::HudConfig => engine.open_hud_config(),
        Step::Collapse => engine.collapse_hud().await?,
        Step::Expand => engine.expand_hud().await?,
        Step::Drag { from, to } => {
            if engine.begin_drag(*from).await {
                engine.drag_move(*to).await?;
                engine.animation_frame().await?;
                engine.end_drag().await?;
            } else {
                info!("drag_disabled");
            }
        }
        Step::ResetPosition => engine.reset_position().await?,
        Step::ResetUserData => engine.reset_user_data().await?,
        Step::ResetAllUserData => engine.reset_all_user_data().await?,
        Step::ResetActorData => engine.reset_actor_data().await?,
        Step::ResetAllActorData => engine.reset_all_actor_data().await?,
        Step::Reset => engine.reset().await?,
        Step::CopyUserData { from, to } => {
            let to: Vec<UserId> = to.iter().map(UserId::new).collect();
            let copied = engine.copy_user_data(&UserId::new(from), &to).await?;
            info!(copied, "copy_user_data");
        }
        Step::Wait(ms) => sleep(Duration::from_millis(*ms)).await,
    }
    Ok(())
}
