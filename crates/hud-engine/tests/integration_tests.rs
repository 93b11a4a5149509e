use std::{collections::BTreeMap, time::Duration};

use hud_config::{FlagStore, FlagUpdate, Role, Settings, UserFlags};
use hud_engine::{
    Error, SettingsStore, UserInfo,
    test_support::{DialogCall, TestHud, actor, player, token},
};
use hud_protocol::{
    ActionEvent, ActionId, ActionRef, ActorId, Direction, DirectionSetting, GroupId, GroupNode,
    NestId, Point, Position, RefreshTrigger, TokenId, UserId, ViewMsg, ViewTarget, Viewport,
};
use hud_state::GroupEvent;
use tokio::time;

/// Long enough for the debounce window and an instant pipeline.
async fn settle() {
    time::sleep(Duration::from_millis(100)).await;
}

fn weapons() -> Vec<GroupNode> {
    vec![
        GroupNode::new(NestId::new("weapons"), "Weapons")
            .with_action(ActionRef::new("attack", "Attack")),
    ]
}

fn spells() -> Vec<GroupNode> {
    vec![
        GroupNode::new(NestId::new("spells"), "Spells")
            .with_action(ActionRef::new("fireball", "Fireball")),
        GroupNode::new(NestId::new("utility"), "Utility"),
    ]
}

fn gid(nest: &str) -> GroupId {
    NestId::new(nest).group_id()
}

fn click_mode() -> Settings {
    Settings {
        click_open: true,
        ..Settings::default()
    }
}

fn select(hud: &TestHud, tokens: &[(&str, &str)]) {
    hud.canvas.select(
        tokens
            .iter()
            .map(|(t, a)| token(t, a, "u1"))
            .collect(),
    );
    hud.engine.request_update(RefreshTrigger::Selection {
        tokens: tokens.iter().map(|(t, _)| TokenId::new(*t)).collect(),
    });
}

fn rendered(msgs: &[ViewMsg]) -> usize {
    msgs.iter()
        .filter(|m| matches!(m, ViewMsg::Render { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_restores_open_group_across_selection() {
    let mut hud = TestHud::new(click_mode(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    hud.actions.set_tree("A2", weapons());
    hud.actions.set_tree("A3", spells());

    select(&hud, &[("T1", "A1")]);
    settle().await;
    let subject = hud.engine.subject().unwrap();
    assert_eq!(subject.actor_id, Some(ActorId::new("A1")));
    assert_eq!(subject.token_id, Some(TokenId::new("T1")));
    assert_eq!(hud.actions.subject(), Some(subject.clone()));
    assert_eq!(hud.rolls.subject(), Some(subject));
    assert_eq!(rendered(&hud.drain()), 1);
    assert_eq!(hud.engine.snapshot().unwrap().group_count(), 1);

    hud.engine
        .on_group_event(GroupEvent::Click(gid("weapons")))
        .await
        .unwrap();
    assert_eq!(hud.engine.hovered_groups().await, vec![gid("weapons")]);
    assert_eq!(hud.resizer.resized(), vec![gid("weapons")]);
    hud.drain();

    // A2 also has a weapons group: restored open.
    select(&hud, &[("T2", "A2")]);
    settle().await;
    assert_eq!(hud.engine.open_groups().await, vec![gid("weapons")]);
    assert_eq!(hud.engine.hovered_groups().await, vec![gid("weapons")]);
    let msgs = hud.drain();
    let render_at = msgs
        .iter()
        .position(|m| matches!(m, ViewMsg::Render { .. }))
        .unwrap();
    let reopen_at = msgs
        .iter()
        .position(|m| {
            matches!(m, ViewMsg::SetOpen { group, open: true } if *group == gid("weapons"))
        })
        .unwrap();
    assert!(render_at < reopen_at);

    // A3 has no weapons group: dropped silently.
    select(&hud, &[("T3", "A3")]);
    settle().await;
    assert!(hud.engine.open_groups().await.is_empty());
    assert!(hud.engine.hovered_groups().await.is_empty());
    assert!(hud.engine.is_open().await);
}

#[tokio::test(start_paused = true)]
async fn test_requests_during_rebuild_trigger_exactly_one_more() {
    let hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    hud.actions.set_latency(Duration::from_millis(200));
    select(&hud, &[("T1", "A1")]);

    time::sleep(Duration::from_millis(50)).await;
    assert!(hud.engine.is_updating());
    for i in 0..10 {
        hud.engine
            .request_update(RefreshTrigger::manual(format!("burst{i}")));
    }
    time::sleep(Duration::from_secs(2)).await;

    assert_eq!(hud.actions.builds(), 2);
    assert_eq!(hud.actions.max_concurrent(), 1);
    assert_eq!(hud.engine.rebuilds_completed(), 2);
    assert!(!hud.engine.is_updating());
}

#[tokio::test(start_paused = true)]
async fn test_debounce_coalesces_burst_using_latest_state() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    hud.actions.set_tree("A2", spells());

    select(&hud, &[("T1", "A1")]);
    time::sleep(Duration::from_millis(5)).await;
    select(&hud, &[("T1", "A1"), ("T2", "A2")]);
    time::sleep(Duration::from_millis(5)).await;
    select(&hud, &[("T2", "A2")]);
    settle().await;

    assert_eq!(hud.actions.builds(), 1);
    assert_eq!(
        hud.engine.subject().unwrap().actor_id,
        Some(ActorId::new("A2"))
    );
    assert_eq!(rendered(&hud.drain()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_subject_closes_and_clears_hovered() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    hud.engine
        .on_group_event(GroupEvent::PointerEnter(gid("weapons")))
        .await
        .unwrap();
    assert_eq!(hud.engine.hovered_groups().await.len(), 1);
    hud.drain();

    select(&hud, &[]);
    settle().await;
    assert!(!hud.engine.is_open().await);
    assert!(hud.engine.snapshot().is_none());
    assert!(hud.engine.hovered_groups().await.is_empty());
    assert_eq!(hud.drain(), vec![ViewMsg::Close]);
    assert_eq!(hud.actions.subject(), None);
}

#[tokio::test(start_paused = true)]
async fn test_unowned_token_is_treated_as_no_subject() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    hud.canvas.select(vec![token("T1", "A1", "someone-else")]);
    hud.engine.request_update(RefreshTrigger::manual("test"));
    settle().await;
    assert!(!hud.engine.is_open().await);
    assert_eq!(hud.actions.builds(), 0);
    assert!(hud.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_build_failure_closes_without_wedging() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    assert!(hud.engine.is_open().await);

    hud.actions.set_fail(true);
    hud.engine.request_update(RefreshTrigger::manual("fail"));
    settle().await;
    assert!(!hud.engine.is_open().await);
    assert!(!hud.engine.is_updating());
    assert!(hud.drain().contains(&ViewMsg::Close));

    hud.actions.set_fail(false);
    hud.engine.request_update(RefreshTrigger::manual("recover"));
    settle().await;
    assert!(hud.engine.is_open().await);
}

#[tokio::test(start_paused = true)]
async fn test_empty_tree_closes() {
    let hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", Vec::new());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    assert_eq!(hud.actions.builds(), 1);
    assert!(!hud.engine.is_open().await);
    assert!(hud.engine.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_multiple_selection_renders_action_less_hud() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1"), ("T2", "A2")]);
    settle().await;

    assert_eq!(hud.actions.builds(), 0);
    let snap = hud.engine.snapshot().unwrap();
    assert!(snap.is_empty());
    assert_eq!(snap.character_name, "Multiple");
    assert!(hud.engine.subject().unwrap().is_multiple);
    assert_eq!(hud.rolls.subject().unwrap().actor_id, None);
    assert_eq!(rendered(&hud.drain()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_failure_is_swallowed_and_blurs() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    hud.drain();

    hud.rolls.set_fail(true);
    let attack = ActionId::new("attack");
    hud.engine.on_action(&attack, ActionEvent::default()).await;
    assert_eq!(hud.rolls.dispatched(), vec![attack.clone()]);
    assert_eq!(hud.drain(), vec![ViewMsg::Blur]);

    hud.rolls.set_fail(false);
    hud.engine.on_action(&attack, ActionEvent::default()).await;
    assert_eq!(hud.rolls.dispatched().len(), 2);
    assert_eq!(hud.drain(), vec![ViewMsg::Blur]);
}

#[tokio::test(start_paused = true)]
async fn test_save_actor_only_on_selection_switch() {
    let hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    hud.actions.set_tree("A2", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    hud.engine
        .request_update(RefreshTrigger::ActorUpdate {
            actor: ActorId::new("A1"),
        });
    settle().await;
    select(&hud, &[("T2", "A2")]);
    settle().await;
    let saves: Vec<bool> = hud.actions.options().iter().map(|o| o.save_actor).collect();
    assert_eq!(saves, vec![true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_lock_pruning_and_persistence() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A3", spells());
    select(&hud, &[("T3", "A3")]);
    settle().await;
    let msgs = hud.drain();
    assert!(msgs.contains(&ViewMsg::SetHidden {
        target: ViewTarget::Group(gid("utility")),
        hidden: true,
    }));
    assert!(!msgs.contains(&ViewMsg::SetHidden {
        target: ViewTarget::Group(gid("spells")),
        hidden: true,
    }));

    hud.engine.unlock().await.unwrap();
    assert!(hud.engine.is_unlocked().await);
    assert!(hud.flags.flags().is_unlocked);
    let msgs = hud.drain();
    for g in ["utility", "spells"] {
        assert!(msgs.contains(&ViewMsg::SetHidden {
            target: ViewTarget::Group(gid(g)),
            hidden: false,
        }));
    }

    hud.engine.on_group_context_menu(&gid("spells")).await.unwrap();
    hud.engine.edit_hud().await.unwrap();
    let calls = hud.dialogs.calls();
    assert!(matches!(
        calls.as_slice(),
        [DialogCall::Group(m), DialogCall::Hud] if m.name == "Spells"
    ));

    hud.engine.lock().await.unwrap();
    assert!(!hud.flags.flags().is_unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_input_waits_for_render_effects() {
    let dir = tempfile::tempdir().unwrap();
    let flags = FlagStore::open(&dir.path().join("flags.ron")).unwrap();
    flags.apply(FlagUpdate::Unlocked(true)).await.unwrap();
    let mut hud = TestHud::with_flag_store(
        Settings {
            customization_enabled: false,
            ..Settings::default()
        },
        flags,
    );
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);

    let engine = hud.engine.clone();
    let input = tokio::spawn(async move {
        while !engine.is_open().await {
            time::sleep(Duration::from_millis(1)).await;
        }
        engine
            .on_group_event(GroupEvent::PointerEnter(gid("weapons")))
            .await
            .unwrap();
    });
    input.await.unwrap();
    settle().await;

    let msgs = hud.drain();
    let unlock_hidden_at = msgs
        .iter()
        .position(|m| {
            *m == ViewMsg::SetHidden {
                target: ViewTarget::UnlockButton,
                hidden: true,
            }
        })
        .unwrap();
    let open_at = msgs
        .iter()
        .position(|m| {
            matches!(m, ViewMsg::SetOpen { group, open: true } if *group == gid("weapons"))
        })
        .unwrap();
    assert!(unlock_hidden_at < open_at);
    assert!(!hud.flags.flags().is_unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_stale_position_and_drag_persistence() {
    let flags = UserFlags {
        position: Some(Position::new(-50, 10)),
        ..UserFlags::default()
    };
    let mut hud = TestHud::new(
        Settings {
            direction: DirectionSetting::Auto,
            ..Settings::default()
        },
        flags,
    );
    hud.canvas.set_viewport(Viewport {
        width: 1600,
        height: 1000,
    });
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    assert_eq!(hud.engine.position().await, Position::new(80, 10));
    assert!(hud.drain().contains(&ViewMsg::MoveFrame(Position::new(80, 10))));

    assert!(hud.engine.begin_drag(Point::new(0, 0)).await);
    hud.engine
        .drag_move(Point::new(100, 600))
        .await
        .unwrap();
    hud.engine.animation_frame().await.unwrap();
    hud.engine.end_drag().await.unwrap();
    assert_eq!(hud.flags.flags().position, Some(Position::new(680, 110)));
    let msgs = hud.drain();
    assert!(msgs.contains(&ViewMsg::SetDirection(Direction::Up)));

    hud.engine.reset_position().await.unwrap();
    assert_eq!(hud.flags.flags().position, Some(Position::new(80, 150)));
}

#[tokio::test(start_paused = true)]
async fn test_collapse_is_persisted_and_reapplied() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    hud.engine.collapse_hud().await.unwrap();
    assert!(hud.flags.flags().is_collapsed);
    hud.drain();

    hud.engine.request_update(RefreshTrigger::manual("again"));
    settle().await;
    assert!(hud.drain().contains(&ViewMsg::SetHidden {
        target: ViewTarget::GroupsArea,
        hidden: true,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_group_collapse_flag_survives_rebuild() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    let weapons = NestId::new("weapons");
    hud.actions.set_tree(
        "A1",
        vec![
            GroupNode::new(weapons.clone(), "Weapons").with_child(
                GroupNode::new(weapons.child("melee"), "Melee")
                    .with_action(ActionRef::new("sword", "Sword")),
            ),
        ],
    );
    select(&hud, &[("T1", "A1")]);
    settle().await;
    hud.engine
        .on_group_event(GroupEvent::TitleClick(gid("weapons_melee")))
        .await
        .unwrap();
    assert_eq!(
        hud.flags.flags().collapsed_groups.get(&NestId::new("weapons_melee")),
        Some(&true)
    );
    hud.drain();

    hud.engine.request_update(RefreshTrigger::manual("again"));
    settle().await;
    assert!(hud.drain().contains(&ViewMsg::SetCollapsed {
        group: gid("weapons_melee"),
        collapsed: true,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_hud_and_toggle() {
    let mut hud = TestHud::new(
        Settings {
            enable: false,
            ..Settings::default()
        },
        UserFlags::default(),
    );
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    assert!(!hud.engine.is_open().await);
    assert_eq!(hud.actions.builds(), 0);

    assert!(hud.engine.toggle_enabled().await.unwrap());
    settle().await;
    assert!(hud.engine.is_open().await);
    hud.drain();

    assert!(!hud.engine.toggle_enabled().await.unwrap());
    assert!(!hud.engine.is_open().await);
    assert_eq!(hud.drain(), vec![ViewMsg::Close]);
}

#[tokio::test(start_paused = true)]
async fn test_disable_during_slow_rebuild_keeps_hud_closed() {
    let mut hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    hud.actions.set_latency(Duration::from_millis(200));
    select(&hud, &[("T1", "A1")]);
    time::sleep(Duration::from_millis(50)).await;
    assert!(hud.engine.is_updating());

    assert!(!hud.engine.toggle_enabled().await.unwrap());
    time::sleep(Duration::from_secs(1)).await;
    assert!(!hud.engine.is_updating());
    assert!(!hud.engine.is_open().await);
    assert!(hud.engine.snapshot().is_none());
    assert_eq!(rendered(&hud.drain()), 0);
}

fn customized() -> UserFlags {
    let mut collapsed_groups = BTreeMap::new();
    collapsed_groups.insert(NestId::new("weapons"), true);
    UserFlags {
        position: Some(Position::new(300, 300)),
        is_collapsed: true,
        is_unlocked: true,
        collapsed_groups,
    }
}

#[tokio::test(start_paused = true)]
async fn test_reset_user_data_clears_flags_and_layout() {
    let mut hud = TestHud::new(Settings::default(), customized());
    let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
    hud.layouts.set_user(&u1, vec![NestId::new("weapons")]);
    hud.layouts.set_user(&u2, vec![NestId::new("spells")]);
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    assert!(hud.engine.is_unlocked().await);
    assert!(hud.engine.is_collapsed().await);
    hud.drain();

    hud.engine.reset_user_data().await.unwrap();
    assert_eq!(hud.flags.flags(), UserFlags::default());
    assert_eq!(hud.layouts.user_layout(&u1), None);
    assert!(hud.layouts.user_layout(&u2).is_some());
    assert_eq!(hud.actions.resets(), 1);
    assert!(!hud.engine.is_unlocked().await);
    assert!(!hud.engine.is_collapsed().await);

    settle().await;
    assert_eq!(hud.actions.builds(), 2);
    assert_eq!(hud.engine.position().await, Position::new(80, 150));
    assert_eq!(hud.flags.flags(), UserFlags::default());
    assert!(hud.drain().contains(&ViewMsg::SetHidden {
        target: ViewTarget::GroupsArea,
        hidden: false,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_reset_also_persists_default_position() {
    let hud = TestHud::new(Settings::default(), customized());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    assert_eq!(hud.engine.position().await, Position::new(300, 300));

    hud.engine.reset().await.unwrap();
    let flags = hud.flags.flags();
    assert_eq!(flags.position, Some(Position::new(80, 150)));
    assert!(!flags.is_unlocked);
    assert!(!flags.is_collapsed);
    assert!(flags.collapsed_groups.is_empty());
    assert_eq!(hud.engine.position().await, Position::new(80, 150));
}

#[tokio::test(start_paused = true)]
async fn test_reset_user_data_while_closed_sends_nothing() {
    let mut hud = TestHud::new(Settings::default(), customized());
    hud.engine.reset_user_data().await.unwrap();
    assert_eq!(hud.flags.flags(), UserFlags::default());
    assert!(hud.drain().is_empty());
    settle().await;
    assert!(!hud.engine.is_open().await);
}

#[tokio::test(start_paused = true)]
async fn test_actor_data_resets() {
    let hud = TestHud::new(Settings::default(), UserFlags::default());
    let (a1, a2) = (ActorId::new("A1"), ActorId::new("A2"));
    hud.layouts.set_actor(&a1, vec![NestId::new("weapons")]);
    hud.layouts.set_actor(&a2, vec![NestId::new("spells")]);
    hud.actions.set_tree("A1", weapons());

    hud.engine.reset_actor_data().await.unwrap();
    assert!(hud.layouts.actor_layout(&a1).is_some());
    settle().await;
    assert_eq!(hud.actions.builds(), 0);

    select(&hud, &[("T1", "A1")]);
    settle().await;
    hud.engine.reset_actor_data().await.unwrap();
    assert_eq!(hud.layouts.actor_layout(&a1), None);
    assert!(hud.layouts.actor_layout(&a2).is_some());
    settle().await;
    assert_eq!(hud.actions.builds(), 2);

    hud.engine.reset_all_actor_data().await.unwrap();
    assert_eq!(hud.layouts.actor_layout(&a2), None);
    settle().await;
    assert_eq!(hud.actions.builds(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_copy_and_reset_all_user_data() {
    let hud = TestHud::new(Settings::default(), customized());
    let (u1, u2, u3) = (UserId::new("u1"), UserId::new("u2"), UserId::new("u3"));
    let layout = vec![NestId::new("weapons"), NestId::new("spells")];
    hud.layouts.set_user(&u1, layout.clone());

    assert!(!hud.engine.copy_user_data(&u1, &[]).await.unwrap());
    assert!(
        hud.engine
            .copy_user_data(&u1, &[u2.clone(), u3.clone()])
            .await
            .unwrap()
    );
    assert_eq!(hud.layouts.user_layout(&u2), Some(layout.clone()));
    assert_eq!(hud.layouts.user_layout(&u3), Some(layout));

    hud.engine.reset_all_user_data().await.unwrap();
    for u in [&u1, &u2, &u3] {
        assert_eq!(hud.layouts.user_layout(u), None);
    }
    assert_eq!(hud.flags.flags(), UserFlags::default());
    assert_eq!(hud.actions.resets(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_min_role_excludes_players_but_not_gm() {
    let hud = TestHud::new(
        Settings {
            min_role: Role::Trusted,
            ..Settings::default()
        },
        UserFlags::default(),
    );
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    assert!(!hud.engine.is_open().await);

    hud.canvas.set_user(UserInfo {
        role: Role::Gamemaster,
        ..player("u1")
    });
    hud.engine.request_update(RefreshTrigger::manual("gm"));
    settle().await;
    assert!(hud.engine.is_open().await);
}

#[tokio::test(start_paused = true)]
async fn test_always_show_uses_default_character() {
    let hud = TestHud::new(
        Settings {
            always_show: true,
            ..Settings::default()
        },
        UserFlags::default(),
    );
    hud.canvas.set_user(UserInfo {
        character: Some(actor("A9", "u1")),
        ..player("u1")
    });
    hud.canvas.place(vec![token("T9", "A9", "u1")]);
    hud.actions.set_tree("A9", weapons());
    hud.engine.request_update(RefreshTrigger::manual("start"));
    settle().await;
    let subject = hud.engine.subject().unwrap();
    assert_eq!(subject.actor_id, Some(ActorId::new("A9")));
    assert_eq!(subject.token_id, Some(TokenId::new("T9")));

    // Default character's token is relevant even when not controlled.
    assert!(hud.engine.is_valid_token_change(&token("T9", "A9", "u1"), false));
    assert!(!hud.engine.is_valid_token_change(&token("T9", "A9", "u1"), true));
}

#[tokio::test(start_paused = true)]
async fn test_trigger_filters() {
    let hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;

    assert!(hud.engine.is_valid_actor_update(&ActorId::new("A1"), false));
    assert!(!hud.engine.is_valid_actor_update(&ActorId::new("A1"), true));
    assert!(!hud.engine.is_valid_actor_update(&ActorId::new("A2"), false));

    assert!(hud.engine.is_valid_token_change(&token("T1", "A1", "u1"), false));
    assert!(!hud.engine.is_valid_token_change(&token("T5", "A5", "u1"), false));

    // Nothing controlled: the displayed token still counts.
    hud.canvas.select(Vec::new());
    assert!(hud.engine.is_valid_token_change(&token("T1", "A1", "u1"), false));
}

#[tokio::test(start_paused = true)]
async fn test_settings_change_switches_mode() {
    let hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A3", spells());
    select(&hud, &[("T3", "A3")]);
    settle().await;

    // Hover mode: click does not open.
    hud.engine
        .on_group_event(GroupEvent::Click(gid("spells")))
        .await
        .unwrap();
    assert!(hud.engine.open_groups().await.is_empty());

    hud.settings
        .save(click_mode())
        .await
        .unwrap();
    hud.engine.settings_changed().await;
    settle().await;
    hud.engine
        .on_group_event(GroupEvent::Click(gid("spells")))
        .await
        .unwrap();
    assert_eq!(hud.engine.open_groups().await, vec![gid("spells")]);
    hud.engine
        .on_group_event(GroupEvent::Click(gid("utility")))
        .await
        .unwrap();
    assert_eq!(hud.engine.open_groups().await, vec![gid("utility")]);
}

#[tokio::test(start_paused = true)]
async fn test_events_for_unknown_groups_error() {
    let hud = TestHud::new(Settings::default(), UserFlags::default());
    hud.actions.set_tree("A1", weapons());
    select(&hud, &[("T1", "A1")]);
    settle().await;
    let err = hud
        .engine
        .on_group_event(GroupEvent::PointerEnter(GroupId::new("group-missing")))
        .await;
    assert!(matches!(err, Err(Error::State(_))));
    assert_eq!(
        hud.flags.flags(),
        UserFlags::default(),
        "no flag writes on rejected events"
    );
}
