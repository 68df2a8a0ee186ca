use super::*;

/// Whether retry is allowed `elapsed` seconds after game-over.
#[inline]
pub fn retry_unlocked(elapsed: f32, lockout_secs: f32) -> bool {
    elapsed >= lockout_secs
}

/// Retry button text, with a whole-second countdown while locked.
pub fn retry_label(elapsed: f32, lockout_secs: f32) -> String {
    if retry_unlocked(elapsed, lockout_secs) {
        "RETRY".to_string()
    } else {
        format!("RETRY ({})", (lockout_secs - elapsed).ceil() as u32)
    }
}

/// Overlay headline for a result.
pub fn result_title(result: &GameSessionResult) -> &'static str {
    match result.fail_direction {
        Some(_) => "THE TOWER FELL",
        None => "STACK COMPLETE!",
    }
}

/// Spawn the game-over overlay over the frozen tower.
pub(super) fn setup_game_over(
    mut commands: Commands,
    config: Res<StackConfig>,
    last: Option<Res<LastResult>>,
    mut timer: ResMut<GameOverTimer>,
) {
    *timer = GameOverTimer::default();
    let Some(last) = last else {
        warn!("Game over without a recorded result");
        return;
    };
    let result = &last.0;

    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                position_type: PositionType::Absolute,
                left: Val::Px(0.0),
                top: Val::Px(0.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.55)),
            ZIndex(300),
            GameOverRoot,
        ))
        .with_children(|overlay| {
            overlay
                .spawn((
                    Node {
                        flex_direction: FlexDirection::Column,
                        align_items: AlignItems::Center,
                        padding: UiRect::all(Val::Px(32.0)),
                        row_gap: Val::Px(10.0),
                        border: UiRect::all(Val::Px(2.0)),
                        min_width: Val::Px(300.0),
                        ..default()
                    },
                    BackgroundColor(panel_bg()),
                    BorderColor::all(start_border()),
                ))
                .with_children(|card| {
                    card.spawn(label(result_title(result), 34.0, title_color()));
                    spacer(card, 4.0);

                    let mut lines = vec![
                        format!("Score: {}", result.score),
                        format!("Stacked: {}", result.stacked),
                        format!("Time: {} s", result.duration_secs),
                        format!("Coins: {}", result.coins),
                    ];
                    if let Some(direction) = result.fail_direction {
                        lines.push(format!("Fell to the {}", direction.label()));
                    }
                    for line in lines {
                        card.spawn(label(line, 18.0, subtitle_color()));
                    }

                    spacer(card, 8.0);

                    card.spawn((
                        Button,
                        button_node(),
                        BackgroundColor(start_bg()),
                        BorderColor::all(start_border()),
                        GameOverRetryButton,
                    ))
                    .with_children(|btn| {
                        btn.spawn((
                            label(retry_label(0.0, config.retry_lockout_secs), 18.0, locked_text()),
                            RetryLabel,
                        ));
                    });

                    card.spawn((
                        Button,
                        button_node(),
                        BackgroundColor(quit_bg()),
                        BorderColor::all(quit_border()),
                        GameOverMenuButton,
                    ))
                    .with_children(|btn| {
                        btn.spawn(label("MENU", 18.0, quit_text()));
                    });

                    spacer(card, 4.0);
                    card.spawn(label("Enter to retry · Esc for menu", 12.0, hint_color()));
                });
        });
}

/// Recursively despawn all game-over overlay entities.
pub(super) fn cleanup_game_over(mut commands: Commands, query: Query<Entity, With<GameOverRoot>>) {
    for entity in query.iter() {
        commands.entity(entity).despawn();
    }
}

/// Advance the retry lockout and refresh the countdown label.
pub(super) fn game_over_timer_system(
    time: Res<Time>,
    config: Res<StackConfig>,
    mut timer: ResMut<GameOverTimer>,
    mut labels: Query<(&mut Text, &mut TextColor), With<RetryLabel>>,
) {
    timer.elapsed += time.delta_secs();
    let wanted = retry_label(timer.elapsed, config.retry_lockout_secs);
    for (mut text, mut color) in labels.iter_mut() {
        if text.0 != wanted {
            text.0.clone_from(&wanted);
            if retry_unlocked(timer.elapsed, config.retry_lockout_secs) {
                *color = TextColor(start_text());
            }
        }
    }
}

/// Handle Retry / Menu actions in the game-over overlay.
#[allow(clippy::type_complexity)]
pub(super) fn game_over_button_system(
    retry_query: Query<(&Interaction, &Children), (Changed<Interaction>, With<GameOverRetryButton>)>,
    menu_query: Query<(&Interaction, &Children), (Changed<Interaction>, With<GameOverMenuButton>)>,
    mut btn_text: Query<&mut TextColor>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    config: Res<StackConfig>,
    timer: Res<GameOverTimer>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let unlocked = retry_unlocked(timer.elapsed, config.retry_lockout_secs);
    let key = |code: KeyCode| keys.as_deref().is_some_and(|k| k.just_pressed(code));

    let wants_retry = key(KeyCode::Enter)
        || key(KeyCode::Space)
        || retry_query.iter().any(|(i, _)| *i == Interaction::Pressed);
    if wants_retry && unlocked {
        info!("Retrying");
        next_state.set(GameState::Playing);
        return;
    }

    if key(KeyCode::Escape) || menu_query.iter().any(|(i, _)| *i == Interaction::Pressed) {
        next_state.set(GameState::MainMenu);
        return;
    }

    for (interaction, children) in menu_query.iter() {
        highlight_children(interaction, children, quit_text(), &mut btn_text);
    }
}
