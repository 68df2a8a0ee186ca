use super::*;

/// Note shown under a variant button.
pub fn rewards_note(client: &CompletionClient, status: &CompletionStatus, index: usize) -> &'static str {
    if !client.is_enabled() {
        "practice mode"
    } else if status.is_completed(index) {
        "done today · no rewards"
    } else if status.flags.is_none() {
        "checking rewards…"
    } else {
        "rewards available"
    }
}

/// Spawn the start screen.
///
/// Layout:
/// ```text
/// ┌─────────────────────────────┐
/// │        TOWER STACK          │
/// │  Tap to drop. Stack high.   │
/// │                             │
/// │      [ BOX STACK ]          │
/// │      rewards available      │
/// │    [ DOUGHNUT STACK ]       │
/// │      rewards available      │
/// │         [ QUIT ]            │
/// └─────────────────────────────┘
/// ```
pub(super) fn setup_main_menu(
    mut commands: Commands,
    config: Res<StackConfig>,
    client: Res<CompletionClient>,
    status: Res<CompletionStatus>,
) {
    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                flex_direction: FlexDirection::Column,
                ..default()
            },
            BackgroundColor(panel_bg()),
            MainMenuRoot,
        ))
        .with_children(|root| {
            root.spawn(label("TOWER STACK", 48.0, title_color()));
            spacer(root, 8.0);
            root.spawn(label("Tap to drop. Stack it high.", 16.0, subtitle_color()));
            spacer(root, 44.0);

            for (variant, bg, border) in [
                (GameVariant::Boxes, start_bg(), start_border()),
                (GameVariant::Doughnuts, doughnut_bg(), doughnut_border()),
            ] {
                root.spawn((
                    Button,
                    button_node(),
                    BackgroundColor(bg),
                    BorderColor::all(border),
                    MenuVariantButton(variant),
                ))
                .with_children(|btn| {
                    btn.spawn(label(variant.label(), 18.0, start_text()));
                });
                spacer(root, 4.0);
                let index = config.variant(variant).game_index;
                root.spawn((
                    label(rewards_note(&client, &status, index), 12.0, hint_color()),
                    RewardsNote(variant),
                ));
                spacer(root, 14.0);
            }

            spacer(root, 10.0);
            root.spawn((
                Button,
                button_node(),
                BackgroundColor(quit_bg()),
                BorderColor::all(quit_border()),
                MenuQuitButton,
            ))
            .with_children(|btn| {
                btn.spawn(label("QUIT", 18.0, quit_text()));
            });

            spacer(root, 36.0);
            root.spawn(label("B / D to start · Space to drop", 12.0, hint_color()));
        });
}

/// Recursively despawn all start-screen entities.
pub(super) fn cleanup_main_menu(mut commands: Commands, query: Query<Entity, With<MainMenuRoot>>) {
    for entity in query.iter() {
        commands.entity(entity).despawn();
    }
}

/// Rewrite the rewards notes once the completion status arrives.
pub(super) fn rewards_note_system(
    config: Res<StackConfig>,
    client: Res<CompletionClient>,
    status: Res<CompletionStatus>,
    mut notes: Query<(&RewardsNote, &mut Text)>,
) {
    if !status.is_changed() {
        return;
    }
    for (note, mut text) in notes.iter_mut() {
        let index = config.variant(note.0).game_index;
        let wanted = rewards_note(&client, &status, index);
        if text.0 != wanted {
            text.0 = wanted.to_string();
        }
    }
}

/// Handle variant and quit presses, plus the `B`/`D` shortcuts.
#[allow(clippy::type_complexity)]
pub(super) fn menu_button_system(
    variant_query: Query<(&Interaction, &Children, &MenuVariantButton), Changed<Interaction>>,
    quit_query: Query<(&Interaction, &Children), (Changed<Interaction>, With<MenuQuitButton>)>,
    mut btn_text: Query<&mut TextColor>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut selected: ResMut<SelectedVariant>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<bevy::app::AppExit>,
) {
    let mut chosen = keys.as_deref().and_then(|keys| {
        if keys.just_pressed(KeyCode::KeyB) {
            Some(GameVariant::Boxes)
        } else if keys.just_pressed(KeyCode::KeyD) {
            Some(GameVariant::Doughnuts)
        } else {
            None
        }
    });

    for (interaction, children, button) in variant_query.iter() {
        if *interaction == Interaction::Pressed {
            chosen = Some(button.0);
        }
        highlight_children(interaction, children, start_text(), &mut btn_text);
    }

    if let Some(variant) = chosen {
        selected.0 = variant;
        next_state.set(GameState::Playing);
        return;
    }

    for (interaction, children) in quit_query.iter() {
        if *interaction == Interaction::Pressed {
            exit.write(bevy::app::AppExit::Success);
        }
        highlight_children(interaction, children, quit_text(), &mut btn_text);
    }
}

/// Skip the start screen once when launched with `STACK_VARIANT`.
pub(super) fn auto_start_system(
    mut commands: Commands,
    auto: Option<Res<AutoStart>>,
    selected: Res<SelectedVariant>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if auto.is_none() {
        return;
    }
    info!("Auto-starting {}", selected.0.label());
    commands.remove_resource::<AutoStart>();
    next_state.set(GameState::Playing);
}
