//! Session lifecycle: start, clock, game-over hand-off, and teardown.
//!
//! A session lives exactly as long as the [`GameSession`] resource.  It is
//! created on `OnEnter(Playing)` (after tearing down any previous one), and
//! removed when the player retries or returns to the menu.  Between those
//! points the world's bodies belong to it alone.

use crate::config::StackConfig;
use crate::constants::{DEFAULT_WINDOW_HEIGHT_PX, DEFAULT_WINDOW_WIDTH_PX};
use crate::effects::TransientEffect;
use crate::menu::{GameState, SelectedVariant};
use crate::report::{dispatch_report, rewards_available, CompletionClient, CompletionReport, CompletionStatus};
use crate::spawner::{spawn_object, StackRng};
use crate::state::{GameSession, LastResult, SessionLayout, StackedObject};
use crate::world::SimulationWorld;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_rapier2d::prelude::*;

/// Run condition: a session exists and has not ended.
pub fn session_active(session: Option<Res<GameSession>>) -> bool {
    session.is_some_and(|s| !s.is_over())
}

/// Build a fresh world and session for the selected variant and spawn the
/// first piece.
#[allow(clippy::too_many_arguments)]
pub fn start_session(
    mut commands: Commands,
    config: Res<StackConfig>,
    selected: Res<SelectedVariant>,
    client: Res<CompletionClient>,
    status: Res<CompletionStatus>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut world: ResMut<SimulationWorld>,
    mut rng: ResMut<StackRng>,
) {
    let window_px = windows
        .single()
        .map(|w| Vec2::new(w.width(), w.height()))
        .unwrap_or(Vec2::new(DEFAULT_WINDOW_WIDTH_PX, DEFAULT_WINDOW_HEIGHT_PX));
    let variant = selected.0;
    let layout = SessionLayout::derive(window_px, &config, variant);

    *world = SimulationWorld::create(layout.gravity);
    world.spawn_ground(&mut commands, &layout);

    let mut session = GameSession::new(variant, layout, &config);
    session.rewards_available =
        rewards_available(&client, &status, config.variant(variant).game_index);
    spawn_object(&mut commands, &world, &mut session, &config, &mut rng.0);

    info!(
        "Session started: {} ({:.2} m pieces, gravity {:.1} m/s², rewards {})",
        variant.label(),
        layout.object.width,
        layout.gravity,
        if session.rewards_available { "on" } else { "off" }
    );
    commands.insert_resource(session);
}

/// Despawn every body and effect of the previous session and drop it.
pub fn teardown_session(
    mut commands: Commands,
    mut world: ResMut<SimulationWorld>,
    pieces: Query<Entity, With<StackedObject>>,
    effects: Query<Entity, With<TransientEffect>>,
) {
    world.teardown(&mut commands, pieces.iter());
    for entity in effects.iter() {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<GameSession>();
}

/// Accumulate wall-clock session time.
pub fn session_clock_system(time: Res<Time>, mut session: ResMut<GameSession>) {
    session.elapsed += time.delta_secs();
}

/// Once the session has an outcome: tally it, report it if rewarded, and
/// switch to the game-over screen.
pub fn game_over_system(
    mut commands: Commands,
    config: Res<StackConfig>,
    session: Res<GameSession>,
    client: Res<CompletionClient>,
    pieces: Query<&Transform, With<StackedObject>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !session.is_over() {
        return;
    }
    let last_x = session
        .last_placed
        .and_then(|e| pieces.get(e).ok())
        .map(|t| t.translation.x);
    let result = session.result(&config, last_x);
    info!(
        "Game over: {} stacked, score {}, {} s, {} coins, direction {}",
        result.stacked,
        result.score,
        result.duration_secs,
        result.coins,
        result.fail_direction.map_or("-", |d| d.label())
    );

    if session.rewards_available {
        let index = config.variant(session.variant).game_index;
        dispatch_report(
            &client,
            CompletionReport::from_result(&result, &config.report.login_id, index),
        );
    }
    commands.insert_resource(LastResult(result));
    next_state.set(GameState::GameOver);
}

/// Stop stepping the physics pipeline while the game-over overlay is up.
pub fn pause_physics(mut rapier_config: Query<&mut RapierConfiguration>) {
    for mut cfg in rapier_config.iter_mut() {
        cfg.physics_pipeline_active = false;
    }
}
