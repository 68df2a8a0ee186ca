//! End-to-end stacking sessions driven headless through [`StackingPlugin`].
//!
//! Rapier is not added: the tests play the physics engine themselves by
//! placing the current piece where it would come to rest, zeroing its
//! velocity, and writing the contact message Rapier would have sent.
//! Everything downstream (grading, settling, freezing, collapse, game-over)
//! is the real code path.
//!
//! Covered scenarios:
//! 1. Five perfect drops stack five pieces with a rising score.
//! 2. A drop 90% of a width off the previous piece ends the game without
//!    points and moves to `GameOver` on the next frame.
//! 3. The first drop is always graded perfect.
//! 4. A frozen piece pushed out of place snaps back.
//! 5. Tilting a settled piece past the limit collapses the tower on the same
//!    frame; tilting the oscillating piece does not.
//! 6. The doughnut variant completes after its target count.
//! 7. A drop graded as a fail that still lands on the stack ends the game
//!    once it comes to rest.
//! 8. A falling piece off the stack survives the grace window, fails after
//!    it, and gets a fresh window when it swings back over the stack.
//! 9. A landed piece that is only stopped for one frame is not judged yet.

use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier2d::prelude::{CollisionEvent, Velocity};
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;
use std::time::Duration;
use tower_stack::config::StackConfig;
use tower_stack::constants::SETTLE_STILL_FRAMES;
use tower_stack::landing::DropRequest;
use tower_stack::menu::{GameState, SelectedVariant};
use tower_stack::spawner::StackRng;
use tower_stack::stacking::StackingPlugin;
use tower_stack::state::{
    CollapseCause, FailDirection, GameSession, GameVariant, HitAccuracy, LastResult,
    SessionOutcome, StackedObject,
};
use tower_stack::world::SimulationWorld;

/// Frames to let a freshly placed piece settle and become freezable.
const SETTLE_FRAMES: usize = 45;

/// Frames a landed piece must stay stopped before it is judged.
const STILL_FRAMES: usize = SETTLE_STILL_FRAMES as usize;

/// Frames at 60 Hz.
fn frames(secs: f32) -> usize {
    (secs * 60.0).round() as usize
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn session_app(variant: GameVariant) -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(
        1.0 / 60.0,
    )));
    app.insert_resource(StackConfig::default());
    app.insert_resource(StackRng::seeded(11));
    app.insert_resource(SelectedVariant(variant));
    app.insert_state(GameState::Playing);
    app.add_plugins(StackingPlugin);
    app.update(); // OnEnter(Playing) builds the session
    app
}

fn session(app: &App) -> &GameSession {
    app.world().resource::<GameSession>()
}

fn state(app: &App) -> GameState {
    app.world().resource::<State<GameState>>().get().clone()
}

fn current(app: &App) -> Entity {
    session(app)
        .current_entity()
        .expect("an oscillating piece should exist")
}

fn translation(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).expect("piece transform").translation
}

fn run(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

/// Height at which the next piece rests: on the ground for the first piece,
/// slightly overlapping the last placed piece otherwise.
fn rest_height(app: &App) -> f32 {
    let s = session(app);
    let h = s.layout.object.height;
    match s.last_placed {
        Some(top) => translation(app, top).y + h * 0.95,
        None => s.layout.ground_top + h * 0.5,
    }
}

/// Drop the current piece from above the centre, then hold it at `at`.
fn drop_and_hold_at(app: &mut App, at: Vec2) -> Entity {
    let piece = current(app);
    let center = session(app).layout.center_x();
    if let Some(mut transform) = app.world_mut().get_mut::<Transform>(piece) {
        transform.translation.x = center;
    }
    app.world_mut().write_message(DropRequest);
    app.update();
    hold(app, piece, at);
    piece
}

/// Pin a piece at `at` with zero velocity, as a resting body would be.
fn hold(app: &mut App, piece: Entity, at: Vec2) {
    let mut entity = app.world_mut().entity_mut(piece);
    if let Some(mut transform) = entity.get_mut::<Transform>() {
        transform.translation.x = at.x;
        transform.translation.y = at.y;
    }
    if let Some(mut velocity) = entity.get_mut::<Velocity>() {
        *velocity = Velocity::zero();
    }
}

/// Report the first contact of `piece` and run the frame that sees it.
fn touch_down(app: &mut App, piece: Entity) {
    let ground = app
        .world()
        .resource::<SimulationWorld>()
        .ground()
        .expect("ground slab");
    app.world_mut().write_message(CollisionEvent::Started(
        piece,
        ground,
        CollisionEventFlags::empty(),
    ));
    app.update();
}

/// Drop the current piece and land it at `x` on top of the stack.
///
/// Returns after the frame on which the landed piece is judged.
fn drop_and_land_at(app: &mut App, x: f32) -> Entity {
    let piece = current(app);
    if let Some(mut transform) = app.world_mut().get_mut::<Transform>(piece) {
        transform.translation.x = x;
    }
    app.world_mut().write_message(DropRequest);
    app.update();

    let y = rest_height(app);
    hold(app, piece, Vec2::new(x, y));
    touch_down(app, piece);
    run(app, STILL_FRAMES - 1);
    piece
}

/// Land a perfectly centred piece and let it settle.
fn stack_perfect(app: &mut App) -> Entity {
    let x = session(app).layout.center_x();
    let piece = drop_and_land_at(app, x);
    run(app, SETTLE_FRAMES);
    piece
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn five_perfect_drops_build_a_tower() {
    let mut app = session_app(GameVariant::Boxes);
    let mut last_score = 0;
    for n in 1..=5 {
        stack_perfect(&mut app);
        let s = session(&app);
        assert_eq!(s.stacked, n, "piece {n} must be stacked");
        assert!(s.score > last_score, "score must rise with every piece");
        last_score = s.score;
        assert!(s.outcome.is_none(), "no game-over expected: {:?}", s.outcome);
    }
    assert_eq!(session(&app).score, 50);
    assert_eq!(state(&app), GameState::Playing);
}

#[test]
fn far_offset_drop_ends_the_game() {
    let mut app = session_app(GameVariant::Boxes);
    stack_perfect(&mut app);
    let score_before = session(&app).score;

    let s = session(&app);
    let x = s.layout.center_x() + s.layout.object.width * 0.9;
    drop_and_land_at(&mut app, x);

    let s = session(&app);
    // Too far out to rest on the previous piece at all.
    assert!(
        matches!(
            s.outcome,
            Some(SessionOutcome::Collapsed {
                cause: CollapseCause::MissedStack,
                ..
            })
        ),
        "expected a missed stack, got {:?}",
        s.outcome
    );
    assert_eq!(s.score, score_before, "a failed drop scores nothing");
    assert_eq!(s.stacked, 1);

    app.update();
    assert_eq!(state(&app), GameState::GameOver);
    let result = &app.world().resource::<LastResult>().0;
    assert_eq!(result.score, score_before);
    assert_eq!(result.fail_direction, Some(FailDirection::Right));
}

#[test]
fn first_drop_is_perfect() {
    let mut app = session_app(GameVariant::Boxes);
    // Well off centre: with nothing below, the offset cannot be measured.
    let x = session(&app).layout.bounce_min_x;
    let piece = drop_and_land_at(&mut app, x);

    let grade = app.world().get::<StackedObject>(piece).and_then(|p| p.hit_accuracy);
    assert_eq!(grade, Some(HitAccuracy::Perfect));
    assert_eq!(
        session(&app).score,
        app.world().resource::<StackConfig>().perfect_points
    );
}

#[test]
fn frozen_piece_snaps_back_after_being_pushed() {
    let mut app = session_app(GameVariant::Boxes);
    let bottom = stack_perfect(&mut app);
    stack_perfect(&mut app);
    stack_perfect(&mut app);

    let pose = app
        .world()
        .get::<StackedObject>(bottom)
        .and_then(|p| p.frozen)
        .expect("the bottom piece should be frozen under two settled pieces");

    if let Some(mut transform) = app.world_mut().get_mut::<Transform>(bottom) {
        transform.translation.x += 0.5;
        transform.rotation = Quat::from_rotation_z(0.2);
    }
    app.update();

    let transform = app.world().get::<Transform>(bottom).expect("bottom piece");
    assert!((transform.translation.truncate() - pose.position).length() < 1e-4);
    assert!(transform.rotation.angle_between(Quat::from_rotation_z(pose.angle)) < 1e-4);
    assert!(session(&app).outcome.is_none());
}

#[test]
fn tilting_a_settled_piece_collapses_on_the_same_frame() {
    let mut app = session_app(GameVariant::Boxes);
    stack_perfect(&mut app);
    let top = stack_perfect(&mut app);

    // The oscillating piece is not part of the tower yet.
    let swinging = current(&app);
    if let Some(mut transform) = app.world_mut().get_mut::<Transform>(swinging) {
        transform.rotation = Quat::from_rotation_z(30f32.to_radians());
    }
    app.update();
    assert!(session(&app).outcome.is_none());

    if let Some(mut transform) = app.world_mut().get_mut::<Transform>(top) {
        transform.rotation = Quat::from_rotation_z(12f32.to_radians());
    }
    app.update();
    assert!(matches!(
        session(&app).outcome,
        Some(SessionOutcome::Collapsed {
            cause: CollapseCause::Tilted,
            at: None
        })
    ));
}

#[test]
fn doughnuts_complete_at_the_target_count() {
    let mut app = session_app(GameVariant::Doughnuts);
    let target = app
        .world()
        .resource::<StackConfig>()
        .doughnuts
        .target_count
        .expect("doughnuts have a target");

    for _ in 0..target - 1 {
        stack_perfect(&mut app);
        assert!(session(&app).outcome.is_none());
    }
    let x = session(&app).layout.center_x();
    drop_and_land_at(&mut app, x);
    assert_eq!(session(&app).outcome, Some(SessionOutcome::Completed));
    assert!(
        session(&app).current.is_none(),
        "no piece spawns after completion"
    );

    app.update();
    assert_eq!(state(&app), GameState::GameOver);
    let result = &app.world().resource::<LastResult>().0;
    assert!(result.completed);
    assert_eq!(result.stacked, target);
    assert_eq!(result.fail_direction, None);
    assert_eq!(
        result.coins,
        app.world().resource::<StackConfig>().doughnuts.completion_coins
    );
}

#[test]
fn failed_drop_that_lands_on_the_stack_still_ends_the_game() {
    let mut app = session_app(GameVariant::Boxes);
    stack_perfect(&mut app);
    let score_before = session(&app).score;

    // Beyond the normal band, but close enough to rest on the piece below.
    let s = session(&app);
    let x = s.layout.center_x() + s.layout.object.width * 0.7;
    let piece = drop_and_land_at(&mut app, x);

    let s = session(&app);
    assert!(
        matches!(
            s.outcome,
            Some(SessionOutcome::Collapsed {
                cause: CollapseCause::OffsetMiss,
                ..
            })
        ),
        "expected an offset miss, got {:?}",
        s.outcome
    );
    assert_eq!(s.score, score_before);
    assert_eq!(s.stacked, 1);
    let piece = app.world().get::<StackedObject>(piece).expect("failed piece");
    assert!(!piece.settled);

    app.update();
    assert_eq!(state(&app), GameState::GameOver);
    let result = &app.world().resource::<LastResult>().0;
    assert_eq!(result.fail_direction, Some(FailDirection::Right));
}

#[test]
fn off_stack_piece_fails_after_the_grace_window() {
    let mut app = session_app(GameVariant::Boxes);
    stack_perfect(&mut app);

    let s = session(&app);
    let away = Vec2::new(
        s.layout.center_x() + s.layout.object.width * 2.5,
        rest_height(&app),
    );
    let piece = drop_and_hold_at(&mut app, away);

    run(&mut app, frames(0.4));
    assert!(session(&app).outcome.is_none(), "still inside the grace window");
    assert_eq!(session(&app).current_entity(), Some(piece));

    run(&mut app, frames(0.15));
    assert!(
        matches!(
            session(&app).outcome,
            Some(SessionOutcome::Collapsed {
                cause: CollapseCause::FellOffStack,
                at: Some(_)
            })
        ),
        "expected a fall off the stack, got {:?}",
        session(&app).outcome
    );
}

#[test]
fn returning_over_the_stack_restarts_the_grace_window() {
    let mut app = session_app(GameVariant::Boxes);
    stack_perfect(&mut app);

    let s = session(&app);
    let center = s.layout.center_x();
    let width = s.layout.object.width;
    let y = rest_height(&app);
    let away = Vec2::new(center + width * 2.5, y);

    let piece = drop_and_hold_at(&mut app, away);
    run(&mut app, frames(0.3));

    hold(&mut app, piece, Vec2::new(center, y));
    app.update();
    let timer = session(&app).current.map(|c| c.off_stack_secs);
    assert_eq!(timer, Some(0.0), "back over the stack clears the timer");

    hold(&mut app, piece, away);
    run(&mut app, frames(0.4));
    // 0.7 s off the stack in total, but never 0.5 s in one stretch.
    assert!(session(&app).outcome.is_none());
}

#[test]
fn one_still_frame_is_not_rest() {
    let mut app = session_app(GameVariant::Boxes);
    let x = session(&app).layout.center_x();
    let y = rest_height(&app);
    let piece = drop_and_hold_at(&mut app, Vec2::new(x, y));

    // Contact at the apex of a bounce: momentarily stopped.
    touch_down(&mut app, piece);
    assert_eq!(session(&app).stacked, 0);

    // On its way up again.
    if let Some(mut velocity) = app.world_mut().get_mut::<Velocity>(piece) {
        velocity.linvel = Vec2::new(0.0, 0.8);
    }
    app.update();
    assert_eq!(session(&app).stacked, 0);

    hold(&mut app, piece, Vec2::new(x, y));
    app.update();
    assert_eq!(session(&app).stacked, 0, "one stopped frame is not enough");
    app.update();
    assert_eq!(session(&app).stacked, 1);
    assert_eq!(session(&app).last_placed, Some(piece));
}
