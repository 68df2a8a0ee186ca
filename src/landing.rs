//! Drop handling and the land/settle/fail decision for the current piece.
//!
//! ## Flow
//!
//! 1. `drop_input_system` turns a click, tap or Space into a [`DropRequest`].
//! 2. `apply_drop_system` grades the drop against the previous piece and
//!    hands the body to gravity.
//! 3. `landing_contact_system` marks the first contact and puffs dust.
//! 4. `fall_watch_system` fails a piece that leaves the view or stays off
//!    the stack past the grace window.
//! 5. `settle_check_system` accepts a piece that stays stopped (points,
//!    speed-up, next spawn) or rejects it.

use crate::config::StackConfig;
use crate::effects::{spawn_dust, spawn_score_popup};
use crate::spawner::{spawn_object, StackRng};
use crate::state::{
    CollapseCause, DropPhase, GameSession, HitAccuracy, ObjectDims, SessionOutcome, StackedObject,
};
use crate::world::{log_world_error, BodyMode, SimulationWorld};
use bevy::input::touch::Touches;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// The player asked to drop the oscillating piece.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct DropRequest;

// ── Pure rules ────────────────────────────────────────────────────────────────

/// Grade a drop by its horizontal distance to the previous piece.
pub fn classify_drop(offset: f32, width: f32, config: &StackConfig) -> HitAccuracy {
    let offset = offset.abs();
    if offset <= width * config.perfect_offset_ratio {
        HitAccuracy::Perfect
    } else if offset <= width * config.good_offset_ratio {
        HitAccuracy::Good
    } else if offset <= (width * config.normal_offset_ratio).max(config.normal_offset_min) {
        HitAccuracy::Normal
    } else {
        HitAccuracy::Fail
    }
}

/// Whether a piece at rest at `pos` sits on the piece at `below`.
#[inline]
pub fn is_stacked_on(pos: Vec2, below: Vec2, dims: ObjectDims, config: &StackConfig) -> bool {
    pos.y - below.y > dims.height * config.stacked_min_dy_ratio
        && (pos.x - below.x).abs() < dims.width * config.stacked_max_dx_ratio
}

/// Where a falling piece is relative to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallCheck {
    OnStack,
    OffStack,
    OutOfView,
}

pub fn fall_check(
    pos: Vec2,
    last_placed: Option<Vec2>,
    dims: ObjectDims,
    camera_offset: f32,
    config: &StackConfig,
) -> FallCheck {
    if pos.y < camera_offset - dims.height {
        return FallCheck::OutOfView;
    }
    let Some(below) = last_placed else {
        return FallCheck::OnStack;
    };
    let dropped_below = below.y - pos.y > dims.height * config.fall_below_ratio;
    let drifted_away = (pos.x - below.x).abs() > dims.width * config.fall_away_ratio;
    if dropped_below || drifted_away {
        FallCheck::OffStack
    } else {
        FallCheck::OnStack
    }
}

fn fail_current(session: &mut GameSession, cause: CollapseCause, at: Vec2) {
    if let Some(current) = session.current.as_mut() {
        current.hit_accuracy = Some(HitAccuracy::Fail);
    }
    session.end(SessionOutcome::Collapsed { cause, at: Some(at) });
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Mouse button, touch or Space → [`DropRequest`].
///
/// Input resources are optional so the system is harmless in headless apps.
pub fn drop_input_system(
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    touches: Option<Res<Touches>>,
    mut requests: MessageWriter<DropRequest>,
) {
    let clicked = mouse.is_some_and(|m| m.just_pressed(MouseButton::Left));
    let pressed = keys.is_some_and(|k| k.just_pressed(KeyCode::Space));
    let tapped = touches.is_some_and(|t| t.any_just_pressed());
    if clicked || pressed || tapped {
        requests.write(DropRequest);
    }
}

/// Grade the drop and switch the oscillating piece to dynamic.
///
/// The very first piece has nothing to be measured against and always
/// counts as perfect.
pub fn apply_drop_system(
    mut requests: MessageReader<DropRequest>,
    mut commands: Commands,
    world: Res<SimulationWorld>,
    config: Res<StackConfig>,
    mut session: ResMut<GameSession>,
    mut pieces: Query<(&Transform, &mut Velocity, &mut StackedObject)>,
) {
    if requests.read().count() == 0 {
        return;
    }
    let Some(current) = session.current.filter(|c| c.phase == DropPhase::Oscillating) else {
        return;
    };

    let previous_x = session
        .last_placed
        .and_then(|e| pieces.get(e).ok())
        .map(|(t, _, _)| t.translation.x);
    let Ok((transform, mut velocity, mut piece)) = pieces.get_mut(current.entity) else {
        return;
    };

    let accuracy = match previous_x {
        Some(x) => classify_drop(
            transform.translation.x - x,
            session.layout.object.width,
            &config,
        ),
        None => HitAccuracy::Perfect,
    };
    *velocity = Velocity::zero();
    piece.hit_accuracy = Some(accuracy);

    if accuracy == HitAccuracy::Perfect && previous_x.is_some() {
        session.perfect_glow = 1.0;
    }
    if let Some(current) = session.current.as_mut() {
        current.phase = DropPhase::Falling;
        current.hit_accuracy = Some(accuracy);
        current.offset_fail = accuracy == HitAccuracy::Fail;
    }
    log_world_error(world.set_body_mode(&mut commands, current.entity, BodyMode::Dynamic));
    debug!("Dropped {:?}: {:?}", current.entity, accuracy);
}

/// First contact of the falling piece with anything.
pub fn landing_contact_system(
    mut collisions: MessageReader<CollisionEvent>,
    mut commands: Commands,
    config: Res<StackConfig>,
    mut session: ResMut<GameSession>,
    pieces: Query<&Transform, With<StackedObject>>,
) {
    let dims = session.layout.object;
    for event in collisions.read() {
        let CollisionEvent::Started(a, b, _) = event else {
            continue;
        };
        let Some(current) = session.current.as_mut() else {
            continue;
        };
        if !current.is_falling() || current.has_landed {
            continue;
        }
        if *a != current.entity && *b != current.entity {
            continue;
        }
        current.has_landed = true;
        if let Ok(transform) = pieces.get(current.entity) {
            let base = transform.translation.truncate() - Vec2::new(0.0, dims.height * 0.5);
            spawn_dust(&mut commands, base, dims.width, &config);
        }
    }
}

/// Fail a falling piece that leaves the view or wanders off the stack.
pub fn fall_watch_system(
    time: Res<Time>,
    config: Res<StackConfig>,
    mut session: ResMut<GameSession>,
    pieces: Query<&Transform, With<StackedObject>>,
) {
    let Some(current) = session.current.filter(|c| c.is_falling()) else {
        return;
    };
    let Ok(transform) = pieces.get(current.entity) else {
        return;
    };
    let pos = transform.translation.truncate();
    let below = session
        .last_placed
        .and_then(|e| pieces.get(e).ok())
        .map(|t| t.translation.truncate());

    match fall_check(pos, below, session.layout.object, session.camera.offset, &config) {
        FallCheck::OnStack => {
            if let Some(c) = session.current.as_mut() {
                c.off_stack_secs = 0.0;
            }
        }
        FallCheck::OutOfView => fail_current(&mut session, CollapseCause::OutOfView, pos),
        FallCheck::OffStack => {
            let dt = config.logic_dt(time.delta_secs());
            let mut expired = false;
            if let Some(c) = session.current.as_mut() {
                c.off_stack_secs += dt;
                expired = c.off_stack_secs > config.fall_grace_secs;
            }
            if expired {
                fail_current(&mut session, CollapseCause::FellOffStack, pos);
            }
        }
    }
}

/// Accept or reject a landed piece once it has stayed stopped for
/// `settle_still_frames` frames in a row.
#[allow(clippy::too_many_arguments)]
pub fn settle_check_system(
    mut commands: Commands,
    world: Res<SimulationWorld>,
    config: Res<StackConfig>,
    mut session: ResMut<GameSession>,
    mut rng: ResMut<StackRng>,
    mut pieces: Query<(&Transform, &Velocity, &mut StackedObject)>,
) {
    let Some(current) = session.current.filter(|c| c.is_falling() && c.has_landed) else {
        return;
    };
    let Ok((transform, velocity, _)) = pieces.get(current.entity) else {
        return;
    };
    let moving = velocity.linvel.length() >= config.settle_speed
        || velocity.angvel.abs() >= config.settle_angvel;
    let Some(c) = session.current.as_mut() else {
        return;
    };
    c.still_frames = if moving { 0 } else { c.still_frames + 1 };
    if c.still_frames < config.settle_still_frames.max(1) {
        return;
    }

    let pos = transform.translation.truncate();
    let dims = session.layout.object;
    let below = session
        .last_placed
        .and_then(|e| pieces.get(e).ok())
        .map(|(t, _, _)| t.translation.truncate());

    if below.is_some_and(|b| !is_stacked_on(pos, b, dims, &config)) {
        fail_current(&mut session, CollapseCause::MissedStack, pos);
        return;
    }
    if current.offset_fail {
        fail_current(&mut session, CollapseCause::OffsetMiss, pos);
        return;
    }

    let accuracy = current.hit_accuracy.unwrap_or(HitAccuracy::Normal);
    let points = accuracy.points(&config);
    if let Ok((_, _, mut piece)) = pieces.get_mut(current.entity) {
        piece.settled = true;
        piece.hit_accuracy = Some(accuracy);
    }

    session.current = None;
    session.last_placed = Some(current.entity);
    session.stacked += 1;
    session.award(points, &config);
    if points > 0 {
        spawn_score_popup(&mut commands, pos + dims.half_extents(), points, &config);
    }
    debug!(
        "Placed {:?} ({:?}, +{}); {} stacked, score {}",
        current.entity, accuracy, points, session.stacked, session.score
    );

    let target = config.variant(session.variant).target_count;
    if target.is_some_and(|t| session.stacked >= t) {
        session.end(SessionOutcome::Completed);
        return;
    }
    spawn_object(&mut commands, &world, &mut session, &config, &mut rng.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> ObjectDims {
        ObjectDims {
            width: 2.0,
            height: 2.0,
        }
    }

    #[test]
    fn drops_are_graded_by_offset_band() {
        let config = StackConfig::default();
        assert_eq!(classify_drop(0.05, 2.0, &config), HitAccuracy::Perfect);
        assert_eq!(classify_drop(-0.3, 2.0, &config), HitAccuracy::Good);
        assert_eq!(classify_drop(0.9, 2.0, &config), HitAccuracy::Normal);
        assert_eq!(classify_drop(1.8, 2.0, &config), HitAccuracy::Fail);
    }

    #[test]
    fn normal_band_has_a_floor() {
        let config = StackConfig::default();
        // Half of a 0.4 m piece is 0.2 m, below the 0.3 m floor.
        assert_eq!(classify_drop(0.25, 0.4, &config), HitAccuracy::Normal);
    }

    #[test]
    fn stacked_needs_height_and_overlap() {
        let config = StackConfig::default();
        let below = Vec2::new(5.0, 1.4);
        assert!(is_stacked_on(Vec2::new(5.5, 3.4), below, dims(), &config));
        assert!(!is_stacked_on(Vec2::new(5.5, 1.9), below, dims(), &config));
        assert!(!is_stacked_on(Vec2::new(6.8, 3.4), below, dims(), &config));
    }

    #[test]
    fn fall_check_flags_view_exit_before_distance() {
        let config = StackConfig::default();
        let below = Some(Vec2::new(5.0, 20.0));
        assert_eq!(
            fall_check(Vec2::new(5.0, 7.0), below, dims(), 10.0, &config),
            FallCheck::OutOfView
        );
        assert_eq!(
            fall_check(Vec2::new(5.0, 16.0), below, dims(), 10.0, &config),
            FallCheck::OffStack
        );
        assert_eq!(
            fall_check(Vec2::new(10.0, 22.0), below, dims(), 10.0, &config),
            FallCheck::OffStack
        );
        assert_eq!(
            fall_check(Vec2::new(5.5, 22.0), below, dims(), 10.0, &config),
            FallCheck::OnStack
        );
    }

    #[test]
    fn first_piece_is_never_off_stack() {
        let config = StackConfig::default();
        assert_eq!(
            fall_check(Vec2::new(0.5, 1.0), None, dims(), 0.0, &config),
            FallCheck::OnStack
        );
    }
}
