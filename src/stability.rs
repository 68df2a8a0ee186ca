//! Tower stability: settle timers, collapse detection, freezing and pruning.
//!
//! Every frame, in this order:
//!
//! 1. `frozen_integrity_system` snaps any frozen piece that drifted back to
//!    its recorded pose.
//! 2. `stability_system` accumulates stable time for dynamic pieces and ends
//!    the session on the first settled piece that tilts too far, runs away,
//!    reports a non-finite position, or strays from the tower.
//! 3. `freeze_system` converts deep, quiet pieces into fixed bodies so tall
//!    towers stay cheap and cannot slowly buckle.
//! 4. `prune_system` removes frozen pieces far below the view.
//!
//! The piece under player control is skipped by all of them.

use crate::config::StackConfig;
use crate::state::{
    body_angle, CollapseCause, FrozenPose, GameSession, SessionLayout, SessionOutcome,
    StackedObject,
};
use crate::world::{log_world_error, BodyMode, SimulationWorld};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

// ── Pure rules ────────────────────────────────────────────────────────────────

/// Update a piece's stable-time counter for one frame.
///
/// Quiet frames add time, violent frames zero it, and frames in between
/// leave it unchanged.  A piece becomes settled once the counter reaches
/// `settle_secs` and never becomes unsettled again.
pub fn accumulate_stability(
    piece: &mut StackedObject,
    speed: f32,
    angvel: f32,
    dt: f32,
    config: &StackConfig,
) {
    let angvel = angvel.abs();
    if speed < config.stable_speed && angvel < config.stable_angvel {
        piece.stable_time += dt;
    } else if speed > config.reset_speed || angvel > config.reset_angvel {
        piece.stable_time = 0.0;
    }
    if piece.stable_time >= config.settle_secs {
        piece.settled = true;
    }
}

/// Why a settled piece means the tower has collapsed, if it does.
pub fn collapse_check(
    pos: Vec3,
    angle: f32,
    velocity: &Velocity,
    last_placed: Option<Vec2>,
    layout: &SessionLayout,
    camera_offset: f32,
    config: &StackConfig,
) -> Option<CollapseCause> {
    if !pos.is_finite() || !angle.is_finite() {
        return Some(CollapseCause::InvalidPose);
    }
    if angle.abs() > config.tilt_limit_deg.to_radians() {
        return Some(CollapseCause::Tilted);
    }
    if velocity.linvel.length() > config.runaway_speed
        || velocity.angvel.abs() > config.runaway_angvel
    {
        return Some(CollapseCause::Runaway);
    }
    let dims = layout.object;
    if pos.y < camera_offset - dims.height {
        return Some(CollapseCause::OutOfView);
    }
    if let Some(top) = last_placed {
        let below = top.y - pos.y > dims.height * config.stray_below_ratio;
        let away = (pos.x - top.x).abs() > dims.width * config.stray_away_ratio;
        if below || away {
            return Some(CollapseCause::FellOffStack);
        }
    }
    None
}

/// Angle at which a freeze candidate tilted by `angle` is frozen:
/// flat when nearly level, as-is when moderately tilted, not at all beyond.
#[inline]
pub fn freeze_angle(angle: f32, config: &StackConfig) -> Option<f32> {
    let tilt = angle.abs();
    if tilt <= config.freeze_snap_deg.to_radians() {
        Some(0.0)
    } else if tilt <= config.freeze_max_deg.to_radians() {
        Some(angle)
    } else {
        None
    }
}

/// Whether a frozen piece's current pose has drifted from its snapshot.
#[inline]
pub fn has_drifted(transform: &Transform, pose: &FrozenPose, tolerance: f32) -> bool {
    let pos = transform.translation.truncate();
    (pos - pose.position).abs().max_element() > tolerance
        || (body_angle(transform) - pose.angle).abs() > tolerance
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Hold every frozen piece exactly at its snapshot pose.
pub fn frozen_integrity_system(
    config: Res<StackConfig>,
    mut pieces: Query<(&mut Transform, &mut Velocity, &StackedObject)>,
) {
    for (mut transform, mut velocity, piece) in pieces.iter_mut() {
        let Some(pose) = piece.frozen else {
            continue;
        };
        if !has_drifted(&transform, &pose, config.freeze_tolerance) {
            continue;
        }
        transform.translation.x = pose.position.x;
        transform.translation.y = pose.position.y;
        transform.rotation = Quat::from_rotation_z(pose.angle);
        *velocity = Velocity::zero();
    }
}

/// Advance stable timers and end the session on the first collapse found.
pub fn stability_system(
    time: Res<Time>,
    config: Res<StackConfig>,
    mut session: ResMut<GameSession>,
    mut pieces: Query<(Entity, &Transform, &Velocity, &mut StackedObject)>,
) {
    let dt = config.logic_dt(time.delta_secs());
    let current = session.current_entity();
    let top = session
        .last_placed
        .and_then(|e| pieces.get(e).ok())
        .map(|(_, t, _, _)| t.translation.truncate());

    for (entity, transform, velocity, mut piece) in pieces.iter_mut() {
        if piece.is_frozen() || current == Some(entity) {
            continue;
        }
        accumulate_stability(
            &mut piece,
            velocity.linvel.length(),
            velocity.angvel,
            dt,
            &config,
        );
        if !piece.settled {
            continue;
        }
        let cause = collapse_check(
            transform.translation,
            body_angle(transform),
            velocity,
            top,
            &session.layout,
            session.camera.offset,
            &config,
        );
        if let Some(cause) = cause {
            // A tilt is blamed on the tower, not the piece.
            let at = (cause != CollapseCause::Tilted).then(|| transform.translation.truncate());
            session.end(SessionOutcome::Collapsed { cause, at });
            return;
        }
    }
}

/// Freeze quiet settled pieces below the top of the tower.
pub fn freeze_system(
    mut commands: Commands,
    world: Res<SimulationWorld>,
    config: Res<StackConfig>,
    session: Res<GameSession>,
    mut pieces: Query<(Entity, &mut Transform, &mut Velocity, &mut StackedObject)>,
) {
    let current = session.current_entity();
    let mut settled: Vec<(Entity, f32)> = pieces
        .iter()
        .filter(|(e, _, _, p)| p.settled && current != Some(*e))
        .map(|(e, t, _, _)| (e, t.translation.y))
        .collect();
    if settled.len() <= config.freeze_min_depth {
        return;
    }
    settled.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (entity, _) in settled.into_iter().skip(config.freeze_keep_top) {
        let Ok((_, mut transform, mut velocity, mut piece)) = pieces.get_mut(entity) else {
            continue;
        };
        if piece.is_frozen() || piece.stable_time <= config.freeze_min_stable_secs {
            continue;
        }
        let Some(angle) = freeze_angle(body_angle(&transform), &config) else {
            continue;
        };
        let position = transform.translation.truncate();
        transform.rotation = Quat::from_rotation_z(angle);
        *velocity = Velocity::zero();
        piece.frozen = Some(FrozenPose { position, angle });
        log_world_error(world.set_body_mode(&mut commands, entity, BodyMode::Static));
        debug!("Froze {:?} at ({:.2}, {:.2})", entity, position.x, position.y);
    }
}

/// Despawn frozen pieces more than `prune_screens` view heights below the
/// bottom of the view.
pub fn prune_system(
    mut commands: Commands,
    world: Res<SimulationWorld>,
    config: Res<StackConfig>,
    session: Res<GameSession>,
    pieces: Query<(Entity, &Transform, &StackedObject)>,
) {
    let limit = session.camera.offset - config.prune_screens * session.layout.view_height;
    for (entity, transform, piece) in pieces.iter() {
        if piece.is_frozen() && transform.translation.y < limit {
            log_world_error(world.remove_body(&mut commands, entity));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameVariant;

    fn layout() -> SessionLayout {
        SessionLayout::derive(Vec2::new(480.0, 800.0), &StackConfig::default(), GameVariant::Boxes)
    }

    #[test]
    fn jitter_between_thresholds_keeps_stable_time() {
        let config = StackConfig::default();
        let mut piece = StackedObject::new(0);
        accumulate_stability(&mut piece, 0.0, 0.0, 0.3, &config);
        accumulate_stability(&mut piece, 0.2, 0.0, 0.3, &config);
        assert!((piece.stable_time - 0.3).abs() < 1e-6);
        assert!(!piece.settled);
        accumulate_stability(&mut piece, 0.0, 0.0, 0.3, &config);
        assert!(piece.settled);
    }

    #[test]
    fn violent_frame_resets_stable_time() {
        let config = StackConfig::default();
        let mut piece = StackedObject::new(0);
        accumulate_stability(&mut piece, 0.0, 0.0, 0.4, &config);
        accumulate_stability(&mut piece, 0.0, 0.5, 0.016, &config);
        assert_eq!(piece.stable_time, 0.0);
    }

    #[test]
    fn settled_never_reverts() {
        let config = StackConfig::default();
        let mut piece = StackedObject::new(0);
        accumulate_stability(&mut piece, 0.0, 0.0, 1.0, &config);
        accumulate_stability(&mut piece, 5.0, 5.0, 0.016, &config);
        assert!(piece.settled);
    }

    #[test]
    fn collapse_reasons() {
        let config = StackConfig::default();
        let l = layout();
        let still = Velocity::zero();
        let top = Some(Vec2::new(6.0, 5.0));
        let at = Vec3::new(6.0, 3.0, 0.0);

        assert_eq!(collapse_check(at, 0.05, &still, top, &l, 0.0, &config), None);
        assert_eq!(
            collapse_check(at, 11f32.to_radians(), &still, top, &l, 0.0, &config),
            Some(CollapseCause::Tilted)
        );
        assert_eq!(
            collapse_check(Vec3::new(f32::NAN, 3.0, 0.0), 0.0, &still, top, &l, 0.0, &config),
            Some(CollapseCause::InvalidPose)
        );
        let fast = Velocity::linear(Vec2::new(30.0, 0.0));
        assert_eq!(
            collapse_check(at, 0.0, &fast, top, &l, 0.0, &config),
            Some(CollapseCause::Runaway)
        );
        assert_eq!(
            collapse_check(Vec3::new(16.0, 5.0, 0.0), 0.0, &still, top, &l, 0.0, &config),
            Some(CollapseCause::FellOffStack)
        );
    }

    #[test]
    fn freeze_angle_bands() {
        let config = StackConfig::default();
        assert_eq!(freeze_angle(3f32.to_radians(), &config), Some(0.0));
        let moderate = -8f32.to_radians();
        assert_eq!(freeze_angle(moderate, &config), Some(moderate));
        assert_eq!(freeze_angle(15f32.to_radians(), &config), None);
    }

    #[test]
    fn prune_drops_only_frozen_pieces_far_below_the_view() {
        use crate::camera::CameraState;
        use bevy::ecs::system::RunSystemOnce;

        let config = StackConfig::default();
        let mut session = GameSession::new(GameVariant::Boxes, layout(), &config);
        // 20 m view, two screens of margin: anything frozen below y = 20 goes.
        session.camera = CameraState::new(60.0);

        let frozen = |y: f32| StackedObject {
            frozen: Some(FrozenPose {
                position: Vec2::new(6.0, y),
                angle: 0.0,
            }),
            ..StackedObject::new(0)
        };
        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(SimulationWorld::create(9.8));
        world.insert_resource(session);
        let buried = world.spawn((Transform::from_xyz(6.0, 1.0, 0.0), frozen(1.0))).id();
        let near = world.spawn((Transform::from_xyz(6.0, 30.0, 0.0), frozen(30.0))).id();
        let loose = world
            .spawn((Transform::from_xyz(6.0, 1.0, 0.0), StackedObject::new(1)))
            .id();

        world.run_system_once(prune_system).unwrap();

        assert!(world.get_entity(buried).is_err(), "deep frozen piece must be pruned");
        assert!(world.get_entity(near).is_ok());
        assert!(world.get_entity(loose).is_ok(), "unfrozen pieces are never pruned");
    }

    #[test]
    fn drift_detection_uses_tolerance() {
        let pose = FrozenPose {
            position: Vec2::new(1.0, 2.0),
            angle: 0.0,
        };
        let exact = Transform::from_xyz(1.0, 2.0, 0.0);
        assert!(!has_drifted(&exact, &pose, 0.001));
        let moved = Transform::from_xyz(1.01, 2.0, 0.0);
        assert!(has_drifted(&moved, &pose, 0.001));
    }
}
