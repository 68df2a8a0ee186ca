//! Piece spawning and the oscillation sweep.
//!
//! A new piece appears near the top of the view as a kinematic body moving
//! sideways at the session's current horizontal speed, in a random
//! direction.  [`oscillation_system`] turns it around whenever it passes
//! the edge of the oscillation band.

use crate::config::{StackConfig, VariantTuning};
use crate::constants::VISUAL_VARIANTS;
use crate::state::{CurrentObject, GameSession, GameVariant, ObjectDims, StackedObject};
use crate::world::SimulationWorld;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random source for spawn direction and piece appearance.
///
/// Kept as a resource so tests can seed it.
#[derive(Resource)]
pub struct StackRng(pub StdRng);

impl Default for StackRng {
    fn default() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl StackRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

/// Collider matching a piece's outline: a box, or a side-on doughnut
/// (a capsule lying on its side).
pub fn piece_collider(variant: GameVariant, dims: ObjectDims) -> Collider {
    let half = dims.half_extents();
    match variant {
        GameVariant::Boxes => Collider::cuboid(half.x, half.y),
        GameVariant::Doughnuts => {
            let radius = half.y;
            Collider::capsule_x((half.x - radius).max(0.0), radius)
        }
    }
}

/// World y at which a new piece appears, given the current camera.
#[inline]
pub fn spawn_height(session: &GameSession) -> f32 {
    session.camera.offset + session.layout.view_height - session.layout.spawn_margin
}

/// Spawn the next oscillating piece and make it the current object.
///
/// Refused while the current piece is still falling or after game-over.
pub fn spawn_object(
    commands: &mut Commands,
    world: &SimulationWorld,
    session: &mut GameSession,
    config: &StackConfig,
    rng: &mut StdRng,
) -> Option<Entity> {
    if session.is_over() {
        return None;
    }
    if session.current.is_some_and(|c| c.is_falling()) {
        warn!("Spawn requested while a piece is still falling; ignoring");
        return None;
    }

    let x = session.layout.center_x();
    let y = spawn_height(session);
    let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let visual = rng.gen_range(0..VISUAL_VARIANTS);
    let tuning = config.variant(session.variant);

    let entity = world.add_body(
        commands,
        piece_bundle(
            session.variant,
            session.layout.object,
            tuning,
            visual,
            Vec2::new(x, y),
            Vec2::new(direction * session.horizontal_speed, 0.0),
        ),
    )?;

    session.spawn_y = y;
    session.current = Some(CurrentObject::oscillating(entity));
    debug!(
        "Spawned piece {:?} at ({:.2}, {:.2}) moving {:.2} m/s",
        entity,
        x,
        y,
        direction * session.horizontal_speed
    );
    Some(entity)
}

fn piece_bundle(
    variant: GameVariant,
    dims: ObjectDims,
    tuning: &VariantTuning,
    visual: usize,
    position: Vec2,
    linvel: Vec2,
) -> impl Bundle {
    (
        StackedObject::new(visual),
        Transform::from_translation(position.extend(0.1)),
        Visibility::default(),
        RigidBody::KinematicVelocityBased,
        piece_collider(variant, dims),
        Velocity {
            linvel,
            angvel: 0.0,
        },
        Friction::coefficient(tuning.friction),
        Restitution::coefficient(tuning.restitution),
        ColliderMassProperties::Density(tuning.density),
        ActiveEvents::COLLISION_EVENTS,
        Ccd::enabled(),
        Sleeping::disabled(),
    )
}

/// Velocity after applying the band edges: a piece past an edge and still
/// moving outwards is sent back inwards at the same speed.
#[inline]
pub fn bounce_velocity(x: f32, linvel: Vec2, min_x: f32, max_x: f32) -> Vec2 {
    if x <= min_x && linvel.x < 0.0 {
        Vec2::new(linvel.x.abs(), 0.0)
    } else if x >= max_x && linvel.x > 0.0 {
        Vec2::new(-linvel.x.abs(), 0.0)
    } else {
        linvel
    }
}

/// Keep the oscillating piece inside its band.
pub fn oscillation_system(
    session: Res<GameSession>,
    mut pieces: Query<(&Transform, &mut Velocity), With<StackedObject>>,
) {
    let Some(current) = session.current.filter(|c| !c.is_falling()) else {
        return;
    };
    let Ok((transform, mut velocity)) = pieces.get_mut(current.entity) else {
        return;
    };
    let bounced = bounce_velocity(
        transform.translation.x,
        velocity.linvel,
        session.layout.bounce_min_x,
        session.layout.bounce_max_x,
    );
    if bounced != velocity.linvel {
        velocity.linvel = bounced;
    }
}
