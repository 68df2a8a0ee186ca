//! Simulation-world facade over Rapier.
//!
//! Game code never touches `RapierConfiguration` or rigid-body components
//! directly.  It goes through [`SimulationWorld`], which knows whether the
//! world is still live and turns late calls (a despawn racing teardown, a
//! mode switch on a piece that was already pruned) into logged no-ops
//! instead of panics.
//!
//! Rapier itself runs in `FixedUpdate` (see `main.rs`), so every physics
//! step advances by exactly `1 / fixed_hz` regardless of frame rate.

use crate::config::StackConfig;
use crate::error::{StackError, StackResult};
use crate::state::{GroundSlab, SessionLayout};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Moved by its velocity only; ignores gravity and contacts.
    Kinematic,
    /// Fully simulated.
    Dynamic,
    /// Never moves.
    Static,
}

impl BodyMode {
    #[inline]
    pub fn rigid_body(self) -> RigidBody {
        match self {
            BodyMode::Kinematic => RigidBody::KinematicVelocityBased,
            BodyMode::Dynamic => RigidBody::Dynamic,
            BodyMode::Static => RigidBody::Fixed,
        }
    }

    pub fn of(body: &RigidBody) -> Self {
        match body {
            RigidBody::Dynamic => BodyMode::Dynamic,
            RigidBody::Fixed => BodyMode::Static,
            _ => BodyMode::Kinematic,
        }
    }
}

/// The physics world of the current session.
#[derive(Resource, Debug, Clone, Default)]
pub struct SimulationWorld {
    gravity: Vec2,
    ground: Option<Entity>,
    live: bool,
}

impl SimulationWorld {
    /// A live world pulling downward with `gravity` m/s².
    pub fn create(gravity: f32) -> Self {
        Self {
            gravity: Vec2::new(0.0, -gravity),
            ground: None,
            live: true,
        }
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.live
    }

    #[inline]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    #[inline]
    pub fn ground(&self) -> Option<Entity> {
        self.ground
    }

    /// Spawn a body bundle.  Returns `None` once the world is torn down.
    pub fn add_body<B: Bundle>(&self, commands: &mut Commands, bundle: B) -> Option<Entity> {
        if !self.live {
            warn!("add_body called on a torn-down world; ignoring");
            return None;
        }
        Some(commands.spawn(bundle).id())
    }

    /// Despawn a body.
    pub fn remove_body(&self, commands: &mut Commands, entity: Entity) -> StackResult<()> {
        if !self.live {
            return Err(StackError::WorldTornDown {
                operation: "remove_body",
            });
        }
        let mut entity_commands = commands
            .get_entity(entity)
            .map_err(|_| StackError::EntityNotFound {
                context: "remove_body",
            })?;
        entity_commands.despawn();
        Ok(())
    }

    /// Switch a body between kinematic, dynamic and static simulation.
    pub fn set_body_mode(
        &self,
        commands: &mut Commands,
        entity: Entity,
        mode: BodyMode,
    ) -> StackResult<()> {
        if !self.live {
            return Err(StackError::WorldTornDown {
                operation: "set_body_mode",
            });
        }
        let mut entity_commands = commands
            .get_entity(entity)
            .map_err(|_| StackError::EntityNotFound {
                context: "set_body_mode",
            })?;
        entity_commands.insert(mode.rigid_body());
        Ok(())
    }

    /// Spawn the static ground slab spanning the view, top surface at
    /// `layout.ground_top`.
    pub fn spawn_ground(&mut self, commands: &mut Commands, layout: &SessionLayout) -> Option<Entity> {
        let half_thickness = layout.ground_top * 0.5;
        let entity = self.add_body(
            commands,
            (
                GroundSlab,
                Transform::from_xyz(layout.center_x(), half_thickness, 0.0),
                RigidBody::Fixed,
                Collider::cuboid(layout.view_width * 0.5, half_thickness),
                Friction::coefficient(0.8),
                Restitution::coefficient(0.0),
                ActiveEvents::COLLISION_EVENTS,
            ),
        )?;
        self.ground = Some(entity);
        Some(entity)
    }

    /// Despawn every body and mark the world dead.  Safe to call twice.
    pub fn teardown(&mut self, commands: &mut Commands, bodies: impl IntoIterator<Item = Entity>) {
        let mut removed = 0_usize;
        for entity in bodies.into_iter().chain(self.ground.take()) {
            if let Ok(mut e) = commands.get_entity(entity) {
                e.try_despawn();
                removed += 1;
            }
        }
        if self.live {
            debug!("Simulation world torn down ({removed} bodies)");
        }
        self.live = false;
    }
}

/// Log a facade error at the level it deserves.
pub fn log_world_error(result: StackResult<()>) {
    match result {
        Ok(()) => {}
        Err(e @ StackError::WorldTornDown { .. }) => debug!("{e}"),
        Err(e) => debug!("Skipping body update: {e}"),
    }
}

/// Push the world's gravity and run state into Rapier whenever it changes.
///
/// A torn-down world pauses the pipeline so Rapier never steps while
/// entity handles are being flushed.
pub fn apply_world_gravity_system(
    world: Res<SimulationWorld>,
    mut rapier_config: Query<&mut RapierConfiguration>,
) {
    if !world.is_changed() {
        return;
    }
    for mut cfg in rapier_config.iter_mut() {
        cfg.gravity = world.gravity();
        cfg.physics_pipeline_active = world.is_live();
    }
}

/// Startup system: run the fixed schedule (and so Rapier) at `fixed_hz`.
pub fn configure_fixed_step(config: Res<StackConfig>, mut fixed: ResMut<Time<Fixed>>) {
    fixed.set_timestep_hz(config.fixed_hz);
    info!("[SETUP] Physics stepping at {} Hz", config.fixed_hz);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_modes_map_to_rapier_bodies() {
        for mode in [BodyMode::Kinematic, BodyMode::Dynamic, BodyMode::Static] {
            assert_eq!(BodyMode::of(&mode.rigid_body()), mode);
        }
    }

    #[test]
    fn created_world_pulls_down() {
        let world = SimulationWorld::create(14.0);
        assert!(world.is_live());
        assert_eq!(world.gravity(), Vec2::new(0.0, -14.0));
    }

    #[test]
    fn default_world_is_not_live() {
        assert!(!SimulationWorld::default().is_live());
    }

    #[test]
    fn calls_after_teardown_are_harmless() {
        let mut app = App::new();
        app.insert_resource(SimulationWorld::create(10.0));
        let body = app.world_mut().spawn(RigidBody::Dynamic).id();

        app.add_systems(
            Update,
            move |mut commands: Commands, mut world: ResMut<SimulationWorld>| {
                world.teardown(&mut commands, [body]);
                world.teardown(&mut commands, [body]);
                assert!(world.remove_body(&mut commands, body).is_err());
                assert!(world
                    .set_body_mode(&mut commands, body, BodyMode::Static)
                    .is_err());
                assert!(world.add_body(&mut commands, RigidBody::Fixed).is_none());
            },
        );
        app.update();
        assert!(app.world().get_entity(body).is_err());
    }

    #[test]
    fn mode_switch_on_missing_entity_is_an_error() {
        let mut app = App::new();
        app.insert_resource(SimulationWorld::create(10.0));
        let body = app.world_mut().spawn(RigidBody::Dynamic).id();
        app.world_mut().despawn(body);

        app.add_systems(Update, move |mut commands: Commands, world: Res<SimulationWorld>| {
            let result = world.set_body_mode(&mut commands, body, BodyMode::Static);
            assert!(matches!(result, Err(StackError::EntityNotFound { .. })));
        });
        app.update();
    }
}
