//! Stacking plugin: registers resources, messages, lifecycle hooks and the
//! per-frame game-logic chain.
//!
//! ## Frame order (`Update`)
//!
//! | Set            | Systems                                                        |
//! |----------------|----------------------------------------------------------------|
//! | `Logic`        | clock → input → drop → oscillation → contact → fall watch →    |
//! |                | settle check → frozen integrity → stability → freeze → prune → |
//! |                | camera → glow → effects                                        |
//! | `Transition`   | `game_over_system`                                             |
//!
//! Rapier steps in `FixedUpdate`, before all of this.  Every `Logic` system
//! is gated on [`session_active`], so the chain stops on the frame the
//! outcome is set.  Nothing here needs a window, renderer or Rapier, which
//! is what lets the integration tests drive it headless.

use crate::camera::camera_follow_system;
use crate::config::StackConfig;
use crate::effects::{effect_decay_system, perfect_glow_decay_system};
use crate::landing::{
    apply_drop_system, drop_input_system, fall_watch_system, landing_contact_system,
    settle_check_system, DropRequest,
};
use crate::menu::{GameState, SelectedVariant};
use crate::report::{poll_completion_status, request_completion_status, CompletionClient, CompletionStatus};
use crate::session::{
    game_over_system, pause_physics, session_active, session_clock_system, start_session,
    teardown_session,
};
use crate::spawner::{oscillation_system, StackRng};
use crate::stability::{freeze_system, frozen_integrity_system, prune_system, stability_system};
use crate::state::GameSession;
use crate::world::{apply_world_gravity_system, SimulationWorld};
use bevy::prelude::*;
use bevy_rapier2d::prelude::CollisionEvent;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackSet {
    Logic,
    Transition,
}

pub struct StackingPlugin;

impl Plugin for StackingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StackConfig>()
            .init_resource::<SimulationWorld>()
            .init_resource::<StackRng>()
            .init_resource::<CompletionClient>()
            .init_resource::<CompletionStatus>()
            .init_resource::<SelectedVariant>()
            .add_message::<DropRequest>()
            .add_message::<CollisionEvent>()
            .configure_sets(Update, (StackSet::Logic, StackSet::Transition).chain())
            .add_systems(
                OnEnter(GameState::MainMenu),
                (teardown_session, request_completion_status),
            )
            .add_systems(
                OnEnter(GameState::Playing),
                (teardown_session, start_session).chain(),
            )
            .add_systems(OnEnter(GameState::GameOver), pause_physics)
            .add_systems(Update, (apply_world_gravity_system, poll_completion_status))
            .add_systems(
                Update,
                (
                    session_clock_system,
                    drop_input_system,
                    apply_drop_system,
                    oscillation_system,
                    landing_contact_system,
                    fall_watch_system,
                    settle_check_system,
                    frozen_integrity_system,
                    stability_system,
                    freeze_system,
                    prune_system,
                    camera_follow_system,
                    perfect_glow_decay_system,
                    effect_decay_system,
                )
                    .chain()
                    .in_set(StackSet::Logic)
                    .run_if(in_state(GameState::Playing))
                    .distributive_run_if(session_active),
            )
            .add_systems(
                Update,
                game_over_system
                    .in_set(StackSet::Transition)
                    .run_if(in_state(GameState::Playing))
                    .run_if(resource_exists::<GameSession>),
            );
    }
}
