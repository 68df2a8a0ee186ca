use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier2d::prelude::*;
use std::env;

use tower_stack::config::{self, StackConfig};
use tower_stack::constants::{DEFAULT_WINDOW_HEIGHT_PX, DEFAULT_WINDOW_WIDTH_PX};
use tower_stack::effects::EffectsPlugin;
use tower_stack::graphics;
use tower_stack::menu::{AutoStart, MenuPlugin, SelectedVariant};
use tower_stack::rendering::StackRenderPlugin;
use tower_stack::report;
use tower_stack::stacking::StackingPlugin;
use tower_stack::state::GameVariant;
use tower_stack::world;

fn main() {
    // STACK_VARIANT=boxes|doughnuts skips the start screen.
    let launch_variant = env::var("STACK_VARIANT").ok();

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Tower Stack".into(),
            resolution: WindowResolution::new(
                DEFAULT_WINDOW_WIDTH_PX as u32,
                DEFAULT_WINDOW_HEIGHT_PX as u32,
            ),
            ..Default::default()
        }),
        ..Default::default()
    }))
    // Insert StackConfig with compiled defaults; load_stack_config will
    // overwrite it from assets/stacking.toml (if present) in Startup.
    .insert_resource(StackConfig::default())
    // World units are metres; the camera projection does the px/m scaling,
    // so Rapier itself works at 1:1.
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0).in_fixed_schedule())
    .add_plugins((MenuPlugin, StackingPlugin, StackRenderPlugin, EffectsPlugin))
    .add_systems(
        Startup,
        (
            // Load config first so every other startup system sees the final values.
            config::load_stack_config,
            world::configure_fixed_step.after(config::load_stack_config),
            graphics::setup_camera.after(config::load_stack_config),
            report::setup_completion_client.after(config::load_stack_config),
            // The first OnEnter(MainMenu) ran before the client existed.
            report::request_completion_status.after(report::setup_completion_client),
        ),
    );

    if let Some(name) = launch_variant {
        match GameVariant::from_name(&name) {
            Some(variant) => {
                app.insert_resource(SelectedVariant(variant))
                    .insert_resource(AutoStart);
            }
            None => warn!("Unknown STACK_VARIANT {name:?}; showing the start screen"),
        }
    }

    app.run();
}
