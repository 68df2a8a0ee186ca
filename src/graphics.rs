use crate::config::StackConfig;
use bevy::prelude::*;

/// Orthographic projection showing `pixels_per_meter` screen pixels per
/// world metre.
pub fn world_projection(config: &StackConfig) -> Projection {
    Projection::Orthographic(OrthographicProjection {
        scale: 1.0 / config.pixels_per_meter,
        ..OrthographicProjection::default_2d()
    })
}

/// Setup camera for 2D rendering in metres.
pub fn setup_camera(mut commands: Commands, config: Res<StackConfig>) {
    commands.spawn((Camera2d, world_projection(&config)));
    info!("[SETUP] Camera spawned at {} px/m", config.pixels_per_meter);
}
