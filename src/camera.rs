//! Vertical camera follow.
//!
//! The camera only ever moves up.  Each frame it eases a fraction of the way
//! towards a target that keeps the last placed piece at
//! `camera_target_fraction` of the screen height (measured from the top),
//! with the per-frame step clamped so a tall jump never snaps the view.

use crate::config::StackConfig;
use crate::state::{GameSession, StackedObject};
use bevy::prelude::*;

/// Camera bookkeeping for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// World y of the bottom edge of the view.
    pub offset: f32,
    /// Highest target requested so far; the camera never aims below it.
    pub target: f32,
}

impl CameraState {
    pub fn new(start: f32) -> Self {
        Self {
            offset: start,
            target: start,
        }
    }
}

/// Advance the camera one frame towards the piece whose centre is at `top_y`.
///
/// Returns the distance moved, which is never negative.
pub fn step_camera(state: &mut CameraState, top_y: f32, view_height: f32, config: &StackConfig) -> f32 {
    let wanted = top_y - (1.0 - config.camera_target_fraction) * view_height;
    state.target = state.target.max(wanted).max(0.0);

    let lerp = config.camera_lerp.clamp(0.0, 1.0);
    let step = ((state.target - state.offset) * lerp).clamp(0.0, config.camera_max_step);
    state.offset += step;
    step
}

/// World-space centre of the view for a camera at `state`.
#[inline]
pub fn view_center(state: &CameraState, view_width: f32, view_height: f32) -> Vec2 {
    Vec2::new(view_width * 0.5, state.offset + view_height * 0.5)
}

/// Follow the last placed piece and move the 2D camera to match.
pub fn camera_follow_system(
    mut session: ResMut<GameSession>,
    config: Res<StackConfig>,
    pieces: Query<&Transform, With<StackedObject>>,
    mut cameras: Query<&mut Transform, (With<Camera2d>, Without<StackedObject>)>,
) {
    if let Some(top) = session.last_placed.and_then(|e| pieces.get(e).ok()) {
        let top_y = top.translation.y;
        let view_height = session.layout.view_height;
        step_camera(&mut session.camera, top_y, view_height, &config);
    }

    let center = view_center(
        &session.camera,
        session.layout.view_width,
        session.layout.view_height,
    );
    for mut transform in cameras.iter_mut() {
        transform.translation.x = center.x;
        transform.translation.y = center.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_stack_keeps_camera_at_ground() {
        let config = StackConfig::default();
        let mut state = CameraState::new(0.0);
        assert_eq!(step_camera(&mut state, 3.0, 20.0, &config), 0.0);
        assert_eq!(state.offset, 0.0);
    }

    #[test]
    fn step_is_clamped() {
        let config = StackConfig::default();
        let mut state = CameraState::new(0.0);
        let moved = step_camera(&mut state, 100.0, 20.0, &config);
        assert!((moved - config.camera_max_step).abs() < 1e-6);
    }

    #[test]
    fn camera_never_moves_down() {
        let config = StackConfig::default();
        let mut state = CameraState::new(0.0);
        let mut last = state.offset;
        for top in [30.0, 40.0, 10.0, 5.0, 50.0, 0.0] {
            for _ in 0..20 {
                step_camera(&mut state, top, 20.0, &config);
                assert!(state.offset >= last);
                last = state.offset;
            }
        }
    }

    #[test]
    fn camera_converges_below_target() {
        let config = StackConfig::default();
        let mut state = CameraState::new(0.0);
        for _ in 0..2_000 {
            step_camera(&mut state, 30.0, 20.0, &config);
        }
        assert!((state.offset - 26.0).abs() < 0.01);
        assert!(state.offset <= state.target);
    }
}
