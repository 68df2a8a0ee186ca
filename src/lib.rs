//! Tower Stack: box and doughnut stacking mini-games.
//!
//! Pieces sweep sideways above a growing tower; the player drops each one
//! and Rapier decides whether it stays.  Everything gameplay-related runs
//! in plain Bevy systems so the library can be driven headless in tests.

pub mod camera;
pub mod config;
pub mod constants;
pub mod effects;
pub mod error;
pub mod graphics;
pub mod landing;
pub mod menu;
pub mod rendering;
pub mod report;
pub mod session;
pub mod spawner;
pub mod stability;
pub mod stacking;
pub mod state;
pub mod world;
