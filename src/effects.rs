//! Transient visual effects: landing dust and floating score popups.
//!
//! ## Design
//!
//! Effects are plain ECS entities carrying a [`TransientEffect`] that stores
//! their remaining life (1 → 0), decay rate and rise speed.  Game logic
//! spawns them through free functions that only need `&mut Commands`, so
//! the landing rules stay testable without any render assets.
//!
//! | System                          | Plugin          | Purpose                            |
//! |---------------------------------|-----------------|------------------------------------|
//! | `effect_decay_system`           | StackingPlugin  | Rise, age and despawn effects      |
//! | `attach_effect_visuals_system`  | EffectsPlugin   | Give new effects a mesh or text    |
//! | `fade_effect_visuals_system`    | EffectsPlugin   | Fade alpha with remaining life     |
//!
//! A single unit half-disc [`DustMesh`] is created at startup and scaled per puff.

use crate::config::StackConfig;
use crate::constants::PIXELS_PER_METER;
use crate::state::GameSession;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};

/// Popup font size in screen pixels.
const POPUP_FONT_PX: f32 = 30.0;

// ── Resources ────────────────────────────────────────────────────────────────

/// Shared unit half-disc used by every dust puff.
#[derive(Resource)]
pub struct DustMesh(pub Handle<Mesh>);

// ── Component ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    Dust,
    ScorePopup { points: u32 },
}

/// Short-lived visual entity.
#[derive(Component, Debug, Clone)]
pub struct TransientEffect {
    pub kind: EffectKind,
    /// Remaining life; despawned at zero.
    pub life: f32,
    /// Life lost per second.
    pub decay_per_sec: f32,
    /// Upward drift (m/s).
    pub rise_speed: f32,
    /// Set by `attach_effect_visuals_system` for mesh-backed effects.
    pub material: Option<Handle<ColorMaterial>>,
}

impl TransientEffect {
    fn new(kind: EffectKind, decay_per_sec: f32, rise_speed: f32) -> Self {
        Self {
            kind,
            life: 1.0,
            decay_per_sec,
            rise_speed,
            material: None,
        }
    }

    /// Age by `dt` seconds.  Returns `false` once the effect has expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.life = (self.life - self.decay_per_sec * dt).max(0.0);
        self.life > 0.0
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Render side of the effects; the decay logic runs in the stacking plugin.
pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, init_dust_mesh).add_systems(
            Update,
            (attach_effect_visuals_system, fade_effect_visuals_system).chain(),
        );
    }
}

fn init_dust_mesh(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    let handle = meshes.add(puff_mesh(10));
    commands.insert_resource(DustMesh(handle));
}

// ── Spawn helpers ─────────────────────────────────────────────────────────────

/// Puff of dust under a piece that has just touched down.
///
/// `base` is the bottom-centre of the piece; `width` scales the puff.
pub fn spawn_dust(commands: &mut Commands, base: Vec2, width: f32, config: &StackConfig) {
    commands.spawn((
        TransientEffect::new(
            EffectKind::Dust,
            config.dust_decay_per_sec,
            config.dust_rise_speed,
        ),
        Transform::from_translation(base.extend(0.5)).with_scale(Vec3::new(
            width * 0.6,
            width * 0.2,
            1.0,
        )),
        Visibility::default(),
    ));
}

/// "+N" rising from `pos`.
pub fn spawn_score_popup(commands: &mut Commands, pos: Vec2, points: u32, config: &StackConfig) {
    commands.spawn((
        TransientEffect::new(
            EffectKind::ScorePopup { points },
            config.popup_decay_per_sec,
            config.popup_rise_speed,
        ),
        Transform::from_translation(pos.extend(0.8))
            .with_scale(Vec3::splat(1.0 / PIXELS_PER_METER)),
        Visibility::default(),
    ));
}

// ── Update systems ────────────────────────────────────────────────────────────

/// Move effects upward, age them, and despawn the expired ones.
pub fn effect_decay_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<StackConfig>,
    mut effects: Query<(Entity, &mut Transform, &mut TransientEffect)>,
) {
    let dt = config.logic_dt(time.delta_secs());
    for (entity, mut transform, mut effect) in effects.iter_mut() {
        if !effect.tick(dt) {
            commands.entity(entity).despawn();
            continue;
        }
        transform.translation.y += effect.rise_speed * dt;
    }
}

/// Fade the placement-guide highlight after a perfect drop.
pub fn perfect_glow_decay_system(
    time: Res<Time>,
    config: Res<StackConfig>,
    mut session: ResMut<GameSession>,
) {
    if session.perfect_glow <= 0.0 {
        return;
    }
    let dt = config.logic_dt(time.delta_secs());
    session.perfect_glow = (session.perfect_glow - config.perfect_glow_decay * dt).max(0.0);
}

/// Attach a dust puff or popup text to every newly spawned effect.
pub fn attach_effect_visuals_system(
    mut commands: Commands,
    dust_mesh: Res<DustMesh>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut effects: Query<(Entity, &mut TransientEffect), Added<TransientEffect>>,
) {
    for (entity, mut effect) in effects.iter_mut() {
        match effect.kind {
            EffectKind::Dust => {
                let material = materials.add(ColorMaterial::from_color(dust_color(1.0)));
                effect.material = Some(material.clone());
                commands
                    .entity(entity)
                    .insert((Mesh2d(dust_mesh.0.clone()), MeshMaterial2d(material)));
            }
            EffectKind::ScorePopup { points } => {
                commands.entity(entity).insert((
                    Text2d::new(format!("+{points}")),
                    TextFont {
                        font_size: POPUP_FONT_PX,
                        ..default()
                    },
                    TextColor(popup_color(1.0)),
                ));
            }
        }
    }
}

/// Track each effect's alpha to its remaining life.
pub fn fade_effect_visuals_system(
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut effects: Query<(&TransientEffect, Option<&mut TextColor>)>,
) {
    for (effect, text_color) in effects.iter_mut() {
        let alpha = effect.life;
        match effect.kind {
            EffectKind::Dust => {
                if let Some(mat) = effect.material.as_ref().and_then(|h| materials.get_mut(h)) {
                    mat.color = dust_color(alpha * 0.6);
                }
            }
            EffectKind::ScorePopup { .. } => {
                if let Some(mut color) = text_color {
                    color.0 = popup_color(alpha);
                }
            }
        }
    }
}

#[inline]
fn dust_color(alpha: f32) -> Color {
    Color::srgba(0.72, 0.64, 0.52, alpha)
}

#[inline]
fn popup_color(alpha: f32) -> Color {
    Color::srgba(1.0, 0.72, 0.0, alpha)
}

// ── Mesh helper ───────────────────────────────────────────────────────────────

/// Unit half-disc above the x axis, so a puff scaled at a piece's base
/// billows upward from the contact line.
///
/// `segments` rim edges, fanned from the origin.
pub(crate) fn puff_mesh(segments: u32) -> Mesh {
    let segments = segments.max(1);
    let rim = (0..=segments).map(|i| {
        let angle = std::f32::consts::PI * i as f32 / segments as f32;
        Vec2::new(angle.cos(), angle.sin())
    });
    let points: Vec<Vec2> = std::iter::once(Vec2::ZERO).chain(rim).collect();

    let positions: Vec<[f32; 3]> = points.iter().map(|p| [p.x, p.y, 0.0]).collect();
    let uvs: Vec<[f32; 2]> = points.iter().map(|p| [0.5 + p.x * 0.5, 1.0 - p.y]).collect();
    let normals = vec![[0.0, 0.0, 1.0]; points.len()];
    let indices: Vec<u32> = (1..=segments).flat_map(|i| [0, i, i + 1]).collect();

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
    .with_inserted_indices(Indices::U32(indices))
}
