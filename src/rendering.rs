//! Rendering: piece and ground meshes, the placement guide, and the score HUD.
//!
//! ## Layer Model
//!
//! | Layer            | Technology | z     | Spawned by                       |
//! |------------------|------------|-------|----------------------------------|
//! | Ground slab      | `Mesh2d`   | 0.0   | `attach_ground_visual_system`    |
//! | Pieces           | `Mesh2d`   | 0.1   | `attach_piece_visuals_system`    |
//! | Piece detail     | `Mesh2d`   | +0.01 | child of the piece               |
//! | Dust / popups    | see `effects` | 0.5+ | `effects::EffectsPlugin`      |
//! | Placement guide  | Gizmos     | —     | `guide_gizmo_system`             |
//! | Score HUD        | Bevy UI    | —     | `setup_hud_score`                |
//!
//! Physics entities are spawned by game logic without any render
//! components; the attach systems add meshes one frame later via
//! `Added<…>` filters, so the logic stays free of asset access.

use crate::menu::GameState;
use crate::state::{GameSession, GameVariant, GroundSlab, StackedObject};
use bevy::prelude::*;

/// Background clear colour (warm paper).
pub const BACKGROUND: Color = Color::srgb(0.961, 0.945, 0.910);

/// Ground slab colour (saddle brown).
pub const GROUND: Color = Color::srgb(0.545, 0.271, 0.075);

const HUD_FONT_PX: f32 = 40.0;

// ── Components ───────────────────────────────────────────────────────────────

/// Root node of the score HUD; despawned when leaving `GameOver`.
#[derive(Component)]
pub struct HudScoreDisplay;

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct StackRenderPlugin;

impl Plugin for StackRenderPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(BACKGROUND))
            .add_systems(OnEnter(GameState::Playing), setup_hud_score)
            .add_systems(OnExit(GameState::GameOver), cleanup_hud_score)
            .add_systems(
                Update,
                (
                    attach_ground_visual_system,
                    attach_piece_visuals_system,
                    guide_gizmo_system,
                    hud_score_display_system,
                )
                    .run_if(resource_exists::<GameSession>),
            );
    }
}

// ── Palettes ─────────────────────────────────────────────────────────────────

/// Body and detail colour of a piece with the given visual index.
pub fn piece_palette(variant: GameVariant, visual: usize) -> (Color, Color) {
    const BOXES: [((f32, f32, f32), (f32, f32, f32)); 4] = [
        ((0.80, 0.62, 0.40), (0.66, 0.48, 0.30)),
        ((0.74, 0.55, 0.34), (0.90, 0.84, 0.68)),
        ((0.86, 0.70, 0.47), (0.60, 0.40, 0.24)),
        ((0.69, 0.50, 0.31), (0.84, 0.30, 0.22)),
    ];
    const DOUGHNUTS: [((f32, f32, f32), (f32, f32, f32)); 4] = [
        ((0.85, 0.62, 0.35), (0.96, 0.55, 0.70)),
        ((0.85, 0.62, 0.35), (0.40, 0.24, 0.14)),
        ((0.85, 0.62, 0.35), (0.60, 0.88, 0.74)),
        ((0.85, 0.62, 0.35), (0.98, 0.94, 0.82)),
    ];
    let table = match variant {
        GameVariant::Boxes => &BOXES,
        GameVariant::Doughnuts => &DOUGHNUTS,
    };
    let ((br, bg, bb), (dr, dg, db)) = table[visual % table.len()];
    (Color::srgb(br, bg, bb), Color::srgb(dr, dg, db))
}

/// Placement-guide colour: gold while a perfect drop glows, grey otherwise.
pub fn guide_color(perfect_glow: f32, score: u32) -> Color {
    if perfect_glow > 0.0 && score > 0 {
        Color::srgba(1.0, 0.80, 0.10, 0.35 + 0.65 * perfect_glow.min(1.0))
    } else {
        Color::srgba(0.45, 0.45, 0.45, 0.35)
    }
}

// ── Attach systems ───────────────────────────────────────────────────────────

/// Give newly spawned pieces a body mesh and a detail strip.
///
/// Boxes get a tape stripe down the middle; doughnuts are a side-on capsule
/// with an icing band across the top.
pub fn attach_piece_visuals_system(
    mut commands: Commands,
    session: Res<GameSession>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    pieces: Query<(Entity, &StackedObject), Added<StackedObject>>,
) {
    let dims = session.layout.object;
    for (entity, piece) in pieces.iter() {
        let (body_color, detail_color) = piece_palette(session.variant, piece.visual);
        let (body, detail, detail_offset) = match session.variant {
            GameVariant::Boxes => (
                meshes.add(Rectangle::new(dims.width, dims.height)),
                meshes.add(Rectangle::new(dims.width * 0.18, dims.height)),
                Vec3::new(0.0, 0.0, 0.01),
            ),
            GameVariant::Doughnuts => {
                let radius = dims.height * 0.5;
                let length = (dims.width - dims.height).max(0.0);
                let quarter = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
                (
                    meshes.add(Mesh::from(Capsule2d::new(radius, length)).rotated_by(quarter)),
                    meshes.add(
                        Mesh::from(Capsule2d::new(radius * 0.55, length)).rotated_by(quarter),
                    ),
                    Vec3::new(0.0, radius * 0.4, 0.01),
                )
            }
        };

        let mut entity_commands = commands.entity(entity);
        entity_commands.insert((
            Mesh2d(body),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(body_color))),
        ));
        entity_commands.with_children(|parent| {
            parent.spawn((
                Mesh2d(detail),
                MeshMaterial2d(materials.add(ColorMaterial::from_color(detail_color))),
                Transform::from_translation(detail_offset),
            ));
        });
    }
}

pub fn attach_ground_visual_system(
    mut commands: Commands,
    session: Res<GameSession>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    ground: Query<Entity, Added<GroundSlab>>,
) {
    for entity in ground.iter() {
        commands.entity(entity).insert((
            Mesh2d(meshes.add(Rectangle::new(
                session.layout.view_width,
                session.layout.ground_top,
            ))),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(GROUND))),
            Visibility::default(),
        ));
    }
}

// ── Placement guide ──────────────────────────────────────────────────────────

/// Outline where the next piece would land on a perfect drop.
pub fn guide_gizmo_system(
    mut gizmos: Gizmos,
    session: Res<GameSession>,
    pieces: Query<&Transform, With<StackedObject>>,
) {
    if session.is_over() {
        return;
    }
    let Some(top) = session.last_placed.and_then(|e| pieces.get(e).ok()) else {
        return;
    };
    let dims = session.layout.object;
    let center = Vec2::new(top.translation.x, session.spawn_y);
    gizmos.rect_2d(
        Isometry2d::from_translation(center),
        Vec2::new(dims.width, dims.height),
        guide_color(session.perfect_glow, session.score),
    );
}

// ── HUD ──────────────────────────────────────────────────────────────────────

/// Spawn the score HUD in the top-left corner.
pub fn setup_hud_score(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(16.0),
                top: Val::Px(12.0),
                ..default()
            },
            HudScoreDisplay,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("0"),
                TextFont {
                    font_size: HUD_FONT_PX,
                    ..default()
                },
                TextColor(Color::srgb(0.30, 0.22, 0.15)),
            ));
        });
}

/// Refresh the HUD text when the session changes.
pub fn hud_score_display_system(
    session: Res<GameSession>,
    parent_query: Query<&Children, With<HudScoreDisplay>>,
    mut text_query: Query<&mut Text>,
) {
    if !session.is_changed() {
        return;
    }
    let label = match session.variant {
        GameVariant::Boxes => format!("{}", session.score),
        GameVariant::Doughnuts => format!("{} stacked", session.stacked),
    };
    for children in parent_query.iter() {
        for child in children.iter() {
            if let Ok(mut text) = text_query.get_mut(child) {
                if text.0 != label {
                    text.0.clone_from(&label);
                }
            }
        }
    }
}

pub fn cleanup_hud_score(mut commands: Commands, hud: Query<Entity, With<HudScoreDisplay>>) {
    for entity in hud.iter() {
        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guide_is_gold_only_after_scoring() {
        assert_eq!(guide_color(1.0, 0), guide_color(0.0, 0));
        assert_ne!(guide_color(1.0, 10), guide_color(0.0, 10));
        assert_eq!(guide_color(0.0, 10), guide_color(0.0, 0));
    }

    #[test]
    fn palette_wraps_visual_index() {
        assert_eq!(
            piece_palette(GameVariant::Boxes, 1),
            piece_palette(GameVariant::Boxes, 5)
        );
        assert_ne!(
            piece_palette(GameVariant::Doughnuts, 0).1,
            piece_palette(GameVariant::Doughnuts, 1).1
        );
    }
}
