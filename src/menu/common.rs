use bevy::prelude::*;

pub(super) fn panel_bg() -> Color {
    Color::srgb(0.961, 0.945, 0.910)
}
pub(super) fn start_bg() -> Color {
    Color::srgb(0.80, 0.62, 0.40)
}
pub(super) fn start_border() -> Color {
    Color::srgb(0.55, 0.38, 0.20)
}
pub(super) fn start_text() -> Color {
    Color::srgb(0.22, 0.14, 0.06)
}
pub(super) fn doughnut_bg() -> Color {
    Color::srgb(0.96, 0.70, 0.78)
}
pub(super) fn doughnut_border() -> Color {
    Color::srgb(0.72, 0.36, 0.48)
}
pub(super) fn quit_bg() -> Color {
    Color::srgb(0.86, 0.84, 0.80)
}
pub(super) fn quit_border() -> Color {
    Color::srgb(0.60, 0.58, 0.54)
}
pub(super) fn quit_text() -> Color {
    Color::srgb(0.36, 0.34, 0.32)
}
pub(super) fn title_color() -> Color {
    Color::srgb(0.545, 0.271, 0.075)
}
pub(super) fn subtitle_color() -> Color {
    Color::srgb(0.42, 0.36, 0.30)
}
pub(super) fn hint_color() -> Color {
    Color::srgb(0.62, 0.58, 0.52)
}
pub(super) fn locked_text() -> Color {
    Color::srgb(0.55, 0.50, 0.45)
}

pub(super) fn spacer(parent: &mut ChildSpawnerCommands<'_>, px: f32) {
    parent.spawn(Node {
        height: Val::Px(px),
        ..default()
    });
}

/// Standard 220×50 bordered menu button node.
pub(super) fn button_node() -> Node {
    Node {
        width: Val::Px(220.0),
        height: Val::Px(50.0),
        justify_content: JustifyContent::Center,
        align_items: AlignItems::Center,
        border: UiRect::all(Val::Px(2.0)),
        ..default()
    }
}

pub(super) fn label(text: impl Into<String>, size: f32, color: Color) -> impl Bundle {
    (
        Text::new(text),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(color),
    )
}

/// Apply hover highlighting to a button's text children.
pub(super) fn highlight_children(
    interaction: &Interaction,
    children: &Children,
    rest: Color,
    texts: &mut Query<&mut TextColor>,
) {
    let color = match interaction {
        Interaction::Hovered | Interaction::Pressed => Color::BLACK,
        Interaction::None => rest,
    };
    for child in children.iter() {
        if let Ok(mut text_color) = texts.get_mut(child) {
            *text_color = TextColor(color);
        }
    }
}
