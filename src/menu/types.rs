use crate::state::GameVariant;
use bevy::prelude::*;

/// Top-level application state machine.
#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    /// Start screen with the variant choice; shown on startup.
    #[default]
    MainMenu,
    /// A stacking session is running.
    Playing,
    /// The session ended; the result overlay is shown over the frozen tower.
    GameOver,
}

/// Which stacking game the next session plays.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectedVariant(pub GameVariant);

/// Present when the start screen should be skipped on launch
/// (`STACK_VARIANT` was set).
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct AutoStart;

/// Seconds since the game-over overlay appeared.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct GameOverTimer {
    pub elapsed: f32,
}

/// Root node of the start screen; despawned on `OnExit(MainMenu)`.
#[derive(Component)]
pub struct MainMenuRoot;

/// Tags a variant button on the start screen.
#[derive(Component, Debug, Clone, Copy)]
pub struct MenuVariantButton(pub GameVariant);

/// Tags the rewards note under a variant button.
#[derive(Component, Debug, Clone, Copy)]
pub struct RewardsNote(pub GameVariant);

/// Tags the "Quit" button.
#[derive(Component)]
pub struct MenuQuitButton;

/// Root node of the game-over overlay; despawned on `OnExit(GameOver)`.
#[derive(Component)]
pub struct GameOverRoot;

/// Tags the "Retry" button.
#[derive(Component)]
pub struct GameOverRetryButton;

/// Tags the text inside the "Retry" button so the lockout countdown can
/// update it.
#[derive(Component)]
pub struct RetryLabel;

/// Tags the "Menu" button.
#[derive(Component)]
pub struct GameOverMenuButton;
