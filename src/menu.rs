//! Start screen and game-over overlay: `GameState` definition and `MenuPlugin`.
//!
//! ## States
//!
//! | State       | Description                                          |
//! |-------------|------------------------------------------------------|
//! | `MainMenu`  | Initial state; variant choice and rewards notes      |
//! | `Playing`   | A session is running; all stacking systems active    |
//! | `GameOver`  | Physics paused; result overlay with retry and menu   |
//!
//! ## Systems (registered by `MenuPlugin`)
//!
//! | System                    | Schedule               | Purpose                          |
//! |---------------------------|------------------------|----------------------------------|
//! | `setup_main_menu`         | `OnEnter(MainMenu)`    | Spawn the start screen           |
//! | `cleanup_main_menu`       | `OnExit(MainMenu)`     | Despawn start-screen entities    |
//! | `menu_button_system`      | `Update / MainMenu`    | Variant choice and quit          |
//! | `rewards_note_system`     | `Update / MainMenu`    | Refresh notes when status lands  |
//! | `auto_start_system`       | `Update / MainMenu`    | `STACK_VARIANT` launch shortcut  |
//! | `setup_game_over`         | `OnEnter(GameOver)`    | Spawn the result overlay         |
//! | `cleanup_game_over`       | `OnExit(GameOver)`     | Despawn the overlay              |
//! | `game_over_timer_system`  | `Update / GameOver`    | Retry lockout countdown          |
//! | `game_over_button_system` | `Update / GameOver`    | Retry and back-to-menu           |

use crate::config::StackConfig;
use crate::report::{CompletionClient, CompletionStatus};
use crate::state::{GameSessionResult, GameVariant, LastResult};
use bevy::prelude::*;

mod common;
mod game_over;
mod main_menu;
mod types;

use common::*;
use game_over::*;
use main_menu::*;

pub use game_over::{result_title, retry_label, retry_unlocked};
pub use main_menu::rewards_note;
pub use types::*;

/// Registers `GameState`, both screens, and their input handlers.
///
/// Add this plugin before any plugin that gates systems on
/// `in_state(GameState::…)`.
pub struct MenuPlugin;

impl Plugin for MenuPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .init_resource::<SelectedVariant>()
            .init_resource::<GameOverTimer>()
            .init_resource::<CompletionClient>()
            .init_resource::<CompletionStatus>()
            .add_systems(OnEnter(GameState::MainMenu), setup_main_menu)
            .add_systems(OnExit(GameState::MainMenu), cleanup_main_menu)
            .add_systems(
                Update,
                (menu_button_system, rewards_note_system, auto_start_system)
                    .run_if(in_state(GameState::MainMenu)),
            )
            .add_systems(OnEnter(GameState::GameOver), setup_game_over)
            .add_systems(OnExit(GameState::GameOver), cleanup_game_over)
            .add_systems(
                Update,
                (game_over_timer_system, game_over_button_system)
                    .chain()
                    .run_if(in_state(GameState::GameOver)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FailDirection;

    #[test]
    fn retry_counts_down_then_unlocks() {
        assert!(!retry_unlocked(0.0, 3.0));
        assert_eq!(retry_label(0.0, 3.0), "RETRY (3)");
        assert_eq!(retry_label(2.1, 3.0), "RETRY (1)");
        assert!(retry_unlocked(3.0, 3.0));
        assert_eq!(retry_label(3.2, 3.0), "RETRY");
    }

    #[test]
    fn title_reflects_outcome() {
        let mut result = GameSessionResult {
            variant: GameVariant::Doughnuts,
            stacked: 5,
            score: 5,
            duration_secs: 20,
            fail_direction: None,
            completed: true,
            coins: 10,
        };
        assert_eq!(result_title(&result), "STACK COMPLETE!");
        result.fail_direction = Some(FailDirection::Right);
        assert_eq!(result_title(&result), "THE TOWER FELL");
    }

    #[test]
    fn rewards_note_tracks_client_and_status() {
        let offline = CompletionClient::default();
        let status = CompletionStatus {
            flags: Some(vec![false, false, false, true]),
        };
        assert_eq!(rewards_note(&offline, &status, 3), "practice mode");

        struct Online;
        impl crate::report::CompletionService for Online {
            fn fetch_status(&self, _: &str) -> crate::error::StackResult<Vec<bool>> {
                Ok(Vec::new())
            }
            fn report(&self, _: &crate::report::CompletionReport) -> crate::error::StackResult<()> {
                Ok(())
            }
        }
        let online = CompletionClient(Some(std::sync::Arc::new(Online)));
        assert_eq!(rewards_note(&online, &status, 3), "done today · no rewards");
        assert_eq!(rewards_note(&online, &status, 1), "rewards available");
        assert_eq!(
            rewards_note(&online, &CompletionStatus::default(), 1),
            "checking rewards…"
        );
    }
}
