//! Runtime tuning configuration loaded from `assets/stacking.toml`.
//!
//! [`StackConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_stack_config`] reads
//! `assets/stacking.toml` and overwrites the defaults with any values present
//! in the file.  Missing keys fall back to the compile-time defaults, so a
//! minimal TOML can override just the values you care about:
//!
//! ```toml
//! tilt_limit_deg = 8.0
//! camera_lerp = 0.1
//!
//! [boxes]
//! friction = 0.7
//!
//! [report]
//! base_url = "https://games.example.com/api"
//! ```
//!
//! ## Usage in systems
//!
//! Add `config: Res<StackConfig>` to any system parameter list and read values
//! with `config.tilt_limit_deg`, `config.variant(GameVariant::Boxes)`, etc.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `StackConfig::default()`.

use crate::constants::*;
use crate::error::{validate_accuracy_bands, validate_freeze_angles, validate_positive, StackResult};
use crate::state::GameVariant;
use bevy::prelude::*;
use serde::{Deserialize, Deserializer};

/// Path of the optional override file, relative to the working directory.
pub const CONFIG_PATH: &str = "assets/stacking.toml";

/// Runtime-tunable gameplay and physics configuration.
///
/// All fields default to the corresponding compile-time constant from
/// `src/constants.rs`.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    // ── Layout ───────────────────────────────────────────────────────────────
    pub pixels_per_meter: f32,
    pub max_game_width_px: f32,
    pub wide_layout_px: f32,
    pub tablet_aspect: f32,
    pub phone_size_ratio: f32,
    pub tablet_size_ratio: f32,
    pub wide_size_ratio: f32,
    pub max_object_size: f32,
    pub spawn_margin_factor: f32,
    pub bounce_min_fraction: f32,
    pub bounce_max_fraction: f32,
    pub wide_bounce_min_fraction: f32,
    pub wide_bounce_max_fraction: f32,
    pub ground_thickness: f32,

    // ── Physics: Gravity & Timestep ──────────────────────────────────────────
    pub base_gravity: f32,
    pub base_screen_height_px: f32,
    pub gravity_scale_min: f32,
    pub gravity_scale_max: f32,
    pub speed_scale: f32,
    pub fixed_hz: f64,
    pub max_logic_steps_per_frame: f32,

    // ── Oscillation Speed ────────────────────────────────────────────────────
    pub base_horizontal_speed: f32,
    pub speed_increment: f32,
    pub speed_up_points: u32,

    // ── Drop Accuracy ────────────────────────────────────────────────────────
    pub perfect_offset_ratio: f32,
    pub good_offset_ratio: f32,
    pub normal_offset_ratio: f32,
    pub normal_offset_min: f32,
    pub perfect_points: u32,
    pub good_points: u32,
    pub normal_points: u32,

    // ── Landing ──────────────────────────────────────────────────────────────
    pub settle_speed: f32,
    pub settle_angvel: f32,
    pub settle_still_frames: u32,
    pub stacked_min_dy_ratio: f32,
    pub stacked_max_dx_ratio: f32,
    pub fall_below_ratio: f32,
    pub fall_away_ratio: f32,
    pub fall_grace_secs: f32,

    // ── Stability ────────────────────────────────────────────────────────────
    pub stable_speed: f32,
    pub stable_angvel: f32,
    pub reset_speed: f32,
    pub reset_angvel: f32,
    pub settle_secs: f32,
    pub tilt_limit_deg: f32,
    pub runaway_speed: f32,
    pub runaway_angvel: f32,
    pub stray_below_ratio: f32,
    pub stray_away_ratio: f32,

    // ── Freezing ─────────────────────────────────────────────────────────────
    pub freeze_min_depth: usize,
    pub freeze_keep_top: usize,
    pub freeze_min_stable_secs: f32,
    pub freeze_snap_deg: f32,
    pub freeze_max_deg: f32,
    pub freeze_tolerance: f32,
    pub prune_screens: f32,

    // ── Camera ───────────────────────────────────────────────────────────────
    pub camera_target_fraction: f32,
    pub camera_lerp: f32,
    pub camera_max_step: f32,

    // ── Effects ──────────────────────────────────────────────────────────────
    pub dust_decay_per_sec: f32,
    pub dust_rise_speed: f32,
    pub popup_decay_per_sec: f32,
    pub popup_rise_speed: f32,
    pub perfect_glow_decay: f32,

    // ── Session ──────────────────────────────────────────────────────────────
    pub retry_lockout_secs: f32,
    pub coin_score_floor: u32,
    pub coin_base: u32,
    pub coin_points_per_coin: u32,
    pub coin_cap: u32,

    // ── Variants & Reporting ─────────────────────────────────────────────────
    #[serde(deserialize_with = "boxes_table")]
    pub boxes: VariantTuning,
    #[serde(default = "VariantTuning::doughnuts", deserialize_with = "doughnuts_table")]
    pub doughnuts: VariantTuning,
    pub report: ReportConfig,
}

/// Per-variant piece physics and completion rules.
///
/// Each `[boxes]` / `[doughnuts]` table is layered over that variant's own
/// defaults, so a single key can be retuned without touching the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantTuning {
    /// Piece height as a fraction of its width.
    pub height_ratio: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Multiplier on the layout gravity.
    pub gravity_scale: f32,
    /// Stacked pieces that complete the game; `None` means endless.
    pub target_count: Option<u32>,
    /// Coins for reaching `target_count` (endless games use the score formula).
    pub completion_coins: u32,
    /// Index of this game's flag on the completion service.
    pub game_index: usize,
}

impl VariantTuning {
    /// Square, heavy, barely bouncy crates.
    pub fn boxes() -> Self {
        Self {
            height_ratio: 1.0,
            density: 1.0,
            friction: 0.6,
            restitution: 0.05,
            gravity_scale: 1.0,
            target_count: None,
            completion_coins: 0,
            game_index: BOXES_GAME_INDEX,
        }
    }

    /// Flat, light, bouncy, slippery doughnuts seen from the side.
    pub fn doughnuts() -> Self {
        Self {
            height_ratio: 0.45,
            density: 0.6,
            friction: 0.3,
            restitution: 0.3,
            gravity_scale: 0.8,
            target_count: Some(DOUGHNUT_TARGET_COUNT),
            completion_coins: DOUGHNUT_COMPLETION_COINS,
            game_index: DOUGHNUTS_GAME_INDEX,
        }
    }
}

/// Keys present in one variant table of the TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TuningTable {
    height_ratio: Option<f32>,
    density: Option<f32>,
    friction: Option<f32>,
    restitution: Option<f32>,
    gravity_scale: Option<f32>,
    target_count: Option<u32>,
    completion_coins: Option<u32>,
    game_index: Option<usize>,
}

impl TuningTable {
    fn over(self, base: VariantTuning) -> VariantTuning {
        VariantTuning {
            height_ratio: self.height_ratio.unwrap_or(base.height_ratio),
            density: self.density.unwrap_or(base.density),
            friction: self.friction.unwrap_or(base.friction),
            restitution: self.restitution.unwrap_or(base.restitution),
            gravity_scale: self.gravity_scale.unwrap_or(base.gravity_scale),
            target_count: self.target_count.or(base.target_count),
            completion_coins: self.completion_coins.unwrap_or(base.completion_coins),
            game_index: self.game_index.unwrap_or(base.game_index),
        }
    }
}

fn boxes_table<'de, D: Deserializer<'de>>(deserializer: D) -> Result<VariantTuning, D::Error> {
    TuningTable::deserialize(deserializer).map(|t| t.over(VariantTuning::boxes()))
}

fn doughnuts_table<'de, D: Deserializer<'de>>(deserializer: D) -> Result<VariantTuning, D::Error> {
    TuningTable::deserialize(deserializer).map(|t| t.over(VariantTuning::doughnuts()))
}

/// Completion-service connection settings.
///
/// An empty `base_url` disables reporting entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub base_url: String,
    /// Full `Authorization` header value, e.g. `Basic dXNlcjpwYXNz`.
    pub authorization: String,
    pub login_id: String,
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            authorization: String::new(),
            login_id: DEFAULT_LOGIN_ID.to_string(),
            timeout_secs: REPORT_TIMEOUT_SECS,
        }
    }
}

impl ReportConfig {
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            // Layout
            pixels_per_meter: PIXELS_PER_METER,
            max_game_width_px: MAX_GAME_WIDTH_PX,
            wide_layout_px: WIDE_LAYOUT_PX,
            tablet_aspect: TABLET_ASPECT,
            phone_size_ratio: PHONE_SIZE_RATIO,
            tablet_size_ratio: TABLET_SIZE_RATIO,
            wide_size_ratio: WIDE_SIZE_RATIO,
            max_object_size: MAX_OBJECT_SIZE,
            spawn_margin_factor: SPAWN_MARGIN_FACTOR,
            bounce_min_fraction: BOUNCE_MIN_FRACTION,
            bounce_max_fraction: BOUNCE_MAX_FRACTION,
            wide_bounce_min_fraction: WIDE_BOUNCE_MIN_FRACTION,
            wide_bounce_max_fraction: WIDE_BOUNCE_MAX_FRACTION,
            ground_thickness: GROUND_THICKNESS,
            // Gravity & Timestep
            base_gravity: BASE_GRAVITY,
            base_screen_height_px: BASE_SCREEN_HEIGHT_PX,
            gravity_scale_min: GRAVITY_SCALE_MIN,
            gravity_scale_max: GRAVITY_SCALE_MAX,
            speed_scale: SPEED_SCALE,
            fixed_hz: FIXED_HZ,
            max_logic_steps_per_frame: MAX_LOGIC_STEPS_PER_FRAME,
            // Oscillation Speed
            base_horizontal_speed: BASE_HORIZONTAL_SPEED,
            speed_increment: SPEED_INCREMENT,
            speed_up_points: SPEED_UP_POINTS,
            // Drop Accuracy
            perfect_offset_ratio: PERFECT_OFFSET_RATIO,
            good_offset_ratio: GOOD_OFFSET_RATIO,
            normal_offset_ratio: NORMAL_OFFSET_RATIO,
            normal_offset_min: NORMAL_OFFSET_MIN,
            perfect_points: PERFECT_POINTS,
            good_points: GOOD_POINTS,
            normal_points: NORMAL_POINTS,
            // Landing
            settle_speed: SETTLE_SPEED,
            settle_angvel: SETTLE_ANGVEL,
            settle_still_frames: SETTLE_STILL_FRAMES,
            stacked_min_dy_ratio: STACKED_MIN_DY_RATIO,
            stacked_max_dx_ratio: STACKED_MAX_DX_RATIO,
            fall_below_ratio: FALL_BELOW_RATIO,
            fall_away_ratio: FALL_AWAY_RATIO,
            fall_grace_secs: FALL_GRACE_SECS,
            // Stability
            stable_speed: STABLE_SPEED,
            stable_angvel: STABLE_ANGVEL,
            reset_speed: RESET_SPEED,
            reset_angvel: RESET_ANGVEL,
            settle_secs: SETTLE_SECS,
            tilt_limit_deg: TILT_LIMIT_DEG,
            runaway_speed: RUNAWAY_SPEED,
            runaway_angvel: RUNAWAY_ANGVEL,
            stray_below_ratio: STRAY_BELOW_RATIO,
            stray_away_ratio: STRAY_AWAY_RATIO,
            // Freezing
            freeze_min_depth: FREEZE_MIN_DEPTH,
            freeze_keep_top: FREEZE_KEEP_TOP,
            freeze_min_stable_secs: FREEZE_MIN_STABLE_SECS,
            freeze_snap_deg: FREEZE_SNAP_DEG,
            freeze_max_deg: FREEZE_MAX_DEG,
            freeze_tolerance: FREEZE_TOLERANCE,
            prune_screens: PRUNE_SCREENS,
            // Camera
            camera_target_fraction: CAMERA_TARGET_FRACTION,
            camera_lerp: CAMERA_LERP,
            camera_max_step: CAMERA_MAX_STEP,
            // Effects
            dust_decay_per_sec: DUST_DECAY_PER_SEC,
            dust_rise_speed: DUST_RISE_SPEED,
            popup_decay_per_sec: POPUP_DECAY_PER_SEC,
            popup_rise_speed: POPUP_RISE_SPEED,
            perfect_glow_decay: PERFECT_GLOW_DECAY,
            // Session
            retry_lockout_secs: RETRY_LOCKOUT_SECS,
            coin_score_floor: COIN_SCORE_FLOOR,
            coin_base: COIN_BASE,
            coin_points_per_coin: COIN_POINTS_PER_COIN,
            coin_cap: COIN_CAP,
            // Variants & Reporting
            boxes: VariantTuning::boxes(),
            doughnuts: VariantTuning::doughnuts(),
            report: ReportConfig::default(),
        }
    }
}

impl StackConfig {
    /// Parse a TOML document over the compiled defaults and validate it.
    pub fn from_toml_str(contents: &str) -> StackResult<Self> {
        let config: StackConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would make tiers unreachable or freezing unsafe.
    pub fn validate(&self) -> StackResult<()> {
        validate_accuracy_bands(
            self.perfect_offset_ratio,
            self.good_offset_ratio,
            self.normal_offset_ratio,
        )?;
        validate_freeze_angles(self.freeze_snap_deg, self.freeze_max_deg)?;
        validate_positive("PIXELS_PER_METER", self.pixels_per_meter)?;
        validate_positive("FIXED_HZ", self.fixed_hz as f32)?;
        validate_positive("SETTLE_SECS", self.settle_secs)?;
        validate_positive("CAMERA_MAX_STEP", self.camera_max_step)?;
        validate_positive("RESET_SPEED", self.reset_speed)?;
        validate_positive("MAX_LOGIC_STEPS_PER_FRAME", self.max_logic_steps_per_frame)?;
        validate_positive("BOXES_HEIGHT_RATIO", self.boxes.height_ratio)?;
        validate_positive("DOUGHNUTS_HEIGHT_RATIO", self.doughnuts.height_ratio)?;
        Ok(())
    }

    /// Tuning for the given game variant.
    #[inline]
    pub fn variant(&self, variant: GameVariant) -> &VariantTuning {
        match variant {
            GameVariant::Boxes => &self.boxes,
            GameVariant::Doughnuts => &self.doughnuts,
        }
    }

    /// Length of one physics step (s).
    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        (1.0 / self.fixed_hz) as f32
    }

    /// Frame time fed to game-logic timers, capped at
    /// `max_logic_steps_per_frame` physics steps.
    #[inline]
    pub fn logic_dt(&self, frame_dt: f32) -> f32 {
        frame_dt.clamp(0.0, self.fixed_dt() * self.max_logic_steps_per_frame)
    }

    /// Apply `STACK_LOGIN_ID`, `STACK_API_URL` and `STACK_API_AUTH` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("STACK_LOGIN_ID") {
            self.report.login_id = id;
        }
        if let Ok(url) = std::env::var("STACK_API_URL") {
            self.report.base_url = url;
        }
        if let Ok(auth) = std::env::var("STACK_API_AUTH") {
            self.report.authorization = auth;
        }
    }
}

/// Startup system: attempt to load `assets/stacking.toml` and overwrite the
/// `StackConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  Parse and validation errors
/// are logged but do not abort startup.  A missing file is not an error.
pub fn load_stack_config(mut config: ResMut<StackConfig>) {
    match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => match StackConfig::from_toml_str(&contents) {
            Ok(loaded) => {
                *config = loaded;
                info!("[SETUP] Loaded stacking config from {CONFIG_PATH}");
            }
            Err(e) => {
                warn!("[SETUP] Ignoring {CONFIG_PATH}: {e}; using defaults");
            }
        },
        Err(_) => {
            info!("[SETUP] No {CONFIG_PATH} found; using compiled defaults");
        }
    }
    config.apply_env_overrides();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = StackConfig::from_toml_str("").unwrap();
        assert_eq!(config.tilt_limit_deg, TILT_LIMIT_DEG);
        assert_eq!(config.boxes.game_index, BOXES_GAME_INDEX);
        assert_eq!(config.doughnuts.target_count, Some(DOUGHNUT_TARGET_COUNT));
        assert!(!config.report.is_enabled());
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let config = StackConfig::from_toml_str(
            "camera_lerp = 0.2\n[report]\nbase_url = \"http://localhost:9000\"\n",
        )
        .unwrap();
        assert_eq!(config.camera_lerp, 0.2);
        assert_eq!(config.camera_max_step, CAMERA_MAX_STEP);
        assert!(config.report.is_enabled());
        assert_eq!(config.report.login_id, DEFAULT_LOGIN_ID);
    }

    #[test]
    fn overlapping_accuracy_bands_are_rejected() {
        let result = StackConfig::from_toml_str("good_offset_ratio = 0.01\n");
        assert!(result.is_err());
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let result = StackConfig::from_toml_str("tilt_limit_deg = \"steep\"\n");
        assert!(matches!(result, Err(crate::error::StackError::ConfigParse(_))));
    }

    #[test]
    fn partial_doughnut_table_keeps_doughnut_defaults() {
        let config = StackConfig::from_toml_str("[doughnuts]\nfriction = 0.2\n").unwrap();
        assert_eq!(config.doughnuts.friction, 0.2);
        assert_eq!(config.doughnuts.game_index, DOUGHNUTS_GAME_INDEX);
        assert_eq!(config.doughnuts.target_count, Some(DOUGHNUT_TARGET_COUNT));
        assert_eq!(config.doughnuts.restitution, VariantTuning::doughnuts().restitution);
        assert_eq!(config.boxes, VariantTuning::boxes());
    }

    #[test]
    fn misspelled_variant_key_is_a_parse_error() {
        let result = StackConfig::from_toml_str("[boxes]\nfriciton = 0.2\n");
        assert!(matches!(result, Err(crate::error::StackError::ConfigParse(_))));
    }

    #[test]
    fn zero_logic_steps_is_rejected() {
        let result = StackConfig::from_toml_str("max_logic_steps_per_frame = 0.0\n");
        assert!(matches!(
            result,
            Err(crate::error::StackError::UnsafeConstant {
                name: "MAX_LOGIC_STEPS_PER_FRAME",
                ..
            })
        ));
    }

    #[test]
    fn variant_lookup_returns_matching_tuning() {
        let config = StackConfig::default();
        assert_eq!(config.variant(GameVariant::Boxes).height_ratio, 1.0);
        assert!(config.variant(GameVariant::Doughnuts).height_ratio < 1.0);
    }
}
