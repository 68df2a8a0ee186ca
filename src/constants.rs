//! Centralised gameplay and physics constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! Every constant is mirrored by a field of [`crate::config::StackConfig`],
//! which is what systems actually read.
//!
//! ## Units
//!
//! World space is y-up and measured in meters.  The camera projection maps
//! [`PIXELS_PER_METER`] screen pixels onto one world unit, so a 480 × 800
//! window shows a 12 m × 20 m slice of the world.

// ── Layout ────────────────────────────────────────────────────────────────────

/// Screen pixels per world meter (camera projection scale is its inverse).
pub const PIXELS_PER_METER: f32 = 40.0;

/// Game-area width cap in pixels; wider windows still size pieces as if
/// they were this wide.
pub const MAX_GAME_WIDTH_PX: f32 = 600.0;

/// Window width (px) from which the layout switches to the "large tablet"
/// profile: smaller pieces and a narrower oscillation band.
pub const WIDE_LAYOUT_PX: f32 = 1024.0;

/// Aspect ratio (width / height) above which the window is treated as a tablet.
pub const TABLET_ASPECT: f32 = 0.7;

/// Piece size as a fraction of the shorter screen side, per layout profile.
pub const PHONE_SIZE_RATIO: f32 = 0.22;
pub const TABLET_SIZE_RATIO: f32 = 0.20;
pub const WIDE_SIZE_RATIO: f32 = 0.16;

/// Upper bound on piece width (m).
pub const MAX_OBJECT_SIZE: f32 = 5.0;

/// Window size assumed when no primary window exists (headless runs).
pub const DEFAULT_WINDOW_WIDTH_PX: f32 = 480.0;
pub const DEFAULT_WINDOW_HEIGHT_PX: f32 = 800.0;

/// Distance between the top of the view and a freshly spawned piece, in
/// multiples of the piece height.
pub const SPAWN_MARGIN_FACTOR: f32 = 1.0;

/// Oscillation band as fractions of the view width.
pub const BOUNCE_MIN_FRACTION: f32 = 0.15;
pub const BOUNCE_MAX_FRACTION: f32 = 0.85;
pub const WIDE_BOUNCE_MIN_FRACTION: f32 = 0.25;
pub const WIDE_BOUNCE_MAX_FRACTION: f32 = 0.75;

/// Thickness of the static ground slab (m).  Its top surface sits at this y.
pub const GROUND_THICKNESS: f32 = 0.4;

// ── Physics: Gravity & Timestep ──────────────────────────────────────────────

/// Gravity (m/s²) on a window of [`BASE_SCREEN_HEIGHT_PX`].
pub const BASE_GRAVITY: f32 = 10.0;

/// Reference window height for gravity scaling.
pub const BASE_SCREEN_HEIGHT_PX: f32 = 800.0;

/// Clamp applied to `window_height / BASE_SCREEN_HEIGHT_PX`.
pub const GRAVITY_SCALE_MIN: f32 = 0.7;
pub const GRAVITY_SCALE_MAX: f32 = 1.4;

/// Shared multiplier for fall and oscillation speed.  Raising it makes the
/// whole game feel faster without changing its proportions.
pub const SPEED_SCALE: f32 = 1.4;

/// Physics steps per second.  Rapier always advances by exactly `1 / FIXED_HZ`.
pub const FIXED_HZ: f64 = 60.0;

/// Game logic never integrates more than this many fixed steps' worth of
/// wall-clock time in one frame, so a stalled frame cannot fast-forward timers.
pub const MAX_LOGIC_STEPS_PER_FRAME: f32 = 2.0;

// ── Oscillation Speed ────────────────────────────────────────────────────────

/// Initial horizontal speed (m/s) of an oscillating piece, before `SPEED_SCALE`.
pub const BASE_HORIZONTAL_SPEED: f32 = 2.0;

/// Speed added (before `SPEED_SCALE`) every time the score crosses a multiple
/// of [`SPEED_UP_POINTS`].
pub const SPEED_INCREMENT: f32 = 0.5;

/// Score interval between speed-ups.
pub const SPEED_UP_POINTS: u32 = 70;

// ── Drop Accuracy ────────────────────────────────────────────────────────────

/// Offset bands as fractions of the piece width.
pub const PERFECT_OFFSET_RATIO: f32 = 0.05;
pub const GOOD_OFFSET_RATIO: f32 = 0.25;
pub const NORMAL_OFFSET_RATIO: f32 = 0.5;

/// The normal band is never narrower than this (m), so tiny pieces stay playable.
pub const NORMAL_OFFSET_MIN: f32 = 0.3;

/// Points awarded per accuracy tier.
pub const PERFECT_POINTS: u32 = 10;
pub const GOOD_POINTS: u32 = 7;
pub const NORMAL_POINTS: u32 = 5;

// ── Landing ──────────────────────────────────────────────────────────────────

/// Below this linear (m/s) and angular (rad/s) speed a falling piece has stopped.
pub const SETTLE_SPEED: f32 = 0.05;
pub const SETTLE_ANGVEL: f32 = 0.05;

/// Consecutive stopped frames before a landed piece is judged, so the apex
/// of a bounce is not mistaken for rest.
pub const SETTLE_STILL_FRAMES: u32 = 2;

/// A stopped piece counts as stacked only if its centre is at least this many
/// piece heights above the previous one...
pub const STACKED_MIN_DY_RATIO: f32 = 0.5;

/// ...and horizontally closer than this many piece widths.
pub const STACKED_MAX_DX_RATIO: f32 = 0.9;

/// A falling piece more than this many heights below the previous one is off-stack.
pub const FALL_BELOW_RATIO: f32 = 1.5;

/// A falling piece more than this many widths away horizontally is off-stack.
pub const FALL_AWAY_RATIO: f32 = 2.0;

/// Seconds an off-stack falling piece is given before the drop fails.
pub const FALL_GRACE_SECS: f32 = 0.5;

// ── Stability ────────────────────────────────────────────────────────────────

/// Below these speeds a piece accumulates stable time.
pub const STABLE_SPEED: f32 = 0.08;
pub const STABLE_ANGVEL: f32 = 0.08;

/// Above these speeds a piece's stable time is zeroed.  The gap between the
/// stable and reset thresholds absorbs solver jitter.
pub const RESET_SPEED: f32 = 0.4;
pub const RESET_ANGVEL: f32 = 0.4;

/// Continuous stable time after which a piece is settled (s).
pub const SETTLE_SECS: f32 = 0.5;

/// Tilt beyond which a settled piece means the tower has collapsed (degrees).
pub const TILT_LIMIT_DEG: f32 = 10.0;

/// Linear (m/s) and angular (rad/s) speed of a settled piece treated as runaway.
pub const RUNAWAY_SPEED: f32 = 25.0;
pub const RUNAWAY_ANGVEL: f32 = 12.0;

/// Settled pieces more than this many heights below the last placed piece
/// have fallen off the tower.
pub const STRAY_BELOW_RATIO: f32 = 2.0;

/// Settled pieces more than this many widths away horizontally have fallen off.
pub const STRAY_AWAY_RATIO: f32 = 3.0;

// ── Freezing ─────────────────────────────────────────────────────────────────

/// Freezing starts once more than this many pieces are settled.
pub const FREEZE_MIN_DEPTH: usize = 2;

/// The top N settled pieces always stay dynamic.
pub const FREEZE_KEEP_TOP: usize = 2;

/// A freeze candidate must have been stable for longer than this (s).
pub const FREEZE_MIN_STABLE_SECS: f32 = 0.4;

/// Tilt at or below which a candidate is snapped flat before freezing (degrees).
pub const FREEZE_SNAP_DEG: f32 = 5.0;

/// Tilt beyond which a candidate is not frozen this frame (degrees).
pub const FREEZE_MAX_DEG: f32 = 12.0;

/// Position (m) / angle (rad) drift tolerated before a frozen piece is reset.
pub const FREEZE_TOLERANCE: f32 = 0.001;

/// Frozen pieces this many view heights below the camera are pruned.
pub const PRUNE_SCREENS: f32 = 2.0;

// ── Camera ───────────────────────────────────────────────────────────────────

/// Screen fraction (from the top) at which the last placed piece is held.
pub const CAMERA_TARGET_FRACTION: f32 = 0.8;

/// Fraction of the remaining distance covered each frame.
pub const CAMERA_LERP: f32 = 0.08;

/// Maximum camera movement per frame (m).
pub const CAMERA_MAX_STEP: f32 = 0.25;

// ── Effects ──────────────────────────────────────────────────────────────────

/// Dust puff life lost per second and rise speed (m/s).
pub const DUST_DECAY_PER_SEC: f32 = 0.72;
pub const DUST_RISE_SPEED: f32 = 0.3;

/// Score popup life lost per second and rise speed (m/s).
pub const POPUP_DECAY_PER_SEC: f32 = 0.9;
pub const POPUP_RISE_SPEED: f32 = 1.2;

/// Placement-guide glow lost per second after a perfect drop.
pub const PERFECT_GLOW_DECAY: f32 = 1.8;

// ── Session ──────────────────────────────────────────────────────────────────

/// Seconds the retry action is locked after game-over.
pub const RETRY_LOCKOUT_SECS: f32 = 3.0;

/// Score below which no coins are earned.
pub const COIN_SCORE_FLOOR: u32 = 70;

/// Coins at exactly [`COIN_SCORE_FLOOR`], one more per [`COIN_POINTS_PER_COIN`].
pub const COIN_BASE: u32 = 10;
pub const COIN_POINTS_PER_COIN: u32 = 10;
pub const COIN_CAP: u32 = 25;

/// Number of visual variants (palette entries) per piece kind.
pub const VISUAL_VARIANTS: usize = 4;

// ── Reporting ────────────────────────────────────────────────────────────────

/// Upper bound on a completion-service HTTP round trip (s).
pub const REPORT_TIMEOUT_SECS: u64 = 5;

/// Login id used when none is configured.
pub const DEFAULT_LOGIN_ID: &str = "guest";

/// Completion-flag index of each game on the remote service.
pub const BOXES_GAME_INDEX: usize = 3;
pub const DOUGHNUTS_GAME_INDEX: usize = 5;

/// Pieces the doughnut game needs to stack to be completed.
pub const DOUGHNUT_TARGET_COUNT: u32 = 5;

/// Coins awarded for completing the doughnut game.
pub const DOUGHNUT_COMPLETION_COINS: u32 = 10;
