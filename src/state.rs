//! Session components and resources.
//!
//! All ECS components and Bevy resources that describe a stacking session
//! live here.  Systems that mutate this state are in the sibling modules:
//! - [`crate::spawner`] — piece creation + oscillation
//! - [`crate::landing`] — drop, contact, settle/fail decisions
//! - [`crate::stability`] — settle timers, collapse detection, freezing
//! - [`crate::camera`] — vertical camera follow

use crate::camera::CameraState;
use crate::config::StackConfig;
use bevy::prelude::*;

// ── Variants ───────────────────────────────────────────────────────────────────

/// Which stacking game is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameVariant {
    /// Endless, scored box stacking.
    #[default]
    Boxes,
    /// Doughnut stacking; completed after a fixed number of pieces.
    Doughnuts,
}

impl GameVariant {
    /// Parse the `STACK_VARIANT` spelling of a variant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "boxes" | "box" => Some(Self::Boxes),
            "doughnuts" | "doughnut" | "donut" => Some(Self::Doughnuts),
            _ => None,
        }
    }

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            GameVariant::Boxes => "BOX STACK",
            GameVariant::Doughnuts => "DOUGHNUT STACK",
        }
    }
}

// ── Accuracy ───────────────────────────────────────────────────────────────────

/// Result tier assigned to a drop from its horizontal offset to the previous piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitAccuracy {
    Perfect,
    Good,
    Normal,
    /// Beyond the normal band; the drop is doomed once it settles.
    Fail,
}

impl HitAccuracy {
    /// Points awarded when a drop of this tier settles on the stack.
    #[inline]
    pub fn points(self, config: &StackConfig) -> u32 {
        match self {
            HitAccuracy::Perfect => config.perfect_points,
            HitAccuracy::Good => config.good_points,
            HitAccuracy::Normal => config.normal_points,
            HitAccuracy::Fail => 0,
        }
    }
}

// ── Layout ─────────────────────────────────────────────────────────────────────

/// Piece dimensions in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectDims {
    pub width: f32,
    pub height: f32,
}

impl ObjectDims {
    #[inline]
    pub fn half_extents(self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Geometry fixed for the lifetime of one session, derived from the window
/// size when the session starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionLayout {
    /// Visible world width and height (m).
    pub view_width: f32,
    pub view_height: f32,
    pub object: ObjectDims,
    /// Magnitude of downward gravity (m/s²).
    pub gravity: f32,
    /// Oscillation turn-around points (world x).
    pub bounce_min_x: f32,
    pub bounce_max_x: f32,
    /// Distance from the top of the view to a spawned piece's centre (m).
    pub spawn_margin: f32,
    /// Top surface of the ground slab (world y).
    pub ground_top: f32,
}

impl SessionLayout {
    /// Derive the layout for a window of `window_px` pixels.
    ///
    /// Piece size follows the shorter screen side (with the width capped at
    /// `max_game_width_px`), using a smaller ratio on tablets and wide
    /// screens.  Gravity scales with the window height so that a piece takes
    /// roughly the same number of frames to cross the screen everywhere.
    pub fn derive(window_px: Vec2, config: &StackConfig, variant: GameVariant) -> Self {
        let width_px = window_px.x.max(1.0);
        let height_px = window_px.y.max(1.0);
        let ppm = config.pixels_per_meter;

        let wide = width_px >= config.wide_layout_px;
        let tablet = width_px / height_px > config.tablet_aspect;
        let ratio = if wide {
            config.wide_size_ratio
        } else if tablet {
            config.tablet_size_ratio
        } else {
            config.phone_size_ratio
        };

        let shorter = width_px.min(config.max_game_width_px).min(height_px);
        let width = (shorter * ratio / ppm).min(config.max_object_size);
        let tuning = config.variant(variant);
        let object = ObjectDims {
            width,
            height: width * tuning.height_ratio,
        };

        let view_width = width_px / ppm;
        let view_height = height_px / ppm;

        let gravity_scale = (height_px / config.base_screen_height_px)
            .clamp(config.gravity_scale_min, config.gravity_scale_max);
        let gravity =
            config.base_gravity * gravity_scale * config.speed_scale * tuning.gravity_scale;

        let (lo, hi) = if wide {
            (config.wide_bounce_min_fraction, config.wide_bounce_max_fraction)
        } else {
            (config.bounce_min_fraction, config.bounce_max_fraction)
        };

        Self {
            view_width,
            view_height,
            object,
            gravity,
            bounce_min_x: view_width * lo,
            bounce_max_x: view_width * hi,
            spawn_margin: object.height * config.spawn_margin_factor,
            ground_top: config.ground_thickness,
        }
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.view_width * 0.5
    }
}

// ── Components ─────────────────────────────────────────────────────────────────

/// Authoritative pose of a frozen piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrozenPose {
    pub position: Vec2,
    pub angle: f32,
}

/// One game piece, placed or in flight.
///
/// Position, rotation and velocities live on the Rapier components of the
/// same entity; this component carries the game-side bookkeeping.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct StackedObject {
    /// Palette index in `0..VISUAL_VARIANTS`.
    pub visual: usize,
    /// Stopped long enough to count as placed.
    pub settled: bool,
    /// Seconds of continuous low-velocity motion.
    pub stable_time: f32,
    /// Present once the piece has been converted to a fixed body.
    pub frozen: Option<FrozenPose>,
    pub hit_accuracy: Option<HitAccuracy>,
}

impl StackedObject {
    pub fn new(visual: usize) -> Self {
        Self {
            visual,
            settled: false,
            stable_time: 0.0,
            frozen: None,
            hit_accuracy: None,
        }
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }
}

/// Marker for the static ground slab.
#[derive(Component, Debug, Clone, Copy)]
pub struct GroundSlab;

/// Rotation of a 2D body about +Z, in radians within `(-π, π]`.
#[inline]
pub fn body_angle(transform: &Transform) -> f32 {
    transform.rotation.to_euler(EulerRot::XYZ).2
}

// ── Current object ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPhase {
    /// Kinematic, sweeping left and right until the player drops it.
    Oscillating,
    /// Dynamic, falling under gravity.
    Falling,
}

/// The one piece under player control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentObject {
    pub entity: Entity,
    pub phase: DropPhase,
    /// Set by the first contact after the drop; later contacts are ignored.
    pub has_landed: bool,
    pub hit_accuracy: Option<HitAccuracy>,
    /// The drop offset was already beyond the normal band.
    pub offset_fail: bool,
    /// Seconds spent off the stack while falling.
    pub off_stack_secs: f32,
    /// Consecutive frames the landed piece has been stopped.
    pub still_frames: u32,
}

impl CurrentObject {
    pub fn oscillating(entity: Entity) -> Self {
        Self {
            entity,
            phase: DropPhase::Oscillating,
            has_landed: false,
            hit_accuracy: None,
            offset_fail: false,
            off_stack_secs: 0.0,
            still_frames: 0,
        }
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.phase == DropPhase::Falling
    }
}

// ── Outcome ────────────────────────────────────────────────────────────────────

/// Why the tower was declared collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseCause {
    /// Dropped beyond the normal offset band.
    OffsetMiss,
    /// Came to rest beside or below the previous piece.
    MissedStack,
    /// Stayed off the stack past the grace window, or a settled piece slid off.
    FellOffStack,
    /// Left the bottom of the view.
    OutOfView,
    /// A settled piece tilted past the limit.
    Tilted,
    /// A settled piece is moving or spinning implausibly fast.
    Runaway,
    /// Non-finite position from the solver.
    InvalidPose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    Collapsed {
        cause: CollapseCause,
        /// Where the failing piece was, when one piece is to blame.
        at: Option<Vec2>,
    },
    /// Reached the variant's target count.
    Completed,
}

/// Side of the screen the tower fell towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailDirection {
    Left,
    Right,
}

impl FailDirection {
    #[inline]
    pub fn classify(x: f32, center_x: f32) -> Self {
        if x < center_x {
            FailDirection::Left
        } else {
            FailDirection::Right
        }
    }

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            FailDirection::Left => "left",
            FailDirection::Right => "right",
        }
    }
}

/// Final tally of a session, produced once at game-over.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSessionResult {
    pub variant: GameVariant,
    pub stacked: u32,
    pub score: u32,
    pub duration_secs: u32,
    /// `None` when the session was completed rather than collapsed.
    pub fail_direction: Option<FailDirection>,
    pub completed: bool,
    pub coins: u32,
}

/// Most recent session result, shown on the game-over overlay.
#[derive(Resource, Debug, Clone)]
pub struct LastResult(pub GameSessionResult);

/// Coins earned for an endless-mode score.
///
/// Nothing below `coin_score_floor`; `coin_base` at the floor, one more per
/// `coin_points_per_coin` above it, capped at `coin_cap`.
pub fn coins_for_score(score: u32, config: &StackConfig) -> u32 {
    if score < config.coin_score_floor {
        return 0;
    }
    let extra = (score - config.coin_score_floor) / config.coin_points_per_coin.max(1);
    (config.coin_base + extra).min(config.coin_cap)
}

// ── Session ────────────────────────────────────────────────────────────────────

/// Everything one stacking session owns.
///
/// Inserted when a session starts and removed on teardown; every gameplay
/// system takes it explicitly, so a new session can never observe a previous
/// session's state.
#[derive(Resource, Debug, Clone)]
pub struct GameSession {
    pub variant: GameVariant,
    pub layout: SessionLayout,
    pub current: Option<CurrentObject>,
    /// Most recently settled piece; accuracy and camera follow measure from it.
    pub last_placed: Option<Entity>,
    pub score: u32,
    pub stacked: u32,
    /// Oscillation speed of the next spawned piece (m/s).
    pub horizontal_speed: f32,
    /// Centre height of the most recently spawned piece.
    pub spawn_y: f32,
    /// Placement-guide highlight after a perfect drop, decaying 1 → 0.
    pub perfect_glow: f32,
    pub camera: CameraState,
    /// Session time (s).
    pub elapsed: f32,
    pub outcome: Option<SessionOutcome>,
    /// Whether finishing this session earns rewards on the completion service.
    pub rewards_available: bool,
}

impl GameSession {
    pub fn new(variant: GameVariant, layout: SessionLayout, config: &StackConfig) -> Self {
        Self {
            variant,
            layout,
            current: None,
            last_placed: None,
            score: 0,
            stacked: 0,
            horizontal_speed: config.base_horizontal_speed * config.speed_scale,
            spawn_y: layout.view_height - layout.spawn_margin,
            perfect_glow: 0.0,
            camera: CameraState::new(0.0),
            elapsed: 0.0,
            outcome: None,
            rewards_available: false,
        }
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    #[inline]
    pub fn current_entity(&self) -> Option<Entity> {
        self.current.map(|c| c.entity)
    }

    /// Record the session outcome.  Only the first call has any effect.
    pub fn end(&mut self, outcome: SessionOutcome) {
        if self.outcome.is_some() {
            return;
        }
        match outcome {
            SessionOutcome::Collapsed { cause, .. } => {
                info!(
                    "Tower collapsed ({:?}) with {} stacked, score {}",
                    cause, self.stacked, self.score
                );
            }
            SessionOutcome::Completed => {
                info!("Stack completed with {} pieces", self.stacked);
            }
        }
        self.outcome = Some(outcome);
    }

    /// Add `points` to the score and speed up oscillation once per
    /// `speed_up_points` threshold crossed.  Returns the thresholds crossed.
    pub fn award(&mut self, points: u32, config: &StackConfig) -> u32 {
        let interval = config.speed_up_points.max(1);
        let before = self.score / interval;
        self.score += points;
        let crossed = self.score / interval - before;
        if crossed > 0 {
            self.horizontal_speed += config.speed_increment * config.speed_scale * crossed as f32;
            debug!("Speed up to {:.2} m/s at score {}", self.horizontal_speed, self.score);
        }
        crossed
    }

    /// Build the final tally.
    ///
    /// `last_placed_x` is used for the fail direction when the collapse was
    /// not caused by one identifiable piece (e.g. a tilt).
    pub fn result(&self, config: &StackConfig, last_placed_x: Option<f32>) -> GameSessionResult {
        let tuning = config.variant(self.variant);
        let center = self.layout.center_x();
        let (completed, fail_direction) = match self.outcome {
            Some(SessionOutcome::Completed) => (true, None),
            Some(SessionOutcome::Collapsed { at, .. }) => {
                let x = at.map(|p| p.x).or(last_placed_x).unwrap_or(0.0);
                (tuning.target_count.is_none(), Some(FailDirection::classify(x, center)))
            }
            None => (false, None),
        };
        let coins = match tuning.target_count {
            Some(_) if completed => tuning.completion_coins,
            Some(_) => 0,
            None => coins_for_score(self.score, config),
        };
        GameSessionResult {
            variant: self.variant,
            stacked: self.stacked,
            score: self.score,
            duration_secs: self.elapsed.max(0.0).floor() as u32,
            fail_direction,
            completed,
            coins,
        }
    }
}
