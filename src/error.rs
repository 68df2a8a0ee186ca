//! Error types for the stacking game.
//!
//! Nothing in here is fatal to a running session: physics cleanup misses are
//! logged and skipped, report failures are logged and dropped, and config
//! problems fall back to compiled defaults.  The only player-visible failure
//! is game-over, which is a [`crate::state::SessionOutcome`], not an error.

use std::fmt;

/// Top-level error enum for the stacking game.
#[derive(Debug)]
pub enum StackError {
    /// A body entity was referenced after it left the world, usually a
    /// despawn racing a pending command during teardown.
    EntityNotFound {
        /// Human-readable description of where the lookup occurred.
        context: &'static str,
    },

    /// The simulation world has already been torn down.
    WorldTornDown {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// `assets/stacking.toml` could not be parsed.
    ConfigParse(String),

    /// A tuning value is outside its safe operating range.
    UnsafeConstant {
        /// Name of the value (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },

    /// The completion service could not be reached or answered with an error status.
    Http(String),

    /// The completion service answered with a body we could not decode.
    Decode(String),
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::EntityNotFound { context } => {
                write!(f, "entity not found during '{}'", context)
            }
            StackError::WorldTornDown { operation } => {
                write!(f, "'{}' called after the simulation world was torn down", operation)
            }
            StackError::ConfigParse(msg) => write!(f, "config parse error: {}", msg),
            StackError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "constant '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
            StackError::Http(msg) => write!(f, "completion service request failed: {}", msg),
            StackError::Decode(msg) => {
                write!(f, "completion service response not understood: {}", msg)
            }
        }
    }
}

impl std::error::Error for StackError {}

impl From<toml::de::Error> for StackError {
    fn from(e: toml::de::Error) -> Self {
        StackError::ConfigParse(e.to_string())
    }
}

impl From<ureq::Error> for StackError {
    fn from(e: ureq::Error) -> Self {
        StackError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for StackError {
    fn from(e: serde_json::Error) -> Self {
        StackError::Decode(e.to_string())
    }
}

/// Convenience alias: a `Result` using `StackError` as the error type.
pub type StackResult<T> = Result<T, StackError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error unless `value` is finite and strictly positive.
pub fn validate_positive(name: &'static str, value: f32) -> StackResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StackError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Accuracy bands must widen monotonically: perfect < good < normal.
///
/// Overlapping bands would make a tier unreachable.
pub fn validate_accuracy_bands(perfect: f32, good: f32, normal: f32) -> StackResult<()> {
    validate_positive("PERFECT_OFFSET_RATIO", perfect)?;
    if good <= perfect {
        return Err(StackError::UnsafeConstant {
            name: "GOOD_OFFSET_RATIO",
            value: good,
            safe_range: "(PERFECT_OFFSET_RATIO, NORMAL_OFFSET_RATIO)",
        });
    }
    if normal <= good {
        return Err(StackError::UnsafeConstant {
            name: "NORMAL_OFFSET_RATIO",
            value: normal,
            safe_range: "(GOOD_OFFSET_RATIO, ∞)",
        });
    }
    Ok(())
}

/// The snap tolerance must sit inside the hard freeze limit, and both below 90°.
pub fn validate_freeze_angles(snap_deg: f32, max_deg: f32) -> StackResult<()> {
    if !(0.0..90.0).contains(&snap_deg) {
        return Err(StackError::UnsafeConstant {
            name: "FREEZE_SNAP_DEG",
            value: snap_deg,
            safe_range: "[0.0, 90.0)",
        });
    }
    if max_deg < snap_deg || max_deg >= 90.0 {
        return Err(StackError::UnsafeConstant {
            name: "FREEZE_MAX_DEG",
            value: max_deg,
            safe_range: "[FREEZE_SNAP_DEG, 90.0)",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_bands_must_widen() {
        assert!(validate_accuracy_bands(0.05, 0.25, 0.5).is_ok());
        assert!(validate_accuracy_bands(0.05, 0.05, 0.5).is_err());
        assert!(validate_accuracy_bands(0.05, 0.25, 0.2).is_err());
        assert!(validate_accuracy_bands(0.0, 0.25, 0.5).is_err());
    }

    #[test]
    fn freeze_snap_must_not_exceed_limit() {
        assert!(validate_freeze_angles(5.0, 12.0).is_ok());
        assert!(validate_freeze_angles(12.0, 5.0).is_err());
        assert!(validate_freeze_angles(5.0, 95.0).is_err());
    }

    #[test]
    fn positive_rejects_nan() {
        assert!(validate_positive("X", f32::NAN).is_err());
        assert!(validate_positive("X", -1.0).is_err());
        assert!(validate_positive("X", 0.5).is_ok());
    }

    #[test]
    fn display_names_the_context() {
        let e = StackError::EntityNotFound { context: "teardown" };
        assert_eq!(e.to_string(), "entity not found during 'teardown'");
    }
}
