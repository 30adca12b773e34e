//! Error type for the motion core.
//!
//! Only round creation and configuration loading can fail. Per-tick,
//! per-entity problems degrade to no-ops inside the passes and never
//! surface here.

use thiserror::Error;

/// Errors reported by the motion core.
#[derive(Debug, Error)]
pub enum MotionError {
    /// A per-entity config array disagrees with the declared population.
    #[error("{field} has {actual} entries but the round declares {expected} entities")]
    SizeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An entity index outside `[0, count)`.
    #[error("entity index {index} is outside the population of {count}")]
    IndexOutOfRange { index: usize, count: usize },

    /// A raw pattern tag that names no motion pattern.
    #[error("unknown motion pattern tag {0}")]
    UnknownPatternTag(u8),

    #[error("invalid motion config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[cfg(feature = "parallel")]
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn tick thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_message_names_field() {
        let err = MotionError::SizeMismatch {
            field: "speeds",
            expected: 4,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("speeds"));
        assert!(msg.contains('4'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_parse_error_converts() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: MotionError = parse.into();
        assert!(matches!(err, MotionError::Parse(_)));
    }
}
