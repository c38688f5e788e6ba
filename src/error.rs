//! Error types for slot selection.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("invalid snapshot for {user}: {reason}")]
    Aggregation { user: String, reason: String },
    #[error("no activity recorded for this period")]
    NoActivity,
    #[error("activity score for {user} overflows")]
    ScoreOverflow { user: String },
    #[error("insufficient pool: need {required} distinct users, have {available}")]
    InsufficientPool { required: usize, available: usize },
    #[error("assessor {assessor} already holds an open slot from week {open_week}")]
    DuplicateSlot { assessor: String, open_week: i32 },
    #[error("assessor identifier must not be empty")]
    InvalidAssessor,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number, got {value}")]
    InvalidRatio { name: &'static str, value: f64 },
    #[error("ratio_actions and ratio_volume cannot both be zero")]
    ZeroWeights,
    #[error("total_multiplier must be positive")]
    ZeroMultiplier,
    #[error("slot_size must be positive")]
    ZeroSlotSize,
}
