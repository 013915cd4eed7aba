pub mod engine;

pub use engine::{
    apply_answer, clamp_status, due_interval_days, is_due, is_valid_status, Answer, ReviewEngine,
    STATUS_IGNORED, STATUS_MAX, STATUS_MIN, STATUS_WELL_KNOWN,
};
