//! Exit codes for the CLI

/// Success
pub const SUCCESS: i32 = 0;

/// The task ended with an error
pub const TASK_FAILED: i32 = 1;

/// The task was terminated before finishing
pub const CANCELLED: i32 = 130;
