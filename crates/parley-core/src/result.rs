//! Convenience result type alias for Parley.

use crate::error::AppError;

/// A specialized `Result` type for Parley operations.
pub type AppResult<T> = Result<T, AppError>;
