//! Result type alias for catn operations

use crate::Error;

/// Result type alias for catn operations
pub type Result<T> = std::result::Result<T, Error>;
