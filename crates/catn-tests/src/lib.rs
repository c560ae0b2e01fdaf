//! catn testing suite
//!
//! Integration tests and benchmarks that drive the transfer engine over real
//! descriptors: regular files, pipes and combinations of both.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// This module provides common utilities used across all test files
/// to ensure consistency and reduce code duplication.
pub mod test_utils;
