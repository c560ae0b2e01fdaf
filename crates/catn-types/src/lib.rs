//! Core type system and error handling for catn
//!
//! This crate provides the foundational types shared by the catn transfer engine
//! and its command-line front end. It includes:
//!
//! - **Error handling**: One error enum whose variants map onto distinct exit statuses
//! - **Core types**: Transfer outcome, per-call report and the byte accountant
//! - **Traits**: The endpoint seams the transfer loops are written against
//! - **Configuration**: Validated transfer options
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use catn_types::{ByteAccountant, Completion, TransferOptions};
//!
//! let options = TransferOptions::new().with_max_bytes(100).strict(true);
//! let mut acct = ByteAccountant::new(options.max_bytes);
//! acct.record_buffered(60);
//! assert_eq!(acct.completion(options.strict), Completion::ExhaustedEarly);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{BufferSize, ChunkSize, IdleTimeout, TransferOptions};
pub use error::{
    Error, ErrorKind, EXIT_CONFIG, EXIT_DRAIN, EXIT_EXHAUSTED_EARLY, EXIT_KERNEL_BUFFER,
    EXIT_READ, EXIT_SUCCESS, EXIT_TIMEOUT, EXIT_WRITE,
};
pub use result::Result;
pub use traits::{StreamEndpoints, ZeroCopyChannel};
pub use types::{ByteAccountant, Completion, TransferPath, TransferReport};
