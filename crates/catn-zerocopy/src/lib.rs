//! Zero-copy transfer engine for catn
//!
//! Copies one open descriptor to another. On Linux the bytes go through a pipe
//! with `splice(2)` and never enter user space; everywhere else, and whenever
//! the kernel refuses the descriptors, a buffered read/write loop takes over.
//!
//! - **Probe**: zero-length splices rule the path out before any byte moves
//! - **Mid-stream downgrade**: bytes stranded in the pipe are drained and written
//!   before the buffered loop continues with the remaining budget
//! - **Idle timeout**: a deadline around every blocking pull or read
//!
//! # Features
//!
//! - `async`: [`TransferEngine::transfer_owned_async`] on tokio's blocking pool
//!
//! # Examples
//!
//! ```rust,no_run
//! use catn_types::{IdleTimeout, TransferOptions};
//! use catn_zerocopy::TransferEngine;
//! use std::os::fd::AsFd;
//!
//! let options = TransferOptions::new()
//!     .with_max_bytes(1 << 20)
//!     .with_idle_timeout(IdleTimeout::from_secs(5)?);
//! let stdin = std::io::stdin();
//! let stdout = std::io::stdout();
//! let report = TransferEngine::new(options).transfer_fds(stdin.as_fd(), stdout.as_fd())?;
//! eprintln!("{} bytes via {:?}", report.bytes_transferred, report.path);
//! # Ok::<(), catn_types::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod probe;

#[cfg(target_os = "linux")]
pub mod linux;

pub use engine::TransferEngine;
pub use probe::{is_capability_loss, probe, Capability};

#[cfg(target_os = "linux")]
pub use linux::{KernelBuffer, SpliceChannel};
