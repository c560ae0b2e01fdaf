//! Blocking descriptor I/O for catn
//!
//! This crate holds everything a transfer needs that does not involve the kernel
//! staging buffer:
//!
//! - **Descriptor syscalls**: single `read`/`write`/`poll` calls on borrowed descriptors
//! - **Idle timeout guard**: a call-scoped deadline around each blocking read
//! - **Buffered copy loop**: the read/write fallback path
//!
//! Every descriptor is expected to be in blocking mode. No call is retried on `EINTR`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use catn_io::{BufferedCopy, FdEndpoints, IdleGuard};
//! use catn_types::{BufferSize, ByteAccountant, IdleTimeout};
//! use std::os::fd::AsFd;
//!
//! let stdin = std::io::stdin();
//! let stdout = std::io::stdout();
//! let mut endpoints = FdEndpoints::new(stdin.as_fd(), stdout.as_fd());
//! let mut acct = ByteAccountant::new(0);
//! let mut guard = IdleGuard::new(IdleTimeout::DISABLED);
//! BufferedCopy::new(BufferSize::default()).run(&mut endpoints, &mut acct, &mut guard)?;
//! # Ok::<(), catn_types::Error>(())
//! ```

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod buffered;
pub mod fd;
pub mod guard;

pub use buffered::{write_all, BufferedCopy};
pub use fd::{poll_readable, read_fd, write_fd, FdEndpoints};
pub use guard::{GuardState, IdleGuard};
