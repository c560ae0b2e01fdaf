//! Error types and handling for catn
//!
//! Every fatal condition of a transfer maps to exactly one variant here, and every
//! variant maps to a distinct process exit status so calling scripts can tell a
//! source-side fault from a destination-side fault from an idle timeout.
//!
//! Capability loss (zero-copy not supported) is deliberately absent: it is absorbed
//! by the drain-then-fallback protocol and never reaches the caller.

use std::io;
use std::os::fd::RawFd;

/// Exit status for a complete transfer
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status for an invalid configuration value
pub const EXIT_CONFIG: u8 = 1;
/// Exit status for a strict-mode transfer that hit end of input early
pub const EXIT_EXHAUSTED_EARLY: u8 = 2;
/// Exit status for an idle timeout
pub const EXIT_TIMEOUT: u8 = 3;
/// Exit status for a source read/pull failure
pub const EXIT_READ: u8 = 4;
/// Exit status for a destination write/push failure
pub const EXIT_WRITE: u8 = 5;
/// Exit status for a kernel buffer allocation failure
pub const EXIT_KERNEL_BUFFER: u8 = 6;
/// Exit status for a failure while draining the kernel buffer
pub const EXIT_DRAIN: u8 = 7;

/// Main error type for catn operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Caller supplied a malformed or out-of-range value
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// No data arrived on the source within the idle timeout
    #[error("timed out after reading no data for {seconds} sec ({delivered} bytes delivered)")]
    Timeout {
        /// Configured idle timeout in seconds
        seconds: u64,
        /// Bytes confirmed written to the destination before the deadline fired
        delivered: u64,
    },

    /// Reading or pulling from the source failed
    #[error("failed read from fd {fd}: {message}")]
    Read {
        /// Source descriptor
        fd: RawFd,
        /// Error message from the failed call
        message: String,
    },

    /// Writing or pushing to the destination failed
    #[error("failed write to fd {fd}: {message}")]
    Write {
        /// Destination descriptor
        fd: RawFd,
        /// Error message from the failed call
        message: String,
    },

    /// The intermediate kernel buffer could not be created
    #[error("failed to create pipe() for splice kernel buffer: {message}")]
    KernelBuffer {
        /// Error message from the failed call
        message: String,
    },

    /// Staged bytes could not be moved out of the kernel buffer during a fallback switch
    #[error("while falling back to read/write, {message}")]
    Drain {
        /// Error message describing which half of the drain failed
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// Configuration errors
    Config,
    /// Idle timeout
    Timeout,
    /// Source-side transfer errors
    Read,
    /// Destination-side transfer errors
    Write,
    /// Kernel buffer allocation errors
    KernelBuffer,
    /// Errors while discharging staged bytes
    Drain,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Read { .. } => ErrorKind::Read,
            Self::Write { .. } => ErrorKind::Write,
            Self::KernelBuffer { .. } => ErrorKind::KernelBuffer,
            Self::Drain { .. } => ErrorKind::Drain,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Config => EXIT_CONFIG,
            ErrorKind::Timeout => EXIT_TIMEOUT,
            ErrorKind::Read => EXIT_READ,
            ErrorKind::Write => EXIT_WRITE,
            ErrorKind::KernelBuffer => EXIT_KERNEL_BUFFER,
            ErrorKind::Drain => EXIT_DRAIN,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new source-side error
    pub fn read(fd: RawFd, error: &io::Error) -> Self {
        Self::Read {
            fd,
            message: error.to_string(),
        }
    }

    /// Create a new destination-side error
    pub fn write(fd: RawFd, error: &io::Error) -> Self {
        Self::Write {
            fd,
            message: error.to_string(),
        }
    }

    /// Destination accepted zero bytes although it was handed a non-empty chunk
    pub fn write_zero(fd: RawFd) -> Self {
        Self::Write {
            fd,
            message: "destination accepted 0 bytes".to_string(),
        }
    }

    /// Create a new kernel buffer error
    pub fn kernel_buffer(error: &io::Error) -> Self {
        Self::KernelBuffer {
            message: error.to_string(),
        }
    }

    /// Create a new drain error
    pub fn drain<S: Into<String>>(message: S) -> Self {
        Self::Drain {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::config("bad"), EXIT_CONFIG)]
    #[case(Error::Timeout { seconds: 1, delivered: 0 }, EXIT_TIMEOUT)]
    #[case(Error::read(0, &io::Error::from(io::ErrorKind::BrokenPipe)), EXIT_READ)]
    #[case(Error::write(1, &io::Error::from(io::ErrorKind::BrokenPipe)), EXIT_WRITE)]
    #[case(Error::write_zero(1), EXIT_WRITE)]
    #[case(Error::kernel_buffer(&io::Error::from(io::ErrorKind::OutOfMemory)), EXIT_KERNEL_BUFFER)]
    #[case(Error::drain("short read"), EXIT_DRAIN)]
    fn test_exit_codes(#[case] error: Error, #[case] expected: u8) {
        assert_eq!(error.exit_code(), expected);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let mut codes = vec![
            EXIT_SUCCESS,
            EXIT_CONFIG,
            EXIT_EXHAUSTED_EARLY,
            EXIT_TIMEOUT,
            EXIT_READ,
            EXIT_WRITE,
            EXIT_KERNEL_BUFFER,
            EXIT_DRAIN,
        ];
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 8);
    }

    #[test]
    fn test_messages_name_the_descriptor() {
        let error = Error::read(7, &io::Error::from_raw_os_error(9));
        assert!(error.to_string().contains("fd 7"));

        let error = Error::write_zero(42);
        assert!(error.to_string().contains("fd 42"));
        assert!(error.to_string().contains("0 bytes"));
    }

    proptest! {
        #[test]
        fn test_timeout_reports_delivered_bytes(seconds in 1u64..3600, delivered in any::<u64>()) {
            let error = Error::Timeout { seconds, delivered };
            prop_assert_eq!(error.kind(), ErrorKind::Timeout);
            let message = error.to_string();
            let needle = format!("{} sec", seconds);
            let delivered_needle = format!("{} bytes", delivered);
            prop_assert!(message.contains(&needle));
            prop_assert!(message.contains(&delivered_needle));
        }
    }
}
