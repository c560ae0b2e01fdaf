//! Dual-path transfer engine
//!
//! The engine probes the zero-copy path, runs the splice loop while it works, and
//! downgrades to the buffered loop for the rest of the stream when it stops
//! working. The delivered total only ever counts bytes the destination accepted.
//!
//! # Staged bytes
//!
//! Between a pull and the matching pushes, bytes live only in the kernel buffer:
//! they have left the source and not reached the destination. Whatever is staged
//! when the splice loop exits is discharged (read out of the kernel buffer and
//! written to the destination) before anything else happens, on every exit path
//! that is not itself fatal. Bytes taken from the source are never dropped and
//! never reordered.
//!
//! # Failure policy
//!
//! Nothing is retried. An interrupted blocking call (other than the idle timeout,
//! which is a timed wait and not an interruption) is a fatal read or write error.

use catn_io::{write_all, BufferedCopy, FdEndpoints, IdleGuard};
use catn_types::{
    ByteAccountant, Error, Result, StreamEndpoints, TransferOptions, TransferPath,
    TransferReport, ZeroCopyChannel,
};
use std::os::fd::BorrowedFd;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::probe::{is_capability_loss, probe};

#[cfg(target_os = "linux")]
use crate::linux::{KernelBuffer, SpliceChannel};

/// Why the splice loop stopped without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpliceExit {
    /// Source returned end of input
    EndOfInput,
    /// The byte limit was reached
    LimitReached,
    /// Pull or push reported that zero-copy is not supported
    CapabilityLost,
}

/// Descriptor-to-descriptor copier
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferEngine {
    options: TransferOptions,
}

impl TransferEngine {
    /// Create an engine for the given options
    pub fn new(options: TransferOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Copy from `source` to `destination`, both open and blocking
    ///
    /// Creates the kernel buffer when zero-copy is enabled and supported by the
    /// platform; failing to create it is fatal and moves no bytes.
    pub fn transfer_fds(
        &self,
        source: BorrowedFd<'_>,
        destination: BorrowedFd<'_>,
    ) -> Result<TransferReport> {
        let endpoints = FdEndpoints::new(source, destination);

        #[cfg(target_os = "linux")]
        if self.options.zero_copy {
            let buffer = KernelBuffer::new(self.options.chunk_size)?;
            let mut channel = SpliceChannel::new(endpoints, buffer);
            return self.transfer(&mut channel);
        }

        let mut endpoints = endpoints;
        self.transfer_buffered(&mut endpoints)
    }

    /// Copy through any zero-copy capable channel
    pub fn transfer<C>(&self, channel: &mut C) -> Result<TransferReport>
    where
        C: ZeroCopyChannel + ?Sized,
    {
        if !self.options.zero_copy {
            return self.transfer_buffered(channel);
        }

        let start = Instant::now();
        let mut acct = ByteAccountant::new(self.options.max_bytes);
        let mut guard = IdleGuard::new(self.options.idle_timeout);

        info!(
            "transfer fd {} -> fd {} (max {}, zero-copy)",
            channel.source_fd(),
            channel.destination_fd(),
            self.options.max_bytes
        );

        let path = if probe(channel).zero_copy() {
            let mut staged = 0usize;
            let exit = self.splice_loop(channel, &mut acct, &mut guard, &mut staged)?;
            discharge(channel, &mut staged, &mut acct)?;

            if exit == SpliceExit::CapabilityLost {
                warn!(
                    "falling back to read/write after {} bytes: no splice support on fd {} or fd {}",
                    acct.delivered(),
                    channel.source_fd(),
                    channel.destination_fd()
                );
                BufferedCopy::new(self.options.buffer_size).run(channel, &mut acct, &mut guard)?;
                TransferPath::Mixed
            } else {
                TransferPath::ZeroCopy
            }
        } else {
            BufferedCopy::new(self.options.buffer_size).run(channel, &mut acct, &mut guard)?;
            TransferPath::Buffered
        };

        Ok(self.report(&acct, path, start))
    }

    /// Copy with the read/write loop only
    pub fn transfer_buffered<E>(&self, endpoints: &mut E) -> Result<TransferReport>
    where
        E: StreamEndpoints + ?Sized,
    {
        let start = Instant::now();
        let mut acct = ByteAccountant::new(self.options.max_bytes);
        let mut guard = IdleGuard::new(self.options.idle_timeout);

        info!(
            "transfer fd {} -> fd {} (max {}, read/write)",
            endpoints.source_fd(),
            endpoints.destination_fd(),
            self.options.max_bytes
        );

        BufferedCopy::new(self.options.buffer_size).run(endpoints, &mut acct, &mut guard)?;
        Ok(self.report(&acct, TransferPath::Buffered, start))
    }

    /// Pull a chunk into the kernel buffer, push all of it out, repeat
    ///
    /// `staged` always holds the number of pulled-but-not-pushed bytes, so the
    /// caller can discharge them whatever the exit reason.
    fn splice_loop<C>(
        &self,
        channel: &mut C,
        acct: &mut ByteAccountant,
        guard: &mut IdleGuard,
        staged: &mut usize,
    ) -> Result<SpliceExit>
    where
        C: ZeroCopyChannel + ?Sized,
    {
        let chunk = self.options.chunk_size.get();

        loop {
            let want = acct.next_request(chunk);
            if want == 0 {
                return Ok(SpliceExit::LimitReached);
            }

            guard.arm();
            guard.wait_for_input(channel, acct.delivered())?;
            let pulled = channel.pull(want);
            guard.disarm();

            *staged = match pulled {
                Ok(0) => return Ok(SpliceExit::EndOfInput),
                Ok(n) => n,
                Err(e) if is_capability_loss(&e) => {
                    debug!("splice from fd {} unsupported: {}", channel.source_fd(), e);
                    return Ok(SpliceExit::CapabilityLost);
                }
                Err(e) => return Err(Error::read(channel.source_fd(), &e)),
            };

            while *staged > 0 {
                match channel.push(*staged) {
                    Ok(0) => return Err(Error::write_zero(channel.destination_fd())),
                    Ok(n) => {
                        *staged -= n;
                        acct.record_zerocopy(n);
                    }
                    Err(e) if is_capability_loss(&e) => {
                        debug!(
                            "splice to fd {} unsupported with {} bytes staged: {}",
                            channel.destination_fd(),
                            *staged,
                            e
                        );
                        return Ok(SpliceExit::CapabilityLost);
                    }
                    Err(e) => return Err(Error::write(channel.destination_fd(), &e)),
                }
            }

            debug!("spliced {} bytes total", acct.delivered());
        }
    }

    fn report(&self, acct: &ByteAccountant, path: TransferPath, start: Instant) -> TransferReport {
        let report = TransferReport {
            bytes_transferred: acct.delivered(),
            completion: acct.completion(self.options.strict),
            zerocopy_bytes: acct.zerocopy(),
            buffered_bytes: acct.buffered(),
            path,
            duration: start.elapsed(),
        };
        info!(
            "transferred {} bytes via {:?} in {:?} ({:?})",
            report.bytes_transferred, report.path, report.duration, report.completion
        );
        report
    }

    /// Run [`Self::transfer_fds`] on tokio's blocking pool with owned descriptors
    #[cfg(feature = "async")]
    pub async fn transfer_owned_async(
        self,
        source: std::os::fd::OwnedFd,
        destination: std::os::fd::OwnedFd,
    ) -> Result<TransferReport> {
        use std::os::fd::{AsFd, AsRawFd};

        let source_fd = source.as_raw_fd();
        let handle = tokio::task::spawn_blocking(move || {
            self.transfer_fds(source.as_fd(), destination.as_fd())
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::read(
                source_fd,
                &std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()),
            )),
        }
    }
}

/// Move every staged byte out of the kernel buffer and on to the destination
///
/// No-op when nothing is staged. Any failure here is a drain error: the bytes
/// already left the source and there is no other way to deliver them.
fn discharge<C>(channel: &mut C, staged: &mut usize, acct: &mut ByteAccountant) -> Result<()>
where
    C: ZeroCopyChannel + ?Sized,
{
    if *staged == 0 {
        return Ok(());
    }

    let mut buf = vec![0u8; *staged];
    let mut filled = 0;
    while filled < buf.len() {
        match channel.drain_staged(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::drain(format!(
                    "kernel buffer ran dry with {} of {} staged bytes unread",
                    buf.len() - filled,
                    buf.len()
                )))
            }
            Ok(n) => filled += n,
            Err(e) => {
                return Err(Error::drain(format!(
                    "couldn't get bytes that were stored in kernel buffer: {}",
                    e
                )))
            }
        }
    }

    write_all(channel, &buf, acct).map_err(|e| {
        Error::drain(format!(
            "failed writing the bytes recovered from kernel buffer to fd {}: {}",
            channel.destination_fd(),
            e
        ))
    })?;

    debug!("discharged {} staged bytes", buf.len());
    *staged = 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catn_types::{ChunkSize, Completion, ErrorKind, IdleTimeout};
    use std::collections::VecDeque;
    use std::io;
    use std::os::fd::RawFd;
    use std::time::Duration;

    /// In-memory channel with injectable capability loss and short pushes
    #[derive(Default)]
    struct ScriptedChannel {
        input: Vec<u8>,
        pos: usize,
        staged: VecDeque<u8>,
        output: Vec<u8>,
        pulled: usize,
        /// Pushes fail as unsupported once this many bytes were pushed
        push_unsupported_after: Option<usize>,
        /// Pulls fail as unsupported once this many bytes were pulled
        pull_unsupported_after: Option<usize>,
        /// Largest push or write accepted
        cap: Option<usize>,
        pushed: usize,
        zero_push: bool,
        probe_fails: bool,
        drain_fails: bool,
    }

    impl ScriptedChannel {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input,
                ..Self::default()
            }
        }

        fn capped(&self, len: usize) -> usize {
            self.cap.map_or(len, |cap| len.min(cap))
        }
    }

    impl StreamEndpoints for ScriptedChannel {
        fn source_fd(&self) -> RawFd {
            10
        }

        fn destination_fd(&self) -> RawFd {
            11
        }

        fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
            Ok(true)
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.input.len() - self.pos);
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = self.capped(buf.len());
            self.output.extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }

    impl ZeroCopyChannel for ScriptedChannel {
        fn pull(&mut self, len: usize) -> io::Result<usize> {
            if len == 0 {
                return if self.probe_fails {
                    Err(io::Error::from_raw_os_error(libc::EINVAL))
                } else {
                    Ok(0)
                };
            }
            if self.pull_unsupported_after.is_some_and(|n| self.pulled >= n) {
                return Err(io::Error::from_raw_os_error(libc::EINVAL));
            }
            let n = len.min(self.input.len() - self.pos);
            self.staged
                .extend(self.input[self.pos..self.pos + n].iter().copied());
            self.pos += n;
            self.pulled += n;
            Ok(n)
        }

        fn push(&mut self, len: usize) -> io::Result<usize> {
            if len == 0 {
                return Ok(0);
            }
            if self.zero_push {
                return Ok(0);
            }
            if self.push_unsupported_after.is_some_and(|n| self.pushed >= n) {
                return Err(io::Error::from_raw_os_error(libc::EINVAL));
            }
            let mut n = self.capped(len.min(self.staged.len()));
            if let Some(limit) = self.push_unsupported_after {
                n = n.min(limit - self.pushed);
            }
            self.output.extend(self.staged.drain(..n));
            self.pushed += n;
            Ok(n)
        }

        fn drain_staged(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.drain_fails {
                return Err(io::Error::from_raw_os_error(libc::EIO));
            }
            let n = buf.len().min(self.staged.len());
            for (slot, byte) in buf.iter_mut().zip(self.staged.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 13) as u8).collect()
    }

    fn small_chunks() -> TransferOptions {
        TransferOptions::new().with_chunk_size(ChunkSize::new(4096).unwrap())
    }

    #[test]
    fn test_zero_copy_path_delivers_everything() {
        let input = pattern(50_000);
        let mut channel = ScriptedChannel::new(input.clone());
        let report = TransferEngine::new(small_chunks())
            .transfer(&mut channel)
            .unwrap();

        assert_eq!(channel.output, input);
        assert_eq!(report.bytes_transferred, 50_000);
        assert_eq!(report.zerocopy_bytes, 50_000);
        assert_eq!(report.path, TransferPath::ZeroCopy);
        assert_eq!(report.completion, Completion::Complete);
    }

    #[test]
    fn test_push_capability_loss_drains_staged_bytes_in_order() {
        let input = pattern(50_000);
        let mut channel = ScriptedChannel::new(input.clone());
        // Fail in the middle of a chunk so part of it is still staged.
        channel.push_unsupported_after = Some(10_000);
        let report = TransferEngine::new(small_chunks())
            .transfer(&mut channel)
            .unwrap();

        assert_eq!(channel.output, input);
        assert_eq!(report.bytes_transferred, channel.output.len() as u64);
        assert_eq!(report.zerocopy_bytes, 10_000);
        assert_eq!(report.buffered_bytes, 40_000);
        assert_eq!(report.path, TransferPath::Mixed);
        assert!(channel.staged.is_empty());
    }

    #[test]
    fn test_pull_capability_loss_switches_without_gap() {
        let input = pattern(30_000);
        let mut channel = ScriptedChannel::new(input.clone());
        channel.pull_unsupported_after = Some(8192);
        let report = TransferEngine::new(small_chunks())
            .transfer(&mut channel)
            .unwrap();

        assert_eq!(channel.output, input);
        assert_eq!(report.zerocopy_bytes, 8192);
        assert_eq!(report.path, TransferPath::Mixed);
    }

    #[test]
    fn test_fallback_respects_remaining_budget() {
        let input = pattern(50_000);
        let mut channel = ScriptedChannel::new(input.clone());
        channel.push_unsupported_after = Some(6_000);
        let options = small_chunks().with_max_bytes(20_000);
        let report = TransferEngine::new(options).transfer(&mut channel).unwrap();

        assert_eq!(channel.output, &input[..20_000]);
        assert_eq!(report.bytes_transferred, 20_000);
        assert_eq!(channel.pos, 20_000);
    }

    #[test]
    fn test_failed_probe_uses_buffered_path() {
        let input = pattern(10_000);
        let mut channel = ScriptedChannel::new(input.clone());
        channel.probe_fails = true;
        let report = TransferEngine::new(small_chunks())
            .transfer(&mut channel)
            .unwrap();

        assert_eq!(channel.output, input);
        assert_eq!(channel.pulled, 0);
        assert_eq!(report.path, TransferPath::Buffered);
    }

    #[test]
    fn test_partial_pushes_are_not_end_of_stream() {
        let input = pattern(20_000);
        let mut channel = ScriptedChannel::new(input.clone());
        channel.cap = Some(7);
        let report = TransferEngine::new(small_chunks())
            .transfer(&mut channel)
            .unwrap();

        assert_eq!(channel.output, input);
        assert_eq!(report.bytes_transferred, 20_000);
    }

    #[test]
    fn test_zero_byte_push_is_fatal() {
        let mut channel = ScriptedChannel::new(pattern(100));
        channel.zero_push = true;
        let err = TransferEngine::new(small_chunks())
            .transfer(&mut channel)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write);
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_drain_failure_is_distinct() {
        let mut channel = ScriptedChannel::new(pattern(10_000));
        channel.push_unsupported_after = Some(100);
        channel.drain_fails = true;
        let err = TransferEngine::new(small_chunks())
            .transfer(&mut channel)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Drain);
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_strict_mode_boundary() {
        let options = small_chunks().with_max_bytes(100).strict(true);

        let mut short = ScriptedChannel::new(pattern(60));
        let report = TransferEngine::new(options).transfer(&mut short).unwrap();
        assert_eq!(report.completion, Completion::ExhaustedEarly);
        assert_eq!(report.bytes_transferred, 60);

        let mut exact = ScriptedChannel::new(pattern(100));
        let report = TransferEngine::new(options).transfer(&mut exact).unwrap();
        assert_eq!(report.completion, Completion::Complete);
        assert_eq!(report.bytes_transferred, 100);
    }

    #[test]
    fn test_disabled_zero_copy_never_pulls() {
        let input = pattern(10_000);
        let mut channel = ScriptedChannel::new(input.clone());
        let options = small_chunks().zero_copy(false);
        let report = TransferEngine::new(options).transfer(&mut channel).unwrap();
        assert_eq!(channel.output, input);
        assert_eq!(channel.pulled, 0);
        assert_eq!(report.zerocopy_bytes, 0);
    }

    #[test]
    fn test_silent_source_times_out_with_flushed_count() {
        struct Stalled(ScriptedChannel);

        impl StreamEndpoints for Stalled {
            fn source_fd(&self) -> RawFd {
                self.0.source_fd()
            }
            fn destination_fd(&self) -> RawFd {
                self.0.destination_fd()
            }
            fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
                // Data for the first pull only, then silence.
                Ok(self.0.pos == 0)
            }
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.0.read(buf)
            }
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.write(buf)
            }
        }

        impl ZeroCopyChannel for Stalled {
            fn pull(&mut self, len: usize) -> io::Result<usize> {
                let n = self.0.pull(len.min(1000))?;
                Ok(n)
            }
            fn push(&mut self, len: usize) -> io::Result<usize> {
                self.0.push(len)
            }
            fn drain_staged(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.0.drain_staged(buf)
            }
        }

        let mut channel = Stalled(ScriptedChannel::new(pattern(5_000)));
        let options = small_chunks().with_idle_timeout(IdleTimeout::from_secs(1).unwrap());
        let err = TransferEngine::new(options)
            .transfer(&mut channel)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Timeout {
                seconds: 1,
                delivered: 1000
            }
        ));
        assert_eq!(channel.0.output.len(), 1000);
    }

    #[cfg(feature = "async")]
    #[test]
    fn test_async_adapter_copies_owned_descriptors() {
        use std::io::{Read, Seek, SeekFrom, Write};

        let input = pattern(300_000);
        let mut source = tempfile::tempfile().unwrap();
        source.write_all(&input).unwrap();
        source.seek(SeekFrom::Start(0)).unwrap();
        let dest = tempfile::tempfile().unwrap();
        let mut check = dest.try_clone().unwrap();

        let report = tokio_test::block_on(
            TransferEngine::new(small_chunks()).transfer_owned_async(source.into(), dest.into()),
        )
        .unwrap();

        let mut output = Vec::new();
        check.seek(SeekFrom::Start(0)).unwrap();
        check.read_to_end(&mut output).unwrap();
        assert_eq!(report.bytes_transferred, 300_000);
        assert_eq!(output, input);
    }
}
