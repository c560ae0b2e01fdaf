//! Unified test utilities for catn benchmarks and tests
//!
//! Data generation, scratch files, pipes with helper threads on the far end and
//! blake3 hashing for comparing what went in with what came out.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::thread::JoinHandle;

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros
    Zeros,
    /// Deterministic pseudo-random bytes
    Random,
    /// Realistic file pattern with some structure
    Realistic,
}

/// Generate test data with specified pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Random => {
            // xorshift, reproducible across runs
            let mut state = 0x2545_f491_4f6c_dd1d_u64;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state >> 24) as u8
                })
                .collect()
        }
        TestDataPattern::Realistic => (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect(),
    }
}

/// Anonymous scratch file holding `data`, positioned at the start
pub fn source_file(data: &[u8]) -> io::Result<File> {
    let mut file = tempfile::tempfile()?;
    file.write_all(data)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

/// Empty anonymous scratch file
pub fn empty_file() -> io::Result<File> {
    tempfile::tempfile()
}

/// Whole contents of `file`, read from the start
pub fn read_back(file: &mut File) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut data)?;
    Ok(data)
}

/// blake3 digest of `data`
pub fn hash(data: &[u8]) -> blake3::Hash {
    blake3::hash(data)
}

/// blake3 digest of the whole contents of `file`
pub fn hash_file(file: &mut File) -> io::Result<blake3::Hash> {
    Ok(hash(&read_back(file)?))
}

/// Anonymous pipe as `(read_end, write_end)`
pub fn pipe() -> io::Result<(File, File)> {
    let (read_end, write_end) = nix::unistd::pipe().map_err(io::Error::from)?;
    Ok((File::from(read_end), File::from(write_end)))
}

/// Write `data` into `write_end` on another thread, then close it
pub fn spawn_writer(mut write_end: File, data: Vec<u8>) -> JoinHandle<io::Result<()>> {
    std::thread::spawn(move || write_end.write_all(&data))
}

/// Collect everything from `read_end` on another thread until end of input
pub fn spawn_reader(mut read_end: File) -> JoinHandle<io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut data = Vec::new();
        read_end.read_to_end(&mut data)?;
        Ok(data)
    })
}

/// Common transfer sizes for tests and benchmarks
pub struct CommonFileSizes;

impl CommonFileSizes {
    /// 1KB, well under one chunk
    pub const TINY: usize = 1024;
    /// 64KB, exactly one pipe's default capacity
    pub const MEDIUM: usize = 64 * 1024;
    /// 1MB, several default chunks
    pub const LARGE: usize = 1024 * 1024;
    /// 16MB
    pub const XLARGE: usize = 16 * 1024 * 1024;

    /// Sizes for benchmarks
    pub fn performance() -> Vec<(&'static str, usize)> {
        vec![
            ("64KB", Self::MEDIUM),
            ("1MB", Self::LARGE),
            ("16MB", Self::XLARGE),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_test_data_patterns() {
        let zeros = generate_test_data(1024, TestDataPattern::Zeros);
        assert_eq!(zeros.len(), 1024);
        assert!(zeros.iter().all(|&b| b == 0));

        let random = generate_test_data(1024, TestDataPattern::Random);
        assert_eq!(random, generate_test_data(1024, TestDataPattern::Random));
        assert!(random.iter().any(|&b| b != random[0]));

        let realistic = generate_test_data(1024, TestDataPattern::Realistic);
        assert_eq!(realistic[0], 13);
    }

    #[test]
    fn test_pipe_helpers() {
        let (read_end, write_end) = pipe().unwrap();
        let writer = spawn_writer(write_end, b"through the pipe".to_vec());
        let reader = spawn_reader(read_end);
        writer.join().unwrap().unwrap();
        assert_eq!(reader.join().unwrap().unwrap(), b"through the pipe");
    }

    #[test]
    fn test_source_file_round_trip() {
        let data = generate_test_data(5000, TestDataPattern::Random);
        let mut file = source_file(&data).unwrap();
        assert_eq!(hash_file(&mut file).unwrap(), hash(&data));
    }
}
