//! JSON output structures for the catn0 CLI

use catn_types::{Error, TransferPath, TransferReport, EXIT_SUCCESS};
use serde::{Deserialize, Serialize};

/// Complete JSON output for one run
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResultJson {
    /// catn version
    pub version: String,
    /// Process exit status
    pub exit_code: u8,
    /// Whether the transfer completed
    pub success: bool,
    /// Result message
    pub message: String,
    /// Transfer statistics, absent when the transfer failed
    pub stats: Option<TransferStatsJson>,
}

/// Transfer statistics in JSON format
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferStatsJson {
    /// Bytes confirmed written to the destination
    pub bytes_transferred: u64,
    /// Bytes moved by splice
    pub zerocopy_bytes: u64,
    /// Bytes moved by read/write, including drained kernel buffer contents
    pub buffered_bytes: u64,
    /// Path taken
    pub path: PathJson,
    /// Whether the transfer downgraded mid-stream
    pub fell_back: bool,
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Actual transfer rate in MB/s
    pub transfer_rate_mbps: f64,
    /// Zero-copy efficiency percentage
    pub zerocopy_efficiency_percent: f64,
}

/// Transfer path in JSON format
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathJson {
    /// splice only
    Zerocopy,
    /// read/write only
    Buffered,
    /// splice, then read/write
    Mixed,
}

impl From<TransferPath> for PathJson {
    fn from(path: TransferPath) -> Self {
        match path {
            TransferPath::ZeroCopy => PathJson::Zerocopy,
            TransferPath::Buffered => PathJson::Buffered,
            TransferPath::Mixed => PathJson::Mixed,
        }
    }
}

impl TransferResultJson {
    /// Build the output for a transfer that ran to the end of its input or limit
    pub fn from_report(report: &TransferReport) -> Self {
        let exit_code = report.completion.exit_code();
        let message = if report.completion.is_complete() {
            format!("transferred {} bytes", report.bytes_transferred)
        } else {
            format!(
                "input ended after {} bytes, before the requested length",
                report.bytes_transferred
            )
        };

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exit_code,
            success: exit_code == EXIT_SUCCESS,
            message,
            stats: Some(TransferStatsJson::from_report(report)),
        }
    }

    /// Build the output for a failed run
    pub fn from_error(error: &Error) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exit_code: error.exit_code(),
            success: false,
            message: error.to_string(),
            stats: None,
        }
    }
}

impl TransferStatsJson {
    /// Create TransferStatsJson from a TransferReport
    pub fn from_report(report: &TransferReport) -> Self {
        Self {
            bytes_transferred: report.bytes_transferred,
            zerocopy_bytes: report.zerocopy_bytes,
            buffered_bytes: report.buffered_bytes,
            path: report.path.into(),
            fell_back: report.fell_back(),
            duration_seconds: report.duration.as_secs_f64(),
            transfer_rate_mbps: report.transfer_rate() / 1024.0 / 1024.0,
            zerocopy_efficiency_percent: report.zerocopy_efficiency() * 100.0,
        }
    }
}

/// Write `output` to stderr as pretty JSON
pub fn print(output: &TransferResultJson) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => eprintln!("{}", json),
        Err(e) => tracing::error!("failed to serialize JSON output: {}", e),
    }
}
