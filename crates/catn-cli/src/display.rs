//! Human-readable transfer summaries on stderr

use catn_types::{Completion, TransferPath, TransferReport};
use console::style;
use std::io::{self, Write};
use std::time::Duration;

/// Print the transfer summary requested with `--stats`
pub fn print_report(report: &TransferReport) {
    eprintln!();
    eprintln!("{}", style("Transfer Statistics:").bold().underlined().for_stderr());
    eprintln!(
        "  Bytes delivered: {}",
        style(format_bytes(report.bytes_transferred)).green().for_stderr()
    );
    eprintln!(
        "  Path: {}",
        style(path_description(report.path)).cyan().for_stderr()
    );
    eprintln!(
        "  Zero-copy bytes: {}",
        style(format_bytes(report.zerocopy_bytes)).cyan().for_stderr()
    );
    eprintln!(
        "  Read/write bytes: {}",
        style(format_bytes(report.buffered_bytes)).cyan().for_stderr()
    );
    eprintln!(
        "  Zero-copy efficiency: {:.1}%",
        style(report.zerocopy_efficiency() * 100.0).cyan().for_stderr()
    );
    eprintln!(
        "  Duration: {}",
        style(format_duration(report.duration)).blue().for_stderr()
    );
    eprintln!(
        "  Transfer rate: {}",
        style(format!("{:.2} MB/s", report.transfer_rate() / 1024.0 / 1024.0))
            .blue()
            .for_stderr()
    );

    match report.completion {
        Completion::Complete => eprintln!(
            "  Result: {}",
            style("complete").green().bold().for_stderr()
        ),
        Completion::ExhaustedEarly => eprintln!(
            "  Result: {}",
            style("input ended before the requested length")
                .yellow()
                .bold()
                .for_stderr()
        ),
    }
}

fn path_description(path: TransferPath) -> &'static str {
    match path {
        TransferPath::ZeroCopy => "splice",
        TransferPath::Buffered => "read/write",
        TransferPath::Mixed => "splice, then read/write",
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    // stderr is the only place left to complain to.
    let _ = write_error(&mut io::stderr(), message);
}

/// Write one `catn0: <message>` line, styled for stderr
pub fn write_error<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(
        out,
        "{} {}",
        style("catn0:").red().bold().for_stderr(),
        style(message).red().for_stderr()
    )
}
