//! catn0 - copy stdin to stdout through the kernel
//!
//! Moves bytes with splice(2) where the descriptors allow it and falls back to
//! read/write where they don't, with an optional byte limit, strict completion
//! and idle timeout. Positional arguments match the classic `catn0` tool:
//!
//! ```text
//! catn0 [MAX_BYTES] [STRICT] [TIMEOUT_SECS]
//! ```
//!
//! stdout carries the data stream, so every diagnostic goes to stderr.

mod display;
mod json_output;

use anyhow::Result;
use catn_config::{CatnConfig, ConfigLoader};
use catn_types::{
    BufferSize, ChunkSize, Error, IdleTimeout, TransferOptions, TransferReport, EXIT_CONFIG,
    EXIT_SUCCESS,
};
use catn_zerocopy::TransferEngine;
use clap::Parser;
use std::io::Write;
use std::os::fd::AsFd;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// catn0 - zero-copy stdin to stdout copier
#[derive(Parser, Debug)]
#[command(
    name = "catn0",
    version = env!("CARGO_PKG_VERSION"),
    about = "Copy stdin to stdout with splice(2), falling back to read/write",
    long_about = "Copies stdin to stdout, through a kernel pipe with splice(2) when both\n\
                  descriptors support it and with plain read/write otherwise.\n\n\
                  Exit status: 0 complete, 1 bad arguments or configuration, 2 input ended\n\
                  early in strict mode, 3 idle timeout, 4 read error, 5 write error,\n\
                  6 kernel buffer allocation failed, 7 kernel buffer drain failed."
)]
struct Cli {
    /// Stop after this many bytes (decimal, 0x hex or leading-0 octal); 0 = no limit
    #[arg(value_name = "MAX_BYTES")]
    max_bytes: Option<String>,

    /// Exit with status 2 if input ends before MAX_BYTES; on if the value starts with '1'
    #[arg(value_name = "STRICT")]
    strict: Option<String>,

    /// Abort if no data arrives for this many seconds; 0 = never
    #[arg(value_name = "TIMEOUT_SECS")]
    timeout: Option<String>,

    /// Always use read/write, never splice
    #[arg(long)]
    no_zero_copy: bool,

    /// Largest single splice request in bytes
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<String>,

    /// Read/write buffer size in bytes
    #[arg(long, value_name = "BYTES")]
    buffer_size: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - errors only
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Print a transfer summary on stderr
    #[arg(long)]
    stats: bool,

    /// Print the transfer report as JSON on stderr
    #[arg(long, conflicts_with = "stats")]
    json: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_CONFIG } else { EXIT_SUCCESS };
            // Printing help or a usage error can only fail if stderr is gone.
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(&cli, &Error::from(e)),
    };

    if let Err(e) = init_logging(&cli, &config) {
        display::display_error(&format!("failed to initialize logging: {}", e));
        return ExitCode::from(EXIT_CONFIG);
    }

    let options = match build_options(&cli, &config) {
        Ok(options) => options,
        Err(e) => return fail(&cli, &e),
    };
    debug!("{:?}", options);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match TransferEngine::new(options).transfer_fds(stdin.as_fd(), stdout.as_fd()) {
        Ok(report) => succeed(&cli, &report),
        Err(e) => fail(&cli, &e),
    }
}

fn succeed(cli: &Cli, report: &TransferReport) -> ExitCode {
    let code = report.completion.exit_code();
    if cli.json {
        json_output::print(&json_output::TransferResultJson::from_report(report));
    } else if cli.stats {
        display::print_report(report);
    }
    ExitCode::from(code)
}

fn fail(cli: &Cli, error: &Error) -> ExitCode {
    // Nothing is left to report to if stderr itself is gone.
    let _ = write_failure(cli, error, &mut std::io::stderr());
    ExitCode::from(error.exit_code())
}

/// The single diagnostic for a fatal error: the JSON document or one `catn0:` line
fn write_failure<W: Write>(cli: &Cli, error: &Error, out: &mut W) -> std::io::Result<()> {
    if cli.json {
        let output = json_output::TransferResultJson::from_error(error);
        writeln!(out, "{}", serde_json::to_string_pretty(&output)?)
    } else {
        display::write_error(out, &error.to_string())
    }
}

/// Escape codes only go to a terminal, whatever the configuration asks for
fn ansi_enabled(colored_output: bool, stderr_is_term: bool) -> bool {
    colored_output && stderr_is_term
}

fn init_logging(cli: &Cli, config: &CatnConfig) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(ansi_enabled(
            config.logging.colored_output,
            console::Term::stderr().is_term(),
        ));

    if config.logging.json_format {
        builder.json().try_init().map_err(|e| anyhow::anyhow!("{}", e))?;
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    Ok(())
}

/// Merge command-line values over the loaded configuration
fn build_options(cli: &Cli, config: &CatnConfig) -> catn_types::Result<TransferOptions> {
    let mut options = config.transfer;

    if let Some(arg) = &cli.max_bytes {
        options.max_bytes = parse_number(arg, 1, "max-length")?;
    }
    if let Some(arg) = &cli.strict {
        options.strict = arg.starts_with('1');
    }
    if let Some(arg) = &cli.timeout {
        let seconds = parse_number(arg, 3, "timeout-sec")?;
        options.idle_timeout = IdleTimeout::from_secs(seconds)?;
    }
    if cli.no_zero_copy {
        options.zero_copy = false;
    }
    if let Some(arg) = &cli.chunk_size {
        let size = parse_number(arg, 0, "chunk-size")?;
        options.chunk_size = ChunkSize::new(to_usize(size)?)?;
    }
    if let Some(arg) = &cli.buffer_size {
        let size = parse_number(arg, 0, "buffer-size")?;
        options.buffer_size = BufferSize::new(to_usize(size)?)?;
    }

    Ok(options)
}

fn to_usize(value: u64) -> catn_types::Result<usize> {
    usize::try_from(value).map_err(|_| Error::config(format!("{} does not fit in memory", value)))
}

/// Parse an unsigned integer the way `strtoull(s, &end, 0)` does, whole string only
///
/// `0x`/`0X` selects hex, a leading `0` selects octal, anything else is decimal.
/// Whitespace, signs and trailing characters are rejected. `position` is the
/// argument index used in the message, 0 for named options.
fn parse_number(arg: &str, position: usize, name: &str) -> catn_types::Result<u64> {
    let bad = || {
        if position > 0 {
            Error::config(format!(
                "arg {} - wanted unsigned {} but got '{}'",
                position, name, arg
            ))
        } else {
            Error::config(format!("--{} wanted unsigned integer but got '{}'", name, arg))
        }
    };

    let (digits, radix) = if let Some(hex) = arg
        .strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
    {
        (hex, 16)
    } else if arg.len() > 1 && arg.starts_with('0') {
        (&arg[1..], 8)
    } else {
        (arg, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(bad());
    }

    u64::from_str_radix(digits, radix).map_err(|_| {
        Error::config(format!(
            "{} '{}' out of range - max allowed is {}",
            name,
            arg,
            u64::MAX
        ))
    })
}
