#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # textpp CLI
//!
//! A command-line interface for the textpp macro preprocessor library.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use textpp::{PreprocessError, Preprocessor, PreprocessorConfig};

/// Exit codes for different error conditions
mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const IO_ERROR: i32 = 2;
    pub const PREPROCESS_ERROR: i32 = 3;
}

/// Command-line interface for the textpp macro preprocessor
#[derive(Parser)]
#[command(
    name = "textpp",
    version,
    author,
    about = "A general-purpose text macro preprocessor",
    long_about = "textpp processes text files line by line, expanding macros and \
                  honoring #define, #undef, #if/#ifdef/#else/#endif, #include and \
                  #command directives. Multiple input files share one macro state \
                  and are written to the output in order.",
    after_help = "EXAMPLES:
  # Preprocess a single file to stdout
  $ textpp input.txt

  # Preprocess several files into one output file
  $ textpp header.txt body.txt -o out.txt

  # Pre-define names for conditional sections
  $ textpp -D DEBUG -D LINUX input.txt

  # Trace every expansion step
  $ TEXTPP_DEBUG=1 textpp input.txt"
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Input files, processed in order with shared macro state
    #[arg(required = true, help = "Input files to preprocess, in order")]
    files: Vec<PathBuf>,

    /// Pre-define a name before processing begins
    #[arg(
        short = 'D',
        long = "define",
        value_name = "NAME",
        help = "Pre-define NAME as an existence-only macro"
    )]
    defines: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, help = "Output file (default: stdout)")]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long, help = "Enable verbose diagnostic output")]
    verbose: bool,

    /// Suppress warnings
    #[arg(short = 'q', long, help = "Suppress preprocessing warnings (quiet mode)")]
    quiet: bool,

    /// Output the result in JSON format
    #[arg(long, help = "Output the preprocessing result in JSON format")]
    #[cfg(feature = "json")]
    json: bool,

    /// Disable colored output
    #[arg(long, help = "Disable colored output")]
    no_color: bool,
}

/// Main application entry point
fn main() {
    std::process::exit(match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            determine_exit_code(&e)
        }
    });
}

/// Determine the appropriate exit code based on the error
fn determine_exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<std::io::Error>().is_some() {
        exit_code::IO_ERROR
    } else if let Some(err) = error.downcast_ref::<PreprocessError>() {
        preprocess_exit_code(err)
    } else {
        exit_code::GENERAL_ERROR
    }
}

fn preprocess_exit_code(error: &PreprocessError) -> i32 {
    match error {
        PreprocessError::FileNotFound(_) | PreprocessError::Io(_) => exit_code::IO_ERROR,
        PreprocessError::Other(_) => exit_code::PREPROCESS_ERROR,
    }
}

/// Run the main application logic
fn run() -> Result<i32> {
    let cli = Cli::parse();

    init_logging(&cli)?;
    if cli.no_color || !atty::is(atty::Stream::Stderr) {
        colored::control::set_override(false);
    }

    let config = create_config(&cli);
    let mut pp = Preprocessor::from_config(&config);

    // one output buffer across all inputs, flushed at the end
    let mut buffer: Vec<u8> = Vec::new();
    let mut worst = exit_code::SUCCESS;

    for path in &cli.files {
        log::info!("preprocessing {}", path.display());
        if let Err(e) = pp.process_file(path, &mut buffer) {
            eprintln!("{} {e}", "error:".red().bold());
            worst = worst.max(preprocess_exit_code(&e));
        }
    }

    if cli.verbose && !cli.quiet {
        eprintln!(
            "{} {} file(s), {} output line(s)",
            "processed".green(),
            cli.files.len(),
            pp.output_lines()
        );
    }

    write_output(&cli, &buffer, worst == exit_code::SUCCESS)?;
    Ok(worst)
}

/// Initialize logging: `TEXTPP_DEBUG` in the environment traces every
/// expansion step, `-v` enables debug output, everything else stays at
/// warnings.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if std::env::var_os("TEXTPP_DEBUG").is_some() {
        log::LevelFilter::Trace
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logging")
}

/// Create preprocessor configuration from CLI arguments
fn create_config(cli: &Cli) -> PreprocessorConfig {
    let mut config = PreprocessorConfig::new();
    for name in &cli.defines {
        config = config.with_define(name.clone());
    }

    if !cli.quiet {
        config = config.with_warning_handler(|message: &str| {
            eprintln!("{} {message}", "warning:".yellow().bold());
        });
    }

    config
}

/// Write output to file or stdout
fn write_output(cli: &Cli, buffer: &[u8], success: bool) -> Result<()> {
    let content = String::from_utf8_lossy(buffer);

    #[cfg(feature = "json")]
    if cli.json {
        return write_json_output(cli, &content, success);
    }
    #[cfg(not(feature = "json"))]
    let _ = success;

    match &cli.output {
        Some(path) => std::fs::write(path, content.as_bytes())
            .with_context(|| format!("Failed to write to output file: {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Write JSON output
#[cfg(feature = "json")]
fn write_json_output(cli: &Cli, content: &str, success: bool) -> Result<()> {
    use serde_json::json;

    let result = json!({
        "success": success,
        "files": cli.files.iter().map(|p| p.to_string_lossy().to_string()).collect::<Vec<_>>(),
        "output_file": cli.output.as_ref().map(|p| p.to_string_lossy().to_string()),
        "output": content,
    });

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
