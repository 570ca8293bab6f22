//! A line-oriented macro preprocessor in the spirit of the C preprocessor.
//!
//! Input is processed line by line. Each line is scanned against an ordered
//! registry of patterns: built-in directives (`#define`, `#undef`, `#if`,
//! `#ifdef`, `#else`, `#endif`, `#include`, `#command`) plus every macro
//! defined so far. The earliest match on the line wins, the line is rewritten
//! or consumed, and a rewritten line is scanned again until nothing matches.
//! Lines that survive are written to the output unless a false conditional
//! branch suppresses them.
//!
//! Macros come in three forms: existence-only (`#define NAME`), object-like
//! (`#define NAME value`) and function-like (`#define NAME(a, b) body`, with
//! a trailing `...` accepting a variadic tail). `#command` pipes a block of
//! lines through an external program and splices its output back into the
//! input. `#include` recursively processes another file in place, sharing
//! macro definitions and conditional state with the includer.
//!
//! # Example
//!
//! ```
//! use textpp::{PreprocessorConfig, preprocess_str};
//!
//! let config = PreprocessorConfig::new().with_define("FEATURE");
//! let output = preprocess_str("#ifdef FEATURE\non\n#else\noff\n#endif\n", &config).unwrap();
//! assert_eq!(output, "on\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

mod buffer;
mod command;
mod cond;
mod config;
mod engine;
mod error;
mod expr;
mod funcmacro;
mod registry;
mod token;

use std::path::Path;

pub use config::{IncludeContext, IncludeResolver, PreprocessorConfig, WarningHandler};
pub use engine::Preprocessor;
pub use error::PreprocessError;

/// Preprocess `input` with the given configuration and return the output as
/// a string. Inside the input the current file name is `<input>`.
pub fn preprocess_str(input: &str, config: &PreprocessorConfig) -> Result<String, PreprocessError> {
    let mut out = Vec::new();
    let mut pp = Preprocessor::from_config(config);
    pp.process_str("<input>", input, &mut out)?;
    String::from_utf8(out).map_err(|err| PreprocessError::Other(err.to_string()))
}

/// Preprocess the file at `path` with the given configuration and return the
/// output as a string.
pub fn preprocess_file<P: AsRef<Path>>(
    path: P,
    config: &PreprocessorConfig,
) -> Result<String, PreprocessError> {
    let mut out = Vec::new();
    let mut pp = Preprocessor::from_config(config);
    pp.process_file(path, &mut out)?;
    String::from_utf8(out).map_err(|err| PreprocessError::Other(err.to_string()))
}
