use std::fmt;

/// Errors that can occur during preprocessing
#[derive(Debug)]
pub enum PreprocessError {
    /// Source or include file could not be read
    FileNotFound(String),
    /// I/O error while reading input or writing output
    Io(std::io::Error),
    /// Other preprocessing error
    Other(String),
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::FileNotFound(s) => write!(f, "file [{s}] was not found"),
            PreprocessError::Io(err) => write!(f, "I/O error: {err}"),
            PreprocessError::Other(s) => write!(f, "error: {s}"),
        }
    }
}

impl std::error::Error for PreprocessError {}

impl From<std::io::Error> for PreprocessError {
    fn from(err: std::io::Error) -> Self {
        PreprocessError::Io(err)
    }
}
