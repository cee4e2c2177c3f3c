use std::error::Error;
use std::fmt;

/// Custom error types for NumPy file operations
#[derive(Debug)]
pub enum NpyError {
    /// Wraps std::io::Error for file operations
    IoError(std::io::Error),
    /// Invalid format errors with a message
    InvalidFormat(String),
    /// Valid NumPy files this reader does not handle
    Unsupported(String),
}

/// Implements Display trait for NpyError for error reporting
impl fmt::Display for NpyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NpyError::IoError(e) => write!(f, "I/O error: {}", e),
            NpyError::InvalidFormat(msg) => write!(f, "Invalid NPY format: {}", msg),
            NpyError::Unsupported(msg) => write!(f, "Unsupported NPY file: {}", msg),
        }
    }
}

/// Implements Error trait to allow NpyError to be used as a standard error type
impl Error for NpyError {}

/// Allows automatic conversion from std::io::Error to NpyError
impl From<std::io::Error> for NpyError {
    fn from(err: std::io::Error) -> Self {
        NpyError::IoError(err)
    }
}
