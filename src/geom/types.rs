use std::error::Error;
use std::fmt;

/// Custom error types for geometry operations
#[derive(Debug)]
pub enum GeomError {
    /// Not enough input points or distances for the operation
    InsufficientInput(String),
    /// Distances or coordinates that are NaN, infinite or negative
    InvalidDistance(String),
    /// The normal-equation matrix of a regression could not be inverted
    SingularMatrix(String),
}

/// Implements Display trait for GeomError for error reporting
impl fmt::Display for GeomError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeomError::InsufficientInput(msg) => write!(f, "Insufficient input: {}", msg),
            GeomError::InvalidDistance(msg) => write!(f, "Invalid distance: {}", msg),
            GeomError::SingularMatrix(msg) => write!(f, "Singular matrix: {}", msg),
        }
    }
}

/// Implements Error trait to allow GeomError to be used as a standard error type
impl Error for GeomError {}
