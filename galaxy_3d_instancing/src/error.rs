//! Error types for the Galaxy3D instancing crate
//!
//! Construction of an instanced mesh is the only recoverable error path.
//! Partition and culling operations assume well-formed input.

use std::fmt;

/// Result type for Galaxy3D instancing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D instancing errors
#[derive(Debug, Clone)]
pub enum Error {
    /// A mandatory construction argument was not provided
    MissingArgument(&'static str),

    /// A construction argument was provided but is unusable
    InvalidArgument(String),

    /// Invalid resource (geometry without bounds, etc.)
    InvalidResource(String),

    /// Initialization failed (spatial index, buffers)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingArgument(name) => write!(f, "Missing argument: {} is mandatory", name),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Build an `Error::InvalidArgument`, logging it with file:line first.
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("galaxy3d::InstancedMesh", "capacity {} is too large", capacity);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::InvalidArgument(message)
    }};
}

/// Log and return an `Error::InvalidArgument` from the current function.
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
