//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_missing_argument_display() {
    let err = Error::MissingArgument("geometry");
    assert_eq!(format!("{}", err), "Missing argument: geometry is mandatory");
}

#[test]
fn test_invalid_argument_display() {
    let err = Error::InvalidArgument("capacity must be positive".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid argument"));
    assert!(display.contains("capacity must be positive"));
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("Geometry has no bounding sphere".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("Geometry has no bounding sphere"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("octree build failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("octree build failed"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::MissingArgument("material");
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug1 = format!("{:?}", Error::MissingArgument("geometry"));
    assert!(debug1.contains("MissingArgument"));

    let debug2 = format!("{:?}", Error::InvalidArgument("x".to_string()));
    assert!(debug2.contains("InvalidArgument"));

    let debug3 = format!("{:?}", Error::InvalidResource("x".to_string()));
    assert!(debug3.contains("InvalidResource"));
}

#[test]
fn test_error_clone() {
    let err1 = Error::InvalidArgument("test".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

// ============================================================================
// MACROS
// ============================================================================

fn failing_with_bail(capacity: u32) -> Result<u32> {
    if capacity == 0 {
        crate::engine_bail!("galaxy3d::test", "capacity {} must be positive", capacity);
    }
    Ok(capacity)
}

#[test]
fn test_engine_bail_returns_invalid_argument() {
    match failing_with_bail(0) {
        Err(Error::InvalidArgument(msg)) => assert_eq!(msg, "capacity 0 must be positive"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(failing_with_bail(3).unwrap(), 3);
}

#[test]
fn test_engine_err_builds_error() {
    let err = crate::engine_err!("galaxy3d::test", "bad item size {}", 0);
    assert!(matches!(err, Error::InvalidArgument(ref m) if m == "bad item size 0"));
}
