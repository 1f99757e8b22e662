//! End-to-end solves on hand-built problems.

pub mod conic;

use crate::{E, Settings};

/// The settings every scenario runs with unless it overrides a field.
pub(crate) fn test_settings() -> Settings {
    Settings {
        eps: 1e-4,
        verbose: false,
        ..Settings::default()
    }
}

pub(crate) fn assert_close(actual: &[E], expected: &[E], tol: E) {
    assert_eq!(actual.len(), expected.len());
    for (a, b) in actual.iter().zip(expected) {
        assert!(
            (a - b).abs() <= tol,
            "expected {expected:?}, got {actual:?}"
        );
    }
}
