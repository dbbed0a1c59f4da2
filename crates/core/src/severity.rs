//! Error severity classification
//!
//! The original example programs treated every failure as fatal-and-exit.
//! A library cannot make that call for its embedder, so every engine error
//! carries a severity instead:
//! - **Recoverable**: retrying or changing inputs can succeed (parse failure,
//!   missing discovery service, invalid band index)
//! - **Fatal**: the context or handle is gone and will not come back

use std::fmt;

/// How serious an error is for the surrounding application
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// The operation can be retried or corrected
    Recoverable,
    /// The resource or context is unusable
    Fatal,
}

impl ErrorSeverity {
    /// Returns true for recoverable errors
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}
