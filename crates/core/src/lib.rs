pub mod ids;
pub mod rational;
pub mod severity;

// Re-export commonly used types
pub use ids::{HandleId, RegistrationId};
pub use rational::Rational;
pub use severity::ErrorSeverity;
