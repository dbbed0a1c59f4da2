//! Identifier types shared across the engine surface

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of an engine resource (media, player, discoverer, ...)
///
/// A handle id stays unique for the lifetime of the process, so a released
/// handle can never be confused with a newly created one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Creates a fresh handle id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying uuid
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one event registration on one handle
///
/// Returned by attach and consumed by detach. Detaching transfers ownership
/// of the id back to the event manager, which is how double-detach is kept
/// out of caller code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(u64);

impl RegistrationId {
    /// Creates a registration id from its raw counter value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg-{}", self.0)
    }
}
