//! Handle registry
//!
//! Every engine resource is registered here at creation and removed exactly
//! once at release. Operations on unregistered handles fail with
//! `InvalidHandle`, which is what makes double-release and use-after-release
//! detectable instead of undefined.

use crate::error::{EngineError, EngineResult};
use mediabridge_core::HandleId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The type of resource behind a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Media,
    Player,
    ListPlayer,
    MediaList,
    RendererDiscoverer,
    MediaDiscoverer,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Media => write!(f, "media"),
            Self::Player => write!(f, "player"),
            Self::ListPlayer => write!(f, "list player"),
            Self::MediaList => write!(f, "media list"),
            Self::RendererDiscoverer => write!(f, "renderer discoverer"),
            Self::MediaDiscoverer => write!(f, "media discoverer"),
        }
    }
}

/// Live handles of one engine context
#[derive(Debug, Default)]
pub struct HandleTable {
    entries: HashMap<HandleId, HandleKind>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new resource and returns its handle id
    pub fn register(&mut self, kind: HandleKind) -> HandleId {
        let id = HandleId::new();
        self.entries.insert(id, kind);
        id
    }

    /// Fails with `InvalidHandle` if the handle has been released
    pub fn ensure(&self, id: HandleId) -> EngineResult<HandleKind> {
        self.entries
            .get(&id)
            .copied()
            .ok_or(EngineError::InvalidHandle(id))
    }

    /// Removes the handle. The second removal reports `InvalidHandle`.
    pub fn release(&mut self, id: HandleId) -> EngineResult<HandleKind> {
        self.entries
            .remove(&id)
            .ok_or(EngineError::InvalidHandle(id))
    }

    /// Removes the handle if still present. Used by resource drops.
    pub fn release_quiet(&mut self, id: HandleId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Called during engine teardown.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_ensure() {
        let mut table = HandleTable::new();
        let id = table.register(HandleKind::Media);
        assert_eq!(table.ensure(id).unwrap(), HandleKind::Media);
    }

    #[test]
    fn test_double_release_detected() {
        let mut table = HandleTable::new();
        let id = table.register(HandleKind::Player);
        assert!(table.release(id).is_ok());
        match table.release(id) {
            Err(EngineError::InvalidHandle(bad)) => assert_eq!(bad, id),
            other => panic!("expected InvalidHandle, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_after_release_fails() {
        let mut table = HandleTable::new();
        let id = table.register(HandleKind::MediaList);
        table.release(id).unwrap();
        assert!(table.ensure(id).is_err());
    }

    #[test]
    fn test_release_quiet_is_idempotent() {
        let mut table = HandleTable::new();
        let id = table.register(HandleKind::Media);
        assert!(table.release_quiet(id));
        assert!(!table.release_quiet(id));
    }
}
