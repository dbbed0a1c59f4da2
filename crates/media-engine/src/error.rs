// FILE: crates/media-engine/src/error.rs

use crate::events::EventKind;
use crate::handle::HandleKind;
use crate::media::ParseStatus;
use mediabridge_core::{ErrorSeverity, HandleId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),

    #[error("Engine context has been shut down")]
    Shutdown,

    #[error("Invalid handle: {0}")]
    InvalidHandle(HandleId),

    #[error("Event {kind} is not emitted by {handle} handles")]
    UnsupportedEvent { kind: EventKind, handle: HandleKind },

    #[error("Media parse ended with status {0}")]
    ParseFailed(ParseStatus),

    #[error("No discovery service named '{0}'")]
    DiscoveryNotFound(String),

    #[error("Completion gate already closed")]
    GateClosed,

    #[error("Invalid equalizer band index: {0}")]
    InvalidBand(usize),

    #[error("Invalid equalizer preset index: {0}")]
    InvalidPreset(usize),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Classifies the error for the embedding application.
    ///
    /// A missing renderer or a failed parse does not make the engine
    /// unusable; a dead context or released handle does.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InitFailed(_) | Self::Shutdown | Self::InvalidHandle(_) => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Recoverable,
        }
    }

    /// Returns true if retrying or correcting inputs can succeed
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
