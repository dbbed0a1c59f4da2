//! Media handles and the parse flow
//!
//! A media is an unresolved location until it is parsed. Parsing runs the
//! context's track source over the location, records duration, metadata and
//! track records, and emits `MediaParsedChanged` with the final status.

use crate::context::{Engine, EngineShared, EventManager, ResourceCore};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventKind, EventPayload};
use crate::handle::HandleKind;
use crate::tracks::{MediaTrack, ProbeOutcome, ProbeReport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "rtsp", "rtp", "mms", "ftp", "file", "udp"];

/// Where a media's bytes live
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaLocation {
    Path(PathBuf),
    Url(String),
}

impl fmt::Display for MediaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Metadata fields a media can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaMeta {
    Title,
    Artist,
    Album,
    Genre,
    Date,
    Description,
}

/// Terminal and intermediate states of the parse flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseStatus {
    Unstarted,
    Pending,
    Skipped,
    Failed,
    Done,
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unstarted => "unstarted",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// What the parse is allowed to touch
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Probe local files
    pub parse_local: bool,
    /// Probe network locations
    pub parse_network: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            parse_local: true,
            parse_network: false,
        }
    }
}

struct MediaState {
    location: MediaLocation,
    status: ParseStatus,
    duration: Option<Duration>,
    meta: HashMap<MediaMeta, String>,
    tracks: Vec<MediaTrack>,
}

/// A media handle. Clones share the same underlying resource.
#[derive(Clone)]
pub struct Media {
    core: Arc<ResourceCore>,
    state: Arc<Mutex<MediaState>>,
}

impl Media {
    /// Creates a media from a local file path. The file must exist.
    pub fn from_path(engine: &Engine, path: impl AsRef<Path>) -> EngineResult<Self> {
        Self::from_path_shared(engine.shared(), path.as_ref())
    }

    /// Creates a media from a URL with a supported scheme.
    pub fn from_url(engine: &Engine, url: impl Into<String>) -> EngineResult<Self> {
        Self::from_url_shared(engine.shared(), url.into())
    }

    pub(crate) fn from_path_shared(shared: &Arc<EngineShared>, path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Err(EngineError::FileNotFound(path.to_path_buf()));
        }
        Self::register(shared, MediaLocation::Path(path.to_path_buf()))
    }

    pub(crate) fn from_url_shared(shared: &Arc<EngineShared>, url: String) -> EngineResult<Self> {
        let scheme = url.split("://").next().unwrap_or("");
        if !SUPPORTED_SCHEMES.contains(&scheme) || !url.contains("://") {
            return Err(EngineError::UnsupportedScheme(url));
        }
        Self::register(shared, MediaLocation::Url(url))
    }

    pub(crate) fn register(
        shared: &Arc<EngineShared>,
        location: MediaLocation,
    ) -> EngineResult<Self> {
        let core = ResourceCore::register(shared, HandleKind::Media)?;
        Ok(Self {
            core,
            state: Arc::new(Mutex::new(MediaState {
                location,
                status: ParseStatus::Unstarted,
                duration: None,
                meta: HashMap::new(),
                tracks: Vec::new(),
            })),
        })
    }

    /// The media's location string
    pub fn location(&self) -> EngineResult<String> {
        self.core.ensure()?;
        Ok(self.lock_state().location.to_string())
    }

    /// A metadata field, available after a successful parse
    pub fn meta(&self, key: MediaMeta) -> EngineResult<Option<String>> {
        self.core.ensure()?;
        Ok(self.lock_state().meta.get(&key).cloned())
    }

    /// Media duration, available after a successful parse
    pub fn duration(&self) -> EngineResult<Option<Duration>> {
        self.core.ensure()?;
        Ok(self.lock_state().duration)
    }

    pub fn parse_status(&self) -> EngineResult<ParseStatus> {
        self.core.ensure()?;
        Ok(self.lock_state().status)
    }

    /// Synchronous parse with default options (local only)
    pub fn parse(&self) -> EngineResult<ParseStatus> {
        self.parse_with_options(ParseOptions::default())
    }

    /// Synchronous parse
    pub fn parse_with_options(&self, options: ParseOptions) -> EngineResult<ParseStatus> {
        self.core.ensure()?;
        self.lock_state().status = ParseStatus::Pending;
        let status = self.run_probe(options);
        Ok(status)
    }

    /// Asynchronous parse. The result arrives as a `MediaParsedChanged`
    /// event carrying the final status; `parse_status` reflects it as well.
    pub fn parse_async(&self, options: ParseOptions) -> EngineResult<()> {
        self.core.ensure()?;
        self.lock_state().status = ParseStatus::Pending;
        let media = self.clone();
        thread::Builder::new()
            .name("mediabridge-parse".to_string())
            .spawn(move || {
                media.run_probe(options);
            })
            .map_err(|e| EngineError::OperationFailed(format!("parse thread spawn: {}", e)))?;
        Ok(())
    }

    fn run_probe(&self, options: ParseOptions) -> ParseStatus {
        let location = self.lock_state().location.clone();
        let allowed = match location {
            MediaLocation::Path(_) => options.parse_local,
            MediaLocation::Url(_) => options.parse_network,
        };

        let status = if !allowed {
            ParseStatus::Skipped
        } else {
            match self.core.shared().track_source.probe(&location) {
                ProbeOutcome::Parsed(report) => {
                    self.apply_report(report);
                    ParseStatus::Done
                }
                ProbeOutcome::Unhandled => ParseStatus::Skipped,
                ProbeOutcome::Failed(reason) => {
                    log::warn!("parse of {} failed: {}", location, reason);
                    ParseStatus::Failed
                }
            }
        };

        self.lock_state().status = status;
        self.core
            .emit(EventKind::MediaParsedChanged, EventPayload::ParseStatus(status));
        status
    }

    fn apply_report(&self, report: ProbeReport) {
        let mut state = self.lock_state();
        state.duration = report.duration;
        state.meta = report.meta;
        state.tracks = report.tracks;
    }

    /// Track records of a successfully parsed media.
    ///
    /// Any status other than `Done` reports `ParseFailed(status)`; a
    /// released handle reports `InvalidHandle` instead.
    pub fn tracks(&self) -> EngineResult<Vec<MediaTrack>> {
        self.core.ensure()?;
        let state = self.lock_state();
        match state.status {
            ParseStatus::Done => Ok(state.tracks.clone()),
            status => Err(EngineError::ParseFailed(status)),
        }
    }

    pub fn event_manager(&self) -> EventManager {
        self.core.event_manager()
    }

    /// Releases the handle. A second release reports `InvalidHandle`.
    pub fn release(&self) -> EngineResult<()> {
        self.core.release()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MediaState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineOptions;
    use crate::tracks::StaticTrackSource;

    fn engine_with_fixture(location: &str, report: ProbeReport) -> Engine {
        let source = StaticTrackSource::new().insert(location, report);
        Engine::init(EngineOptions::new().track_source(Box::new(source))).unwrap()
    }

    #[test]
    fn test_from_path_requires_existing_file() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        match Media::from_path(&engine, "/definitely/not/here.mp3") {
            Err(EngineError::FileNotFound(_)) => {}
            other => panic!("expected FileNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_from_url_rejects_unknown_scheme() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        assert!(matches!(
            Media::from_url(&engine, "gopher://old.example"),
            Err(EngineError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            Media::from_url(&engine, "not a url"),
            Err(EngineError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_url_parse_without_network_flag_is_skipped() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let media = Media::from_url(&engine, "http://example.com/stream.mp3").unwrap();
        let status = media.parse().unwrap();
        assert_eq!(status, ParseStatus::Skipped);
        assert!(matches!(
            media.tracks(),
            Err(EngineError::ParseFailed(ParseStatus::Skipped))
        ));
    }

    #[test]
    fn test_fixture_url_parses_with_network_flag() {
        let report = ProbeReport {
            duration: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        let engine = engine_with_fixture("http://example.com/stream.mp3", report);
        let media = Media::from_url(&engine, "http://example.com/stream.mp3").unwrap();
        let status = media
            .parse_with_options(ParseOptions {
                parse_local: true,
                parse_network: true,
            })
            .unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(media.duration().unwrap(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_tracks_before_parse_reports_parse_failed() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let media = Media::from_url(&engine, "http://example.com/a.mp3").unwrap();
        assert!(matches!(
            media.tracks(),
            Err(EngineError::ParseFailed(ParseStatus::Unstarted))
        ));
    }

    #[test]
    fn test_release_then_use_is_invalid_handle() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let media = Media::from_url(&engine, "http://example.com/a.mp3").unwrap();
        media.release().unwrap();
        assert!(matches!(
            media.location(),
            Err(EngineError::InvalidHandle(_))
        ));
        assert!(matches!(
            media.release(),
            Err(EngineError::InvalidHandle(_))
        ));
    }
}
