//! Renderer and media discovery
//!
//! Discovery services run as provider threads that announce items through
//! the event bridge. Providers receive a sink, never the discoverer, so a
//! provider (or an event callback) cannot stop or release the service from
//! inside its own announcement; control flow does that after being
//! signaled, usually through a `CompletionGate`.

use crate::context::{Engine, EngineShared, EventManager, ResourceCore};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventKind, EventPayload};
use crate::gate::CompletionGate;
use crate::handle::HandleKind;
use crate::list_player::MediaList;
use crate::media::{Media, MediaLocation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "opus", "wav", "m4a", "m4b", "aac", "mp4", "mkv", "avi", "webm",
];

/// Kind of output device a renderer represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RendererKind {
    Chromecast,
    Airplay,
    Dlna,
    Other,
}

/// A discovered output device. Plain data; carries no engine capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderer {
    pub name: String,
    pub kind: RendererKind,
}

/// Describes one renderer discovery service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererDescriptor {
    pub name: String,
    pub long_name: String,
}

/// Category of a media discovery service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaDiscoveryCategory {
    Devices,
    Lan,
    Podcasts,
    LocalDirs,
}

/// Describes one media discovery service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDiscovererDescriptor {
    pub name: String,
    pub long_name: String,
    pub category: MediaDiscoveryCategory,
}

/// Lifecycle of a discovery service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    Discovering,
    Found,
    Stopped,
}

/// Announcement surface handed to renderer providers
pub struct RendererSink {
    shared: Arc<EngineShared>,
    handle: mediabridge_core::HandleId,
    seen: Arc<Mutex<Vec<Renderer>>>,
    stopped: Arc<AtomicBool>,
}

impl RendererSink {
    /// Announces a newly available renderer
    pub fn add(&self, renderer: Renderer) {
        if self.is_stopped() {
            return;
        }
        match self.seen.lock() {
            Ok(mut seen) => seen.push(renderer.clone()),
            Err(poisoned) => poisoned.into_inner().push(renderer.clone()),
        }
        self.shared.emit(
            self.handle,
            EventKind::RendererDiscovererItemAdded,
            EventPayload::Renderer(renderer),
        );
    }

    /// Announces that a renderer is no longer available
    pub fn remove(&self, name: &str) {
        if self.is_stopped() {
            return;
        }
        let renderer = {
            let mut seen = match self.seen.lock() {
                Ok(seen) => seen,
                Err(poisoned) => poisoned.into_inner(),
            };
            match seen.iter().position(|r| r.name == name) {
                Some(index) => seen.remove(index),
                None => return,
            }
        };
        self.shared.emit(
            self.handle,
            EventKind::RendererDiscovererItemDeleted,
            EventPayload::Renderer(renderer),
        );
    }

    /// Providers must return promptly once this turns true
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed) || !self.shared.is_alive()
    }
}

/// Source of renderer announcements for one discovery service
pub trait RendererProvider: Send + Sync {
    /// Runs on a dedicated thread for the duration of the discovery
    fn run(&self, sink: RendererSink);
}

/// Placeholder provider for protocol-backed services this layer cannot
/// implement (mDNS et al.); announces nothing.
pub struct SilentRendererProvider;

impl RendererProvider for SilentRendererProvider {
    fn run(&self, _sink: RendererSink) {}
}

/// Provider replaying a fixed script of announcements. Intended for tests
/// and embedders that resolve renderers out of band.
pub struct ScriptedRendererProvider {
    script: Vec<(Duration, Renderer)>,
}

impl ScriptedRendererProvider {
    pub fn new(script: Vec<(Duration, Renderer)>) -> Self {
        Self { script }
    }
}

impl RendererProvider for ScriptedRendererProvider {
    fn run(&self, sink: RendererSink) {
        for (delay, renderer) in &self.script {
            thread::sleep(*delay);
            if sink.is_stopped() {
                return;
            }
            sink.add(renderer.clone());
        }
    }
}

pub(crate) struct RendererService {
    pub(crate) descriptor: RendererDescriptor,
    pub(crate) provider: Arc<dyn RendererProvider>,
}

pub(crate) fn silent_renderer_service() -> RendererService {
    RendererService {
        descriptor: RendererDescriptor {
            name: "microdns_renderer".to_string(),
            long_name: "mDNS renderer discovery".to_string(),
        },
        provider: Arc::new(SilentRendererProvider),
    }
}

struct DiscoveryWorker {
    handle: Option<thread::JoinHandle<()>>,
    stopped: Arc<AtomicBool>,
}

impl DiscoveryWorker {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct RendererDiscovererInner {
    provider: Arc<dyn RendererProvider>,
    state: Mutex<DiscoveryState>,
    seen: Arc<Mutex<Vec<Renderer>>>,
    worker: Mutex<Option<DiscoveryWorker>>,
}

impl Drop for RendererDiscovererInner {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.worker.lock() {
            if let Some(mut worker) = guard.take() {
                worker.stop();
            }
        }
    }
}

/// A renderer discovery service instance
#[derive(Clone)]
pub struct RendererDiscoverer {
    core: Arc<ResourceCore>,
    inner: Arc<RendererDiscovererInner>,
}

impl RendererDiscoverer {
    /// Instantiates the discovery service named `name`.
    ///
    /// An unknown name reports `DiscoveryNotFound` immediately.
    pub fn new(engine: &Engine, name: &str) -> EngineResult<Self> {
        let shared = engine.shared();
        shared.ensure_alive()?;
        let provider = shared
            .renderer_services
            .iter()
            .find(|s| s.descriptor.name == name)
            .map(|s| Arc::clone(&s.provider))
            .ok_or_else(|| EngineError::DiscoveryNotFound(name.to_string()))?;

        let core = ResourceCore::register(shared, HandleKind::RendererDiscoverer)?;
        Ok(Self {
            core,
            inner: Arc::new(RendererDiscovererInner {
                provider,
                state: Mutex::new(DiscoveryState::Idle),
                seen: Arc::new(Mutex::new(Vec::new())),
                worker: Mutex::new(None),
            }),
        })
    }

    pub fn state(&self) -> DiscoveryState {
        *self.lock_state()
    }

    /// Starts the provider thread. Valid from `Idle` or `Stopped`.
    pub fn start(&self) -> EngineResult<()> {
        self.core.ensure()?;
        {
            let mut state = self.lock_state();
            match *state {
                DiscoveryState::Idle | DiscoveryState::Stopped => {
                    *state = DiscoveryState::Discovering
                }
                DiscoveryState::Discovering | DiscoveryState::Found => {
                    return Err(EngineError::OperationFailed(
                        "discovery already started".into(),
                    ))
                }
            }
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let sink = RendererSink {
            shared: Arc::clone(self.core.shared()),
            handle: self.core.id(),
            seen: Arc::clone(&self.inner.seen),
            stopped: Arc::clone(&stopped),
        };
        let provider = Arc::clone(&self.inner.provider);

        let handle = thread::Builder::new()
            .name("mediabridge-rdiscover".to_string())
            .spawn(move || provider.run(sink))
            .map_err(|e| EngineError::OperationFailed(format!("discovery thread spawn: {}", e)))?;

        *self.lock_worker() = Some(DiscoveryWorker {
            handle: Some(handle),
            stopped,
        });
        Ok(())
    }

    /// Stops discovery. Must be called from control flow, never from an
    /// event callback; callbacks have no path to this method.
    pub fn stop(&self) -> EngineResult<()> {
        self.core.ensure()?;
        {
            let state = self.lock_state();
            if matches!(*state, DiscoveryState::Idle) {
                return Err(EngineError::OperationFailed("discovery not started".into()));
            }
        }
        if let Some(mut worker) = self.lock_worker().take() {
            worker.stop();
        }
        *self.lock_state() = DiscoveryState::Stopped;
        Ok(())
    }

    /// Renderers announced so far and not yet removed
    pub fn renderers(&self) -> EngineResult<Vec<Renderer>> {
        self.core.ensure()?;
        Ok(match self.inner.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        })
    }

    pub fn event_manager(&self) -> EventManager {
        self.core.event_manager()
    }

    /// Releases the handle, stopping the provider first
    pub fn release(&self) -> EngineResult<()> {
        if let Some(mut worker) = self.lock_worker().take() {
            worker.stop();
        }
        self.core.release()
    }

    fn mark_found(&self) {
        let mut state = self.lock_state();
        if *state == DiscoveryState::Discovering {
            *state = DiscoveryState::Found;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DiscoveryState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<DiscoveryWorker>> {
        match self.inner.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Waits for the first renderer matching `predicate` on the discovery
/// service named `service`, then stops and releases the service.
///
/// The whole flow is bounded by `timeout`; expiry reports
/// `DiscoveryNotFound` rather than hanging. The callback only signals a
/// gate; stop and release happen here, in control flow.
pub fn find_renderer<P>(
    engine: &Engine,
    service: &str,
    predicate: P,
    timeout: Duration,
) -> EngineResult<Renderer>
where
    P: Fn(&Renderer) -> bool + Send + Sync + 'static,
{
    let discoverer = RendererDiscoverer::new(engine, service)?;
    let gate = CompletionGate::new();
    let found: Arc<Mutex<Option<Renderer>>> = Arc::new(Mutex::new(None));

    let manager = discoverer.event_manager();
    let observer = gate.clone();
    let slot = Arc::clone(&found);
    let registration = manager.attach(EventKind::RendererDiscovererItemAdded, move |event| {
        if let EventPayload::Renderer(renderer) = &event.payload {
            if predicate(renderer) {
                let mut slot = match slot.lock() {
                    Ok(slot) => slot,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if slot.is_none() {
                    *slot = Some(renderer.clone());
                    let _ = observer.close();
                }
            }
        }
    })?;

    discoverer.start()?;
    let matched = gate.wait_timeout(timeout);
    manager.detach(&[registration])?;
    if matched {
        discoverer.mark_found();
    }
    discoverer.stop()?;
    discoverer.release()?;

    let renderer = match found.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    renderer.ok_or_else(|| EngineError::DiscoveryNotFound(service.to_string()))
}

/// Announcement surface handed to media providers
pub struct MediaSink {
    shared: Arc<EngineShared>,
    list: MediaList,
    stopped: Arc<AtomicBool>,
}

impl MediaSink {
    /// Announces a discovered local file
    pub fn add_path(&self, path: PathBuf) {
        self.add_location(MediaLocation::Path(path));
    }

    /// Announces a discovered location
    pub fn add_location(&self, location: MediaLocation) {
        if self.is_stopped() {
            return;
        }
        match Media::register(&self.shared, location) {
            Ok(media) => {
                if let Err(e) = self.list.add_media(&media) {
                    log::debug!("discovered media dropped: {}", e);
                }
            }
            Err(e) => log::debug!("discovered media dropped: {}", e),
        }
    }

    /// Directories configured for local media discovery
    pub fn media_dirs(&self) -> Vec<PathBuf> {
        self.shared.media_dirs.clone()
    }

    /// Providers must return promptly once this turns true
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed) || !self.shared.is_alive()
    }
}

/// Source of media announcements for one discovery service
pub trait MediaProvider: Send + Sync {
    /// Runs on a dedicated thread for the duration of the discovery
    fn run(&self, sink: MediaSink);
}

/// Built-in provider scanning the configured media directories once
pub struct LocalDirsProvider;

impl MediaProvider for LocalDirsProvider {
    fn run(&self, sink: MediaSink) {
        for dir in sink.media_dirs() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("cannot scan {}: {}", dir.display(), e);
                    continue;
                }
            };
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                        .unwrap_or(false)
                })
                .collect();
            paths.sort();

            for path in paths {
                if sink.is_stopped() {
                    return;
                }
                sink.add_path(path);
            }
        }
    }
}

pub(crate) struct MediaService {
    pub(crate) descriptor: MediaDiscovererDescriptor,
    pub(crate) provider: Arc<dyn MediaProvider>,
}

pub(crate) fn local_dirs_service() -> MediaService {
    MediaService {
        descriptor: MediaDiscovererDescriptor {
            name: "local_dirs".to_string(),
            long_name: "Local media directories".to_string(),
            category: MediaDiscoveryCategory::LocalDirs,
        },
        provider: Arc::new(LocalDirsProvider),
    }
}

struct MediaDiscovererInner {
    provider: Arc<dyn MediaProvider>,
    list: MediaList,
    state: Mutex<DiscoveryState>,
    worker: Mutex<Option<DiscoveryWorker>>,
}

impl Drop for MediaDiscovererInner {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.worker.lock() {
            if let Some(mut worker) = guard.take() {
                worker.stop();
            }
        }
    }
}

/// A media discovery service instance. Discovered items land in an
/// internal media list; attach to that list's events to observe them.
#[derive(Clone)]
pub struct MediaDiscoverer {
    core: Arc<ResourceCore>,
    inner: Arc<MediaDiscovererInner>,
}

impl MediaDiscoverer {
    /// Instantiates the media discovery service named `name`.
    ///
    /// An unknown name reports `DiscoveryNotFound` immediately.
    pub fn new(engine: &Engine, name: &str) -> EngineResult<Self> {
        let shared = engine.shared();
        shared.ensure_alive()?;
        let provider = shared
            .media_services
            .iter()
            .find(|s| s.descriptor.name == name)
            .map(|s| Arc::clone(&s.provider))
            .ok_or_else(|| EngineError::DiscoveryNotFound(name.to_string()))?;

        let core = ResourceCore::register(shared, HandleKind::MediaDiscoverer)?;
        let list = MediaList::register(shared)?;
        Ok(Self {
            core,
            inner: Arc::new(MediaDiscovererInner {
                provider,
                list,
                state: Mutex::new(DiscoveryState::Idle),
                worker: Mutex::new(None),
            }),
        })
    }

    /// The list collecting discovered media
    pub fn media_list(&self) -> EngineResult<MediaList> {
        self.core.ensure()?;
        Ok(self.inner.list.clone())
    }

    pub fn state(&self) -> DiscoveryState {
        match self.inner.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Starts the provider thread. Valid from `Idle` or `Stopped`.
    pub fn start(&self) -> EngineResult<()> {
        self.core.ensure()?;
        {
            let mut state = match self.inner.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match *state {
                DiscoveryState::Idle | DiscoveryState::Stopped => {
                    *state = DiscoveryState::Discovering
                }
                DiscoveryState::Discovering | DiscoveryState::Found => {
                    return Err(EngineError::OperationFailed(
                        "discovery already started".into(),
                    ))
                }
            }
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let sink = MediaSink {
            shared: Arc::clone(self.core.shared()),
            list: self.inner.list.clone(),
            stopped: Arc::clone(&stopped),
        };
        let provider = Arc::clone(&self.inner.provider);

        let handle = thread::Builder::new()
            .name("mediabridge-mdiscover".to_string())
            .spawn(move || provider.run(sink))
            .map_err(|e| EngineError::OperationFailed(format!("discovery thread spawn: {}", e)))?;

        *self.lock_worker() = Some(DiscoveryWorker {
            handle: Some(handle),
            stopped,
        });
        Ok(())
    }

    /// Stops discovery from control flow
    pub fn stop(&self) -> EngineResult<()> {
        self.core.ensure()?;
        {
            let state = match self.inner.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if matches!(*state, DiscoveryState::Idle) {
                return Err(EngineError::OperationFailed("discovery not started".into()));
            }
        }
        if let Some(mut worker) = self.lock_worker().take() {
            worker.stop();
        }
        let mut state = match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = DiscoveryState::Stopped;
        Ok(())
    }

    /// Releases the discoverer and its media list
    pub fn release(&self) -> EngineResult<()> {
        if let Some(mut worker) = self.lock_worker().take() {
            worker.stop();
        }
        let _ = self.inner.list.release();
        self.core.release()
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<DiscoveryWorker>> {
        match self.inner.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineOptions;

    fn chromecast() -> Renderer {
        Renderer {
            name: "Living Room TV".to_string(),
            kind: RendererKind::Chromecast,
        }
    }

    fn scripted_engine() -> Engine {
        let provider = ScriptedRendererProvider::new(vec![
            (
                Duration::from_millis(5),
                Renderer {
                    name: "Speaker".to_string(),
                    kind: RendererKind::Dlna,
                },
            ),
            (Duration::from_millis(5), chromecast()),
        ]);
        Engine::init(EngineOptions::new().renderer_service(
            RendererDescriptor {
                name: "test_renderer".to_string(),
                long_name: "Scripted renderer discovery".to_string(),
            },
            Arc::new(provider),
        ))
        .unwrap()
    }

    #[test]
    fn test_unknown_service_is_not_found() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        match RendererDiscoverer::new(&engine, "bonjour_renderer") {
            Err(EngineError::DiscoveryNotFound(name)) => {
                assert_eq!(name, "bonjour_renderer");
            }
            other => panic!("expected DiscoveryNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_state_transitions() {
        let engine = scripted_engine();
        let discoverer = RendererDiscoverer::new(&engine, "test_renderer").unwrap();
        assert_eq!(discoverer.state(), DiscoveryState::Idle);

        discoverer.start().unwrap();
        assert_eq!(discoverer.state(), DiscoveryState::Discovering);
        assert!(discoverer.start().is_err());

        discoverer.stop().unwrap();
        assert_eq!(discoverer.state(), DiscoveryState::Stopped);

        // A fresh start call may resume discovery
        discoverer.start().unwrap();
        assert_eq!(discoverer.state(), DiscoveryState::Discovering);
        discoverer.stop().unwrap();
    }

    #[test]
    fn test_stop_before_start_fails() {
        let engine = scripted_engine();
        let discoverer = RendererDiscoverer::new(&engine, "test_renderer").unwrap();
        assert!(discoverer.stop().is_err());
    }

    #[test]
    fn test_find_renderer_matches_predicate() {
        let engine = scripted_engine();
        let renderer = find_renderer(
            &engine,
            "test_renderer",
            |r| r.kind == RendererKind::Chromecast,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(renderer, chromecast());
    }

    #[test]
    fn test_find_renderer_times_out_without_match() {
        let engine = scripted_engine();
        let result = find_renderer(
            &engine,
            "test_renderer",
            |r| r.kind == RendererKind::Airplay,
            Duration::from_millis(100),
        );
        assert!(matches!(result, Err(EngineError::DiscoveryNotFound(_))));
    }

    #[test]
    fn test_silent_default_service_never_hangs_find() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let result = find_renderer(
            &engine,
            "microdns_renderer",
            |_| true,
            Duration::from_millis(50),
        );
        assert!(matches!(result, Err(EngineError::DiscoveryNotFound(_))));
    }
}
