//! Engine context and lifecycle
//!
//! The process-global init/release pair of a native engine is modeled as an
//! explicitly constructed context object. Every handle operation checks the
//! context liveness flag, so use-after-teardown surfaces as
//! `EngineError::Shutdown` instead of undefined behavior. Teardown reverses
//! acquisition order: registrations, dispatcher, handles.

use crate::discovery::{
    local_dirs_service, silent_renderer_service, MediaDiscovererDescriptor, MediaDiscoveryCategory,
    MediaProvider, MediaService, RendererDescriptor, RendererProvider, RendererService,
};
use crate::error::{EngineError, EngineResult};
use crate::events::{
    dispatch_loop, kind_supported, DispatchMessage, Event, EventKind, EventPayload, EventRegistry,
};
use crate::gate::CompletionGate;
use crate::handle::{HandleKind, HandleTable};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::tracks::{SymphoniaTrackSource, TrackSource};
use crossbeam_channel::{unbounded, Sender};
use mediabridge_core::{HandleId, RegistrationId};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// Startup options for an engine context.
///
/// The flag booleans mirror the startup tokens of the wrapped engine
/// (`--no-video`, `--quiet`); the remaining fields are the provider seams
/// that stand in for the native library.
pub struct EngineOptions {
    pub suppress_video: bool,
    pub quiet: bool,
    pub extra_flags: Vec<String>,
    media_dirs: Vec<PathBuf>,
    track_source: Option<Box<dyn TrackSource>>,
    renderer_services: Vec<RendererService>,
    media_services: Vec<MediaService>,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self {
            suppress_video: false,
            quiet: true,
            extra_flags: Vec::new(),
            media_dirs: Vec::new(),
            track_source: None,
            renderer_services: vec![silent_renderer_service()],
            media_services: Vec::new(),
        }
    }

    pub fn suppress_video(mut self, value: bool) -> Self {
        self.suppress_video = value;
        self
    }

    pub fn quiet(mut self, value: bool) -> Self {
        self.quiet = value;
        self
    }

    pub fn extra_flag(mut self, flag: impl Into<String>) -> Self {
        self.extra_flags.push(flag.into());
        self
    }

    /// Directories scanned by the built-in local media discovery service
    pub fn media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dirs.push(dir.into());
        self
    }

    /// Replaces the default symphonia-based track source
    pub fn track_source(mut self, source: Box<dyn TrackSource>) -> Self {
        self.track_source = Some(source);
        self
    }

    /// Registers a renderer discovery service, replacing any existing
    /// service of the same name
    pub fn renderer_service(
        mut self,
        descriptor: RendererDescriptor,
        provider: Arc<dyn RendererProvider>,
    ) -> Self {
        self.renderer_services
            .retain(|s| s.descriptor.name != descriptor.name);
        self.renderer_services.push(RendererService {
            descriptor,
            provider,
        });
        self
    }

    /// Registers a media discovery service, replacing any existing service
    /// of the same name
    pub fn media_service(
        mut self,
        descriptor: MediaDiscovererDescriptor,
        provider: Arc<dyn MediaProvider>,
    ) -> Self {
        self.media_services
            .retain(|s| s.descriptor.name != descriptor.name);
        self.media_services.push(MediaService {
            descriptor,
            provider,
        });
        self
    }

    /// Assembled startup flag tokens
    pub fn flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.suppress_video {
            flags.push("--no-video".to_string());
        }
        if self.quiet {
            flags.push("--quiet".to_string());
        }
        flags.extend(self.extra_flags.iter().cloned());
        flags
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between the context, its resources and its worker threads
pub(crate) struct EngineShared {
    alive: AtomicBool,
    handles: Mutex<HandleTable>,
    registry: Arc<Mutex<EventRegistry>>,
    event_tx: Sender<DispatchMessage>,
    dispatcher_thread: Mutex<Option<ThreadId>>,
    pub(crate) track_source: Box<dyn TrackSource>,
    pub(crate) renderer_services: Vec<RendererService>,
    pub(crate) media_services: Vec<MediaService>,
    pub(crate) media_dirs: Vec<PathBuf>,
    pub(crate) metrics: Arc<EngineMetrics>,
}

impl EngineShared {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn ensure_alive(&self) -> EngineResult<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(EngineError::Shutdown)
        }
    }

    pub fn register_handle(&self, kind: HandleKind) -> EngineResult<HandleId> {
        self.ensure_alive()?;
        let id = self.lock_handles().register(kind);
        self.metrics.record_handle_created();
        Ok(id)
    }

    pub fn ensure_handle(&self, id: HandleId) -> EngineResult<HandleKind> {
        self.ensure_alive()?;
        self.lock_handles().ensure(id)
    }

    pub fn release_handle(&self, id: HandleId) -> EngineResult<()> {
        self.ensure_alive()?;
        self.lock_handles().release(id)?;
        self.lock_registry().remove_handle(id);
        self.metrics.record_handle_released();
        Ok(())
    }

    /// Release from resource drops: silent when already gone
    pub fn release_handle_quiet(&self, id: HandleId) {
        if self.lock_handles().release_quiet(id) {
            self.lock_registry().remove_handle(id);
            self.metrics.record_handle_released();
        }
    }

    /// Queues an event for dispatch. Events emitted after teardown are
    /// dropped.
    pub fn emit(&self, handle: HandleId, kind: EventKind, payload: EventPayload) {
        if !self.is_alive() {
            return;
        }
        let event = Event {
            handle,
            kind,
            payload,
        };
        if self.event_tx.send(DispatchMessage::Event(event)).is_err() {
            log::debug!("event {} dropped after dispatcher shutdown", kind);
        }
    }

    /// Blocks until every previously queued event has been dispatched.
    ///
    /// No-op on the dispatcher thread itself (a callback detaching its own
    /// registration must not wait for itself). The wait has no overall
    /// bound: the barrier is queued behind the in-flight event, not behind
    /// the caller, so it completes as soon as the dispatcher catches up,
    /// however long the callbacks ahead of it run. The only early exit is
    /// engine teardown, after which the barrier may never be serviced.
    pub fn drain_dispatcher(&self) {
        let on_dispatcher = {
            let guard = match self.dispatcher_thread.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard == Some(thread::current().id())
        };
        if on_dispatcher {
            return;
        }

        let gate = CompletionGate::new();
        if self
            .event_tx
            .send(DispatchMessage::Barrier(gate.clone()))
            .is_err()
        {
            return;
        }
        while !gate.wait_timeout(Duration::from_millis(50)) {
            if !self.is_alive() {
                return;
            }
        }
    }

    pub(crate) fn lock_handles(&self) -> std::sync::MutexGuard<'_, HandleTable> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn lock_registry(&self) -> std::sync::MutexGuard<'_, EventRegistry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// One registered resource. Dropping the last clone releases the handle
/// quietly; explicit `release` reports double-release.
pub(crate) struct ResourceCore {
    shared: Arc<EngineShared>,
    id: HandleId,
    kind: HandleKind,
}

impl ResourceCore {
    pub fn register(shared: &Arc<EngineShared>, kind: HandleKind) -> EngineResult<Arc<Self>> {
        let id = shared.register_handle(kind)?;
        Ok(Arc::new(Self {
            shared: Arc::clone(shared),
            id,
            kind,
        }))
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn shared(&self) -> &Arc<EngineShared> {
        &self.shared
    }

    pub fn ensure(&self) -> EngineResult<()> {
        self.shared.ensure_handle(self.id).map(|_| ())
    }

    pub fn release(&self) -> EngineResult<()> {
        self.shared.release_handle(self.id)
    }

    pub fn emit(&self, kind: EventKind, payload: EventPayload) {
        self.shared.emit(self.id, kind, payload);
    }

    pub fn event_manager(&self) -> EventManager {
        EventManager {
            shared: Arc::clone(&self.shared),
            handle: self.id,
            handle_kind: self.kind,
        }
    }
}

impl Drop for ResourceCore {
    fn drop(&mut self) {
        self.shared.release_handle_quiet(self.id);
    }
}

/// Attach/detach surface of one handle
#[derive(Clone)]
pub struct EventManager {
    shared: Arc<EngineShared>,
    handle: HandleId,
    handle_kind: HandleKind,
}

impl EventManager {
    /// Registers interest in `kind` events of this handle.
    ///
    /// The callback runs on the engine's dispatcher thread, not on the
    /// thread that triggered the operation. State it shares with the
    /// control flow must be handed off safely; `CompletionGate` is the
    /// usual mechanism.
    pub fn attach<F>(&self, kind: EventKind, callback: F) -> EngineResult<RegistrationId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared.ensure_handle(self.handle)?;
        if !kind_supported(self.handle_kind, kind) {
            return Err(EngineError::UnsupportedEvent {
                kind,
                handle: self.handle_kind,
            });
        }
        Ok(self
            .shared
            .lock_registry()
            .attach(self.handle, kind, Arc::new(callback)))
    }

    /// Removes the given registrations.
    ///
    /// When detach returns, no further callback invocations occur for the
    /// removed registrations: detach waits for the dispatcher to pass a
    /// barrier queued after removal.
    pub fn detach(&self, ids: &[RegistrationId]) -> EngineResult<()> {
        self.shared.ensure_alive()?;
        {
            let mut registry = self.shared.lock_registry();
            for &id in ids {
                registry.detach(self.handle, id)?;
            }
        }
        self.shared.drain_dispatcher();
        Ok(())
    }
}

/// An initialized engine context.
///
/// Shutting down (or dropping) the context stops the dispatcher and
/// invalidates every handle created from it.
pub struct Engine {
    shared: Arc<EngineShared>,
    dispatcher: Option<JoinHandle<()>>,
}

impl Engine {
    /// Constructs a context and starts its event dispatcher.
    pub fn init(options: EngineOptions) -> EngineResult<Self> {
        let flags = options.flags();
        let registry = Arc::new(Mutex::new(EventRegistry::default()));
        let metrics = Arc::new(EngineMetrics::new());
        let (event_tx, event_rx) = unbounded();

        let track_source = options
            .track_source
            .unwrap_or_else(|| Box::new(SymphoniaTrackSource::new()));

        let mut media_services = options.media_services;
        if !media_services
            .iter()
            .any(|s| s.descriptor.category == MediaDiscoveryCategory::LocalDirs)
        {
            media_services.push(local_dirs_service());
        }

        let shared = Arc::new(EngineShared {
            alive: AtomicBool::new(true),
            handles: Mutex::new(HandleTable::new()),
            registry: Arc::clone(&registry),
            event_tx,
            dispatcher_thread: Mutex::new(None),
            track_source,
            renderer_services: options.renderer_services,
            media_services,
            media_dirs: options.media_dirs,
            metrics: Arc::clone(&metrics),
        });

        let dispatcher = thread::Builder::new()
            .name("mediabridge-dispatch".to_string())
            .spawn(move || dispatch_loop(event_rx, registry, metrics))
            .map_err(|e| EngineError::InitFailed(format!("dispatcher spawn: {}", e)))?;

        *shared
            .dispatcher_thread
            .lock()
            .map_err(|_| EngineError::InitFailed("dispatcher state poisoned".into()))? =
            Some(dispatcher.thread().id());

        log::info!("engine initialized with flags {:?}", flags);
        Ok(Self {
            shared,
            dispatcher: Some(dispatcher),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Descriptors of the available renderer discovery services
    pub fn renderer_discoverers(&self) -> EngineResult<Vec<RendererDescriptor>> {
        self.shared.ensure_alive()?;
        Ok(self
            .shared
            .renderer_services
            .iter()
            .map(|s| s.descriptor.clone())
            .collect())
    }

    /// Descriptors of the media discovery services in `category`
    pub fn media_discoverers(
        &self,
        category: MediaDiscoveryCategory,
    ) -> EngineResult<Vec<MediaDiscovererDescriptor>> {
        self.shared.ensure_alive()?;
        Ok(self
            .shared
            .media_services
            .iter()
            .filter(|s| s.descriptor.category == category)
            .map(|s| s.descriptor.clone())
            .collect())
    }

    /// Number of live handles
    pub fn handle_count(&self) -> usize {
        self.shared.lock_handles().len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Explicit ordered teardown. Equivalent to dropping the context.
    pub fn shutdown(self) {
        // Drop runs the teardown
    }

    fn teardown(&mut self) {
        if !self.shared.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        log::info!("engine shutting down");
        self.shared.lock_registry().clear();
        let _ = self.shared.event_tx.send(DispatchMessage::Shutdown);
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
        self.shared.lock_handles().clear();
    }

    pub(crate) fn shared(&self) -> &Arc<EngineShared> {
        &self.shared
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_shutdown() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        assert!(engine.is_alive());
        engine.shutdown();
    }

    #[test]
    fn test_flags_assembled_from_options() {
        let options = EngineOptions::new()
            .suppress_video(true)
            .quiet(true)
            .extra_flag("--no-xlib");
        assert_eq!(options.flags(), vec!["--no-video", "--quiet", "--no-xlib"]);
    }

    #[test]
    fn test_default_renderer_service_listed() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let descriptors = engine.renderer_discoverers().unwrap();
        assert!(descriptors.iter().any(|d| d.name == "microdns_renderer"));
    }

    #[test]
    fn test_detach_outwaits_long_running_callback() {
        use std::sync::atomic::AtomicUsize;
        use std::time::Instant;

        let engine = Engine::init(EngineOptions::new()).unwrap();
        let core = ResourceCore::register(engine.shared(), HandleKind::Player).unwrap();
        let manager = core.event_manager();

        // First registration stalls the dispatcher well past one second
        let entered = CompletionGate::new();
        let observer = entered.clone();
        let _slow = manager
            .attach(EventKind::MediaPlayerPlaying, move |_event| {
                let _ = observer.close();
                thread::sleep(Duration::from_millis(1300));
            })
            .unwrap();

        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let reg = manager
            .attach(EventKind::MediaPlayerPlaying, move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        core.emit(EventKind::MediaPlayerPlaying, EventPayload::None);
        assert!(entered.wait_timeout(Duration::from_secs(2)));

        // Detach while the dispatcher is inside the slow callback: it must
        // block until the whole in-flight event has been delivered
        let start = Instant::now();
        manager.detach(&[reg]).unwrap();
        assert!(
            start.elapsed() >= Duration::from_millis(1100),
            "detach returned while the dispatcher was still delivering"
        );

        // Whatever ran, ran before detach returned; nothing fires after
        let seen = invocations.load(Ordering::SeqCst);
        core.emit(EventKind::MediaPlayerPlaying, EventPayload::None);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(invocations.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_local_dirs_service_always_present() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let descriptors = engine
            .media_discoverers(MediaDiscoveryCategory::LocalDirs)
            .unwrap();
        assert_eq!(descriptors.len(), 1);
    }
}
