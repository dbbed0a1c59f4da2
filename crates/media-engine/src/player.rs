//! Player handles and the playback worker
//!
//! Playback itself is delegated to the wrapped engine; this layer models it
//! as a clock thread that advances a position against the parsed duration
//! and reports state transitions through the event bridge. Commands reach
//! the worker over a bounded channel; `MediaPlayerEndReached` fires on the
//! dispatcher thread when the clock runs out.

use crate::context::{Engine, EngineShared, EventManager, ResourceCore};
use crate::discovery::Renderer;
use crate::equalizer::Equalizer;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventKind, EventPayload};
use crate::handle::HandleKind;
use crate::media::Media;
use crossbeam_channel::{bounded, Receiver, Sender};
use mediabridge_core::HandleId;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(5);

/// Playback state of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Stopped,
    Playing,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Copy)]
enum PlaybackCommand {
    Pause,
    Resume,
    Seek(Duration),
    Stop,
}

struct PlaybackWorker {
    handle: Option<thread::JoinHandle<()>>,
    command_tx: Sender<PlaybackCommand>,
    running: Arc<AtomicBool>,
}

impl PlaybackWorker {
    fn send(&self, cmd: PlaybackCommand) {
        let _ = self.command_tx.send(cmd);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        self.send(PlaybackCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct PlayerState {
    media: Option<Media>,
    status: PlayerStatus,
    volume: f32,
    equalizer: Option<Equalizer>,
    renderer: Option<Renderer>,
}

struct PlayerInner {
    state: Mutex<PlayerState>,
    worker: Mutex<Option<PlaybackWorker>>,
    position_ms: Arc<AtomicU64>,
}

impl PlayerInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, PlayerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<PlaybackWorker>> {
        match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn stop_worker(&self) {
        // Take the worker out first so the mutex is free while the playback
        // thread drains its command queue and exits
        let worker = self.lock_worker().take();
        if let Some(mut worker) = worker {
            worker.stop();
        }
    }
}

impl Drop for PlayerInner {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// A playback handle. Clones share the same underlying player.
#[derive(Clone)]
pub struct Player {
    core: Arc<ResourceCore>,
    inner: Arc<PlayerInner>,
}

impl Player {
    pub fn new(engine: &Engine) -> EngineResult<Self> {
        Self::register(engine.shared())
    }

    pub(crate) fn register(shared: &Arc<EngineShared>) -> EngineResult<Self> {
        let core = ResourceCore::register(shared, HandleKind::Player)?;
        Ok(Self {
            core,
            inner: Arc::new(PlayerInner {
                state: Mutex::new(PlayerState {
                    media: None,
                    status: PlayerStatus::Stopped,
                    volume: 1.0,
                    equalizer: None,
                    renderer: None,
                }),
                worker: Mutex::new(None),
                position_ms: Arc::new(AtomicU64::new(0)),
            }),
        })
    }

    /// Creates a media from a local path and sets it on the player
    pub fn load_media_from_path(&self, path: impl AsRef<Path>) -> EngineResult<Media> {
        self.core.ensure()?;
        let media = Media::from_path_shared(self.core.shared(), path.as_ref())?;
        self.inner.lock_state().media = Some(media.clone());
        Ok(media)
    }

    /// Creates a media from a URL and sets it on the player
    pub fn load_media_from_url(&self, url: impl Into<String>) -> EngineResult<Media> {
        self.core.ensure()?;
        let media = Media::from_url_shared(self.core.shared(), url.into())?;
        self.inner.lock_state().media = Some(media.clone());
        Ok(media)
    }

    /// Sets an existing media on the player
    pub fn set_media(&self, media: &Media) -> EngineResult<()> {
        self.core.ensure()?;
        media.parse_status().map(|_| ())?; // rejects released media
        self.inner.lock_state().media = Some(media.clone());
        Ok(())
    }

    /// Currently set media
    pub fn media(&self) -> EngineResult<Option<Media>> {
        self.core.ensure()?;
        Ok(self.inner.lock_state().media.clone())
    }

    /// Starts (or resumes) playback of the current media.
    ///
    /// Emits `MediaPlayerPlaying`; `MediaPlayerEndReached` follows once the
    /// media's duration elapses. Media without a known duration plays until
    /// stopped.
    pub fn play(&self) -> EngineResult<()> {
        self.core.ensure()?;

        // Never hold the state mutex while touching the worker mutex: the
        // playback thread locks state while processing commands, and
        // stop_worker joins that thread, so nesting the locks here can
        // deadlock against a concurrent stop().
        let (status, has_media) = {
            let state = self.inner.lock_state();
            (state.status, state.media.is_some())
        };
        match status {
            PlayerStatus::Playing => return Ok(()),
            PlayerStatus::Paused => {
                if let Some(worker) = self.inner.lock_worker().as_ref() {
                    worker.send(PlaybackCommand::Resume);
                    return Ok(());
                }
            }
            _ => {}
        }
        if !has_media {
            return Err(EngineError::OperationFailed("no media set".into()));
        }

        self.start_worker()
    }

    fn start_worker(&self) -> EngineResult<()> {
        self.inner.stop_worker();

        let duration = {
            let state = self.inner.lock_state();
            match &state.media {
                Some(media) => media.duration()?,
                None => return Err(EngineError::OperationFailed("no media set".into())),
            }
        };

        let (command_tx, command_rx) = bounded(16);
        let running = Arc::new(AtomicBool::new(true));

        let shared = Arc::clone(self.core.shared());
        let handle_id = self.core.id();
        let inner = Arc::clone(&self.inner);
        let running_clone = Arc::clone(&running);
        self.inner.position_ms.store(0, Ordering::Relaxed);

        let handle = thread::Builder::new()
            .name("mediabridge-playback".to_string())
            .spawn(move || {
                playback_loop(shared, handle_id, inner, duration, command_rx, running_clone);
            })
            .map_err(|e| EngineError::OperationFailed(format!("playback thread spawn: {}", e)))?;

        *self.inner.lock_worker() = Some(PlaybackWorker {
            handle: Some(handle),
            command_tx,
            running,
        });
        self.inner.lock_state().status = PlayerStatus::Playing;
        self.core.emit(EventKind::MediaPlayerPlaying, EventPayload::None);
        Ok(())
    }

    /// Pauses or resumes playback
    pub fn set_pause(&self, pause: bool) -> EngineResult<()> {
        self.core.ensure()?;
        if let Some(worker) = self.inner.lock_worker().as_ref() {
            if worker.is_running() {
                worker.send(if pause {
                    PlaybackCommand::Pause
                } else {
                    PlaybackCommand::Resume
                });
            }
        }
        Ok(())
    }

    /// Stops playback and resets the position
    pub fn stop(&self) -> EngineResult<()> {
        self.core.ensure()?;
        self.inner.stop_worker();
        let mut state = self.inner.lock_state();
        if state.status != PlayerStatus::Stopped {
            state.status = PlayerStatus::Stopped;
        }
        self.inner.position_ms.store(0, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock_state().status == PlayerStatus::Playing
    }

    pub fn status(&self) -> PlayerStatus {
        self.inner.lock_state().status
    }

    /// Playback position within the current media
    pub fn position(&self) -> Duration {
        Duration::from_millis(self.inner.position_ms.load(Ordering::Relaxed))
    }

    /// Seeks to an absolute position
    pub fn seek(&self, position: Duration) -> EngineResult<()> {
        self.core.ensure()?;
        match self.inner.lock_worker().as_ref() {
            Some(worker) if worker.is_running() => {
                worker.send(PlaybackCommand::Seek(position));
                Ok(())
            }
            _ => Err(EngineError::OperationFailed("player is not active".into())),
        }
    }

    pub fn set_volume(&self, volume: f32) -> EngineResult<()> {
        self.core.ensure()?;
        if !(0.0..=1.0).contains(&volume) {
            return Err(EngineError::OperationFailed(format!(
                "volume {} outside 0.0..=1.0",
                volume
            )));
        }
        self.inner.lock_state().volume = volume;
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.inner.lock_state().volume
    }

    /// Applies or clears the equalizer. `None` restores the flat default.
    pub fn set_equalizer(&self, equalizer: Option<&Equalizer>) -> EngineResult<()> {
        self.core.ensure()?;
        self.inner.lock_state().equalizer = equalizer.cloned();
        Ok(())
    }

    pub fn equalizer(&self) -> Option<Equalizer> {
        self.inner.lock_state().equalizer.clone()
    }

    /// Directs output to a discovered renderer. `None` restores local
    /// output.
    pub fn set_renderer(&self, renderer: Option<&Renderer>) -> EngineResult<()> {
        self.core.ensure()?;
        self.inner.lock_state().renderer = renderer.cloned();
        Ok(())
    }

    pub fn renderer(&self) -> Option<Renderer> {
        self.inner.lock_state().renderer.clone()
    }

    pub fn event_manager(&self) -> EventManager {
        self.core.event_manager()
    }

    /// Releases the handle, stopping playback first
    pub fn release(&self) -> EngineResult<()> {
        self.inner.stop_worker();
        self.core.release()
    }
}

fn playback_loop(
    shared: Arc<EngineShared>,
    handle_id: HandleId,
    inner: Arc<PlayerInner>,
    duration: Option<Duration>,
    command_rx: Receiver<PlaybackCommand>,
    running: Arc<AtomicBool>,
) {
    let mut playing = true;
    let mut position = Duration::ZERO;

    loop {
        if !shared.is_alive() {
            break;
        }

        match command_rx.try_recv() {
            Ok(PlaybackCommand::Pause) => {
                if playing {
                    playing = false;
                    inner.lock_state().status = PlayerStatus::Paused;
                    shared.emit(handle_id, EventKind::MediaPlayerPaused, EventPayload::None);
                }
            }
            Ok(PlaybackCommand::Resume) => {
                if !playing {
                    playing = true;
                    inner.lock_state().status = PlayerStatus::Playing;
                    shared.emit(handle_id, EventKind::MediaPlayerPlaying, EventPayload::None);
                }
            }
            Ok(PlaybackCommand::Seek(target)) => {
                position = target;
                inner
                    .position_ms
                    .store(position.as_millis() as u64, Ordering::Relaxed);
            }
            Ok(PlaybackCommand::Stop) => {
                inner.lock_state().status = PlayerStatus::Stopped;
                shared.emit(handle_id, EventKind::MediaPlayerStopped, EventPayload::None);
                break;
            }
            Err(_) => {}
        }

        if playing {
            position += TICK;
            inner
                .position_ms
                .store(position.as_millis() as u64, Ordering::Relaxed);

            if let Some(total) = duration {
                if position >= total {
                    inner.lock_state().status = PlayerStatus::Ended;
                    shared.emit(handle_id, EventKind::MediaPlayerEndReached, EventPayload::None);
                    log::debug!("playback of {} finished", handle_id);
                    break;
                }
            }
        }

        thread::sleep(TICK);
    }

    running.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineOptions;
    use crate::tracks::{ProbeReport, StaticTrackSource};

    fn engine_with_short_track(url: &str, millis: u64) -> Engine {
        let report = ProbeReport {
            duration: Some(Duration::from_millis(millis)),
            ..Default::default()
        };
        let source = StaticTrackSource::new().insert(url, report);
        Engine::init(EngineOptions::new().track_source(Box::new(source))).unwrap()
    }

    #[test]
    fn test_play_without_media_fails() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let player = Player::new(&engine).unwrap();
        assert!(player.play().is_err());
    }

    #[test]
    fn test_volume_bounds() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let player = Player::new(&engine).unwrap();
        assert!(player.set_volume(0.5).is_ok());
        assert_eq!(player.volume(), 0.5);
        assert!(player.set_volume(1.5).is_err());
        assert!(player.set_volume(-0.1).is_err());
    }

    #[test]
    fn test_equalizer_set_and_clear() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let player = Player::new(&engine).unwrap();

        let mut eq = Equalizer::new();
        eq.set_preamp(-3.0);
        player.set_equalizer(Some(&eq)).unwrap();
        assert_eq!(player.equalizer().unwrap().preamp(), -3.0);

        player.set_equalizer(None).unwrap();
        assert!(player.equalizer().is_none());
    }

    #[test]
    fn test_playback_reaches_end() {
        let url = "http://example.com/short.mp3";
        let engine = engine_with_short_track(url, 30);
        let player = Player::new(&engine).unwrap();
        let media = player.load_media_from_url(url).unwrap();
        media
            .parse_with_options(crate::media::ParseOptions {
                parse_local: true,
                parse_network: true,
            })
            .unwrap();

        let gate = crate::gate::CompletionGate::new();
        let observer = gate.clone();
        let manager = player.event_manager();
        let reg = manager
            .attach(EventKind::MediaPlayerEndReached, move |_event| {
                let _ = observer.close();
            })
            .unwrap();

        player.play().unwrap();
        assert!(gate.wait_timeout(Duration::from_secs(5)));
        manager.detach(&[reg]).unwrap();
        assert_eq!(player.status(), PlayerStatus::Ended);
    }

    #[test]
    fn test_stop_resets_position() {
        let url = "http://example.com/long.mp3";
        let engine = engine_with_short_track(url, 60_000);
        let player = Player::new(&engine).unwrap();
        let media = player.load_media_from_url(url).unwrap();
        media
            .parse_with_options(crate::media::ParseOptions {
                parse_local: true,
                parse_network: true,
            })
            .unwrap();

        player.play().unwrap();
        thread::sleep(Duration::from_millis(30));
        player.stop().unwrap();
        assert_eq!(player.status(), PlayerStatus::Stopped);
        assert_eq!(player.position(), Duration::ZERO);
    }

    #[test]
    fn test_racing_play_and_stop_on_paused_player() {
        use std::time::Instant;

        let url = "http://example.com/long.mp3";
        let engine = engine_with_short_track(url, 60_000);
        let player = Player::new(&engine).unwrap();
        let media = player.load_media_from_url(url).unwrap();
        media
            .parse_with_options(crate::media::ParseOptions {
                parse_local: true,
                parse_network: true,
            })
            .unwrap();

        for _ in 0..10 {
            player.play().unwrap();
            player.set_pause(true).unwrap();
            let deadline = Instant::now() + Duration::from_secs(2);
            while player.status() != PlayerStatus::Paused {
                assert!(Instant::now() < deadline, "player never paused");
                thread::sleep(Duration::from_millis(1));
            }

            // stop() joins the playback thread while play() resumes it;
            // both must finish no matter how the two interleave
            let stopper = player.clone();
            let join = thread::spawn(move || stopper.stop());
            thread::sleep(Duration::from_micros(200));
            player.play().unwrap();
            join.join().unwrap().unwrap();
            player.stop().unwrap();
        }
    }

    #[test]
    fn test_release_then_play_is_invalid_handle() {
        let engine = Engine::init(EngineOptions::new()).unwrap();
        let player = Player::new(&engine).unwrap();
        player.release().unwrap();
        assert!(matches!(player.play(), Err(EngineError::InvalidHandle(_))));
        assert!(matches!(
            player.release(),
            Err(EngineError::InvalidHandle(_))
        ));
    }
}
