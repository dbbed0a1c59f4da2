//! Media lists and sequential list playback
//!
//! A list player walks a media list with its embedded player, announcing
//! `MediaListPlayerNextItemSet` per item and `MediaListPlayerPlayed` when
//! the end of the list is reached.

use crate::context::{Engine, EngineShared, EventManager, ResourceCore};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventKind, EventPayload};
use crate::gate::CompletionGate;
use crate::handle::HandleKind;
use crate::media::Media;
use crate::player::Player;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// An ordered collection of media handles
#[derive(Clone)]
pub struct MediaList {
    core: Arc<ResourceCore>,
    items: Arc<Mutex<Vec<Media>>>,
}

impl MediaList {
    pub fn new(engine: &Engine) -> EngineResult<Self> {
        Self::register(engine.shared())
    }

    pub(crate) fn register(shared: &Arc<EngineShared>) -> EngineResult<Self> {
        let core = ResourceCore::register(shared, HandleKind::MediaList)?;
        Ok(Self {
            core,
            items: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Appends a media, announcing `MediaListItemAdded`
    pub fn add_media(&self, media: &Media) -> EngineResult<()> {
        self.core.ensure()?;
        let location = media.location()?;
        let index = {
            let mut items = self.lock_items();
            items.push(media.clone());
            items.len() - 1
        };
        self.core.emit(
            EventKind::MediaListItemAdded,
            EventPayload::ListItem { location, index },
        );
        Ok(())
    }

    /// Inserts a media at `index`, announcing `MediaListItemAdded`
    pub fn insert_media(&self, media: &Media, index: usize) -> EngineResult<()> {
        self.core.ensure()?;
        let location = media.location()?;
        {
            let mut items = self.lock_items();
            if index > items.len() {
                return Err(EngineError::OperationFailed(format!(
                    "insert index {} out of bounds ({} items)",
                    index,
                    items.len()
                )));
            }
            items.insert(index, media.clone());
        }
        self.core.emit(
            EventKind::MediaListItemAdded,
            EventPayload::ListItem { location, index },
        );
        Ok(())
    }

    /// Removes the media at `index`, announcing `MediaListItemDeleted`
    pub fn remove_at(&self, index: usize) -> EngineResult<()> {
        self.core.ensure()?;
        let removed = {
            let mut items = self.lock_items();
            if index >= items.len() {
                return Err(EngineError::OperationFailed(format!(
                    "remove index {} out of bounds ({} items)",
                    index,
                    items.len()
                )));
            }
            items.remove(index)
        };
        let location = removed.location().unwrap_or_default();
        self.core.emit(
            EventKind::MediaListItemDeleted,
            EventPayload::ListItem { location, index },
        );
        Ok(())
    }

    pub fn media_at(&self, index: usize) -> EngineResult<Option<Media>> {
        self.core.ensure()?;
        Ok(self.lock_items().get(index).cloned())
    }

    pub fn count(&self) -> EngineResult<usize> {
        self.core.ensure()?;
        Ok(self.lock_items().len())
    }

    pub fn event_manager(&self) -> EventManager {
        self.core.event_manager()
    }

    pub fn release(&self) -> EngineResult<()> {
        self.core.release()
    }

    pub(crate) fn snapshot(&self) -> Vec<Media> {
        self.lock_items().clone()
    }

    fn lock_items(&self) -> std::sync::MutexGuard<'_, Vec<Media>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

struct ListWorker {
    handle: Option<thread::JoinHandle<()>>,
    stop_tx: Sender<()>,
    running: Arc<AtomicBool>,
}

impl ListWorker {
    fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct ListPlayerInner {
    player: Player,
    list: Mutex<Option<MediaList>>,
    worker: Mutex<Option<ListWorker>>,
}

impl ListPlayerInner {
    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<ListWorker>> {
        match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn stop_worker(&self) {
        if let Some(mut worker) = self.lock_worker().take() {
            worker.stop();
        }
    }
}

impl Drop for ListPlayerInner {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// A player that walks a media list sequentially
#[derive(Clone)]
pub struct ListPlayer {
    core: Arc<ResourceCore>,
    inner: Arc<ListPlayerInner>,
}

impl ListPlayer {
    pub fn new(engine: &Engine) -> EngineResult<Self> {
        let shared = engine.shared();
        let core = ResourceCore::register(shared, HandleKind::ListPlayer)?;
        let player = Player::register(shared)?;
        Ok(Self {
            core,
            inner: Arc::new(ListPlayerInner {
                player,
                list: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        })
    }

    pub fn set_media_list(&self, list: &MediaList) -> EngineResult<()> {
        self.core.ensure()?;
        list.count().map(|_| ())?; // rejects released lists
        *self.lock_list() = Some(list.clone());
        Ok(())
    }

    /// The embedded player. Useful inside `MediaListPlayerNextItemSet`
    /// handlers to inspect the currently playing media.
    pub fn player(&self) -> EngineResult<Player> {
        self.core.ensure()?;
        Ok(self.inner.player.clone())
    }

    /// Plays the list from the beginning
    pub fn play(&self) -> EngineResult<()> {
        self.play_at_index(0)
    }

    /// Plays the list starting at `index`
    pub fn play_at_index(&self, index: usize) -> EngineResult<()> {
        self.core.ensure()?;

        let items = {
            let guard = self.lock_list();
            let list = guard
                .as_ref()
                .ok_or_else(|| EngineError::OperationFailed("no media list set".into()))?;
            list.snapshot()
        };
        if index >= items.len() {
            return Err(EngineError::OperationFailed(format!(
                "start index {} out of bounds ({} items)",
                index,
                items.len()
            )));
        }

        self.inner.stop_worker();

        let (stop_tx, stop_rx) = bounded(1);
        let running = Arc::new(AtomicBool::new(true));
        let shared = Arc::clone(self.core.shared());
        let handle_id = self.core.id();
        let player = self.inner.player.clone();
        let running_clone = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("mediabridge-listplay".to_string())
            .spawn(move || {
                list_loop(shared, handle_id, player, items, index, stop_rx, running_clone);
            })
            .map_err(|e| EngineError::OperationFailed(format!("list thread spawn: {}", e)))?;

        *self.inner.lock_worker() = Some(ListWorker {
            handle: Some(handle),
            stop_tx,
            running,
        });
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.inner
            .lock_worker()
            .as_ref()
            .map(|w| w.running.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Stops list playback and the embedded player
    pub fn stop(&self) -> EngineResult<()> {
        self.core.ensure()?;
        self.inner.stop_worker();
        self.inner.player.stop()
    }

    pub fn event_manager(&self) -> EventManager {
        self.core.event_manager()
    }

    /// Releases the list player and its embedded player
    pub fn release(&self) -> EngineResult<()> {
        self.inner.stop_worker();
        let _ = self.inner.player.release();
        self.core.release()
    }

    fn lock_list(&self) -> std::sync::MutexGuard<'_, Option<MediaList>> {
        match self.inner.list.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn list_loop(
    shared: Arc<EngineShared>,
    handle_id: mediabridge_core::HandleId,
    player: Player,
    items: Vec<Media>,
    start: usize,
    stop_rx: Receiver<()>,
    running: Arc<AtomicBool>,
) {
    let mut stopped = false;

    for (offset, media) in items[start..].iter().enumerate() {
        if !shared.is_alive() || stop_rx.try_recv().is_ok() {
            stopped = true;
            break;
        }

        let index = start + offset;
        let location = match media.location() {
            Ok(location) => location,
            Err(e) => {
                log::warn!("skipping released media at index {}: {}", index, e);
                continue;
            }
        };

        if player.set_media(media).is_err() {
            continue;
        }
        shared.emit(
            handle_id,
            EventKind::MediaListPlayerNextItemSet,
            EventPayload::ListItem { location, index },
        );

        // Items without a known duration cannot signal their own end in a
        // list context; announce them and move on.
        let has_duration = matches!(media.duration(), Ok(Some(_)));
        if !has_duration {
            continue;
        }

        let gate = CompletionGate::new();
        let observer = gate.clone();
        let manager = player.event_manager();
        let registration =
            match manager.attach(EventKind::MediaPlayerEndReached, move |_event| {
                let _ = observer.close();
            }) {
                Ok(registration) => registration,
                Err(_) => continue,
            };

        if player.play().is_err() {
            let _ = manager.detach(&[registration]);
            continue;
        }

        loop {
            if gate.wait_timeout(Duration::from_millis(10)) {
                break;
            }
            if !shared.is_alive() || stop_rx.try_recv().is_ok() {
                let _ = player.stop();
                stopped = true;
                break;
            }
        }
        let _ = manager.detach(&[registration]);
        if stopped {
            break;
        }
    }

    if !stopped {
        shared.emit(handle_id, EventKind::MediaListPlayerPlayed, EventPayload::None);
    }
    running.store(false, Ordering::Relaxed);
}
