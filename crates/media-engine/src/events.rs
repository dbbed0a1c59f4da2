//! Event kinds, registrations and the dispatcher thread
//!
//! Engine workers never invoke user callbacks directly. They push
//! `(handle, kind, payload)` messages onto a crossbeam channel and a single
//! dispatcher thread owned by the context invokes the registered callbacks
//! in arrival order. Callbacks receive an `Event` value only, with no
//! reference back to the emitting resource, so stopping or releasing that
//! resource from inside a callback is impossible by construction.

use crate::discovery::Renderer;
use crate::error::{EngineError, EngineResult};
use crate::gate::CompletionGate;
use crate::handle::HandleKind;
use crate::media::ParseStatus;
use crate::metrics::EngineMetrics;
use crossbeam_channel::Receiver;
use mediabridge_core::{HandleId, RegistrationId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Kind of asynchronous notification a handle can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MediaParsedChanged,
    MediaPlayerPlaying,
    MediaPlayerPaused,
    MediaPlayerStopped,
    MediaPlayerEndReached,
    MediaListPlayerPlayed,
    MediaListPlayerNextItemSet,
    MediaListItemAdded,
    MediaListItemDeleted,
    RendererDiscovererItemAdded,
    RendererDiscovererItemDeleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MediaParsedChanged => "MediaParsedChanged",
            Self::MediaPlayerPlaying => "MediaPlayerPlaying",
            Self::MediaPlayerPaused => "MediaPlayerPaused",
            Self::MediaPlayerStopped => "MediaPlayerStopped",
            Self::MediaPlayerEndReached => "MediaPlayerEndReached",
            Self::MediaListPlayerPlayed => "MediaListPlayerPlayed",
            Self::MediaListPlayerNextItemSet => "MediaListPlayerNextItemSet",
            Self::MediaListItemAdded => "MediaListItemAdded",
            Self::MediaListItemDeleted => "MediaListItemDeleted",
            Self::RendererDiscovererItemAdded => "RendererDiscovererItemAdded",
            Self::RendererDiscovererItemDeleted => "RendererDiscovererItemDeleted",
        };
        write!(f, "{}", name)
    }
}

/// Returns true if `handle` handles emit `kind` events
pub(crate) fn kind_supported(handle: HandleKind, kind: EventKind) -> bool {
    use EventKind::*;
    match handle {
        HandleKind::Media => matches!(kind, MediaParsedChanged),
        HandleKind::Player => matches!(
            kind,
            MediaPlayerPlaying | MediaPlayerPaused | MediaPlayerStopped | MediaPlayerEndReached
        ),
        HandleKind::ListPlayer => {
            matches!(kind, MediaListPlayerPlayed | MediaListPlayerNextItemSet)
        }
        HandleKind::MediaList => matches!(kind, MediaListItemAdded | MediaListItemDeleted),
        HandleKind::RendererDiscoverer => matches!(
            kind,
            RendererDiscovererItemAdded | RendererDiscovererItemDeleted
        ),
        // Media discoverers surface their items through their media list
        HandleKind::MediaDiscoverer => false,
    }
}

/// Engine-supplied payload delivered with an event.
///
/// Payloads are plain values; they stay valid after the callback returns but
/// carry no capability to call back into the engine.
#[derive(Debug, Clone)]
pub enum EventPayload {
    None,
    ParseStatus(ParseStatus),
    ListItem { location: String, index: usize },
    Renderer(Renderer),
}

/// One delivered notification
#[derive(Debug, Clone)]
pub struct Event {
    pub handle: HandleId,
    pub kind: EventKind,
    pub payload: EventPayload,
}

pub(crate) type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

struct Registration {
    id: RegistrationId,
    kind: EventKind,
    callback: EventCallback,
}

/// All registrations of one engine context, keyed by handle
#[derive(Default)]
pub(crate) struct EventRegistry {
    registrations: HashMap<HandleId, Vec<Registration>>,
    next_id: u64,
}

impl EventRegistry {
    pub fn attach(
        &mut self,
        handle: HandleId,
        kind: EventKind,
        callback: EventCallback,
    ) -> RegistrationId {
        self.next_id += 1;
        let id = RegistrationId::from_raw(self.next_id);
        self.registrations
            .entry(handle)
            .or_default()
            .push(Registration { id, kind, callback });
        id
    }

    /// Removes one registration. Unknown ids report `OperationFailed`.
    pub fn detach(&mut self, handle: HandleId, id: RegistrationId) -> EngineResult<()> {
        let regs = self
            .registrations
            .get_mut(&handle)
            .ok_or_else(|| EngineError::OperationFailed(format!("unknown registration {}", id)))?;
        let before = regs.len();
        regs.retain(|r| r.id != id);
        if regs.len() == before {
            return Err(EngineError::OperationFailed(format!(
                "unknown registration {}",
                id
            )));
        }
        Ok(())
    }

    /// Drops every registration of a handle. Called at handle release.
    pub fn remove_handle(&mut self, handle: HandleId) {
        self.registrations.remove(&handle);
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
    }

    fn callbacks_for(&self, handle: HandleId, kind: EventKind) -> Vec<EventCallback> {
        self.registrations
            .get(&handle)
            .map(|regs| {
                regs.iter()
                    .filter(|r| r.kind == kind)
                    .map(|r| Arc::clone(&r.callback))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Messages consumed by the dispatcher thread
pub(crate) enum DispatchMessage {
    Event(Event),
    /// Closed once every previously queued message has been processed.
    /// Detach uses this to guarantee no callback runs after it returns.
    Barrier(CompletionGate),
    Shutdown,
}

/// The dispatcher loop. Runs on its own thread for the lifetime of the
/// engine context.
pub(crate) fn dispatch_loop(
    rx: Receiver<DispatchMessage>,
    registry: Arc<Mutex<EventRegistry>>,
    metrics: Arc<EngineMetrics>,
) {
    log::debug!("event dispatcher started");
    for message in rx.iter() {
        match message {
            DispatchMessage::Event(event) => {
                let callbacks = match registry.lock() {
                    Ok(guard) => guard.callbacks_for(event.handle, event.kind),
                    Err(poisoned) => poisoned.into_inner().callbacks_for(event.handle, event.kind),
                };
                metrics.record_event_dispatched();
                for callback in callbacks {
                    callback(&event);
                    metrics.record_callback_invoked();
                }
            }
            DispatchMessage::Barrier(gate) => {
                // A detach barrier may race a second one for the same gate
                let _ = gate.close();
            }
            DispatchMessage::Shutdown => break,
        }
    }
    log::debug!("event dispatcher stopped");
}
