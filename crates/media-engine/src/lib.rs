//! Media engine context, handles and the event bridge.
//!
//! An [`Engine`] context owns a handle table and a single event dispatcher
//! thread. Resources created from it (media, players, lists, discoverers)
//! emit typed events; callbacks attach through each resource's
//! [`EventManager`] and run on the dispatcher thread. [`CompletionGate`]
//! carries completion signals from callbacks back to control flow.

pub mod context;
pub mod discovery;
pub mod equalizer;
pub mod error;
pub mod events;
pub mod gate;
pub mod handle;
pub mod list_player;
pub mod media;
pub mod metrics;
pub mod player;
pub mod tracks;

pub use mediabridge_core::{HandleId, Rational, RegistrationId};

pub use context::{Engine, EngineOptions, EventManager};
pub use discovery::{
    find_renderer, DiscoveryState, LocalDirsProvider, MediaDiscoverer, MediaDiscovererDescriptor,
    MediaDiscoveryCategory, MediaProvider, MediaSink, Renderer, RendererDescriptor,
    RendererDiscoverer, RendererKind, RendererProvider, RendererSink, ScriptedRendererProvider,
    SilentRendererProvider,
};
pub use equalizer::Equalizer;
pub use error::{EngineError, EngineResult};
pub use events::{Event, EventKind, EventPayload};
pub use gate::CompletionGate;
pub use handle::HandleKind;
pub use list_player::{ListPlayer, MediaList};
pub use media::{Media, MediaLocation, MediaMeta, ParseOptions, ParseStatus};
pub use metrics::MetricsSnapshot;
pub use player::{Player, PlayerStatus};
pub use tracks::{
    MediaTrack, ProbeOutcome, ProbeReport, StaticTrackSource, SymphoniaTrackSource, TrackKind,
    TrackSource, VideoOrientation, VideoProjection, Viewpoint,
};
