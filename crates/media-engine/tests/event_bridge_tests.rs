//! Integration tests for the attach/dispatch/detach contract
//!
//! These tests exercise the full path from an operation on a handle to a
//! callback invocation on the dispatcher thread, and the guarantees that
//! hold around detach.

use mediabridge_engine::{
    CompletionGate, Engine, EngineError, EngineOptions, EventKind, EventPayload, Media,
    ParseOptions, ParseStatus, Player, ProbeReport, StaticTrackSource,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn engine_with_fixture(url: &str, millis: u64) -> Engine {
    let report = ProbeReport {
        duration: Some(Duration::from_millis(millis)),
        ..Default::default()
    };
    let source = StaticTrackSource::new().insert(url, report);
    Engine::init(EngineOptions::new().track_source(Box::new(source)))
        .expect("engine init failed")
}

fn network_options() -> ParseOptions {
    ParseOptions {
        parse_local: true,
        parse_network: true,
    }
}

#[test]
fn test_callbacks_run_on_dispatcher_thread() {
    let url = "http://example.com/a.mp3";
    let engine = engine_with_fixture(url, 1_000);
    let media = Media::from_url(&engine, url).expect("media creation failed");

    let gate = CompletionGate::new();
    let observer = gate.clone();
    let seen_thread = Arc::new(Mutex::new(None));
    let seen_clone = Arc::clone(&seen_thread);

    let manager = media.event_manager();
    let reg = manager
        .attach(EventKind::MediaParsedChanged, move |_event| {
            *seen_clone.lock().unwrap() = thread::current().name().map(String::from);
            let _ = observer.close();
        })
        .expect("attach failed");

    media.parse_with_options(network_options()).expect("parse failed");
    assert!(gate.wait_timeout(Duration::from_secs(5)));
    manager.detach(&[reg]).expect("detach failed");

    let name = seen_thread.lock().unwrap().clone();
    assert_eq!(name.as_deref(), Some("mediabridge-dispatch"));
}

#[test]
fn test_parse_async_delivers_final_status() {
    let url = "http://example.com/b.mp3";
    let engine = engine_with_fixture(url, 1_000);
    let media = Media::from_url(&engine, url).expect("media creation failed");

    let gate = CompletionGate::new();
    let observer = gate.clone();
    let status = Arc::new(Mutex::new(None));
    let status_clone = Arc::clone(&status);

    let manager = media.event_manager();
    let reg = manager
        .attach(EventKind::MediaParsedChanged, move |event| {
            if let EventPayload::ParseStatus(s) = event.payload {
                *status_clone.lock().unwrap() = Some(s);
            }
            let _ = observer.close();
        })
        .expect("attach failed");

    media.parse_async(network_options()).expect("parse_async failed");
    assert!(gate.wait_timeout(Duration::from_secs(5)));
    manager.detach(&[reg]).expect("detach failed");

    assert_eq!(*status.lock().unwrap(), Some(ParseStatus::Done));
    assert_eq!(media.parse_status().expect("status failed"), ParseStatus::Done);
}

#[test]
fn test_detach_stops_callback_delivery() {
    let url = "http://example.com/c.mp3";
    let engine = engine_with_fixture(url, 1_000);
    let media = Media::from_url(&engine, url).expect("media creation failed");

    let count = Arc::new(Mutex::new(0u32));
    let count_clone = Arc::clone(&count);
    let manager = media.event_manager();
    let reg = manager
        .attach(EventKind::MediaParsedChanged, move |_event| {
            *count_clone.lock().unwrap() += 1;
        })
        .expect("attach failed");

    media.parse_with_options(network_options()).expect("parse failed");
    manager.detach(&[reg]).expect("detach failed");
    let after_detach = *count.lock().unwrap();

    // Further parses must not reach the removed registration
    media.parse_with_options(network_options()).expect("parse failed");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(*count.lock().unwrap(), after_detach);
}

#[test]
fn test_detach_unknown_registration_fails() {
    let url = "http://example.com/d.mp3";
    let engine = engine_with_fixture(url, 1_000);
    let media = Media::from_url(&engine, url).expect("media creation failed");

    let manager = media.event_manager();
    let reg = manager
        .attach(EventKind::MediaParsedChanged, |_event| {})
        .expect("attach failed");
    manager.detach(&[reg]).expect("detach failed");
    assert!(manager.detach(&[reg]).is_err());
}

#[test]
fn test_attach_unsupported_kind_fails() {
    let engine = Engine::init(EngineOptions::new()).expect("engine init failed");
    let media = Media::from_url(&engine, "http://example.com/e.mp3").expect("media failed");

    // Player events never fire on a media handle
    let result = media
        .event_manager()
        .attach(EventKind::MediaPlayerEndReached, |_event| {});
    assert!(matches!(result, Err(EngineError::UnsupportedEvent { .. })));
}

#[test]
fn test_events_arrive_in_emission_order() {
    let url = "http://example.com/f.mp3";
    let engine = engine_with_fixture(url, 40);
    let player = Player::new(&engine).expect("player creation failed");
    let media = player.load_media_from_url(url).expect("load failed");
    media.parse_with_options(network_options()).expect("parse failed");

    let order = Arc::new(Mutex::new(Vec::new()));
    let done = CompletionGate::new();

    let manager = player.event_manager();
    let order_clone = Arc::clone(&order);
    let playing_reg = manager
        .attach(EventKind::MediaPlayerPlaying, move |event| {
            order_clone.lock().unwrap().push(event.kind);
        })
        .expect("attach failed");
    let order_clone = Arc::clone(&order);
    let done_clone = done.clone();
    let end_reg = manager
        .attach(EventKind::MediaPlayerEndReached, move |event| {
            order_clone.lock().unwrap().push(event.kind);
            let _ = done_clone.close();
        })
        .expect("attach failed");

    player.play().expect("play failed");
    assert!(done.wait_timeout(Duration::from_secs(5)));
    manager.detach(&[playing_reg, end_reg]).expect("detach failed");

    assert_eq!(
        *order.lock().unwrap(),
        vec![EventKind::MediaPlayerPlaying, EventKind::MediaPlayerEndReached]
    );
}

#[test]
fn test_multiple_registrations_all_invoked() {
    let url = "http://example.com/g.mp3";
    let engine = engine_with_fixture(url, 1_000);
    let media = Media::from_url(&engine, url).expect("media creation failed");

    let first = CompletionGate::new();
    let second = CompletionGate::new();
    let manager = media.event_manager();
    let first_clone = first.clone();
    let reg_a = manager
        .attach(EventKind::MediaParsedChanged, move |_event| {
            let _ = first_clone.close();
        })
        .expect("attach failed");
    let second_clone = second.clone();
    let reg_b = manager
        .attach(EventKind::MediaParsedChanged, move |_event| {
            let _ = second_clone.close();
        })
        .expect("attach failed");

    media.parse_with_options(network_options()).expect("parse failed");
    assert!(first.wait_timeout(Duration::from_secs(5)));
    assert!(second.wait_timeout(Duration::from_secs(5)));
    manager.detach(&[reg_a, reg_b]).expect("detach failed");
}

#[test]
fn test_metrics_count_dispatches() {
    let url = "http://example.com/h.mp3";
    let engine = engine_with_fixture(url, 1_000);
    let media = Media::from_url(&engine, url).expect("media creation failed");

    let gate = CompletionGate::new();
    let observer = gate.clone();
    let manager = media.event_manager();
    let reg = manager
        .attach(EventKind::MediaParsedChanged, move |_event| {
            let _ = observer.close();
        })
        .expect("attach failed");

    media.parse_with_options(network_options()).expect("parse failed");
    assert!(gate.wait_timeout(Duration::from_secs(5)));
    manager.detach(&[reg]).expect("detach failed");

    let snapshot = engine.metrics();
    assert!(snapshot.events_dispatched >= 1);
    assert!(snapshot.callbacks_invoked >= 1);
    assert!(snapshot.handles_created >= 1);
}
