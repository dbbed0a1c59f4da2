//! Integration tests for the parse flow and track introspection

use mediabridge_engine::{
    Engine, EngineError, EngineOptions, Media, MediaMeta, ParseOptions, ParseStatus, ProbeReport,
    Rational, StaticTrackSource, TrackKind, VideoOrientation, VideoProjection,
};
use mediabridge_engine::MediaTrack;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::time::Duration;

fn network_options() -> ParseOptions {
    ParseOptions {
        parse_local: true,
        parse_network: true,
    }
}

fn movie_report() -> ProbeReport {
    let mut meta = HashMap::new();
    meta.insert(MediaMeta::Title, "Test Movie".to_string());
    meta.insert(MediaMeta::Artist, "Test Studio".to_string());
    ProbeReport {
        duration: Some(Duration::from_secs(5_400)),
        meta,
        tracks: vec![
            MediaTrack {
                id: 0,
                bit_rate: 192_000,
                codec: "mp4a".to_string(),
                original_codec: "mp4a".to_string(),
                profile: 2,
                level: 0,
                language: Some("en".to_string()),
                description: Some("Stereo".to_string()),
                kind: TrackKind::Audio {
                    channels: 2,
                    rate: 48_000,
                },
            },
            MediaTrack {
                id: 1,
                bit_rate: 4_500_000,
                codec: "h264".to_string(),
                original_codec: "h264".to_string(),
                profile: 100,
                level: 41,
                language: None,
                description: None,
                kind: TrackKind::Video {
                    width: 1_920,
                    height: 1_080,
                    aspect_ratio: Rational::new(16, 9),
                    frame_rate: Rational::new(24_000, 1_001),
                    orientation: VideoOrientation::TopLeft,
                    projection: VideoProjection::Rectangular,
                    viewpoint: None,
                },
            },
        ],
    }
}

#[test]
fn test_parsed_media_exposes_all_track_fields() {
    let url = "http://example.com/movie.mp4";
    let source = StaticTrackSource::new().insert(url, movie_report());
    let engine = Engine::init(EngineOptions::new().track_source(Box::new(source)))
        .expect("engine init failed");

    let media = Media::from_url(&engine, url).expect("media failed");
    let status = media.parse_with_options(network_options()).expect("parse failed");
    assert_eq!(status, ParseStatus::Done);

    let tracks = media.tracks().expect("tracks failed");
    assert_eq!(tracks.len(), 2);

    let audio = tracks.iter().find(|t| t.is_audio()).expect("no audio track");
    assert_eq!(audio.id, 0);
    assert_eq!(audio.language.as_deref(), Some("en"));
    match audio.kind {
        TrackKind::Audio { channels, rate } => {
            assert_eq!(channels, 2);
            assert_eq!(rate, 48_000);
        }
        _ => panic!("expected audio kind"),
    }

    let video = tracks.iter().find(|t| t.is_video()).expect("no video track");
    assert_eq!(video.bit_rate, 4_500_000);
    match &video.kind {
        TrackKind::Video {
            width,
            height,
            aspect_ratio,
            frame_rate,
            ..
        } => {
            assert_eq!((*width, *height), (1_920, 1_080));
            assert_eq!(*aspect_ratio, Rational::new(16, 9));
            assert_eq!(*frame_rate, Rational::new(24_000, 1_001));
        }
        _ => panic!("expected video kind"),
    }
}

#[test]
fn test_parsed_media_exposes_meta_and_duration() {
    let url = "http://example.com/movie.mp4";
    let source = StaticTrackSource::new().insert(url, movie_report());
    let engine = Engine::init(EngineOptions::new().track_source(Box::new(source)))
        .expect("engine init failed");

    let media = Media::from_url(&engine, url).expect("media failed");
    media.parse_with_options(network_options()).expect("parse failed");

    assert_eq!(
        media.meta(MediaMeta::Title).expect("meta failed").as_deref(),
        Some("Test Movie")
    );
    assert_eq!(media.meta(MediaMeta::Album).expect("meta failed"), None);
    assert_eq!(
        media.duration().expect("duration failed"),
        Some(Duration::from_secs(5_400))
    );
}

#[test]
fn test_unprobed_location_parse_is_skipped() {
    let engine = Engine::init(EngineOptions::new()).expect("engine init failed");
    let media =
        Media::from_url(&engine, "rtsp://example.com/live").expect("media failed");
    let status = media.parse_with_options(network_options()).expect("parse failed");
    assert_eq!(status, ParseStatus::Skipped);
    assert!(matches!(
        media.tracks(),
        Err(EngineError::ParseFailed(ParseStatus::Skipped))
    ));
}

/// Minimal mono 16-bit PCM WAV: 44-byte header plus silent samples
fn write_wav(path: &std::path::Path, sample_rate: u32, samples: u32) {
    let data_len = samples * 2;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);

    let mut file = File::create(path).expect("fixture create failed");
    file.write_all(&bytes).expect("fixture write failed");
}

#[test]
fn test_default_source_probes_real_wav() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("tone.wav");
    write_wav(&path, 44_100, 44_100);

    let engine = Engine::init(EngineOptions::new()).expect("engine init failed");
    let media = Media::from_path(&engine, &path).expect("media failed");
    let status = media.parse().expect("parse failed");
    assert_eq!(status, ParseStatus::Done);

    let tracks = media.tracks().expect("tracks failed");
    assert_eq!(tracks.len(), 1);
    match tracks[0].kind {
        TrackKind::Audio { channels, rate } => {
            assert_eq!(channels, 1);
            assert_eq!(rate, 44_100);
        }
        _ => panic!("expected audio track"),
    }
    assert_eq!(
        media.duration().expect("duration failed"),
        Some(Duration::from_secs(1))
    );
}

#[test]
fn test_garbage_file_parse_fails() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("garbage.mp3");
    std::fs::write(&path, b"this is not audio").expect("fixture write failed");

    let engine = Engine::init(EngineOptions::new()).expect("engine init failed");
    let media = Media::from_path(&engine, &path).expect("media failed");
    let status = media.parse().expect("parse failed");
    assert_eq!(status, ParseStatus::Failed);
}
