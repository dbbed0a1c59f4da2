//! Track records and the track probing seam
//!
//! Parsing a media yields one fixed-shape record per elementary stream.
//! Local audio files are probed with Symphonia; embedders (and the test
//! suites) can install a `StaticTrackSource` with canned reports for
//! locations Symphonia cannot inspect.

use crate::media::{MediaLocation, MediaMeta};
use mediabridge_core::Rational;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey};
use symphonia::core::probe::Hint;

/// Type-tagged payload of a track record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackKind {
    Audio {
        channels: u32,
        rate: u32,
    },
    Video {
        width: u32,
        height: u32,
        aspect_ratio: Rational,
        frame_rate: Rational,
        orientation: VideoOrientation,
        projection: VideoProjection,
        viewpoint: Option<Viewpoint>,
    },
    Subtitle {
        encoding: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoOrientation {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    LeftTop,
    LeftBottom,
    RightTop,
    RightBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoProjection {
    Rectangular,
    Equirectangular,
    CubemapLayoutStandard,
}

/// Viewing pose for 360-degree video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub fov: f32,
}

/// One elementary stream of a parsed media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaTrack {
    pub id: i32,
    /// Bits per second; 0 when the container does not report it
    pub bit_rate: u32,
    pub codec: String,
    pub original_codec: String,
    pub profile: i32,
    pub level: i32,
    pub language: Option<String>,
    pub description: Option<String>,
    pub kind: TrackKind,
}

impl MediaTrack {
    pub fn is_audio(&self) -> bool {
        matches!(self.kind, TrackKind::Audio { .. })
    }

    pub fn is_video(&self) -> bool {
        matches!(self.kind, TrackKind::Video { .. })
    }

    pub fn is_subtitle(&self) -> bool {
        matches!(self.kind, TrackKind::Subtitle { .. })
    }
}

/// Everything a successful parse learns about a media
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub duration: Option<Duration>,
    pub meta: HashMap<MediaMeta, String>,
    pub tracks: Vec<MediaTrack>,
}

/// Result of asking a track source about a location
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// The source inspected the media
    Parsed(ProbeReport),
    /// The source does not handle this location
    Unhandled,
    /// The source tried and failed
    Failed(String),
}

/// The probing seam between media handles and whatever understands the
/// bytes behind a location
pub trait TrackSource: Send + Sync {
    fn probe(&self, location: &MediaLocation) -> ProbeOutcome;
}

/// Default track source: probes local audio files with Symphonia.
///
/// URLs are unhandled (network fetching is not this layer's job) and land
/// in `ParseStatus::Skipped` unless another source claims them.
pub struct SymphoniaTrackSource {
    format_opts: FormatOptions,
    metadata_opts: MetadataOptions,
}

impl SymphoniaTrackSource {
    pub fn new() -> Self {
        Self {
            format_opts: FormatOptions::default(),
            metadata_opts: MetadataOptions::default(),
        }
    }

    fn probe_file(&self, path: &Path) -> ProbeOutcome {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return ProbeOutcome::Failed(format!("open {}: {}", path.display(), e)),
        };

        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = match symphonia::default::get_probe().format(
            &hint,
            mss,
            &self.format_opts,
            &self.metadata_opts,
        ) {
            Ok(probed) => probed,
            Err(e) => return ProbeOutcome::Failed(format!("probe {}: {}", path.display(), e)),
        };

        let mut report = ProbeReport::default();

        for (index, track) in probed.format.tracks().iter().enumerate() {
            let params = &track.codec_params;
            let (channels, rate) = match (params.channels, params.sample_rate) {
                (Some(channels), Some(rate)) => (channels.count() as u32, rate),
                // Streams symphonia cannot type are not audio records
                _ => continue,
            };

            if report.duration.is_none() {
                if let (Some(n_frames), Some(tb)) = (params.n_frames, params.time_base) {
                    let time = tb.calc_time(n_frames);
                    report.duration =
                        Some(Duration::from_secs_f64(time.seconds as f64 + time.frac));
                }
            }

            report.tracks.push(MediaTrack {
                id: index as i32,
                bit_rate: 0,
                codec: format!("{:?}", params.codec),
                original_codec: format!("{:?}", params.codec),
                profile: 0,
                level: 0,
                language: track.language.clone(),
                description: None,
                kind: TrackKind::Audio { channels, rate },
            });
        }

        if report.tracks.is_empty() {
            return ProbeOutcome::Failed(format!("no decodable tracks in {}", path.display()));
        }

        if let Some(revision) = probed.format.metadata().current() {
            for tag in revision.tags() {
                let key = match tag.std_key {
                    Some(StandardTagKey::TrackTitle) => MediaMeta::Title,
                    Some(StandardTagKey::Artist) => MediaMeta::Artist,
                    Some(StandardTagKey::Album) => MediaMeta::Album,
                    Some(StandardTagKey::Genre) => MediaMeta::Genre,
                    Some(StandardTagKey::Date) => MediaMeta::Date,
                    _ => continue,
                };
                report.meta.entry(key).or_insert_with(|| tag.value.to_string());
            }
        }

        ProbeOutcome::Parsed(report)
    }
}

impl TrackSource for SymphoniaTrackSource {
    fn probe(&self, location: &MediaLocation) -> ProbeOutcome {
        match location {
            MediaLocation::Path(path) => self.probe_file(path),
            MediaLocation::Url(_) => ProbeOutcome::Unhandled,
        }
    }
}

impl Default for SymphoniaTrackSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Track source backed by canned reports, keyed by location string.
///
/// Locations without an entry fall through as unhandled.
#[derive(Default)]
pub struct StaticTrackSource {
    reports: HashMap<String, ProbeReport>,
}

impl StaticTrackSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, location: impl Into<String>, report: ProbeReport) -> Self {
        self.reports.insert(location.into(), report);
        self
    }
}

impl TrackSource for StaticTrackSource {
    fn probe(&self, location: &MediaLocation) -> ProbeOutcome {
        match self.reports.get(&location.to_string()) {
            Some(report) => ProbeOutcome::Parsed(report.clone()),
            None => ProbeOutcome::Unhandled,
        }
    }
}
