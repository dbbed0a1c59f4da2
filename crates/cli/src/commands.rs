//! Command implementations
//!
//! Each command follows the same shape: build an engine from the config,
//! create the handles it needs, attach callbacks that signal a
//! `CompletionGate`, run, then tear down in reverse order of creation.

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use mediabridge_config::Config;
use mediabridge_engine::{
    equalizer, CompletionGate, Engine, EngineOptions, Equalizer, EventKind, EventPayload, Media,
    MediaDiscoverer, MediaList, ListPlayer, Player, RendererDiscoverer, TrackKind,
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

fn engine_from_config(config: &Config, extra_dirs: &[PathBuf]) -> Result<Engine> {
    let mut options = EngineOptions::new()
        .suppress_video(config.engine.suppress_video)
        .quiet(config.engine.quiet);
    for flag in &config.engine.extra_flags {
        options = options.extra_flag(flag.clone());
    }
    for dir in config.discovery.media_dirs.iter().chain(extra_dirs) {
        options = options.media_dir(dir.clone());
    }
    Engine::init(options).context("Failed to initialize engine")
}

fn resolve_preset(name: &str) -> Result<usize> {
    equalizer::preset_names()
        .iter()
        .position(|p| p.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            anyhow!(
                "unknown preset '{}'; run `mediabridge presets` for the list",
                name
            )
        })
}

fn apply_player_settings(player: &Player, config: &Config, matches: &ArgMatches) -> Result<()> {
    let volume = match matches.get_one::<String>("volume") {
        Some(raw) => raw
            .parse::<f32>()
            .with_context(|| format!("invalid volume '{}'", raw))?,
        None => config.player.default_volume,
    };
    player.set_volume(volume)?;

    let preset = matches
        .get_one::<String>("preset")
        .cloned()
        .or_else(|| config.player.equalizer_preset.clone());
    if let Some(name) = preset {
        let eq = Equalizer::from_preset(resolve_preset(&name)?)?;
        player.set_equalizer(Some(&eq))?;
        println!("Equalizer preset: {}", name);
    }
    Ok(())
}

pub fn play(config: &Config, matches: &ArgMatches) -> Result<()> {
    let file = matches
        .get_one::<String>("file")
        .ok_or_else(|| anyhow!("file argument is required"))?;

    let engine = engine_from_config(config, &[])?;
    let player = Player::new(&engine)?;
    let media = player.load_media_from_path(file)?;

    media.parse()?;
    let duration = media
        .duration()?
        .ok_or_else(|| anyhow!("cannot determine duration of {}", file))?;
    apply_player_settings(&player, config, matches)?;

    let done = CompletionGate::new();
    let observer = done.clone();
    let manager = player.event_manager();
    let registration = manager.attach(EventKind::MediaPlayerEndReached, move |_event| {
        let _ = observer.close();
    })?;

    println!("Playing {} ({:?})", file, duration);
    player.play()?;
    if !done.wait_timeout(duration + Duration::from_secs(5)) {
        log::warn!("playback did not finish within the expected time");
    }

    manager.detach(&[registration])?;
    player.release()?;
    media.release()?;
    engine.shutdown();
    Ok(())
}

pub fn playlist(config: &Config, matches: &ArgMatches) -> Result<()> {
    let files: Vec<String> = matches
        .get_many::<String>("files")
        .ok_or_else(|| anyhow!("at least one file is required"))?
        .cloned()
        .collect();

    let engine = engine_from_config(config, &[])?;
    let list = MediaList::new(&engine)?;
    let mut total = Duration::ZERO;
    for file in &files {
        let media = Media::from_path(&engine, file)?;
        media.parse()?;
        if let Some(duration) = media.duration()? {
            total += duration;
        } else {
            log::warn!("{} has no known duration and will be skipped", file);
        }
        list.add_media(&media)?;
    }

    let list_player = ListPlayer::new(&engine)?;
    list_player.set_media_list(&list)?;

    let done = CompletionGate::new();
    let manager = list_player.event_manager();
    let next_reg = manager.attach(EventKind::MediaListPlayerNextItemSet, |event| {
        if let EventPayload::ListItem { location, index } = &event.payload {
            println!("[{}] {}", index + 1, location);
        }
    })?;
    let observer = done.clone();
    let played_reg = manager.attach(EventKind::MediaListPlayerPlayed, move |_event| {
        let _ = observer.close();
    })?;

    println!("Playing {} items ({:?} total)", files.len(), total);
    list_player.play()?;
    if !done.wait_timeout(total + Duration::from_secs(10)) {
        log::warn!("playlist did not finish within the expected time");
    }

    manager.detach(&[next_reg, played_reg])?;
    list_player.release()?;
    list.release()?;
    engine.shutdown();
    Ok(())
}

pub fn tracks(config: &Config, matches: &ArgMatches) -> Result<()> {
    let file = matches
        .get_one::<String>("file")
        .ok_or_else(|| anyhow!("file argument is required"))?;

    let engine = engine_from_config(config, &[])?;
    let media = Media::from_path(&engine, file)?;
    let status = media.parse()?;
    if status != mediabridge_engine::ParseStatus::Done {
        bail!("parse of {} finished with status '{}'", file, status);
    }

    println!("Location: {}", media.location()?);
    if let Some(duration) = media.duration()? {
        println!("Duration: {:?}", duration);
    }
    for (label, key) in [
        ("Title", mediabridge_engine::MediaMeta::Title),
        ("Artist", mediabridge_engine::MediaMeta::Artist),
        ("Album", mediabridge_engine::MediaMeta::Album),
        ("Genre", mediabridge_engine::MediaMeta::Genre),
        ("Date", mediabridge_engine::MediaMeta::Date),
    ] {
        if let Some(value) = media.meta(key)? {
            println!("{}: {}", label, value);
        }
    }

    for track in media.tracks()? {
        println!();
        println!("Track {} ({})", track.id, track.codec);
        if track.bit_rate > 0 {
            println!("  Bit rate: {} b/s", track.bit_rate);
        }
        if let Some(ref language) = track.language {
            println!("  Language: {}", language);
        }
        match &track.kind {
            TrackKind::Audio { channels, rate } => {
                println!("  Audio: {} channel(s), {} Hz", channels, rate);
            }
            TrackKind::Video {
                width,
                height,
                frame_rate,
                ..
            } => {
                println!("  Video: {}x{}, {} fps", width, height, frame_rate.as_f64());
            }
            TrackKind::Subtitle { encoding } => {
                println!("  Subtitle: {}", encoding);
            }
        }
    }

    media.release()?;
    engine.shutdown();
    Ok(())
}

pub fn presets() -> Result<()> {
    println!("Equalizer presets:");
    for (index, name) in equalizer::preset_names().iter().enumerate() {
        println!("  {:2}  {}", index, name);
    }
    println!();
    println!("Band frequencies (Hz):");
    for (index, freq) in equalizer::band_frequencies().iter().enumerate() {
        println!("  {:2}  {}", index, freq);
    }
    Ok(())
}

pub fn discover_renderers(config: &Config, matches: &ArgMatches) -> Result<()> {
    let service = matches
        .get_one::<String>("service")
        .unwrap_or(&config.discovery.renderer_service);
    let timeout = match matches.get_one::<String>("timeout") {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid timeout '{}'", raw))?,
        None => config.discovery.find_timeout_secs,
    };

    let engine = engine_from_config(config, &[])?;
    let discoverer = RendererDiscoverer::new(&engine, service)?;

    let manager = discoverer.event_manager();
    let added_reg = manager.attach(EventKind::RendererDiscovererItemAdded, |event| {
        if let EventPayload::Renderer(renderer) = &event.payload {
            println!("+ {} ({:?})", renderer.name, renderer.kind);
        }
    })?;
    let deleted_reg = manager.attach(EventKind::RendererDiscovererItemDeleted, |event| {
        if let EventPayload::Renderer(renderer) = &event.payload {
            println!("- {} ({:?})", renderer.name, renderer.kind);
        }
    })?;

    println!("Watching '{}' for {} second(s)...", service, timeout);
    discoverer.start()?;
    thread::sleep(Duration::from_secs(timeout));
    manager.detach(&[added_reg, deleted_reg])?;
    discoverer.stop()?;

    let renderers = discoverer.renderers()?;
    println!("{} renderer(s) available", renderers.len());

    discoverer.release()?;
    engine.shutdown();
    Ok(())
}

pub fn discover_media(config: &Config, matches: &ArgMatches) -> Result<()> {
    let extra_dirs: Vec<PathBuf> = matches
        .get_many::<String>("dir")
        .map(|dirs| dirs.map(PathBuf::from).collect())
        .unwrap_or_default();

    let engine = engine_from_config(config, &extra_dirs)?;
    let discoverer = MediaDiscoverer::new(&engine, "local_dirs")?;
    let list = discoverer.media_list()?;

    let manager = list.event_manager();
    let registration = manager.attach(EventKind::MediaListItemAdded, |event| {
        if let EventPayload::ListItem { location, .. } = &event.payload {
            println!("  {}", location);
        }
    })?;

    println!("Scanning media directories...");
    discoverer.start()?;
    // Local scans are one-shot; give the provider a moment to finish
    thread::sleep(Duration::from_secs(1));
    manager.detach(&[registration])?;
    discoverer.stop()?;

    println!("{} item(s) found", list.count()?);

    discoverer.release()?;
    engine.shutdown();
    Ok(())
}
