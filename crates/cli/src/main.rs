// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use mediabridge_config::{Config, ConfigManager};
use std::path::PathBuf;

mod commands;

fn build_cli() -> Command {
    Command::new("mediabridge")
        .version("0.1.0")
        .about("Media playback, discovery and introspection frontend")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Path to the config file (defaults to the platform config directory)")
                .global(true),
        )
        .subcommand(
            Command::new("play")
                .about("Play a media file to completion")
                .arg(Arg::new("file").required(true).value_name("FILE").help("Path to the media file"))
                .arg(Arg::new("volume").short('v').long("volume").value_name("LEVEL").help("Playback volume (0.0 - 1.0)"))
                .arg(Arg::new("preset").short('p').long("preset").value_name("NAME").help("Equalizer preset to apply")),
        )
        .subcommand(
            Command::new("playlist")
                .about("Play several media files in sequence")
                .arg(Arg::new("files").required(true).num_args(1..).value_name("FILE").help("Media files, in play order")),
        )
        .subcommand(
            Command::new("tracks")
                .about("Parse a media file and print its metadata and track records")
                .arg(Arg::new("file").required(true).value_name("FILE").help("Path to the media file")),
        )
        .subcommand(Command::new("presets").about("List equalizer presets and band frequencies"))
        .subcommand(
            Command::new("discover-renderers")
                .about("Watch a renderer discovery service and print announced devices")
                .arg(Arg::new("service").short('s').long("service").value_name("NAME").help("Discovery service to use (overrides config)"))
                .arg(Arg::new("timeout").short('t').long("timeout").value_name("SECONDS").help("How long to watch (overrides config)")),
        )
        .subcommand(
            Command::new("discover-media")
                .about("Scan the configured media directories")
                .arg(Arg::new("dir").short('d').long("dir").value_name("DIR").num_args(0..).help("Extra directories to scan")),
        )
        .subcommand(Command::new("config-path").about("Print the resolved config file path"))
}

fn load_config(matches: &ArgMatches) -> Result<(ConfigManager, Config)> {
    let manager = match matches.get_one::<String>("config") {
        Some(path) => ConfigManager::with_path(PathBuf::from(path)),
        None => ConfigManager::new().context("Failed to resolve config path")?,
    };
    let config = manager.load().unwrap_or_else(|e| {
        eprintln!("Config error: {}, using defaults", e);
        Config::default()
    });
    Ok((manager, config))
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let (manager, config) = load_config(&matches)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match matches.subcommand() {
        Some(("play", sub_matches)) => commands::play(&config, sub_matches),
        Some(("playlist", sub_matches)) => commands::playlist(&config, sub_matches),
        Some(("tracks", sub_matches)) => commands::tracks(&config, sub_matches),
        Some(("presets", _)) => commands::presets(),
        Some(("discover-renderers", sub_matches)) => {
            commands::discover_renderers(&config, sub_matches)
        }
        Some(("discover-media", sub_matches)) => commands::discover_media(&config, sub_matches),
        Some(("config-path", _)) => {
            println!("{}", manager.path().display());
            Ok(())
        }
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
