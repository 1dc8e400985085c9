/// Lofi Player - terminal front-end
use anyhow::{anyhow, Context};
use clap::Parser;
use lofi_audio_desktop::CpalEngine;
use lofi_catalog::HttpCatalogProvider;
use lofi_cli::commands::{self, Command, HELP};
use lofi_cli::status::{saved_listing, status_line};
use lofi_cli::{Cli, CliConfig, Commands, EffectFlags};
use lofi_core::{format_time, PersistenceAdapter, PlaybackSnapshot, TrackInfo, TransportState};
use lofi_playback::{PlaybackError, PlayerHandle};
use lofi_storage::SettingsStore;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the status lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lofi_cli=info,lofi_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.settings {
        config.storage.settings_path = path;
    }

    match cli.command {
        Commands::Play {
            source,
            effects,
            rate,
            no_input,
        } => play(&config, &source, effects, rate, no_input).await,
        Commands::Saved => list_saved(&config).await,
    }
}

async fn open_store(config: &CliConfig) -> anyhow::Result<Arc<SettingsStore>> {
    let path = &config.storage.settings_path;
    let store = SettingsStore::open(path)
        .await
        .with_context(|| format!("opening settings at {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn play(
    config: &CliConfig,
    source: &str,
    effects: EffectFlags,
    rate: Option<f64>,
    no_input: bool,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let mut builder = PlayerHandle::builder(config.playback_config()).with_persistence(store);
    if let Some(catalog) = config.catalog_config() {
        tracing::info!(url = %catalog.search_url, "Catalog enabled");
        builder = builder.with_catalog(Arc::new(HttpCatalogProvider::new(catalog)?));
    }

    let engine = CpalEngine::new().context("opening audio output")?;
    let player = builder.spawn(engine);

    let result = run_session(&player, source, effects, rate, no_input).await;

    if let Err(e) = player.shutdown().await {
        tracing::warn!(error = %e, "Player did not shut down cleanly");
    }
    result
}

async fn run_session(
    player: &PlayerHandle,
    source: &str,
    effects: EffectFlags,
    rate: Option<f64>,
    no_input: bool,
) -> anyhow::Result<()> {
    let info = load_source(player, source).await?;
    announce(&info);

    let current = player.snapshot().effects;
    for name in effects.requested() {
        if !current.is_enabled(name) {
            player.toggle_effect(name).await?;
        }
    }
    if let Some(rate) = rate {
        player.set_base_rate(rate).await?;
    }

    start(player).await?;
    let reporter = tokio::spawn(report_transitions(player.observe()));

    let result = if no_input {
        wait_while_playing(player.observe()).await;
        Ok(())
    } else {
        interactive(player).await
    };

    reporter.abort();
    result
}

/// Local file if one exists at `source`, else a URL or catalog query
async fn load_source(player: &PlayerHandle, source: &str) -> anyhow::Result<TrackInfo> {
    let path = Path::new(source);
    if path.is_file() {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map_or_else(|| source.to_string(), |n| n.to_string_lossy().into_owned());
        return Ok(player.load(bytes, name).await?);
    }

    Ok(player.load_from_catalog(source).await?)
}

fn announce(info: &TrackInfo) {
    println!(
        "loaded {} ({}, {} Hz, {} ch)",
        info.name,
        format_time(info.duration_secs),
        info.sample_rate,
        info.channels
    );
}

async fn start(player: &PlayerHandle) -> anyhow::Result<()> {
    player.play().await.map_err(|e| match e {
        PlaybackError::PlaybackBlocked(reason) => {
            anyhow!("audio output refused to start ({reason}); check the output device")
        }
        other => other.into(),
    })
}

async fn interactive(player: &PlayerHandle) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(player, command).await {
            println!("error: {e}");
        }
    }
    Ok(())
}

async fn execute(player: &PlayerHandle, command: Command) -> anyhow::Result<()> {
    match command {
        Command::TogglePlay => {
            if player.snapshot().is_playing() {
                player.pause().await?;
            } else {
                start(player).await?;
            }
        }
        Command::Seek(percent) => player.seek(percent).await?,
        Command::Toggle(name) => player.toggle_effect(name).await?,
        Command::Rate(rate) => player.set_base_rate(rate).await?,
        Command::ListSaved => println!("{}", saved_listing(&player.saved_tracks().await?)),
        Command::OpenSaved(number) => {
            let saved = player.saved_tracks().await?;
            let entry = saved
                .get(number - 1)
                .ok_or_else(|| anyhow!("no saved track {number}"))?;
            let info = player.load_saved(entry).await?;
            announce(&info);
            start(player).await?;
        }
        Command::Status => println!("{}", status_line(&player.snapshot())),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

/// Print a status line whenever the transport state changes
async fn report_transitions(mut snapshots: watch::Receiver<PlaybackSnapshot>) {
    let mut last = snapshots.borrow().state;
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        if snapshot.state != last {
            last = snapshot.state;
            println!("{}", status_line(&snapshot));
        }
    }
}

async fn wait_while_playing(mut snapshots: watch::Receiver<PlaybackSnapshot>) {
    while snapshots.borrow_and_update().state == TransportState::Playing {
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

async fn list_saved(config: &CliConfig) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let entries = store.load_saved_tracks().await?;
    println!("{}", saved_listing(&entries));
    Ok(())
}
