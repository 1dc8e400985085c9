use clap::Parser;
use lofi_cli::{Cli, CliConfig, CliError, Commands};
use lofi_core::EffectName;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

// ===== Test Helpers =====

fn no_env() -> config::Environment {
    config::Environment::default().source(Some(HashMap::new()))
}

fn toml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ===== Argument parsing =====

#[test]
fn play_with_effect_flags() {
    let cli = Cli::try_parse_from([
        "lofi", "play", "rainy day", "--lofi", "--vinyl", "--rate", "0.7",
    ])
    .unwrap();

    let Commands::Play {
        source,
        effects,
        rate,
        no_input,
    } = cli.command
    else {
        panic!("expected play");
    };
    assert_eq!(source, "rainy day");
    assert_eq!(
        effects.requested(),
        vec![EffectName::Lofi, EffectName::VinylCrackle]
    );
    assert_eq!(rate, Some(0.7));
    assert!(!no_input);
}

#[test]
fn global_options_after_subcommand() {
    let cli = Cli::try_parse_from(["lofi", "saved", "--settings", "/tmp/s.json"]).unwrap();
    assert!(matches!(cli.command, Commands::Saved));
    assert_eq!(cli.settings, Some(PathBuf::from("/tmp/s.json")));
}

#[test]
fn play_requires_source() {
    assert!(Cli::try_parse_from(["lofi", "play"]).is_err());
}

// ===== Configuration =====

#[test]
fn loads_toml_file() {
    let file = toml_file(
        r#"
[playback]
settle_delay_ms = 75

[storage]
settings_path = "/var/lib/lofi/settings.json"

[catalog]
search_url = "http://localhost:3000/api/search-song"
download_proxy = "http://localhost:3000/api/download-song"
timeout_secs = 5
"#,
    );

    let config = CliConfig::from_sources(Some(file.path()), no_env()).unwrap();

    assert_eq!(config.playback.settle_delay_ms, 75);
    assert_eq!(config.playback.tick_interval_ms, 50);
    assert_eq!(
        config.storage.settings_path,
        PathBuf::from("/var/lib/lofi/settings.json")
    );
    let catalog = config.catalog_config().unwrap();
    assert_eq!(
        catalog.download_proxy.as_deref(),
        Some("http://localhost:3000/api/download-song")
    );
    assert_eq!(catalog.timeout, Duration::from_secs(5));
}

#[test]
fn environment_beats_file() {
    let file = toml_file("[playback]\nsettle_delay_ms = 75\n");
    let env = config::Environment::default().source(Some(HashMap::from([(
        "LOFI_PLAYBACK__SETTLE_DELAY_MS".to_string(),
        "200".to_string(),
    )])));

    let config = CliConfig::from_sources(Some(file.path()), env).unwrap();
    assert_eq!(config.playback.settle_delay_ms, 200);
}

#[test]
fn missing_explicit_file_is_error() {
    let err = CliConfig::from_sources(Some(std::path::Path::new("/nonexistent/lofi.toml")), no_env())
        .unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
}
