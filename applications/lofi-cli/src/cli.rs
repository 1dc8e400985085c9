/// Command-line arguments
use clap::{Args, Parser, Subcommand};
use lofi_core::EffectName;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lofi")]
#[command(about = "Play a track through lo-fi effects", long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to ./lofi.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Settings file holding preferences and saved tracks
    #[arg(long, global = true, env = "LOFI_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load and play a local file, a URL or a catalog search
    Play {
        /// File path, http(s) URL or search query
        source: String,

        #[command(flatten)]
        effects: EffectFlags,

        /// Base playback rate (0.5 - 1.0)
        #[arg(long)]
        rate: Option<f64>,

        /// Exit when the track ends instead of reading commands from stdin
        #[arg(long)]
        no_input: bool,
    },
    /// List recently played tracks
    Saved,
}

/// Effects to switch on before playback starts
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct EffectFlags {
    /// Low-pass coloration
    #[arg(long)]
    pub lofi: bool,

    /// Mid boost and warmth
    #[arg(long)]
    pub jazz: bool,

    /// Convolution reverb
    #[arg(long)]
    pub reverb: bool,

    /// Vinyl crackle overlay
    #[arg(long)]
    pub vinyl: bool,

    /// Slow the tempo down
    #[arg(long)]
    pub slowed: bool,
}

impl EffectFlags {
    /// Effects requested on the command line
    pub fn requested(&self) -> Vec<EffectName> {
        [
            (self.lofi, EffectName::Lofi),
            (self.jazz, EffectName::Jazz),
            (self.reverb, EffectName::Reverb),
            (self.vinyl, EffectName::VinylCrackle),
            (self.slowed, EffectName::SlowedDown),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}
