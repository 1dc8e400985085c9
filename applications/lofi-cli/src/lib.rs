//! Lofi Player terminal front-end
//!
//! The binary wires the desktop output engine, the settings store and the
//! HTTP catalog into a `PlayerHandle` and drives it from stdin.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod status;

pub use cli::{Cli, Commands, EffectFlags};
pub use config::CliConfig;
pub use error::{CliError, Result};
