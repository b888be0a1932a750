//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tandem_config::RoomMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Discover a nearby partner and negotiate a room.
    Paired,
    /// Meet in the shared global room.
    Global,
}

impl From<Mode> for RoomMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Paired => RoomMode::Paired,
            Mode::Global => RoomMode::Global,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "tandem-sim",
    about = "Pair two simulated devices and exchange strokes"
)]
pub struct Args {
    /// How the devices find their room.
    #[arg(long, value_enum, default_value_t = Mode::Paired)]
    pub mode: Mode,

    /// Strokes each device draws once synced.
    #[arg(long, default_value_t = 3)]
    pub strokes: usize,

    /// Config file to load instead of the built-in defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `tandem_pairing=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Make the host lose tracking before it creates the anchor.
    #[arg(long)]
    pub host_failure: bool,
}
