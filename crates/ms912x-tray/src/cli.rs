use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ms912x_core::model::Mode;

#[derive(Parser)]
#[command(
    name = "ms912x-tray",
    about = "Tray icon for switching the resolution of an ms912x USB-HDMI adapter",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Read only this config file instead of the system and user ones
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Show the tray icon (default)
    Tray,

    /// Print driver state, connector and current mode
    Status,

    /// Switch the adapter to a resolution and exit
    Set {
        /// Resolution such as 1920x1080
        mode: Mode,
    },

    /// Unload the kernel module and exit
    Unload,
}
