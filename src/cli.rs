use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ytripper", version, about = "Download audio or video through yt-dlp and FFmpeg")]
pub struct Cli {
    /// Settings file to use instead of the per-user one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a single URL, printing events as JSON lines
    Download(DownloadArgs),
    /// Read download requests as JSON lines from stdin and run them in order
    Serve,
    /// Show where FFmpeg and yt-dlp were found
    Deps,
    /// Inspect or reset the settings file
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    pub url: String,

    /// Extract audio as mp3
    #[arg(long)]
    pub audio: bool,

    /// 1080p, 720p or 480p; anything else means best available
    #[arg(long, short)]
    pub quality: Option<String>,

    /// Destination folder
    #[arg(long, short, conflicts_with = "pick_folder")]
    pub output: Option<PathBuf>,

    /// Ask for the destination folder before starting
    #[arg(long)]
    pub pick_folder: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum SettingsAction {
    Show,
    Reset,
    Path,
}
