use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffwatch")]
#[command(about = "Watch-folder video converter driving ffmpeg", long_about = None)]
pub struct Cli {
    /// Settings file to use (defaults to the per-user config location)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Maximum number of parallel conversions
    #[arg(long, value_name = "N", global = true)]
    pub workers: Option<usize>,

    /// Path to the ffmpeg binary (defaults to "ffmpeg" on PATH)
    #[arg(long, value_name = "PATH", global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary (defaults to "ffprobe" on PATH)
    #[arg(long, value_name = "PATH", global = true)]
    pub ffprobe: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the source folder and convert files as they appear (default)
    Run,

    /// Scan the source folder and list files waiting for conversion
    Scan,

    /// Probe ffmpeg for hardware encoder support and show the selection
    Encoders,

    /// Check that ffmpeg and ffprobe are installed and report versions
    CheckTools,

    /// Convert the given files now, ignoring the operating-hours window
    Convert {
        /// Files to convert
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Show settings location, creating a default settings file if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
