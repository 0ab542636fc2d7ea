//! HunyClip CLI: browse a folder of clips, set crops and trims, batch export.
//!
//! Usage:
//!   hunyclip open <FOLDER>        Open a folder of clips
//!   hunyclip list                 Show clips and their edits
//!   hunyclip crop <NAME> ...      Set or clear a crop region
//!   hunyclip trim <NAME> ...      Move the trim point
//!   hunyclip export [OPTIONS]     Export enabled clips
//!   hunyclip check                Check ffmpeg and file locations

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "hunyclip",
    about = "Crop, trim and batch-export a folder of video clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Session file to use instead of the configured one
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a folder of clips, restoring its remembered list
    Open {
        /// Folder holding the clips
        folder: PathBuf,
    },

    /// Rescan the open folder for added or removed files
    Rescan,

    /// Show clips with their crop, trim and export state
    List,

    /// Add a copy of a clip that can carry its own crop and trim
    Duplicate {
        /// Display name of the clip to copy
        name: String,
    },

    /// Set or clear a clip's crop region
    Crop {
        /// Display name of the clip
        name: String,

        /// Crop in source pixels: x,y,w,h
        #[arg(long, conflicts_with_all = ["preview", "clear"])]
        rect: Option<String>,

        /// Crop drawn on a scaled preview: x,y,w,h in preview pixels
        #[arg(long, requires = "preview_size", conflicts_with = "clear")]
        preview: Option<String>,

        /// Size of the preview the crop was drawn on: WxH
        #[arg(long)]
        preview_size: Option<String>,

        /// Lock the preview crop to an aspect ratio (e.g. 16:9, 1.5)
        #[arg(long, requires = "preview")]
        aspect: Option<String>,

        /// Remove the crop region
        #[arg(long)]
        clear: bool,
    },

    /// Move a clip's trim point
    Trim {
        /// Display name of the clip
        name: String,

        /// Frame the exported segment starts at
        #[arg(conflicts_with = "step", required_unless_present = "step")]
        frame: Option<u64>,

        /// Move the trim point by this many frames
        #[arg(long, allow_hyphen_values = true)]
        step: Option<i64>,
    },

    /// Include a clip in the next export
    Enable {
        /// Display name of the clip
        name: String,
    },

    /// Leave a clip out of the next export
    Disable {
        /// Display name of the clip
        name: String,
    },

    /// Show or change batch settings
    Settings {
        /// Longest output edge in pixels for cropped video
        #[arg(long)]
        longest_edge: Option<u32>,

        /// Exported segment length in frames
        #[arg(long)]
        trim_length: Option<u32>,
    },

    /// Export every enabled clip
    Export {
        /// Write cropped videos to cropped/
        #[arg(long)]
        cropped: bool,

        /// Write uncropped videos to uncropped/
        #[arg(long)]
        uncropped: bool,

        /// Write a still of the trim frame
        #[arg(long)]
        image: bool,

        /// Rename outputs to <prefix>_00001, <prefix>_00002, ...
        #[arg(long)]
        prefix: Option<String>,

        /// Caption written next to every output
        #[arg(long)]
        caption: Option<String>,

        /// Print the plan without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check ffmpeg availability and file locations
    Check {
        /// Write the config file, filling in defaults for missing fields
        #[arg(long)]
        write_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let stored = hunyclip_common::config::AppConfig::load();
    let mut config = stored.clone();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(session) = cli.session {
        config.session_file = session;
    }
    hunyclip_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Open { folder } => commands::open::run(&config, folder),
        Commands::Rescan => commands::open::rescan(&config),
        Commands::List => commands::list::run(&config),
        Commands::Duplicate { name } => commands::duplicate::run(&config, &name),
        Commands::Crop {
            name,
            rect,
            preview,
            preview_size,
            aspect,
            clear,
        } => {
            let action = commands::crop::CropAction::from_args(rect, preview, preview_size, aspect, clear)?;
            commands::crop::run(&config, &name, action)
        }
        Commands::Trim { name, frame, step } => commands::trim::run(&config, &name, frame, step),
        Commands::Enable { name } => commands::toggle::run(&config, &name, true),
        Commands::Disable { name } => commands::toggle::run(&config, &name, false),
        Commands::Settings {
            longest_edge,
            trim_length,
        } => commands::settings::run(&config, longest_edge, trim_length),
        Commands::Export {
            cropped,
            uncropped,
            image,
            prefix,
            caption,
            dry_run,
        } => {
            let toggles = commands::export::toggles(&config, cropped, uncropped, image, prefix, caption);
            commands::export::run(&config, toggles, dry_run).await
        }
        Commands::Check { write_config } => commands::check::run(&config, write_config.then_some(&stored)),
    }
}
