pub use clap::Parser;

use clap::Subcommand;
use shared_storage_engine::{Collection, CopyStrategy};
use std::path::PathBuf;

/// Publish, fetch and share files through Android-style shared storage,
/// backed by a local directory tree.
#[derive(Parser, Debug)]
#[command(name = "shared-storage", author, version, about, long_about = None)]
pub struct Args {
    /// Config file (defaults to ~/.config/shared-storage/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emulated Android API level; 29 and above use scoped storage
    #[arg(long, global = true)]
    pub api_level: Option<u32>,

    #[arg(long, global = true)]
    pub app_title: Option<String>,

    /// Legacy shared storage root
    #[arg(long, global = true)]
    pub storage_root: Option<PathBuf>,

    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// `bulk` or `chunked`
    #[arg(long, global = true)]
    pub copy_strategy: Option<CopyStrategy>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the resolved settings to the config file
    Init,
    /// Copy a private file into shared storage
    Publish {
        file: PathBuf,
        #[arg(long)]
        collection: Option<Collection>,
        /// Directories below the app title; the last segment renames the file
        #[arg(long)]
        subpath: Option<String>,
    },
    /// Copy a shared file into the private cache
    Fetch { reference: String },
    Delete { reference: String },
    /// Resolve a shared path to a directly openable reference
    Resolve { reference: String },
    /// Print the MIME type derived from a file name
    Mime { file_name: String },
    /// Print the collection a MIME type is published to
    Collection {
        mime_type: String,
        #[arg(long)]
        requested: Option<Collection>,
    },
    /// Publish a file then fetch it back, in one process
    Roundtrip {
        file: PathBuf,
        #[arg(long)]
        collection: Option<Collection>,
    },
    /// Hand files or text to another app
    Share {
        references: Vec<String>,
        /// Package to address directly instead of the chooser
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        text: Option<String>,
    },
}
