// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Copy local content into running Docker and Podman containers")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ferry.yml discovery in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy a directory or zip file into a container
    Copy {
        /// Target container name or ID
        container: String,

        /// Local directory or zip file
        src: PathBuf,

        /// Destination path inside the container
        dst: String,

        /// Owner uid stamped on every copied entry
        #[arg(long, requires = "gid")]
        uid: Option<u64>,

        /// Owner gid stamped on every copied entry
        #[arg(long, requires = "uid")]
        gid: Option<u64>,

        /// Skip entries with this file name (repeatable)
        #[arg(long = "exclude", value_name = "NAME")]
        excludes: Vec<String>,
    },

    /// Write stack.toml into a container
    WriteStack {
        /// Target container name or ID
        container: String,

        /// Destination file path inside the container
        dst: String,

        /// Run image reference
        #[arg(long)]
        run_image: String,

        /// Run image mirror (repeatable)
        #[arg(long = "mirror", value_name = "IMAGE")]
        mirrors: Vec<String>,
    },
}
