//! Command-line interface for the observable-property weaver.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "oaph-weaver")]
#[command(about = "Rewrites ToFodyProperty placeholders into observable property helpers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Weave a module and print diagnostics
    Weave {
        /// Module description (JSON)
        module: PathBuf,

        /// Weaver configuration (JSON); defaults apply to missing fields
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the woven module here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the listing of every routine after weaving
        #[arg(long)]
        listing: bool,
    },

    /// Print the listing of every routine
    Dump {
        module: PathBuf,
    },

    /// Print the dependency tree of one instruction
    Slice {
        module: PathBuf,

        /// Routine as `Type::Method`
        #[arg(long)]
        method: String,

        #[arg(long)]
        index: usize,
    },
}
