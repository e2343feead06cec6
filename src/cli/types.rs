//! CLI type definitions
//!
//! Clap command structures for the operator binary. Credential creation
//! and editing belong to the hosting system, not this tool.

use clap::{Parser, Subcommand};

use crate::cli::commands::list::ListArgs;
use crate::cli::commands::rotate_key::RotateKeyArgs;
use crate::cli::commands::verify::VerifyArgs;
#[cfg(unix)]
use crate::cli::commands::{receive::ReceiveArgs, send::SendArgs};

#[derive(Parser, Debug)]
#[command(name = "keywarden")]
#[command(about = "Keywarden - encrypted credential store", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Project directory holding `.keywarden/`
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project_dir: std::path::PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List credential metadata visible from a scope
    List(ListArgs),

    /// Decrypt every stored secret and report unavailable ones
    Verify(VerifyArgs),

    /// Append a master key epoch and re-encrypt every store
    RotateKey(RotateKeyArgs),

    /// Detach a credential and send it over a channel socket
    #[cfg(unix)]
    Send(SendArgs),

    /// Accept one credential from a channel socket, optionally binding it
    /// for a command
    #[cfg(unix)]
    Receive(ReceiveArgs),
}
