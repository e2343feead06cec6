//! Implementation of the `keywarden receive` command.
//!
//! Plays the remote execution context: accepts one credential on a socket,
//! seals it under a key that lives only in this process and, when a command
//! is given, binds the certificate into the workspace for the duration of
//! that command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::net::UnixListener;
use tokio::process::Command;
use tracing::info;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::ports::SecretCodec;
use crate::infrastructure::crypto::AesGcmCodec;
use crate::services::binding::CertificateBinding;
use crate::services::transfer::CredentialReceiver;

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Socket to listen on; must not exist yet
    #[arg(long)]
    pub socket: PathBuf,

    /// Workspace the keystore is bound into (defaults to the project directory)
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Variable holding the bound keystore path
    #[arg(long, default_value = "KEYSTORE")]
    pub keystore_variable: String,

    /// Variable holding the keystore password
    #[arg(long, default_value = "KEYSTORE_PASSWORD")]
    pub password_variable: String,

    /// Command to run with the certificate bound
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReceiveOutput {
    pub id: String,
    pub credential_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl CommandOutput for ReceiveOutput {
    fn to_human(&self) -> String {
        let mut line = format!("Received {} credential '{}'.", self.credential_type, self.id);
        if let Some(code) = self.exit_code {
            line.push_str(&format!(" Command exited with status {code}."));
        }
        line
    }
}

pub async fn execute(
    args: ReceiveArgs,
    project_dir: &Path,
    config: Config,
    json_mode: bool,
) -> Result<()> {
    if args.socket.exists() {
        bail!("socket {} already exists", args.socket.display());
    }
    let listener = UnixListener::bind(&args.socket)
        .with_context(|| format!("failed to listen on {}", args.socket.display()))?;
    info!(socket = %args.socket.display(), "waiting for credential");

    let accepted = listener.accept().await;
    let _ = std::fs::remove_file(&args.socket);
    let (stream, _) = accepted.context("failed to accept channel connection")?;

    let codec: Arc<dyn SecretCodec> = Arc::new(AesGcmCodec::ephemeral());
    let receiver = CredentialReceiver::new(Arc::clone(&codec), config.remote.clone());
    let credential = receiver
        .receive(stream)
        .await
        .context("failed to receive credential")?;

    let mut result = ReceiveOutput {
        id: credential.id().to_string(),
        credential_type: credential.credential_type().as_str().to_string(),
        exit_code: None,
    };

    if let Some((program, program_args)) = args.command.split_first() {
        let workspace = args.workspace.unwrap_or_else(|| project_dir.to_path_buf());
        let bound = CertificateBinding::new(&args.keystore_variable, &args.password_variable)
            .bind(&credential, &workspace, codec.as_ref(), &config.binding)
            .context("failed to bind certificate into workspace")?;

        let mut command = Command::new(program);
        command.args(program_args).current_dir(&workspace);
        for (name, value) in bound.environment() {
            command.env(name, value.as_str());
        }
        let status = command
            .status()
            .await
            .with_context(|| format!("failed to run {program}"))?;
        result.exit_code = status.code();
        bound.unbind().context("failed to remove bound keystore")?;
    }

    output(&result, json_mode);
    Ok(())
}
