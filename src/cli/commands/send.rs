//! Implementation of the `keywarden send` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Serialize;

use crate::adapters::remote::UnixSocketConnector;
use crate::cli::commands::Workspace;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::credential::{CredentialType, ScopeChain};
use crate::domain::models::credential_domain::RequirementSet;
use crate::services::context::CredentialContext;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Credential id
    pub id: String,

    /// Item whose scope chain the credential is looked up from
    #[arg(long)]
    pub item: Option<String>,

    /// Credential type: any, certificate, username_password
    #[arg(short = 't', long = "type", default_value = "any")]
    pub credential_type: String,

    /// Channel socket of the receiving side
    #[arg(long)]
    pub socket: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct SendOutput {
    pub id: String,
    pub target: String,
}

impl CommandOutput for SendOutput {
    fn to_human(&self) -> String {
        format!("Sent credential '{}' to {}.", self.id, self.target)
    }
}

pub async fn execute(
    args: SendArgs,
    project_dir: &Path,
    config: Config,
    json_mode: bool,
) -> Result<()> {
    let wanted = CredentialType::from_str(&args.credential_type)
        .ok_or_else(|| anyhow!("unknown credential type '{}'", args.credential_type))?;
    let chain = args
        .item
        .as_deref()
        .map_or_else(ScopeChain::global, ScopeChain::for_item);

    let workspace = Workspace::open(project_dir, config)?;
    let context = CredentialContext::with_audit(
        workspace.registry(),
        workspace.shared_codec(),
        workspace.audit.clone(),
    );
    let detached = context
        .detach(wanted, &chain, &RequirementSet::empty(), &args.id)
        .with_context(|| format!("failed to detach credential '{}'", args.id))?;

    let connector = UnixSocketConnector::new(&args.socket);
    let target = format!("unix:{}", args.socket.display());
    let acknowledged = context
        .transfer(Arc::new(connector), workspace.config.remote.clone())
        .send(&detached)
        .await
        .with_context(|| format!("failed to send credential '{}'", args.id))?;

    output(
        &SendOutput {
            id: acknowledged,
            target,
        },
        json_mode,
    );
    Ok(())
}
