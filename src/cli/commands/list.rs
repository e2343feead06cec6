//! Implementation of the `keywarden list` command.

use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::commands::Workspace;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::credential::{Credential, CredentialKind, CredentialType, ScopeChain};
use crate::domain::models::credential_domain::RequirementSet;
use crate::domain::models::keystore::KeyStoreSource;
use crate::domain::ports::CredentialsStore;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Search the scope chain of this item (e.g. team/infra/deploy)
    #[arg(long, conflicts_with = "folder")]
    pub item: Option<String>,

    /// Search the scope chain of this folder
    #[arg(long)]
    pub folder: Option<String>,

    /// Credential type: any, certificate, username_password
    #[arg(short = 't', long = "type", default_value = "any")]
    pub credential_type: String,

    /// Only credentials whose domain matches this URI
    #[arg(long)]
    pub uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CredentialRow {
    pub id: String,
    pub credential_type: String,
    pub scope: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keystore: Option<String>,
}

impl From<&Credential> for CredentialRow {
    fn from(credential: &Credential) -> Self {
        let (username, keystore) = match &credential.kind {
            CredentialKind::UsernamePassword(up) => (Some(up.username.clone()), None),
            CredentialKind::Certificate(cert) => {
                let location = match &cert.key_store_source {
                    KeyStoreSource::Uploaded { .. } => "uploaded".to_string(),
                    KeyStoreSource::OnAgentDisk { path, .. } => path.display().to_string(),
                };
                (
                    None,
                    Some(format!(
                        "{} ({location})",
                        cert.key_store_source.keystore_format().as_str()
                    )),
                )
            }
        };
        Self {
            id: credential.id.clone(),
            credential_type: credential.credential_type().as_str().to_string(),
            scope: credential.scope.to_string(),
            description: credential.description.clone(),
            username,
            keystore,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub stores: usize,
    pub credentials: Vec<CredentialRow>,
}

impl CommandOutput for ListOutput {
    fn to_human(&self) -> String {
        if self.credentials.is_empty() {
            return format!("No credentials found in {} store(s).", self.stores);
        }
        let mut lines = vec![format!(
            "{:<24} {:<18} {:<24} {}",
            "ID", "TYPE", "SCOPE", "DETAILS"
        )];
        for row in &self.credentials {
            let details = row
                .username
                .as_deref()
                .or(row.keystore.as_deref())
                .unwrap_or_default();
            lines.push(format!(
                "{:<24} {:<18} {:<24} {}",
                truncate(&row.id, 24),
                row.credential_type,
                truncate(&row.scope, 24),
                truncate(details, 40)
            ));
        }
        lines.push(format!("\n{} credential(s)", self.credentials.len()));
        lines.join("\n")
    }
}

pub fn execute(args: ListArgs, project_dir: &Path, config: Config, json_mode: bool) -> Result<()> {
    let wanted = CredentialType::from_str(&args.credential_type)
        .ok_or_else(|| anyhow!("unknown credential type '{}'", args.credential_type))?;
    let requirements = args
        .uri
        .as_deref()
        .map_or_else(RequirementSet::empty, RequirementSet::from_uri);

    let workspace = Workspace::open(project_dir, config)?;
    let chain = match (&args.item, &args.folder) {
        (Some(item), _) => Some(ScopeChain::for_item(item)),
        (None, Some(folder)) => Some(ScopeChain::for_folder(folder)),
        (None, None) => None,
    };

    let credentials: Vec<Credential> = match chain {
        Some(chain) => workspace
            .registry()
            .lookup(wanted, &chain, &requirements, None),
        None => workspace
            .stores
            .iter()
            .flat_map(|store| store.credentials_for(&requirements))
            .filter(|c| c.satisfies(wanted))
            .collect(),
    };

    let result = ListOutput {
        stores: workspace.stores.len(),
        credentials: credentials.iter().map(CredentialRow::from).collect(),
    };
    output(&result, json_mode);
    Ok(())
}
