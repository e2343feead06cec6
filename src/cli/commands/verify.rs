//! Implementation of the `keywarden verify` command.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::commands::Workspace;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::services::maintenance::{verify_store, VerifyReport};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Exit with an error when any secret is unavailable
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyOutput {
    pub healthy: bool,
    pub stores: Vec<VerifyReport>,
}

impl CommandOutput for VerifyOutput {
    fn to_human(&self) -> String {
        if self.stores.is_empty() {
            return "No stores found.".to_string();
        }
        let mut lines = Vec::new();
        for report in &self.stores {
            let status = if report.is_healthy() { "ok" } else { "UNAVAILABLE SECRETS" };
            lines.push(format!(
                "{}: {} credential(s), {} secret(s) checked, {status}",
                report.scope, report.credentials, report.secrets_checked
            ));
            for secret in &report.unavailable {
                lines.push(format!("  - {}: {}", secret.id, secret.reason));
            }
        }
        lines.join("\n")
    }
}

pub fn execute(args: VerifyArgs, project_dir: &Path, config: Config, json_mode: bool) -> Result<()> {
    let workspace = Workspace::open(project_dir, config)?;
    let stores: Vec<VerifyReport> = workspace
        .stores
        .iter()
        .map(|store| verify_store(store.as_ref(), workspace.codec.as_ref()))
        .collect();
    let result = VerifyOutput {
        healthy: stores.iter().all(VerifyReport::is_healthy),
        stores,
    };
    output(&result, json_mode);

    if args.strict && !result.healthy {
        bail!("one or more secrets could not be decrypted");
    }
    Ok(())
}
