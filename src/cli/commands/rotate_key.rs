//! Implementation of the `keywarden rotate-key` command.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::commands::Workspace;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::services::maintenance::{rotate_master_key, RotationReport};

#[derive(Args, Debug)]
pub struct RotateKeyArgs {}

#[derive(Debug, Serialize)]
pub struct RotateKeyOutput {
    #[serde(flatten)]
    pub report: RotationReport,
}

impl CommandOutput for RotateKeyOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Master key rotated to epoch {}.", self.report.epoch)];
        for store in &self.report.stores {
            lines.push(format!(
                "  {}: {} secret(s) re-encrypted, {} unavailable",
                store.scope, store.rewrapped, store.unavailable
            ));
        }
        lines.join("\n")
    }
}

pub fn execute(_args: RotateKeyArgs, project_dir: &Path, config: Config, json_mode: bool) -> Result<()> {
    let workspace = Workspace::open(project_dir, config)?;
    let report = rotate_master_key(&workspace.codec, &workspace.stores, &workspace.audit)?;
    output(&RotateKeyOutput { report }, json_mode);
    Ok(())
}
