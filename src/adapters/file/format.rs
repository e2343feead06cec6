//! On-disk document format of a credential store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::StoreError;
use crate::domain::models::credential::Scope;
use crate::domain::models::store_contents::{DomainCredentials, StoreContents};

/// Version written by this build. Loading any other version fails.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreDocument {
    pub format_version: u32,
    pub scope: Scope,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub domains: Vec<DomainCredentials>,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl StoreDocument {
    pub fn new(scope: Scope, contents: &StoreContents) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            scope,
            saved_at: Utc::now(),
            domains: contents.entries().to_vec(),
        }
    }

    /// Parse a document, checking the version before the body so that a
    /// newer layout reports `UnsupportedFormat` rather than a parse error.
    pub fn parse(raw: &[u8]) -> Result<Self, StoreError> {
        let probe: VersionProbe = serde_json::from_slice(raw)?;
        if probe.format_version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormat {
                found: probe.format_version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn into_contents(self) -> StoreContents {
        StoreContents::from_entries(self.domains)
    }
}
