//! Record of tool versions installed into an environment
//!
//! The receipt lives at `<root>/provision-receipt.json`. It is what lets a
//! re-run skip installs: a tool is only reused when the receipt recorded it
//! under the same constraint and the installer still reports that version.

use crate::RECEIPT_FILE_NAME;
use crate::error::Result;
use crate::spec::ToolRequirement;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wheelenv_fs::{ConfigStore, NormalizedPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEntry {
    /// Normalized constraint the tool was installed against.
    pub constraint: Option<String>,
    pub version: String,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    tools: BTreeMap<String, ReceiptEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl Receipt {
    pub fn path(root: &NormalizedPath) -> NormalizedPath {
        root.join(RECEIPT_FILE_NAME)
    }

    /// Load the receipt under `root`; `Ok(None)` when there is none yet.
    pub fn load(root: &NormalizedPath) -> Result<Option<Self>> {
        let path = Self::path(root);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(ConfigStore::new().load(&path)?))
    }

    /// Load the receipt, treating a missing or unreadable one as empty.
    ///
    /// An unreadable receipt only costs a reinstall, so it is logged and
    /// otherwise ignored.
    pub fn load_or_default(root: &NormalizedPath) -> Self {
        match Self::load(root) {
            Ok(receipt) => receipt.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(root = %root, error = %e, "ignoring unreadable receipt");
                Self::default()
            }
        }
    }

    pub fn save(&mut self, root: &NormalizedPath) -> Result<()> {
        self.updated_at = Some(Utc::now());
        ConfigStore::new().save(&Self::path(root), self)?;
        Ok(())
    }

    /// Entry for `tool` if it was recorded under the same constraint.
    pub fn entry_for(&self, tool: &ToolRequirement) -> Option<&ReceiptEntry> {
        self.tools
            .get(tool.name())
            .filter(|entry| entry.constraint.as_deref() == tool.version_constraint())
    }

    pub fn get(&self, name: &str) -> Option<&ReceiptEntry> {
        self.tools.get(name)
    }

    pub fn record(&mut self, tool: &ToolRequirement, version: impl Into<String>) {
        self.tools.insert(
            tool.name().to_string(),
            ReceiptEntry {
                constraint: tool.version_constraint().map(String::from),
                version: version.into(),
                installed_at: Utc::now(),
            },
        );
    }

    pub fn forget(&mut self, name: &str) -> Option<ReceiptEntry> {
        self.tools.remove(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
