//! Download history ledger.
//!
//! One `guid:sourceFilename` line per past download, oldest first. The file
//! is read whole at the start of a cycle and rewritten whole at the end.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::LedgerError;
use super::RotationPolicy;
use crate::download::replace_file;

/// A single ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry(String);

impl LedgerEntry {
    pub fn new(guid: &str, source_filename: &str) -> Self {
        Self(format!("{guid}:{source_filename}"))
    }

    /// Text before the first `:`; the whole line if there is none.
    pub fn guid(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(guid, _)| guid)
    }

    pub fn source_filename(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, name)| name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LedgerEntry {
    fn from(line: &str) -> Self {
        Self(line.to_string())
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// `{destination}/{id}_log.txt`
    pub fn path_for(destination: &Path, id: &str) -> PathBuf {
        destination.join(format!("{id}_log.txt"))
    }

    /// Read the ledger at `path`. A missing file is an empty history.
    pub async fn load(path: &Path) -> Result<Self, LedgerError> {
        let entries = match tokio::fs::read_to_string(path).await {
            Ok(content) => content.lines().map(LedgerEntry::from).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(LedgerError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Overwrite the ledger file with the current entries, newline-joined.
    pub async fn save(&self) -> Result<(), LedgerError> {
        let content = self
            .entries
            .iter()
            .map(LedgerEntry::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        replace_file(&self.path, content.as_bytes())
            .await
            .map_err(|source| LedgerError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "Ledger saved");
        Ok(())
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// GUIDs of the last `window` entries. Empty when `window` is zero.
    pub fn ignore_set(&self, window: usize) -> HashSet<String> {
        let start = self.entries.len().saturating_sub(window);
        self.entries[start..]
            .iter()
            .map(|e| e.guid().to_string())
            .collect()
    }

    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Drop the oldest entries beyond the retention bound. The ignore window
    /// takes precedence over the download log size. Returns how many entries
    /// were dropped.
    pub fn trim(&mut self, policy: &RotationPolicy) -> usize {
        let Some(limit) = policy.retention() else {
            return 0;
        };
        let excess = self.entries.len().saturating_sub(limit);
        self.entries.drain(..excess);
        excess
    }
}
