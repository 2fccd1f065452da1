use super::types::DocumentMetadata;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Append-only JSON array of [`DocumentMetadata`] records.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Adds `record` to the end of the file. Existing entries are kept as-is,
    /// including ones this version can not parse.
    pub fn append(&self, record: &DocumentMetadata) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory for {}", self.path.display())
            })?;
        }

        let mut entries = self.load_raw();
        entries.push(serde_json::to_value(record).context("Failed to serialize metadata record")?);

        let new_content = serde_json::to_string_pretty(&entries)
            .with_context(|| format!("Failed to serialize {} metadata records", entries.len()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, new_content)
            .with_context(|| format!("Failed to write metadata to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace metadata file {}", self.path.display()))?;

        log::info!(
            "Saved metadata for collection {} ({} records total)",
            record.collection_name,
            entries.len()
        );
        Ok(())
    }

    /// Every record in the file, oldest first. Missing or unreadable files read as empty.
    pub fn load_all(&self) -> Vec<DocumentMetadata> {
        self.load_raw()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping unreadable metadata record: {}", e);
                    None
                }
            })
            .collect()
    }

    fn load_raw(&self) -> Vec<Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                log::warn!(
                    "Metadata file {} does not hold a list; starting a new one",
                    self.path.display()
                );
                Vec::new()
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse metadata file {}, starting a new one. Error: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }
}
