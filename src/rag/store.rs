//! The live similarity index and its collection file.
//!
//! A [`VectorSession`] owns exactly one `<collection>.json` under the index
//! directory. Dropping the session leaves the file behind; [`VectorSession::close`]
//! is the only way to release it.

use super::{Embedder, search, types::Chunk};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const COLLECTION_EXTENSION: &str = "json";

#[derive(Serialize, Deserialize)]
struct CollectionFile {
    collection_name: String,
    embedding_model: String,
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f64>>,
}

#[derive(Debug)]
pub struct VectorSession {
    collection_name: String,
    path: PathBuf,
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f64>>,
}

pub fn collection_path(index_dir: &Path, collection_name: &str) -> PathBuf {
    index_dir.join(format!("{}.{}", collection_name, COLLECTION_EXTENSION))
}

impl VectorSession {
    /// Embeds `chunks` and writes the collection file. Nothing is left on disk on failure.
    pub async fn create(
        index_dir: &Path,
        collection_name: &str,
        embedding_model: &str,
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        if chunks.is_empty() {
            anyhow::bail!("Cannot build collection {} without chunks", collection_name);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        log::info!(
            "Embedding {} chunks for collection {}...",
            texts.len(),
            collection_name
        );
        let embeddings = embedder
            .embed_documents(&texts)
            .await
            .with_context(|| format!("Failed to embed chunks for {}", collection_name))?;
        if embeddings.len() != chunks.len() {
            anyhow::bail!(
                "Embedding count mismatch for {}: {} chunks, {} embeddings",
                collection_name,
                chunks.len(),
                embeddings.len()
            );
        }

        fs::create_dir_all(index_dir)
            .with_context(|| format!("Failed to create index directory: {:?}", index_dir))?;
        let path = collection_path(index_dir, collection_name);
        let file = CollectionFile {
            collection_name: collection_name.to_string(),
            embedding_model: embedding_model.to_string(),
            chunks,
            embeddings,
        };
        if let Err(e) = write_collection(&path, &file) {
            remove_if_exists(&path);
            return Err(e);
        }

        log::info!("Created collection {} at {}", collection_name, path.display());
        Ok(Self {
            collection_name: file.collection_name,
            path,
            chunks: file.chunks,
            embeddings: file.embeddings,
        })
    }

    /// Reopens a collection written by an earlier process.
    pub fn open(index_dir: &Path, collection_name: &str) -> Result<Self> {
        let path = collection_path(index_dir, collection_name);
        let file = fs::File::open(&path)
            .with_context(|| format!("Failed to open collection file: {}", path.display()))?;
        let stored: CollectionFile = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to deserialize collection: {}", path.display()))?;
        if stored.chunks.len() != stored.embeddings.len() {
            return Err(anyhow!(
                "Collection {} is inconsistent: {} chunks, {} embeddings",
                collection_name,
                stored.chunks.len(),
                stored.embeddings.len()
            ));
        }
        Ok(Self {
            collection_name: stored.collection_name,
            path,
            chunks: stored.chunks,
            embeddings: stored.embeddings,
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// The `k` chunks most similar to `query_embedding`, best first.
    pub fn similarity_search(&self, query_embedding: &[f64], k: usize) -> Vec<&Chunk> {
        search::top_k(query_embedding, &self.embeddings, k)
            .into_iter()
            .map(|(index, similarity)| {
                log::trace!(
                    "Hit chunk #{} in {} with similarity {:.4}",
                    index,
                    self.collection_name,
                    similarity
                );
                &self.chunks[index]
            })
            .collect()
    }

    /// Releases the session and deletes its collection file.
    pub fn close(self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to delete collection file: {}", self.path.display())
                });
            }
        }
        log::info!("Closed collection {}", self.collection_name);
        Ok(())
    }
}

fn write_collection(path: &Path, file: &CollectionFile) -> Result<()> {
    let json_string =
        serde_json::to_string(file).context("Failed to serialize collection to JSON")?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, json_string)
        .with_context(|| format!("Failed to write collection file: {}", tmp_path.display()))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        remove_if_exists(&tmp_path);
        return Err(e)
            .with_context(|| format!("Failed to move collection into place: {}", path.display()));
    }
    Ok(())
}

fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Deletes every collection file in `index_dir` except `keep`. Returns how many were removed.
pub fn purge_collections(index_dir: &Path, keep: Option<&str>) -> Result<usize> {
    if !index_dir.exists() {
        return Ok(0);
    }
    let keep_path = keep.map(|name| collection_path(index_dir, name));
    let mut removed = 0;
    for entry in fs::read_dir(index_dir)
        .with_context(|| format!("Failed to list index directory: {}", index_dir.display()))?
    {
        let path = entry?.path();
        let is_collection = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some(COLLECTION_EXTENSION) | Some("tmp")
        );
        if !is_collection || keep_path.as_deref() == Some(path.as_path()) {
            continue;
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove stale collection: {}", path.display()))?;
        log::info!("Removed stale collection file {}", path.display());
        removed += 1;
    }
    Ok(removed)
}
