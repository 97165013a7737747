//! JSON persistence for [`VectorIndex`].
//!
//! Every entry carries the BLAKE3 digest of its content, checked on load.
//! Saves go to a temporary file in the target directory and are renamed into
//! place, so a reader never sees a half-written index.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use lexdb_core::error::{Error, Result};
use lexdb_core::types::{Chunk, IndexEntry};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::index::{content_hash, VectorIndex};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
    normalized: bool,
    built_at: DateTime<Utc>,
    entries: Vec<StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    title: String,
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    chunk_id: usize,
    seq: usize,
    start: usize,
    content: String,
    content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
}

impl VectorIndex {
    /// Writes the index atomically to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let file = IndexFile {
            format_version: FORMAT_VERSION,
            embedder_id: self.embedder_id.clone(),
            dimension: self.dimension,
            normalized: self.normalized,
            built_at: self.built_at,
            entries: self.entries.iter().map(to_stored).collect(),
        };

        let tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &file)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).with_context(|| format!("persisting index to {}", path.display()))?;
        tracing::info!(path = %path.display(), chunks = self.entries.len(), "index saved");
        Ok(())
    }

    /// Reads and verifies an index written by [`VectorIndex::save`].
    ///
    /// A missing file is `NotFound`; anything unreadable or inconsistent is
    /// `CorruptIndex`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let reader = BufReader::new(fs::File::open(path)?);
        let file: IndexFile =
            serde_json::from_reader(reader).map_err(|e| Error::corrupt_index(path, e))?;
        let index = from_file(file).map_err(|reason| Error::corrupt_index(path, reason))?;
        tracing::info!(
            path = %path.display(),
            chunks = index.len(),
            vectors = index.has_vectors(),
            embedder = index.embedder_id().unwrap_or("-"),
            "index loaded"
        );
        Ok(index)
    }
}

fn to_stored(entry: &IndexEntry) -> StoredEntry {
    StoredEntry {
        title: entry.chunk.title.clone(),
        source: entry.chunk.source().to_string(),
        source_file: entry.chunk.source_file.clone(),
        chunk_id: entry.chunk_id,
        seq: entry.chunk.seq,
        start: entry.chunk.start,
        content: entry.chunk.text.clone(),
        content_hash: entry.content_hash.clone(),
        embedding: entry.vector.clone(),
    }
}

fn from_file(file: IndexFile) -> std::result::Result<VectorIndex, String> {
    if file.format_version != FORMAT_VERSION {
        return Err(format!("unsupported format version {}", file.format_version));
    }
    let with_vectors = file.entries.iter().filter(|e| e.embedding.is_some()).count();
    if with_vectors != 0 && with_vectors != file.entries.len() {
        return Err(format!("{} of {} entries carry embeddings", with_vectors, file.entries.len()));
    }
    if with_vectors > 0 && file.dimension.is_none() {
        return Err("embeddings present but no dimension recorded".into());
    }

    let mut entries = Vec::with_capacity(file.entries.len());
    for (pos, stored) in file.entries.into_iter().enumerate() {
        if stored.chunk_id != pos {
            return Err(format!("entry {} has chunk_id {}", pos, stored.chunk_id));
        }
        if content_hash(&stored.content) != stored.content_hash {
            return Err(format!("content hash mismatch for chunk {}", pos));
        }
        if let (Some(v), Some(dim)) = (&stored.embedding, file.dimension) {
            if v.len() != dim {
                return Err(format!("chunk {} has dimension {}, expected {}", pos, v.len(), dim));
            }
        }
        entries.push(IndexEntry {
            chunk_id: stored.chunk_id,
            chunk: Chunk {
                title: stored.title,
                source_file: stored.source_file,
                seq: stored.seq,
                start: stored.start,
                text: stored.content,
            },
            content_hash: stored.content_hash,
            vector: stored.embedding,
        });
    }

    let dimension = if with_vectors > 0 { file.dimension } else { None };
    Ok(VectorIndex {
        entries,
        embedder_id: file.embedder_id,
        dimension,
        normalized: file.normalized && with_vectors > 0,
        built_at: file.built_at,
    })
}
