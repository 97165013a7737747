use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunker::Chunker;
use crate::types::{Chunk, Document};

/// Loads extracted `.txt` legal texts from a directory tree.
#[derive(Debug, Default)]
pub struct DataProcessor;

impl DataProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        self.load_files(data_dir, None)
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        self.load_files(data_dir, Some(limit))
    }

    pub fn process_directory(&self, data_dir: &Path, chunker: &Chunker) -> Result<Vec<Chunk>> {
        let docs = self.load_directory(data_dir)?;
        Ok(chunker.chunk_all(&docs))
    }

    fn load_files(&self, data_dir: &Path, limit: Option<usize>) -> Result<Vec<Document>> {
        let mut files = self.list_txt_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        if let Some(limit) = limit {
            if files.len() > limit {
                files.truncate(limit);
                tracing::info!(limit, "limited to first files");
            }
        }
        let mut docs = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(
                n = file_index + 1,
                total = files.len(),
                file = %file_path.display(),
                "loading document"
            );
            let text = self.read_file_content(file_path)?;
            if text.trim().is_empty() {
                tracing::warn!(file = %file_path.display(), "skipping empty document");
                continue;
            }
            docs.push(self.document_from_path(file_path, text));
        }
        tracing::info!(files = files.len(), documents = docs.len(), "loaded documents");
        Ok(docs)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn document_from_path(&self, file_path: &Path, text: String) -> Document {
        let stem =
            file_path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let act_name = stem.trim_end_matches("_processed").to_string();
        let title = act_name.replace('_', " ");
        let mut doc = Document::new(title, text).with_act_name(act_name);
        if let Some(name) = file_path.file_name() {
            doc = doc.with_source_file(name.to_string_lossy());
        }
        doc
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
            .map(|e| e.path().to_path_buf())
            .collect();
        txt_files.sort();
        txt_files
    }
}
