//! Splits documents into overlapping, bounded chunks.
//!
//! Two splitters are available:
//! - `window`: fixed windows of `chunk_size` chars advanced by
//!   `chunk_size - chunk_overlap` until the window start passes the end of
//!   the text, ignoring text structure. Trailing windows shorter than
//!   `min_chunk_size` are dropped.
//! - `recursive`: splits on the first structural separator present
//!   (paragraph, line, sentence, clause, word, char), merges adjacent pieces up
//!   to `chunk_size` and carries up to `chunk_overlap` chars into the next chunk.
//!
//! All lengths and offsets are counted in chars, never bytes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Separator priority for the recursive splitter. The empty separator is the
/// hard per-char cut of last resort.
pub const SEPARATORS: [&str; 8] = ["\n\n", "\n", ". ", "! ", "? ", ", ", " ", ""];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitterKind {
    #[default]
    Window,
    Recursive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
    pub splitter: SplitterKind,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 100,
            splitter: SplitterKind::Window,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.min_chunk_size > self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "min_chunk_size ({}) must not exceed chunk_size ({})",
                self.min_chunk_size, self.chunk_size
            )));
        }
        Ok(())
    }
}

struct Piece<'a> {
    start: usize,
    len: usize,
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        self.split_text(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(seq, (start, text))| Chunk {
                title: doc.title.clone(),
                source_file: doc.source_file.clone(),
                seq,
                start,
                text,
            })
            .collect()
    }

    pub fn chunk_all(&self, docs: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = docs.iter().flat_map(|d| self.chunk(d)).collect();
        tracing::debug!(documents = docs.len(), chunks = chunks.len(), "chunked documents");
        chunks
    }

    /// Returns `(start_char, text)` pairs in document order.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.config.chunk_size {
            return vec![(0, text.to_string())];
        }
        let mut out = match self.config.splitter {
            SplitterKind::Window => self.split_window(text),
            SplitterKind::Recursive => {
                let mut out = Vec::new();
                self.split_recursive(text, 0, &SEPARATORS, &mut out);
                out.retain(|(_, t)| !t.trim().is_empty());
                out
            }
        };
        let min = self.config.min_chunk_size;
        while out.len() > 1 && out.last().is_some_and(|(_, t)| t.chars().count() < min) {
            out.pop();
        }
        out
    }

    fn split_window(&self, text: &str) -> Vec<(usize, String)> {
        let bounds: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let n = bounds.len() - 1;
        let stride = self.config.chunk_size - self.config.chunk_overlap;
        let mut out = Vec::new();
        let mut start = 0;
        while start < n {
            let end = (start + self.config.chunk_size).min(n);
            out.push((start, text[bounds[start]..bounds[end]].to_string()));
            start += stride;
        }
        out
    }

    fn split_recursive(
        &self,
        text: &str,
        base: usize,
        separators: &[&str],
        out: &mut Vec<(usize, String)>,
    ) {
        let (separator, rest) = pick_separator(text, separators);
        let mut pieces = Vec::new();
        let mut offset = base;
        if separator.is_empty() {
            for (i, ch) in text.char_indices() {
                pieces.push(Piece { start: offset, len: 1, text: &text[i..i + ch.len_utf8()] });
                offset += 1;
            }
        } else {
            for part in text.split_inclusive(separator) {
                let len = part.chars().count();
                pieces.push(Piece { start: offset, len, text: part });
                offset += len;
            }
        }

        let mut pending: Vec<Piece<'_>> = Vec::new();
        for piece in pieces {
            if piece.len <= self.config.chunk_size {
                pending.push(piece);
                continue;
            }
            self.merge(&pending, out);
            pending.clear();
            self.split_recursive(piece.text, piece.start, rest, out);
        }
        self.merge(&pending, out);
    }

    fn merge(&self, pieces: &[Piece<'_>], out: &mut Vec<(usize, String)>) {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut window: VecDeque<&Piece<'_>> = VecDeque::new();
        let mut total = 0;
        for piece in pieces {
            if total + piece.len > size && !window.is_empty() {
                out.push(emit(&window));
                while total > overlap || (total + piece.len > size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= front.len,
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += piece.len;
        }
        if !window.is_empty() {
            out.push(emit(&window));
        }
    }
}

fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn emit(window: &VecDeque<&Piece<'_>>) -> (usize, String) {
    let start = window.front().map_or(0, |p| p.start);
    (start, window.iter().map(|p| p.text).collect())
}
