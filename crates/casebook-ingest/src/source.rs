//! Transcript sources.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Hands out raw transcripts in bounded batches. Ordering and batching
/// policy belong to the source, not the caller.
pub trait TranscriptSource {
    /// Return up to `n` raw transcripts; an empty batch means exhausted.
    fn next_batch(&mut self, n: usize) -> Result<Vec<String>>;
}

/// Reads `.txt` transcripts from a directory tree in path order.
pub struct DirSource {
    files: Vec<PathBuf>,
    cursor: usize,
}

impl DirSource {
    pub fn new(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();
        Ok(Self { files, cursor: 0 })
    }

    pub fn remaining(&self) -> usize {
        self.files.len() - self.cursor
    }
}

impl TranscriptSource for DirSource {
    fn next_batch(&mut self, n: usize) -> Result<Vec<String>> {
        let mut batch = Vec::new();
        while batch.len() < n && self.cursor < self.files.len() {
            let path = &self.files[self.cursor];
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading transcript {}", path.display()))?;
            batch.push(text);
            self.cursor += 1;
        }
        Ok(batch)
    }
}

/// In-memory source for tests and embedding callers.
pub struct MemorySource {
    transcripts: Vec<String>,
    cursor: usize,
}

impl MemorySource {
    pub fn new(transcripts: Vec<String>) -> Self {
        Self {
            transcripts,
            cursor: 0,
        }
    }
}

impl TranscriptSource for MemorySource {
    fn next_batch(&mut self, n: usize) -> Result<Vec<String>> {
        let end = (self.cursor + n).min(self.transcripts.len());
        let batch = self.transcripts[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_batches_in_order() {
        let mut source = MemorySource::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(source.next_batch(2).unwrap(), vec!["a", "b"]);
        assert_eq!(source.next_batch(2).unwrap(), vec!["c"]);
        assert!(source.next_batch(2).unwrap().is_empty());
    }

    #[test]
    fn dir_source_walks_txt_files_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();
        std::fs::write(dir.path().join("ignored.json"), "{}").unwrap();

        let mut source = DirSource::new(dir.path()).unwrap();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_batch(10).unwrap(), vec!["first", "second"]);
    }
}
