use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Numbered per-chapter text files under one directory.
///
/// Files are named `{prefix}_chapter{NNN}.txt`, 1-indexed and zero-padded to
/// three digits so that name order is chapter order.
pub struct ChapterFiles {
    dir: PathBuf,
    prefix: String,
}

impl ChapterFiles {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Path of the chapter at 0-based `index`.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}_chapter{:03}.txt", self.prefix, index + 1))
    }

    pub fn write(&self, index: usize, text: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(index);
        fs::write(&path, text)
            .with_context(|| format!("Failed to write chapter: {}", path.display()))?;
        debug!(path = %path.display(), chars = text.len(), "Wrote chapter text");
        Ok(path)
    }

    /// Replace every chapter file of this prefix with `chapters`.
    pub fn write_all(&self, chapters: &[String]) -> Result<()> {
        let removed = self.remove_stale()?;
        if removed > 0 {
            debug!(removed, dir = %self.dir.display(), "Removed chapter texts from an earlier run");
        }
        for (i, chapter) in chapters.iter().enumerate() {
            self.write(i, chapter)?;
        }
        info!(
            chapters = chapters.len(),
            dir = %self.dir.display(),
            "Saved chapter texts"
        );
        Ok(())
    }

    /// Delete `{prefix}_chapter*.txt` files already in the directory.
    fn remove_stale(&self) -> Result<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }
        let stem = format!("{}_chapter", self.prefix);
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list chapter texts in {}", self.dir.display()))?;

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let is_chapter = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&stem) && name.ends_with(".txt"));
            if is_chapter && path.is_file() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Re-read every `.txt` file in the directory, ordered by file name.
    pub fn read_existing(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list chapter texts in {}", self.dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if files.is_empty() {
            bail!("No chapter texts found in {}", self.dir.display());
        }

        let mut chapters = Vec::with_capacity(files.len());
        for path in &files {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read chapter: {}", path.display()))?;
            chapters.push(text);
        }
        info!(
            chapters = chapters.len(),
            dir = %self.dir.display(),
            "Loaded existing chapter texts"
        );
        Ok(chapters)
    }
}
