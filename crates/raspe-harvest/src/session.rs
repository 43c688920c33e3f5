//! Per-harvest storage.

use raspe_core::{PageRange, PayloadFormat};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Storage and counters for one pagination run.
///
/// Each session owns a fresh directory; payloads are written as
/// `{source}_{page:05}.{ext}` so a sorted listing follows page order.
#[derive(Debug)]
pub struct HarvestSession {
    source: String,
    format: PayloadFormat,
    dir: PathBuf,
    range: PageRange,
    succeeded: u32,
    skipped: u32,
}

impl HarvestSession {
    /// Create a new session directory under `root/source/`.
    pub fn create(root: &Path, source: &str, format: PayloadFormat) -> io::Result<Self> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        let unique = uuid::Uuid::new_v4().simple().to_string();
        let dir = root
            .join(source.to_lowercase())
            .join(format!("{stamp}-{}", &unique[..8]));
        fs::create_dir_all(&dir)?;

        tracing::debug!(source, dir = %dir.display(), "Created harvest session");
        Ok(Self {
            source: source.to_string(),
            format,
            dir,
            range: PageRange::empty(),
            succeeded: 0,
            skipped: 0,
        })
    }

    /// Session directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Effective page range of the run.
    #[must_use]
    pub fn range(&self) -> PageRange {
        self.range
    }

    pub(crate) fn set_range(&mut self, range: PageRange) {
        self.range = range;
    }

    /// Pages persisted.
    #[must_use]
    pub fn succeeded(&self) -> u32 {
        self.succeeded
    }

    /// Pages given up on.
    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// File path used for logical page `page`.
    #[must_use]
    pub fn payload_path(&self, page: u32) -> PathBuf {
        self.dir.join(format!(
            "{}_{page:05}.{}",
            self.source,
            self.format.extension()
        ))
    }

    /// Write the payload for `page`.
    pub fn persist(&mut self, page: u32, payload: &[u8]) -> io::Result<PathBuf> {
        let path = self.payload_path(page);
        fs::write(&path, payload)?;
        self.succeeded += 1;
        tracing::debug!(page, path = %path.display(), bytes = payload.len(), "Saved payload");
        Ok(path)
    }

    /// All payload files under the session directory, recursively, sorted.
    pub fn payload_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_files(&self.dir, self.format.extension(), &mut files)?;
        files.sort();
        Ok(files)
    }

    /// Delete the session directory.
    pub fn remove(self) -> io::Result<()> {
        tracing::debug!(dir = %self.dir.display(), "Removing harvest session");
        fs::remove_dir_all(&self.dir)
    }
}

fn collect_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, extension, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_payload_naming() {
        let tmp = TempDir::new().unwrap();
        let session = HarvestSession::create(tmp.path(), "FOLHA", PayloadFormat::Html).unwrap();
        let path = session.payload_path(7);
        assert_eq!(path.file_name().unwrap(), "FOLHA_00007.html");
        assert!(session.dir().starts_with(tmp.path().join("folha")));
    }

    #[test]
    fn test_sessions_are_unique() {
        let tmp = TempDir::new().unwrap();
        let a = HarvestSession::create(tmp.path(), "cnj", PayloadFormat::Json).unwrap();
        let b = HarvestSession::create(tmp.path(), "cnj", PayloadFormat::Json).unwrap();
        assert_ne!(a.dir(), b.dir());
    }

    #[test]
    fn test_persist_and_list_recursively() {
        let tmp = TempDir::new().unwrap();
        let mut session = HarvestSession::create(tmp.path(), "cnj", PayloadFormat::Json).unwrap();
        session.persist(2, b"{}").unwrap();
        session.persist(1, b"{}").unwrap();

        let nested = session.dir().join("extra");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("cnj_00003.json"), "{}").unwrap();
        fs::write(session.dir().join("notes.txt"), "ignored").unwrap();

        let files = session.payload_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["cnj_00001.json", "cnj_00002.json", "cnj_00003.json"]);
        assert_eq!(session.succeeded(), 2);
    }

    #[test]
    fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let session = HarvestSession::create(tmp.path(), "ipea", PayloadFormat::Html).unwrap();
        let dir = session.dir().to_path_buf();
        session.remove().unwrap();
        assert!(!dir.exists());
    }
}
