use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;

/// One fully rendered output file
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Destination for the artifacts of one run
///
/// Implementations receive every artifact of a run at once and either store
/// all of them or none.
pub trait OutputSink {
    fn write_all(&mut self, artifacts: &[Artifact]) -> Result<()>;
}

/// Writes artifacts to disk by staging `*.tmp` siblings and renaming them
///
/// Existing targets are moved to `*.bak` while committing. If any rename fails
/// the targets already committed are removed and their backups restored.
#[derive(Debug, Default)]
pub struct FileSink;

impl FileSink {
    pub fn new() -> Self {
        Self
    }

    fn staging_path(path: &Path) -> PathBuf {
        Self::sibling(path, ".tmp")
    }

    fn backup_path(path: &Path) -> PathBuf {
        Self::sibling(path, ".bak")
    }

    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(suffix);
        path.with_file_name(name)
    }

    fn remove_quietly(path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    fn discard(staged: &[Staged<'_>]) {
        for entry in staged {
            Self::remove_quietly(&entry.tmp);
        }
    }

    /// Move one staged file into place, keeping any previous file as a backup
    fn commit_one(entry: &mut Staged<'_>) -> std::io::Result<()> {
        if entry.target.is_file() {
            let backup = Self::backup_path(entry.target);
            fs::rename(entry.target, &backup)?;
            entry.backup = Some(backup);
        }
        fs::rename(&entry.tmp, entry.target)
    }

    /// Undo committed entries and put their previous files back
    fn roll_back(committed: &[Staged<'_>]) {
        for entry in committed {
            Self::remove_quietly(entry.target);
            Self::restore_backup(entry);
        }
    }

    fn restore_backup(entry: &Staged<'_>) {
        if let Some(backup) = &entry.backup {
            if let Err(e) = fs::rename(backup, entry.target) {
                warn!(
                    "Failed to restore {} from {}: {}",
                    entry.target.display(),
                    backup.display(),
                    e
                );
            }
        }
    }
}

/// An artifact written to its staging file, not yet moved into place
struct Staged<'a> {
    tmp: PathBuf,
    target: &'a Path,
    backup: Option<PathBuf>,
}

impl OutputSink for FileSink {
    fn write_all(&mut self, artifacts: &[Artifact]) -> Result<()> {
        let mut staged: Vec<Staged<'_>> = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            if let Some(parent) = artifact.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = fs::create_dir_all(parent) {
                    Self::discard(&staged);
                    return Err(e.into());
                }
            }
            let tmp = Self::staging_path(&artifact.path);
            if let Err(e) = fs::write(&tmp, &artifact.contents) {
                Self::discard(&staged);
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
            debug!("Staged {}", tmp.display());
            staged.push(Staged {
                tmp,
                target: artifact.path.as_path(),
                backup: None,
            });
        }

        for index in 0..staged.len() {
            if let Err(e) = Self::commit_one(&mut staged[index]) {
                // the failed entry may already have moved its previous file aside
                Self::restore_backup(&staged[index]);
                Self::roll_back(&staged[..index]);
                Self::discard(&staged[index..]);
                return Err(e.into());
            }
        }

        for entry in &staged {
            if let Some(backup) = &entry.backup {
                Self::remove_quietly(backup);
            }
        }
        Ok(())
    }
}

/// Keeps artifacts in memory, for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemorySink {
    artifacts: Vec<Artifact>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Contents written for a path, if any
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.artifacts
            .iter()
            .rev()
            .find(|a| a.path == path.as_ref())
            .map(|a| a.contents.as_str())
    }
}

impl OutputSink for InMemorySink {
    fn write_all(&mut self, artifacts: &[Artifact]) -> Result<()> {
        self.artifacts.extend_from_slice(artifacts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_writes_all_artifacts() {
        let dir = tempdir().unwrap();
        let blocks = dir.path().join("out/blocks.tf");
        let script = dir.path().join("import.bat");

        let mut sink = FileSink::new();
        sink.write_all(&[Artifact::new(&blocks, "a"), Artifact::new(&script, "b")])
            .unwrap();

        assert_eq!(fs::read_to_string(&blocks).unwrap(), "a");
        assert_eq!(fs::read_to_string(&script).unwrap(), "b");
        assert!(!FileSink::staging_path(&blocks).exists());
    }

    #[test]
    fn test_file_sink_leaves_nothing_when_a_target_is_unwritable() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("blocks.tf");
        // a directory in the way of the second artifact's parent
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "file, not dir").unwrap();
        let bad = blocker.join("import.bat");

        let mut sink = FileSink::new();
        let result = sink.write_all(&[Artifact::new(&good, "a"), Artifact::new(&bad, "b")]);

        assert!(result.is_err());
        assert!(!good.exists());
        assert!(!FileSink::staging_path(&good).exists());
    }

    #[test]
    fn test_file_sink_rolls_back_when_a_rename_fails() {
        let dir = tempdir().unwrap();
        let blocks = dir.path().join("rules.tf");
        // a non-empty directory cannot be replaced by a file
        let script = dir.path().join("import.bat");
        fs::create_dir(&script).unwrap();
        fs::write(script.join("keep"), "x").unwrap();

        let mut sink = FileSink::new();
        let result = sink.write_all(&[Artifact::new(&blocks, "new"), Artifact::new(&script, "b")]);

        assert!(result.is_err());
        assert!(!blocks.exists());
        assert!(script.join("keep").exists());
        assert!(!FileSink::staging_path(&blocks).exists());
        assert!(!FileSink::staging_path(&script).exists());
    }

    #[test]
    fn test_file_sink_restores_previous_output_on_failed_rename() {
        let dir = tempdir().unwrap();
        let blocks = dir.path().join("rules.tf");
        fs::write(&blocks, "old").unwrap();
        let script = dir.path().join("import.bat");
        fs::create_dir(&script).unwrap();
        fs::write(script.join("keep"), "x").unwrap();

        let mut sink = FileSink::new();
        let result = sink.write_all(&[Artifact::new(&blocks, "new"), Artifact::new(&script, "b")]);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&blocks).unwrap(), "old");
        assert!(!FileSink::backup_path(&blocks).exists());
        assert!(!FileSink::staging_path(&blocks).exists());
    }

    #[test]
    fn test_file_sink_replaces_existing_output_and_drops_backup() {
        let dir = tempdir().unwrap();
        let blocks = dir.path().join("rules.tf");
        fs::write(&blocks, "old").unwrap();

        FileSink::new().write_all(&[Artifact::new(&blocks, "new")]).unwrap();

        assert_eq!(fs::read_to_string(&blocks).unwrap(), "new");
        assert!(!FileSink::backup_path(&blocks).exists());
    }

    #[test]
    fn test_in_memory_sink_get() {
        let mut sink = InMemorySink::new();
        sink.write_all(&[Artifact::new("x.tf", "one")]).unwrap();
        assert_eq!(sink.get("x.tf"), Some("one"));
        assert_eq!(sink.get("y.tf"), None);
        assert_eq!(sink.artifacts().len(), 1);
    }
}
