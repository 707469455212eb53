//! Whole-file document snapshots backing undo and redo.
//!
//! A [`Snapshot`] owns its temp file. It cannot be cloned, and dropping it
//! removes the file, so every snapshot is deleted exactly once no matter
//! which path (pop and apply, eviction, clear, error) lets go of it.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};

/// File-name prefix of snapshot temp files.
pub const SNAPSHOT_PREFIX: &str = "folio-undo-";

/// File-name suffix of snapshot temp files.
pub const SNAPSHOT_SUFFIX: &str = ".pdf";

/// A byte-for-byte copy of a document file at one point in time.
#[derive(Debug)]
pub struct Snapshot {
    file: TempPath,
}

impl Snapshot {
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Copy the snapshot over `target`.
    ///
    /// The target is truncated and rewritten in place, so its inode, mode and
    /// any symlink pointing at it are kept. The snapshot is opened first: a
    /// missing snapshot fails before `target` is touched.
    pub fn restore_to(&self, target: &Path) -> io::Result<()> {
        let mut source = File::open(self.path())?;
        let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(target)?;
        io::copy(&mut source, &mut file)?;
        file.sync_all()?;
        Ok(())
    }

    /// Remove the temp file, reporting failures instead of logging them.
    pub fn delete(self) -> io::Result<()> {
        self.file.close()
    }
}

/// Creates snapshots in a configurable directory.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    dir: Option<PathBuf>,
}

impl SnapshotStore {
    /// Store writing to `dir`, or the OS temp dir when `None`.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Copy `source` into a fresh snapshot.
    ///
    /// On failure no temp file is left behind.
    pub fn create(&self, source: &Path) -> io::Result<Snapshot> {
        let dir = self.dir();
        fs::create_dir_all(&dir)?;

        let file = Builder::new()
            .prefix(SNAPSHOT_PREFIX)
            .suffix(SNAPSHOT_SUFFIX)
            .tempfile_in(&dir)?
            .into_temp_path();

        // `file` is removed on drop if the copy fails.
        fs::copy(source, &file)?;
        tracing::debug!(source = %source.display(), snapshot = %file.display(), "snapshot created");
        Ok(Snapshot { file })
    }
}

#[cfg(test)]
pub(crate) fn snapshot_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| {
                    path.file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(SNAPSHOT_PREFIX))
                })
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("doc.pdf");
        fs::write(&source, b"original").unwrap();

        let store = SnapshotStore::new(Some(dir.path().join("snaps")));
        let snapshot = store.create(&source).unwrap();

        let name = snapshot.path().file_name().unwrap().to_str().unwrap().to_owned();
        assert!(name.starts_with(SNAPSHOT_PREFIX));
        assert!(name.ends_with(SNAPSHOT_SUFFIX));
        assert_eq!(fs::read(snapshot.path()).unwrap(), b"original");
    }

    #[test]
    fn test_drop_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("doc.pdf");
        fs::write(&source, b"x").unwrap();

        let store = SnapshotStore::new(Some(dir.path().to_path_buf()));
        let snapshot = store.create(&source).unwrap();
        let path = snapshot.path().to_path_buf();
        assert!(path.exists());

        drop(snapshot);
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("doc.pdf");
        fs::write(&source, b"x").unwrap();

        let store = SnapshotStore::new(Some(dir.path().to_path_buf()));
        let snapshot = store.create(&source).unwrap();
        snapshot.delete().unwrap();
        assert!(snapshot_files(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_source_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Some(dir.path().to_path_buf()));

        assert!(store.create(&dir.path().join("missing.pdf")).is_err());
        assert!(snapshot_files(dir.path()).is_empty());
    }

    #[test]
    fn test_restore_overwrites_target() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.pdf");
        fs::write(&doc, b"before").unwrap();

        let store = SnapshotStore::new(Some(dir.path().join("snaps")));
        let snapshot = store.create(&doc).unwrap();
        fs::write(&doc, b"after edit").unwrap();

        snapshot.restore_to(&doc).unwrap();
        assert_eq!(fs::read(&doc).unwrap(), b"before");
        // The snapshot itself survives a restore.
        assert!(snapshot.path().exists());
    }

    #[test]
    fn test_restore_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.pdf");
        fs::write(&doc, b"bytes").unwrap();

        let store = SnapshotStore::new(Some(dir.path().to_path_buf()));
        let snapshot = store.create(&doc).unwrap();

        let target = dir.path().join("gone").join("doc.pdf");
        assert!(snapshot.restore_to(&target).is_err());
        assert!(snapshot.path().exists());
    }

    #[test]
    fn test_restore_with_missing_snapshot_keeps_target() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.pdf");
        fs::write(&doc, b"before").unwrap();

        let store = SnapshotStore::new(Some(dir.path().join("snaps")));
        let snapshot = store.create(&doc).unwrap();
        fs::remove_file(snapshot.path()).unwrap();
        fs::write(&doc, b"after edit").unwrap();

        assert!(snapshot.restore_to(&doc).is_err());
        assert_eq!(fs::read(&doc).unwrap(), b"after edit");
    }

    #[cfg(unix)]
    #[test]
    fn test_restore_keeps_mode_and_inode() {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.pdf");
        fs::write(&doc, b"before").unwrap();
        fs::set_permissions(&doc, fs::Permissions::from_mode(0o640)).unwrap();
        let inode = fs::metadata(&doc).unwrap().ino();

        let store = SnapshotStore::new(Some(dir.path().join("snaps")));
        let snapshot = store.create(&doc).unwrap();
        fs::write(&doc, b"after edit").unwrap();
        snapshot.restore_to(&doc).unwrap();

        let meta = fs::metadata(&doc).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o640);
        assert_eq!(meta.ino(), inode);
        assert_eq!(fs::read(&doc).unwrap(), b"before");
    }

    #[cfg(unix)]
    #[test]
    fn test_restore_through_symlink_writes_link_target() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.pdf");
        let link = dir.path().join("link.pdf");
        fs::write(&real, b"before").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let store = SnapshotStore::new(Some(dir.path().join("snaps")));
        let snapshot = store.create(&link).unwrap();
        fs::write(&real, b"after edit").unwrap();
        snapshot.restore_to(&link).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&real).unwrap(), b"before");
    }
}
