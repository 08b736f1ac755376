//! File system utils.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use fs2::FileExt;

pub struct FsHandler;

impl FsHandler {
    /// Create a directory (and its parents) if it doesn't exist.
    pub fn create_dir(path: &Path) -> std::io::Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
            tracing::debug!("Created directory: {}", path.display());
        }
        Ok(())
    }

    /// Replace `path` with `contents` so readers observe either the old or the new file.
    ///
    /// The data is written and synced to a sibling temporary file which is then
    /// renamed over the destination.
    pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        Self::create_dir(parent)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp_path = parent.join(format!(".{file_name}.tmp-{}", std::process::id()));

        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(contents)?;
            tmp.sync_all()?;
        }

        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        Ok(())
    }

    /// Append a single line to `path`, creating it if needed.
    pub fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            Self::create_dir(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        file.sync_all()
    }

    /// Take an exclusive advisory lock on `path`, blocking until it is available.
    ///
    /// The lock is released when the returned guard is dropped.
    pub fn lock_exclusive(path: &Path) -> std::io::Result<FileLock> {
        if let Some(parent) = path.parent() {
            Self::create_dir(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;

        tracing::trace!(path = %path.display(), "Acquired file lock");

        Ok(FileLock {
            file,
            path: path.to_path_buf(),
        })
    }
}

/// Guard for an advisory file lock.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(err = ?e, path = %self.path.display(), "Failed to release file lock");
        }
    }
}
