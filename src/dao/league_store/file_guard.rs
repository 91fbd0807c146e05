//! Lock detection, backup-before-write and atomic replacement shared by file stores.

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use time::{OffsetDateTime, macros::format_description};
use tracing::{debug, info};

use crate::dao::storage::{StorageError, StorageResult};

/// Where copies of the store go before it is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupPolicy {
    /// Never copy the store.
    Disabled,
    /// Copy next to the store file.
    #[default]
    Beside,
    /// Copy into the given directory, creating it when needed.
    Directory(PathBuf),
}

/// Guards a single store file.
#[derive(Debug, Clone)]
pub(crate) struct FileGuard {
    path: PathBuf,
    backups: BackupPolicy,
}

impl FileGuard {
    pub(crate) fn new(path: PathBuf, backups: BackupPolicy) -> Self {
        Self { path, backups }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling marker written by whichever process has the store open.
    pub(crate) fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    pub(crate) fn ensure_unlocked(&self) -> StorageResult<()> {
        if self.lock_path().exists() {
            return Err(StorageError::Locked {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Fail with an unavailable error when the store file cannot be opened for reading.
    pub(crate) fn ensure_readable(&self) -> StorageResult<()> {
        self.ensure_unlocked()?;
        fs::File::open(&self.path).map(drop).map_err(|err| {
            StorageError::unavailable(format!("cannot open `{}`", self.path.display()), err)
        })
    }

    /// Copy the store aside according to the backup policy.
    ///
    /// Nothing is copied when the store file does not exist yet.
    pub(crate) fn backup(&self) -> StorageResult<Option<PathBuf>> {
        let directory = match &self.backups {
            BackupPolicy::Disabled => return Ok(None),
            BackupPolicy::Beside => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            BackupPolicy::Directory(directory) => directory.clone(),
        };
        if !self.path.exists() {
            return Ok(None);
        }

        if !directory.as_os_str().is_empty() {
            fs::create_dir_all(&directory).map_err(|err| {
                StorageError::unavailable(
                    format!("cannot create backup directory `{}`", directory.display()),
                    err,
                )
            })?;
        }

        let target = self.backup_target(&directory)?;
        fs::copy(&self.path, &target).map_err(|err| {
            StorageError::unavailable(
                format!("cannot back up `{}`", self.path.display()),
                err,
            )
        })?;
        info!(
            store = %self.path.display(),
            backup = %target.display(),
            "store backup written"
        );
        Ok(Some(target))
    }

    /// Write the store through a temporary sibling, then move it into place.
    pub(crate) fn replace_with<F>(&self, write: F) -> StorageResult<()>
    where
        F: FnOnce(&Path) -> StorageResult<()>,
    {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        let temporary = self.path.with_file_name(name);

        if let Err(err) = write(&temporary) {
            let _ = fs::remove_file(&temporary);
            return Err(err);
        }

        fs::rename(&temporary, &self.path).map_err(|err| {
            let _ = fs::remove_file(&temporary);
            StorageError::unavailable(
                format!("cannot replace `{}`", self.path.display()),
                err,
            )
        })?;
        debug!(store = %self.path.display(), "store file replaced");
        Ok(())
    }

    fn backup_target(&self, directory: &Path) -> StorageResult<PathBuf> {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "league".into());
        let extension = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        let timestamp = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year][month][day]_[hour][minute][second]"
            ))
            .map_err(|err| StorageError::unavailable("cannot format backup timestamp".into(), err))?;

        for attempt in 0u32.. {
            let suffix = if attempt == 0 {
                String::new()
            } else {
                format!("_{attempt}")
            };
            let mut file_name = format!("{stem}_backup_{timestamp}{suffix}");
            if let Some(extension) = &extension {
                file_name.push('.');
                file_name.push_str(extension);
            }
            let candidate = directory.join(file_name);
            if !candidate.exists() {
                return Ok(candidate);
            }
        }

        Err(StorageError::Malformed {
            message: "exhausted backup file names".into(),
        })
    }
}
