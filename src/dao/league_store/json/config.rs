use std::path::PathBuf;

use crate::dao::league_store::BackupPolicy;

/// Runtime configuration describing where the JSON league file lives.
#[derive(Debug, Clone)]
pub struct JsonStoreConfig {
    /// League file location.
    pub path: PathBuf,
    /// Backup-before-write policy.
    pub backups: BackupPolicy,
}

impl JsonStoreConfig {
    /// Configuration for the file at `path`, backing up next to it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backups: BackupPolicy::default(),
        }
    }

    /// Override where backups are written before each save.
    pub fn with_backups(mut self, backups: BackupPolicy) -> Self {
        self.backups = backups;
        self
    }
}
