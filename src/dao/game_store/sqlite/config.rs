use std::{path::PathBuf, time::Duration};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration describing where the embedded store lives.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file.
    pub path: PathBuf,
    /// How long a statement waits on a locked database.
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    /// Construct a configuration for the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}
