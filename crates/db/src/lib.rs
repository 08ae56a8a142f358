pub mod catalog;
pub mod error;

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

pub use model::Snapshot;

/// Snapshot store backed by a single JSON document on disk.
pub struct Database(Option<PathBuf>);

impl From<PathBuf> for Database {
    fn from(path: PathBuf) -> Self {
        Self(Some(path))
    }
}

impl Database {
    /// A store that keeps nothing. Loads find no snapshot and saves succeed
    /// without touching the disk.
    pub const fn ephemeral() -> Self {
        Self(None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.0.as_deref()
    }

    /// Reads the last saved snapshot. A missing file is a fresh start, not an error.
    pub fn load(&self) -> error::Result<Option<Snapshot>> {
        let Some(path) = self.path() else {
            return Ok(None);
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Replaces the snapshot on disk. The document is staged next to the target
    /// and renamed over it so that readers never observe a partial write.
    pub fn save(&self, snapshot: &Snapshot) -> error::Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let mut staging = OsString::from(path.as_os_str());
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, bytes)?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}
