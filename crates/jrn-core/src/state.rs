//! Single-value persistence for the last notified row key.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::Result;

/// On-disk marker holding the key of the last row that was *successfully*
/// notified. Written only after a confirmed send, so a failed send leaves the
/// previous key in place and the change is retried on the next cycle. Never
/// deleted by the program itself.
#[derive(Clone, Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last notified key, or the empty string when no state exists yet.
    pub fn load(&self) -> Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        let txt = fs::read_to_string(&self.path)?;
        Ok(txt.trim().to_string())
    }

    /// Overwrite the persisted key. The value goes to a sibling temp file
    /// first and is renamed into place, so an interrupted write leaves either
    /// the old value or the new one.
    pub fn save(&self, key: &str) -> Result<()> {
        let tmp = self.tmp_path();
        fs::write(&tmp, key)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "last_result.txt".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
