use std::{
    fs,
    path::{Path, PathBuf},
};

use core_types::error::Result;

pub const ACCOUNTS_DUMP: &str = "accounts.dump";
pub const PAYMENTS_DUMP: &str = "payments.dump";
pub const FAVORITES_DUMP: &str = "favorites.dump";

/// Path layout for a dump directory.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.dir.join(ACCOUNTS_DUMP)
    }

    pub fn payments_path(&self) -> PathBuf {
        self.dir.join(PAYMENTS_DUMP)
    }

    pub fn favorites_path(&self) -> PathBuf {
        self.dir.join(FAVORITES_DUMP)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }
}
