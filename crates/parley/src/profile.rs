use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parley_core::profile::ProfileStore;
use tokio::fs;

/// A profile store backed by a markdown file.
///
/// The file is created empty the first time the profile is loaded.
#[derive(Clone, Debug)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    /// Creates a store reading and writing the file at `path`.
    #[inline]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the profile file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn load(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(profile) => Ok(profile),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("creating profile file at {}", self.path.display());
                fs::write(&self.path, "").await?;
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn save(&self, profile: &str) -> io::Result<()> {
        fs::write(&self.path, profile).await
    }
}
