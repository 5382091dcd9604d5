//! Filesystem page persister
//!
//! Writes each page to its own file inside a single output directory.

use crate::bucket::DateBucket;
use crate::output::traits::{artifact_name, OutputError, OutputResult, PagePersister};
use std::path::{Path, PathBuf};

/// Persists pages as individual files in a directory
#[derive(Debug, Clone)]
pub struct FilePersister {
    dir: PathBuf,
}

impl FilePersister {
    /// Opens a persister rooted at `dir`, creating the directory if absent
    ///
    /// # Arguments
    ///
    /// * `dir` - The output directory
    ///
    /// # Returns
    ///
    /// * `Ok(FilePersister)` - The directory exists and is ready
    /// * `Err(OutputError::CreateDir)` - The directory could not be created
    pub async fn create(dir: impl Into<PathBuf>) -> OutputResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| OutputError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        Ok(Self { dir })
    }

    /// The directory pages are written into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the artifact for a page
    pub fn artifact_path(&self, bucket: &DateBucket, page_index: u32) -> PathBuf {
        self.dir.join(artifact_name(bucket, page_index))
    }
}

impl PagePersister for FilePersister {
    async fn persist(
        &self,
        bucket: &DateBucket,
        page_index: u32,
        payload: &[u8],
    ) -> OutputResult<()> {
        let path = self.artifact_path(bucket, page_index);

        tokio::fs::write(&path, payload)
            .await
            .map_err(|source| OutputError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::trace!(path = %path.display(), bytes = payload.len(), "Page written");
        Ok(())
    }
}
