//! Staging of uploaded import files.
//!
//! An upload is written to the configured directory as
//! `{20 hex chars}-{original file name}` and removed once the ledger has
//! committed its entries.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use engine::StagedSource;
use uuid::Uuid;

const FALLBACK_FILE_NAME: &str = "import.csv";
const PREFIX_LEN: usize = 20;

/// An uploaded file sitting in the staging directory.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Writes `bytes` into `directory` under a fresh, collision-free name.
    pub async fn stage(directory: &Path, original_name: &str, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(directory).await?;
        let path = directory.join(staged_file_name(original_name));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "staged upload");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes a staged file that was not released by a successful import.
    pub async fn discard(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(path = %path.display(), "failed to discard upload: {err}"),
        }
    }
}

impl StagedSource for StagedFile {
    type Reader = File;

    fn reader(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    async fn release(self) -> io::Result<()> {
        tokio::fs::remove_file(&self.path).await
    }
}

/// Keeps only the final path component of the client-supplied name.
fn staged_file_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME);
    let prefix = Uuid::new_v4().simple().to_string();
    format!("{}-{base}", &prefix[..PREFIX_LEN])
}
