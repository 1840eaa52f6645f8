use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Attachment payload storage. Metadata lives in the database; bytes live
/// behind this trait so tests can run without touching a real directory.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, stored_filename: &str, bytes: &[u8]) -> io::Result<()>;
    async fn get(&self, stored_filename: &str) -> io::Result<Vec<u8>>;
    async fn delete(&self, stored_filename: &str) -> io::Result<()>;
}

/// Stores each blob as a flat file under one upload directory. Stored
/// filenames are server-generated, so no path components from user input
/// ever reach the filesystem.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, stored_filename: &str) -> PathBuf {
        self.root.join(stored_filename)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, stored_filename: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(stored_filename), bytes).await
    }

    async fn get(&self, stored_filename: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path_for(stored_filename)).await
    }

    async fn delete(&self, stored_filename: &str) -> io::Result<()> {
        tokio::fs::remove_file(self.path_for(stored_filename)).await
    }
}

impl FsBlobStore {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, stored_filename: &str, bytes: &[u8]) -> io::Result<()> {
        let mut blobs = self.blobs.write().await;
        blobs.insert(stored_filename.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, stored_filename: &str) -> io::Result<Vec<u8>> {
        let blobs = self.blobs.read().await;
        blobs
            .get(stored_filename)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, stored_filename.to_string()))
    }

    async fn delete(&self, stored_filename: &str) -> io::Result<()> {
        let mut blobs = self.blobs.write().await;
        blobs
            .remove(stored_filename)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, stored_filename.to_string()))
    }
}
