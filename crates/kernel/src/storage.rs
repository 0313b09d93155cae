//! Asset storage backends.
//!
//! Stored assets are addressed by `(category, name)` and live at
//! `<root>/<category>/<name>.jpg`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Extension of every stored asset.
pub const CANONICAL_EXTENSION: &str = "jpg";

/// URL prefix under which stored assets are served.
pub const PUBLIC_PREFIX: &str = "uploads";

/// Suffix for in-progress writes, unique within the process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Rejected name or category.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must not contain path separators or be a relative path segment")]
    Unsafe(&'static str),
}

/// Location of a stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetKey {
    category: String,
    name: String,
}

impl AssetKey {
    /// Build a key, rejecting segments that would escape the category directory.
    pub fn new(category: &str, name: &str) -> Result<Self, KeyError> {
        validate_segment("type", category)?;
        validate_segment("imageName", name)?;
        Ok(Self {
            category: category.to_string(),
            name: name.to_string(),
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>.jpg`
    pub fn file_name(&self) -> String {
        format!("{}.{CANONICAL_EXTENSION}", self.name)
    }

    /// Path relative to the storage root.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.category).join(self.file_name())
    }

    /// Path reported to callers and served by the static route,
    /// e.g. `uploads/avatars/cat.jpg`.
    pub fn public_path(&self) -> String {
        format!("{PUBLIC_PREFIX}/{}/{}", self.category, self.file_name())
    }
}

/// Validate a single path segment supplied by a caller.
pub fn validate_segment(field: &'static str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::Empty(field));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(KeyError::Unsafe(field));
    }
    Ok(())
}

/// Asset storage backend trait.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Write (or overwrite) an asset, creating directories as needed.
    async fn write(&self, key: &AssetKey, data: &[u8]) -> Result<()>;

    /// Remove an asset. Missing assets are an error.
    async fn delete(&self, key: &AssetKey) -> Result<()>;

    /// Check if an asset exists.
    async fn exists(&self, key: &AssetKey) -> Result<bool>;

    /// Read a file by its path below the storage root.
    ///
    /// Returns `Ok(None)` if the file does not exist or the path is not a
    /// plain relative path.
    async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>>;
}

/// Local filesystem storage.
pub struct LocalAssetStorage {
    /// Storage root.
    root: PathBuf,
}

impl LocalAssetStorage {
    /// Create a new local storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an asset.
    pub fn path_for(&self, key: &AssetKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Resolve a caller-supplied relative path. Only normal components are
    /// accepted, so `..`, absolute paths and prefixes are refused.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        if relative.is_empty() || relative.contains('\0') {
            return None;
        }
        let path = Path::new(relative);
        if !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(path))
    }
}

#[async_trait]
impl AssetStorage for LocalAssetStorage {
    async fn write(&self, key: &AssetKey, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .context("failed to create storage root")?;

        let dir = self.root.join(key.category());
        fs::create_dir_all(&dir)
            .await
            .context("failed to create category directory")?;

        // Each writer fills its own temp file and renames it over the
        // target, so readers never see a mix of two uploads.
        let path = dir.join(key.file_name());
        let temp = dir.join(format!(
            ".{}.tmp-{}-{}",
            key.file_name(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_file(&temp, data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e).context("failed to move file into place");
        }

        debug!(path = ?path, size = data.len(), "asset written");
        Ok(())
    }

    async fn delete(&self, key: &AssetKey) -> Result<()> {
        let path = self.path_for(key);
        fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete {}", path.display()))?;
        debug!(path = ?path, "asset deleted");
        Ok(())
    }

    async fn exists(&self, key: &AssetKey) -> Result<bool> {
        fs::try_exists(self.path_for(key))
            .await
            .context("failed to stat asset")
    }

    async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(relative) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            // Directories and paths below a file are not assets either.
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::NotFound | ErrorKind::IsADirectory | ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)
        .await
        .context("failed to create file")?;

    file.write_all(data).await.context("failed to write file")?;

    file.flush().await.context("failed to flush file")?;
    Ok(())
}

impl std::fmt::Debug for LocalAssetStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAssetStorage")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn key_paths() {
        let key = AssetKey::new("avatars", "cat").unwrap();
        assert_eq!(key.file_name(), "cat.jpg");
        assert_eq!(key.relative_path(), PathBuf::from("avatars/cat.jpg"));
        assert_eq!(key.public_path(), "uploads/avatars/cat.jpg");
    }

    #[test]
    fn key_rejects_traversal_vectors() {
        assert_eq!(AssetKey::new("", "cat"), Err(KeyError::Empty("type")));
        assert_eq!(
            AssetKey::new("avatars", ""),
            Err(KeyError::Empty("imageName"))
        );
        assert_eq!(AssetKey::new("..", "cat"), Err(KeyError::Unsafe("type")));
        assert_eq!(
            AssetKey::new("avatars", "."),
            Err(KeyError::Unsafe("imageName"))
        );
        assert!(AssetKey::new("../etc", "passwd").is_err());
        assert!(AssetKey::new("avatars", "..\\..\\boot").is_err());
        assert!(AssetKey::new("avatars", "cat\0.png").is_err());
    }

    #[test]
    fn key_allows_dots_inside_names() {
        let key = AssetKey::new("avatars", "cat.v2").unwrap();
        assert_eq!(key.file_name(), "cat.v2.jpg");
    }

    #[tokio::test]
    async fn write_creates_root_and_category() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAssetStorage::new(dir.path().join("uploads"));
        let key = AssetKey::new("avatars", "cat").unwrap();

        storage.write(&key, b"one").await.unwrap();
        assert!(storage.exists(&key).await.unwrap());

        // Second write into an existing directory overwrites.
        storage.write(&key, b"two").await.unwrap();
        let data = std::fs::read(storage.path_for(&key)).unwrap();
        assert_eq!(data, b"two");
    }

    #[tokio::test]
    async fn delete_missing_asset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAssetStorage::new(dir.path());
        let key = AssetKey::new("avatars", "ghost").unwrap();

        assert!(storage.delete(&key).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_asset() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAssetStorage::new(dir.path());
        let key = AssetKey::new("avatars", "cat").unwrap();

        storage.write(&key, b"jpeg").await.unwrap();
        storage.delete(&key).await.unwrap();
        assert!(!storage.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn read_refuses_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAssetStorage::new(dir.path().join("uploads"));
        std::fs::write(dir.path().join("secret.txt"), b"nope").unwrap();

        assert_eq!(storage.read("../secret.txt").await.unwrap(), None);
        assert_eq!(storage.read("/etc/passwd").await.unwrap(), None);
        assert_eq!(storage.read("").await.unwrap(), None);
        assert_eq!(storage.read("avatars/missing.jpg").await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_treats_directories_and_file_children_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAssetStorage::new(dir.path());
        let key = AssetKey::new("avatars", "cat").unwrap();
        storage.write(&key, b"jpeg").await.unwrap();

        assert_eq!(storage.read("avatars").await.unwrap(), None);
        assert_eq!(storage.read("avatars/cat.jpg/x").await.unwrap(), None);
        assert_eq!(
            storage.read("avatars/cat.jpg").await.unwrap(),
            Some(b"jpeg".to_vec())
        );
    }

    #[tokio::test]
    async fn concurrent_writes_leave_one_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = std::sync::Arc::new(LocalAssetStorage::new(dir.path()));
        let key = AssetKey::new("avatars", "cat").unwrap();

        let payloads: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 256 * 1024]).collect();
        let mut handles = Vec::new();
        for data in payloads.clone() {
            let storage = storage.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                storage.write(&key, &data).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = std::fs::read(storage.path_for(&key)).unwrap();
        assert!(payloads.contains(&stored));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("avatars"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "cat.jpg")
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }
}
