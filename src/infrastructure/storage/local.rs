use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

/// Filesystem backend rooted at the configured media directory.
///
/// Keys use `/` separators and are joined under the root, mirroring the
/// object-store layout so the two backends stay interchangeable.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in key.split('/').filter(|p| !p.is_empty() && *p != "..") {
            path.push(part);
        }
        path
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.full_path(key);
        fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    pub async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.full_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.full_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete {}", path.display())),
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(key)).await?)
    }

    /// Names of the immediate subdirectories under `prefix`.
    pub async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        let path = self.full_path(prefix);
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        let mut entries = fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(dirs)
    }

    pub async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let path = self.full_path(prefix);
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_exists_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write("hls/abc/playlist.m3u8", b"#EXTM3U").await.unwrap();
        assert!(storage.exists("hls/abc/playlist.m3u8").await.unwrap());
        assert_eq!(storage.read("hls/abc/playlist.m3u8").await.unwrap(), b"#EXTM3U");

        storage.delete("hls/abc/playlist.m3u8").await.unwrap();
        assert!(!storage.exists("hls/abc/playlist.m3u8").await.unwrap());
        // Deleting again is a no-op.
        storage.delete("hls/abc/playlist.m3u8").await.unwrap();
    }

    #[tokio::test]
    async fn list_dirs_and_delete_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write("failed/a/failure_log.json", b"{}").await.unwrap();
        storage.write("failed/b/failure_log.json", b"{}").await.unwrap();

        let mut dirs = storage.list_dirs("failed").await.unwrap();
        dirs.sort();
        assert_eq!(dirs, vec!["a", "b"]);

        storage.delete_prefix("failed/a").await.unwrap();
        assert_eq!(storage.list_dirs("failed").await.unwrap(), vec!["b"]);

        assert!(storage.list_dirs("nothing/here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write("../escape.txt", b"x").await.unwrap();
        assert!(dir.path().join("escape.txt").exists());
    }
}
