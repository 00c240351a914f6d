//! Asset file I/O
//!
//! The [`AssetFilesystem`] trait is the seam between asset bookkeeping and
//! raw file operations; [`LibraryAssetFs`] is the production layout:
//! `users/{user}/{saves|states|screenshots}/{platform}[/{emulator}]`.

use async_trait::async_trait;
use romdeck_store::AssetKind;
use std::path::{Path, PathBuf};

/// File operations needed by the asset synchronizer
#[async_trait]
pub trait AssetFilesystem: Send + Sync {
    /// Directory for a user's assets of one kind under one platform
    fn build_asset_dir(
        &self,
        user_id: i64,
        kind: AssetKind,
        platform_slug: &str,
        emulator: Option<&str>,
    ) -> PathBuf;

    /// Write bytes into `dir/file_name`, creating directories as needed;
    /// returns the written path
    async fn write_file(
        &self,
        bytes: &[u8],
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, std::io::Error>;

    /// Remove a stored file; a missing file surfaces as
    /// [`std::io::ErrorKind::NotFound`]
    async fn remove_file(&self, file_path: &str) -> Result<(), std::io::Error>;

    /// Size in bytes of a stored file
    async fn file_size(&self, path: &Path) -> Result<u64, std::io::Error>;
}

/// Production asset tree rooted at the configured assets path
pub struct LibraryAssetFs {
    assets_root: PathBuf,
}

impl LibraryAssetFs {
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
        }
    }
}

#[async_trait]
impl AssetFilesystem for LibraryAssetFs {
    fn build_asset_dir(
        &self,
        user_id: i64,
        kind: AssetKind,
        platform_slug: &str,
        emulator: Option<&str>,
    ) -> PathBuf {
        let mut dir = self
            .assets_root
            .join("users")
            .join(user_id.to_string())
            .join(kind.dir_name())
            .join(platform_slug);
        if let Some(emulator) = emulator {
            dir = dir.join(emulator);
        }
        dir
    }

    async fn write_file(
        &self,
        bytes: &[u8],
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, std::io::Error> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    async fn remove_file(&self, file_path: &str) -> Result<(), std::io::Error> {
        tokio::fs::remove_file(file_path).await
    }

    async fn file_size(&self, path: &Path) -> Result<u64, std::io::Error> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_asset_dir_layout() {
        let fs = LibraryAssetFs::new("/assets");

        assert_eq!(
            fs.build_asset_dir(3, AssetKind::Save, "gba", None),
            PathBuf::from("/assets/users/3/saves/gba")
        );
        assert_eq!(
            fs.build_asset_dir(3, AssetKind::State, "gba", Some("mgba")),
            PathBuf::from("/assets/users/3/states/gba/mgba")
        );
    }

    #[tokio::test]
    async fn test_write_size_and_remove() {
        let temp = TempDir::new().unwrap();
        let fs = LibraryAssetFs::new(temp.path());

        let dir = fs.build_asset_dir(1, AssetKind::Save, "gba", None);
        let path = fs.write_file(b"save data", &dir, "a.sav").await.unwrap();

        assert_eq!(fs.file_size(&path).await.unwrap(), 9);

        fs.remove_file(path.to_str().unwrap()).await.unwrap();
        let missing = fs.remove_file(path.to_str().unwrap()).await.unwrap_err();
        assert_eq!(missing.kind(), std::io::ErrorKind::NotFound);
    }
}
