//! Save/state lifecycle operations
//!
//! Each operation runs its database mutations as one logical unit and
//! refreshes the acting user's last-played timestamp where the contract
//! requires it. Purges, multi-id deletes, and upload batches serialize
//! per (rom, user) so a purge cannot drop a concurrent upload.

use crate::{AssetError, AssetFilesystem};
use chrono::Utc;
use parking_lot::Mutex;
use romdeck_store::{Asset, AssetKind, Database, NewAsset, StoreError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// One file received in an upload batch
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of an upload batch
#[derive(Debug)]
pub struct UploadResult {
    /// Number of files received in the batch
    pub uploaded: usize,
    /// The acting user's current assets for the rom
    pub assets: Vec<Asset>,
}

/// Manages the save/state record lifecycle tied to uploads, updates,
/// deletions, and purges
pub struct AssetSynchronizer {
    db: Arc<Database>,
    fs: Arc<dyn AssetFilesystem>,
    locks: Mutex<HashMap<(i64, i64), Arc<tokio::sync::Mutex<()>>>>,
}

impl AssetSynchronizer {
    pub fn new(db: Arc<Database>, fs: Arc<dyn AssetFilesystem>) -> Self {
        Self {
            db,
            fs,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Critical section for one (rom, user) pair
    fn lock_for(&self, rom_id: i64, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .entry((rom_id, user_id))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Store a batch of uploaded files for a rom.
    ///
    /// A file whose name matches an existing asset of the acting user
    /// updates that asset's size in place; new names create new rows.
    /// Files with an empty name are skipped without failing the batch.
    pub async fn upload_assets(
        &self,
        kind: AssetKind,
        rom_id: i64,
        user_id: i64,
        files: Vec<UploadFile>,
        emulator: Option<&str>,
    ) -> Result<UploadResult, AssetError> {
        let rom = self.db.rom(rom_id)?.ok_or(AssetError::RomNotFound(rom_id))?;
        let platform = self
            .db
            .platform(rom.platform_id)?
            .ok_or(StoreError::PlatformNotFound(rom.platform_id))?;

        let lock = self.lock_for(rom_id, user_id);
        let _guard = lock.lock().await;

        info!(
            "Uploading {} {} to {}",
            files.len(),
            kind.dir_name(),
            rom.name.as_deref().unwrap_or(&rom.fs_name)
        );

        let dir = self
            .fs
            .build_asset_dir(user_id, kind, &platform.fs_slug, emulator);

        for file in &files {
            if file.name.is_empty() {
                error!("Skipping uploaded file with no name");
                continue;
            }

            if let Err(e) = self
                .store_one(kind, rom_id, user_id, file, &dir, emulator)
                .await
            {
                error!("Failed to store {}: {e}", file.name);
            }
        }

        let assets = self.db.assets_for_user(kind, rom_id, user_id)?;
        Ok(UploadResult {
            uploaded: files.len(),
            assets,
        })
    }

    /// Write one uploaded file and create or refresh its row
    async fn store_one(
        &self,
        kind: AssetKind,
        rom_id: i64,
        user_id: i64,
        file: &UploadFile,
        dir: &Path,
        emulator: Option<&str>,
    ) -> Result<(), AssetError> {
        let path = self.fs.write_file(&file.bytes, dir, &file.name).await?;
        let file_size_bytes = self.fs.file_size(&path).await? as i64;

        match self
            .db
            .asset_by_file_name(kind, rom_id, user_id, &file.name)?
        {
            Some(existing) => {
                self.db
                    .update_asset_size(kind, existing.id, file_size_bytes)?;
            }
            None => {
                self.db.add_asset(
                    kind,
                    &NewAsset {
                        rom_id,
                        user_id,
                        file_name: file.name.clone(),
                        file_path: path.to_string_lossy().to_string(),
                        file_size_bytes,
                        emulator: emulator.map(str::to_string),
                    },
                )?;
            }
        }

        self.touch_last_played(rom_id, user_id)?;
        Ok(())
    }

    /// Replace an asset's file and/or refresh its metadata.
    ///
    /// The last-played timestamp refreshes whether or not replacement
    /// bytes were supplied.
    pub async fn update_asset(
        &self,
        kind: AssetKind,
        asset_id: i64,
        user_id: i64,
        file: Option<Vec<u8>>,
    ) -> Result<Asset, AssetError> {
        let asset = self
            .db
            .asset(kind, asset_id)?
            .ok_or(AssetError::NotFound(asset_id))?;

        if asset.user_id != user_id {
            error!("User {user_id} is not authorized to update asset {asset_id}");
            return Err(AssetError::Forbidden(asset_id));
        }

        if let Some(bytes) = file {
            let path = Path::new(&asset.file_path);
            let dir = path.parent().unwrap_or(Path::new(""));
            let written = self.fs.write_file(&bytes, dir, &asset.file_name).await?;
            let file_size_bytes = self.fs.file_size(&written).await? as i64;
            self.db.update_asset_size(kind, asset_id, file_size_bytes)?;
        }

        self.touch_last_played(asset.rom_id, user_id)?;

        // Refetch to return the refreshed row
        self.db
            .asset(kind, asset_id)?
            .ok_or(AssetError::NotFound(asset_id))
    }

    /// Delete assets by id, optionally removing their files.
    ///
    /// The first missing or foreign-owned id aborts the request. A flagged
    /// primary file missing from disk is recorded and surfaced after every
    /// id has been processed; its row deletion stands. Missing screenshot
    /// files are only logged.
    pub async fn delete_assets(
        &self,
        kind: AssetKind,
        ids: &[i64],
        delete_from_fs: &[i64],
        user_id: i64,
    ) -> Result<usize, AssetError> {
        if ids.is_empty() {
            error!("No {} were provided", kind.dir_name());
            return Err(AssetError::BadRequest);
        }

        let mut missing_files = Vec::new();

        for &id in ids {
            let asset = self.db.asset(kind, id)?.ok_or_else(|| {
                error!("Asset with ID {id} not found");
                AssetError::NotFound(id)
            })?;

            if asset.user_id != user_id {
                error!("User {user_id} is not authorized to delete asset {id}");
                return Err(AssetError::Forbidden(id));
            }

            let lock = self.lock_for(asset.rom_id, user_id);
            let _guard = lock.lock().await;

            self.db.delete_asset(kind, id)?;

            if delete_from_fs.contains(&id) {
                info!("Deleting {} from filesystem", asset.file_name);
                match self.fs.remove_file(&asset.file_path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        error!("File {} not found on filesystem", asset.file_name);
                        missing_files.push(asset.file_name.clone());
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            self.delete_screenshot_for(&asset, delete_from_fs.contains(&id))
                .await?;
        }

        if missing_files.is_empty() {
            Ok(ids.len())
        } else {
            Err(AssetError::FileSystemInconsistency(missing_files))
        }
    }

    /// Remove an asset's screenshot row and, when flagged, its file.
    /// Screenshot file loss is non-fatal, unlike primary asset files.
    async fn delete_screenshot_for(
        &self,
        asset: &Asset,
        remove_from_fs: bool,
    ) -> Result<(), AssetError> {
        let Some(screenshot_id) = asset.screenshot_id else {
            return Ok(());
        };
        let Some(screenshot) = self.db.screenshot(screenshot_id)? else {
            return Ok(());
        };

        self.db.delete_screenshot(screenshot_id)?;

        if remove_from_fs {
            match self.fs.remove_file(&screenshot.file_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    error!(
                        "Screenshot file {} not found for {}",
                        screenshot.file_name, asset.file_name
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Delete every asset of the acting user for a rom whose file name is
    /// absent from `keep`, returning the purged rows
    pub async fn purge_assets(
        &self,
        kind: AssetKind,
        rom_id: i64,
        user_id: i64,
        keep: &[String],
    ) -> Result<Vec<Asset>, AssetError> {
        let lock = self.lock_for(rom_id, user_id);
        let _guard = lock.lock().await;

        let purged = self.db.purge_assets(kind, rom_id, user_id, keep)?;
        if !purged.is_empty() {
            info!(
                "Purged {} {} for rom {rom_id}, user {user_id}",
                purged.len(),
                kind.dir_name()
            );
        }

        Ok(purged)
    }

    fn touch_last_played(&self, rom_id: i64, user_id: i64) -> Result<(), AssetError> {
        let now = Utc::now().to_rfc3339();
        self.db.touch_last_played(rom_id, user_id, &now)?;
        Ok(())
    }
}
