//! Save/state asset and screenshot handlers
//!
//! Saves and save-states are structurally identical; [`AssetKind`] selects
//! the backing table so both kinds share one handler set.

use crate::{Database, StoreError};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::debug;

/// The two user asset kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Save,
    State,
}

impl AssetKind {
    /// Backing table name
    pub(crate) fn table(&self) -> &'static str {
        match self {
            AssetKind::Save => "saves",
            AssetKind::State => "states",
        }
    }

    /// Directory name in the per-user asset tree
    pub fn dir_name(&self) -> &'static str {
        match self {
            AssetKind::Save => "saves",
            AssetKind::State => "states",
        }
    }
}

/// A per-user save or save-state row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: i64,
    pub rom_id: i64,
    pub user_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_size_bytes: i64,
    pub emulator: Option<String>,
    pub screenshot_id: Option<i64>,
}

/// Fields for inserting a new asset row
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub rom_id: i64,
    pub user_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_size_bytes: i64,
    pub emulator: Option<String>,
}

/// A screenshot row, owned by its referencing asset
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub id: i64,
    pub rom_id: i64,
    pub user_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_size_bytes: i64,
}

const ASSET_COLUMNS: &str =
    "id, rom_id, user_id, file_name, file_path, file_size_bytes, emulator, screenshot_id";

impl Database {
    /// Add an asset row, returning its id
    pub fn add_asset(&self, kind: AssetKind, asset: &NewAsset) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                r#"INSERT INTO {} (rom_id, user_id, file_name, file_path, file_size_bytes, emulator)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                kind.table()
            ),
            params![
                asset.rom_id,
                asset.user_id,
                asset.file_name,
                asset.file_path,
                asset.file_size_bytes,
                asset.emulator,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get an asset by ID
    pub fn asset(&self, kind: AssetKind, id: i64) -> Result<Option<Asset>, StoreError> {
        let conn = self.conn.lock();
        let asset = conn
            .query_row(
                &format!("SELECT {ASSET_COLUMNS} FROM {} WHERE id = ?1", kind.table()),
                params![id],
                Self::row_to_asset,
            )
            .optional()?;

        Ok(asset)
    }

    /// Get an asset by its unique (rom, user, file name) key
    pub fn asset_by_file_name(
        &self,
        kind: AssetKind,
        rom_id: i64,
        user_id: i64,
        file_name: &str,
    ) -> Result<Option<Asset>, StoreError> {
        let conn = self.conn.lock();
        let asset = conn
            .query_row(
                &format!(
                    "SELECT {ASSET_COLUMNS} FROM {} WHERE rom_id = ?1 AND user_id = ?2 AND file_name = ?3",
                    kind.table()
                ),
                params![rom_id, user_id, file_name],
                Self::row_to_asset,
            )
            .optional()?;

        Ok(asset)
    }

    /// Update an asset's stored size, returning the refreshed row
    pub fn update_asset_size(
        &self,
        kind: AssetKind,
        id: i64,
        file_size_bytes: i64,
    ) -> Result<Asset, StoreError> {
        {
            let conn = self.conn.lock();
            let updated = conn.execute(
                &format!(
                    "UPDATE {} SET file_size_bytes = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                    kind.table()
                ),
                params![file_size_bytes, id],
            )?;
            if updated == 0 {
                return Err(StoreError::AssetNotFound(id));
            }
        }

        self.asset(kind, id)?.ok_or(StoreError::AssetNotFound(id))
    }

    /// Delete an asset row
    pub fn delete_asset(&self, kind: AssetKind, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            params![id],
        )?;
        Ok(())
    }

    /// Get a user's assets for a ROM
    pub fn assets_for_user(
        &self,
        kind: AssetKind,
        rom_id: i64,
        user_id: i64,
    ) -> Result<Vec<Asset>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSET_COLUMNS} FROM {} WHERE rom_id = ?1 AND user_id = ?2 ORDER BY file_name",
            kind.table()
        ))?;

        let assets = stmt
            .query_map(params![rom_id, user_id], Self::row_to_asset)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(assets)
    }

    /// Delete every asset for a (rom, user) pair whose file name is absent
    /// from `keep`, returning the deleted rows.
    ///
    /// The read of the doomed set and the delete run in one transaction.
    pub fn purge_assets(
        &self,
        kind: AssetKind,
        rom_id: i64,
        user_id: i64,
        keep: &[String],
    ) -> Result<Vec<Asset>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let placeholders = vec!["?"; keep.len()].join(", ");
        let bindings = || {
            [Value::from(rom_id), Value::from(user_id)]
                .into_iter()
                .chain(keep.iter().map(|name| Value::from(name.clone())))
        };

        let purged = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {ASSET_COLUMNS} FROM {} WHERE rom_id = ? AND user_id = ? AND file_name NOT IN ({placeholders})",
                kind.table()
            ))?;

            stmt.query_map(params_from_iter(bindings()), Self::row_to_asset)?
                .collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            &format!(
                "DELETE FROM {} WHERE rom_id = ? AND user_id = ? AND file_name NOT IN ({placeholders})",
                kind.table()
            ),
            params_from_iter(bindings()),
        )?;

        tx.commit()?;
        debug!(
            "Purged {} rows from {} for rom {rom_id}, user {user_id}",
            purged.len(),
            kind.table()
        );
        Ok(purged)
    }

    /// Add a screenshot row, returning its id
    pub fn add_screenshot(
        &self,
        rom_id: i64,
        user_id: i64,
        file_name: &str,
        file_path: &str,
        file_size_bytes: i64,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO screenshots (rom_id, user_id, file_name, file_path, file_size_bytes)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![rom_id, user_id, file_name, file_path, file_size_bytes],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a screenshot by ID
    pub fn screenshot(&self, id: i64) -> Result<Option<Screenshot>, StoreError> {
        let conn = self.conn.lock();
        let screenshot = conn
            .query_row(
                "SELECT id, rom_id, user_id, file_name, file_path, file_size_bytes FROM screenshots WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Screenshot {
                        id: row.get("id")?,
                        rom_id: row.get("rom_id")?,
                        user_id: row.get("user_id")?,
                        file_name: row.get("file_name")?,
                        file_path: row.get("file_path")?,
                        file_size_bytes: row.get("file_size_bytes")?,
                    })
                },
            )
            .optional()?;

        Ok(screenshot)
    }

    /// Attach a screenshot to an asset
    pub fn set_asset_screenshot(
        &self,
        kind: AssetKind,
        asset_id: i64,
        screenshot_id: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "UPDATE {} SET screenshot_id = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                kind.table()
            ),
            params![screenshot_id, asset_id],
        )?;
        Ok(())
    }

    /// Delete a screenshot row
    pub fn delete_screenshot(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM screenshots WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Convert a row to an Asset
    fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<Asset> {
        Ok(Asset {
            id: row.get("id")?,
            rom_id: row.get("rom_id")?,
            user_id: row.get("user_id")?,
            file_name: row.get("file_name")?,
            file_path: row.get("file_path")?,
            file_size_bytes: row.get("file_size_bytes")?,
            emulator: row.get("emulator")?,
            screenshot_id: row.get("screenshot_id")?,
        })
    }
}
