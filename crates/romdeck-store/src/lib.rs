//! Library and asset store for Romdeck
//!
//! Persists platforms, ROMs, per-user save/state assets, screenshots, and
//! per-user play metadata in SQLite.

mod assets;
mod database;
mod rom_users;

pub use assets::{Asset, AssetKind, NewAsset, Screenshot};
pub use database::{Database, NewRom, Platform, Rom};
pub use rom_users::RomUser;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Platform not found: {0}")]
    PlatformNotFound(i64),

    #[error("Asset not found: {0}")]
    AssetNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
