//! Database connection and platform/rom handlers

use crate::StoreError;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// A platform in the library (one top-level directory)
#[derive(Debug, Clone)]
pub struct Platform {
    pub id: i64,
    pub slug: String,
    /// Directory name under the library root
    pub fs_slug: String,
    pub name: String,
}

/// A ROM file belonging to a platform
#[derive(Debug, Clone)]
pub struct Rom {
    pub id: i64,
    pub platform_id: i64,
    /// File name on disk
    pub fs_name: String,
    /// Display name; `None` until the ROM has been identified
    pub name: Option<String>,
}

/// Fields for inserting a new ROM row
#[derive(Debug, Clone)]
pub struct NewRom {
    pub platform_id: i64,
    pub fs_name: String,
    pub name: Option<String>,
}

/// Store handle, safe to share across tasks
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS platforms (
                id INTEGER PRIMARY KEY,
                slug TEXT NOT NULL,
                fs_slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS roms (
                id INTEGER PRIMARY KEY,
                platform_id INTEGER NOT NULL,
                fs_name TEXT NOT NULL,
                name TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (platform_id, fs_name),
                FOREIGN KEY (platform_id) REFERENCES platforms(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS screenshots (
                id INTEGER PRIMARY KEY,
                rom_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                file_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_size_bytes INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (rom_id) REFERENCES roms(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS saves (
                id INTEGER PRIMARY KEY,
                rom_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                file_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_size_bytes INTEGER NOT NULL DEFAULT 0,
                emulator TEXT,
                screenshot_id INTEGER,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (rom_id, user_id, file_name),
                FOREIGN KEY (rom_id) REFERENCES roms(id) ON DELETE CASCADE,
                FOREIGN KEY (screenshot_id) REFERENCES screenshots(id)
            );

            CREATE TABLE IF NOT EXISTS states (
                id INTEGER PRIMARY KEY,
                rom_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                file_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_size_bytes INTEGER NOT NULL DEFAULT 0,
                emulator TEXT,
                screenshot_id INTEGER,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (rom_id, user_id, file_name),
                FOREIGN KEY (rom_id) REFERENCES roms(id) ON DELETE CASCADE,
                FOREIGN KEY (screenshot_id) REFERENCES screenshots(id)
            );

            CREATE TABLE IF NOT EXISTS rom_users (
                id INTEGER PRIMARY KEY,
                rom_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                last_played TEXT,
                UNIQUE (rom_id, user_id),
                FOREIGN KEY (rom_id) REFERENCES roms(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_roms_platform ON roms(platform_id);
            CREATE INDEX IF NOT EXISTS idx_saves_rom_user ON saves(rom_id, user_id);
            CREATE INDEX IF NOT EXISTS idx_states_rom_user ON states(rom_id, user_id);
            CREATE INDEX IF NOT EXISTS idx_rom_users_last_played ON rom_users(last_played);
        "#,
        )?;

        Ok(())
    }

    /// Add a platform, returning its id
    pub fn add_platform(&self, slug: &str, fs_slug: &str, name: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO platforms (slug, fs_slug, name)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(fs_slug) DO UPDATE SET
                   slug = excluded.slug,
                   updated_at = CURRENT_TIMESTAMP"#,
            params![slug, fs_slug, name],
        )?;

        let id = conn.query_row(
            "SELECT id FROM platforms WHERE fs_slug = ?1",
            params![fs_slug],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Get a platform by its filesystem slug
    pub fn platform_by_fs_slug(&self, fs_slug: &str) -> Result<Option<Platform>, StoreError> {
        let conn = self.conn.lock();
        let platform = conn
            .query_row(
                "SELECT id, slug, fs_slug, name FROM platforms WHERE fs_slug = ?1",
                params![fs_slug],
                Self::row_to_platform,
            )
            .optional()?;

        Ok(platform)
    }

    /// Get a platform by ID
    pub fn platform(&self, id: i64) -> Result<Option<Platform>, StoreError> {
        let conn = self.conn.lock();
        let platform = conn
            .query_row(
                "SELECT id, slug, fs_slug, name FROM platforms WHERE id = ?1",
                params![id],
                Self::row_to_platform,
            )
            .optional()?;

        Ok(platform)
    }

    /// Get all platforms
    pub fn platforms(&self) -> Result<Vec<Platform>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, slug, fs_slug, name FROM platforms ORDER BY name")?;

        let platforms = stmt
            .query_map([], Self::row_to_platform)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(platforms)
    }

    /// Add a ROM row, returning its id
    pub fn add_rom(&self, rom: &NewRom) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO roms (platform_id, fs_name, name)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(platform_id, fs_name) DO UPDATE SET
                   updated_at = CURRENT_TIMESTAMP"#,
            params![rom.platform_id, rom.fs_name, rom.name],
        )?;

        let id = conn.query_row(
            "SELECT id FROM roms WHERE platform_id = ?1 AND fs_name = ?2",
            params![rom.platform_id, rom.fs_name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Get a ROM by ID
    pub fn rom(&self, id: i64) -> Result<Option<Rom>, StoreError> {
        let conn = self.conn.lock();
        let rom = conn
            .query_row(
                "SELECT id, platform_id, fs_name, name FROM roms WHERE id = ?1",
                params![id],
                Self::row_to_rom,
            )
            .optional()?;

        Ok(rom)
    }

    /// Get a ROM by platform and file name
    pub fn rom_by_fs_name(&self, platform_id: i64, fs_name: &str) -> Result<Option<Rom>, StoreError> {
        let conn = self.conn.lock();
        let rom = conn
            .query_row(
                "SELECT id, platform_id, fs_name, name FROM roms WHERE platform_id = ?1 AND fs_name = ?2",
                params![platform_id, fs_name],
                Self::row_to_rom,
            )
            .optional()?;

        Ok(rom)
    }

    /// Get all ROMs for a platform
    pub fn roms_by_platform(&self, platform_id: i64) -> Result<Vec<Rom>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, platform_id, fs_name, name FROM roms WHERE platform_id = ?1 ORDER BY fs_name",
        )?;

        let roms = stmt
            .query_map(params![platform_id], Self::row_to_rom)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(roms)
    }

    /// Get ROMs with no display name yet
    pub fn unidentified_roms(&self, platform_id: i64) -> Result<Vec<Rom>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, platform_id, fs_name, name FROM roms WHERE platform_id = ?1 AND name IS NULL ORDER BY fs_name",
        )?;

        let roms = stmt
            .query_map(params![platform_id], Self::row_to_rom)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(roms)
    }

    /// Set a ROM's display name
    pub fn set_rom_name(&self, id: i64, name: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE roms SET name = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![name, id],
        )?;
        Ok(())
    }

    /// Number of ROM rows for a platform
    pub fn rom_count(&self, platform_id: i64) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM roms WHERE platform_id = ?1",
            params![platform_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Convert a row to a Platform
    fn row_to_platform(row: &rusqlite::Row) -> rusqlite::Result<Platform> {
        Ok(Platform {
            id: row.get("id")?,
            slug: row.get("slug")?,
            fs_slug: row.get("fs_slug")?,
            name: row.get("name")?,
        })
    }

    /// Convert a row to a Rom
    fn row_to_rom(row: &rusqlite::Row) -> rusqlite::Result<Rom> {
        Ok(Rom {
            id: row.get("id")?,
            platform_id: row.get("platform_id")?,
            fs_name: row.get("fs_name")?,
            name: row.get("name")?,
        })
    }
}
