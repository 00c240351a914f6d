//! Per-user ROM metadata (last played)

use crate::{Database, StoreError};
use rusqlite::{OptionalExtension, params};

/// Per-user metadata attached to a ROM
#[derive(Debug, Clone)]
pub struct RomUser {
    pub id: i64,
    pub rom_id: i64,
    pub user_id: i64,
    pub last_played: Option<String>,
}

impl Database {
    /// Get the per-user row for a ROM
    pub fn rom_user(&self, rom_id: i64, user_id: i64) -> Result<Option<RomUser>, StoreError> {
        let conn = self.conn.lock();
        let rom_user = conn
            .query_row(
                "SELECT id, rom_id, user_id, last_played FROM rom_users WHERE rom_id = ?1 AND user_id = ?2",
                params![rom_id, user_id],
                |row| {
                    Ok(RomUser {
                        id: row.get("id")?,
                        rom_id: row.get("rom_id")?,
                        user_id: row.get("user_id")?,
                        last_played: row.get("last_played")?,
                    })
                },
            )
            .optional()?;

        Ok(rom_user)
    }

    /// Refresh a user's last-played timestamp for a ROM, creating the row
    /// if absent
    pub fn touch_last_played(&self, rom_id: i64, user_id: i64, at: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO rom_users (rom_id, user_id, last_played)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(rom_id, user_id) DO UPDATE SET
                   last_played = excluded.last_played"#,
            params![rom_id, user_id, at],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewRom;

    #[test]
    fn test_touch_creates_then_updates() {
        let db = Database::in_memory().unwrap();
        let platform_id = db.add_platform("gba", "gba", "Game Boy Advance").unwrap();
        let rom_id = db
            .add_rom(&NewRom {
                platform_id,
                fs_name: "mario.gba".to_string(),
                name: None,
            })
            .unwrap();

        assert!(db.rom_user(rom_id, 3).unwrap().is_none());

        db.touch_last_played(rom_id, 3, "2025-06-01T10:00:00Z").unwrap();
        let first = db.rom_user(rom_id, 3).unwrap().unwrap();
        assert_eq!(first.last_played.as_deref(), Some("2025-06-01T10:00:00Z"));

        db.touch_last_played(rom_id, 3, "2025-06-01T10:05:00Z").unwrap();
        let second = db.rom_user(rom_id, 3).unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.last_played.as_deref(), Some("2025-06-01T10:05:00Z"));
        assert!(second.last_played > first.last_played);
    }
}
