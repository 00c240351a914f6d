//! Library scan execution
//!
//! The scanner reconciles the on-disk library tree with the store: one
//! platform row per first-level directory, one ROM row per file. It does
//! no metadata matching; identification is a separate concern.

use crate::{ScanError, ScanType};
use async_trait::async_trait;
use romdeck_store::{Database, NewRom, Platform};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes library scans; idempotent and safe to invoke with overlapping
/// arguments
#[async_trait]
pub trait ScanExecutor: Send + Sync {
    /// Scan the given platforms (empty = the whole library)
    async fn scan_platforms(
        &self,
        platform_ids: &[i64],
        scan_type: ScanType,
    ) -> Result<(), ScanError>;
}

/// Counters produced by a scan run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub platforms_scanned: usize,
    pub roms_found: usize,
    pub roms_added: usize,
}

/// Directory-walk scan executor backed by the store
pub struct LibraryScanner {
    db: Arc<Database>,
    library_root: PathBuf,
}

impl LibraryScanner {
    pub fn new(db: Arc<Database>, library_root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            library_root: library_root.into(),
        }
    }

    /// Run a scan, returning its counters
    pub fn scan(&self, platform_ids: &[i64], scan_type: ScanType) -> Result<ScanSummary, ScanError> {
        if !self.library_root.is_dir() {
            return Err(ScanError::LibraryRootNotFound(self.library_root.clone()));
        }

        let platforms = if platform_ids.is_empty() {
            self.register_platforms()?
        } else {
            let mut platforms = Vec::new();
            for id in platform_ids {
                match self.db.platform(*id)? {
                    Some(platform) => platforms.push(platform),
                    None => warn!("Skipping unknown platform id {id}"),
                }
            }
            platforms
        };

        let mut summary = ScanSummary::default();
        for platform in platforms {
            self.scan_platform(&platform, scan_type, &mut summary)?;
        }

        info!(
            "Scanned {} platforms: {} roms found, {} added",
            summary.platforms_scanned, summary.roms_found, summary.roms_added
        );
        Ok(summary)
    }

    /// Upsert a platform row per first-level directory of the library root
    fn register_platforms(&self) -> Result<Vec<Platform>, ScanError> {
        let mut platforms = Vec::new();

        for entry in std::fs::read_dir(&self.library_root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            if !entry.path().is_dir() || name.starts_with('.') {
                continue;
            }

            let id = self.db.add_platform(&name, &name, &name)?;
            if let Some(platform) = self.db.platform(id)? {
                platforms.push(platform);
            }
        }

        Ok(platforms)
    }

    fn scan_platform(
        &self,
        platform: &Platform,
        scan_type: ScanType,
        summary: &mut ScanSummary,
    ) -> Result<(), ScanError> {
        let dir = self.library_root.join(&platform.fs_slug);
        if !dir.is_dir() {
            warn!("Platform directory missing: {}", dir.display());
            return Ok(());
        }

        let files = Self::rom_files(&dir)?;

        if scan_type == ScanType::Quick
            && self.db.rom_count(platform.id)? == files.len() as i64
        {
            debug!("Quick scan: {} is up to date", platform.fs_slug);
            summary.platforms_scanned += 1;
            return Ok(());
        }

        if scan_type == ScanType::Unidentified {
            let unidentified = self.db.unidentified_roms(platform.id)?;
            debug!(
                "{} unidentified roms under {}",
                unidentified.len(),
                platform.fs_slug
            );
        }

        for file_name in files {
            summary.roms_found += 1;
            if self.db.rom_by_fs_name(platform.id, &file_name)?.is_none() {
                self.db.add_rom(&NewRom {
                    platform_id: platform.id,
                    fs_name: file_name,
                    name: None,
                })?;
                summary.roms_added += 1;
            }
        }

        summary.platforms_scanned += 1;
        Ok(())
    }

    /// File names directly under a platform directory, hidden entries
    /// skipped
    fn rom_files(dir: &Path) -> Result<Vec<String>, ScanError> {
        let mut files = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            if entry.path().is_file() && !name.starts_with('.') {
                files.push(name);
            }
        }

        Ok(files)
    }
}

#[async_trait]
impl ScanExecutor for LibraryScanner {
    async fn scan_platforms(
        &self,
        platform_ids: &[i64],
        scan_type: ScanType,
    ) -> Result<(), ScanError> {
        info!(
            "Starting {} scan of {} platforms",
            scan_type.as_str(),
            if platform_ids.is_empty() {
                "all".to_string()
            } else {
                platform_ids.len().to_string()
            }
        );
        self.scan(platform_ids, scan_type)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn library_with(platforms: &[(&str, &[&str])]) -> (TempDir, Arc<Database>, LibraryScanner) {
        let temp = TempDir::new().unwrap();
        for (platform, files) in platforms {
            let dir = temp.path().join(platform);
            fs::create_dir_all(&dir).unwrap();
            for file in *files {
                fs::write(dir.join(file), b"rom").unwrap();
            }
        }

        let db = Arc::new(Database::in_memory().unwrap());
        let scanner = LibraryScanner::new(Arc::clone(&db), temp.path());
        (temp, db, scanner)
    }

    #[test]
    fn test_full_scan_registers_platforms_and_roms() {
        let (_temp, db, scanner) =
            library_with(&[("gba", &["mario.gba", "zelda.gba"]), ("nes", &["metroid.nes"])]);

        let summary = scanner.scan(&[], ScanType::Full).unwrap();

        assert_eq!(summary.platforms_scanned, 2);
        assert_eq!(summary.roms_found, 3);
        assert_eq!(summary.roms_added, 3);

        let gba = db.platform_by_fs_slug("gba").unwrap().unwrap();
        assert_eq!(db.rom_count(gba.id).unwrap(), 2);
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let (_temp, _db, scanner) = library_with(&[("gba", &["mario.gba"])]);

        let first = scanner.scan(&[], ScanType::Full).unwrap();
        let second = scanner.scan(&[], ScanType::Full).unwrap();

        assert_eq!(first.roms_added, 1);
        assert_eq!(second.roms_added, 0);
        assert_eq!(second.roms_found, 1);
    }

    #[test]
    fn test_scoped_scan_only_touches_target() {
        let (temp, db, scanner) = library_with(&[("gba", &["mario.gba"]), ("nes", &["metroid.nes"])]);

        scanner.scan(&[], ScanType::Full).unwrap();
        let gba = db.platform_by_fs_slug("gba").unwrap().unwrap();
        fs::write(temp.path().join("gba").join("kirby.gba"), b"rom").unwrap();
        fs::write(temp.path().join("nes").join("contra.nes"), b"rom").unwrap();

        let summary = scanner.scan(&[gba.id], ScanType::Quick).unwrap();

        assert_eq!(summary.platforms_scanned, 1);
        assert_eq!(summary.roms_added, 1);
        let nes = db.platform_by_fs_slug("nes").unwrap().unwrap();
        assert_eq!(db.rom_count(nes.id).unwrap(), 1);
    }

    #[test]
    fn test_quick_scan_skips_unchanged_platform() {
        let (_temp, db, scanner) = library_with(&[("gba", &["mario.gba"])]);

        scanner.scan(&[], ScanType::Full).unwrap();
        let gba = db.platform_by_fs_slug("gba").unwrap().unwrap();

        let summary = scanner.scan(&[gba.id], ScanType::Quick).unwrap();
        assert_eq!(summary.roms_found, 0);
        assert_eq!(summary.platforms_scanned, 1);
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let (temp, _db, scanner) = library_with(&[("gba", &["mario.gba", ".DS_Store"])]);
        fs::create_dir_all(temp.path().join(".trash")).unwrap();

        let summary = scanner.scan(&[], ScanType::Full).unwrap();

        assert_eq!(summary.platforms_scanned, 1);
        assert_eq!(summary.roms_found, 1);
    }

    #[test]
    fn test_missing_root_errors() {
        let db = Arc::new(Database::in_memory().unwrap());
        let scanner = LibraryScanner::new(db, "/nonexistent/romdeck-library");
        assert!(matches!(
            scanner.scan(&[], ScanType::Full),
            Err(ScanError::LibraryRootNotFound(_))
        ));
    }
}
