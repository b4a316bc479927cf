//! On-disk layout of the storage root.
//!
//! ```text
//! <root>/
//!   <name>.qwallet                   live record
//!   settings.json                    persisted preferences
//!   backups/<name>_<unix_millis>.qwallet
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

pub use qwallet_core::atomic::write_atomic;
use qwallet_core::constants::{BACKUP_DIR_NAME, WALLET_FILE_EXTENSION};
use qwallet_core::error::{Result, WalletError};
use qwallet_core::types::validate_wallet_name;

/// One snapshot of a wallet file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Snapshot file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Filesystem paths under one storage root.
#[derive(Clone, Debug)]
pub struct StorePaths {
    root: PathBuf,
    backup_dir: PathBuf,
}

impl StorePaths {
    /// Layout rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.as_os_str().is_empty() {
            return Err(WalletError::Storage("storage root cannot be empty".into()));
        }
        Ok(Self {
            backup_dir: root.join(BACKUP_DIR_NAME),
            root,
        })
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backup directory.
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Live file of a wallet. The name must already be validated.
    pub fn wallet_file(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{WALLET_FILE_EXTENSION}"))
    }

    /// Names of every wallet file under the root, sorted.
    pub fn wallet_names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(WALLET_FILE_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_wallet_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Copies the live file into a new timestamped snapshot.
    pub fn create_backup(&self, name: &str) -> Result<BackupInfo> {
        let source = self.wallet_file(name);
        if !source.exists() {
            return Err(WalletError::NotFound(format!("wallet '{name}'")));
        }
        fs::create_dir_all(&self.backup_dir)?;

        // Two snapshots in the same millisecond get consecutive stamps
        let mut millis = Utc::now().timestamp_millis();
        while self.backup_file(name, millis).exists() {
            millis += 1;
        }
        let path = self.backup_file(name, millis);

        let bytes = fs::read(&source)?;
        write_atomic(&path, &bytes)?;

        let size = fs::metadata(&path)?.len();
        if size != bytes.len() as u64 {
            fs::remove_file(&path)?;
            return Err(WalletError::Storage(format!(
                "backup size mismatch: expected {}, wrote {size}",
                bytes.len()
            )));
        }

        Ok(BackupInfo {
            timestamp: from_millis(millis),
            path,
            size,
        })
    }

    /// Snapshots of a wallet, newest first.
    pub fn list_backups(&self, name: &str) -> Result<Vec<BackupInfo>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{name}_");
        let suffix = format!(".{WALLET_FILE_EXTENSION}");
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stamp) = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
            else {
                continue;
            };
            // "bob_1_<millis>" belongs to wallet "bob_1", not "bob"
            let Ok(millis) = stamp.parse::<i64>() else {
                continue;
            };
            backups.push(BackupInfo {
                timestamp: from_millis(millis),
                path: entry.path(),
                size: entry.metadata()?.len(),
            });
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    fn backup_file(&self, name: &str, millis: i64) -> PathBuf {
        self.backup_dir
            .join(format!("{name}_{millis}.{WALLET_FILE_EXTENSION}"))
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_concurrent_saves_both_succeed_and_last_rename_wins() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path()).unwrap();
        let path = paths.wallet_file("shared");
        let large = vec![b'A'; 4 * 1024 * 1024];
        let small = vec![b'B'; 1024];

        for _ in 0..10 {
            let barrier = Arc::new(Barrier::new(2));
            let writers: Vec<_> = [large.clone(), small.clone()]
                .into_iter()
                .map(|bytes| {
                    let barrier = Arc::clone(&barrier);
                    let path = path.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        write_atomic(&path, &bytes)
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap().unwrap();
            }

            let on_disk = fs::read(&path).unwrap();
            assert!(on_disk == large || on_disk == small, "torn write of {} bytes", on_disk.len());
        }
        assert_eq!(paths.wallet_names().unwrap(), vec!["shared"]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_wallet_names_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path()).unwrap();
        write_atomic(&paths.wallet_file("bob"), b"{}").unwrap();
        write_atomic(&paths.wallet_file("alice"), b"{}").unwrap();
        fs::write(dir.path().join("settings.json"), b"{}").unwrap();
        fs::write(dir.path().join("bad name.qwallet"), b"{}").unwrap();

        assert_eq!(paths.wallet_names().unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path().join("absent")).unwrap();
        assert!(paths.wallet_names().unwrap().is_empty());
        assert!(paths.list_backups("x").unwrap().is_empty());
    }

    #[test]
    fn test_backups_newest_first_and_scoped_by_name() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path()).unwrap();
        write_atomic(&paths.wallet_file("bob"), b"v1").unwrap();
        write_atomic(&paths.wallet_file("bob_1"), b"other").unwrap();

        let first = paths.create_backup("bob").unwrap();
        write_atomic(&paths.wallet_file("bob"), b"v2").unwrap();
        let second = paths.create_backup("bob").unwrap();
        paths.create_backup("bob_1").unwrap();

        let listed = paths.list_backups("bob").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], second);
        assert_eq!(listed[1], first);
        assert_eq!(fs::read(&listed[1].path).unwrap(), b"v1");
        assert_eq!(paths.list_backups("bob_1").unwrap().len(), 1);
    }

    #[test]
    fn test_backup_of_missing_wallet() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path()).unwrap();
        assert!(matches!(
            paths.create_backup("ghost"),
            Err(WalletError::NotFound(_))
        ));
    }
}
