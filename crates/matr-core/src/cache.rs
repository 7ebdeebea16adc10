//! Content-hash build cache
//!
//! Every definition file gets a hidden cache directory next to it. The
//! directory holds the stored SHA-256 of the file, a link back to the file,
//! the generated driver crate and the compiled binary. A build may be
//! skipped exactly when the stored hash matches the file's current content.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::Result;

/// Cache directory name, created beside the definition file
pub const CACHE_DIR: &str = ".matr";

/// Link to the definition file inside the cache directory
pub const LINKED_DEFINITION: &str = "Matrfile.rs";

/// Stored content hash (lowercase hex)
pub const HASH_FILE: &str = "matrfile.sha256";

/// Fingerprint of the settings compiled into the driver
pub const SETTINGS_FILE: &str = "matrfile.config";

/// Generated driver source
pub const DRIVER_SOURCE: &str = "main.rs";

/// Generated driver manifest
pub const DRIVER_MANIFEST: &str = "Cargo.toml";

/// Compiled driver binary, without platform suffix
pub const ARTIFACT_NAME: &str = "matr";

/// Absolute path of the definition file, written where symlinks are unavailable
pub const PATH_RECORD: &str = "matrfile.path";

/// Compiler working directory
pub const TARGET_DIR: &str = "target";

/// File name of the compiled driver on this platform
pub fn artifact_file_name() -> String {
    format!("{}{}", ARTIFACT_NAME, std::env::consts::EXE_SUFFIX)
}

/// Result of comparing the stored hash with the definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Stored hash matches; nothing needs rebuilding
    Hit,
    /// Hash changed, missing, or bypassed; the driver must be rebuilt
    Miss,
}

/// Cache directory plus the decision taken for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResolution {
    pub dir: PathBuf,
    pub status: CacheStatus,
}

impl CacheResolution {
    pub fn is_hit(&self) -> bool {
        self.status == CacheStatus::Hit
    }
}

/// On-disk cache for one definition file
#[derive(Debug, Clone)]
pub struct BuildCache {
    definition: PathBuf,
    dir: PathBuf,
    settings: Option<String>,
}

impl BuildCache {
    /// Cache for the given definition file.
    ///
    /// The path should be absolute; the link inside the cache points at it.
    pub fn for_definition(definition: impl Into<PathBuf>) -> Self {
        let definition = definition.into();
        let dir = definition
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CACHE_DIR);
        Self {
            definition,
            dir,
            settings: None,
        }
    }

    /// Also key the cache on a fingerprint of the driver's build settings
    pub fn with_settings(mut self, fingerprint: impl Into<String>) -> Self {
        self.settings = Some(fingerprint.into());
        self
    }

    pub fn definition(&self) -> &Path {
        &self.definition
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn hash_path(&self) -> PathBuf {
        self.dir.join(HASH_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn linked_definition_path(&self) -> PathBuf {
        self.dir.join(LINKED_DEFINITION)
    }

    pub fn driver_source_path(&self) -> PathBuf {
        self.dir.join(DRIVER_SOURCE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(DRIVER_MANIFEST)
    }

    pub fn target_dir(&self) -> PathBuf {
        self.dir.join(TARGET_DIR)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(artifact_file_name())
    }

    /// Decide whether the cached build is current.
    ///
    /// A hit writes nothing. A miss creates the directory, stores the new
    /// hash before anything is generated, removes the previous binary and
    /// re-establishes the link to the definition file.
    pub fn resolve(&self, bypass: bool) -> Result<CacheResolution> {
        let hash = hash_file(&self.definition)?;

        let settings_current = match &self.settings {
            Some(fingerprint) => self.stored_settings().as_deref() == Some(fingerprint.as_str()),
            None => true,
        };

        if !bypass && settings_current && self.stored_hash().as_deref() == Some(hash.as_str()) {
            debug!(dir = %self.dir.display(), "cache hit");
            return Ok(CacheResolution {
                dir: self.dir.clone(),
                status: CacheStatus::Hit,
            });
        }

        info!(
            dir = %self.dir.display(),
            bypass,
            hash = %hash,
            "cache miss"
        );
        fs::create_dir_all(&self.dir)?;
        fs::write(self.hash_path(), &hash)?;
        if let Some(fingerprint) = &self.settings {
            fs::write(self.settings_path(), fingerprint)?;
        }

        // The old binary no longer matches the stored hash
        match fs::remove_file(self.artifact_path()) {
            Ok(()) => debug!("removed stale driver binary"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.link_definition()?;

        Ok(CacheResolution {
            dir: self.dir.clone(),
            status: CacheStatus::Miss,
        })
    }

    /// Remove the whole cache directory. Returns whether anything was removed.
    pub fn clean(&self) -> Result<bool> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                info!(dir = %self.dir.display(), "cache removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "no cache to remove");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Describe what is currently on disk
    pub fn status(&self) -> Result<CacheInfo> {
        let mut info = CacheInfo {
            dir: self.dir.clone(),
            ..Default::default()
        };

        if !self.dir.is_dir() {
            return Ok(info);
        }

        info.exists = true;
        info.stored_hash = self.stored_hash();
        if let Some(stored) = &info.stored_hash {
            info.up_to_date = self.definition.is_file() && hash_file(&self.definition)? == *stored;
        }
        info.artifact_present = self.artifact_path().is_file();
        info.total_size = dir_size(&self.dir)?;

        Ok(info)
    }

    fn stored_hash(&self) -> Option<String> {
        read_trimmed(&self.hash_path())
    }

    fn stored_settings(&self) -> Option<String> {
        read_trimmed(&self.settings_path())
    }

    #[cfg(unix)]
    fn link_definition(&self) -> Result<()> {
        let link = self.linked_definition_path();

        // metadata() follows the link, so a dangling link fails here
        let valid = fs::metadata(&link).is_ok()
            && fs::read_link(&link).is_ok_and(|target| target == self.definition);
        if valid {
            return Ok(());
        }

        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(&link)?;
        }
        debug!(link = %link.display(), target = %self.definition.display(), "linking definition");
        std::os::unix::fs::symlink(&self.definition, &link)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn link_definition(&self) -> Result<()> {
        let link = self.linked_definition_path();
        debug!(copy = %link.display(), source = %self.definition.display(), "copying definition");
        fs::copy(&self.definition, &link)?;
        fs::write(
            self.dir.join(PATH_RECORD),
            self.definition.to_string_lossy().as_bytes(),
        )?;
        Ok(())
    }
}

/// Snapshot of a cache directory
#[derive(Debug, Clone, Default)]
pub struct CacheInfo {
    pub dir: PathBuf,
    pub exists: bool,
    pub stored_hash: Option<String>,
    /// Stored hash equals the definition file's current hash
    pub up_to_date: bool,
    pub artifact_present: bool,
    /// Total size in bytes, compiler output included
    pub total_size: u64,
}

impl CacheInfo {
    /// Format total size in human-readable form
    pub fn formatted_size(&self) -> String {
        const KB: f64 = 1024.0;
        let size = self.total_size as f64;
        if size < KB {
            format!("{} B", self.total_size)
        } else if size < KB * KB {
            format!("{:.1} KB", size / KB)
        } else if size < KB * KB * KB {
            format!("{:.1} MB", size / (KB * KB))
        } else {
            format!("{:.1} GB", size / (KB * KB * KB))
        }
    }
}

/// SHA-256 of a file's full content as lowercase hex
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// SHA-256 of `bytes` as lowercase hex
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // Don't follow the definition link
        let meta = fs::symlink_metadata(entry.path())?;
        if meta.is_dir() {
            total += dir_size(&entry.path())?;
        } else if meta.is_file() {
            total += meta.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn definition(temp: &TempDir, content: &str) -> PathBuf {
        let path = temp.path().join("Matrfile.rs");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_hash_is_lowercase_hex() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "");
        assert_eq!(
            hash_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_first_resolve_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");
        let cache = BuildCache::for_definition(&path);

        let resolution = cache.resolve(false).unwrap();
        assert_eq!(resolution.status, CacheStatus::Miss);
        assert_eq!(resolution.dir, temp.path().join(CACHE_DIR));
        assert_eq!(
            fs::read_to_string(cache.hash_path()).unwrap(),
            hash_file(&path).unwrap()
        );
        assert!(cache.linked_definition_path().exists());
    }

    #[test]
    fn test_unchanged_file_hits_without_writing() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");
        let cache = BuildCache::for_definition(&path);
        cache.resolve(false).unwrap();

        // A hit must not touch the directory, so the link stays gone
        fs::remove_file(cache.linked_definition_path()).unwrap();
        let resolution = cache.resolve(false).unwrap();

        assert!(resolution.is_hit());
        assert!(fs::symlink_metadata(cache.linked_definition_path()).is_err());
    }

    #[test]
    fn test_one_byte_change_misses() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\nfn Test() {}\n");
        let cache = BuildCache::for_definition(&path);
        cache.resolve(false).unwrap();

        fs::write(&path, "// matr:build\nfn Tost() {}\n").unwrap();
        let resolution = cache.resolve(false).unwrap();

        assert_eq!(resolution.status, CacheStatus::Miss);
        assert_eq!(
            fs::read_to_string(cache.hash_path()).unwrap(),
            hash_file(&path).unwrap()
        );
    }

    #[test]
    fn test_bypass_forces_miss() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");
        let cache = BuildCache::for_definition(&path);
        cache.resolve(false).unwrap();

        assert_eq!(cache.resolve(true).unwrap().status, CacheStatus::Miss);
    }

    #[test]
    fn test_miss_removes_stale_artifact() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");
        let cache = BuildCache::for_definition(&path);
        cache.resolve(false).unwrap();
        fs::write(cache.artifact_path(), b"old driver").unwrap();

        fs::write(&path, "// matr:build\nfn Test() {}\n").unwrap();
        assert_eq!(cache.resolve(false).unwrap().status, CacheStatus::Miss);
        assert!(!cache.artifact_path().exists());

        // Still not built: a hit now, with nothing to run
        assert!(cache.resolve(false).unwrap().is_hit());
        assert!(!cache.artifact_path().exists());
    }

    #[test]
    fn test_settings_change_misses() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");

        let strict = BuildCache::for_definition(&path).with_settings(hash_bytes(b"strict"));
        assert_eq!(strict.resolve(false).unwrap().status, CacheStatus::Miss);
        assert!(strict.resolve(false).unwrap().is_hit());
        assert_eq!(
            fs::read_to_string(strict.settings_path()).unwrap(),
            hash_bytes(b"strict")
        );

        let fallback = BuildCache::for_definition(&path).with_settings(hash_bytes(b"fallback"));
        assert_eq!(fallback.resolve(false).unwrap().status, CacheStatus::Miss);
        assert!(fallback.resolve(false).unwrap().is_hit());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");
        let cache = BuildCache::for_definition(&path);
        cache.resolve(false).unwrap();

        let link = cache.linked_definition_path();
        fs::remove_file(&link).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone.rs"), &link).unwrap();

        cache.resolve(true).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), path);
        assert_eq!(fs::read_to_string(&link).unwrap(), "// matr:build\n");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");
        let cache = BuildCache::for_definition(&path);
        cache.resolve(false).unwrap();

        assert!(cache.clean().unwrap());
        assert!(!cache.dir().exists());
        assert!(!cache.clean().unwrap());
    }

    #[test]
    fn test_status() {
        let temp = TempDir::new().unwrap();
        let path = definition(&temp, "// matr:build\n");
        let cache = BuildCache::for_definition(&path);

        let info = cache.status().unwrap();
        assert!(!info.exists);
        assert_eq!(info.total_size, 0);

        cache.resolve(false).unwrap();
        fs::write(cache.artifact_path(), b"binary").unwrap();

        let info = cache.status().unwrap();
        assert!(info.exists);
        assert!(info.up_to_date);
        assert!(info.artifact_present);
        // 64 hex digits plus the artifact
        assert!(info.total_size >= 70);

        fs::write(&path, "// matr:build\n// edited\n").unwrap();
        assert!(!cache.status().unwrap().up_to_date);
    }

    #[test]
    fn test_formatted_size() {
        let mut info = CacheInfo::default();
        info.total_size = 512;
        assert_eq!(info.formatted_size(), "512 B");
        info.total_size = 2048;
        assert_eq!(info.formatted_size(), "2.0 KB");
        info.total_size = 5 * 1024 * 1024;
        assert_eq!(info.formatted_size(), "5.0 MB");
    }
}
