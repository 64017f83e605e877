//! Registry backed by a checkpoint directory on disk.

use super::CheckpointRegistry;
use crate::error::{Error, Result};
use crate::types::CheckpointInfo;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::debug;

/// File extensions recognized as checkpoints.
const CHECKPOINT_EXTENSIONS: [&str; 2] = ["ckpt", "safetensors"];

#[derive(Debug, Clone)]
struct CachedHash {
    modified: Option<SystemTime>,
    sha256: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<CheckpointInfo>,
    hashes: HashMap<PathBuf, CachedHash>,
}

/// Checkpoint registry scanning `*.ckpt` and `*.safetensors` under a directory
///
/// Hashes are computed lazily and cached per path until the file's
/// modification time changes.
#[derive(Debug)]
pub struct FsRegistry {
    dir: PathBuf,
    state: Mutex<RegistryState>,
}

impl FsRegistry {
    /// Create a registry for `dir` without scanning it yet
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Create a registry and scan `dir` immediately
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let registry = Self::new(dir);
        registry.rescan()?;
        Ok(registry)
    }

    /// Snapshot of the currently known checkpoints
    pub fn entries(&self) -> Vec<CheckpointInfo> {
        self.state().entries.clone()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rescan(&self) -> Result<()> {
        let mut paths = Vec::new();
        if self.dir.is_dir() {
            collect_checkpoints(&self.dir, &mut paths)?;
        }
        paths.sort();

        let mut state = self.state();
        let entries = paths
            .iter()
            .map(|path| {
                let sha256 = state
                    .hashes
                    .get(path)
                    .filter(|cached| cached.modified == modified_time(path))
                    .map(|cached| cached.sha256.clone());
                checkpoint_info(&self.dir, path, sha256)
            })
            .collect::<Vec<_>>();
        debug!(dir = %self.dir.display(), count = entries.len(), "scanned checkpoints");
        state.entries = entries;
        Ok(())
    }

    fn insert(&self, info: CheckpointInfo) {
        let mut state = self.state();
        if let Some(sha256) = &info.sha256 {
            let cached = CachedHash {
                modified: modified_time(&info.path),
                sha256: sha256.clone(),
            };
            state.hashes.insert(info.path.clone(), cached);
        }
        match state.entries.iter_mut().find(|e| e.path == info.path) {
            Some(existing) => *existing = info,
            None => state.entries.push(info),
        }
    }
}

#[async_trait]
impl CheckpointRegistry for FsRegistry {
    async fn refresh(&self) -> Result<()> {
        self.rescan()
    }

    async fn find(&self, name_or_hash: &str) -> Result<Option<CheckpointInfo>> {
        Ok(closest_match(&self.state().entries, name_or_hash).cloned())
    }

    async fn compute_and_register_hash(&self, info: &CheckpointInfo) -> Result<CheckpointInfo> {
        let sha256 = hash_file(info.path.clone()).await?;
        let updated = checkpoint_info(&self.dir, &info.path, Some(sha256));
        debug!(title = %updated.title, "registered checkpoint hash");
        self.insert(updated.clone());
        Ok(updated)
    }

    async fn register_path(&self, path: &Path) -> Result<CheckpointInfo> {
        if !path.is_file() {
            return Err(Error::Registry(format!(
                "not a checkpoint file: {}",
                path.display()
            )));
        }
        let sha256 = hash_file(path.to_path_buf()).await?;
        let info = checkpoint_info(&self.dir, path, Some(sha256));
        debug!(title = %info.title, "registered new checkpoint");
        self.insert(info.clone());
        Ok(info)
    }

    fn checkpoint_dir(&self) -> &Path {
        &self.dir
    }
}

/// Pick the registry entry that best matches `query`
///
/// Exact aliases win (title, name, model name, short hash, full hash);
/// otherwise the shortest title containing the query.
fn closest_match<'a>(entries: &'a [CheckpointInfo], query: &str) -> Option<&'a CheckpointInfo> {
    if query.is_empty() {
        return None;
    }

    let exact = entries.iter().find(|e| {
        e.title == query
            || e.name == query
            || e.model_name == query
            || e.shorthash() == Some(query)
            || e.sha256.as_deref() == Some(query)
    });
    if exact.is_some() {
        return exact;
    }

    entries
        .iter()
        .filter(|e| e.title.contains(query))
        .min_by_key(|e| e.title.len())
}

fn collect_checkpoints(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        // Symlinked directories are not followed; they can loop back
        if entry.file_type()?.is_dir() {
            collect_checkpoints(&path, out)?;
        } else if is_checkpoint(&path) && path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn is_checkpoint(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CHECKPOINT_EXTENSIONS.contains(&ext))
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn checkpoint_info(root: &Path, path: &Path, sha256: Option<String>) -> CheckpointInfo {
    let name = path.strip_prefix(root).map_or_else(
        |_| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        },
        |rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        },
    );

    let flattened = name.replace(['/', '\\'], "_");
    let model_name = Path::new(&flattened)
        .file_stem()
        .map_or_else(|| flattened.clone(), |s| s.to_string_lossy().into_owned());

    let mut info = CheckpointInfo {
        title: name.clone(),
        name,
        model_name,
        path: path.to_path_buf(),
        sha256,
    };
    if let Some(short) = info.shorthash() {
        info.title = format!("{} [{short}]", info.name);
    }
    info
}

async fn hash_file(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut file = fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| Error::Internal(format!("hashing task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_scan_finds_checkpoints_only() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ckpt", b"a");
        write(temp.path(), "sub/b.safetensors", b"b");
        write(temp.path(), "notes.txt", b"x");
        write(temp.path(), ".mchain/c.ckpt", b"c");

        let registry = FsRegistry::open(temp.path()).unwrap();
        let names: Vec<String> = registry.entries().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a.ckpt", "sub/b.safetensors"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_ignores_symlinked_directories() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ckpt", b"a");
        std::os::unix::fs::symlink(temp.path(), temp.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("a.ckpt"), temp.path().join("b.ckpt"))
            .unwrap();

        let registry = FsRegistry::open(temp.path()).unwrap();
        let names: Vec<String> = registry.entries().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a.ckpt", "b.ckpt"]);
    }

    #[test]
    fn test_model_name_flattens_subdirectories() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "sub/b.safetensors", b"b");

        let registry = FsRegistry::open(temp.path()).unwrap();
        assert_eq!(registry.entries()[0].model_name, "sub_b");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let registry = FsRegistry::open(temp.path().join("missing")).unwrap();
        assert!(registry.entries().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_name_model_name_and_substring() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "anime-v3.safetensors", b"a");
        write(temp.path(), "anime-v3-pruned.safetensors", b"b");

        let registry = FsRegistry::open(temp.path()).unwrap();
        let by_name = registry.find("anime-v3.safetensors").await.unwrap().unwrap();
        assert_eq!(by_name.name, "anime-v3.safetensors");

        let by_model = registry.find("anime-v3-pruned").await.unwrap().unwrap();
        assert_eq!(by_model.name, "anime-v3-pruned.safetensors");

        let by_part = registry.find("anime").await.unwrap().unwrap();
        assert_eq!(by_part.name, "anime-v3.safetensors");

        assert!(registry.find("realistic").await.unwrap().is_none());
        assert!(registry.find("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hash_updates_title_and_survives_refresh() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ckpt", b"hello");

        let registry = FsRegistry::open(temp.path()).unwrap();
        let info = registry.find("a.ckpt").await.unwrap().unwrap();
        assert!(info.sha256.is_none());

        let hashed = registry.compute_and_register_hash(&info).await.unwrap();
        // sha256("hello")
        assert_eq!(
            hashed.sha256.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
        assert_eq!(hashed.title, "a.ckpt [2cf24dba5f]");

        registry.refresh().await.unwrap();
        let again = registry.find("2cf24dba5f").await.unwrap().unwrap();
        assert_eq!(again.title, "a.ckpt [2cf24dba5f]");
        let by_title = registry.find("a.ckpt [2cf24dba5f]").await.unwrap().unwrap();
        assert_eq!(by_title.path, again.path);
    }

    #[tokio::test]
    async fn test_register_path_adds_entry() {
        let temp = TempDir::new().unwrap();
        let registry = FsRegistry::open(temp.path()).unwrap();
        let path = write(temp.path(), "new.safetensors", b"merged");

        let info = registry.register_path(&path).await.unwrap();
        assert!(info.title.starts_with("new.safetensors ["));
        assert_eq!(registry.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_register_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let registry = FsRegistry::new(temp.path());
        let result = registry.register_path(&temp.path().join("nope.ckpt")).await;
        assert!(matches!(result, Err(Error::Registry(_))));
    }
}
