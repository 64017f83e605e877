//! Mock checkpoint registry for testing

use async_trait::async_trait;
use merge_chain::error::{Error, Result};
use merge_chain::registry::CheckpointRegistry;
use merge_chain::types::CheckpointInfo;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fake sha256 assigned by `compute_and_register_hash`
pub const FAKE_SHA: &str = "abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789";

/// In-memory registry with exact-match lookups
///
/// Entries live under `dir`, but nothing is read from disk: tests add
/// checkpoints explicitly and the chain's existence checks use the real
/// filesystem.
pub struct MockRegistry {
    dir: PathBuf,
    entries: Mutex<Vec<CheckpointInfo>>,
    refresh_calls: AtomicUsize,
    find_calls: Mutex<Vec<String>>,
    hash_calls: Mutex<Vec<String>>,
    register_calls: Mutex<Vec<PathBuf>>,
    error_on_find: Mutex<Option<String>>,
}

impl MockRegistry {
    /// Create an empty registry rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
            find_calls: Mutex::new(Vec::new()),
            hash_calls: Mutex::new(Vec::new()),
            register_calls: Mutex::new(Vec::new()),
            error_on_find: Mutex::new(None),
        }
    }

    /// Add an unhashed checkpoint called `name`
    pub fn add(&self, name: &str) -> CheckpointInfo {
        let info = make_info(&self.dir, name, None);
        self.entries.lock().unwrap().push(info.clone());
        info
    }

    /// Add a checkpoint that already has a hash
    pub fn add_hashed(&self, name: &str) -> CheckpointInfo {
        let info = make_info(&self.dir, name, Some(FAKE_SHA.to_string()));
        self.entries.lock().unwrap().push(info.clone());
        info
    }

    /// Add an entry with an arbitrary title
    pub fn add_titled(&self, name: &str, title: &str) -> CheckpointInfo {
        let mut info = make_info(&self.dir, name, Some(FAKE_SHA.to_string()));
        info.title = title.to_string();
        self.entries.lock().unwrap().push(info.clone());
        info
    }

    /// Make `find` return an error
    pub fn fail_find(&self, msg: &str) {
        *self.error_on_find.lock().unwrap() = Some(msg.to_string());
    }

    /// Number of `refresh` calls
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// All `find` queries
    pub fn find_calls(&self) -> Vec<String> {
        self.find_calls.lock().unwrap().clone()
    }

    /// Names hashed via `compute_and_register_hash`
    pub fn hash_calls(&self) -> Vec<String> {
        self.hash_calls.lock().unwrap().clone()
    }

    /// Paths registered via `register_path`
    pub fn register_calls(&self) -> Vec<PathBuf> {
        self.register_calls.lock().unwrap().clone()
    }
}

fn make_info(dir: &Path, name: &str, sha256: Option<String>) -> CheckpointInfo {
    let model_name = Path::new(name)
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
    let title = sha256
        .as_deref()
        .map_or_else(|| name.to_string(), |sha| format!("{name} [{}]", &sha[..10]));
    CheckpointInfo {
        title,
        name: name.to_string(),
        model_name,
        path: dir.join(name),
        sha256,
    }
}

#[async_trait]
impl CheckpointRegistry for MockRegistry {
    async fn refresh(&self) -> Result<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find(&self, name_or_hash: &str) -> Result<Option<CheckpointInfo>> {
        self.find_calls
            .lock()
            .unwrap()
            .push(name_or_hash.to_string());

        if let Some(msg) = self.error_on_find.lock().unwrap().as_ref() {
            return Err(Error::Registry(msg.clone()));
        }

        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .find(|e| {
                e.title == name_or_hash || e.name == name_or_hash || e.model_name == name_or_hash
            })
            .cloned())
    }

    async fn compute_and_register_hash(&self, info: &CheckpointInfo) -> Result<CheckpointInfo> {
        self.hash_calls.lock().unwrap().push(info.name.clone());
        let hashed = make_info(&self.dir, &info.name, Some(FAKE_SHA.to_string()));
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.iter_mut().find(|e| e.name == info.name) {
            *existing = hashed.clone();
        }
        Ok(hashed)
    }

    async fn register_path(&self, path: &Path) -> Result<CheckpointInfo> {
        self.register_calls.lock().unwrap().push(path.to_path_buf());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Registry(format!("no file name: {}", path.display())))?;
        let info = make_info(&self.dir, &name, Some(FAKE_SHA.to_string()));
        self.entries.lock().unwrap().push(info.clone());
        Ok(info)
    }

    fn checkpoint_dir(&self) -> &Path {
        &self.dir
    }
}
