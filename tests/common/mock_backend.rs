//! Mock merge backend for testing

use async_trait::async_trait;
use merge_chain::backend::{MergeBackend, MergeRequest};
use merge_chain::error::{Error, Result};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Simple mock merge backend
///
/// Features:
/// - Call tracking for verification
/// - Writes a small output file per merge (optional)
/// - Error injection per call index or per primary model
pub struct MockMergeBackend {
    output_dir: PathBuf,
    write_files: bool,
    calls: Mutex<Vec<MergeRequest>>,
    fail_on_call: Mutex<HashMap<usize, String>>,
    fail_on_primary: Mutex<HashMap<String, String>>,
    response_override: Mutex<Option<Vec<Value>>>,
}

impl MockMergeBackend {
    /// Backend that writes outputs into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_files: true,
            calls: Mutex::new(Vec::new()),
            fail_on_call: Mutex::new(HashMap::new()),
            fail_on_primary: Mutex::new(HashMap::new()),
            response_override: Mutex::new(None),
        }
    }

    /// Backend that only reports paths without writing files
    pub fn without_files(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            write_files: false,
            ..Self::new(output_dir)
        }
    }

    // === Error injection methods ===

    /// Make the `index`-th call (0-based) fail
    pub fn fail_call(&self, index: usize, msg: &str) {
        self.fail_on_call
            .lock()
            .unwrap()
            .insert(index, msg.to_string());
    }

    /// Make every merge whose primary model is `primary` fail
    pub fn fail_primary(&self, primary: &str, msg: &str) {
        self.fail_on_primary
            .lock()
            .unwrap()
            .insert(primary.to_string(), msg.to_string());
    }

    /// Return `response` verbatim instead of a saved-to message
    pub fn set_response(&self, response: Vec<Value>) {
        *self.response_override.lock().unwrap() = Some(response);
    }

    // === Call verification methods ===

    /// Get all recorded requests
    pub fn calls(&self) -> Vec<MergeRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of merges requested
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Custom names of all requests, in call order
    pub fn custom_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.custom_name).collect()
    }

    /// Primary models of all requests, in call order
    pub fn primaries(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.primary_model).collect()
    }
}

#[async_trait]
impl MergeBackend for MockMergeBackend {
    async fn run_merge(&self, request: &MergeRequest) -> Result<Vec<Value>> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };

        // Check for injected errors
        if let Some(msg) = self.fail_on_call.lock().unwrap().get(&index) {
            return Err(Error::Backend(msg.clone()));
        }
        if let Some(msg) = self
            .fail_on_primary
            .lock()
            .unwrap()
            .get(&request.primary_model)
        {
            return Err(Error::Backend(msg.clone()));
        }

        if let Some(response) = self.response_override.lock().unwrap().clone() {
            return Ok(response);
        }

        let name = if request.custom_name.is_empty() {
            format!("merged-{}", index + 1)
        } else {
            request.custom_name.clone()
        };
        let path = self.output_dir.join(format!(
            "{name}.{}",
            request.checkpoint_format.extension()
        ));
        if self.write_files {
            fs::write(&path, format!("merge #{index}")).unwrap();
        }

        Ok(vec![json!(format!("Checkpoint saved to {}", path.display()))])
    }
}
