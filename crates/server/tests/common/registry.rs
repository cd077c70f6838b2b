//! In-memory registry fake.

use async_trait::async_trait;
use rgc_server::{RegistryApi, RegistryError};
use std::collections::HashSet;
use std::sync::Mutex;

/// Records every manifest deletion; fails for configured references.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    calls: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

#[allow(dead_code)]
impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deletions of `reference` fail with a 500.
    pub fn fail_on(&self, reference: &str) {
        self.failing.lock().unwrap().insert(reference.to_string());
    }

    /// Every `(image, reference)` requested so far, including failed ones.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryApi for RecordingRegistry {
    async fn delete_manifest(&self, image: &str, reference: &str) -> Result<(), RegistryError> {
        self.calls
            .lock()
            .unwrap()
            .push((image.to_string(), reference.to_string()));
        if self.failing.lock().unwrap().contains(reference) {
            return Err(RegistryError::Status {
                status: 500,
                url: format!("http://registry.test/v2/{image}/manifests/{reference}"),
                body: "boom".to_string(),
            });
        }
        Ok(())
    }
}
