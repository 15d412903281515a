//! Test fixtures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A small press-kit draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bio: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
}

impl Draft {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn with_bio(mut self, bio: &str) -> Self {
        self.bio = bio.to_string();
        self
    }

    pub fn with_link(mut self, name: &str, url: &str) -> Self {
        self.links.insert(name.to_string(), url.to_string());
        self
    }
}

/// A temporary project directory, removed on drop.
///
/// # Example
///
/// ```rust
/// use presskit_test_utils::fixtures::TestProject;
///
/// let project = TestProject::new()
///     .with_config(r#"{ "autosave": { "delay_ms": 250 } }"#)
///     .with_file("drafts/night-swim.json", r#"{"title": "Night Swim"}"#);
///
/// assert!(project.path().join("presskit.json").exists());
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write a file relative to the project root, creating parents.
    pub fn with_file(self, path: impl AsRef<Path>, contents: &str) -> Self {
        let full = self.temp_dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&full, contents).expect("Failed to write fixture file");
        self
    }

    /// Write `presskit.json`.
    pub fn with_config(self, json: &str) -> Self {
        self.with_file("presskit.json", json)
    }

    /// Store a draft where `JsonStorage` rooted at [`TestProject::path`] finds it.
    pub fn with_draft<T: Serialize>(self, name: &str, draft: &T) -> Self {
        let json = serde_json::to_string_pretty(draft).expect("Failed to serialize draft");
        self.with_file(format!("drafts/{name}.json"), &json)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path_buf(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
