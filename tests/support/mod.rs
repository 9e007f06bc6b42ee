//! Test support utilities for csfle integration tests.
//!
//! Provides an isolated working directory per test and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Test environment with an isolated temp directory.
///
/// Child processes run with `.current_dir()` set to it, so tests can run
/// in parallel without touching process-global state.
pub struct Test {
    /// Working directory of the command under test
    pub dir: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    /// Create a test environment with a local master key already generated.
    pub fn with_master_key() -> Self {
        let t = Self::new();
        let output = t.master_key();
        assert!(
            output.status.success(),
            "Failed to generate master key: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        t
    }

    /// Path inside the test directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file inside the test directory.
    pub fn write(&self, name: &str, contents: &str) {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create test dir");
        }
        std::fs::write(path, contents).expect("failed to write test file");
    }

    /// Read a file inside the test directory.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).expect("failed to read test file")
    }
}
