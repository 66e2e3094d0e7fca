//! YAML policy files.
//!
//! Any field left out keeps its default, so a file only needs to name what
//! it changes. Range checks happen later, once command-line overrides have
//! been applied on top.

use std::fs;
use std::path::Path;
use tracing::debug;
use torso_core::Policy;

use crate::LoadError;

/// Parse a policy document.
pub fn parse_policy(text: &str) -> Result<Policy, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Policy::default());
    }
    serde_yaml::from_str(text)
}

/// Read a policy file from disk.
pub fn load_policy(path: &Path) -> Result<Policy, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let policy = parse_policy(&text).map_err(|source| LoadError::Policy {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), ?policy, "policy loaded");
    Ok(policy)
}
