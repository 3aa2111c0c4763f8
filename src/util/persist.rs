//! Durable state files
//!
//! Coordinator, registry, bank and counterexample state are all written the
//! same way: bincode into a sibling `.tmp` file, then renamed over the
//! target so readers never observe a half-written file.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Serialize `value` to `path` atomically, creating parent directories.
pub fn save_state<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let bytes = bincode::serialize(value)
        .with_context(|| format!("Failed to encode state for {}", path.display()))?;

    let tmp = tmp_path(path);
    fs::write(&tmp, &bytes)
        .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move state file into place: {}", path.display()))?;

    Ok(())
}

/// Load a state file. A missing file is `Ok(None)`; anything else unreadable is an error.
pub fn load_state<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read state file: {}", path.display()))
        }
    };

    let value = bincode::deserialize(&bytes)
        .with_context(|| format!("Failed to decode state file: {}", path.display()))?;
    Ok(Some(value))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<u64> = load_state(&dir.path().join("nothing.state")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/registry.state");

        let mut value = BTreeMap::new();
        value.insert("10.0.0.1:5555".to_string(), 37usize);
        save_state(&path, &value).unwrap();

        let loaded: BTreeMap<String, usize> = load_state(&path).unwrap().unwrap();
        assert_eq!(loaded, value);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ce.state");
        fs::write(&path, [0xffu8; 3]).unwrap();
        let loaded: Result<Option<Vec<u64>>> = load_state(&path);
        assert!(loaded.is_err());
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        assert_eq!(tmp_path(Path::new("/a/b/ce.state")), PathBuf::from("/a/b/ce.state.tmp"));
        assert_eq!(tmp_path(Path::new("ce.state")), PathBuf::from("ce.state.tmp"));
    }
}
