use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Returns the identifier stored at `path`, creating one on first use.
pub fn load_or_create(path: &Path) -> Result<String> {
    if path.exists() {
        let existing = fs::read_to_string(path)
            .with_context(|| format!("failed to read user id: {}", path.display()))?;
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }
    let id = generate();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }
    fs::write(path, &id).with_context(|| format!("failed to write user id: {}", path.display()))?;
    debug!("created user id at {}", path.display());
    Ok(id)
}

pub fn generate() -> String {
    format!("user_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn id_is_stable_across_loads() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/user_id");
        let first = load_or_create(&path).expect("first");
        let second = load_or_create(&path).expect("second");
        assert_eq!(first, second);
        assert!(first.starts_with("user_"));
    }

    #[test]
    fn blank_file_is_replaced() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("user_id");
        fs::write(&path, "  \n").expect("write");
        let id = load_or_create(&path).expect("id");
        assert!(!id.is_empty());
        assert_eq!(fs::read_to_string(&path).expect("read"), id);
    }
}
