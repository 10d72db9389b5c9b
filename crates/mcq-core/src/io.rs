use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Read a file as UTF-8 only when it is no larger than `max_bytes`.
/// Returns `Ok(None)` for oversized files.
pub fn read_bounded(path: &Path, max_bytes: u64) -> Result<Option<String>> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > max_bytes {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Read a text file, replacing invalid UTF-8 instead of failing.
pub fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/user_story.tpl");
        atomic_write(&path, b"{{feature_request}}").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{{feature_request}}"
        );
    }

    #[test]
    fn write_if_missing_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tpl");
        assert!(write_if_missing(&path, b"first").unwrap());
        assert!(!write_if_missing(&path, b"second").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn read_bounded_skips_large_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        std::fs::write(&path, "x".repeat(20)).unwrap();
        assert_eq!(read_bounded(&path, 19).unwrap(), None);
        assert_eq!(read_bounded(&path, 20).unwrap().unwrap().len(), 20);
    }

    #[test]
    fn read_lossy_replaces_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.md");
        std::fs::write(&path, b"caf\xe9").unwrap();
        assert_eq!(read_lossy(&path).unwrap(), "caf\u{fffd}");
    }
}
