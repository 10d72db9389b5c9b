use std::path::{Path, PathBuf};

/// Resolve the repository root that context is gathered from.
///
/// Priority:
/// 1. `--root` flag / `MCQ_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `go.mod`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    find_upward(&cwd, |dir| dir.join("go.mod").is_file())
        .or_else(|| find_upward(&cwd, |dir| dir.join(".git").is_dir()))
        .unwrap_or(cwd)
}

fn find_upward(start: &Path, found: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start.ancestors().find(|d| found(d)).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let p = Path::new("/tmp/somewhere");
        assert_eq!(resolve_root(Some(p)), p);
    }

    #[test]
    fn finds_nearest_go_mod_above() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x\n").unwrap();
        let nested = dir.path().join("internal/api");
        std::fs::create_dir_all(&nested).unwrap();
        let found = find_upward(&nested, |d| d.join("go.mod").is_file());
        assert_eq!(found.as_deref(), Some(dir.path()));
    }
}
