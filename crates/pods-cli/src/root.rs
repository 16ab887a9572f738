use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `PODS_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.pods/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd, ".pods")
        .or_else(|| find_upward(&cwd, ".git"))
        .unwrap_or(cwd)
}

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(dir.path())), dir.path());
    }

    #[test]
    fn finds_pods_dir_from_nested_service() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".pods")).unwrap();
        let nested = dir.path().join("services/vision/src");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_upward(&nested, ".pods").as_deref(), Some(dir.path()));
    }

    #[test]
    fn pods_marker_beats_outer_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let project = dir.path().join("lab");
        std::fs::create_dir_all(project.join(".pods")).unwrap();
        let start = project.join("notebooks");
        std::fs::create_dir_all(&start).unwrap();
        assert_eq!(find_upward(&start, ".pods"), Some(project));
        assert_eq!(find_upward(&start, ".git").as_deref(), Some(dir.path()));
    }
}
