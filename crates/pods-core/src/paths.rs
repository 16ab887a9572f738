use crate::compose::BASE_SERVICE;
use crate::config::LayoutConfig;
use crate::error::{PodError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PODS_DIR: &str = ".pods";
pub const CONFIG_FILE: &str = ".pods/config.yaml";
pub const REGISTRY_FILE: &str = ".pods/registry.yaml";
pub const LOCK_FILE: &str = ".pods/registry.lock";

pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const README_FILE: &str = "README.md";
pub const DOCKERFILE: &str = "Dockerfile";
pub const ENTRYPOINT_SCRIPT: &str = "entrypoint.sh";
pub const BASE_IMAGE_DIR: &str = "base";
pub const ENV_EXAMPLE_FILE: &str = ".env.example";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn pods_dir(root: &Path) -> PathBuf {
    root.join(PODS_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn registry_path(root: &Path) -> PathBuf {
    root.join(REGISTRY_FILE)
}

pub fn lock_path(root: &Path) -> PathBuf {
    root.join(LOCK_FILE)
}

/// Project-relative locations of every generated artifact, resolved from
/// the `layout:` section of the config.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    cfg: LayoutConfig,
}

impl Layout {
    pub fn new(root: &Path, cfg: &LayoutConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            cfg: cfg.clone(),
        }
    }

    pub fn services_root(&self) -> PathBuf {
        self.root.join(&self.cfg.services_dir)
    }

    pub fn service_dir(&self, name: &str) -> PathBuf {
        self.services_root().join(name)
    }

    pub fn requirements(&self, name: &str) -> PathBuf {
        self.service_dir(name).join(REQUIREMENTS_FILE)
    }

    pub fn readme(&self, name: &str) -> PathBuf {
        self.service_dir(name).join(README_FILE)
    }

    pub fn build_root(&self) -> PathBuf {
        self.root.join(&self.cfg.build_dir)
    }

    pub fn build_dir(&self, name: &str) -> PathBuf {
        self.build_root().join(name)
    }

    pub fn dockerfile(&self, name: &str) -> PathBuf {
        self.build_dir(name).join(DOCKERFILE)
    }

    pub fn notebooks_root(&self) -> PathBuf {
        self.root.join(&self.cfg.notebooks_dir)
    }

    pub fn notebooks_dir(&self, name: &str) -> PathBuf {
        self.notebooks_root().join(name)
    }

    pub fn outputs_root(&self) -> PathBuf {
        self.root.join(&self.cfg.outputs_dir)
    }

    pub fn outputs_dir(&self, name: &str) -> PathBuf {
        self.outputs_root().join(name)
    }

    pub fn shared_dir(&self) -> PathBuf {
        self.root.join(&self.cfg.shared_dir)
    }

    pub fn base_dockerfile(&self) -> PathBuf {
        self.shared_dir().join(BASE_IMAGE_DIR).join(DOCKERFILE)
    }

    pub fn entrypoint_script(&self) -> PathBuf {
        self.shared_dir().join(ENTRYPOINT_SCRIPT)
    }

    pub fn compose_file(&self) -> PathBuf {
        self.root.join(&self.cfg.compose_file)
    }

    pub fn env_example(&self) -> PathBuf {
        self.root.join(ENV_EXAMPLE_FILE)
    }

    /// `path` relative to the project root, with `/` separators, as it is
    /// written into Dockerfiles and compose files.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Every per-service directory, in the order they are created.
    pub fn service_dirs(&self, name: &str) -> [PathBuf; 4] {
        [
            self.service_dir(name),
            self.build_dir(name),
            self.notebooks_dir(name),
            self.outputs_dir(name),
        ]
    }
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap())
}

/// Non-empty, at most 63 chars, no separators or leading punctuation.
pub fn is_safe_segment(s: &str) -> bool {
    !s.is_empty() && s.len() <= 63 && name_re().is_match(s)
}

/// Compose keys `pods` itself writes into `docker-compose.yml`.
pub const RESERVED_NAMES: &[&str] = &[BASE_SERVICE];

/// A service name is a single path segment, a compose service key and a
/// container-name suffix at once.
pub fn validate_name(name: &str) -> Result<()> {
    if !is_safe_segment(name) {
        return Err(PodError::InvalidName(name.to_string()));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(PodError::ReservedName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["vision", "a", "llm-api", "etl_v2", "model.v1", "Svc9"] {
            validate_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        let too_long = "x".repeat(64);
        for name in [
            "",
            ".",
            "..",
            "a/b",
            "a\\b",
            "../escape",
            "-flag",
            "has space",
            "tab\tname",
            too_long.as_str(),
        ] {
            assert!(
                matches!(validate_name(name), Err(PodError::InvalidName(_))),
                "expected invalid: {name:?}"
            );
        }
    }

    #[test]
    fn base_image_key_is_reserved() {
        assert!(matches!(
            validate_name("base"),
            Err(PodError::ReservedName(n)) if n == "base"
        ));
        validate_name("base2").unwrap();
        validate_name("Base").unwrap();
    }

    #[test]
    fn layout_defaults() {
        let layout = Layout::new(Path::new("/tmp/lab"), &LayoutConfig::default());
        assert_eq!(
            layout.requirements("vision"),
            PathBuf::from("/tmp/lab/services/vision/requirements.txt")
        );
        assert_eq!(
            layout.dockerfile("vision"),
            PathBuf::from("/tmp/lab/docker/services/vision/Dockerfile")
        );
        assert_eq!(
            layout.notebooks_dir("vision"),
            PathBuf::from("/tmp/lab/notebooks/vision")
        );
        assert_eq!(
            layout.base_dockerfile(),
            PathBuf::from("/tmp/lab/docker/base/Dockerfile")
        );
        assert_eq!(
            config_path(Path::new("/tmp/lab")),
            PathBuf::from("/tmp/lab/.pods/config.yaml")
        );
    }

    #[test]
    fn relative_uses_forward_slashes() {
        let layout = Layout::new(Path::new("/tmp/lab"), &LayoutConfig::default());
        assert_eq!(
            layout.relative(&layout.dockerfile("vision")),
            "docker/services/vision/Dockerfile"
        );
        assert_eq!(layout.relative(&layout.entrypoint_script()), "docker/entrypoint.sh");
    }
}
