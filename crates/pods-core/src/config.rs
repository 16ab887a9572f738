use crate::error::{PodError, Result};
use crate::paths;
use crate::platform::ShellStyle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AllocationStrategy
// ---------------------------------------------------------------------------

/// How a new service's port block is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Slots recorded in `.pods/registry.yaml`; released slots are reused.
    #[default]
    Registry,
    /// `base + count(service dirs) * stride`, re-derived from the listing.
    DirectoryCount,
}

impl AllocationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStrategy::Registry => "registry",
            AllocationStrategy::DirectoryCount => "directory_count",
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LayoutConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_services_dir")]
    pub services_dir: String,
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    #[serde(default = "default_shared_dir")]
    pub shared_dir: String,
    #[serde(default = "default_notebooks_dir")]
    pub notebooks_dir: String,
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: String,
    #[serde(default = "default_compose_file")]
    pub compose_file: String,
}

fn default_services_dir() -> String {
    "services".to_string()
}

fn default_build_dir() -> String {
    "docker/services".to_string()
}

fn default_shared_dir() -> String {
    "docker".to_string()
}

fn default_notebooks_dir() -> String {
    "notebooks".to_string()
}

fn default_outputs_dir() -> String {
    "outputs".to_string()
}

fn default_compose_file() -> String {
    "docker-compose.yml".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            services_dir: default_services_dir(),
            build_dir: default_build_dir(),
            shared_dir: default_shared_dir(),
            notebooks_dir: default_notebooks_dir(),
            outputs_dir: default_outputs_dir(),
            compose_file: default_compose_file(),
        }
    }
}

impl LayoutConfig {
    fn named_dirs(&self) -> [(&'static str, &str); 5] {
        [
            ("services_dir", self.services_dir.as_str()),
            ("build_dir", self.build_dir.as_str()),
            ("shared_dir", self.shared_dir.as_str()),
            ("notebooks_dir", self.notebooks_dir.as_str()),
            ("outputs_dir", self.outputs_dir.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// PortConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    #[serde(default = "default_port_base")]
    pub base: u16,
    #[serde(default = "default_port_stride")]
    pub stride: u16,
}

fn default_port_base() -> u16 {
    8000
}

fn default_port_stride() -> u16 {
    10
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            base: default_port_base(),
            stride: default_port_stride(),
        }
    }
}

// ---------------------------------------------------------------------------
// ImageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_base_image")]
    pub base_image: String,
    #[serde(default = "default_python_version")]
    pub python_version: String,
    /// Command the `api` entrypoint mode runs inside the service directory.
    #[serde(default = "default_api_command")]
    pub api_command: String,
    /// Default notebook token; `JUPYTER_TOKEN` in the container overrides it.
    #[serde(default = "default_jupyter_token")]
    pub jupyter_token: String,
}

fn default_base_image() -> String {
    "ai-pods-base:latest".to_string()
}

fn default_python_version() -> String {
    "3.11".to_string()
}

fn default_api_command() -> String {
    "python main.py".to_string()
}

fn default_jupyter_token() -> String {
    "ai-pods".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            python_version: default_python_version(),
            api_command: default_api_command(),
            jupyter_token: default_jupyter_token(),
        }
    }
}

// ---------------------------------------------------------------------------
// HostConfig / ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Force a shell style instead of detecting it at start-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<ShellStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,
}

fn default_container_prefix() -> String {
    "ai-pods".to_string()
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub allocation: AllocationStrategy,
    #[serde(default)]
    pub ports: PortConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub host: HostConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                container_prefix: default_container_prefix(),
            },
            allocation: AllocationStrategy::default(),
            ports: PortConfig::default(),
            layout: LayoutConfig::default(),
            image: ImageConfig::default(),
            host: HostConfig::default(),
        }
    }

    pub fn with_allocation(mut self, allocation: AllocationStrategy) -> Self {
        self.allocation = allocation;
        self
    }

    pub fn container_name(&self, service: &str) -> String {
        format!("{}-{}", self.project.container_prefix, service)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(PodError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.ports.stride < 3 {
            warnings.push(ConfigWarning::error(format!(
                "ports.stride is {}; a block holds three ports, so blocks would overlap",
                self.ports.stride
            )));
        }
        if u32::from(self.ports.base) + 2 > u32::from(u16::MAX) {
            warnings.push(ConfigWarning::error(format!(
                "ports.base {} leaves no room for a single block",
                self.ports.base
            )));
        } else if self.ports.base < 1024 {
            warnings.push(ConfigWarning::warning(format!(
                "ports.base {} is in the privileged range (<1024)",
                self.ports.base
            )));
        }

        let dirs = self.layout.named_dirs();
        for (key, dir) in dirs {
            if !is_relative_inside(dir) {
                warnings.push(ConfigWarning::error(format!(
                    "layout.{key} '{dir}' must be a relative path inside the project"
                )));
            }
        }
        for (i, (key_a, dir_a)) in dirs.iter().enumerate() {
            for (key_b, dir_b) in &dirs[i + 1..] {
                if dir_a == dir_b {
                    warnings.push(ConfigWarning::error(format!(
                        "layout.{key_a} and layout.{key_b} both point at '{dir_a}'"
                    )));
                }
            }
        }

        if !paths::is_safe_segment(&self.project.container_prefix) {
            warnings.push(ConfigWarning::error(format!(
                "project.container_prefix '{}' is not a valid container name prefix",
                self.project.container_prefix
            )));
        }

        if self.image.jupyter_token.trim().is_empty() {
            warnings.push(ConfigWarning::warning(
                "image.jupyter_token is empty: notebook servers accept unauthenticated connections",
            ));
        } else if !is_plain_token(&self.image.jupyter_token) {
            warnings.push(ConfigWarning::error(
                "image.jupyter_token may not contain quotes, '$', '{', '}', '\\', '`' or whitespace",
            ));
        }

        if self.image.api_command.trim().is_empty() {
            warnings.push(ConfigWarning::error(
                "image.api_command is empty: the 'api' entrypoint mode has nothing to run",
            ));
        }

        warnings
    }

    /// Refuse to allocate or render files from a config `validate` rejects.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        Err(PodError::InvalidConfig(errors.join("; ")))
    }
}

/// The token is spliced into `entrypoint.sh` and compose `${...:-default}`
/// expansions unescaped.
fn is_plain_token(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_graphic() && !"\"'$`\\{}".contains(c))
}

fn is_relative_inside(dir: &str) -> bool {
    let path = Path::new(dir);
    !dir.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
