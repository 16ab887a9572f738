use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PodError {
    #[error("not initialized: run 'pods init'")]
    NotInitialized,

    #[error(
        "invalid service name '{0}': must start with a letter or digit and contain only letters, digits, '-', '_' or '.' (max 63 chars)"
    )]
    InvalidName(String),

    #[error("service name '{0}' is reserved for the shared base image")]
    ReservedName(String),

    #[error("invalid config: {0} (see 'pods config validate')")]
    InvalidConfig(String),

    #[error("service already exists: {0}")]
    AlreadyExists(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("no port block left for '{name}': base {base} + 2 exceeds 65535")]
    PortRangeExhausted { name: String, base: u32 },

    #[error("registry is locked by another pods process (remove {} if none is running)", .0.display())]
    RegistryLocked(PathBuf),

    #[error("'{operation}' is not supported with the {strategy} allocation strategy")]
    UnsupportedForStrategy {
        operation: String,
        strategy: String,
    },

    #[error("container runtime not found: install docker and make sure it is on PATH")]
    RuntimeNotFound,

    #[error("`{command}` exited with status {code}")]
    RuntimeFailed { command: String, code: i32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PodError>;
