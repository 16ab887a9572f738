//! Typed builders for every generated file.
//!
//! [`Skeleton`] covers one service; [`SharedArtifacts`] covers the files
//! every service build refers to (base image, entrypoint, compose file).

use crate::compose;
use crate::config::Config;
use crate::entrypoint::{
    self, CONTAINER_SERVICE_DIR, DEBUG_PORT_VAR, JUPYTER_PORT_VAR, JUPYTER_TOKEN_VAR,
    SERVICE_PORT_VAR,
};
use crate::error::Result;
use crate::io;
use crate::paths::Layout;
use crate::ports::PortPlan;
use crate::service::ServiceDescriptor;
use std::path::PathBuf;

/// One generated file.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
    pub executable: bool,
}

/// Outcome of writing one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created(PathBuf),
    Kept(PathBuf),
}

fn write_all(artifacts: Vec<Artifact>) -> Result<Vec<WriteOutcome>> {
    let mut outcomes = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if io::write_if_missing(&artifact.path, artifact.content.as_bytes())? {
            if artifact.executable {
                io::make_executable(&artifact.path)?;
            }
            outcomes.push(WriteOutcome::Created(artifact.path));
        } else {
            outcomes.push(WriteOutcome::Kept(artifact.path));
        }
    }
    Ok(outcomes)
}

// ---------------------------------------------------------------------------
// Skeleton (per service)
// ---------------------------------------------------------------------------

pub struct Skeleton<'a> {
    service: &'a ServiceDescriptor,
    config: &'a Config,
    layout: &'a Layout,
}

impl<'a> Skeleton<'a> {
    pub fn new(service: &'a ServiceDescriptor, config: &'a Config, layout: &'a Layout) -> Self {
        Self {
            service,
            config,
            layout,
        }
    }

    pub fn directories(&self) -> [PathBuf; 4] {
        self.layout.service_dirs(&self.service.name)
    }

    pub fn requirements(&self) -> String {
        format!(
            "# Python dependencies for {name}.\n\
             # Installed on top of {image} (jupyterlab and debugpy are already there).\n",
            name = self.service.name,
            image = self.config.image.base_image,
        )
    }

    pub fn readme(&self) -> String {
        let name = &self.service.name;
        let ports = &self.service.ports;
        let rel = |p: PathBuf| self.layout.relative(&p);
        format!(
            r#"# {name}

## Ports

| Interface | Variable | Host port |
|-----------|----------|-----------|
| API | `{SERVICE_PORT_VAR}` | {api} |
| Jupyter Lab | `{JUPYTER_PORT_VAR}` | {jupyter} |
| Debugger (debugpy) | `{DEBUG_PORT_VAR}` | {debug} |

## Layout

- Source: `{src}/`
- Build file: `{dockerfile}`
- Notebooks: `{notebooks}/` (mounted at `/workspace/notebooks`)
- Outputs: `{outputs}/` (mounted at `/workspace/outputs`)

## Usage

Add the compose entry printed by `pods compose {name}` under `services:` in
`{compose}`, then:

```
pods build {name}
pods run {name}          # Jupyter Lab at http://localhost:{jupyter}
pods run {name} api      # API at http://localhost:{api}
pods run {name} debug    # attach a debugger to localhost:{debug}
pods shell {name}
```
"#,
            api = ports.api,
            jupyter = ports.jupyter,
            debug = ports.debug,
            src = rel(self.layout.service_dir(name)),
            dockerfile = rel(self.layout.dockerfile(name)),
            notebooks = rel(self.layout.notebooks_dir(name)),
            outputs = rel(self.layout.outputs_dir(name)),
            compose = rel(self.layout.compose_file()),
        )
    }

    /// Build file; the build context is the project root.
    pub fn dockerfile(&self) -> String {
        let name = &self.service.name;
        let ports = &self.service.ports;
        let src = self.layout.relative(&self.layout.service_dir(name));
        let entry = self.layout.relative(&self.layout.entrypoint_script());
        format!(
            r#"# Generated by `pods register {name}`.
FROM {image}

ENV SERVICE_NAME={name} \
    {SERVICE_PORT_VAR}={api} \
    {JUPYTER_PORT_VAR}={jupyter} \
    {DEBUG_PORT_VAR}={debug}

WORKDIR {CONTAINER_SERVICE_DIR}
COPY {src}/requirements.txt /tmp/requirements.txt
RUN pip install --no-cache-dir -r /tmp/requirements.txt
COPY {src}/ {CONTAINER_SERVICE_DIR}/
COPY {entry} /usr/local/bin/entrypoint.sh
RUN chmod +x /usr/local/bin/entrypoint.sh

EXPOSE {api} {jupyter} {debug}

ENTRYPOINT ["/usr/local/bin/entrypoint.sh"]
CMD ["jupyter"]
"#,
            image = self.config.image.base_image,
            api = ports.api,
            jupyter = ports.jupyter,
            debug = ports.debug,
        )
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        let name = &self.service.name;
        vec![
            Artifact {
                path: self.layout.requirements(name),
                content: self.requirements(),
                executable: false,
            },
            Artifact {
                path: self.layout.readme(name),
                content: self.readme(),
                executable: false,
            },
            Artifact {
                path: self.layout.dockerfile(name),
                content: self.dockerfile(),
                executable: false,
            },
        ]
    }

    /// Create the directories and files. Existing files are left alone.
    pub fn write(&self) -> Result<Vec<WriteOutcome>> {
        for dir in self.directories() {
            io::ensure_dir(&dir)?;
        }
        write_all(self.artifacts())
    }
}

// ---------------------------------------------------------------------------
// SharedArtifacts (written once by `pods init`)
// ---------------------------------------------------------------------------

pub struct SharedArtifacts<'a> {
    config: &'a Config,
    layout: &'a Layout,
}

impl<'a> SharedArtifacts<'a> {
    pub fn new(config: &'a Config, layout: &'a Layout) -> Self {
        Self { config, layout }
    }

    pub fn base_dockerfile(&self) -> String {
        format!(
            r#"# Shared base image for every service. Build with `docker compose build base`.
FROM python:{python}-slim

RUN apt-get update \
    && apt-get install -y --no-install-recommends build-essential git curl \
    && rm -rf /var/lib/apt/lists/*

RUN pip install --no-cache-dir jupyterlab ipykernel debugpy

RUN mkdir -p /workspace/notebooks /workspace/outputs {CONTAINER_SERVICE_DIR}
WORKDIR /workspace
"#,
            python = self.config.image.python_version,
        )
    }

    pub fn entrypoint_script(&self) -> Result<String> {
        let defaults = PortPlan::new(&self.config.ports).block_for(0, "entrypoint")?;
        Ok(entrypoint::render_script(&self.config.image, &defaults))
    }

    pub fn env_example(&self) -> String {
        format!(
            "# Copy to .env; docker compose reads it automatically.\n\
             PODS_{JUPYTER_TOKEN_VAR}={token}\n",
            token = self.config.image.jupyter_token,
        )
    }

    pub fn artifacts(&self) -> Result<Vec<Artifact>> {
        Ok(vec![
            Artifact {
                path: self.layout.base_dockerfile(),
                content: self.base_dockerfile(),
                executable: false,
            },
            Artifact {
                path: self.layout.entrypoint_script(),
                content: self.entrypoint_script()?,
                executable: true,
            },
            Artifact {
                path: self.layout.compose_file(),
                content: compose::render_compose_file(self.config, self.layout)?,
                executable: false,
            },
            Artifact {
                path: self.layout.env_example(),
                content: self.env_example(),
                executable: false,
            },
        ])
    }

    pub fn write(&self) -> Result<Vec<WriteOutcome>> {
        write_all(self.artifacts()?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortBlock;
    use tempfile::TempDir;

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor {
            name: "vision".to_string(),
            slot: 3,
            ports: PortBlock::starting_at(8030, "vision").unwrap(),
            created_at: None,
        }
    }

    #[test]
    fn readme_embeds_exact_ports() {
        let dir = TempDir::new().unwrap();
        let config = Config::new("lab");
        let layout = Layout::new(dir.path(), &config.layout);
        let svc = descriptor();
        let readme = Skeleton::new(&svc, &config, &layout).readme();
        assert!(readme.starts_with("# vision\n"));
        assert!(readme.contains("| `SERVICE_PORT` | 8030 |"));
        assert!(readme.contains("| `JUPYTER_PORT` | 8031 |"));
        assert!(readme.contains("| `DEBUG_PORT` | 8032 |"));
        assert!(readme.contains("`docker/services/vision/Dockerfile`"));
    }

    #[test]
    fn dockerfile_embeds_ports_and_shared_pieces() {
        let dir = TempDir::new().unwrap();
        let config = Config::new("lab");
        let layout = Layout::new(dir.path(), &config.layout);
        let svc = descriptor();
        let dockerfile = Skeleton::new(&svc, &config, &layout).dockerfile();
        assert!(dockerfile.contains("FROM ai-pods-base:latest\n"));
        assert!(dockerfile.contains("SERVICE_NAME=vision"));
        assert!(dockerfile.contains("SERVICE_PORT=8030"));
        assert!(dockerfile.contains("JUPYTER_PORT=8031"));
        assert!(dockerfile.contains("DEBUG_PORT=8032"));
        assert!(dockerfile.contains("EXPOSE 8030 8031 8032\n"));
        assert!(dockerfile.contains("COPY docker/entrypoint.sh /usr/local/bin/entrypoint.sh"));
        assert!(dockerfile.contains("COPY services/vision/requirements.txt"));
        assert!(dockerfile.contains("CMD [\"jupyter\"]"));
    }

    #[test]
    fn write_creates_layout_and_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        let config = Config::new("lab");
        let layout = Layout::new(dir.path(), &config.layout);
        let svc = descriptor();
        let skeleton = Skeleton::new(&svc, &config, &layout);

        let first = skeleton.write().unwrap();
        assert!(first.iter().all(|o| matches!(o, WriteOutcome::Created(_))));
        for d in skeleton.directories() {
            assert!(d.is_dir(), "{}", d.display());
        }

        std::fs::write(layout.requirements("vision"), "torch\n").unwrap();
        let second = skeleton.write().unwrap();
        assert!(second.iter().all(|o| matches!(o, WriteOutcome::Kept(_))));
        assert_eq!(
            std::fs::read_to_string(layout.requirements("vision")).unwrap(),
            "torch\n"
        );
    }

    #[test]
    fn shared_artifacts_written_once() {
        let dir = TempDir::new().unwrap();
        let config = Config::new("lab");
        let layout = Layout::new(dir.path(), &config.layout);
        let shared = SharedArtifacts::new(&config, &layout);

        let outcomes = shared.write().unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(layout.base_dockerfile().exists());
        assert!(layout.compose_file().exists());
        let script = std::fs::read_to_string(layout.entrypoint_script()).unwrap();
        assert!(script.contains("case \"${1:-jupyter}\" in"));

        let again = shared.write().unwrap();
        assert!(again.iter().all(|o| matches!(o, WriteOutcome::Kept(_))));
    }

    #[test]
    fn base_image_uses_configured_python() {
        let mut config = Config::new("lab");
        config.image.python_version = "3.12".to_string();
        let layout = Layout::new(std::path::Path::new("/tmp/lab"), &config.layout);
        let base = SharedArtifacts::new(&config, &layout).base_dockerfile();
        assert!(base.starts_with("# Shared base image"));
        assert!(base.contains("FROM python:3.12-slim"));
        assert!(base.contains("debugpy"));
    }
}
