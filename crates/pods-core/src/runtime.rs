//! Pass-through commands for the container runtime.
//!
//! Each [`RuntimeAction`] becomes a `docker` argv. Nothing here interprets
//! container state; exit status is reported back unchanged.

use crate::config::Config;
use crate::error::{PodError, Result};
use crate::paths::Layout;
use crate::platform::HostProfile;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DOCKER: &str = "docker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeAction {
    /// Build one service image, or every image.
    Build { service: Option<String> },
    /// Start one service detached, or every service.
    Up { service: Option<String> },
    /// One-off container with published ports; `args` select the entrypoint mode.
    Run { service: String, args: Vec<String> },
    /// Interactive shell inside the running container.
    Shell { service: String },
    Logs { service: Option<String>, follow: bool },
    Down,
    /// Remove one service's container, or tear everything down incl. images.
    Clean { service: Option<String> },
}

impl RuntimeAction {
    pub fn service(&self) -> Option<&str> {
        match self {
            RuntimeAction::Build { service }
            | RuntimeAction::Up { service }
            | RuntimeAction::Logs { service, .. }
            | RuntimeAction::Clean { service } => service.as_deref(),
            RuntimeAction::Run { service, .. } | RuntimeAction::Shell { service } => {
                Some(service.as_str())
            }
            RuntimeAction::Down => None,
        }
    }

    pub fn command(&self, config: &Config, layout: &Layout) -> RuntimeCommand {
        let compose = |rest: &[&str]| -> Vec<String> {
            let mut args = vec![
                "compose".to_string(),
                "-f".to_string(),
                layout.relative(&layout.compose_file()),
            ];
            args.extend(rest.iter().map(|s| s.to_string()));
            args
        };
        let args = match self {
            RuntimeAction::Build { service } => {
                let mut args = compose(&["build"]);
                args.extend(service.iter().cloned());
                args
            }
            RuntimeAction::Up { service } => {
                let mut args = compose(&["up", "-d"]);
                args.extend(service.iter().cloned());
                args
            }
            RuntimeAction::Run { service, args: mode } => {
                let mut args = compose(&["run", "--rm", "--service-ports", service.as_str()]);
                args.extend(mode.iter().cloned());
                args
            }
            RuntimeAction::Shell { service } => vec![
                "exec".to_string(),
                "-it".to_string(),
                config.container_name(service),
                "/bin/bash".to_string(),
            ],
            RuntimeAction::Logs { service, follow } => {
                let mut args = compose(&["logs"]);
                if *follow {
                    args.push("-f".to_string());
                }
                args.extend(service.iter().cloned());
                args
            }
            RuntimeAction::Down => compose(&["down"]),
            RuntimeAction::Clean { service: Some(service) } => {
                compose(&["rm", "--stop", "--force", service.as_str()])
            }
            RuntimeAction::Clean { service: None } => compose(&[
                "down",
                "--rmi",
                "local",
                "--volumes",
                "--remove-orphans",
            ]),
        };
        RuntimeCommand {
            program: DOCKER.to_string(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RuntimeCommand {
    pub fn render(&self, host: &HostProfile) -> String {
        host.render_command(&self.program, &self.args)
    }

    /// Run in `cwd` with inherited stdio.
    pub fn execute(&self, cwd: &Path, host: &HostProfile) -> Result<()> {
        let program = locate(&self.program)?;
        let rendered = self.render(host);
        tracing::info!(command = %rendered, "running container runtime");
        let status = Command::new(&program)
            .args(&self.args)
            .current_dir(cwd)
            .status()?;
        if !status.success() {
            return Err(PodError::RuntimeFailed {
                command: rendered,
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

/// Find the runtime binary on PATH.
pub fn locate(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| PodError::RuntimeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(action: RuntimeAction) -> String {
        let config = Config::new("lab");
        let layout = Layout::new(Path::new("/tmp/lab"), &config.layout);
        action.command(&config, &layout).render(&HostProfile::unix())
    }

    #[test]
    fn build_single_and_all() {
        assert_eq!(
            render(RuntimeAction::Build {
                service: Some("vision".into())
            }),
            "docker compose -f docker-compose.yml build vision"
        );
        assert_eq!(
            render(RuntimeAction::Build { service: None }),
            "docker compose -f docker-compose.yml build"
        );
    }

    #[test]
    fn run_forwards_mode_arguments() {
        assert_eq!(
            render(RuntimeAction::Run {
                service: "vision".into(),
                args: vec!["debug".into()]
            }),
            "docker compose -f docker-compose.yml run --rm --service-ports vision debug"
        );
        assert_eq!(
            render(RuntimeAction::Run {
                service: "vision".into(),
                args: vec!["python".into(), "-c".into(), "print(1)".into()]
            }),
            "docker compose -f docker-compose.yml run --rm --service-ports vision python -c 'print(1)'"
        );
    }

    #[test]
    fn shell_targets_prefixed_container() {
        assert_eq!(
            render(RuntimeAction::Shell {
                service: "vision".into()
            }),
            "docker exec -it ai-pods-vision /bin/bash"
        );
    }

    #[test]
    fn logs_follow_flag() {
        assert_eq!(
            render(RuntimeAction::Logs {
                service: Some("vision".into()),
                follow: true
            }),
            "docker compose -f docker-compose.yml logs -f vision"
        );
    }

    #[test]
    fn clean_variants() {
        assert_eq!(
            render(RuntimeAction::Clean {
                service: Some("vision".into())
            }),
            "docker compose -f docker-compose.yml rm --stop --force vision"
        );
        assert_eq!(
            render(RuntimeAction::Clean { service: None }),
            "docker compose -f docker-compose.yml down --rmi local --volumes --remove-orphans"
        );
        assert_eq!(
            render(RuntimeAction::Down),
            "docker compose -f docker-compose.yml down"
        );
    }

    #[test]
    fn service_accessor() {
        assert_eq!(RuntimeAction::Down.service(), None);
        assert_eq!(
            RuntimeAction::Shell {
                service: "a".into()
            }
            .service(),
            Some("a")
        );
    }

    #[test]
    fn missing_binary_is_runtime_not_found() {
        assert!(matches!(
            locate("pods-definitely-not-a-real-binary"),
            Err(PodError::RuntimeNotFound)
        ));
    }
}
