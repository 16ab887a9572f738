//! Launch modes understood by the shared container entrypoint.
//!
//! One table drives both the generated `entrypoint.sh` and the commands
//! `pods show` reports, so the two never disagree.

use crate::config::ImageConfig;
use crate::ports::PortBlock;

pub const SERVICE_PORT_VAR: &str = "SERVICE_PORT";
pub const JUPYTER_PORT_VAR: &str = "JUPYTER_PORT";
pub const DEBUG_PORT_VAR: &str = "DEBUG_PORT";
pub const JUPYTER_TOKEN_VAR: &str = "JUPYTER_TOKEN";

/// Directory the service source is mounted at inside the container.
pub const CONTAINER_SERVICE_DIR: &str = "/workspace/service";
pub const CONTAINER_WORKSPACE: &str = "/workspace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrypointMode {
    Jupyter,
    Api,
    Debug,
    Shell,
    /// Anything unrecognized runs verbatim.
    Passthrough(Vec<String>),
}

impl EntrypointMode {
    pub fn named() -> [EntrypointMode; 4] {
        [
            EntrypointMode::Jupyter,
            EntrypointMode::Api,
            EntrypointMode::Debug,
            EntrypointMode::Shell,
        ]
    }

    /// Interpret the container's argv. No arguments means `jupyter`.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let Some(first) = args.first() else {
            return EntrypointMode::Jupyter;
        };
        match first.as_ref() {
            "jupyter" => EntrypointMode::Jupyter,
            "api" => EntrypointMode::Api,
            "debug" => EntrypointMode::Debug,
            "shell" => EntrypointMode::Shell,
            _ => EntrypointMode::Passthrough(
                args.iter().map(|a| a.as_ref().to_string()).collect(),
            ),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntrypointMode::Jupyter => "jupyter",
            EntrypointMode::Api => "api",
            EntrypointMode::Debug => "debug",
            EntrypointMode::Shell => "shell",
            EntrypointMode::Passthrough(args) => args.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Environment variable naming the port this mode listens on.
    pub fn port_var(&self) -> Option<&'static str> {
        match self {
            EntrypointMode::Jupyter => Some(JUPYTER_PORT_VAR),
            EntrypointMode::Api => Some(SERVICE_PORT_VAR),
            EntrypointMode::Debug => Some(DEBUG_PORT_VAR),
            EntrypointMode::Shell | EntrypointMode::Passthrough(_) => None,
        }
    }

    pub fn argv(&self, ctx: &LaunchContext) -> Vec<String> {
        match self {
            EntrypointMode::Jupyter => vec![
                "jupyter".to_string(),
                "lab".to_string(),
                "--ip=0.0.0.0".to_string(),
                format!("--port={}", ctx.jupyter_port),
                "--no-browser".to_string(),
                "--allow-root".to_string(),
                format!("--ServerApp.token={}", ctx.jupyter_token),
                format!("--notebook-dir={CONTAINER_WORKSPACE}"),
            ],
            EntrypointMode::Api => ctx.api_command.clone(),
            EntrypointMode::Debug => {
                let mut argv = vec![
                    "python".to_string(),
                    "-m".to_string(),
                    "debugpy".to_string(),
                    "--listen".to_string(),
                    format!("0.0.0.0:{}", ctx.debug_port),
                    "--wait-for-client".to_string(),
                ];
                argv.extend(debug_target(&ctx.api_command));
                argv
            }
            EntrypointMode::Shell => vec!["/bin/bash".to_string()],
            EntrypointMode::Passthrough(args) => args.clone(),
        }
    }
}

/// What debugpy should run: the api command's script, or its program as a module.
fn debug_target(api_command: &[String]) -> Vec<String> {
    match api_command.split_first() {
        Some((program, rest)) if program == "python" || program == "python3" => rest.to_vec(),
        Some((program, rest)) => {
            let mut target = vec!["-m".to_string(), program.clone()];
            target.extend(rest.iter().cloned());
            target
        }
        None => vec!["main.py".to_string()],
    }
}

/// Values substituted into launch commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    pub api_port: String,
    pub jupyter_port: String,
    pub debug_port: String,
    pub jupyter_token: String,
    pub api_command: Vec<String>,
}

impl LaunchContext {
    /// Shell variable references, for rendering `entrypoint.sh`.
    pub fn shell_vars(image: &ImageConfig) -> Self {
        Self {
            api_port: format!("${{{SERVICE_PORT_VAR}}}"),
            jupyter_port: format!("${{{JUPYTER_PORT_VAR}}}"),
            debug_port: format!("${{{DEBUG_PORT_VAR}}}"),
            jupyter_token: format!("${{{JUPYTER_TOKEN_VAR}}}"),
            api_command: split_command(&image.api_command),
        }
    }

    /// Concrete values for one service.
    pub fn resolved(ports: &PortBlock, image: &ImageConfig, jupyter_token: &str) -> Self {
        Self {
            api_port: ports.api.to_string(),
            jupyter_port: ports.jupyter.to_string(),
            debug_port: ports.debug.to_string(),
            jupyter_token: jupyter_token.to_string(),
            api_command: split_command(&image.api_command),
        }
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// entrypoint.sh
// ---------------------------------------------------------------------------

/// Render the shared `entrypoint.sh` from the mode table.
pub fn render_script(image: &ImageConfig, defaults: &PortBlock) -> String {
    let ctx = LaunchContext::shell_vars(image);
    let mut out = String::new();
    out.push_str("#!/usr/bin/env bash\n");
    out.push_str("# Generated by `pods init`. Selects how a service container starts.\n");
    out.push_str("set -euo pipefail\n\n");
    out.push_str(&format!(
        "{SERVICE_PORT_VAR}=\"${{{SERVICE_PORT_VAR}:-{}}}\"\n",
        defaults.api
    ));
    out.push_str(&format!(
        "{JUPYTER_PORT_VAR}=\"${{{JUPYTER_PORT_VAR}:-{}}}\"\n",
        defaults.jupyter
    ));
    out.push_str(&format!(
        "{DEBUG_PORT_VAR}=\"${{{DEBUG_PORT_VAR}:-{}}}\"\n",
        defaults.debug
    ));
    out.push_str(&format!(
        "{JUPYTER_TOKEN_VAR}=\"${{{JUPYTER_TOKEN_VAR}:-{}}}\"\n",
        image.jupyter_token
    ));
    out.push_str(&format!(
        "export {SERVICE_PORT_VAR} {JUPYTER_PORT_VAR} {DEBUG_PORT_VAR} {JUPYTER_TOKEN_VAR}\n\n"
    ));
    out.push_str(&format!(
        "if [ -d {CONTAINER_SERVICE_DIR} ]; then\n    cd {CONTAINER_SERVICE_DIR}\nfi\n\n"
    ));
    out.push_str("case \"${1:-jupyter}\" in\n");
    for mode in EntrypointMode::named() {
        let words: Vec<String> = mode.argv(&ctx).iter().map(|w| script_word(w)).collect();
        out.push_str(&format!("    {})\n", mode.name()));
        if let Some(var) = mode.port_var() {
            out.push_str(&format!(
                "        echo \"[entrypoint] {} on port ${{{var}}}\"\n",
                mode.name()
            ));
        }
        out.push_str(&format!("        exec {}\n", words.join(" ")));
        out.push_str("        ;;\n");
    }
    out.push_str("    *)\n");
    out.push_str("        exec \"$@\"\n");
    out.push_str("        ;;\n");
    out.push_str("esac\n");
    out
}

/// Quote a word for the script, keeping `${VAR}` expansions live.
fn script_word(word: &str) -> String {
    if word.contains('$') {
        format!("\"{}\"", word.replace('"', "\\\""))
    } else {
        crate::platform::ShellStyle::Sh.quote(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageConfig {
        ImageConfig::default()
    }

    fn block() -> PortBlock {
        PortBlock::starting_at(8010, "svc").unwrap()
    }

    #[test]
    fn no_args_defaults_to_jupyter() {
        let empty: [&str; 0] = [];
        assert_eq!(EntrypointMode::parse(&empty), EntrypointMode::Jupyter);
    }

    #[test]
    fn named_modes_parse() {
        for mode in EntrypointMode::named() {
            assert_eq!(EntrypointMode::parse(&[mode.name()]), mode);
        }
    }

    #[test]
    fn unknown_mode_is_forwarded_verbatim() {
        let mode = EntrypointMode::parse(&["pytest", "-q", "tests/"]);
        assert_eq!(
            mode,
            EntrypointMode::Passthrough(vec![
                "pytest".to_string(),
                "-q".to_string(),
                "tests/".to_string()
            ])
        );
        let ctx = LaunchContext::resolved(&block(), &image(), "t");
        assert_eq!(mode.argv(&ctx), ["pytest", "-q", "tests/"]);
        assert_eq!(mode.port_var(), None);
    }

    #[test]
    fn jupyter_uses_secondary_port_and_token() {
        let ctx = LaunchContext::resolved(&block(), &image(), "secret");
        let argv = EntrypointMode::Jupyter.argv(&ctx);
        assert!(argv.contains(&"--port=8011".to_string()));
        assert!(argv.contains(&"--ServerApp.token=secret".to_string()));
    }

    #[test]
    fn api_runs_configured_command() {
        let ctx = LaunchContext::resolved(&block(), &image(), "t");
        assert_eq!(EntrypointMode::Api.argv(&ctx), ["python", "main.py"]);
    }

    #[test]
    fn debug_listens_on_tertiary_port_and_waits() {
        let ctx = LaunchContext::resolved(&block(), &image(), "t");
        let argv = EntrypointMode::Debug.argv(&ctx);
        assert_eq!(
            argv,
            [
                "python",
                "-m",
                "debugpy",
                "--listen",
                "0.0.0.0:8012",
                "--wait-for-client",
                "main.py"
            ]
        );
    }

    #[test]
    fn debug_wraps_non_python_api_as_module() {
        let mut img = image();
        img.api_command = "uvicorn app:app --host 0.0.0.0".to_string();
        let ctx = LaunchContext::resolved(&block(), &img, "t");
        let argv = EntrypointMode::Debug.argv(&ctx);
        assert_eq!(&argv[6..], ["-m", "uvicorn", "app:app", "--host", "0.0.0.0"]);
    }

    #[test]
    fn script_dispatches_every_mode() {
        let script = render_script(&image(), &PortBlock::starting_at(8000, "x").unwrap());
        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("case \"${1:-jupyter}\" in"));
        for mode in ["jupyter)", "api)", "debug)", "shell)", "*)"] {
            assert!(script.contains(mode), "missing branch {mode}");
        }
        assert!(script.contains("exec \"$@\""));
        assert!(script.contains("\"--port=${JUPYTER_PORT}\""));
        assert!(script.contains("\"0.0.0.0:${DEBUG_PORT}\""));
        assert!(script.contains("JUPYTER_TOKEN=\"${JUPYTER_TOKEN:-ai-pods}\""));
        assert!(script.contains("SERVICE_PORT=\"${SERVICE_PORT:-8000}\""));
    }
}
