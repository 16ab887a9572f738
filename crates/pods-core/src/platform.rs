//! Host shell and path conventions, resolved once at start-up.
//!
//! Call sites receive a [`HostProfile`] instead of branching on the OS
//! themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Unix,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellStyle {
    Sh,
    Powershell,
    Cmd,
}

impl ShellStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellStyle::Sh => "sh",
            ShellStyle::Powershell => "powershell",
            ShellStyle::Cmd => "cmd",
        }
    }

    /// Quote one argument so the shell passes it through unchanged.
    pub fn quote(&self, arg: &str) -> String {
        let plain = !arg.is_empty()
            && arg
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
        if plain {
            return arg.to_string();
        }
        match self {
            ShellStyle::Sh => format!("'{}'", arg.replace('\'', r"'\''")),
            ShellStyle::Powershell => format!("'{}'", arg.replace('\'', "''")),
            ShellStyle::Cmd => format!("\"{}\"", arg.replace('"', "\"\"")),
        }
    }
}

impl fmt::Display for ShellStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostProfile {
    pub os: OsFamily,
    pub shell: ShellStyle,
    pub path_separator: char,
}

impl HostProfile {
    pub fn unix() -> Self {
        Self {
            os: OsFamily::Unix,
            shell: ShellStyle::Sh,
            path_separator: '/',
        }
    }

    pub fn windows(shell: ShellStyle) -> Self {
        Self {
            os: OsFamily::Windows,
            shell,
            path_separator: '\\',
        }
    }

    /// Profile of the running host. `shell_override` comes from the
    /// `host.shell` config key.
    pub fn detect(shell_override: Option<ShellStyle>) -> Self {
        let mut profile = if cfg!(windows) {
            let shell = if std::env::var_os("PSModulePath").is_some() {
                ShellStyle::Powershell
            } else {
                ShellStyle::Cmd
            };
            Self::windows(shell)
        } else {
            Self::unix()
        };
        if let Some(shell) = shell_override {
            profile.shell = shell;
        }
        profile
    }

    /// Render an argv as a single copy-pasteable command line.
    pub fn render_command(&self, program: &str, args: &[String]) -> String {
        std::iter::once(self.shell.quote(program))
            .chain(args.iter().map(|a| self.shell.quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Join project-relative segments with this host's separator.
    pub fn join(&self, segments: &[&str]) -> String {
        segments.join(&self.path_separator.to_string())
    }

    /// Interpreter used to create virtual environments.
    pub fn python(&self) -> &'static str {
        match self.os {
            OsFamily::Unix => "python3",
            OsFamily::Windows => "python",
        }
    }

    /// Command that activates the virtual environment rooted at `venv`
    /// (a project-relative path).
    pub fn venv_activate(&self, venv: &Path) -> String {
        let venv = venv.to_string_lossy().replace(['/', '\\'], &self.path_separator.to_string());
        let sep = self.path_separator;
        match (self.os, self.shell) {
            (OsFamily::Unix, _) | (OsFamily::Windows, ShellStyle::Sh) => {
                let dir = if self.os == OsFamily::Windows { "Scripts" } else { "bin" };
                format!("source {venv}{sep}{dir}{sep}activate")
            }
            (OsFamily::Windows, ShellStyle::Powershell) => {
                format!("{venv}{sep}Scripts{sep}Activate.ps1")
            }
            (OsFamily::Windows, ShellStyle::Cmd) => format!("{venv}{sep}Scripts{sep}activate.bat"),
        }
    }
}
