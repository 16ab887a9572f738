use crate::output::print_json;
use anyhow::Context;
use pods_core::{config::Config, paths::Layout, platform::HostProfile, service};
use std::path::Path;

/// Print the commands that create and activate a local virtualenv for a
/// service. pods does not run them: activation has to happen in the user's
/// own shell.
pub fn run(root: &Path, host: &HostProfile, name: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    service::show(root, &config, name)?;
    let layout = Layout::new(root, &config.layout);

    let service_dir = layout.relative(&layout.service_dir(name));
    let venv = format!("{service_dir}/.venv");
    let requirements = layout.relative(&layout.requirements(name));
    let native = |p: &str| host.join(&p.split('/').collect::<Vec<_>>());

    let steps = vec![
        host.render_command(
            host.python(),
            &["-m".to_string(), "venv".to_string(), native(&venv)],
        ),
        host.venv_activate(Path::new(&venv)),
        host.render_command(
            "pip",
            &["install".to_string(), "-r".to_string(), native(&requirements)],
        ),
    ];

    if json {
        return print_json(&serde_json::json!({
            "service": name,
            "shell": host.shell,
            "venv": native(&venv),
            "steps": steps,
        }));
    }

    println!("# local virtualenv for {name} ({} shell)", host.shell);
    for step in &steps {
        println!("{step}");
    }
    Ok(())
}
