use anyhow::Context;
use clap::Args;
use pods_core::{
    compose::{self, BASE_SERVICE},
    config::Config,
    paths::Layout,
    platform::HostProfile,
    runtime::RuntimeAction,
    service,
};
use std::path::Path;

#[derive(Args)]
pub struct RuntimeOpts {
    /// Print the docker command instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(
    root: &Path,
    host: &HostProfile,
    action: RuntimeAction,
    opts: RuntimeOpts,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let layout = Layout::new(root, &config.layout);

    if let Some(name) = action.service() {
        check_service(root, &config, &layout, &action, name)?;
    }

    let command = action.command(&config, &layout);
    if opts.dry_run {
        println!("{}", command.render(host));
        return Ok(());
    }
    command.execute(root, host)?;
    Ok(())
}

/// The service must be registered and, for compose actions, declared in the
/// compose file. The shared base image is always allowed.
fn check_service(
    root: &Path,
    config: &Config,
    layout: &Layout,
    action: &RuntimeAction,
    name: &str,
) -> anyhow::Result<()> {
    let is_base = name == BASE_SERVICE && matches!(action, RuntimeAction::Build { .. });
    if is_base {
        return Ok(());
    }
    service::show(root, config, name)?;

    if matches!(action, RuntimeAction::Shell { .. }) {
        return Ok(());
    }
    let declared = compose::declared_services(layout)
        .with_context(|| format!("failed to read {}", config.layout.compose_file))?;
    match declared {
        Some(names) if !names.iter().any(|n| n == name) => anyhow::bail!(
            "'{name}' is not declared in {}\nRun: pods compose {name}  and paste the entry under services:",
            config.layout.compose_file
        ),
        None => anyhow::bail!(
            "{} not found\nRun: pods init",
            config.layout.compose_file
        ),
        _ => Ok(()),
    }
}
