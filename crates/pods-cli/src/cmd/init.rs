use crate::output::print_outcomes;
use anyhow::Context;
use clap::ValueEnum;
use pods_core::{
    config::{AllocationStrategy, Config},
    io,
    paths::{self, Layout},
    registry::Registry,
    skeleton::SharedArtifacts,
};
use std::path::Path;

#[derive(Clone, Copy, ValueEnum)]
pub enum AllocationArg {
    /// Explicit registry in .pods/registry.yaml (released blocks are reused)
    Registry,
    /// Live count of service directories (legacy behaviour)
    DirectoryCount,
}

impl From<AllocationArg> for AllocationStrategy {
    fn from(arg: AllocationArg) -> Self {
        match arg {
            AllocationArg::Registry => AllocationStrategy::Registry,
            AllocationArg::DirectoryCount => AllocationStrategy::DirectoryCount,
        }
    }
}

pub fn run(root: &Path, allocation: Option<AllocationStrategy>) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ai-pods".to_string());

    println!("Initializing pods in: {}", root.display());

    io::ensure_dir(&paths::pods_dir(root)).context("failed to create .pods/")?;

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        let existing = Config::load(root).context("failed to load existing config")?;
        println!("  exists:  {}", paths::CONFIG_FILE);
        if let Some(requested) = allocation {
            if requested != existing.allocation {
                eprintln!(
                    "note: keeping allocation '{}' from {}; edit the file to change it",
                    existing.allocation,
                    paths::CONFIG_FILE
                );
            }
        }
        existing
    } else {
        let cfg = Config::new(&project_name).with_allocation(allocation.unwrap_or_default());
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        cfg
    };

    if config.allocation == AllocationStrategy::Registry {
        if paths::registry_path(root).exists() {
            println!("  exists:  {}", paths::REGISTRY_FILE);
        } else {
            Registry::default()
                .save(root)
                .context("failed to write registry.yaml")?;
            println!("  created: {}", paths::REGISTRY_FILE);
        }
    }

    config
        .ensure_valid()
        .context("refusing to write shared artifacts")?;

    let layout = Layout::new(root, &config.layout);
    for dir in [
        layout.services_root(),
        layout.build_root(),
        layout.notebooks_root(),
        layout.outputs_root(),
    ] {
        io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let outcomes = SharedArtifacts::new(&config, &layout)
        .write()
        .context("failed to write shared artifacts")?;
    print_outcomes(root, &outcomes);

    for entry in [paths::LOCK_FILE, ".env"] {
        io::ensure_gitignore_entry(root, entry).context("failed to update .gitignore")?;
    }

    println!("\nAllocation: {}", config.allocation);
    println!("Next: pods register <name>");
    Ok(())
}
