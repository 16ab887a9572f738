use crate::output::{print_json, print_table};
use anyhow::Context;
use pods_core::{
    compose,
    config::Config,
    entrypoint::{EntrypointMode, LaunchContext},
    paths::Layout,
    service::{self, ServiceDescriptor},
};
use std::path::Path;

const TOKEN_ENV: &str = "PODS_JUPYTER_TOKEN";

fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

// ---------------------------------------------------------------------------
// register
// ---------------------------------------------------------------------------

pub fn register(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let svc = service::register(root, &config, name)
        .with_context(|| format!("failed to register '{name}'"))?;

    if json {
        return print_json(&svc);
    }

    println!("Registered service: {}", svc.name);
    print_ports(&svc);
    println!(
        "\nNext: pods compose {} (paste under services: in {})",
        svc.name, config.layout.compose_file
    );
    Ok(())
}

fn print_ports(svc: &ServiceDescriptor) {
    println!("  api      {:>5}  SERVICE_PORT", svc.ports.api);
    println!("  jupyter  {:>5}  JUPYTER_PORT", svc.ports.jupyter);
    println!("  debug    {:>5}  DEBUG_PORT", svc.ports.debug);
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

pub fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let services = service::list(root, &config).context("failed to list services")?;

    if json {
        let items: Vec<_> = services
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "slot": s.slot,
                    "ports": s.ports,
                    "present": service::is_present(root, &config, &s.name),
                })
            })
            .collect();
        return print_json(&items);
    }

    if services.is_empty() {
        println!("No services yet. Run: pods register <name>");
        return Ok(());
    }

    let rows = services
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.ports.api.to_string(),
                s.ports.jupyter.to_string(),
                s.ports.debug.to_string(),
                if service::is_present(root, &config, &s.name) {
                    String::new()
                } else {
                    "missing".to_string()
                },
            ]
        })
        .collect();
    print_table(&["NAME", "API", "JUPYTER", "DEBUG", "STATUS"], rows);
    Ok(())
}

pub fn show(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let svc = service::show(root, &config, name)?;
    let token = std::env::var(TOKEN_ENV).unwrap_or_else(|_| config.image.jupyter_token.clone());
    let ctx = LaunchContext::resolved(&svc.ports, &config.image, &token);

    if json {
        let modes: serde_json::Map<String, serde_json::Value> = EntrypointMode::named()
            .iter()
            .map(|m| (m.name().to_string(), serde_json::json!(m.argv(&ctx))))
            .collect();
        return print_json(&serde_json::json!({
            "service": svc,
            "container": config.container_name(&svc.name),
            "modes": modes,
        }));
    }

    println!("Service: {}", svc.name);
    println!("Container: {}", config.container_name(&svc.name));
    if let Some(created) = svc.created_at {
        println!("Created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Ports:");
    print_ports(&svc);
    println!("Launch modes (pods run {} <mode>):", svc.name);
    for mode in EntrypointMode::named() {
        println!("  {:<8} {}", mode.name(), mode.argv(&ctx).join(" "));
    }
    println!(
        "\nJupyter Lab: http://localhost:{}/lab?token={}",
        svc.ports.jupyter, token
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// remove / adopt
// ---------------------------------------------------------------------------

pub fn remove(root: &Path, name: &str, purge: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let removed = service::remove(root, &config, name, purge)
        .with_context(|| format!("failed to remove '{name}'"))?;

    if json {
        return print_json(&removed);
    }

    println!(
        "Removed service: {} (ports {} are free again)",
        removed.service.name, removed.service.ports
    );
    for dir in &removed.deleted {
        let shown = dir.strip_prefix(root).unwrap_or(dir);
        println!("  deleted: {}", shown.display());
    }
    if !purge {
        println!("Files were kept; rerun with --purge to delete them.");
    }
    Ok(())
}

pub fn adopt(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let adopted = service::adopt(root, &config).context("failed to adopt service directories")?;

    if json {
        return print_json(&adopted);
    }
    if adopted.is_empty() {
        println!("Every service directory is already registered.");
        return Ok(());
    }
    for svc in &adopted {
        println!("Adopted {} -> {}", svc.name, svc.ports);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// compose
// ---------------------------------------------------------------------------

pub fn compose(root: &Path, name: &str) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let svc = service::show(root, &config, name)?;
    let layout = Layout::new(root, &config.layout);

    if let Some(declared) = compose::declared_services(&layout)
        .with_context(|| format!("failed to read {}", config.layout.compose_file))?
    {
        if declared.contains(&svc.name) {
            eprintln!(
                "note: '{}' is already declared in {}",
                svc.name, config.layout.compose_file
            );
        }
    }

    print!("{}", compose::render_fragment(&svc, &config, &layout)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// audit
// ---------------------------------------------------------------------------

pub fn audit(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let findings = service::audit(root, &config).context("failed to audit registry")?;

    if json {
        return print_json(&serde_json::json!({ "findings": findings }));
    }
    if findings.is_empty() {
        println!("Registry and service directories agree.");
        return Ok(());
    }
    for finding in &findings {
        println!("- {finding}");
    }
    anyhow::bail!("{} problem(s) found", findings.len())
}
