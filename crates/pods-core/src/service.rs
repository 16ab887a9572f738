//! Service registration, listing and removal.
//!
//! Which port block a service gets depends on [`AllocationStrategy`]:
//! the explicit registry (default) or the live directory count.

use crate::config::{AllocationStrategy, Config};
use crate::error::{PodError, Result};
use crate::lock::RegistryLock;
use crate::paths::{self, Layout};
use crate::ports::{PortBlock, PortPlan};
use crate::registry::{Registry, RegistryEntry};
use crate::skeleton::Skeleton;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ServiceDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub slot: u32,
    pub ports: PortBlock,
    /// Only known for services recorded in the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<RegistryEntry> for ServiceDescriptor {
    fn from(entry: RegistryEntry) -> Self {
        Self {
            name: entry.name,
            slot: entry.slot,
            ports: entry.ports,
            created_at: Some(entry.created_at),
        }
    }
}

// ---------------------------------------------------------------------------
// register
// ---------------------------------------------------------------------------

/// Allocate a port block for `name` and write its skeleton.
///
/// Files written before a failure stay on disk. Under the registry strategy
/// the reservation is dropped again so the slot is not leaked.
pub fn register(root: &Path, config: &Config, name: &str) -> Result<ServiceDescriptor> {
    paths::validate_name(name)?;
    config.ensure_valid()?;
    let layout = Layout::new(root, &config.layout);
    let plan = PortPlan::new(&config.ports);

    match config.allocation {
        AllocationStrategy::DirectoryCount => {
            ensure_no_directory(&layout, name)?;
            let count = service_dir_names(&layout)?.len();
            let slot = u32::try_from(count).map_err(|_| PodError::PortRangeExhausted {
                name: name.to_string(),
                base: u32::MAX,
            })?;
            let descriptor = ServiceDescriptor {
                name: name.to_string(),
                slot,
                ports: plan.block_for(slot, name)?,
                created_at: None,
            };
            tracing::info!(
                service = %name,
                existing = count,
                base = descriptor.ports.api,
                "allocated port block from directory count"
            );
            Skeleton::new(&descriptor, config, &layout).write()?;
            Ok(descriptor)
        }
        AllocationStrategy::Registry => {
            let _lock = RegistryLock::acquire(root)?;
            ensure_no_directory(&layout, name)?;
            let mut registry = Registry::load(root)?;
            let unrecorded = unregistered_dirs(&layout, &registry)?;
            if !unrecorded.is_empty() {
                tracing::warn!(
                    directories = ?unrecorded,
                    "service directories without a registry record may already use these ports; run `pods adopt` to record them"
                );
            }
            let entry = registry.allocate(name, &plan)?;
            registry.save(root)?;

            let descriptor = ServiceDescriptor::from(entry);
            tracing::info!(
                service = %name,
                slot = descriptor.slot,
                base = descriptor.ports.api,
                "allocated port block from registry"
            );

            if let Err(e) = Skeleton::new(&descriptor, config, &layout).write() {
                tracing::warn!(service = %name, error = %e, "skeleton write failed; releasing slot");
                registry.release(name)?;
                registry.save(root)?;
                return Err(e);
            }
            Ok(descriptor)
        }
    }
}

fn ensure_no_directory(layout: &Layout, name: &str) -> Result<()> {
    if layout.service_dir(name).exists() {
        return Err(PodError::AlreadyExists(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

/// Known services. Registry strategy: insertion order. Directory strategy:
/// ports re-derived from each directory's position in the name-sorted listing,
/// which is only right if nothing was ever deleted from the middle.
pub fn list(root: &Path, config: &Config) -> Result<Vec<ServiceDescriptor>> {
    match config.allocation {
        AllocationStrategy::Registry => Ok(Registry::load(root)?
            .services
            .into_iter()
            .map(ServiceDescriptor::from)
            .collect()),
        AllocationStrategy::DirectoryCount => {
            let layout = Layout::new(root, &config.layout);
            let plan = PortPlan::new(&config.ports);
            service_dir_names(&layout)?
                .into_iter()
                .enumerate()
                .map(|(i, name)| {
                    let slot = i as u32;
                    let ports = plan.block_for(slot, &name)?;
                    Ok(ServiceDescriptor {
                        name,
                        slot,
                        ports,
                        created_at: None,
                    })
                })
                .collect()
        }
    }
}

pub fn show(root: &Path, config: &Config, name: &str) -> Result<ServiceDescriptor> {
    list(root, config)?
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| PodError::ServiceNotFound(name.to_string()))
}

/// Whether the service's source directory is on disk.
pub fn is_present(root: &Path, config: &Config, name: &str) -> bool {
    Layout::new(root, &config.layout).service_dir(name).is_dir()
}

// ---------------------------------------------------------------------------
// remove
// ---------------------------------------------------------------------------

/// Drop a registry record and free its slot. With `purge`, also delete the
/// service's source, build, notebook and output directories.
pub fn remove(root: &Path, config: &Config, name: &str, purge: bool) -> Result<RemovedService> {
    if config.allocation != AllocationStrategy::Registry {
        return Err(PodError::UnsupportedForStrategy {
            operation: "remove".to_string(),
            strategy: config.allocation.to_string(),
        });
    }
    paths::validate_name(name)?;

    let _lock = RegistryLock::acquire(root)?;
    let mut registry = Registry::load(root)?;
    let entry = registry.release(name)?;
    registry.save(root)?;

    let mut deleted = Vec::new();
    if purge {
        let layout = Layout::new(root, &config.layout);
        for dir in layout.service_dirs(name) {
            if crate::io::remove_dir_if_exists(&dir)? {
                deleted.push(dir);
            }
        }
    }
    tracing::info!(service = %name, slot = entry.slot, purge, "service removed");
    Ok(RemovedService {
        service: entry.into(),
        deleted,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedService {
    pub service: ServiceDescriptor,
    pub deleted: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// adopt
// ---------------------------------------------------------------------------

/// Give every service directory without a registry record the next free
/// slot, in name order. On a fresh registry this reproduces the ports the
/// directory strategy would have derived.
pub fn adopt(root: &Path, config: &Config) -> Result<Vec<ServiceDescriptor>> {
    if config.allocation != AllocationStrategy::Registry {
        return Err(PodError::UnsupportedForStrategy {
            operation: "adopt".to_string(),
            strategy: config.allocation.to_string(),
        });
    }
    config.ensure_valid()?;
    let layout = Layout::new(root, &config.layout);
    let plan = PortPlan::new(&config.ports);

    let _lock = RegistryLock::acquire(root)?;
    let mut registry = Registry::load(root)?;
    let mut adopted = Vec::new();
    for name in unregistered_dirs(&layout, &registry)? {
        if paths::validate_name(&name).is_err() {
            tracing::warn!(directory = %name, "skipping directory with an invalid service name");
            continue;
        }
        let descriptor = ServiceDescriptor::from(registry.allocate(&name, &plan)?);
        adopted.push(descriptor);
    }
    if !adopted.is_empty() {
        registry.save(root)?;
    }
    Ok(adopted)
}

// ---------------------------------------------------------------------------
// audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Registry record without a service directory.
    MissingDirectory { service: String },
    /// Service directory the registry does not know about.
    Unregistered { service: String },
    /// Two services share at least one port.
    Overlap {
        first: String,
        second: String,
        first_ports: PortBlock,
        second_ports: PortBlock,
    },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::MissingDirectory { service } => {
                write!(f, "'{service}' is registered but its directory is missing")
            }
            Finding::Unregistered { service } => {
                write!(f, "'{service}' has a directory but no registry record")
            }
            Finding::Overlap {
                first,
                second,
                first_ports,
                second_ports,
            } => write!(
                f,
                "'{first}' ({first_ports}) overlaps '{second}' ({second_ports})"
            ),
        }
    }
}

/// Cross-check the registry against the service directories on disk.
/// Under the directory strategy there is nothing to compare, so the result
/// is always empty.
pub fn audit(root: &Path, config: &Config) -> Result<Vec<Finding>> {
    if config.allocation != AllocationStrategy::Registry {
        return Ok(Vec::new());
    }
    let layout = Layout::new(root, &config.layout);
    let registry = Registry::load(root)?;
    let on_disk = service_dir_names(&layout)?;

    let mut findings = Vec::new();
    for entry in registry.entries() {
        if !on_disk.contains(&entry.name) {
            findings.push(Finding::MissingDirectory {
                service: entry.name.clone(),
            });
        }
    }
    for name in unregistered_dirs(&layout, &registry)? {
        findings.push(Finding::Unregistered { service: name });
    }
    for (a, b) in registry.overlapping() {
        findings.push(Finding::Overlap {
            first: a.name.clone(),
            second: b.name.clone(),
            first_ports: a.ports,
            second_ports: b.ports,
        });
    }
    Ok(findings)
}

// ---------------------------------------------------------------------------
// Directory listing
// ---------------------------------------------------------------------------

/// Subdirectory names of the service root, sorted by name. Hidden entries
/// are skipped.
fn service_dir_names(layout: &Layout) -> Result<Vec<String>> {
    let services_root = layout.services_root();
    if !services_root.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&services_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Service directories the registry has no record for.
fn unregistered_dirs(layout: &Layout, registry: &Registry) -> Result<Vec<String>> {
    Ok(service_dir_names(layout)?
        .into_iter()
        .filter(|name| !registry.contains(name))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
