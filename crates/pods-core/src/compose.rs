//! Docker Compose documents.
//!
//! `pods` never edits `docker-compose.yml` after `init`; it prints one
//! service entry at a time for the user to paste under `services:`.

use crate::config::Config;
use crate::entrypoint::{CONTAINER_SERVICE_DIR, JUPYTER_TOKEN_VAR};
use crate::error::Result;
use crate::paths::{Layout, BASE_IMAGE_DIR};
use crate::service::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BASE_SERVICE: &str = "base";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeBuild {
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub build: ComposeBuild,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ComposeDocument {
    services: BTreeMap<String, ComposeService>,
}

/// Only the part of a hand-maintained compose file `pods` reads back.
#[derive(Debug, Deserialize)]
struct ComposeServices {
    #[serde(default)]
    services: Option<BTreeMap<String, serde_yaml::Value>>,
}

/// Compose entry for one registered service.
pub fn service_entry(service: &ServiceDescriptor, config: &Config, layout: &Layout) -> ComposeService {
    let name = &service.name;
    let host = |p: std::path::PathBuf| format!("./{}", layout.relative(&p));
    let mut environment = BTreeMap::new();
    environment.insert(
        JUPYTER_TOKEN_VAR.to_string(),
        format!("${{PODS_{JUPYTER_TOKEN_VAR}:-{}}}", config.image.jupyter_token),
    );
    ComposeService {
        image: None,
        build: ComposeBuild {
            context: ".".to_string(),
            dockerfile: Some(layout.relative(&layout.dockerfile(name))),
        },
        container_name: Some(config.container_name(name)),
        ports: service
            .ports
            .as_array()
            .iter()
            .map(|p| format!("{p}:{p}"))
            .collect(),
        volumes: vec![
            format!("{}:{CONTAINER_SERVICE_DIR}", host(layout.service_dir(name))),
            format!("{}:/workspace/notebooks", host(layout.notebooks_dir(name))),
            format!("{}:/workspace/outputs", host(layout.outputs_dir(name))),
        ],
        environment,
        profiles: Vec::new(),
    }
}

/// YAML for one service, indented to sit under `services:`.
pub fn render_fragment(service: &ServiceDescriptor, config: &Config, layout: &Layout) -> Result<String> {
    let mut doc = BTreeMap::new();
    doc.insert(service.name.clone(), service_entry(service, config, layout));
    let yaml = serde_yaml::to_string(&doc)?;
    Ok(yaml
        .lines()
        .map(|l| format!("  {l}\n"))
        .collect::<String>())
}

/// Initial `docker-compose.yml`: only the shared base image.
pub fn render_compose_file(config: &Config, layout: &Layout) -> Result<String> {
    let mut services = BTreeMap::new();
    services.insert(
        BASE_SERVICE.to_string(),
        ComposeService {
            image: Some(config.image.base_image.clone()),
            build: ComposeBuild {
                context: layout.relative(&layout.shared_dir().join(BASE_IMAGE_DIR)),
                dockerfile: None,
            },
            container_name: None,
            ports: Vec::new(),
            volumes: Vec::new(),
            environment: BTreeMap::new(),
            profiles: vec![BASE_SERVICE.to_string()],
        },
    );
    let body = serde_yaml::to_string(&ComposeDocument { services })?;
    Ok(format!(
        "# Add service entries printed by `pods compose <name>` under `services:`.\n{body}"
    ))
}

/// Service names declared in the compose file, or `None` if there is no file.
pub fn declared_services(layout: &Layout) -> Result<Option<Vec<String>>> {
    let path = layout.compose_file();
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)?;
    let parsed: ComposeServices = serde_yaml::from_str(&data)?;
    Ok(Some(
        parsed.services.unwrap_or_default().into_keys().collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortBlock;
    use tempfile::TempDir;

    fn vision() -> ServiceDescriptor {
        ServiceDescriptor {
            name: "vision".to_string(),
            slot: 1,
            ports: PortBlock::starting_at(8010, "vision").unwrap(),
            created_at: None,
        }
    }

    #[test]
    fn entry_maps_all_three_ports() {
        let config = Config::new("lab");
        let layout = Layout::new(std::path::Path::new("/tmp/lab"), &config.layout);
        let entry = service_entry(&vision(), &config, &layout);
        assert_eq!(entry.ports, ["8010:8010", "8011:8011", "8012:8012"]);
        assert_eq!(entry.container_name.as_deref(), Some("ai-pods-vision"));
        assert_eq!(
            entry.build.dockerfile.as_deref(),
            Some("docker/services/vision/Dockerfile")
        );
        assert_eq!(entry.volumes[0], "./services/vision:/workspace/service");
        assert_eq!(
            entry.environment["JUPYTER_TOKEN"],
            "${PODS_JUPYTER_TOKEN:-ai-pods}"
        );
    }

    #[test]
    fn fragment_is_indented_and_parses_back() {
        let config = Config::new("lab");
        let layout = Layout::new(std::path::Path::new("/tmp/lab"), &config.layout);
        let fragment = render_fragment(&vision(), &config, &layout).unwrap();
        assert!(fragment.starts_with("  vision:\n"));
        assert!(fragment.lines().all(|l| l.starts_with("  ")));

        let doc = format!("services:\n{fragment}");
        let parsed: BTreeMap<String, BTreeMap<String, ComposeService>> =
            serde_yaml::from_str(&doc).unwrap();
        assert_eq!(
            parsed["services"]["vision"],
            service_entry(&vision(), &config, &layout)
        );
    }

    #[test]
    fn declared_services_reads_keys() {
        let dir = TempDir::new().unwrap();
        let config = Config::new("lab");
        let layout = Layout::new(dir.path(), &config.layout);
        assert_eq!(declared_services(&layout).unwrap(), None);

        let file = render_compose_file(&config, &layout).unwrap();
        std::fs::write(layout.compose_file(), file).unwrap();
        assert_eq!(
            declared_services(&layout).unwrap(),
            Some(vec!["base".to_string()])
        );

        std::fs::write(layout.compose_file(), "services:\n").unwrap();
        assert_eq!(declared_services(&layout).unwrap(), Some(vec![]));
    }
}
