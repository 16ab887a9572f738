//! Explicit service registry persisted at `.pods/registry.yaml`.
//!
//! Each record keeps the slot and port block assigned at creation. Released
//! slots go onto a free list and are handed out again lowest-first, so a
//! removal in the middle never shifts anyone else's ports.

use crate::error::{PodError, Result};
use crate::paths;
use crate::ports::{PortBlock, PortPlan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// RegistryEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub slot: u32,
    pub ports: PortBlock,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub next_slot: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_slots: Vec<u32>,
    #[serde(default)]
    pub services: Vec<RegistryEntry>,
}

fn default_version() -> u32 {
    1
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: 1,
            next_slot: 0,
            free_slots: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl Registry {
    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load the registry; a missing file is an empty registry.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::registry_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let registry: Registry = serde_yaml::from_str(&data)?;
        Ok(registry)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::registry_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.services.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Records in insertion order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.services
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Reserve a slot for `name` and record it. The caller persists.
    pub fn allocate(&mut self, name: &str, plan: &PortPlan) -> Result<RegistryEntry> {
        if self.contains(name) {
            return Err(PodError::AlreadyExists(name.to_string()));
        }

        let reused = self
            .free_slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| **slot)
            .map(|(i, slot)| (i, *slot));
        let slot = match reused {
            Some((_, slot)) => slot,
            None => self.next_slot,
        };
        let ports = plan.block_for(slot, name)?;

        match reused {
            Some((i, _)) => {
                self.free_slots.swap_remove(i);
            }
            None => self.next_slot += 1,
        }

        let entry = RegistryEntry {
            name: name.to_string(),
            slot,
            ports,
            created_at: Utc::now(),
        };
        tracing::debug!(
            service = %name,
            slot,
            reused = reused.is_some(),
            "registry slot reserved"
        );
        self.services.push(entry.clone());
        Ok(entry)
    }

    /// Drop the record for `name` and return its slot to the free list.
    pub fn release(&mut self, name: &str) -> Result<RegistryEntry> {
        let idx = self
            .services
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| PodError::ServiceNotFound(name.to_string()))?;
        let entry = self.services.remove(idx);
        if entry.slot + 1 == self.next_slot {
            self.next_slot -= 1;
            self.compact_tail();
        } else {
            self.free_slots.push(entry.slot);
        }
        tracing::debug!(service = %name, slot = entry.slot, "registry slot released");
        Ok(entry)
    }

    /// Pull `next_slot` down past any trailing free slots.
    fn compact_tail(&mut self) {
        while self.next_slot > 0 {
            let last = self.next_slot - 1;
            match self.free_slots.iter().position(|s| *s == last) {
                Some(i) => {
                    self.free_slots.swap_remove(i);
                    self.next_slot = last;
                }
                None => break,
            }
        }
    }

    /// Pairs of services whose stored blocks overlap. Only possible after a
    /// hand edit or a `ports:` change between registrations.
    pub fn overlapping(&self) -> Vec<(&RegistryEntry, &RegistryEntry)> {
        let mut pairs = Vec::new();
        for (i, a) in self.services.iter().enumerate() {
            for b in &self.services[i + 1..] {
                if a.ports.overlaps(&b.ports) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
