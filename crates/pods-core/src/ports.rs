//! Port blocks: three contiguous host ports per service.
//!
//! A block is addressed by its slot; `base = ports.base + slot * ports.stride`.

use crate::config::PortConfig;
use crate::error::{PodError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ports reserved for one service, in `SERVICE_PORT`, `JUPYTER_PORT`,
/// `DEBUG_PORT` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBlock {
    pub api: u16,
    pub jupyter: u16,
    pub debug: u16,
}

impl PortBlock {
    /// Block starting at `base`. Fails if `base + 2` does not fit in a port.
    pub fn starting_at(base: u32, name: &str) -> Result<Self> {
        if base + 2 > u32::from(u16::MAX) {
            return Err(PodError::PortRangeExhausted {
                name: name.to_string(),
                base,
            });
        }
        let base = base as u16;
        Ok(Self {
            api: base,
            jupyter: base + 1,
            debug: base + 2,
        })
    }

    pub fn as_array(&self) -> [u16; 3] {
        [self.api, self.jupyter, self.debug]
    }

    pub fn overlaps(&self, other: &PortBlock) -> bool {
        self.api <= other.debug && other.api <= self.debug
    }
}

impl fmt::Display for PortBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.api, self.debug)
    }
}

/// Maps slots to port blocks for a given `ports:` config.
#[derive(Debug, Clone, Copy)]
pub struct PortPlan {
    base: u16,
    stride: u16,
}

impl PortPlan {
    pub fn new(cfg: &PortConfig) -> Self {
        Self {
            base: cfg.base,
            stride: cfg.stride,
        }
    }

    pub fn block_for(&self, slot: u32, name: &str) -> Result<PortBlock> {
        let base = u64::from(self.base) + u64::from(slot) * u64::from(self.stride);
        let base = u32::try_from(base).map_err(|_| PodError::PortRangeExhausted {
            name: name.to_string(),
            base: u32::MAX,
        })?;
        PortBlock::starting_at(base, name)
    }
}
