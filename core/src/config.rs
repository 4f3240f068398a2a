// Model configuration — link budget, route source location and per-node parameters
//
// One ModelConfig describes a whole simulation: every node built from it shares
// the same LinkBudget and route source.

use crate::routing::selector::{Capability, TieBreak};
use crate::routing::table::RouteSourceError;
use crate::transport::Protocol;
use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_ROUTE_SOURCE: &str = "routing.data";
pub const DEFAULT_MAX_PAYLOAD: usize = 1000;

/// Configuration and node bring-up errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown node capability: {0}")]
    UnknownCapability(String),

    #[error("Unknown tie-break priority: {0}")]
    UnknownTieBreak(String),

    #[error("Node with {capability} capability needs {expected} link(s), got {got}")]
    LaneCount {
        capability: Capability,
        expected: usize,
        got: usize,
    },

    #[error("Maximum payload for {0} must be greater than zero")]
    ZeroPayload(Protocol),

    #[error("Route source: {0}")]
    RouteSource(#[from] RouteSourceError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A configuration scalar given either by name or by numeric code
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Code(i64),
    Name(String),
}

/// Maximum payload per protocol, shared read-only by every node of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBudget {
    pub max_payload_wifi: usize,
    pub max_payload_zigbee: usize,
}

impl Default for LinkBudget {
    fn default() -> Self {
        Self {
            max_payload_wifi: DEFAULT_MAX_PAYLOAD,
            max_payload_zigbee: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl LinkBudget {
    pub fn new(max_payload_wifi: usize, max_payload_zigbee: usize) -> Result<Self, ConfigError> {
        let budget = Self {
            max_payload_wifi,
            max_payload_zigbee,
        };
        budget.validate()?;
        Ok(budget)
    }

    pub fn max_payload(&self, protocol: Protocol) -> usize {
        match protocol {
            Protocol::Wifi => self.max_payload_wifi,
            Protocol::Zigbee => self.max_payload_zigbee,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_wifi == 0 {
            return Err(ConfigError::ZeroPayload(Protocol::Wifi));
        }
        if self.max_payload_zigbee == 0 {
            return Err(ConfigError::ZeroPayload(Protocol::Zigbee));
        }
        Ok(())
    }
}

/// Per-node routing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeParams {
    #[serde(default = "default_capability")]
    pub capability: Capability,
    #[serde(default = "default_tie_break")]
    pub tie_break: TieBreak,
}

fn default_capability() -> Capability {
    Capability::Dual
}

fn default_tie_break() -> TieBreak {
    TieBreak::FavorWifi
}

impl Default for NodeParams {
    fn default() -> Self {
        Self {
            capability: default_capability(),
            tie_break: default_tie_break(),
        }
    }
}

impl NodeParams {
    pub fn new(capability: Capability, tie_break: TieBreak) -> Self {
        Self { capability, tie_break }
    }
}

/// Configuration of one routing model instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path of the static route source
    pub route_source_path: String,

    pub max_payload_wifi: usize,
    pub max_payload_zigbee: usize,

    /// Parameters for nodes without an explicit entry
    pub default_node: NodeParams,

    /// Per-node overrides
    pub nodes: BTreeMap<NodeId, NodeParams>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            route_source_path: DEFAULT_ROUTE_SOURCE.to_string(),
            max_payload_wifi: DEFAULT_MAX_PAYLOAD,
            max_payload_zigbee: DEFAULT_MAX_PAYLOAD,
            default_node: NodeParams::default(),
            nodes: BTreeMap::new(),
        }
    }
}

impl ModelConfig {
    /// Parse a JSON configuration and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = serde_json::from_str(json)?;
        config.budget().validate()?;
        Ok(config)
    }

    pub fn budget(&self) -> LinkBudget {
        LinkBudget {
            max_payload_wifi: self.max_payload_wifi,
            max_payload_zigbee: self.max_payload_zigbee,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn node_params(&self, node: NodeId) -> NodeParams {
        self.nodes.get(&node).copied().unwrap_or(self.default_node)
    }
}
