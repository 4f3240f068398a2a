//! Protocol Selector — egress lane decision
//!
//! Pure decision procedure: given what the node can speak, what the route's next
//! hop requires, and a tie-break preference, pick the lane to send on.
//!
//! Rules, evaluated top to bottom (first match wins):
//! 1. Mono node and the next hop needs the *other* protocol → incompatible
//! 2. Wifi-only node, or next hop needs Wifi → Wifi on lane 0
//! 3. Zigbee-only node, or next hop needs Zigbee → Zigbee on lane 0 (mono) / 1 (dual)
//! 4. No usable requirement → tie-break preference decides

use crate::config::{ConfigError, ConfigValue};
use crate::transport::Protocol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which protocols a node speaks, fixed at node setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "ConfigValue")]
pub enum Capability {
    WifiOnly,
    ZigbeeOnly,
    Dual,
}

impl Capability {
    /// Numeric node protocol codes: 0 dual, 1 Wifi-only, 2 Zigbee-only
    pub fn from_code(code: i64) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(Capability::Dual),
            1 => Ok(Capability::WifiOnly),
            2 => Ok(Capability::ZigbeeOnly),
            other => Err(ConfigError::UnknownCapability(other.to_string())),
        }
    }

    pub fn is_mono(&self) -> bool {
        !matches!(self, Capability::Dual)
    }

    /// Lane protocols in lane-index order
    pub fn lane_protocols(&self) -> &'static [Protocol] {
        match self {
            Capability::WifiOnly => &[Protocol::Wifi],
            Capability::ZigbeeOnly => &[Protocol::Zigbee],
            Capability::Dual => &[Protocol::Wifi, Protocol::Zigbee],
        }
    }

    /// Lane index a protocol occupies on this node, if the node speaks it
    pub fn lane_for(&self, protocol: Protocol) -> Option<usize> {
        self.lane_protocols().iter().position(|p| *p == protocol)
    }
}

impl FromStr for Capability {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wifi" | "wifi_only" => Ok(Capability::WifiOnly),
            "zigbee" | "zigbee_only" => Ok(Capability::ZigbeeOnly),
            "dual" => Ok(Capability::Dual),
            other => match other.parse::<i64>() {
                Ok(code) => Capability::from_code(code),
                Err(_) => Err(ConfigError::UnknownCapability(s.to_string())),
            },
        }
    }
}

impl TryFrom<ConfigValue> for Capability {
    type Error = ConfigError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Code(code) => Capability::from_code(code),
            ConfigValue::Name(name) => name.parse(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::WifiOnly => write!(f, "wifi-only"),
            Capability::ZigbeeOnly => write!(f, "zigbee-only"),
            Capability::Dual => write!(f, "dual"),
        }
    }
}

/// Preference used only when selection cannot otherwise decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "ConfigValue")]
pub enum TieBreak {
    FavorWifi,
    FavorZigbee,
    None,
}

impl TieBreak {
    /// Numeric priority codes: 1 Wifi, 2 Zigbee, anything else means no preference
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => TieBreak::FavorWifi,
            2 => TieBreak::FavorZigbee,
            _ => TieBreak::None,
        }
    }
}

impl FromStr for TieBreak {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "favor_wifi" | "wifi" => Ok(TieBreak::FavorWifi),
            "favor_zigbee" | "zigbee" => Ok(TieBreak::FavorZigbee),
            "none" => Ok(TieBreak::None),
            other => match other.parse::<i64>() {
                Ok(code) => Ok(TieBreak::from_code(code)),
                Err(_) => Err(ConfigError::UnknownTieBreak(s.to_string())),
            },
        }
    }
}

impl TryFrom<ConfigValue> for TieBreak {
    type Error = ConfigError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Code(code) => Ok(TieBreak::from_code(code)),
            ConfigValue::Name(name) => name.parse(),
        }
    }
}

/// Outcome of protocol selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Send on this lane
    Lane { protocol: Protocol, index: usize },
    /// The node cannot speak what the next hop needs
    Incompatible,
}

impl Selection {
    pub fn lane(&self) -> Option<(Protocol, usize)> {
        match self {
            Selection::Lane { protocol, index } => Some((*protocol, *index)),
            Selection::Incompatible => None,
        }
    }
}

/// Decide the egress lane.
///
/// `required` is the protocol the route's next hop speaks. `None` means the route
/// carries no usable requirement, which leaves the decision to `tie_break`.
pub fn select(
    capability: Capability,
    required: Option<Protocol>,
    tie_break: TieBreak,
) -> Selection {
    let zigbee_lane = if capability == Capability::ZigbeeOnly { 0 } else { 1 };

    match (capability, required) {
        (Capability::WifiOnly, Some(Protocol::Zigbee))
        | (Capability::ZigbeeOnly, Some(Protocol::Wifi)) => Selection::Incompatible,
        (Capability::WifiOnly, _) | (_, Some(Protocol::Wifi)) => Selection::Lane {
            protocol: Protocol::Wifi,
            index: 0,
        },
        (Capability::ZigbeeOnly, _) | (_, Some(Protocol::Zigbee)) => Selection::Lane {
            protocol: Protocol::Zigbee,
            index: zigbee_lane,
        },
        (Capability::Dual, None) => match tie_break {
            TieBreak::FavorWifi => Selection::Lane {
                protocol: Protocol::Wifi,
                index: 0,
            },
            TieBreak::FavorZigbee => Selection::Lane {
                protocol: Protocol::Zigbee,
                index: 1,
            },
            TieBreak::None => Selection::Incompatible,
        },
    }
}
