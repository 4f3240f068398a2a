//! Link abstraction for the routing layer
//!
//! Defines the two link-layer protocol classes a node can speak and the call
//! interfaces the routing layer consumes from the stacks below it and exposes
//! to the consumers above it.

use super::packet::Packet;
use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Link-layer protocol class of a lane (and origin tag of a packet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Fast, short-range class (802.11-like)
    Wifi,
    /// Low-power, long-range class (802.15.4-like)
    Zigbee,
}

impl Protocol {
    /// Protocol code used in the static route source (1 = Wifi, 2 = Zigbee)
    pub fn from_route_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Protocol::Wifi),
            2 => Some(Protocol::Zigbee),
            _ => None,
        }
    }

    /// Origin tag carried on packets (0 = Wifi, 1 = Zigbee)
    pub fn from_origin_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Protocol::Wifi),
            1 => Some(Protocol::Zigbee),
            _ => None,
        }
    }

    pub fn origin_tag(&self) -> u8 {
        match self {
            Protocol::Wifi => 0,
            Protocol::Zigbee => 1,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Wifi => write!(f, "Wifi"),
            Protocol::Zigbee => write!(f, "Zigbee"),
        }
    }
}

/// Downward call interface: one link-layer stack bound below a lane
#[cfg_attr(test, mockall::automock)]
pub trait LinkLayer {
    /// Size in bytes of the header this stack places at the front of a packet
    fn header_size(&self) -> usize;

    /// Place the link header addressed to `next_hop`
    fn set_header(&mut self, packet: &mut Packet, next_hop: NodeId) -> Result<(), LinkError>;

    /// Hand a framed packet to the stack for transmission
    fn transmit(&mut self, packet: Packet);
}

/// Upward call interface: a consumer bound above the routing layer
#[cfg_attr(test, mockall::automock)]
pub trait UpperLayer {
    fn receive(&mut self, packet: Packet);
}

/// Errors reported by a lower-layer stack
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LinkError {
    #[error("Link header rejected: {0}")]
    HeaderRejected(String),

    #[error("Next hop {0} is not reachable on this link")]
    UnreachableNextHop(NodeId),

    #[error("Buffer too short for link header: need {need} bytes, got {got}")]
    BufferTooShort { need: usize, got: usize },
}
