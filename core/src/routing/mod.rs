//! Static multi-protocol routing
//!
//! Resolves a statically configured next hop for every destination and decides
//! which of the node's lanes carries the packet:
//! - Table: per-node destination → next-hop records loaded from the route source
//! - Selector: pure lane decision from node capability and next-hop protocol
//! - Header: routing header placement at lane-specific offsets
//! - Translate: size and fragment accounting for cross-protocol forwarding
//! - Engine: per-packet orchestration of send, forward and receive

pub mod engine;
pub mod header;
pub mod selector;
pub mod table;
pub mod translate;

pub use engine::{Disposition, DropReason, EngineStats, ForwardingEngine};
pub use header::{HeaderCodec, RoutingHeader};
pub use selector::{select, Capability, Selection, TieBreak};
pub use table::{Route, RouteEntry, RouteSource, RouteSourceError, RouteTable};
pub use translate::{fragment_count, translated_size};

use crate::transport::{LinkError, Protocol};
use crate::NodeId;
use thiserror::Error;

/// Routing errors returned to the layer above
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("No route to destination {0}")]
    NoRoute(NodeId),

    #[error("Node {node} cannot reach next hop {next_hop}: it needs {required}")]
    Unroutable {
        node: NodeId,
        next_hop: NodeId,
        required: Protocol,
    },

    #[error("No destination pending and no tie-break preference to pick a lane")]
    NoLaneDecision,

    #[error("Buffer too short: need {need} bytes, got {got}")]
    BufferTooShort { need: usize, got: usize },

    #[error(transparent)]
    Link(#[from] LinkError),
}
