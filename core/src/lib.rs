// dualroute — static routing for dual-protocol nodes
#![allow(clippy::empty_line_after_doc_comments)]
//
// Sits between an application layer and one or two link stacks (a Wifi-class and
// a Zigbee-class radio). Resolves static next hops, picks the lane, stamps the
// routing header and translates packets that cross the protocol boundary.

pub mod config;
pub mod model;
pub mod routing;
pub mod transport;

/// Node identifier as used in routing headers and the route source
pub type NodeId = u32;

pub use config::{ConfigError, LinkBudget, ModelConfig, NodeParams};
pub use model::RoutingModel;
pub use routing::{
    Capability, Disposition, DropReason, EngineStats, ForwardingEngine, Route, RouteSource,
    RouteTable, RoutingError, RoutingHeader, Selection, TieBreak,
};
pub use transport::{LinkError, LinkLayer, Packet, Protocol, UpperLayer};
