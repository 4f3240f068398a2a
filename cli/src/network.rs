// In-memory loopback network of routing engines
//
// Every node gets one loopback link per lane. A link stores the next hop id in the
// first four bytes of its header and drops the frame onto a shared medium; the
// network then hands it to the next hop if that node speaks the frame's protocol.

use crate::config::{Config, LinkConfig};
use dualroute_core::{
    Disposition, ForwardingEngine, LinkError, LinkLayer, NodeId, Packet, Protocol, RoutingModel,
    UpperLayer,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Upper bound on frames moved per `run`, so a routing loop cannot spin forever
pub const MAX_HOPS: usize = 4096;

/// A frame in flight between two nodes
#[derive(Debug)]
struct Frame {
    from: NodeId,
    to: NodeId,
    protocol: Protocol,
    packet: Packet,
}

type Medium = Arc<Mutex<VecDeque<Frame>>>;

struct LoopbackLink {
    node: NodeId,
    protocol: Protocol,
    overhead: usize,
    medium: Medium,
}

impl LinkLayer for LoopbackLink {
    fn header_size(&self) -> usize {
        self.overhead
    }

    fn set_header(&mut self, packet: &mut Packet, next_hop: NodeId) -> Result<(), LinkError> {
        if self.overhead < 4 || packet.size() < self.overhead {
            return Err(LinkError::BufferTooShort {
                need: self.overhead.max(4),
                got: packet.size(),
            });
        }
        packet.data_mut()[..4].copy_from_slice(&next_hop.to_le_bytes());
        Ok(())
    }

    fn transmit(&mut self, packet: Packet) {
        let to = match packet.data().get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) {
            Some(bytes) => NodeId::from_le_bytes(bytes),
            None => {
                debug!("Node {} discarding unframed {} byte packet", self.node, packet.size());
                return;
            }
        };
        self.medium.lock().push_back(Frame {
            from: self.node,
            to,
            protocol: self.protocol,
            packet,
        });
    }
}

/// Upper layer that records what reached it
struct Sink {
    node: NodeId,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl UpperLayer for Sink {
    fn receive(&mut self, packet: Packet) {
        self.deliveries.lock().push(Delivery {
            node: self.node,
            size: packet.size(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub node: NodeId,
    pub size: usize,
}

/// One step of a packet's trip through the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A node handed a frame to the next hop, which processed it
    Hop {
        from: NodeId,
        to: NodeId,
        protocol: Protocol,
        size: usize,
        disposition: Disposition,
    },
    /// The addressed node does not exist or cannot hear the frame's protocol
    Lost {
        from: NodeId,
        to: NodeId,
        protocol: Protocol,
    },
    /// Hop limit reached with frames still in flight
    Truncated { pending: usize },
}

pub struct LoopbackNetwork {
    nodes: BTreeMap<NodeId, ForwardingEngine>,
    medium: Medium,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl LoopbackNetwork {
    /// Bring up every node named by the route source or the configuration, plus `extra`
    pub fn build(model: &RoutingModel, config: &Config, extra: &[NodeId]) -> anyhow::Result<Self> {
        let medium: Medium = Arc::new(Mutex::new(VecDeque::new()));
        let deliveries = Arc::new(Mutex::new(Vec::new()));

        let ids: BTreeSet<NodeId> = model
            .source()
            .nodes()
            .into_iter()
            .chain(model.source().entries().iter().map(|e| e.route.next_hop))
            .chain(config.model.nodes.keys().copied())
            .chain(extra.iter().copied())
            .collect();

        let mut nodes = BTreeMap::new();
        for id in ids {
            let params = config.model.node_params(id);
            let links = params
                .capability
                .lane_protocols()
                .iter()
                .map(|protocol| loopback_link(id, *protocol, &config.links, &medium))
                .collect();

            let mut engine = model.build_node(id, params, links)?;
            engine.bind_upper(Box::new(Sink {
                node: id,
                deliveries: Arc::clone(&deliveries),
            }));
            nodes.insert(id, engine);
        }

        Ok(Self {
            nodes,
            medium,
            deliveries,
        })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ForwardingEngine> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ForwardingEngine> {
        self.nodes.values()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// Move frames until the medium is empty or the hop limit is hit
    pub fn run(&mut self) -> Vec<TraceEvent> {
        let mut trace = Vec::new();

        for _ in 0..MAX_HOPS {
            // Release the medium before the receiving engine queues new frames
            let next = self.medium.lock().pop_front();
            let Some(frame) = next else {
                return trace;
            };

            let size = frame.packet.size();
            let Some(engine) = self
                .nodes
                .get_mut(&frame.to)
                .filter(|e| e.capability().lane_for(frame.protocol).is_some())
            else {
                debug!("Frame from {} to {} over {} lost", frame.from, frame.to, frame.protocol);
                trace.push(TraceEvent::Lost {
                    from: frame.from,
                    to: frame.to,
                    protocol: frame.protocol,
                });
                continue;
            };

            let disposition = engine.receive(frame.packet);
            trace.push(TraceEvent::Hop {
                from: frame.from,
                to: frame.to,
                protocol: frame.protocol,
                size,
                disposition,
            });
        }

        let pending = self.medium.lock().len();
        if pending > 0 {
            trace.push(TraceEvent::Truncated { pending });
        }
        trace
    }
}

fn loopback_link(
    node: NodeId,
    protocol: Protocol,
    links: &LinkConfig,
    medium: &Medium,
) -> Box<dyn LinkLayer> {
    let overhead = match protocol {
        Protocol::Wifi => links.header_wifi,
        Protocol::Zigbee => links.header_zigbee,
    };
    Box::new(LoopbackLink {
        node,
        protocol,
        overhead,
        medium: Arc::clone(medium),
    })
}
