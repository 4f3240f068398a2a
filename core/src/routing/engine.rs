//! Forwarding Engine — per-packet orchestration
//!
//! Composes the route table, the protocol selector and the header codec for every
//! entry point of the routing layer:
//! 1. **set_header**: resolve the route, pick a lane, stamp `{destination, self}`
//! 2. **header_size**: link overhead of the lane the pending destination will use
//! 3. **transmit**: send on the lane chosen by the last `set_header`
//! 4. **receive**: parse the header at the ingress lane offset, deliver or forward
//! 5. **forward**: re-select the egress lane and translate across protocols
//!
//! Every entry point runs to completion; packets are released by dropping them.

use super::header::{HeaderCodec, RoutingHeader};
use super::selector::{select, Capability, Selection, TieBreak};
use super::table::{Route, RouteTable};
use super::translate::{fragment_count, translated_size};
use super::RoutingError;
use crate::config::{ConfigError, LinkBudget, NodeParams};
use crate::transport::{Lane, LinkLayer, Packet, Protocol, UpperLayer};
use crate::NodeId;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Terminal state of a received or forwarded packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Addressed to this node and handed to every upper consumer
    Delivered { consumers: usize },
    /// Re-framed on the same protocol and sent once
    Forwarded { next_hop: NodeId, lane: usize },
    /// Re-framed for the other protocol; `transmissions` counts the primary and its copies
    Translated {
        next_hop: NodeId,
        from: Protocol,
        to: Protocol,
        size: usize,
        transmissions: usize,
    },
    /// Released without being sent or delivered
    Dropped { reason: DropReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Dual node received a packet whose origin tag names no known protocol
    UnknownOrigin,
    /// Packet too short to hold a routing header at the lane offset
    Malformed,
    NoRoute,
    /// Next hop needs a protocol this node does not speak
    Incompatible,
    /// Translated size cannot hold the target link and routing headers
    TranslationUnderflow,
    /// The lower layer refused to frame the packet
    LinkRejected,
}

/// Per-node packet counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Packets sent on behalf of the layer above
    pub originated: u64,
    /// Packets relayed on the protocol they arrived with
    pub forwarded: u64,
    /// Packets relayed across the protocol boundary
    pub translated: u64,
    /// Extra copies transmitted to account for payload size mismatch
    pub fragment_copies: u64,
    /// Upward deliveries (one per consumer)
    pub delivered: u64,
    pub dropped: u64,
}

/// Routing state of one node
pub struct ForwardingEngine {
    node_id: NodeId,
    capability: Capability,
    tie_break: TieBreak,
    budget: Arc<LinkBudget>,
    routes: RouteTable,
    /// Lane `i` speaks `capability.lane_protocols()[i]`
    lanes: Vec<Lane>,
    upper: Vec<Box<dyn UpperLayer>>,
    /// Destination announced by the layer above ahead of a header size query
    pending_destination: Option<NodeId>,
    last_tx_lane: usize,
    stats: EngineStats,
}

impl ForwardingEngine {
    /// Bind one link stack per lane, in lane order (Wifi first on a dual node)
    pub fn new(
        node_id: NodeId,
        params: NodeParams,
        budget: Arc<LinkBudget>,
        routes: RouteTable,
        links: Vec<Box<dyn LinkLayer>>,
    ) -> Result<Self, ConfigError> {
        let protocols = params.capability.lane_protocols();
        if links.len() != protocols.len() {
            return Err(ConfigError::LaneCount {
                capability: params.capability,
                expected: protocols.len(),
                got: links.len(),
            });
        }

        let lanes = protocols
            .iter()
            .zip(links)
            .enumerate()
            .map(|(index, (protocol, link))| Lane::new(*protocol, index, link))
            .collect();

        Ok(Self {
            node_id,
            capability: params.capability,
            tie_break: params.tie_break,
            budget,
            routes,
            lanes,
            upper: Vec::new(),
            pending_destination: None,
            last_tx_lane: 0,
            stats: EngineStats::default(),
        })
    }

    /// Resolve and cache the link overhead of every lane before traffic flows
    pub fn bootstrap(&mut self) {
        for lane in &mut self.lanes {
            let overhead = lane.overhead();
            debug!(
                "Node {} lane {} ({}) overhead {} bytes",
                self.node_id,
                lane.index(),
                lane.protocol(),
                overhead
            );
        }
    }

    /// Bind a consumer above this node; delivery follows binding order
    pub fn bind_upper(&mut self, consumer: Box<dyn UpperLayer>) {
        self.upper.push(consumer);
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn budget(&self) -> &LinkBudget {
        &self.budget
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn last_tx_lane(&self) -> usize {
        self.last_tx_lane
    }

    pub fn pending_destination(&self) -> Option<NodeId> {
        self.pending_destination
    }

    /// Control call from the layer above: the destination of the next packet
    pub fn set_pending_destination(&mut self, destination: NodeId) {
        self.pending_destination = Some(destination);
    }

    /// Lane decision for `destination`, without touching any packet
    pub fn select_for(&self, destination: NodeId) -> Result<Selection, RoutingError> {
        let route = self
            .routes
            .lookup(destination)
            .ok_or(RoutingError::NoRoute(destination))?;
        Ok(select(self.capability, Some(route.next_hop_protocol), self.tie_break))
    }

    /// Stamp the routing header for `destination` and let the chosen lane frame it.
    ///
    /// On failure the packet is released.
    pub fn set_header(
        &mut self,
        packet: Packet,
        destination: NodeId,
    ) -> Result<Packet, RoutingError> {
        let result = self.try_set_header(packet, destination);
        if result.is_err() {
            self.stats.dropped += 1;
        }
        result
    }

    fn try_set_header(
        &mut self,
        mut packet: Packet,
        destination: NodeId,
    ) -> Result<Packet, RoutingError> {
        let route = match self.routes.lookup(destination) {
            Some(route) => *route,
            None => {
                debug!("Node {} has no route to {}", self.node_id, destination);
                return Err(RoutingError::NoRoute(destination));
            }
        };

        let index = match select(self.capability, Some(route.next_hop_protocol), self.tie_break) {
            Selection::Lane { index, .. } => index,
            Selection::Incompatible => {
                warn!(
                    "Node {} ({}) can not send packet to node {}: next hop needs {}",
                    self.node_id, self.capability, route.next_hop, route.next_hop_protocol
                );
                return Err(RoutingError::Unroutable {
                    node: self.node_id,
                    next_hop: route.next_hop,
                    required: route.next_hop_protocol,
                });
            }
        };

        self.last_tx_lane = index;
        let header = RoutingHeader::new(destination, self.node_id);
        HeaderCodec::place(&mut packet, &mut self.lanes[index], header, route.next_hop)?;
        Ok(packet)
    }

    /// Bytes reserved in front of the payload: link overhead plus routing header.
    ///
    /// A dual node sizes for the lane its pending destination will use; without a
    /// pending destination the tie-break preference decides.
    pub fn header_size(&mut self) -> Result<usize, RoutingError> {
        let index = if self.capability.is_mono() {
            0
        } else {
            let required = match self.pending_destination {
                Some(destination) => Some(
                    self.routes
                        .lookup(destination)
                        .ok_or(RoutingError::NoRoute(destination))?
                        .next_hop_protocol,
                ),
                None => None,
            };
            match select(self.capability, required, self.tie_break) {
                Selection::Lane { index, .. } => index,
                Selection::Incompatible => return Err(RoutingError::NoLaneDecision),
            }
        };

        Ok(HeaderCodec::offset(&mut self.lanes[index]) + RoutingHeader::SIZE)
    }

    /// Send on the lane recorded by the most recent `set_header`
    pub fn transmit(&mut self, packet: Packet) {
        self.stats.originated += 1;
        self.lanes[self.last_tx_lane].transmit(packet);
    }

    /// `set_header` followed by `transmit`
    pub fn send(&mut self, packet: Packet, destination: NodeId) -> Result<(), RoutingError> {
        let packet = self.set_header(packet, destination)?;
        self.transmit(packet);
        Ok(())
    }

    /// Handle a packet arriving from a lane below
    pub fn receive(&mut self, packet: Packet) -> Disposition {
        // Unknown origin tags are dropped without a diagnostic
        let Some(ingress) = self.ingress_lane(&packet) else {
            return self.dropped(DropReason::UnknownOrigin);
        };

        let header = match HeaderCodec::read(&packet, &mut self.lanes[ingress]) {
            Ok(header) => header,
            Err(e) => {
                debug!("Node {} dropping unreadable packet: {}", self.node_id, e);
                return self.dropped(DropReason::Malformed);
            }
        };

        if header.destination != self.node_id {
            return self.forward_from(packet, ingress, header);
        }

        self.deliver(packet)
    }

    /// Relay a packet not addressed to this node towards its destination
    pub fn forward(&mut self, packet: Packet) -> Disposition {
        let Some(ingress) = self.ingress_lane(&packet) else {
            return self.dropped(DropReason::UnknownOrigin);
        };

        match HeaderCodec::read(&packet, &mut self.lanes[ingress]) {
            Ok(header) => self.forward_from(packet, ingress, header),
            Err(e) => {
                debug!("Node {} cannot forward unreadable packet: {}", self.node_id, e);
                self.dropped(DropReason::Malformed)
            }
        }
    }

    fn forward_from(
        &mut self,
        mut packet: Packet,
        ingress: usize,
        header: RoutingHeader,
    ) -> Disposition {
        let route = match self.routes.lookup(header.destination) {
            Some(route) => *route,
            None => {
                debug!(
                    "Node {} has no route to {}, dropping packet from {}",
                    self.node_id, header.destination, header.source
                );
                return self.dropped(DropReason::NoRoute);
            }
        };

        let Some((egress_protocol, egress)) =
            select(self.capability, Some(route.next_hop_protocol), self.tie_break).lane()
        else {
            warn!(
                "Node {} ({}) can not forward packet to node {}: next hop needs {}",
                self.node_id, self.capability, route.next_hop, route.next_hop_protocol
            );
            return self.dropped(DropReason::Incompatible);
        };

        let origin = packet.origin().unwrap_or(self.lanes[ingress].protocol());
        if egress_protocol != origin {
            return self.translate(packet, origin, ingress, egress, route);
        }

        if let Err(e) = HeaderCodec::frame(&mut packet, &mut self.lanes[egress], route.next_hop) {
            debug!("Node {} link refused to forward to {}: {}", self.node_id, route.next_hop, e);
            return self.dropped(DropReason::LinkRejected);
        }

        debug!(
            "Node {} forwarding {} -> {} via {} on {}",
            self.node_id, header.source, header.destination, route.next_hop, egress_protocol
        );
        self.lanes[egress].transmit(packet);
        self.stats.forwarded += 1;
        Disposition::Forwarded {
            next_hop: route.next_hop,
            lane: egress,
        }
    }

    /// Re-frame `packet` for the other protocol and account for the payload size
    /// mismatch with extra size-identical transmissions.
    fn translate(
        &mut self,
        packet: Packet,
        origin: Protocol,
        ingress: usize,
        egress: usize,
        route: Route,
    ) -> Disposition {
        let target = self.lanes[egress].protocol();
        let source_offset = self.lanes[ingress].overhead();
        let target_offset = self.lanes[egress].overhead();
        let source_max = self.budget.max_payload(origin);
        let target_max = self.budget.max_payload(target);

        let size = match translated_size(
            packet.size(),
            source_offset,
            target_offset,
            source_max,
            target_max,
        ) {
            Some(size) if size >= target_offset + RoutingHeader::SIZE => size,
            _ => {
                warn!(
                    "Node {} cannot translate {} byte packet from {} to {}",
                    self.node_id,
                    packet.size(),
                    origin,
                    target
                );
                return self.dropped(DropReason::TranslationUnderflow);
            }
        };

        // Routing header and everything after it move to the target offset
        let mut translated = Packet::new(size, target);
        let carried = (packet.size() - source_offset).min(size - target_offset);
        translated.data_mut()[target_offset..target_offset + carried]
            .copy_from_slice(&packet.data()[source_offset..source_offset + carried]);
        drop(packet);

        if let Err(e) =
            HeaderCodec::frame(&mut translated, &mut self.lanes[egress], route.next_hop)
        {
            debug!(
                "Node {} link refused translated packet for {}: {}",
                self.node_id, route.next_hop, e
            );
            return self.dropped(DropReason::LinkRejected);
        }

        let copies = fragment_count(source_max, target_max);

        debug!(
            "Node {} translating {} -> {} for {}: {} bytes, {} extra transmission(s)",
            self.node_id, origin, target, route.next_hop, size, copies
        );

        // Each copy is cloned right before it is sent; the last send takes the packet itself
        let lane = &mut self.lanes[egress];
        for _ in 0..copies {
            lane.transmit(translated.clone());
        }
        lane.transmit(translated);

        self.stats.translated += 1;
        self.stats.fragment_copies += copies as u64;
        Disposition::Translated {
            next_hop: route.next_hop,
            from: origin,
            to: target,
            size,
            transmissions: copies + 1,
        }
    }

    /// Hand the packet to every consumer: copies to all but the last, which gets the original
    fn deliver(&mut self, packet: Packet) -> Disposition {
        let consumers = self.upper.len();
        if let Some((last, rest)) = self.upper.split_last_mut() {
            for consumer in rest {
                consumer.receive(packet.clone());
            }
            last.receive(packet);
        }

        self.stats.delivered += consumers as u64;
        Disposition::Delivered { consumers }
    }

    /// Lane whose overhead applies to an arriving packet
    fn ingress_lane(&self, packet: &Packet) -> Option<usize> {
        if self.capability.is_mono() {
            return Some(0);
        }
        packet.origin().and_then(|p| self.capability.lane_for(p))
    }

    fn dropped(&mut self, reason: DropReason) -> Disposition {
        self.stats.dropped += 1;
        Disposition::Dropped { reason }
    }
}

impl fmt::Debug for ForwardingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingEngine")
            .field("node_id", &self.node_id)
            .field("capability", &self.capability)
            .field("tie_break", &self.tie_break)
            .field("routes", &self.routes.len())
            .field("lanes", &self.lanes)
            .field("upper", &self.upper.len())
            .field("pending_destination", &self.pending_destination)
            .field("last_tx_lane", &self.last_tx_lane)
            .finish()
    }
}

impl Drop for ForwardingEngine {
    fn drop(&mut self) {
        debug!(
            "Node {} routing torn down ({} routes released)",
            self.node_id,
            self.routes.len()
        );
    }
}
