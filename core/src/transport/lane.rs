// Lanes — a node's egress/ingress paths, one per bound link stack

use super::abstraction::{LinkError, LinkLayer, Protocol};
use super::packet::Packet;
use crate::NodeId;
use std::fmt;

/// One egress/ingress path bound to exactly one protocol and one link stack
pub struct Lane {
    protocol: Protocol,
    index: usize,
    /// Lower-layer header size; Unknown until first queried, then fixed
    overhead: Option<usize>,
    link: Box<dyn LinkLayer>,
}

impl Lane {
    pub fn new(protocol: Protocol, index: usize, link: Box<dyn LinkLayer>) -> Self {
        Self {
            protocol,
            index,
            overhead: None,
            link,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Cached overhead, if it has been resolved
    pub fn cached_overhead(&self) -> Option<usize> {
        self.overhead
    }

    /// Lower-layer overhead, asking the link stack only the first time
    pub fn overhead(&mut self) -> usize {
        match self.overhead {
            Some(bytes) => bytes,
            None => {
                let bytes = self.link.header_size();
                self.overhead = Some(bytes);
                bytes
            }
        }
    }

    pub fn set_link_header(
        &mut self,
        packet: &mut Packet,
        next_hop: NodeId,
    ) -> Result<(), LinkError> {
        self.link.set_header(packet, next_hop)
    }

    pub fn transmit(&mut self, packet: Packet) {
        self.link.transmit(packet);
    }
}

impl fmt::Debug for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lane")
            .field("protocol", &self.protocol)
            .field("index", &self.index)
            .field("overhead", &self.overhead)
            .finish_non_exhaustive()
    }
}
