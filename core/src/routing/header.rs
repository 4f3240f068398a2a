/// Routing header codec — placement at lane-specific byte offsets

use super::RoutingError;
use crate::transport::{Lane, Packet};
use crate::NodeId;

/// Fixed routing header written right after the lane's link header
///
/// Format (8 bytes):
/// [4 bytes] destination (LE u32)
/// [4 bytes] source (LE u32)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingHeader {
    pub destination: NodeId,
    pub source: NodeId,
}

impl RoutingHeader {
    pub const SIZE: usize = 8;

    pub fn new(destination: NodeId, source: NodeId) -> Self {
        Self { destination, source }
    }

    /// Write the header into `buf` starting at `offset`
    pub fn write_at(&self, buf: &mut [u8], offset: usize) -> Result<(), RoutingError> {
        let end = offset + Self::SIZE;
        if buf.len() < end {
            return Err(RoutingError::BufferTooShort {
                need: end,
                got: buf.len(),
            });
        }

        buf[offset..offset + 4].copy_from_slice(&self.destination.to_le_bytes());
        buf[offset + 4..end].copy_from_slice(&self.source.to_le_bytes());
        Ok(())
    }

    /// Read the header found in `buf` at `offset`
    pub fn read_at(buf: &[u8], offset: usize) -> Result<Self, RoutingError> {
        let end = offset + Self::SIZE;
        if buf.len() < end {
            return Err(RoutingError::BufferTooShort {
                need: end,
                got: buf.len(),
            });
        }

        let field = |at: usize| [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]];
        let destination = NodeId::from_le_bytes(field(offset));
        let source = NodeId::from_le_bytes(field(offset + 4));
        Ok(Self { destination, source })
    }
}

/// Places and reads the routing header relative to a lane's link overhead
pub struct HeaderCodec;

impl HeaderCodec {
    /// Byte offset of the routing header on this lane
    pub fn offset(lane: &mut Lane) -> usize {
        lane.overhead()
    }

    /// Stamp `header` at the lane offset, then let the lane's link frame the packet
    /// towards `next_hop`. The packet's origin tag becomes the lane protocol.
    pub fn place(
        packet: &mut Packet,
        lane: &mut Lane,
        header: RoutingHeader,
        next_hop: NodeId,
    ) -> Result<(), RoutingError> {
        let offset = Self::offset(lane);
        header.write_at(packet.data_mut(), offset)?;
        Self::frame(packet, lane, next_hop)
    }

    /// Link framing only; the routing header already in the packet is left untouched
    pub fn frame(
        packet: &mut Packet,
        lane: &mut Lane,
        next_hop: NodeId,
    ) -> Result<(), RoutingError> {
        packet.set_origin(lane.protocol());
        lane.set_link_header(packet, next_hop)?;
        Ok(())
    }

    pub fn read(packet: &Packet, lane: &mut Lane) -> Result<RoutingHeader, RoutingError> {
        let offset = Self::offset(lane);
        RoutingHeader::read_at(packet.data(), offset)
    }
}
