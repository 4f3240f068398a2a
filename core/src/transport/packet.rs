// Packet buffer with origin tag
//
// Allocation is construction, cloning is `Clone`, release is drop.

use super::abstraction::Protocol;

/// Opaque byte buffer plus the tag of the protocol that last framed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    data: Vec<u8>,
    origin: u8,
}

impl Packet {
    /// Allocate a zero-filled packet of `size` bytes framed by `origin`
    pub fn new(size: usize, origin: Protocol) -> Self {
        Self {
            data: vec![0u8; size],
            origin: origin.origin_tag(),
        }
    }

    /// Wrap an existing buffer with a raw origin tag as handed over by the host
    pub fn from_raw(data: Vec<u8>, origin: u8) -> Self {
        Self { data, origin }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Protocol that most recently framed this packet, if the tag is known
    pub fn origin(&self) -> Option<Protocol> {
        Protocol::from_origin_tag(self.origin)
    }

    pub fn raw_origin(&self) -> u8 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Protocol) {
        self.origin = origin.origin_tag();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_packet_is_zeroed() {
        let packet = Packet::new(16, Protocol::Zigbee);
        assert_eq!(packet.size(), 16);
        assert!(packet.data().iter().all(|b| *b == 0));
        assert_eq!(packet.origin(), Some(Protocol::Zigbee));
    }

    #[test]
    fn test_unknown_origin_tag() {
        let packet = Packet::from_raw(vec![1, 2, 3], 9);
        assert_eq!(packet.origin(), None);
        assert_eq!(packet.raw_origin(), 9);
    }

    #[test]
    fn test_set_origin() {
        let mut packet = Packet::new(4, Protocol::Wifi);
        packet.set_origin(Protocol::Zigbee);
        assert_eq!(packet.raw_origin(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = Packet::new(4, Protocol::Wifi);
        let copy = original.clone();
        original.data_mut()[0] = 0xAA;
        assert_eq!(copy.data()[0], 0);
    }
}
