// Integration tests for the forwarding engine
//
// Tests header placement, lane selection, cross-protocol translation and upward
// delivery through the public API, with recording link stacks below each node.

use dualroute_core::{
    Capability, Disposition, ForwardingEngine, LinkBudget, LinkError, LinkLayer, NodeId,
    NodeParams, Packet, Protocol, RouteSource, RoutingError, RoutingHeader, RoutingModel,
    TieBreak, UpperLayer,
};
use parking_lot::Mutex;
use std::sync::Arc;

const WIFI_OVERHEAD: usize = 24;
const ZIGBEE_OVERHEAD: usize = 11;

type Log = Arc<Mutex<Vec<Packet>>>;

/// Link stack that writes the next hop into its header and records every transmission
struct TestLink {
    overhead: usize,
    sent: Log,
}

impl LinkLayer for TestLink {
    fn header_size(&self) -> usize {
        self.overhead
    }

    fn set_header(&mut self, packet: &mut Packet, next_hop: NodeId) -> Result<(), LinkError> {
        if packet.size() < 4 {
            return Err(LinkError::BufferTooShort {
                need: 4,
                got: packet.size(),
            });
        }
        packet.data_mut()[..4].copy_from_slice(&next_hop.to_le_bytes());
        Ok(())
    }

    fn transmit(&mut self, packet: Packet) {
        self.sent.lock().push(packet);
    }
}

struct Consumer {
    received: Log,
}

impl UpperLayer for Consumer {
    fn receive(&mut self, packet: Packet) {
        self.received.lock().push(packet);
    }
}

fn link(protocol: Protocol) -> (Box<dyn LinkLayer>, Log) {
    let sent: Log = Arc::new(Mutex::new(Vec::new()));
    let overhead = match protocol {
        Protocol::Wifi => WIFI_OVERHEAD,
        Protocol::Zigbee => ZIGBEE_OVERHEAD,
    };
    (
        Box::new(TestLink {
            overhead,
            sent: Arc::clone(&sent),
        }),
        sent,
    )
}

/// Node plus the transmission logs of its lanes, in lane order
struct TestNode {
    engine: ForwardingEngine,
    lanes: Vec<Log>,
}

fn node(model: &RoutingModel, id: NodeId, capability: Capability, tie_break: TieBreak) -> TestNode {
    let mut links = Vec::new();
    let mut lanes = Vec::new();
    for protocol in capability.lane_protocols() {
        let (l, log) = link(*protocol);
        links.push(l);
        lanes.push(log);
    }
    let engine = model
        .build_node(id, NodeParams::new(capability, tie_break), links)
        .expect("node bring-up");
    TestNode { engine, lanes }
}

fn model(routes: &str, wifi_max: usize, zigbee_max: usize) -> RoutingModel {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    RoutingModel::new(
        LinkBudget::new(wifi_max, zigbee_max).unwrap(),
        RouteSource::parse(routes).unwrap(),
    )
    .unwrap()
}

/// Packet as it would arrive over `origin`, addressed `source -> destination`
fn arriving(size: usize, origin: Protocol, destination: NodeId, source: NodeId) -> Packet {
    let offset = match origin {
        Protocol::Wifi => WIFI_OVERHEAD,
        Protocol::Zigbee => ZIGBEE_OVERHEAD,
    };
    let mut packet = Packet::new(size, origin);
    RoutingHeader::new(destination, source)
        .write_at(packet.data_mut(), offset)
        .unwrap();
    packet
}

#[test]
fn test_mono_wifi_set_header_stamps_at_lane_offset() {
    let model = model("1 5 2 1\n1 6 3 1\n", 1000, 1000);
    let mut n = node(&model, 1, Capability::WifiOnly, TieBreak::None);

    for destination in [5, 6] {
        let packet = n.engine.set_header(Packet::new(64, Protocol::Wifi), destination).unwrap();
        let header = RoutingHeader::read_at(packet.data(), WIFI_OVERHEAD).unwrap();
        assert_eq!(header, RoutingHeader::new(destination, 1));
        assert_eq!(n.engine.last_tx_lane(), 0);
    }
}

#[test]
fn test_mono_zigbee_sends_on_lane_zero() {
    let model = model("1 5 2 2\n", 1000, 1000);
    let mut n = node(&model, 1, Capability::ZigbeeOnly, TieBreak::FavorWifi);

    n.engine.send(Packet::new(64, Protocol::Zigbee), 5).unwrap();

    assert_eq!(n.engine.last_tx_lane(), 0);
    let sent = n.lanes[0].lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        RoutingHeader::read_at(sent[0].data(), ZIGBEE_OVERHEAD).unwrap(),
        RoutingHeader::new(5, 1)
    );
}

#[test]
fn test_mono_wifi_to_zigbee_route_is_unroutable() {
    let model = model("1 5 2 2\n", 1000, 1000);
    let mut n = node(&model, 1, Capability::WifiOnly, TieBreak::FavorWifi);

    let err = n.engine.send(Packet::new(64, Protocol::Wifi), 5).unwrap_err();
    assert_eq!(
        err,
        RoutingError::Unroutable {
            node: 1,
            next_hop: 2,
            required: Protocol::Zigbee
        }
    );
    assert!(n.lanes[0].lock().is_empty());
    assert_eq!(n.engine.stats().dropped, 1);
}

#[test]
fn test_dual_node_lane_per_route_protocol() {
    let model = model("1 5 2 1\n1 6 3 2\n", 1000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::None);

    n.engine.send(Packet::new(64, Protocol::Wifi), 5).unwrap();
    assert_eq!(n.engine.last_tx_lane(), 0);
    n.engine.send(Packet::new(64, Protocol::Wifi), 6).unwrap();
    assert_eq!(n.engine.last_tx_lane(), 1);

    assert_eq!(n.lanes[0].lock().len(), 1);
    let zigbee = n.lanes[1].lock();
    assert_eq!(zigbee.len(), 1);
    assert_eq!(zigbee[0].origin(), Some(Protocol::Zigbee));
    assert_eq!(&zigbee[0].data()[..4], &3u32.to_le_bytes());
}

#[test]
fn test_header_size_is_idempotent() {
    let model = model("1 5 2 2\n1 6 3 1\n", 1000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    n.engine.set_pending_destination(5);
    let first = n.engine.header_size().unwrap();
    for _ in 0..5 {
        assert_eq!(n.engine.header_size().unwrap(), first);
    }
    assert_eq!(first, ZIGBEE_OVERHEAD + RoutingHeader::SIZE);
    assert_eq!(n.engine.routes().len(), 2);

    let mut mono = node(&model, 2, Capability::WifiOnly, TieBreak::None);
    assert_eq!(mono.engine.header_size().unwrap(), WIFI_OVERHEAD + RoutingHeader::SIZE);
}

#[test]
fn test_header_size_then_send_fits_exactly() {
    let model = model("1 5 2 2\n", 1000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    n.engine.set_pending_destination(5);
    let reserved = n.engine.header_size().unwrap();
    let payload = b"hello";
    let mut packet = Packet::new(reserved + payload.len(), Protocol::Wifi);
    packet.data_mut()[reserved..].copy_from_slice(payload);

    n.engine.send(packet, 5).unwrap();
    let sent = n.lanes[1].lock();
    assert_eq!(&sent[0].data()[reserved..], payload);
}

#[test]
fn test_route_lookups_stable() {
    let model = model("1 5 2 2\n", 1000, 1000);
    let n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    let first = *n.engine.routes().lookup(5).unwrap();
    for _ in 0..10 {
        assert_eq!(*n.engine.routes().lookup(5).unwrap(), first);
        assert_eq!(n.engine.select_for(5).unwrap().lane(), Some((Protocol::Zigbee, 1)));
    }
}

#[test]
fn test_multi_consumer_delivery() {
    let model = model("", 1000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    let logs: Vec<Log> = (0..4).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
    for log in &logs {
        n.engine.bind_upper(Box::new(Consumer {
            received: Arc::clone(log),
        }));
    }

    let mut packet = arriving(48, Protocol::Wifi, 1, 9);
    packet.data_mut()[40] = 0x5A;
    assert_eq!(n.engine.receive(packet), Disposition::Delivered { consumers: 4 });

    for log in &logs {
        let received = log.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].data()[40], 0x5A);
    }
}

#[test]
fn test_delivery_without_consumers() {
    let model = model("", 1000, 1000);
    let mut n = node(&model, 1, Capability::WifiOnly, TieBreak::FavorWifi);
    assert_eq!(
        n.engine.receive(arriving(48, Protocol::Wifi, 1, 9)),
        Disposition::Delivered { consumers: 0 }
    );
}

#[test]
fn test_translation_size_law() {
    let model = model("1 5 2 2\n1 6 3 1\n", 4000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    // Wifi -> Zigbee
    let size = 4200;
    n.engine.receive(arriving(size, Protocol::Wifi, 5, 9));
    let expected = size + ZIGBEE_OVERHEAD - WIFI_OVERHEAD + 1000 - 4000;
    assert!(n.lanes[1].lock().iter().all(|p| p.size() == expected));

    // Zigbee -> Wifi
    let size = 300;
    n.engine.receive(arriving(size, Protocol::Zigbee, 6, 9));
    let expected = size + WIFI_OVERHEAD - ZIGBEE_OVERHEAD + 4000 - 1000;
    let wifi = n.lanes[0].lock();
    assert_eq!(wifi.len(), 1);
    assert_eq!(wifi[0].size(), expected);
    assert_eq!(wifi[0].origin(), Some(Protocol::Wifi));
}

#[test]
fn test_fragment_count_4000_to_1000() {
    let model = model("1 5 2 2\n", 4000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    let disposition = n.engine.receive(arriving(4100, Protocol::Wifi, 5, 9));
    assert!(matches!(disposition, Disposition::Translated { transmissions: 4, .. }));
    assert_eq!(n.lanes[1].lock().len(), 4);
    assert_eq!(n.engine.stats().fragment_copies, 3);
}

#[test]
fn test_fragment_count_exact_multiple_3000_to_1000() {
    let model = model("1 5 2 2\n", 3000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    n.engine.receive(arriving(3100, Protocol::Wifi, 5, 9));
    let sent = n.lanes[1].lock();
    assert_eq!(sent.len(), 3);
    assert!(sent.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_translated_packet_keeps_source_and_payload() {
    let model = model("1 5 2 1\n", 1500, 100);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    let mut packet = arriving(60, Protocol::Zigbee, 5, 9);
    let payload_start = ZIGBEE_OVERHEAD + RoutingHeader::SIZE;
    for (i, b) in packet.data_mut()[payload_start..].iter_mut().enumerate() {
        *b = i as u8;
    }

    n.engine.receive(packet);

    let sent = n.lanes[0].lock();
    let translated = &sent[0];
    assert_eq!(
        RoutingHeader::read_at(translated.data(), WIFI_OVERHEAD).unwrap(),
        RoutingHeader::new(5, 9)
    );
    let moved = &translated.data()[WIFI_OVERHEAD + RoutingHeader::SIZE..];
    for i in 0..(60 - payload_start) {
        assert_eq!(moved[i], i as u8);
    }
    assert_eq!(&translated.data()[..4], &2u32.to_le_bytes());
}

#[test]
fn test_same_protocol_forward_sends_once() {
    let model = model("1 5 2 2\n", 4000, 1000);
    let mut n = node(&model, 1, Capability::Dual, TieBreak::FavorWifi);

    let disposition = n.engine.receive(arriving(200, Protocol::Zigbee, 5, 9));
    assert_eq!(disposition, Disposition::Forwarded { next_hop: 2, lane: 1 });
    assert_eq!(n.lanes[1].lock().len(), 1);
    assert_eq!(n.lanes[1].lock()[0].size(), 200);
    assert_eq!(n.engine.stats().forwarded, 1);
}

/// Wifi-only source → dual gateway → Zigbee-only sink, wired by hand
#[test]
fn test_three_hop_path_across_protocols() {
    let routes = "\
1 3 2 1
2 3 3 2
";
    let model = model(routes, 1000, 100);
    let mut source = node(&model, 1, Capability::WifiOnly, TieBreak::None);
    let mut gateway = node(&model, 2, Capability::Dual, TieBreak::FavorWifi);
    let mut sink = node(&model, 3, Capability::ZigbeeOnly, TieBreak::None);

    let delivered: Log = Arc::new(Mutex::new(Vec::new()));
    sink.engine.bind_upper(Box::new(Consumer {
        received: Arc::clone(&delivered),
    }));

    source.engine.set_pending_destination(3);
    let reserved = source.engine.header_size().unwrap();
    source.engine.send(Packet::new(reserved + 950, Protocol::Wifi), 3).unwrap();

    let frame = source.lanes[0].lock().pop().unwrap();
    let disposition = gateway.engine.receive(frame);
    assert!(matches!(
        disposition,
        Disposition::Translated {
            from: Protocol::Wifi,
            to: Protocol::Zigbee,
            transmissions: 10,
            ..
        }
    ));

    let frames: Vec<Packet> = gateway.lanes[1].lock().drain(..).collect();
    assert_eq!(frames.len(), 10);
    for frame in frames {
        assert_eq!(sink.engine.receive(frame), Disposition::Delivered { consumers: 1 });
    }

    let received = delivered.lock();
    assert_eq!(received.len(), 10);
    assert_eq!(
        RoutingHeader::read_at(received[0].data(), ZIGBEE_OVERHEAD).unwrap(),
        RoutingHeader::new(3, 1)
    );
}
