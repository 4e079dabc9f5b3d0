//! End-to-end scenarios against the client state machine, driven through a
//! fully in-memory [`common::MockTransport`] — no real socket involved.
//! Wire bytes mirror the literal boundary scenarios from the
//! specification this crate implements.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{record_into, MockTransport, Recorded};
use mqtt_core::client::ConnectStatus;
use mqtt_core::{Client, ClientInfo, OpResult, QoS};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn connect_handshake_matches_boundary_scenario() {
    let mut tx_buf = [0u8; 128];
    let mut rx_buf = [0u8; 128];
    let events = Rc::new(RefCell::new(Vec::new()));
    let transport = MockTransport::new();

    let mut client = Client::<_, _, u32, 4>::new(transport.clone(), &mut tx_buf, &mut rx_buf, 0);
    let info = ClientInfo {
        client_id: "c",
        username: None,
        password: None,
        will: None,
        keep_alive_secs: 60,
    };

    client.connect("broker.example", 1883, record_into(&events), &info).unwrap();
    assert_eq!(transport.start_calls.borrow().as_slice(), &[("broker.example".to_string(), 1883)]);

    client.on_connected().unwrap();
    assert_eq!(
        hex(&transport.drain_sent()),
        hex(&[0x10, 0x0D, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x3C, 0x00, 0x01, b'c'])
    );

    // Broker accepts: CONNACK, session-present=0, return code 0.
    client.on_recv(&[0x20, 0x02, 0x00, 0x00]).unwrap();

    assert_eq!(events.borrow().as_slice(), &[Recorded::Connect { status: ConnectStatus::Accepted }]);
    assert!(client.is_connected());
}

fn connected_client() -> (Client<'static, MockTransport, impl FnMut(mqtt_core::Event<'_, u32>), u32, 4>, MockTransport, Rc<RefCell<Vec<Recorded>>>) {
    let tx_buf: &'static mut [u8] = Box::leak(Box::new([0u8; 256]));
    let rx_buf: &'static mut [u8] = Box::leak(Box::new([0u8; 256]));
    let info: &'static ClientInfo<'static> = Box::leak(Box::new(ClientInfo {
        client_id: "c",
        username: None,
        password: None,
        will: None,
        keep_alive_secs: 0,
    }));

    let events = Rc::new(RefCell::new(Vec::new()));
    let transport = MockTransport::new();
    let mut client = Client::<_, _, u32, 4>::new(transport.clone(), tx_buf, rx_buf, 0);

    client.connect("broker.example", 1883, record_into(&events), info).unwrap();
    client.on_connected().unwrap();
    let connect_len = transport.drain_sent().len();
    client.on_sent(connect_len, true).unwrap();
    client.on_recv(&[0x20, 0x02, 0x00, 0x00]).unwrap();
    events.borrow_mut().clear();

    (client, transport, events)
}

#[test]
fn publish_qos0_confirms_on_sent_total() {
    let (mut client, transport, events) = connected_client();

    client.publish("a/b", b"hi", 0, false, 42).unwrap();
    let sent = transport.drain_sent();
    assert_eq!(hex(&sent), hex(&[0x30, 0x07, 0x00, 0x03, b'a', b'/', b'b', b'h', b'i']));
    assert!(events.borrow().is_empty(), "QoS 0 publish must not complete before on_sent");

    client.on_sent(sent.len(), true).unwrap();
    assert_eq!(events.borrow().as_slice(), &[Recorded::Publish { arg: 42, result: OpResult::Success }]);
}

#[test]
fn publish_qos1_confirms_on_puback() {
    let (mut client, transport, events) = connected_client();

    client.publish("t", b"x", 1, false, 7).unwrap();
    let sent = transport.drain_sent();
    assert_eq!(hex(&sent), hex(&[0x32, 0x06, 0x00, 0x01, b't', 0x00, 0x01, b'x']));

    client.on_sent(sent.len(), true).unwrap();
    assert!(events.borrow().is_empty(), "QoS 1 publish must wait for PUBACK");

    client.on_recv(&[0x40, 0x02, 0x00, 0x01]).unwrap();
    assert_eq!(events.borrow().as_slice(), &[Recorded::Publish { arg: 7, result: OpResult::Success }]);
}

#[test]
fn inbound_publish_qos1_triggers_puback_and_delivers_event() {
    let (mut client, transport, events) = connected_client();

    // Broker -> client PUBLISH, topic "t", packet id 1, payload "x", QoS 1.
    client.on_recv(&[0x32, 0x06, 0x00, 0x01, b't', 0x00, 0x01, b'x']).unwrap();

    assert_eq!(
        events.borrow().as_slice(),
        &[Recorded::PublishRecv { topic: "t".to_string(), payload: b"x".to_vec(), qos: QoS::AtLeastOnce, dup: false }]
    );

    let sent = transport.drain_sent();
    assert_eq!(hex(&sent), hex(&[0x40, 0x02, 0x00, 0x01]), "must auto-ack with PUBACK");
}

#[test]
fn inbound_publish_byte_at_a_time_matches_one_shot() {
    let (mut client_one, _t1, events_one) = connected_client();
    client_one.on_recv(&[0x32, 0x06, 0x00, 0x01, b't', 0x00, 0x01, b'x']).unwrap();

    let (mut client_frag, _t2, events_frag) = connected_client();
    for byte in [0x32u8, 0x06, 0x00, 0x01, b't', 0x00, 0x01, b'x'] {
        client_frag.on_recv(&[byte]).unwrap();
    }

    assert_eq!(events_one.borrow().as_slice(), events_frag.borrow().as_slice());
}

#[test]
fn disconnect_drains_exactly_pending_requests_plus_one_disconnect_event() {
    let (mut client, _transport, events) = connected_client();

    client.subscribe("a/#", QoS::AtLeastOnce, 1).unwrap();
    client.subscribe("b/#", QoS::AtLeastOnce, 2).unwrap();
    client.publish("c", b"y", 1, false, 3).unwrap();
    events.borrow_mut().clear();

    client.on_close(true);

    let recorded = events.borrow();
    assert_eq!(recorded.len(), 4, "3 failed in-flight requests + 1 Disconnect event");

    // `spec.md` §8 boundary scenario 6: the failure events for the pending
    // requests come first, the Disconnect event last.
    assert_eq!(recorded[3], Recorded::Disconnect { is_accepted: true });

    let failures = &recorded[..3];
    assert_eq!(failures.iter().filter(|e| matches!(e, Recorded::Subscribe { result: OpResult::Failure, .. })).count(), 2);
    assert_eq!(failures.iter().filter(|e| matches!(e, Recorded::Publish { result: OpResult::Failure, .. })).count(), 1);

    assert!(!client.is_connected());
}

#[test]
fn keep_alive_sends_pingreq_after_idle_threshold_and_resets_poll_time() {
    let mut tx_buf = [0u8; 128];
    let mut rx_buf = [0u8; 128];
    let events = Rc::new(RefCell::new(Vec::new()));
    let transport = MockTransport::new();

    let mut client = Client::<_, _, u32, 4>::new(transport.clone(), &mut tx_buf, &mut rx_buf, 0);
    let info = ClientInfo {
        client_id: "c",
        username: None,
        password: None,
        will: None,
        keep_alive_secs: 1,
    };

    client.connect("broker.example", 1883, record_into(&events), &info).unwrap();
    client.on_connected().unwrap();
    let connect_len = transport.drain_sent().len();
    client.on_sent(connect_len, true).unwrap();
    client.on_recv(&[0x20, 0x02, 0x00, 0x00]).unwrap();
    events.borrow_mut().clear();

    // keep_alive_secs=1 -> 1000ms; POLL_INTERVAL_MS=500, so the second poll
    // tick (poll_time=2, 1000ms) is the first to clear the threshold, since
    // no other transport activity has reset poll_time in between.
    client.on_poll().unwrap();
    assert!(transport.drain_sent().is_empty(), "no PINGREQ before the threshold");
    client.on_poll().unwrap();
    assert_eq!(hex(&transport.drain_sent()), hex(&[0xC0, 0x00]), "PINGREQ once the threshold is reached");

    // poll_time was reset to 0 by sending the PINGREQ, so the next two
    // ticks must not immediately re-send.
    client.on_poll().unwrap();
    client.on_poll().unwrap();
    assert!(transport.drain_sent().is_empty(), "poll_time was reset after the PINGREQ");

    client.on_recv(&[0xD0, 0x00]).unwrap(); // PINGRESP
    assert_eq!(events.borrow().as_slice(), &[Recorded::KeepAlive]);
}

#[test]
fn keep_alive_disabled_never_sends_pingreq() {
    let (mut client, transport, _events) = connected_client();
    for _ in 0..100 {
        client.on_poll().unwrap();
    }
    assert!(transport.drain_sent().is_empty());
}

/// Forces a request-table slot reuse where a later-created QoS-0 publish
/// ends up in a lower slot index than an earlier-created one still pending,
/// then confirms both in a single `on_sent` call. Completion must still be
/// delivered in creation order (by ascending `expected_sent_len`), not slot
/// order.
#[test]
fn qos0_publishes_complete_in_creation_order_despite_slot_reuse() {
    let (mut client, transport, events) = connected_client();

    // Occupies slot 0 and is left pending (no SUBACK yet), so the next
    // publish is pushed into slot 1.
    client.subscribe("d", QoS::AtLeastOnce, 999).unwrap();
    let sub_len = transport.drain_sent().len();
    client.on_sent(sub_len, true).unwrap();

    // Publish "A" (arg 1): created first, lands in slot 1 since slot 0 is
    // still occupied by the pending subscribe. Flushes immediately.
    client.publish("a", b"A", 0, false, 1).unwrap();
    let a_len = transport.drain_sent().len();

    // Frees slot 0.
    client.on_recv(&[0x90, 0x03, 0x00, 0x01, 0x00]).unwrap(); // SUBACK id=1, code 0
    events.borrow_mut().clear();

    // Publish "B" (arg 2): created second, but slot 0 is now free and lower
    // than "A"'s slot 1 — the bug this guards against would deliver "B"'s
    // completion first because it scanned slots in ascending index order.
    client.publish("b", b"B", 0, false, 2).unwrap();
    let b_len = a_len; // identical topic/payload lengths to "A"'s packet.

    // A single confirmation covering both outstanding QoS-0 publishes at
    // once (e.g. a transport that coalesces writes into one completion).
    client.on_sent(a_len + b_len, true).unwrap();

    assert_eq!(
        events.borrow().as_slice(),
        &[
            Recorded::Publish { arg: 1, result: OpResult::Success },
            Recorded::Publish { arg: 2, result: OpResult::Success },
        ],
        "earlier-issued QoS-0 publish must complete before the later one"
    );
}
