//! The client state machine (`spec.md` §4.5): connection lifecycle,
//! keep-alive timer, dispatch of parsed packets to the application, and the
//! response handshake for inbound publishes.

mod error;
pub mod transport;

pub use self::error::{Error, Result};
pub use self::transport::Transport;

use crate::log;
use crate::protocol::encode::{self, Will};
use crate::protocol::parse::Parser;
use crate::protocol::qos::QoS;
use crate::protocol::{Cursor, PacketType};
use crate::request::{RequestKind, RequestTable};
use crate::ring::RingBuffer;

/// How often the embedding application is expected to call
/// [`Client::on_poll`]. Keep-alive scheduling is expressed in units of this
/// tick, per `spec.md` §4.5 ("`poll_time * POLL_INTERVAL_MS`").
pub const POLL_INTERVAL_MS: u32 = 500;

/// Connection parameters borrowed for the lifetime of a connection
/// (`spec.md` §3). The caller guarantees this reference outlives the
/// `connect()` call it is passed to.
pub struct ClientInfo<'a> {
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    pub will: Option<Will<'a>>,
    /// Seconds between PINGREQs when otherwise idle. 0 disables keep-alive.
    pub keep_alive_secs: u16,
}

/// Connection lifecycle state.
///
/// The source reuses a single `CONNECTING` label for both "TCP dialing" and
/// "TCP up, CONNECT sent, awaiting CONNACK" (`spec.md` §3). This splits them
/// into `Connecting` and `HandshakingConnAck`, per the REDESIGN FLAG in §9 —
/// the set of transitions and events fired is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    HandshakingConnAck,
    Connected,
    Disconnecting,
}

/// The outcome reported in a [`Event::Connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    Accepted,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    BadUsernameOrPassword,
    NotAuthorized,
    /// The CONNACK return code was not one of the five defined by MQTT
    /// 3.1.1 (`spec.md` §9, "Open question — CONNACK result mapping").
    ProtocolError,
    /// The transport failed before a CONNACK was ever received.
    TcpFailed,
}

impl ConnectStatus {
    fn from_connack_code(code: u8) -> Self {
        match code {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUsernameOrPassword,
            5 => Self::NotAuthorized,
            _ => Self::ProtocolError,
        }
    }
}

/// The result of a SUBSCRIBE / UNSUBSCRIBE / PUBLISH request, delivered
/// either from the matching acknowledgement or synthesized on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpResult {
    Success,
    Failure,
}

/// Events delivered to the application (`spec.md` §6).
#[derive(Debug)]
pub enum Event<'a, A> {
    Connect { status: ConnectStatus },
    /// `is_accepted` is true iff the previous state was `Connected` *or*
    /// `Disconnecting` — which means an abruptly torn down live session is
    /// still reported as "accepted" (`spec.md` §9, documented intentionally,
    /// not a naming bug).
    Disconnect { is_accepted: bool },
    PublishRecv { topic: &'a str, payload: &'a [u8], qos: QoS, dup: bool },
    Publish { arg: A, result: OpResult },
    Subscribe { arg: A, result: OpResult },
    Unsubscribe { arg: A, result: OpResult },
    KeepAlive,
}

/// The application's event sink.
///
/// Events are delivered synchronously, inline, from whichever call
/// triggered them (`spec.md` §5: callbacks run "under lock"). Implementors
/// must not block and must not call back into the [`Client`] that invoked
/// them — reentrance is not supported.
pub trait EventHandler<A> {
    fn handle(&mut self, event: Event<'_, A>);
}

impl<A, F> EventHandler<A> for F
where
    F: FnMut(Event<'_, A>),
{
    fn handle(&mut self, event: Event<'_, A>) {
        self(event)
    }
}

/// The MQTT 3.1.1 client core.
///
/// `REQS` bounds the number of simultaneously in-flight SUBSCRIBE /
/// UNSUBSCRIBE / PUBLISH requests (`spec.md` §4.4). `A` is the caller's
/// opaque per-request argument type, reused for the client-level cookie
/// accessed through [`Client::set_arg`] / [`Client::get_arg`].
pub struct Client<'a, T, H, A, const REQS: usize = 4> {
    transport: T,
    handler: Option<H>,
    tx_ring: RingBuffer<'a>,
    parser: Parser<'a>,
    requests: RequestTable<A, REQS>,

    info: Option<&'a ClientInfo<'a>>,
    state: ConnState,

    packet_id: u16,
    written_total: u32,
    sent_total: u32,
    poll_time: u32,
    is_sending: bool,

    arg: A,
}

impl<'a, T, H, A, const REQS: usize> Client<'a, T, H, A, REQS>
where
    T: Transport,
    H: EventHandler<A>,
    A: Copy,
{
    /// Allocates a client over caller-provided transmit and receive buffers
    /// (`spec.md` §6, `client_new(tx_len, rx_len)`).
    pub fn new(transport: T, tx_buf: &'a mut [u8], rx_buf: &'a mut [u8], arg: A) -> Self {
        Self {
            transport,
            handler: None,
            tx_ring: RingBuffer::new(tx_buf),
            parser: Parser::new(rx_buf),
            requests: RequestTable::new(),
            info: None,
            state: ConnState::Disconnected,
            packet_id: 0,
            written_total: 0,
            sent_total: 0,
            poll_time: 0,
            is_sending: false,
            arg,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnState::Connected
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn set_arg(&mut self, arg: A) {
        self.arg = arg;
    }

    pub fn get_arg(&self) -> A {
        self.arg
    }

    /// Escape hatch to the underlying transport, for drivers that need to
    /// poll it directly (e.g. to read bytes before handing them to
    /// [`Client::on_recv`]).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn next_packet_id(&mut self) -> u16 {
        self.packet_id = if self.packet_id == 0xFFFF { 1 } else { self.packet_id + 1 };
        self.packet_id
    }

    // ---------------------------------------------------------------
    // Outgoing operations (application -> client)
    // ---------------------------------------------------------------

    /// Initiates a connection. `info` must outlive the connection.
    pub fn connect(&mut self, host: &str, port: u16, handler: H, info: &'a ClientInfo<'a>) -> Result<(), T::Error> {
        if self.state != ConnState::Disconnected {
            return Err(Error::NotConnected);
        }
        if !self.transport.is_attached() {
            return Err(Error::Generic);
        }

        self.info = Some(info);
        self.handler = Some(handler);
        self.transport.start(host, port)?;
        self.state = ConnState::Connecting;
        Ok(())
    }

    /// Subscribes to `topic` at the requested QoS. MQTT 3.1.1 fixes the
    /// SUBSCRIBE packet's own framing at QoS 1, independent of the
    /// requested topic QoS (`spec.md` §4.5).
    pub fn subscribe(&mut self, topic: &str, qos: QoS, arg: A) -> Result<(), T::Error> {
        self.start_sub_unsub(topic, Some(qos), RequestKind::Subscribe, arg)
    }

    pub fn unsubscribe(&mut self, topic: &str, arg: A) -> Result<(), T::Error> {
        self.start_sub_unsub(topic, None, RequestKind::Unsubscribe, arg)
    }

    fn start_sub_unsub(&mut self, topic: &str, qos: Option<QoS>, kind: RequestKind, arg: A) -> Result<(), T::Error> {
        if self.state != ConnState::Connected {
            return Err(Error::NotConnected);
        }
        if topic.is_empty() {
            return Err(Error::Generic);
        }

        let packet_id = self.next_packet_id();
        let idx = self.requests.create(packet_id, kind, arg).ok_or(Error::OutOfMemory)?;

        let ok = match qos {
            Some(qos) => encode::encode_subscribe(&mut self.tx_ring, packet_id, topic, qos),
            None => encode::encode_unsubscribe(&mut self.tx_ring, packet_id, topic),
        };
        if !ok {
            self.requests.delete(idx);
            return Err(Error::OutOfMemory);
        }

        self.requests.set_pending(idx, self.transport.now_ms());
        self.flush()?;
        Ok(())
    }

    /// Publishes `payload` to `topic`. For QoS 0 the success event is
    /// deferred until the bytes are confirmed sent (`spec.md` §4.5,
    /// `expected_sent_len`); for QoS > 0 it is deferred until the matching
    /// acknowledgement.
    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: u8, retain: bool, arg: A) -> Result<(), T::Error> {
        if self.state != ConnState::Connected {
            return Err(Error::NotConnected);
        }
        if topic.is_empty() {
            return Err(Error::Generic);
        }

        let qos = QoS::clamp(qos);
        let packet_id = if qos == QoS::AtMostOnce { 0 } else { self.next_packet_id() };
        let idx = self
            .requests
            .create(packet_id, RequestKind::Publish, arg)
            .ok_or(Error::OutOfMemory)?;

        let before = self.written_total;
        let raw_len = match encode::check_memory(&self.tx_ring, publish_rem_len(topic, payload, qos)) {
            Some(len) => len,
            None => {
                self.requests.delete(idx);
                return Err(Error::OutOfMemory);
            }
        };

        let ok = encode::encode_publish(&mut self.tx_ring, topic, payload, qos, retain, false, packet_id);
        debug_assert!(ok, "check_memory already confirmed room");

        if qos == QoS::AtMostOnce {
            if let Some(req) = self.requests.get_mut(idx) {
                req.expected_sent_len = before.wrapping_add(raw_len as u32);
            }
        } else {
            self.requests.set_pending(idx, self.transport.now_ms());
        }

        self.flush()?;
        Ok(())
    }

    /// Requests a non-blocking disconnect.
    pub fn disconnect(&mut self) -> Result<(), T::Error> {
        if matches!(self.state, ConnState::Disconnected | ConnState::Disconnecting) {
            return Ok(());
        }
        self.transport.close()?;
        self.state = ConnState::Disconnecting;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Incoming operations (transport -> client)
    // ---------------------------------------------------------------

    /// The transport's TCP dial completed; sends CONNECT.
    pub fn on_connected(&mut self) -> Result<(), T::Error> {
        let info = self.info.expect("on_connected without a prior connect()");

        self.parser.reset();
        self.poll_time = 0;

        let will = info.will.as_ref();
        encode::encode_connect(
            &mut self.tx_ring,
            info.client_id,
            info.username,
            info.password,
            will,
            info.keep_alive_secs,
        );

        self.state = ConnState::HandshakingConnAck;
        self.flush()?;
        Ok(())
    }

    /// A fragment of bytes arrived from the transport.
    pub fn on_recv(&mut self, fragment: &[u8]) -> Result<(), T::Error> {
        self.poll_time = 0;

        let mut input = fragment;
        while !input.is_empty() {
            let (consumed, dispatch) = self.parser.step(input);
            if let Some(d) = dispatch {
                Self::dispatch_packet(
                    &mut self.state,
                    &mut self.tx_ring,
                    &mut self.requests,
                    &mut self.handler,
                    d.header,
                    d.body,
                );
            }
            input = &input[consumed..];
        }

        self.transport.recved(fragment.len());

        // PUBACK/PUBREC/PUBREL/PUBCOMP encoded during dispatch above are
        // only staged into `tx_ring`; flush once per fragment instead of
        // once per dispatched packet (`spec.md` §4.5: PUBLISH/PUBREC replies
        // must be flushed).
        self.flush()?;
        Ok(())
    }

    /// `n` bytes were confirmed sent (or the send failed, if `ok` is false).
    pub fn on_sent(&mut self, n: usize, ok: bool) -> Result<(), T::Error> {
        self.is_sending = false;
        self.sent_total = self.sent_total.wrapping_add(n as u32);
        self.poll_time = 0;

        if !ok {
            self.transport.close()?;
            return Ok(());
        }

        self.tx_ring.skip(n);

        // `expected_sent_len` is a monotonically increasing watermark (it is
        // stamped from `written_total` at encode time), so the slot with the
        // lowest watermark among the covered ones is always the
        // earliest-issued QoS-0 publish still pending — scanning by slot
        // order instead would deliver completions out of issue order
        // whenever an intervening request recycled a lower-numbered slot.
        loop {
            let earliest = self
                .requests
                .iter()
                .filter(|(_, r)| r.kind == RequestKind::Publish && r.packet_id == 0 && self.sent_total >= r.expected_sent_len)
                .min_by_key(|(_, r)| r.expected_sent_len)
                .map(|(i, r)| (i, r.arg));
            let Some((idx, arg)) = earliest else {
                break;
            };
            self.requests.delete(idx);
            if let Some(handler) = self.handler.as_mut() {
                handler.handle(Event::Publish { arg, result: OpResult::Success });
            }
        }

        self.flush()?;
        Ok(())
    }

    /// A poll tick elapsed. Should be called roughly every
    /// [`POLL_INTERVAL_MS`].
    pub fn on_poll(&mut self) -> Result<(), T::Error> {
        if self.state == ConnState::Disconnecting {
            return Ok(());
        }

        self.poll_time += 1;

        let Some(info) = self.info else { return Ok(()) };
        if info.keep_alive_secs == 0 {
            return Ok(());
        }

        let elapsed_ms = self.poll_time.saturating_mul(POLL_INTERVAL_MS);
        if u64::from(elapsed_ms) >= u64::from(info.keep_alive_secs) * 1000 {
            if encode::check_memory(&self.tx_ring, 0).is_some() {
                encode::encode_pingreq(&mut self.tx_ring);
                self.flush()?;
                self.poll_time = 0;
            }
        }

        Ok(())
    }

    /// The connection closed, cleanly or otherwise.
    ///
    /// Drains every pending request with a failure event *before* delivering
    /// `Event::Disconnect`, matching `spec.md` §8 boundary scenario 6
    /// ("disconnect drains ... three failure events followed by one
    /// DISCONNECT event") — see `DESIGN.md` for the order conflict this
    /// resolves against §4.5's prose.
    pub fn on_close(&mut self, _forced: bool) {
        let prev = self.state;
        self.state = ConnState::Disconnected;

        while let Some((idx, req)) = self.requests.iter().next().map(|(i, r)| (i, *r)) {
            self.requests.delete(idx);
            if let Some(handler) = self.handler.as_mut() {
                let event = match req.kind {
                    RequestKind::Subscribe => Event::Subscribe { arg: req.arg, result: OpResult::Failure },
                    RequestKind::Unsubscribe => Event::Unsubscribe { arg: req.arg, result: OpResult::Failure },
                    RequestKind::Publish => Event::Publish { arg: req.arg, result: OpResult::Failure },
                };
                handler.handle(event);
            }
        }

        let is_accepted = matches!(prev, ConnState::Connected | ConnState::Disconnecting);
        if let Some(handler) = self.handler.as_mut() {
            handler.handle(Event::Disconnect { is_accepted });
        }

        self.requests.clear();
        self.parser.reset();
        self.is_sending = false;
        self.sent_total = 0;
        self.written_total = 0;
        self.tx_ring.reset();
    }

    /// The transport failed to establish a connection before any CONNACK
    /// could be received.
    pub fn on_conn_error(&mut self) {
        self.state = ConnState::Disconnected;
        if let Some(handler) = self.handler.as_mut() {
            handler.handle(Event::Connect { status: ConnectStatus::TcpFailed });
        }
    }

    // ---------------------------------------------------------------
    // Packet dispatch (parser -> state machine)
    // ---------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn dispatch_packet(
        state: &mut ConnState,
        tx_ring: &mut RingBuffer<'_>,
        requests: &mut RequestTable<A, REQS>,
        handler: &mut Option<H>,
        header: u8,
        body: &[u8],
    ) {
        let Some(ty) = PacketType::from_nibble(header >> 4) else {
            log::warn!("unknown packet type nibble {}", header >> 4);
            return;
        };

        match ty {
            PacketType::ConnAck => {
                if *state != ConnState::HandshakingConnAck {
                    log::trace!("CONNACK in unexpected state, ignoring");
                    return;
                }
                let mut cursor = Cursor::new(body);
                let _flags = cursor.read_u8().unwrap_or(0);
                let code = cursor.read_u8().unwrap_or(0xFF);
                let status = ConnectStatus::from_connack_code(code);
                if status == ConnectStatus::Accepted {
                    *state = ConnState::Connected;
                }
                if let Some(handler) = handler.as_mut() {
                    handler.handle(Event::Connect { status });
                }
            }
            PacketType::Publish => {
                let dup = header & 0b1000 != 0;
                let qos = QoS::clamp((header >> 1) & 0b11);
                let retain = header & 0b0001 != 0;

                let mut cursor = Cursor::new(body);
                let Ok(topic) = cursor.read_str() else {
                    log::warn!("malformed PUBLISH topic");
                    return;
                };
                let packet_id = if qos != QoS::AtMostOnce {
                    match cursor.read_u16() {
                        Ok(id) => id,
                        Err(_) => {
                            log::warn!("malformed PUBLISH packet id");
                            return;
                        }
                    }
                } else {
                    0
                };
                let payload = cursor.read_rest();

                if qos == QoS::AtLeastOnce {
                    encode::encode_ack(tx_ring, 4, packet_id); // PUBACK
                } else if qos == QoS::ExactlyOnce {
                    encode::encode_ack(tx_ring, 5, packet_id); // PUBREC
                }

                if let Some(handler) = handler.as_mut() {
                    handler.handle(Event::PublishRecv { topic, payload, qos, dup });
                }
            }
            PacketType::PingResp => {
                if let Some(handler) = handler.as_mut() {
                    handler.handle(Event::KeepAlive);
                }
            }
            PacketType::PubRec => {
                let mut cursor = Cursor::new(body);
                if let Ok(packet_id) = cursor.read_u16() {
                    encode::encode_ack(tx_ring, 6, packet_id); // PUBREL
                }
            }
            PacketType::PubRel => {
                let mut cursor = Cursor::new(body);
                if let Ok(packet_id) = cursor.read_u16() {
                    encode::encode_ack(tx_ring, 7, packet_id); // PUBCOMP
                }
            }
            PacketType::SubAck | PacketType::UnsubAck | PacketType::PubAck | PacketType::PubComp => {
                let mut cursor = Cursor::new(body);
                let Ok(packet_id) = cursor.read_u16() else {
                    log::warn!("malformed ack, missing packet id");
                    return;
                };

                let Some(idx) = requests.find_pending(Some(packet_id)) else {
                    log::trace!("ack for unknown packet id {packet_id}, ignoring");
                    return;
                };
                let req = *requests.get(idx).expect("index just found");
                requests.delete(idx);

                let result = match ty {
                    PacketType::SubAck | PacketType::UnsubAck => {
                        let code = cursor.read_u8().unwrap_or(0x80);
                        if code < 3 { OpResult::Success } else { OpResult::Failure }
                    }
                    _ => OpResult::Success,
                };

                if let Some(handler) = handler.as_mut() {
                    let event = match req.kind {
                        RequestKind::Subscribe => Event::Subscribe { arg: req.arg, result },
                        RequestKind::Unsubscribe => Event::Unsubscribe { arg: req.arg, result },
                        RequestKind::Publish => Event::Publish { arg: req.arg, result },
                    };
                    handler.handle(event);
                }
            }
            PacketType::Connect | PacketType::Subscribe | PacketType::Unsubscribe | PacketType::PingReq | PacketType::Disconnect => {
                log::trace!("unexpected client-bound server packet, ignoring");
            }
        }
    }

    // ---------------------------------------------------------------
    // Send flush
    // ---------------------------------------------------------------

    fn flush(&mut self) -> Result<(), T::Error> {
        if self.is_sending {
            return Ok(());
        }

        let block = self.tx_ring.linear_read_block();
        if block.is_empty() {
            self.tx_ring.reset();
            return Ok(());
        }

        if self.transport.send(block)? {
            self.is_sending = true;
            self.written_total = self.written_total.wrapping_add(block.len() as u32);
        }

        Ok(())
    }
}

fn publish_rem_len(topic: &str, payload: &[u8], qos: QoS) -> usize {
    let mut len = 2 + topic.len() + payload.len();
    if qos != QoS::AtMostOnce {
        len += 2;
    }
    len
}
