pub mod utils;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mqtt_core::client::ConnectStatus;
use mqtt_core::{OpResult, QoS};

/// An owned copy of an `Event`, so it can be recorded past the lifetime of
/// the borrowed `topic`/`payload` slices the real event carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Connect { status: ConnectStatus },
    Disconnect { is_accepted: bool },
    PublishRecv { topic: String, payload: Vec<u8>, qos: QoS, dup: bool },
    Publish { arg: u32, result: OpResult },
    Subscribe { arg: u32, result: OpResult },
    Unsubscribe { arg: u32, result: OpResult },
    KeepAlive,
}

pub fn record_into(events: &Rc<RefCell<Vec<Recorded>>>) -> impl FnMut(mqtt_core::Event<'_, u32>) + 'static {
    let events = Rc::clone(events);
    move |event| {
        let recorded = match event {
            mqtt_core::Event::Connect { status } => Recorded::Connect { status },
            mqtt_core::Event::Disconnect { is_accepted } => Recorded::Disconnect { is_accepted },
            mqtt_core::Event::PublishRecv { topic, payload, qos, dup } => Recorded::PublishRecv {
                topic: topic.to_string(),
                payload: payload.to_vec(),
                qos,
                dup,
            },
            mqtt_core::Event::Publish { arg, result } => Recorded::Publish { arg, result },
            mqtt_core::Event::Subscribe { arg, result } => Recorded::Subscribe { arg, result },
            mqtt_core::Event::Unsubscribe { arg, result } => Recorded::Unsubscribe { arg, result },
            mqtt_core::Event::KeepAlive => Recorded::KeepAlive,
        };
        events.borrow_mut().push(recorded);
    }
}

/// A fully in-memory, synchronous [`mqtt_core::Transport`]. `send` always
/// accepts its input immediately (so the test drives `on_sent` itself);
/// inbound bytes are staged through [`MockTransport::push_inbound`] and
/// delivered into the client by the test calling `client.on_recv`.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub sent: Rc<RefCell<Vec<u8>>>,
    pub closed: Rc<Cell<bool>>,
    pub start_calls: Rc<RefCell<Vec<(String, u16)>>>,
    time: Rc<Cell<u64>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.time.set(self.time.get() + ms);
    }

    pub fn drain_sent(&self) -> Vec<u8> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }
}

impl mqtt_core::Transport for MockTransport {
    type Error = std::convert::Infallible;

    fn start(&mut self, host: &str, port: u16) -> Result<(), Self::Error> {
        self.start_calls.borrow_mut().push((host.to_string(), port));
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<bool, Self::Error> {
        self.sent.borrow_mut().extend_from_slice(data);
        Ok(true)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.closed.set(true);
        Ok(())
    }

    fn recved(&mut self, _len: usize) {}

    fn is_attached(&self) -> bool {
        true
    }

    fn now_ms(&self) -> u64 {
        self.time.get()
    }
}
