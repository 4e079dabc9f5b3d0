//! A minimal `std::net::TcpStream`-backed transport, driven by a hand
//! rolled poll loop. Shows the shape an embedding application wires up
//! around `mqtt_core::Client` — this crate itself never touches a socket.
//!
//! `TcpStream`'s blocking `connect`/`write` complete synchronously from this
//! process's point of view, so this demo calls `on_connected`/`on_sent`
//! right after they return rather than waiting for a separate completion
//! callback; a real non-blocking transport (e.g. a cellular modem's AT
//! command set) would call them later, from whatever polls its own
//! completion state.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use mqtt_core::{Client, ClientInfo, Event, Transport};

struct TcpTransport {
    stream: Option<TcpStream>,
    start: Instant,
}

impl TcpTransport {
    fn new() -> Self {
        Self { stream: None, start: Instant::now() }
    }
}

impl Transport for TcpTransport {
    type Error = std::io::Error;

    fn start(&mut self, host: &str, port: u16) -> Result<(), Self::Error> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nonblocking(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<bool, Self::Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };
        match stream.write(data) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.stream = None;
        Ok(())
    }

    fn recved(&mut self, _len: usize) {}

    fn is_attached(&self) -> bool {
        true
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => Ok(0),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder().format_timestamp(None).init();

    let mut tx_buf = [0u8; 256];
    let mut rx_buf = [0u8; 256];
    let mut client = Client::<_, _, (), 4>::new(TcpTransport::new(), &mut tx_buf, &mut rx_buf, ());

    let info = ClientInfo {
        client_id: "mqtt-core-demo",
        username: None,
        password: None,
        will: None,
        keep_alive_secs: 30,
    };

    let handler = |event: Event<'_, ()>| match event {
        Event::Connect { status } => println!("connect: {status:?}"),
        Event::Disconnect { is_accepted } => println!("disconnect, accepted={is_accepted}"),
        Event::PublishRecv { topic, payload, .. } => {
            println!("message on {topic}: {} bytes", payload.len());
        }
        other => println!("{other:?}"),
    };

    client.connect("127.0.0.1", 1883, handler, &info)?;
    client.on_connected()?;
    client.subscribe("demo/topic", mqtt_core::QoS::AtLeastOnce, ())?;

    let mut read_buf = [0u8; 256];
    loop {
        match client.transport_mut().read(&mut read_buf) {
            Ok(0) => break,
            Ok(n) => client.on_recv(&read_buf[..n])?,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }

        client.on_poll()?;
        std::thread::sleep(Duration::from_millis(mqtt_core::client::POLL_INTERVAL_MS as u64));
    }

    Ok(())
}
