//! Pure serialization of MQTT control packets into a [`RingBuffer`].
//! `spec.md` §4.2.

use crate::protocol::qos::QoS;
use crate::protocol::varint::VariableByteInteger;
use crate::ring::RingBuffer;

/// Returns the total number of bytes a packet with the given remaining
/// length would occupy (header byte + varint length + body), or `None` if
/// that total exceeds `ring`'s current free space.
///
/// Callers MUST call this before writing any part of a packet; the encoder
/// functions in this module never perform a partial write; they assume the
/// caller already confirmed enough room.
pub fn check_memory(ring: &RingBuffer, rem_len: usize) -> Option<usize> {
    let total = 1 + VariableByteInteger::encoded_len(rem_len) + rem_len;
    if ring.free() >= total { Some(total) } else { None }
}

fn write_fixed_header(ring: &mut RingBuffer, packet_type: u8, dup: bool, qos: u8, retain: bool, rem_len: usize) {
    let first = (packet_type << 4) | ((dup as u8) << 3) | ((qos & 0b11) << 1) | (retain as u8);
    ring.write(&[first]);
    let len: VariableByteInteger = (rem_len as u32).try_into().expect("rem_len within range");
    ring.write(len.as_slice());
}

fn write_u16(ring: &mut RingBuffer, v: u16) {
    ring.write(&v.to_be_bytes());
}

fn write_string(ring: &mut RingBuffer, s: &str) {
    write_u16(ring, s.len() as u16);
    ring.write(s.as_bytes());
}

/// A last-will message, encoded as part of CONNECT.
pub struct Will<'a> {
    pub topic: &'a str,
    pub message: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

/// Encodes a CONNECT packet (`spec.md` §4.5 `on_connected`): clean-session
/// flag always set, protocol name "MQTT", protocol level 4.
///
/// Returns `false` without writing anything if `ring` has insufficient free
/// space.
#[allow(clippy::too_many_arguments)]
pub fn encode_connect(
    ring: &mut RingBuffer,
    client_id: &str,
    username: Option<&str>,
    password: Option<&[u8]>,
    will: Option<&Will<'_>>,
    keep_alive_secs: u16,
) -> bool {
    let mut rem_len = 2 + 4 + 1 + 1 + 2 + 2 + client_id.len();
    if let Some(will) = will {
        rem_len += 2 + will.topic.len() + 2 + will.message.len();
    }
    if let Some(username) = username {
        rem_len += 2 + username.len();
    }
    if let Some(password) = password {
        rem_len += 2 + password.len();
    }

    if check_memory(ring, rem_len).is_none() {
        return false;
    }

    write_fixed_header(ring, 1, false, 0, false, rem_len);

    write_string(ring, "MQTT");
    ring.write(&[4]); // protocol level

    let mut flags = 0b0000_0010u8; // clean session
    if let Some(will) = will {
        flags |= 0b0000_0100;
        flags |= (u8::from(will.qos) & 0b11) << 3;
        if will.retain {
            flags |= 0b0010_0000;
        }
    }
    if username.is_some() {
        flags |= 0b1000_0000;
    }
    if password.is_some() {
        flags |= 0b0100_0000;
    }
    ring.write(&[flags]);

    write_u16(ring, keep_alive_secs);

    write_string(ring, client_id);
    if let Some(will) = will {
        write_string(ring, will.topic);
        write_u16(ring, will.message.len() as u16);
        ring.write(will.message);
    }
    if let Some(username) = username {
        write_string(ring, username);
    }
    if let Some(password) = password {
        write_u16(ring, password.len() as u16);
        ring.write(password);
    }

    true
}

/// Encodes a SUBSCRIBE packet. MQTT 3.1.1 fixes QoS 1 for the SUBSCRIBE
/// packet type itself (flag bits `0010`), independent of the requested
/// topic QoS carried in the payload.
pub fn encode_subscribe(ring: &mut RingBuffer, packet_id: u16, topic: &str, qos: QoS) -> bool {
    let rem_len = 2 + 2 + topic.len() + 1;
    if check_memory(ring, rem_len).is_none() {
        return false;
    }

    write_fixed_header(ring, 8, false, 0b01, false, rem_len);
    write_u16(ring, packet_id);
    write_string(ring, topic);
    ring.write(&[u8::from(qos)]);
    true
}

/// Encodes an UNSUBSCRIBE packet (also fixed at QoS 1 framing per 3.1.1).
pub fn encode_unsubscribe(ring: &mut RingBuffer, packet_id: u16, topic: &str) -> bool {
    let rem_len = 2 + 2 + topic.len();
    if check_memory(ring, rem_len).is_none() {
        return false;
    }

    write_fixed_header(ring, 10, false, 0b01, false, rem_len);
    write_u16(ring, packet_id);
    write_string(ring, topic);
    true
}

/// Encodes a PUBLISH packet. `packet_id` is ignored for QoS 0.
pub fn encode_publish(
    ring: &mut RingBuffer,
    topic: &str,
    payload: &[u8],
    qos: QoS,
    retain: bool,
    dup: bool,
    packet_id: u16,
) -> bool {
    let mut rem_len = 2 + topic.len() + payload.len();
    if qos != QoS::AtMostOnce {
        rem_len += 2;
    }

    if check_memory(ring, rem_len).is_none() {
        return false;
    }

    write_fixed_header(ring, 3, dup, u8::from(qos), retain, rem_len);
    write_string(ring, topic);
    if qos != QoS::AtMostOnce {
        write_u16(ring, packet_id);
    }
    ring.write(payload);
    true
}

/// Encodes one of the 2-byte packet-id-only acknowledgements: PUBACK,
/// PUBREC, PUBREL, PUBCOMP. `packet_type` must be one of those four
/// (3, 4, 5, 6 resp. wire values 4, 5, 6, 7).
pub fn encode_ack(ring: &mut RingBuffer, packet_type: u8, packet_id: u16) -> bool {
    let rem_len = 2;
    if check_memory(ring, rem_len).is_none() {
        return false;
    }

    // PUBREL (type 6) is the only one of these four with non-zero mandatory
    // flag bits (`0010`); the others are all-zero.
    let first = (packet_type << 4) | if packet_type == 6 { 0b0010 } else { 0 };
    ring.write(&[first]);
    let len: VariableByteInteger = (rem_len as u32).try_into().expect("rem_len within range");
    ring.write(len.as_slice());
    write_u16(ring, packet_id);
    true
}

/// Encodes a zero-body PINGREQ.
pub fn encode_pingreq(ring: &mut RingBuffer) -> bool {
    if check_memory(ring, 0).is_none() {
        return false;
    }
    write_fixed_header(ring, 12, false, 0, false, 0);
    true
}
