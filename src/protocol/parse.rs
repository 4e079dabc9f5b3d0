//! The incremental packet parser (`spec.md` §4.3): a byte-by-byte state
//! machine that consumes inbound fragments of arbitrary size — down to one
//! byte at a time — and reports one complete packet (header byte + body)
//! at a time, so the caller can dispatch it before feeding more bytes.

use crate::log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    CalcRemLen,
    ReadRem,
}

/// A fully-received packet: the fixed header's first byte (type in the
/// high nibble, flags in the low nibble) and its body.
///
/// `body` either borrows directly from the input fragment that was fed in
/// (the zero-copy fast path, when the whole body arrived contiguously) or
/// from the parser's own receive buffer (when the body was assembled
/// across more than one `step` call).
#[derive(Debug)]
pub struct Dispatch<'r> {
    pub header: u8,
    pub body: &'r [u8],
}

/// Incremental MQTT fixed-header + body decoder.
///
/// Owns a fixed receive buffer (borrowed from the caller) used only for
/// packets whose body arrives split across more than one `step` call.
/// Bodies that do not fit in the receive buffer are discarded, but the FSM
/// still advances past them — a deliberate partial-degradation policy for
/// constrained devices (`spec.md` §4.3 "Overflow policy"), not a connection
/// failure.
pub struct Parser<'a> {
    state: State,
    hdr_byte: u8,
    rem_len: u32,
    rem_len_mult: u32,
    curr_pos: usize,
    rx_buf: &'a mut [u8],
}

impl<'a> Parser<'a> {
    pub fn new(rx_buf: &'a mut [u8]) -> Self {
        Self {
            state: State::Init,
            hdr_byte: 0,
            rem_len: 0,
            rem_len_mult: 0,
            curr_pos: 0,
            rx_buf,
        }
    }

    /// Resets the FSM to `INIT`, discarding any in-progress packet. Called
    /// at (re)connect.
    pub fn reset(&mut self) {
        self.state = State::Init;
        self.hdr_byte = 0;
        self.rem_len = 0;
        self.rem_len_mult = 0;
        self.curr_pos = 0;
    }

    /// Feeds as much of `input` as needed to either complete one packet or
    /// exhaust `input`.
    ///
    /// Returns `(consumed, dispatch)`. `consumed` is always how many bytes
    /// of `input` were used by this call. When `dispatch` is `Some`, the
    /// caller should handle the packet, then call `step` again with
    /// `&input[consumed..]` if bytes remain — multiple whole packets may be
    /// present in a single fragment.
    pub fn step<'r>(&'r mut self, input: &'r [u8]) -> (usize, Option<Dispatch<'r>>) {
        let mut i = 0;

        while i < input.len() {
            match self.state {
                State::Init => {
                    self.hdr_byte = input[i];
                    i += 1;
                    self.rem_len = 0;
                    self.rem_len_mult = 0;
                    self.curr_pos = 0;
                    self.state = State::CalcRemLen;
                }
                State::CalcRemLen => {
                    let b = input[i];
                    i += 1;

                    if self.rem_len_mult >= 4 {
                        log::warn!("malformed remaining length, resyncing");
                        self.state = State::Init;
                        continue;
                    }

                    self.rem_len |= u32::from(b & 0x7F) << (7 * self.rem_len_mult);
                    self.rem_len_mult += 1;

                    if b & 0x80 != 0 {
                        continue;
                    }

                    if self.rem_len == 0 {
                        self.state = State::Init;
                        return (i, Some(Dispatch { header: self.hdr_byte, body: &[] }));
                    }

                    let rem = self.rem_len as usize;
                    let available = input.len() - i;
                    if available >= rem {
                        let body = &input[i..i + rem];
                        i += rem;
                        self.state = State::Init;
                        return (i, Some(Dispatch { header: self.hdr_byte, body }));
                    }

                    self.state = State::ReadRem;
                }
                State::ReadRem => {
                    let b = input[i];
                    i += 1;

                    if self.curr_pos < self.rx_buf.len() {
                        self.rx_buf[self.curr_pos] = b;
                    }
                    self.curr_pos += 1;

                    if self.curr_pos == self.rem_len as usize {
                        self.state = State::Init;
                        if self.curr_pos <= self.rx_buf.len() {
                            let body = &self.rx_buf[..self.curr_pos];
                            return (i, Some(Dispatch { header: self.hdr_byte, body }));
                        }
                        log::warn!(
                            "discarding packet of {} bytes, receive buffer is {} bytes",
                            self.curr_pos,
                            self.rx_buf.len()
                        );
                    }
                }
            }
        }

        (i, None)
    }
}
