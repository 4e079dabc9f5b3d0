//! A bounded, single-producer/single-consumer byte queue used as the
//! transmit staging area (`spec.md` §4.1).
//!
//! The encoder is the only writer, the transport-send path is the only
//! reader. Writes never wrap a packet across the end of the backing slice
//! without also wrapping the read position consistently; callers are
//! expected to call [`RingBuffer::write`] only after confirming there is
//! enough free space for a whole packet (see `protocol::encode::check_memory`).

/// A fixed-capacity circular byte buffer borrowed from the caller.
pub struct RingBuffer<'a> {
    buf: &'a mut [u8],
    read: usize,
    write: usize,
    used: usize,
}

impl<'a> RingBuffer<'a> {
    /// Wraps `buf` as an empty ring buffer. Capacity equals `buf.len()`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            read: 0,
            write: 0,
            used: 0,
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes currently queued and not yet read.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Free space in bytes.
    pub fn free(&self) -> usize {
        self.buf.len() - self.used
    }

    /// Appends up to `free()` bytes of `data`, returning the number actually
    /// written. Callers that need an all-or-nothing write must check
    /// [`RingBuffer::free`] first; this method performs a short write rather
    /// than reject the whole call.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.free());
        let cap = self.capacity();
        if cap == 0 || n == 0 {
            return 0;
        }

        let first = n.min(cap - self.write);
        self.buf[self.write..self.write + first].copy_from_slice(&data[..first]);
        let second = n - first;
        if second > 0 {
            self.buf[..second].copy_from_slice(&data[first..first + second]);
        }

        self.write = (self.write + n) % cap;
        self.used += n;
        n
    }

    /// Returns the largest contiguous readable region starting at the
    /// current read position. May be shorter than [`RingBuffer::used`] when
    /// the unread data wraps around the end of the backing slice; the
    /// caller should consume this block, call [`RingBuffer::skip`], and call
    /// this method again to get the remainder.
    pub fn linear_read_block(&self) -> &[u8] {
        if self.used == 0 {
            return &[];
        }
        let cap = self.capacity();
        let contiguous = (cap - self.read).min(self.used);
        &self.buf[self.read..self.read + contiguous]
    }

    /// Advances the read cursor by `n` bytes. `n` must not exceed
    /// [`RingBuffer::used`]. When the buffer becomes empty both cursors are
    /// reset to zero, so the next packet is always written out as one
    /// contiguous block.
    pub fn skip(&mut self, n: usize) {
        debug_assert!(n <= self.used);
        let cap = self.capacity();
        let n = n.min(self.used);
        self.read = if cap == 0 { 0 } else { (self.read + n) % cap };
        self.used -= n;

        if self.used == 0 {
            self.reset();
        }
    }

    /// Resets both cursors to zero, discarding any queued data.
    pub fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
        self.used = 0;
    }
}
