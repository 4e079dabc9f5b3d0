//! The request tracking table (`spec.md` §4.4): a fixed-capacity arena that
//! correlates server acknowledgements with the outgoing SUBSCRIBE /
//! UNSUBSCRIBE / PUBLISH call that produced them.
//!
//! A slot's "in use" state is represented by `Option::is_some` rather than a
//! separate flag (the source keeps both an explicit flag and a packet id of
//! 0 to mean "empty"); this is the same arena with one fewer redundant bit,
//! not a behavior change.

/// Which outgoing operation a [`Request`] is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Subscribe,
    Unsubscribe,
    Publish,
}

/// One in-flight request. `packet_id` is 0 for QoS-0 publishes, which are
/// tracked by `expected_sent_len` instead (see `spec.md` §3, §4.5 `publish`).
#[derive(Debug, Clone, Copy)]
pub struct Request<A> {
    pub kind: RequestKind,
    pub packet_id: u16,
    pub arg: A,
    pub pending: bool,
    pub timeout_start: u64,
    pub expected_sent_len: u32,
}

/// A fixed-capacity, linearly-scanned table of in-flight requests.
///
/// `N` is chosen by the embedding application at compile time (`spec.md`
/// §4.4: "size chosen at compile/build time"). No ordering guarantee is made
/// between slots, and slots are recycled without reordering.
pub struct RequestTable<A, const N: usize> {
    slots: [Option<Request<A>>; N],
}

impl<A, const N: usize> RequestTable<A, N>
where
    A: Copy,
{
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }

    /// Occupies the first free slot, returning its index. `None` if the
    /// table is full.
    pub fn create(&mut self, packet_id: u16, kind: RequestKind, arg: A) -> Option<usize> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(Request {
            kind,
            packet_id,
            arg,
            pending: false,
            timeout_start: 0,
            expected_sent_len: 0,
        });
        Some(idx)
    }

    /// Clears every flag of the slot at `idx`, making it available again.
    pub fn delete(&mut self, idx: usize) {
        self.slots[idx] = None;
    }

    /// Marks the slot at `idx` pending, stamping the current time as its
    /// timeout start. No-op if the slot is not in use.
    pub fn set_pending(&mut self, idx: usize, now_ms: u64) {
        if let Some(req) = self.slots[idx].as_mut() {
            req.pending = true;
            req.timeout_start = now_ms;
        }
    }

    /// Finds a pending slot, by packet id when `packet_id` is `Some`, or the
    /// first pending slot of any id when `packet_id` is `None` (mirrors the
    /// source's `find_pending(-1)` call convention).
    pub fn find_pending(&self, packet_id: Option<u16>) -> Option<usize> {
        self.slots.iter().position(|slot| match slot {
            Some(req) => req.pending && packet_id.is_none_or(|id| req.packet_id == id),
            None => false,
        })
    }

    pub fn get(&self, idx: usize) -> Option<&Request<A>> {
        self.slots[idx].as_ref()
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Request<A>> {
        self.slots[idx].as_mut()
    }

    /// Iterates over every occupied slot, in slot order (no ordering
    /// guarantee is implied by this order, it is just the scan order).
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Request<A>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|r| (i, r)))
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Empties the whole table without individually clearing each request's
    /// flags (`spec.md` §4.5 `on_close`: "Zero the request table").
    pub fn clear(&mut self) {
        self.slots = [None; N];
    }
}

impl<A, const N: usize> Default for RequestTable<A, N>
where
    A: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}
