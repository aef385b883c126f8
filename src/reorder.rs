//! Priority buffer that lets workers finish out of order while the writer
//! consumes strictly in `seq` order.
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};

use crate::job::CompressedBlock;

/// Min-heap wrapper ordering [`CompressedBlock`]s by ascending `seq`.
///
/// `BinaryHeap` is a max-heap, so ordering is reversed here to pop the
/// smallest `seq` first.
struct BySeq(CompressedBlock);

impl PartialEq for BySeq {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}
impl Eq for BySeq {}
impl PartialOrd for BySeq {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for BySeq {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.seq.cmp(&self.0.seq)
    }
}

/// Blocks completed by workers, released to the writer strictly in order.
pub struct ReorderBuffer {
    heap: Mutex<BinaryHeap<BySeq>>,
    ready: Condvar,
    shutdown: Mutex<bool>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            ready: Condvar::new(),
            shutdown: Mutex::new(false),
        }
    }

    /// Insert a completed block and wake any writer waiting on the head.
    pub fn push(&self, block: CompressedBlock) {
        let mut heap = self.heap.lock().unwrap();
        heap.push(BySeq(block));
        self.ready.notify_all();
    }

    /// Return the head block iff its `seq` equals `expected_seq`; otherwise
    /// `None` ("not yet"). Never blocks.
    fn pop_if_next(
        heap: &mut BinaryHeap<BySeq>,
        expected_seq: u64,
    ) -> Option<CompressedBlock> {
        match heap.peek() {
            Some(BySeq(top)) if top.seq == expected_seq => Some(heap.pop().unwrap().0),
            _ => None,
        }
    }

    /// Block until either `expected_seq` is at the head of the heap, or
    /// shutdown is signalled (in which case `None` is returned).
    pub fn pop_blocking(&self, expected_seq: u64) -> Option<CompressedBlock> {
        let mut heap = self.heap.lock().unwrap();
        loop {
            if let Some(block) = Self::pop_if_next(&mut heap, expected_seq) {
                return Some(block);
            }
            if *self.shutdown.lock().unwrap() {
                return None;
            }
            heap = self.ready.wait(heap).unwrap();
        }
    }

    /// Wake any waiting writer without inserting a block; used for
    /// cancellation.
    pub fn signal_shutdown(&self) {
        *self.shutdown.lock().unwrap() = true;
        self.ready.notify_all();
    }
}

impl Default for ReorderBuffer {
    fn default() -> Self {
        Self::new()
    }
}
