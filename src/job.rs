//! The data model shared by the reader, worker pool, and reorder buffer.
use bytes::Bytes;

/// A block of original bytes, assigned its position in input order.
///
/// `is_last` is stamped by the chunk reader at submission time (the
/// reader is the only thread that knows when it has hit EOF); this is the
/// race-free design called out in the spec's design notes: workers never
/// need to re-consult shared state to decide their flush mode.
#[derive(Debug, Clone)]
pub struct Job {
    pub seq: u64,
    pub bytes: Bytes,
    pub is_last: bool,
}

/// The result of compressing a [`Job`].
///
/// The original bytes are retained alongside the compressed bytes: the
/// writer needs them to update the running CRC-32 in release (input)
/// order, which out-of-order worker completion would otherwise make
/// impossible without a commutative checksum combinator.
#[derive(Debug, Clone)]
pub struct CompressedBlock {
    pub seq: u64,
    pub original_bytes: Bytes,
    pub deflate_bytes: Vec<u8>,
    pub is_last: bool,
}
