//! Stateless raw-DEFLATE block compression.
//!
//! Every call builds its own [`Compress`] context, so blocks compressed on
//! different worker threads are independently decodable up to their
//! trailer. This is the property that makes block-level parallelism safe.
use flate2::{Compress, Compression, FlushCompress};

use crate::error::GzError;

/// The empty stored block that closes a `Z_SYNC_FLUSH`'d DEFLATE segment.
///
/// Present for documentation/tests; the trailer is produced by `flate2`
/// itself when [`FlushCompress::Sync`] is used, not appended by hand.
pub const SYNC_FLUSH_TRAILER: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

/// Compress `bytes` as one raw-DEFLATE block.
///
/// Intermediate blocks (`is_last == false`) are closed with
/// `Z_SYNC_FLUSH`, leaving the stream open and byte-aligned so the next
/// block's output can be concatenated directly. The final block
/// (`is_last == true`) is closed with `Z_FINISH`, setting the DEFLATE
/// end-of-stream bit.
pub fn compress_block(
    bytes: &[u8],
    is_last: bool,
    level: Compression,
) -> Result<Vec<u8>, GzError> {
    // raw DEFLATE: no zlib wrapper (`false`)
    let mut compressor = Compress::new(level, false);
    // headroom for flush padding on small/incompressible inputs
    let mut out = Vec::with_capacity(bytes.len() + std::cmp::max(64, bytes.len() / 8));
    let flush = if is_last {
        FlushCompress::Finish
    } else {
        FlushCompress::Sync
    };
    compressor.compress_vec(bytes, &mut out, flush)?;
    Ok(out)
}
