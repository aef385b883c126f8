//! Single-consumer writer: emits the gzip header, streams reordered
//! DEFLATE segments in order while tracking CRC-32/ISIZE, then emits the
//! trailer.
use std::io::Write;
use std::sync::Arc;

use flate2::{Compression, Crc};

use crate::error::GzError;
use crate::header::{build_header, build_trailer, GzipMetadata};
use crate::reorder::ReorderBuffer;

/// Drive the writer stage to completion.
///
/// Pops blocks from `reorder` strictly in `seq` order, updates the
/// running CRC-32 over each block's original bytes, and writes its
/// `deflate_bytes` to `out`. Stops as soon as the block whose `is_last` is
/// true has been consumed; it does not wait for the worker pool to fully
/// drain, since no `seq` beyond the last one can exist.
///
/// Returns `Ok(total_input_size)` on success, or `Err` if the reorder
/// buffer is shut down before the last block arrives (propagated fatal
/// error elsewhere in the pipeline) or a write fails.
pub fn run_writer<W: Write>(
    mut out: W,
    reorder: Arc<ReorderBuffer>,
    level: Compression,
    meta: &GzipMetadata,
) -> Result<u64, GzError> {
    out.write_all(&build_header(level, meta))
        .map_err(GzError::IoWrite)?;

    let mut crc = Crc::new();
    let mut input_size: u64 = 0;
    let mut expected_seq: u64 = 0;

    loop {
        let block = reorder
            .pop_blocking(expected_seq)
            .ok_or(GzError::ChannelClosed)?;
        crc.update(&block.original_bytes);
        input_size += block.original_bytes.len() as u64;
        out.write_all(&block.deflate_bytes)
            .map_err(GzError::IoWrite)?;

        if block.is_last {
            break;
        }
        expected_seq += 1;
    }

    out.write_all(&build_trailer(crc.sum(), input_size))
        .map_err(GzError::IoWrite)?;
    out.flush().map_err(GzError::IoWrite)?;

    Ok(input_size)
}
