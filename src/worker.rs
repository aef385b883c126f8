//! Fixed-size pool that compresses dispatched jobs in parallel.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flate2::Compression;
use flume::Receiver;

use crate::block::compress_block;
use crate::error::GzError;
use crate::job::{CompressedBlock, Job};
use crate::reorder::ReorderBuffer;

/// Run one worker: pull jobs until the dispatch channel closes, compress
/// each with the flush mode carried by `Job::is_last`, and push the result
/// onto the reorder buffer.
///
/// Returns the first error encountered, if any. The caller is responsible
/// for recording it in the shared error slot and unblocking the writer
/// (see [`run_worker_cancelable`] for the variant that also does this).
pub fn run_worker(
    dispatch: Receiver<Job>,
    reorder: Arc<ReorderBuffer>,
    level: Compression,
) -> Result<(), GzError> {
    run_worker_cancelable(dispatch, reorder, level, &AtomicBool::new(false))
}

/// As [`run_worker`], but checks `shutdown` after each job: once another
/// stage has failed there is no point finishing the remaining queue, so
/// freshly-dequeued jobs are dropped instead of compressed.
pub fn run_worker_cancelable(
    dispatch: Receiver<Job>,
    reorder: Arc<ReorderBuffer>,
    level: Compression,
    shutdown: &AtomicBool,
) -> Result<(), GzError> {
    while let Ok(job) = dispatch.recv() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let deflate_bytes = compress_block(&job.bytes, job.is_last, level)?;
        reorder.push(CompressedBlock {
            seq: job.seq,
            original_bytes: job.bytes,
            deflate_bytes,
            is_last: job.is_last,
        });
    }
    Ok(())
}
