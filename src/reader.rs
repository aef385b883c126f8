//! Single-producer chunk reader: turns an input byte stream into a
//! sequence of [`Job`]s.
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use flume::Sender;

use crate::error::GzError;
use crate::job::Job;

/// Read one `blocksize`-byte chunk from `input`, filling the buffer fully
/// unless EOF is reached first. Returns `None` at EOF with nothing read.
fn read_full_block<R: Read>(
    input: &mut R,
    blocksize: usize,
    input_size: &AtomicU64,
) -> Result<Option<Bytes>, GzError> {
    let mut buf = vec![0u8; blocksize];
    let mut filled = 0;
    while filled < blocksize {
        let n = input.read(&mut buf[filled..]).map_err(GzError::IoRead)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Ok(None);
    }
    input_size.fetch_add(filled as u64, Ordering::Relaxed);
    buf.truncate(filled);
    Ok(Some(Bytes::from(buf)))
}

/// Read `input` in `blocksize`-byte increments, submitting one [`Job`] per
/// block to `dispatch` with a monotonic `seq` and an explicit `is_last`
/// flag.
///
/// The reader looks one block ahead: it only knows a block is the last
/// one once the *next* read comes back empty, so it holds the previous
/// block back until that's decided. This is what lets `is_last` be an
/// honest field on the `Job` itself rather than something a worker has to
/// infer from shared state after the fact (see the design notes on the
/// `is_last` race).
///
/// `last_seq` and `input_size` are published for observability and for
/// the data-model fidelity described in the spec; no consumer needs to
/// synchronize on them to stay correct, since the authoritative
/// flush-mode decision travels with each `Job`.
pub fn run_reader<R: Read>(
    input: R,
    blocksize: usize,
    dispatch: Sender<Job>,
    last_seq: Arc<AtomicI64>,
    input_size: Arc<AtomicU64>,
) -> Result<(), GzError> {
    run_reader_cancelable(
        input,
        blocksize,
        dispatch,
        last_seq,
        input_size,
        &AtomicBool::new(false),
    )
}

/// As [`run_reader`], but stops submitting further blocks as soon as
/// `shutdown` is observed true, which is used when another stage has
/// already failed and there is no point reading more of the input.
pub fn run_reader_cancelable<R: Read>(
    mut input: R,
    blocksize: usize,
    dispatch: Sender<Job>,
    last_seq: Arc<AtomicI64>,
    input_size: Arc<AtomicU64>,
    shutdown: &AtomicBool,
) -> Result<(), GzError> {
    let mut seq: u64 = 0;
    let mut pending: Option<Bytes> = None;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(());
        }
        let next = read_full_block(&mut input, blocksize, &input_size)?;
        match (pending.take(), next) {
            (Some(prev), Some(upcoming)) => {
                dispatch
                    .send(Job {
                        seq,
                        bytes: prev,
                        is_last: false,
                    })
                    .map_err(|_| GzError::ChannelClosed)?;
                seq += 1;
                pending = Some(upcoming);
            }
            (Some(prev), None) => {
                last_seq.store(seq as i64, Ordering::Release);
                dispatch
                    .send(Job {
                        seq,
                        bytes: prev,
                        is_last: true,
                    })
                    .map_err(|_| GzError::ChannelClosed)?;
                return Ok(());
            }
            (None, Some(upcoming)) => {
                pending = Some(upcoming);
            }
            (None, None) => {
                // Zero bytes were ever read: still emit a synthetic empty
                // block so the writer produces a valid trailer.
                last_seq.store(0, Ordering::Release);
                dispatch
                    .send(Job {
                        seq: 0,
                        bytes: Bytes::new(),
                        is_last: true,
                    })
                    .map_err(|_| GzError::ChannelClosed)?;
                return Ok(());
            }
        }
    }
}
