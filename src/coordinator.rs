//! Wires the reader, worker pool, reorder buffer, and writer into a single
//! compression run, and exposes the public builder API.
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub use flate2::Compression;

use crate::error::GzError;
use crate::header::GzipMetadata;
use crate::reader::run_reader_cancelable;
use crate::reorder::ReorderBuffer;
use crate::worker::run_worker_cancelable;
use crate::writer::run_writer;

/// Default block size in decimal KB (`blocksize * 1000` bytes), matching
/// the reference implementation.
pub const DEFAULT_BLOCKSIZE_KB: usize = 128;
/// Default compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// Lifecycle states of a single compression run. Exposed mainly so tests
/// and embedders can assert a run reached `Done` rather than `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Draining,
    Done,
    Failed,
}

/// First-error-wins slot shared across the reader, worker, and writer
/// threads.
#[derive(Default)]
struct ErrorSlot(Mutex<Option<GzError>>);

impl ErrorSlot {
    fn record(&self, err: GzError) {
        let mut slot = self.0.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<GzError> {
        self.0.lock().unwrap().take()
    }
}

/// Tunables for a compression run, validated at construction.
#[derive(Debug, Clone)]
pub struct CompressConfig {
    compression_level: Compression,
    blocksize: usize,
    workers: usize,
}

impl CompressConfig {
    pub fn builder() -> CompressConfigBuilder {
        CompressConfigBuilder::new()
    }
}

/// Builder for [`CompressConfig`], mirroring the fluent,
/// validate-at-the-setter style used throughout this crate.
#[derive(Debug, Clone)]
pub struct CompressConfigBuilder {
    compression_level: u32,
    blocksize_kb: usize,
    workers: usize,
}

impl CompressConfigBuilder {
    pub fn new() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            blocksize_kb: DEFAULT_BLOCKSIZE_KB,
            workers: num_cpus::get(),
        }
    }

    /// Set the compression level. Must be in `[1, 9]`.
    pub fn compression_level(mut self, level: u32) -> Result<Self, GzError> {
        if !(1..=9).contains(&level) {
            return Err(GzError::InvalidCompressionLevel(level));
        }
        self.compression_level = level;
        Ok(self)
    }

    /// Set the block size in decimal KB (actual block size = `kb * 1000`
    /// bytes). Must be >= 1.
    pub fn blocksize_kb(mut self, kb: usize) -> Result<Self, GzError> {
        if kb == 0 {
            return Err(GzError::InvalidBlockSize(kb));
        }
        self.blocksize_kb = kb;
        Ok(self)
    }

    /// Set the worker pool size. Must be >= 1.
    pub fn workers(mut self, workers: usize) -> Result<Self, GzError> {
        if workers == 0 {
            return Err(GzError::NumThreads(workers));
        }
        self.workers = workers;
        Ok(self)
    }

    pub fn build(self) -> CompressConfig {
        CompressConfig {
            compression_level: Compression::new(self.compression_level),
            blocksize: self.blocksize_kb * 1000,
            workers: self.workers,
        }
    }
}

impl Default for CompressConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the full pipeline: read `input` in blocks, compress them across a
/// worker pool, reorder, and stream a byte-exact gzip file to `output`.
///
/// This is the entry point used directly by property tests (against
/// in-memory readers/writers) and indirectly by [`GzFileBuilder::compress_file`].
pub fn compress_stream<R, W>(
    input: R,
    output: W,
    meta: GzipMetadata,
    config: CompressConfig,
) -> Result<(), GzError>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let phase = Arc::new(Mutex::new(Phase::Idle));
    let errors = Arc::new(ErrorSlot::default());
    let shutdown = Arc::new(AtomicBool::new(false));
    let reorder = Arc::new(ReorderBuffer::new());
    let last_seq = Arc::new(AtomicI64::new(-1));
    let input_size = Arc::new(AtomicU64::new(0));

    let (dispatch_tx, dispatch_rx) = flume::bounded(config.workers * 2);

    *phase.lock().unwrap() = Phase::Running;

    // Spawn stages in reverse data-flow order: the writer must be ready
    // to accept reordered blocks before any worker can produce one, and
    // workers must be ready before the reader submits its first job.
    let writer_level = config.compression_level;
    let writer_reorder = reorder.clone();
    let writer_errors = errors.clone();
    let writer_handle = std::thread::spawn(move || -> Option<u64> {
        match run_writer(output, writer_reorder, writer_level, &meta) {
            Ok(total) => Some(total),
            Err(e) => {
                writer_errors.record(e);
                None
            }
        }
    });

    let worker_handles: Vec<_> = (0..config.workers)
        .map(|_| {
            let rx = dispatch_rx.clone();
            let reorder = reorder.clone();
            let errors = errors.clone();
            let shutdown = shutdown.clone();
            let level = config.compression_level;
            std::thread::spawn(move || {
                if let Err(e) = run_worker_cancelable(rx, reorder.clone(), level, &shutdown) {
                    errors.record(e);
                    shutdown.store(true, Ordering::Relaxed);
                    reorder.signal_shutdown();
                }
            })
        })
        .collect();
    // The coordinator's own receiver handle must be dropped so the
    // channel closes once the reader's sender is dropped, not before.
    drop(dispatch_rx);

    let reader_errors = errors.clone();
    let reader_reorder = reorder.clone();
    let reader_shutdown = shutdown.clone();
    let reader_last_seq = last_seq.clone();
    let reader_input_size = input_size.clone();
    let reader_blocksize = config.blocksize;
    let reader_handle = std::thread::spawn(move || {
        if let Err(e) = run_reader_cancelable(
            input,
            reader_blocksize,
            dispatch_tx,
            reader_last_seq,
            reader_input_size,
            &reader_shutdown,
        ) {
            reader_errors.record(e);
            reader_shutdown.store(true, Ordering::Relaxed);
            reader_reorder.signal_shutdown();
        }
    });

    reader_handle.join().map_err(|_| GzError::ChannelClosed)?;

    *phase.lock().unwrap() = Phase::Draining;

    for handle in worker_handles {
        handle.join().map_err(|_| GzError::ChannelClosed)?;
    }

    let writer_result = writer_handle.join().map_err(|_| GzError::ChannelClosed)?;

    if let Some(err) = errors.take() {
        *phase.lock().unwrap() = Phase::Failed;
        return Err(err);
    }
    if writer_result.is_none() {
        *phase.lock().unwrap() = Phase::Failed;
        return Err(GzError::ChannelClosed);
    }

    *phase.lock().unwrap() = Phase::Done;
    Ok(())
}

/// Builder for the file-oriented entry point.
#[derive(Debug, Clone)]
pub struct GzFileBuilder {
    config: CompressConfigBuilder,
}

impl GzFileBuilder {
    pub fn new() -> Self {
        Self {
            config: CompressConfigBuilder::new(),
        }
    }

    pub fn compression_level(mut self, level: u32) -> Result<Self, GzError> {
        self.config = self.config.compression_level(level)?;
        Ok(self)
    }

    pub fn blocksize_kb(mut self, kb: usize) -> Result<Self, GzError> {
        self.config = self.config.blocksize_kb(kb)?;
        Ok(self)
    }

    pub fn workers(mut self, workers: usize) -> Result<Self, GzError> {
        self.config = self.config.workers(workers)?;
        Ok(self)
    }

    /// Compress `input_path` to `<basename(input_path)>.gz` in the current
    /// working directory, returning the output path.
    ///
    /// Fails immediately (before any thread is spawned) if the input does
    /// not exist or is not a regular file.
    pub fn compress_file(self, input_path: impl AsRef<Path>) -> Result<PathBuf, GzError> {
        let input_path = input_path.as_ref();
        if !input_path.exists() {
            return Err(GzError::InputNotFound(input_path.to_path_buf()));
        }
        if !input_path.is_file() {
            return Err(GzError::UnsupportedInput(input_path.to_path_buf()));
        }

        let meta = GzipMetadata::from_path(input_path);
        let output_path = output_path_for(input_path);

        let input = BufReader::new(File::open(input_path).map_err(GzError::IoRead)?);
        let output = BufWriter::new(File::create(&output_path).map_err(GzError::IoWrite)?);

        let config = self.config.build();
        match compress_stream(input, output, meta, config) {
            Ok(()) => Ok(output_path),
            Err(e) => {
                // Partial output is not a useful artifact; remove it.
                let _ = std::fs::remove_file(&output_path);
                Err(e)
            }
        }
    }
}

impl Default for GzFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn output_path_for(input_path: &Path) -> PathBuf {
    let basename = input_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output"));
    let mut name = basename.into_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(input: &[u8], workers: usize, blocksize_kb: usize) -> Vec<u8> {
        let config = CompressConfig::builder()
            .workers(workers)
            .unwrap()
            .blocksize_kb(blocksize_kb)
            .unwrap()
            .build();
        let mut out = Vec::new();
        compress_stream(
            Cursor::new(input.to_vec()),
            &mut out,
            GzipMetadata::default(),
            config,
        )
        .unwrap();
        out
    }

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        let mut decoder = flate2::read::MultiGzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_roundtrip_single_block() {
        let input = b"This is a test string".repeat(5);
        let compressed = roundtrip(&input, 2, 128);
        assert_eq!(gunzip(&compressed), input);
    }

    /// S3: input of exactly 2x blocksize bytes produces two blocks; the
    /// first ends with the sync-flush trailer, the second does not.
    #[test]
    fn test_two_full_blocks_framing() {
        let blocksize = 1000; // blocksize_kb(1) => 1 * 1000 bytes
        let input = vec![b'x'; blocksize * 2];
        let compressed = roundtrip(&input, 1, 1);
        assert_eq!(gunzip(&compressed), input);

        // body starts after the 10-byte header (no FNAME in this test).
        let body = &compressed[10..compressed.len() - 8];
        // locate the sync-flush marker; it must appear before the stream end.
        let marker = [0x00, 0x00, 0xff, 0xff];
        let pos = body
            .windows(4)
            .position(|w| w == marker)
            .expect("sync flush trailer present");
        assert!(pos + 4 < body.len(), "trailer must not be the final bytes");
    }

    /// S7: worker count must not affect the output bytes.
    #[test]
    fn test_output_independent_of_worker_count() {
        let input: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let out1 = roundtrip(&input, 1, 4);
        let out2 = roundtrip(&input, 2, 4);
        let out4 = roundtrip(&input, 4, 4);
        let out16 = roundtrip(&input, 16, 4);
        assert_eq!(out1, out2);
        assert_eq!(out1, out4);
        assert_eq!(out1, out16);
    }

    #[test]
    fn test_empty_input_roundtrip() {
        let compressed = roundtrip(b"", 3, 128);
        assert!(gunzip(&compressed).is_empty());
        let trailer = &compressed[compressed.len() - 8..];
        assert_eq!(&trailer[0..4], &0u32.to_le_bytes());
        assert_eq!(&trailer[4..8], &0u32.to_le_bytes());
    }

    #[test]
    fn test_builder_rejects_bad_compression_level() {
        assert!(CompressConfig::builder().compression_level(0).is_err());
        assert!(CompressConfig::builder().compression_level(10).is_err());
        assert!(CompressConfig::builder().compression_level(9).is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_workers() {
        assert!(CompressConfig::builder().workers(0).is_err());
    }

    #[test]
    fn test_builder_rejects_zero_blocksize() {
        assert!(CompressConfig::builder().blocksize_kb(0).is_err());
        assert!(CompressConfig::builder().blocksize_kb(1).is_ok());
    }

    #[test]
    fn test_compress_file_rejects_missing_input() {
        let err = GzFileBuilder::new()
            .compress_file("/nonexistent/path/definitely-not-here.txt")
            .unwrap_err();
        assert!(matches!(err, GzError::InputNotFound(_)));
    }

    #[test]
    fn test_compress_file_rejects_directory_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = GzFileBuilder::new().compress_file(dir.path()).unwrap_err();
        assert!(matches!(err, GzError::UnsupportedInput(_)));
    }

    proptest::proptest! {
        /// Round-trip holds for arbitrary input and worker/block-size
        /// combinations, and output never depends on worker count.
        #[test]
        fn test_roundtrip_is_worker_count_independent(
            input in proptest::collection::vec(proptest::num::u8::ANY, 0..4000),
            blocksize_kb in 1usize..3,
            workers_a in 1usize..5,
            workers_b in 1usize..5,
        ) {
            let out_a = roundtrip(&input, workers_a, blocksize_kb);
            let out_b = roundtrip(&input, workers_b, blocksize_kb);
            proptest::prop_assert_eq!(&out_a, &out_b);
            proptest::prop_assert_eq!(gunzip(&out_a), input);
        }
    }

    #[test]
    fn test_compress_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("Golden_Ticket.mp3");
        std::fs::write(&input_path, b"some bytes to compress").unwrap();

        // compress_file writes its output relative to the process's
        // working directory, so this test briefly points it at the
        // tempdir and restores it afterward.
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = GzFileBuilder::new().compress_file(&input_path);
        let output_name = result.as_ref().ok().cloned();
        std::env::set_current_dir(cwd).unwrap();

        let output_name = output_name.unwrap();
        let compressed = std::fs::read(dir.path().join(&output_name)).unwrap();
        assert_eq!(gunzip(&compressed), b"some bytes to compress");
        // FNAME bit should be set since the basename is Latin-1 representable.
        assert_eq!(compressed[3] & 0x08, 0x08);
    }
}
