//! Block-parallel, byte-exact gzip compression.
//!
//! Input bytes are split into fixed-size blocks, those blocks are
//! compressed concurrently across a worker pool, and a single writer
//! thread streams the results back out in input order as one RFC 1952
//! gzip file with a correctly tracked running CRC-32 and ISIZE trailer.
//! This is very similar to how [`pigz`](https://zlib.net/pigz/) works.
//!
//! # Known differences from pigz
//!
//! - Each intermediate block is closed with `Z_SYNC_FLUSH` rather than a
//!   fresh gzip member, so the body is one continuous raw DEFLATE stream,
//!   matching pigz's own multi-block framing.
//! - There is no shared dictionary across blocks: compression is
//!   per-block only, so very small blocks or high-entropy input can see
//!   little to no size reduction on some blocks.
//!
//! # Examples
//!
//! ```no_run
//! use gzblock::GzFileBuilder;
//!
//! let output_path = GzFileBuilder::new()
//!     .compression_level(9).unwrap()
//!     .workers(4).unwrap()
//!     .compress_file("input.txt")
//!     .unwrap();
//! println!("wrote {}", output_path.display());
//! ```
mod block;
mod coordinator;
mod error;
mod header;
mod job;
mod reader;
mod reorder;
mod worker;
mod writer;

pub use coordinator::{
    compress_stream, CompressConfig, CompressConfigBuilder, GzFileBuilder, Phase,
    DEFAULT_BLOCKSIZE_KB, DEFAULT_COMPRESSION_LEVEL,
};
pub use error::GzError;
pub use flate2::Compression;
pub use header::GzipMetadata;
