//! Error types for the block-parallel gzip pipeline.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while configuring or running a compression.
#[derive(Error, Debug)]
pub enum GzError {
    /// The input path does not exist.
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    /// The input path is a directory or otherwise not a regular file.
    #[error("unsupported input (not a regular file): {0}")]
    UnsupportedInput(PathBuf),

    /// A read from the input stream failed.
    #[error("failed to read input")]
    IoRead(#[source] io::Error),

    /// A write to the output stream failed.
    #[error("failed to write output")]
    IoWrite(#[source] io::Error),

    /// The DEFLATE codec reported an internal error.
    #[error(transparent)]
    CodecError(#[from] flate2::CompressError),

    /// A worker or the writer observed a closed channel; this only happens
    /// after another stage has already recorded a fatal error.
    #[error("internal channel closed unexpectedly")]
    ChannelClosed,

    /// `workers` was set to zero.
    #[error("workers must be >= 1, got {0}")]
    NumThreads(usize),

    /// `blocksize` was set to zero.
    #[error("blocksize_kb must be >= 1, got {0}")]
    InvalidBlockSize(usize),

    /// `compresslevel` was outside `[1, 9]`.
    #[error("compresslevel must be in [1, 9], got {0}")]
    InvalidCompressionLevel(u32),
}
