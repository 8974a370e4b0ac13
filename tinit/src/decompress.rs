//! In-memory xz decompression of kernel module images.
//!
//! The whole compressed image is already resident (memory-mapped), so this
//! is a pure buffer-to-buffer transform. The output buffer starts small and
//! doubles whenever the decoder fills it.

use thiserror::Error;
use xz2::stream::{Action, Status, Stream};

/// Initial size of the output buffer.
pub const INITIAL_OUTPUT_CAPACITY: usize = 8192;

#[derive(Debug, Error)]
pub enum DecompressError {
    #[error("could not init LZMA decoder: {0}")]
    Init(#[source] xz2::stream::Error),

    #[error("LZMA decoder error: {0}")]
    Codec(#[source] xz2::stream::Error),

    /// The decoder stopped before the end of the stream (truncated or empty input).
    #[error("stream ended early (decoder status {0})")]
    Incomplete(String),

    #[error("could not grow output buffer to {0} bytes")]
    Alloc(usize),
}

/// Growing-buffer xz decoder.
#[derive(Clone, Copy, Debug)]
pub struct Decompressor {
    initial_capacity: usize,
}

impl Default for Decompressor {
    fn default() -> Self {
        Self {
            initial_capacity: INITIAL_OUTPUT_CAPACITY,
        }
    }
}

impl Decompressor {
    pub fn with_initial_capacity(capacity: usize) -> Self {
        Self {
            initial_capacity: capacity.max(1),
        }
    }

    /// Decompress a complete `.xz` stream.
    ///
    /// The returned vector's length is the exact decompressed size; its
    /// capacity may be larger. Nothing is returned unless the decoder
    /// reached the end of the stream.
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, DecompressError> {
        let mut stream =
            Stream::new_stream_decoder(u64::MAX, 0).map_err(DecompressError::Init)?;

        let mut out = Vec::new();
        grow_to(&mut out, self.initial_capacity)?;

        let mut status = Status::Ok;
        while matches!(status, Status::Ok) {
            let consumed = stream.total_in() as usize;
            let produced = stream.total_out() as usize;
            status = stream
                .process(&input[consumed..], &mut out[produced..], Action::Run)
                .map_err(DecompressError::Codec)?;

            // Output full: double and resume right after the last written byte.
            if stream.total_out() as usize == out.len() {
                let doubled = out.len() * 2;
                grow_to(&mut out, doubled)?;
            }
        }

        if !matches!(status, Status::StreamEnd) {
            return Err(DecompressError::Incomplete(format!("{:?}", status)));
        }

        out.truncate(stream.total_out() as usize);
        tracing::trace!(
            "Decompressed {} bytes into {} bytes",
            stream.total_in(),
            out.len()
        );
        Ok(out)
    }
}

/// Decompress with the default 8 KiB starting buffer.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecompressError> {
    Decompressor::default().decompress(input)
}

fn grow_to(buf: &mut Vec<u8>, len: usize) -> Result<(), DecompressError> {
    buf.try_reserve_exact(len - buf.len())
        .map_err(|_| DecompressError::Alloc(len))?;
    buf.resize(len, 0);
    Ok(())
}
