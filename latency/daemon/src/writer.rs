//! Timed write/flush/sync round trips against the probe file
//!
//! Every cycle rewinds to offset 0 and writes the hex text of freshly
//! generated random chunks, so the file never grows past one cycle's
//! worth of bytes.

use crate::error::{CycleError, CycleStep};
use iolatency_common::HEX_CHARS_PER_BYTE;
use rand::{rngs::SmallRng, RngCore, SeedableRng};
use std::{
    fs::File,
    io::{self, Seek, SeekFrom, Write},
    time::{Duration, Instant},
};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Destination of the probe writes
///
/// `sync_durable` must not return before the written data is on stable
/// storage.
pub trait DurableSink: Write + Seek + Send + 'static {
    fn sync_durable(&mut self) -> io::Result<()>;
}

impl DurableSink for File {
    fn sync_durable(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Lowercase hex encoding of `bytes` into `out`, replacing its contents
pub fn encode_hex(bytes: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(bytes.len() * HEX_CHARS_PER_BYTE);
    for &byte in bytes {
        out.push(HEX_DIGITS[(byte >> 4) as usize]);
        out.push(HEX_DIGITS[(byte & 0x0f) as usize]);
    }
}

/// Owns the sink and the payload buffers for the whole session
pub struct ChunkWriter<S: DurableSink> {
    sink: S,
    rng: SmallRng,
    chunk: Vec<u8>,
    encoded: Vec<u8>,
    chunks_per_cycle: usize,
}

impl<S: DurableSink> ChunkWriter<S> {
    /// Create a writer producing `chunks_per_cycle` chunks of `chunk_size`
    /// random bytes per cycle
    pub fn new(sink: S, chunk_size: usize, chunks_per_cycle: usize) -> Self {
        Self {
            sink,
            rng: SmallRng::from_entropy(),
            chunk: vec![0; chunk_size],
            encoded: Vec::with_capacity(chunk_size * HEX_CHARS_PER_BYTE),
            chunks_per_cycle,
        }
    }

    /// Bytes that land in the sink per cycle
    pub fn bytes_per_cycle(&self) -> usize {
        self.chunk.len() * HEX_CHARS_PER_BYTE * self.chunks_per_cycle
    }

    /// Run one cycle and return how long the write+flush+sync took
    ///
    /// The seek happens before the clock starts. Payload generation is
    /// inside the timed region.
    pub fn cycle(&mut self) -> Result<Duration, CycleError> {
        self.sink
            .seek(SeekFrom::Start(0))
            .map_err(|e| CycleError::new(CycleStep::Seek, e))?;

        let start = Instant::now();

        for _ in 0..self.chunks_per_cycle {
            self.rng.fill_bytes(&mut self.chunk);
            encode_hex(&self.chunk, &mut self.encoded);
            self.sink
                .write_all(&self.encoded)
                .map_err(|e| CycleError::new(CycleStep::Write, e))?;
        }

        self.sink
            .flush()
            .map_err(|e| CycleError::new(CycleStep::Flush, e))?;
        self.sink
            .sync_durable()
            .map_err(|e| CycleError::new(CycleStep::Sync, e))?;

        Ok(start.elapsed())
    }

    pub fn get_ref(&self) -> &S {
        &self.sink
    }
}
