//! Byte cursors handed to stream filters, and the spanning writer/reader
//! used when one logical block's compressed payload straddles two physical
//! blocks.

use super::compression::{FilterStatus, StreamFilter};
use crate::error::{Error, Result};
use tracing::error;

/// Read position over an input slice
#[derive(Debug)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not consumed yet
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Mark `n` bytes as consumed
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.remaining(), "read cursor advanced past its end");
        self.pos += n;
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Write position over an output slice
#[derive(Debug)]
pub struct WriteCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Cursor that starts writing at `start`
    pub fn at(buf: &'a mut [u8], start: usize) -> Self {
        assert!(start <= buf.len(), "write cursor starts past its end");
        Self { buf, pos: start }
    }

    /// Unwritten space
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[self.pos..]
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Mark `n` bytes as written
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.remaining(), "write cursor advanced past its end");
        self.pos += n;
    }

    /// Offset of the next byte to write
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Where a spanning encode stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpanProgress {
    /// The whole block is encoded; the payload ends at this offset.
    Complete(usize),
    /// The output buffer filled at this offset; a spill buffer is needed.
    Spill(usize),
}

/// Encodes one source block into at most two output buffers
#[derive(Debug, Default)]
pub(crate) struct SpanWriter {
    consumed: usize,
    segments: u8,
}

impl SpanWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode the unconsumed part of `src` into `dst[start..]`
    pub fn encode(
        &mut self,
        filter: &mut dyn StreamFilter,
        src: &[u8],
        dst: &mut [u8],
        start: usize,
    ) -> Result<SpanProgress> {
        self.segments += 1;
        if self.segments > 2 {
            return Err(spill_overflow());
        }

        let mut input = ReadCursor::new(&src[self.consumed..]);
        let mut output = WriteCursor::at(dst, start);
        let status = filter.process(&mut input, &mut output, true)?;
        self.consumed += input.position();

        match status {
            FilterStatus::Done => Ok(SpanProgress::Complete(output.position())),
            FilterStatus::NeedOutput if self.segments == 1 => {
                Ok(SpanProgress::Spill(output.position()))
            }
            FilterStatus::NeedOutput => Err(spill_overflow()),
            FilterStatus::NeedInput => {
                error!("compressor asked for input after the final block");
                Err(Error::Fatal(
                    "compressor asked for more input after the final block".to_string(),
                ))
            }
        }
    }
}

fn spill_overflow() -> Error {
    error!("compression required more than one extra physical block");
    Error::Fatal("compression required more than one extra physical block".to_string())
}

/// Decode a payload that starts in `first` and may continue in `second`
///
/// Returns the number of bytes written to `out`.
pub(crate) fn decode_span(
    filter: &mut dyn StreamFilter,
    first: &[u8],
    second: Option<&[u8]>,
    out: &mut [u8],
) -> Result<usize> {
    let mut output = WriteCursor::new(out);
    let mut input = ReadCursor::new(first);
    let mut status = filter.process(&mut input, &mut output, second.is_none())?;

    if status == FilterStatus::NeedInput && !output.is_full() {
        let next = match second {
            Some(next) => next,
            None => {
                error!("compressed payload ended early");
                return Err(Error::Fatal("compressed payload is truncated".to_string()));
            }
        };
        let mut input = ReadCursor::new(next);
        status = filter.process(&mut input, &mut output, true)?;
        if status == FilterStatus::NeedInput && !output.is_full() {
            error!("decompression required more than one extra physical block");
            return Err(Error::Fatal(
                "decompression required more than one extra physical block".to_string(),
            ));
        }
    }

    Ok(output.position())
}
