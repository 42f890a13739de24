//! Compression adapter for memory files
//!
//! A memory file never hard-codes an algorithm. It asks a
//! [`CompressionAdapter`] for one compressor and one decompressor state per
//! open file and drives them through the [`StreamFilter`] contract.

use super::cursor::{ReadCursor, WriteCursor};
use crate::error::{Error, Result};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};
use std::fmt;
use zstd::stream::raw::{Decoder as ZstdDecoder, Encoder as ZstdEncoder, InBuffer, Operation, OutBuffer};

/// Outcome of one `process` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    /// All offered input was consumed and the stream is not finished.
    NeedInput,
    /// The output buffer is full.
    NeedOutput,
    /// The stream is complete.
    Done,
}

/// A streaming encoder or decoder state
///
/// `process` must only report [`FilterStatus::NeedInput`] after consuming
/// every byte it was offered.
pub trait StreamFilter: Send {
    /// Called once before the first `reinit`
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Reset the state to start a new, independent stream
    fn reinit(&mut self) -> Result<()>;

    /// Move bytes from `input` to `output`; `last` marks the end of input
    fn process(
        &mut self,
        input: &mut ReadCursor<'_>,
        output: &mut WriteCursor<'_>,
        last: bool,
    ) -> Result<FilterStatus>;

    /// Drop any internal resources
    fn release(&mut self) {}
}

/// Factory for per-file filter states
pub trait CompressionAdapter: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn compressor(&self) -> Result<Box<dyn StreamFilter>>;

    fn decompressor(&self) -> Result<Box<dyn StreamFilter>>;
}

/// Compression algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Identity filter, useful for tests
    None,
    #[default]
    Zlib,
    Zstd,
}

impl CompressionAlgorithm {
    /// Adapter for this algorithm at `level`
    pub fn adapter(self, level: i32) -> AlgorithmAdapter {
        AlgorithmAdapter {
            algorithm: self,
            level,
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionAlgorithm::None => "none",
            CompressionAlgorithm::Zlib => "zlib",
            CompressionAlgorithm::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// Adapter for the built-in algorithms
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmAdapter {
    algorithm: CompressionAlgorithm,
    level: i32,
}

impl CompressionAdapter for AlgorithmAdapter {
    fn name(&self) -> &'static str {
        match self.algorithm {
            CompressionAlgorithm::None => "none",
            CompressionAlgorithm::Zlib => "zlib",
            CompressionAlgorithm::Zstd => "zstd",
        }
    }

    fn compressor(&self) -> Result<Box<dyn StreamFilter>> {
        Ok(match self.algorithm {
            CompressionAlgorithm::None => Box::new(Passthrough::default()),
            CompressionAlgorithm::Zlib => Box::new(ZlibEncode::new(self.level)),
            CompressionAlgorithm::Zstd => Box::new(ZstdEncode::new(self.level)?),
        })
    }

    fn decompressor(&self) -> Result<Box<dyn StreamFilter>> {
        Ok(match self.algorithm {
            CompressionAlgorithm::None => Box::new(Passthrough::default()),
            CompressionAlgorithm::Zlib => Box::new(ZlibDecode::new()),
            CompressionAlgorithm::Zstd => Box::new(ZstdDecode::new()?),
        })
    }
}

/// Identity filter
///
/// As a decoder it stops when the output is full, so it never needs an
/// end-of-stream marker.
#[derive(Debug, Default)]
pub struct Passthrough;

impl StreamFilter for Passthrough {
    fn reinit(&mut self) -> Result<()> {
        Ok(())
    }

    fn process(
        &mut self,
        input: &mut ReadCursor<'_>,
        output: &mut WriteCursor<'_>,
        last: bool,
    ) -> Result<FilterStatus> {
        let n = input.remaining().min(output.remaining());
        output.spare()[..n].copy_from_slice(&input.remaining_slice()[..n]);
        input.advance(n);
        output.advance(n);

        Ok(if !input.is_empty() {
            FilterStatus::NeedOutput
        } else if last {
            FilterStatus::Done
        } else {
            FilterStatus::NeedInput
        })
    }
}

/// zlib stream encoder
pub struct ZlibEncode {
    state: Compress,
}

impl ZlibEncode {
    pub fn new(level: i32) -> Self {
        let level = level.clamp(0, 9) as u32;
        Self {
            state: Compress::new(Compression::new(level), true),
        }
    }
}

impl StreamFilter for ZlibEncode {
    fn reinit(&mut self) -> Result<()> {
        self.state.reset();
        Ok(())
    }

    fn process(
        &mut self,
        input: &mut ReadCursor<'_>,
        output: &mut WriteCursor<'_>,
        last: bool,
    ) -> Result<FilterStatus> {
        let flush = if last {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };
        let before_in = self.state.total_in();
        let before_out = self.state.total_out();
        let status = self
            .state
            .compress(input.remaining_slice(), output.spare(), flush)
            .map_err(|e| Error::Compression(format!("zlib compress failed: {}", e)))?;
        input.advance((self.state.total_in() - before_in) as usize);
        output.advance((self.state.total_out() - before_out) as usize);

        Ok(match status {
            Status::StreamEnd => FilterStatus::Done,
            _ if !last && input.is_empty() => FilterStatus::NeedInput,
            _ => FilterStatus::NeedOutput,
        })
    }
}

/// zlib stream decoder
pub struct ZlibDecode {
    state: Decompress,
}

impl ZlibDecode {
    pub fn new() -> Self {
        Self {
            state: Decompress::new(true),
        }
    }
}

impl Default for ZlibDecode {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFilter for ZlibDecode {
    fn reinit(&mut self) -> Result<()> {
        self.state.reset(true);
        Ok(())
    }

    fn process(
        &mut self,
        input: &mut ReadCursor<'_>,
        output: &mut WriteCursor<'_>,
        _last: bool,
    ) -> Result<FilterStatus> {
        loop {
            let before_in = self.state.total_in();
            let before_out = self.state.total_out();
            let status = self
                .state
                .decompress(input.remaining_slice(), output.spare(), FlushDecompress::None)
                .map_err(|e| Error::Compression(format!("zlib decompress failed: {}", e)))?;
            let consumed = (self.state.total_in() - before_in) as usize;
            let produced = (self.state.total_out() - before_out) as usize;
            input.advance(consumed);
            output.advance(produced);

            if status == Status::StreamEnd {
                return Ok(FilterStatus::Done);
            }
            if output.is_full() {
                return Ok(FilterStatus::NeedOutput);
            }
            if input.is_empty() {
                return Ok(FilterStatus::NeedInput);
            }
            if consumed == 0 && produced == 0 {
                return Err(Error::Compression(
                    "zlib decoder made no progress".to_string(),
                ));
            }
        }
    }
}

/// zstd frame encoder
pub struct ZstdEncode {
    state: ZstdEncoder<'static>,
    finishing: bool,
}

impl ZstdEncode {
    pub fn new(level: i32) -> Result<Self> {
        let state = ZstdEncoder::new(level)
            .map_err(|e| Error::Compression(format!("Failed to create zstd encoder: {}", e)))?;
        Ok(Self {
            state,
            finishing: false,
        })
    }
}

impl StreamFilter for ZstdEncode {
    fn reinit(&mut self) -> Result<()> {
        self.finishing = false;
        self.state
            .reinit()
            .map_err(|e| Error::Compression(format!("Failed to reset zstd encoder: {}", e)))
    }

    fn process(
        &mut self,
        input: &mut ReadCursor<'_>,
        output: &mut WriteCursor<'_>,
        last: bool,
    ) -> Result<FilterStatus> {
        if !self.finishing {
            while !input.is_empty() {
                if output.is_full() {
                    return Ok(FilterStatus::NeedOutput);
                }
                let mut src = InBuffer::around(input.remaining_slice());
                let mut dst = OutBuffer::around(output.spare());
                self.state
                    .run(&mut src, &mut dst)
                    .map_err(|e| Error::Compression(format!("Failed to compress: {}", e)))?;
                let (consumed, produced) = (src.pos(), dst.pos());
                input.advance(consumed);
                output.advance(produced);
            }
            if !last {
                return Ok(FilterStatus::NeedInput);
            }
            self.finishing = true;
        }

        let mut dst = OutBuffer::around(output.spare());
        let pending = self
            .state
            .finish(&mut dst, true)
            .map_err(|e| Error::Compression(format!("Failed to finish compression: {}", e)))?;
        let produced = dst.pos();
        output.advance(produced);

        Ok(if pending == 0 {
            FilterStatus::Done
        } else {
            FilterStatus::NeedOutput
        })
    }
}

/// zstd frame decoder
pub struct ZstdDecode {
    state: ZstdDecoder<'static>,
}

impl ZstdDecode {
    pub fn new() -> Result<Self> {
        let state = ZstdDecoder::new()
            .map_err(|e| Error::Compression(format!("Failed to create zstd decoder: {}", e)))?;
        Ok(Self { state })
    }
}

impl StreamFilter for ZstdDecode {
    fn reinit(&mut self) -> Result<()> {
        self.state
            .reinit()
            .map_err(|e| Error::Compression(format!("Failed to reset zstd decoder: {}", e)))
    }

    fn process(
        &mut self,
        input: &mut ReadCursor<'_>,
        output: &mut WriteCursor<'_>,
        _last: bool,
    ) -> Result<FilterStatus> {
        loop {
            let mut src = InBuffer::around(input.remaining_slice());
            let mut dst = OutBuffer::around(output.spare());
            let hint = self
                .state
                .run(&mut src, &mut dst)
                .map_err(|e| Error::Compression(format!("Failed to decompress: {}", e)))?;
            let (consumed, produced) = (src.pos(), dst.pos());
            input.advance(consumed);
            output.advance(produced);

            if hint == 0 {
                return Ok(FilterStatus::Done);
            }
            if output.is_full() {
                return Ok(FilterStatus::NeedOutput);
            }
            if input.is_empty() {
                return Ok(FilterStatus::NeedInput);
            }
            if consumed == 0 && produced == 0 {
                return Err(Error::Compression(
                    "zstd decoder made no progress".to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block(len: usize) -> Vec<u8> {
        b"fill_rect 10 20 300 40; copy_mono band=3; "
            .iter()
            .cycle()
            .take(len)
            .copied()
            .collect()
    }

    /// Encode then decode one block through the filter contract
    fn round_trip(algorithm: CompressionAlgorithm, data: &[u8]) -> Result<(usize, Vec<u8>)> {
        let adapter = algorithm.adapter(3);
        let mut encoder = adapter.compressor()?;
        let mut decoder = adapter.decompressor()?;
        encoder.init()?;
        encoder.reinit()?;
        decoder.init()?;
        decoder.reinit()?;

        let mut compressed = vec![0u8; data.len() * 2 + 64];
        let mut input = ReadCursor::new(data);
        let mut output = WriteCursor::new(&mut compressed);
        assert_eq!(encoder.process(&mut input, &mut output, true)?, FilterStatus::Done);
        let compressed_len = output.position();

        let mut restored = vec![0u8; data.len()];
        let mut input = ReadCursor::new(&compressed[..compressed_len]);
        let mut output = WriteCursor::new(&mut restored);
        let status = decoder.process(&mut input, &mut output, true)?;
        assert_ne!(status, FilterStatus::NeedInput);
        assert!(output.is_full());
        Ok((compressed_len, restored))
    }

    #[test]
    fn test_passthrough_round_trip() -> Result<()> {
        let data = sample_block(1024);
        let (len, restored) = round_trip(CompressionAlgorithm::None, &data)?;
        assert_eq!(len, data.len());
        assert_eq!(restored, data);
        Ok(())
    }

    #[test]
    fn test_zlib_round_trip() -> Result<()> {
        let data = sample_block(4096);
        let (len, restored) = round_trip(CompressionAlgorithm::Zlib, &data)?;
        // Compression should reduce size for repetitive data
        assert!(len < data.len());
        assert_eq!(restored, data);
        Ok(())
    }

    #[test]
    fn test_zstd_round_trip() -> Result<()> {
        let data = sample_block(4096);
        let (len, restored) = round_trip(CompressionAlgorithm::Zstd, &data)?;
        assert!(len < data.len());
        assert_eq!(restored, data);
        Ok(())
    }

    #[test]
    fn test_zlib_reports_need_output() -> Result<()> {
        // Pseudo-random bytes do not compress, so 64 bytes of output cannot hold them
        let data: Vec<u8> = (0..2048u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();
        let mut encoder = ZlibEncode::new(6);
        encoder.reinit()?;

        let mut small = vec![0u8; 64];
        let mut input = ReadCursor::new(&data);
        let mut output = WriteCursor::new(&mut small);
        assert_eq!(
            encoder.process(&mut input, &mut output, true)?,
            FilterStatus::NeedOutput
        );
        assert!(output.position() > 0);
        Ok(())
    }

    #[test]
    fn test_zlib_decoder_rejects_garbage() {
        let mut decoder = ZlibDecode::new();
        let garbage = [0xffu8; 32];
        let mut out = vec![0u8; 128];
        let mut input = ReadCursor::new(&garbage);
        let mut output = WriteCursor::new(&mut out);
        let result = decoder.process(&mut input, &mut output, true);
        assert!(matches!(result, Err(Error::Compression(_))));
    }

    #[test]
    fn test_algorithm_config_names() {
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::Zlib);
        assert_eq!(CompressionAlgorithm::Zstd.to_string(), "zstd");
        assert_eq!(CompressionAlgorithm::None.adapter(0).name(), "none");
    }
}
