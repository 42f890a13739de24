//! The memory file itself
//!
//! A chain of fixed-size logical blocks. Until the configured threshold is
//! crossed every logical block owns one raw physical block. After that, every
//! block but the tail is compressed into a chain of physical blocks and read
//! back through the raw cache.

use super::allocator::{Allocation, Allocator, BlockBuffer, HeapAllocator};
use super::block::{Arena, LogId, LogicalBlock, PhysId, PhysicalBlock, LOG_BLOCK_BYTES};
use super::cache::{CacheStats, RawCache};
use super::compression::{CompressionAdapter, StreamFilter};
use super::cursor::{decode_span, SpanProgress, SpanWriter};
use super::reserve::ReservePool;
use crate::config::MemFileConfig;
use crate::error::{Error, Result, LOW_MEMORY_ADVISORY};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

const PHYS_TAG: &str = "memfile phys block";
const LOG_TAG: &str = "memfile log block";
const RAW_TAG: &str = "memfile raw buffer";

/// Supported open modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `"w"` / `"wb"`
    Write,
    /// `"w+"` / `"w+b"`
    WriteRead,
}

impl OpenMode {
    /// Parse an fopen-style mode string
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "w" | "wb" => Ok(OpenMode::Write),
            "w+" | "w+b" => Ok(OpenMode::WriteRead),
            other => Err(Error::InvalidFileAccess(format!(
                "memory files only support fresh write modes, not {:?}",
                other
            ))),
        }
    }
}

/// Origin of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    Set,
    Cur,
    End,
}

/// Memory file statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemFileStats {
    pub length: u64,
    pub total_space: usize,
    pub logical_blocks: usize,
    pub physical_blocks: usize,
    pub chain_blocks: usize,
    pub blocks_compressed: u64,
    pub compressing: bool,
    pub reserve_phys: usize,
    pub reserve_log: usize,
    pub reserve_draws: u64,
    pub reserve_bytes: usize,
    pub cache: CacheStats,
}

/// In-memory paged file with transparent compression
pub struct MemFile {
    config: MemFileConfig,
    mode: OpenMode,
    allocator: Arc<dyn Allocator>,
    algorithm: &'static str,
    compressor: Box<dyn StreamFilter>,
    decompressor: Box<dyn StreamFilter>,

    logs: Arena<LogId, LogicalBlock>,
    phys: Arena<PhysId, PhysicalBlock>,
    head: LogId,
    tail: LogId,
    /// Bytes written into the tail block
    tail_fill: usize,
    block_count: u64,

    /// Block under the read position, and its index in the chain
    curr: LogId,
    curr_index: u64,
    /// Whether `curr` has been materialized since it last changed
    curr_ready: bool,

    pos: u64,
    length: u64,
    total_space: usize,

    compressing: bool,
    /// Physical blocks holding compressed data, in write order
    chain: Vec<PhysId>,
    blocks_compressed: u64,
    /// Raw buffers vacated during threshold conversion, reused for the chain
    recycled: Vec<BlockBuffer>,

    reserve: ReservePool,
    raw_cache: Option<RawCache>,

    error: Option<Error>,
    low_memory: bool,
}

impl MemFile {
    /// Open a memory file on the process heap, compressing with the
    /// configured algorithm
    pub fn open(mode: &str, config: MemFileConfig) -> Result<Self> {
        let adapter = config.algorithm.adapter(config.compression_level);
        Self::open_with(mode, config, HeapAllocator::shared(), &adapter)
    }

    /// Open a memory file with an explicit allocator and compression adapter
    pub fn open_with(
        mode: &str,
        config: MemFileConfig,
        allocator: Arc<dyn Allocator>,
        adapter: &dyn CompressionAdapter,
    ) -> Result<Self> {
        let mode = OpenMode::parse(mode)?;
        config.validate()?;

        let mut compressor = adapter.compressor()?;
        let mut decompressor = adapter.decompressor()?;
        compressor.init()?;
        decompressor.init()?;

        let buffer = BlockBuffer::allocate(&allocator, config.block_size, PHYS_TAG)
            .ok_or_else(|| Error::VmError("cannot allocate first physical block".to_string()))?;
        let lease = Allocation::acquire(&allocator, LOG_BLOCK_BYTES, LOG_TAG)
            .ok_or_else(|| Error::VmError("cannot allocate first logical block".to_string()))?;

        let mut phys = Arena::new();
        let mut logs = Arena::new();
        let first_phys = phys.insert(PhysicalBlock::raw(buffer));
        let first = logs.insert(LogicalBlock::new(first_phys, lease));

        let mut file = Self {
            config,
            mode,
            allocator,
            algorithm: adapter.name(),
            compressor,
            decompressor,
            logs,
            phys,
            head: first,
            tail: first,
            tail_fill: 0,
            block_count: 1,
            curr: first,
            curr_index: 0,
            curr_ready: false,
            pos: 0,
            length: 0,
            total_space: 0,
            compressing: false,
            chain: Vec::new(),
            blocks_compressed: 0,
            recycled: Vec::new(),
            reserve: ReservePool::new(),
            raw_cache: None,
            error: None,
            low_memory: false,
        };
        file.init_empty();

        debug!(
            mode = ?file.mode,
            block_size = file.config.block_size,
            algorithm = file.algorithm,
            "memory file opened"
        );
        Ok(file)
    }

    /// Reset bookkeeping around a single empty tail block
    fn init_empty(&mut self) {
        let tail = self.tail;
        let block = &mut self.logs[tail];
        block.link = None;
        block.offset = 0;

        self.head = tail;
        self.curr = tail;
        self.curr_index = 0;
        self.curr_ready = false;
        self.tail_fill = 0;
        self.block_count = 1;
        self.pos = 0;
        self.length = 0;
        self.total_space = LOG_BLOCK_BYTES + BlockBuffer::charge(self.config.block_size);
        self.compressing = false;
        self.blocks_compressed = 0;
        self.error = None;
        self.low_memory = false;
    }

    /// Discard all content, keeping one raw block for the new head
    ///
    /// Reserve pools survive a reset.
    fn reset(&mut self) {
        debug!(length = self.length, blocks = self.block_count, "resetting memory file");
        self.raw_cache = None;

        let tail = self.tail;
        let tail_phys = self.logs[tail].phys;
        let keep = if self.phys[tail_phys].is_raw() {
            tail_phys
        } else {
            // A non-raw tail points into the chain; recycle one chain buffer.
            self.chain.pop().unwrap_or(tail_phys)
        };

        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            cursor = self.logs[id].link;
            if id == tail {
                continue;
            }
            if let Some(block) = self.logs.remove(id) {
                let raw = self.phys.get(block.phys).map_or(false, PhysicalBlock::is_raw);
                if raw && block.phys != keep {
                    self.free_phys(block.phys);
                }
            }
        }
        for id in std::mem::take(&mut self.chain) {
            if id != keep {
                self.free_phys(id);
            }
        }

        let block = &mut self.phys[keep];
        block.data_limit = None;
        block.link = None;
        self.logs[tail].phys = keep;
        self.init_empty();
    }

    /// Reserve memory for the next `bytes_left` bytes of writes
    ///
    /// Once this succeeds, writing up to `bytes_left` bytes cannot fail for
    /// lack of memory even if the allocator starts refusing requests.
    pub fn set_memory_warning(&mut self, bytes_left: usize) -> Result<()> {
        let block_size = self.config.block_size;
        let log_needed = bytes_left.div_ceil(block_size);
        let phys_needed =
            log_needed + usize::from(bytes_left > 0) + usize::from(self.raw_cache.is_none());

        self.reserve
            .fill_to(log_needed, phys_needed, &self.allocator, block_size)?;
        self.low_memory = false;
        debug!(bytes_left, log_needed, phys_needed, "memory warning set");
        Ok(())
    }

    /// Append `data` to the file, returning the number of bytes written
    ///
    /// A write at position 0 of a non-empty file discards its content first.
    /// Writes anywhere but position 0 or the end are refused. On failure the
    /// error becomes sticky and the count may be short.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        if self.pos == 0 && (self.length > 0 || self.error.is_some()) {
            self.reset();
        }
        if self.error.is_some() {
            return 0;
        }
        if self.pos != self.length {
            self.fail(Error::InvalidFileAccess(format!(
                "write at {} of a {} byte file",
                self.pos, self.length
            )));
            return 0;
        }

        let block_size = self.config.block_size;
        let mut written = 0;
        while written < data.len() {
            if self.tail_fill == block_size {
                if let Err(err) = self.advance_block() {
                    self.fail(err);
                    break;
                }
            }
            let n = (block_size - self.tail_fill).min(data.len() - written);
            let tail_phys = self.logs[self.tail].phys;
            let fill = self.tail_fill;
            self.phys[tail_phys].data[fill..fill + n].copy_from_slice(&data[written..written + n]);
            self.tail_fill += n;
            written += n;
        }

        self.pos += written as u64;
        self.length = self.pos;
        written
    }

    /// Link a new empty tail block after the current one
    pub fn advance_block(&mut self) -> Result<()> {
        if self.compressing {
            return self.advance_compressing();
        }

        let buffer = self.alloc_phys()?;
        let lease = match self.alloc_log() {
            Ok(lease) => lease,
            Err(err) => {
                self.discard_buffer(buffer);
                return Err(err);
            }
        };
        let phys = self.phys.insert(PhysicalBlock::raw(buffer));
        let block = self.logs.insert(LogicalBlock::new(phys, lease));
        self.link_tail(block);

        if self.config.compress && self.total_space > self.config.compression_threshold {
            self.start_compression()?;
        }
        Ok(())
    }

    fn advance_compressing(&mut self) -> Result<()> {
        let lease = self.alloc_log()?;
        let vacated = match self.compress_block(self.tail) {
            Ok(vacated) => vacated,
            Err(err) => {
                self.total_space = self.total_space.saturating_sub(lease.bytes());
                return Err(err);
            }
        };
        let block = self.logs.insert(LogicalBlock::new(vacated, lease));
        self.link_tail(block);
        Ok(())
    }

    fn link_tail(&mut self, block: LogId) {
        let tail = self.tail;
        self.logs[tail].link = Some(block);
        self.tail = block;
        self.tail_fill = 0;
        self.block_count += 1;
        trace!(%block, blocks = self.block_count, "tail advanced");
    }

    /// Compress every block before the tail and switch to compressing mode
    fn start_compression(&mut self) -> Result<()> {
        info!(
            total_space = self.total_space,
            threshold = self.config.compression_threshold,
            blocks = self.block_count,
            algorithm = self.algorithm,
            "compression threshold crossed"
        );
        self.compressing = true;

        let result = self.convert_blocks();
        for buffer in std::mem::take(&mut self.recycled) {
            self.discard_buffer(buffer);
        }
        debug!(
            chain_blocks = self.chain.len(),
            total_space = self.total_space,
            "existing blocks compressed"
        );
        result
    }

    /// Move every block before the tail into the chain, then give the tail a
    /// raw buffer again
    ///
    /// Vacated raw buffers feed the chain and the new tail before the
    /// allocator is asked, so conversion only needs new memory when the data
    /// does not compress.
    fn convert_blocks(&mut self) -> Result<()> {
        // The tail's fresh physical block becomes the first compression target.
        let target = self.logs[self.tail].phys;
        let block = &mut self.phys[target];
        block.data_limit = Some(0);
        block.link = None;
        self.chain.push(target);

        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            if id == self.tail {
                break;
            }
            cursor = self.logs[id].link;
            let raw = self.compress_block(id)?;
            if let Some(block) = self.phys.remove(raw) {
                self.recycled.push(block.data);
            }
        }

        let buffer = match self.recycled.pop() {
            Some(buffer) => buffer,
            None => self.alloc_phys()?,
        };
        let fresh = self.phys.insert(PhysicalBlock::raw(buffer));
        let tail = self.tail;
        self.logs[tail].phys = fresh;
        Ok(())
    }

    /// Compress one raw logical block onto the end of the chain
    ///
    /// Returns the raw physical block the logical block no longer uses.
    fn compress_block(&mut self, id: LogId) -> Result<PhysId> {
        let raw = self.logs[id].phys;
        if !self.phys[raw].is_raw() {
            error!(block = %id, "block is already compressed");
            return Err(Error::Fatal(format!("{} is already compressed", id)));
        }

        let mut target = match self.chain.last() {
            Some(&target) => target,
            None => self.extend_chain()?,
        };
        let mut start = self.phys[target].data_limit.unwrap_or(0);
        if start >= self.config.block_size {
            target = self.extend_chain()?;
            start = 0;
        }
        let (payload_phys, payload_offset) = (target, start);

        self.compressor.reinit()?;
        let mut writer = SpanWriter::new();
        let progress = {
            let (src, dst) = self.phys.pair_mut(raw, target);
            writer.encode(&mut *self.compressor, &src.data, &mut dst.data, start)?
        };
        let end = match progress {
            SpanProgress::Complete(end) => end,
            SpanProgress::Spill(full) => {
                self.phys[target].data_limit = Some(full);
                target = self.extend_chain()?;
                trace!(block = %id, spill = %target, "compressed block spills");
                let (src, dst) = self.phys.pair_mut(raw, target);
                match writer.encode(&mut *self.compressor, &src.data, &mut dst.data, 0)? {
                    SpanProgress::Complete(end) => end,
                    SpanProgress::Spill(_) => {
                        error!(block = %id, "compressed block spilled twice");
                        return Err(Error::Fatal(
                            "compression required more than one extra physical block".to_string(),
                        ));
                    }
                }
            }
        };
        self.phys[target].data_limit = Some(end);

        let block = &mut self.logs[id];
        block.phys = payload_phys;
        block.offset = payload_offset;
        self.blocks_compressed += 1;
        if self.curr == id {
            self.curr_ready = false;
        }
        Ok(raw)
    }

    /// Append an empty physical block to the compressed chain
    fn extend_chain(&mut self) -> Result<PhysId> {
        let buffer = match self.recycled.pop() {
            Some(buffer) => buffer,
            None => self.alloc_phys()?,
        };
        let id = self.phys.insert(PhysicalBlock {
            data: buffer,
            data_limit: Some(0),
            link: None,
        });
        if let Some(&last) = self.chain.last() {
            self.phys[last].link = Some(id);
        }
        self.chain.push(id);
        Ok(id)
    }

    /// Read up to `buf.len()` bytes from the current position
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let available = self.length - self.pos;
        let want = buf.len().min(usize::try_from(available).unwrap_or(usize::MAX));
        let block_size = self.config.block_size as u64;

        let mut done = 0;
        while done < want {
            let offset = (self.pos % block_size) as usize;
            let id = match self.locate(self.pos / block_size) {
                Ok(id) => id,
                Err(err) => {
                    self.fail(err);
                    break;
                }
            };
            if let Err(err) = self.ensure_current() {
                self.fail(err);
                break;
            }
            let n = (self.config.block_size - offset).min(want - done);
            let Some(bytes) = self.block_bytes(id) else {
                self.fail(Error::Fatal(format!("{} is not materialized", id)));
                break;
            };
            buf[done..done + n].copy_from_slice(&bytes[offset..offset + n]);
            done += n;
            self.pos += n as u64;
        }
        done
    }

    /// Move the read/write position
    ///
    /// `End` adds `offset` to the length, as `std::io::SeekFrom::End` does, so
    /// positions before the end take a negative offset. The result must lie in
    /// `0..=len()`; otherwise `RangeCheck` is returned and the position and
    /// error state are left alone.
    pub fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64> {
        let base = match mode {
            SeekMode::Set => 0,
            SeekMode::Cur => self.pos as i64,
            SeekMode::End => self.length as i64,
        };
        let target = base
            .checked_add(offset)
            .filter(|target| *target >= 0 && *target as u64 <= self.length)
            .ok_or(Error::RangeCheck {
                position: base.saturating_add(offset),
                length: self.length,
            })?;

        self.pos = target as u64;
        let result = self
            .locate(self.pos / self.config.block_size as u64)
            .and_then(|_| self.ensure_current());
        if let Err(err) = &result {
            self.fail(err.clone());
        }
        result.map(|_| self.pos)
    }

    /// Current position
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// File length in bytes
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Return to position 0, discarding the content when `discard` is set
    pub fn rewind(&mut self, discard: bool) -> Result<()> {
        if discard {
            self.reset();
            return Ok(());
        }
        self.seek(0, SeekMode::Set).map(|_| ())
    }

    /// 0 when healthy, [`LOW_MEMORY_ADVISORY`] after a reserve draw, or the
    /// negative code of the sticky error
    pub fn ferror_code(&self) -> i32 {
        match &self.error {
            Some(err) => err.code(),
            None if self.low_memory => LOW_MEMORY_ADVISORY,
            None => 0,
        }
    }

    /// The sticky error, if any
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether reserve memory has been spent since the last memory warning
    pub fn is_low_memory(&self) -> bool {
        self.low_memory
    }

    pub fn config(&self) -> &MemFileConfig {
        &self.config
    }

    /// Get memory file statistics
    pub fn stats(&self) -> MemFileStats {
        MemFileStats {
            length: self.length,
            total_space: self.total_space,
            logical_blocks: self.logs.len(),
            physical_blocks: self.phys.len(),
            chain_blocks: self.chain.len(),
            blocks_compressed: self.blocks_compressed,
            compressing: self.compressing,
            reserve_phys: self.reserve.phys_count(),
            reserve_log: self.reserve.log_count(),
            reserve_draws: self.reserve.draws(),
            reserve_bytes: self.reserve.reserved_bytes(),
            cache: self
                .raw_cache
                .as_ref()
                .map(RawCache::stats)
                .unwrap_or_default(),
        }
    }

    /// Block ids of the raw cache, most recently used first
    pub fn cached_blocks(&self) -> Vec<LogId> {
        self.raw_cache
            .as_ref()
            .map(RawCache::lru_order)
            .unwrap_or_default()
    }

    /// Close the file; only deleting close is supported
    pub fn close(mut self, delete: bool) -> Result<()> {
        if !delete {
            return Err(Error::InvalidFileAccess(
                "memory files can only be closed with delete".to_string(),
            ));
        }
        debug!(
            reserved_bytes = self.reserve.reserved_bytes(),
            "releasing memory file reserve"
        );
        self.reserve.release();
        Ok(())
    }

    /// Walk the read cursor to block `index`, clamped to the tail
    fn locate(&mut self, index: u64) -> Result<LogId> {
        let index = index.min(self.block_count - 1);
        if index < self.curr_index {
            self.curr = self.head;
            self.curr_index = 0;
            self.curr_ready = false;
        }
        while self.curr_index < index {
            let Some(next) = self.logs[self.curr].link else {
                error!(index, blocks = self.block_count, "logical chain ends early");
                return Err(Error::Fatal("logical chain shorter than file".to_string()));
            };
            self.curr = next;
            self.curr_index += 1;
            self.curr_ready = false;
        }
        Ok(self.curr)
    }

    fn ensure_current(&mut self) -> Result<()> {
        if !self.curr_ready {
            self.materialize(self.curr)?;
            self.curr_ready = true;
        }
        Ok(())
    }

    /// Make the bytes of `id` addressable, decompressing into the cache if
    /// needed
    fn materialize(&mut self, id: LogId) -> Result<()> {
        let phys_id = self.logs[id].phys;
        if self.phys[phys_id].is_raw() {
            return Ok(());
        }
        self.ensure_cache()?;
        let Some(cache) = self.raw_cache.as_mut() else {
            return Err(Error::Fatal("raw cache missing".to_string()));
        };
        if cache.touch(id) {
            return Ok(());
        }

        let Some((mut buffer, evicted)) = cache.claim() else {
            error!(block = %id, "raw cache has no buffer to claim");
            return Err(Error::Fatal("raw cache has no buffer to claim".to_string()));
        };
        if let Some(evicted) = evicted {
            trace!(%evicted, block = %id, "raw cache eviction");
        }

        let offset = self.logs[id].offset;
        let block = &self.phys[phys_id];
        let first = block.compressed_from(offset);
        let second = block.link.map(|link| self.phys[link].compressed_from(0));
        let decoded = self
            .decompressor
            .reinit()
            .and_then(|_| decode_span(&mut *self.decompressor, first, second, &mut buffer));

        match decoded {
            Ok(n) if n == self.config.block_size => {
                cache.install(id, buffer);
                Ok(())
            }
            Ok(n) => {
                cache.restore(buffer);
                error!(block = %id, decoded = n, "decompressed block has the wrong size");
                Err(Error::Fatal(format!(
                    "{} decompressed to {} bytes, expected {}",
                    id, n, self.config.block_size
                )))
            }
            Err(err) => {
                cache.restore(buffer);
                Err(err)
            }
        }
    }

    /// Build the raw cache on first use
    fn ensure_cache(&mut self) -> Result<()> {
        if self.raw_cache.is_some() {
            return Ok(());
        }
        let block_size = self.config.block_size;
        let wanted = (self.block_count as usize / self.config.blocks_per_raw_buffer)
            .max(self.config.min_raw_buffers);

        let first = match self.reserve.take_phys() {
            Some(buffer) => buffer,
            None => BlockBuffer::allocate(&self.allocator, block_size, RAW_TAG)
                .ok_or_else(|| Error::VmError("cannot allocate raw cache buffer".to_string()))?,
        };
        let mut buffers = Vec::with_capacity(wanted);
        buffers.push(first);
        while buffers.len() < wanted {
            match BlockBuffer::allocate(&self.allocator, block_size, RAW_TAG) {
                Some(buffer) => buffers.push(buffer),
                None => break,
            }
        }

        debug!(wanted, built = buffers.len(), "raw cache built");
        self.raw_cache = RawCache::with_buffers(buffers);
        Ok(())
    }

    fn block_bytes(&self, id: LogId) -> Option<&[u8]> {
        let block = &self.phys[self.logs[id].phys];
        if block.is_raw() {
            return Some(&block.data[..]);
        }
        self.raw_cache.as_ref()?.peek(id).map(|buffer| &buffer[..])
    }

    fn alloc_phys(&mut self) -> Result<BlockBuffer> {
        let buffer = match BlockBuffer::allocate(&self.allocator, self.config.block_size, PHYS_TAG) {
            Some(buffer) => buffer,
            None => {
                let buffer = self.reserve.take_phys().ok_or_else(|| {
                    Error::VmError("cannot allocate physical block".to_string())
                })?;
                self.low_memory = true;
                warn!(
                    remaining = self.reserve.phys_count(),
                    "physical block taken from reserve"
                );
                buffer
            }
        };
        self.total_space += buffer.charged();
        Ok(buffer)
    }

    fn alloc_log(&mut self) -> Result<Allocation> {
        let lease = match Allocation::acquire(&self.allocator, LOG_BLOCK_BYTES, LOG_TAG) {
            Some(lease) => lease,
            None => {
                let lease = self.reserve.take_log().ok_or_else(|| {
                    Error::VmError("cannot allocate logical block".to_string())
                })?;
                self.low_memory = true;
                warn!(
                    remaining = self.reserve.log_count(),
                    "logical block taken from reserve"
                );
                lease
            }
        };
        self.total_space += lease.bytes();
        Ok(lease)
    }

    fn discard_buffer(&mut self, buffer: BlockBuffer) {
        self.total_space = self.total_space.saturating_sub(buffer.charged());
    }

    fn free_phys(&mut self, id: PhysId) {
        if let Some(block) = self.phys.remove(id) {
            self.discard_buffer(block.data);
        }
    }

    fn fail(&mut self, err: Error) {
        match &err {
            Error::Fatal(_) => error!(error = %err, "memory file failed"),
            _ => warn!(error = %err, "memory file error"),
        }
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        self.compressor.release();
        self.decompressor.release();
        debug!(length = self.length, blocks = self.block_count, "memory file closed");
    }
}

impl fmt::Debug for MemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemFile")
            .field("mode", &self.mode)
            .field("algorithm", &self.algorithm)
            .field("pos", &self.pos)
            .field("length", &self.length)
            .field("blocks", &self.block_count)
            .field("compressing", &self.compressing)
            .field("error", &self.error)
            .finish()
    }
}
