//! Reserve pools for low-memory writes
//!
//! A memory file keeps pre-allocated physical buffers and logical headers
//! aside so that writes already promised to the host succeed even after the
//! general allocator starts refusing requests.

use super::allocator::{Allocation, Allocator, BlockBuffer};
use super::block::LOG_BLOCK_BYTES;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::debug;

pub(crate) const RESERVE_PHYS_TAG: &str = "memfile reserve phys block";
pub(crate) const RESERVE_LOG_TAG: &str = "memfile reserve log block";

/// Pre-allocated blocks held back for a memory file
#[derive(Debug, Default)]
pub struct ReservePool {
    phys: Vec<BlockBuffer>,
    log: Vec<Allocation>,
    /// Blocks handed out since the pool was created
    draws: u64,
}

impl ReservePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow or shrink the pool to exactly the given counts
    ///
    /// Fails with `VmError` if the allocator refuses a block; blocks granted
    /// before the refusal stay in the pool.
    pub fn fill_to(
        &mut self,
        log_needed: usize,
        phys_needed: usize,
        allocator: &Arc<dyn Allocator>,
        block_size: usize,
    ) -> Result<()> {
        self.phys.truncate(phys_needed);
        self.log.truncate(log_needed);

        while self.phys.len() < phys_needed {
            let block = BlockBuffer::allocate(allocator, block_size, RESERVE_PHYS_TAG)
                .ok_or_else(|| Error::VmError("cannot fill physical block reserve".to_string()))?;
            self.phys.push(block);
        }
        while self.log.len() < log_needed {
            let header = Allocation::acquire(allocator, LOG_BLOCK_BYTES, RESERVE_LOG_TAG)
                .ok_or_else(|| Error::VmError("cannot fill logical block reserve".to_string()))?;
            self.log.push(header);
        }

        debug!(
            phys = self.phys.len(),
            log = self.log.len(),
            "reserve pool resized"
        );
        Ok(())
    }

    /// Take one reserved physical buffer
    pub fn take_phys(&mut self) -> Option<BlockBuffer> {
        let block = self.phys.pop()?;
        self.draws += 1;
        Some(block)
    }

    /// Take one reserved logical header
    pub fn take_log(&mut self) -> Option<Allocation> {
        let header = self.log.pop()?;
        self.draws += 1;
        Some(header)
    }

    pub fn phys_count(&self) -> usize {
        self.phys.len()
    }

    pub fn log_count(&self) -> usize {
        self.log.len()
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Bytes held by the pool
    pub fn reserved_bytes(&self) -> usize {
        self.phys.iter().map(BlockBuffer::charged).sum::<usize>()
            + self.log.iter().map(Allocation::bytes).sum::<usize>()
    }

    /// Give every reserved block back to the allocator
    pub fn release(&mut self) {
        self.phys.clear();
        self.log.clear();
    }
}
