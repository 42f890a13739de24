//! Logical and physical blocks of a memory file
//!
//! Blocks live in arenas and refer to each other by handle, so chains can be
//! relinked and blocks reused without dangling references.

use super::allocator::{Allocation, BlockBuffer};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Handle types stored in an [`Arena`]
pub trait ArenaId: Copy + Eq {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl ArenaId for $name {
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

arena_id!(
    /// Handle of a logical block
    LogId,
    "log"
);
arena_id!(
    /// Handle of a physical block
    PhysId,
    "phys"
);

/// One window of the logical byte stream
#[derive(Debug)]
pub struct LogicalBlock {
    /// Next logical block of the file
    pub link: Option<LogId>,
    /// Physical block holding this block's bytes (raw or compressed)
    pub phys: PhysId,
    /// Start of this block's compressed payload inside `phys`
    pub offset: usize,
    _lease: Allocation,
}

impl LogicalBlock {
    pub fn new(phys: PhysId, lease: Allocation) -> Self {
        Self {
            link: None,
            phys,
            offset: 0,
            _lease: lease,
        }
    }
}

/// Bytes charged per logical block header
pub const LOG_BLOCK_BYTES: usize = std::mem::size_of::<LogicalBlock>();

/// Backing buffer of one or more logical blocks
#[derive(Debug)]
pub struct PhysicalBlock {
    pub data: BlockBuffer,
    /// `None` while the block holds raw bytes; the end of the compressed
    /// bytes otherwise
    pub data_limit: Option<usize>,
    /// Continuation of the compressed chain
    pub link: Option<PhysId>,
}

impl PhysicalBlock {
    pub fn raw(data: BlockBuffer) -> Self {
        Self {
            data,
            data_limit: None,
            link: None,
        }
    }

    pub fn is_raw(&self) -> bool {
        self.data_limit.is_none()
    }

    /// Compressed bytes stored from `start`
    pub fn compressed_from(&self, start: usize) -> &[u8] {
        let end = self.data_limit.unwrap_or(0).max(start);
        &self.data[start..end]
    }
}

/// Slot storage addressed by typed handles; freed slots are reused
#[derive(Debug)]
pub struct Arena<I: ArenaId, T> {
    slots: Vec<Option<T>>,
    free: Vec<I>,
    len: usize,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> I {
        self.len += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(value);
                id
            }
            None => {
                self.slots.push(Some(value));
                I::from_index(self.slots.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        let value = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Shared access to `read` alongside exclusive access to `write`
    pub fn pair_mut(&mut self, read: I, write: I) -> (&T, &mut T) {
        let (r, w) = (read.index(), write.index());
        assert_ne!(r, w, "arena pair must name two distinct slots");
        let (reader, writer) = if r < w {
            let (low, high) = self.slots.split_at_mut(w);
            (&low[r], &mut high[0])
        } else {
            let (low, high) = self.slots.split_at_mut(r);
            (&high[0], &mut low[w])
        };
        match (reader.as_ref(), writer.as_mut()) {
            (Some(reader), Some(writer)) => (reader, writer),
            _ => panic!("arena pair refers to a freed slot"),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<I: ArenaId + fmt::Display, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        match self.get(id) {
            Some(value) => value,
            None => panic!("{} is not live", id),
        }
    }
}

impl<I: ArenaId + fmt::Display, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        match self.get_mut(id) {
            Some(value) => value,
            None => panic!("{} is not live", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_reuses_freed_slots() {
        let mut arena: Arena<PhysId, &str> = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.remove(a), Some("a"));
        assert_eq!(arena.remove(a), None);
        assert!(arena.get(a).is_none());

        let c = arena.insert("c");
        assert_eq!(c, a);
        assert_eq!(arena[c], "c");
        assert_eq!(arena[b], "b");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_arena_pair_mut() {
        let mut arena: Arena<LogId, Vec<u8>> = Arena::new();
        let src = arena.insert(vec![1, 2, 3]);
        let dst = arena.insert(vec![0, 0, 0]);

        let (read, write) = arena.pair_mut(src, dst);
        write.copy_from_slice(read);
        assert_eq!(arena[dst], vec![1, 2, 3]);

        let (read, write) = arena.pair_mut(dst, src);
        write[0] = read[2];
        assert_eq!(arena[src], vec![3, 2, 3]);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(LogId::from_index(4).to_string(), "log#4");
        assert_eq!(PhysId::from_index(7).to_string(), "phys#7");
    }
}
