//! The allocation table: one signed 32-bit entry per block. An entry is
//! either `FAT_FREE`, `FAT_EOF` (last block of a chain), `FAT_RESERVED`
//! (geometry/directory/FAT blocks, never handed to files), or the index of
//! the next block in the same file's chain. Successors are logical indices
//! into this table, never pointers.

use crate::block_store::{BlockStore, read_region, write_region};
use crate::codec::i32_at;
use crate::config::FAT_ENTRY_SIZE;
use crate::error::{Result, VfsError};
use crate::geometry::Geometry;

pub const FAT_FREE: i32 = 0;
pub const FAT_EOF: i32 = -1;
pub const FAT_RESERVED: i32 = -2;

#[derive(Debug, Clone)]
pub struct Fat {
    entries: Vec<i32>,
    data_start: u32,
}

impl Fat {
    /// Freshly formatted table: metadata blocks reserved, the rest free.
    pub fn formatted(geometry: &Geometry) -> Self {
        let mut entries = vec![FAT_FREE; geometry.total_blocks as usize];
        for entry in entries.iter_mut().take(geometry.data_start as usize) {
            *entry = FAT_RESERVED;
        }
        Self {
            entries,
            data_start: geometry.data_start,
        }
    }

    pub fn get(&self, block_id: u32) -> i32 {
        self.entries[block_id as usize]
    }

    pub fn total_blocks(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn free_count(&self) -> u32 {
        self.entries.iter().filter(|&&e| e == FAT_FREE).count() as u32
    }

    /// Collects `count` free blocks scanning upward from the data region,
    /// in ascending index order. The run is not necessarily contiguous.
    pub fn find_free_run(&self, count: u32) -> Result<Vec<u32>> {
        let mut blocks = Vec::with_capacity(count as usize);
        for i in self.data_start..self.entries.len() as u32 {
            if blocks.len() as u32 == count {
                break;
            }
            if self.entries[i as usize] == FAT_FREE {
                blocks.push(i);
            }
        }
        if blocks.len() as u32 == count {
            Ok(blocks)
        } else {
            Err(VfsError::OutOfSpace {
                needed: count,
                free: blocks.len() as u32,
            })
        }
    }

    /// Chains the blocks in order: each entry points at its successor, the
    /// last is marked `FAT_EOF`.
    pub fn link_chain(&mut self, blocks: &[u32]) {
        for (i, &block) in blocks.iter().enumerate() {
            self.entries[block as usize] = match blocks.get(i + 1) {
                Some(&next) => next as i32,
                None => FAT_EOF,
            };
        }
    }

    /// Frees a chain starting at `start`, stopping at `FAT_EOF` or at a
    /// `FAT_RESERVED` entry. A reserved entry ends the walk without being
    /// touched, so a corrupt chain can never free metadata blocks.
    /// Returns the number of blocks freed.
    pub fn free_chain(&mut self, start: u32) -> u32 {
        let mut freed = 0;
        let mut block = start as i32;
        while block >= 0 && (block as usize) < self.entries.len() {
            let next = self.entries[block as usize];
            if next == FAT_RESERVED {
                break;
            }
            self.entries[block as usize] = FAT_FREE;
            freed += 1;
            block = next;
        }
        freed
    }

    /// Iterates the chain starting at `start` until a negative marker or an
    /// out-of-range index. Bounded by the table length, so a cyclic chain
    /// in a corrupted table cannot loop forever.
    pub fn chain(&self, start: u32) -> Chain<'_> {
        Chain {
            fat: self,
            current: start as i64,
            steps: 0,
        }
    }

    pub fn persist<S: BlockStore>(&self, store: &mut S, geometry: &Geometry) -> Result<()> {
        let mut bytes = vec![0u8; self.entries.len() * FAT_ENTRY_SIZE];
        for (i, entry) in self.entries.iter().enumerate() {
            bytes[i * FAT_ENTRY_SIZE..(i + 1) * FAT_ENTRY_SIZE]
                .copy_from_slice(&entry.to_le_bytes());
        }
        write_region(store, geometry.fat_start, geometry.fat_blocks, &bytes)
    }

    pub fn load<S: BlockStore>(store: &mut S, geometry: &Geometry) -> Result<Self> {
        let bytes = read_region(store, geometry.fat_start, geometry.fat_blocks)?;
        let entries = (0..geometry.total_blocks as usize)
            .map(|i| i32_at(&bytes, i * FAT_ENTRY_SIZE))
            .collect();
        Ok(Self {
            entries,
            data_start: geometry.data_start,
        })
    }
}

pub struct Chain<'a> {
    fat: &'a Fat,
    current: i64,
    steps: usize,
}

impl Iterator for Chain<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current < 0
            || self.current as usize >= self.fat.entries.len()
            || self.steps > self.fat.entries.len()
        {
            return None;
        }
        let block = self.current as u32;
        let successor = self.fat.entries[block as usize];
        if successor == FAT_RESERVED {
            return None;
        }
        self.current = successor as i64;
        self.steps += 1;
        Some(block)
    }
}
