//! The geometry record lives in block 0 and fixes the partition layout for
//! the lifetime of the volume. It is written once at format time and only
//! validated (magic match) afterwards.

use crate::block_store::BlockStore;
use crate::codec::u32_at;
use crate::config::*;
use crate::error::{Result, VfsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: u32,
    pub total_blocks: u32,
    pub max_files: u32,
    pub dir_start: u32,
    pub dir_blocks: u32,
    pub fat_start: u32,
    pub fat_blocks: u32,
    pub data_start: u32,
}

impl Geometry {
    /// Lays out a volume for `requested_bytes`. A zero request falls back to
    /// the default size; anything else is rounded up to a block multiple.
    pub fn compute(requested_bytes: u64) -> Self {
        let bytes = if requested_bytes == 0 {
            DEFAULT_VOLUME_SIZE
        } else {
            requested_bytes
        };
        let total_blocks = bytes.div_ceil(BLOCK_SIZE as u64) as u32;

        let dir_bytes = MAX_FILES * DIR_ENTRY_SIZE;
        let dir_blocks = dir_bytes.div_ceil(BLOCK_SIZE) as u32;
        let fat_bytes = total_blocks as usize * FAT_ENTRY_SIZE;
        let fat_blocks = fat_bytes.div_ceil(BLOCK_SIZE) as u32;
        let fat_start = DIR_START_BLOCK + dir_blocks;

        Geometry {
            block_size: BLOCK_SIZE as u32,
            total_blocks,
            max_files: MAX_FILES as u32,
            dir_start: DIR_START_BLOCK,
            dir_blocks,
            fat_start,
            fat_blocks,
            data_start: fat_start + fat_blocks,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_blocks as u64 * self.block_size as u64
    }

    /// Number of blocks available to file data.
    pub fn data_blocks(&self) -> u32 {
        self.total_blocks.saturating_sub(self.data_start)
    }

    fn encode(&self) -> [u8; GEOMETRY_SIZE] {
        let mut buf = [0u8; GEOMETRY_SIZE];
        buf[0..8].copy_from_slice(&MAGIC);
        buf[8..12].copy_from_slice(&self.block_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.total_blocks.to_le_bytes());
        buf[16..20].copy_from_slice(&self.max_files.to_le_bytes());
        buf[20..24].copy_from_slice(&self.dir_start.to_le_bytes());
        buf[24..28].copy_from_slice(&self.dir_blocks.to_le_bytes());
        buf[28..32].copy_from_slice(&self.fat_start.to_le_bytes());
        buf[32..36].copy_from_slice(&self.fat_blocks.to_le_bytes());
        buf[36..40].copy_from_slice(&self.data_start.to_le_bytes());
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf[0..8] != MAGIC {
            return Err(VfsError::InvalidMagic);
        }
        Ok(Geometry {
            block_size: u32_at(buf, 8),
            total_blocks: u32_at(buf, 12),
            max_files: u32_at(buf, 16),
            dir_start: u32_at(buf, 20),
            dir_blocks: u32_at(buf, 24),
            fat_start: u32_at(buf, 28),
            fat_blocks: u32_at(buf, 32),
            data_start: u32_at(buf, 36),
        })
    }

    /// Writes the record to block 0, zero-padding the remainder.
    pub fn persist<S: BlockStore>(&self, store: &mut S) -> Result<()> {
        store.write_block(GEOMETRY_BLOCK_ID, &self.encode())
    }

    /// Reads block 0 and fails with `InvalidMagic` if the volume tag does
    /// not match.
    pub fn load<S: BlockStore>(store: &mut S) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        store.read_block(GEOMETRY_BLOCK_ID, &mut buf)?;
        Self::decode(&buf)
    }
}
