//! Flat, fixed-capacity directory: `MAX_FILES` entries persisted wholesale
//! to the directory region. A slot is free when the first name byte is NUL;
//! free slots are reused first-fit, so slot order is not creation order.

use crate::block_store::{BlockStore, read_region, write_region};
use crate::codec::{i64_at, u32_at, u64_at};
use crate::config::*;
use crate::error::{Result, VfsError};
use crate::geometry::Geometry;

#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    pub name: [u8; MAX_NAME_LEN],
    pub size: u64,
    pub created: i64, // Unix seconds; fixed 64-bit on disk
    pub ftype: u8,
    pub first_block: u32,
}

pub(crate) fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

impl DirEntry {
    pub const EMPTY: Self = Self {
        name: [0; MAX_NAME_LEN],
        size: 0,
        created: 0,
        ftype: 0,
        first_block: 0,
    };

    /// Builds an active entry. The name must be non-empty and leave room
    /// for the trailing NUL in the fixed-width field.
    pub fn new(name: &str, size: u64, created: i64, first_block: u32) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_NAME_LEN - 1 || bytes.contains(&0) {
            return Err(VfsError::InvalidName(name.into()));
        }
        let mut field = [0u8; MAX_NAME_LEN];
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            name: field,
            size,
            created,
            ftype: TYPE_REGULAR,
            first_block,
        })
    }

    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    pub fn name_eq(&self, name: &str) -> bool {
        trim_zero(&self.name) == name.as_bytes()
    }

    pub fn name_string(&self) -> String {
        String::from_utf8_lossy(trim_zero(&self.name)).into_owned()
    }

    fn encode_into(&self, buf: &mut [u8]) {
        buf[0..32].copy_from_slice(&self.name);
        buf[32..40].copy_from_slice(&self.size.to_le_bytes());
        buf[40..48].copy_from_slice(&self.created.to_le_bytes());
        buf[48] = self.ftype;
        buf[49..53].copy_from_slice(&self.first_block.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        let mut name = [0u8; MAX_NAME_LEN];
        name.copy_from_slice(&buf[0..32]);
        Self {
            name,
            size: u64_at(buf, 32),
            created: i64_at(buf, 40),
            ftype: buf[48],
            first_block: u32_at(buf, 49),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Directory {
    entries: Vec<DirEntry>,
}

impl Directory {
    pub fn empty(geometry: &Geometry) -> Self {
        Self {
            entries: vec![DirEntry::EMPTY; geometry.max_files as usize],
        }
    }

    /// Case-sensitive exact match over active entries.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.is_free() && e.name_eq(name))
    }

    /// First free slot scanning from index 0, or `None` when full.
    pub fn alloc_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.is_free())
    }

    pub fn entry(&self, slot: usize) -> &DirEntry {
        &self.entries[slot]
    }

    pub fn set(&mut self, slot: usize, entry: DirEntry) {
        self.entries[slot] = entry;
    }

    pub fn clear(&mut self, slot: usize) {
        self.entries[slot] = DirEntry::EMPTY;
    }

    /// Active entries in slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_free())
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Writes the whole table to its region, zero-padded to block size.
    pub fn persist<S: BlockStore>(&self, store: &mut S, geometry: &Geometry) -> Result<()> {
        let mut bytes = vec![0u8; self.entries.len() * DIR_ENTRY_SIZE];
        for (i, entry) in self.entries.iter().enumerate() {
            entry.encode_into(&mut bytes[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE]);
        }
        write_region(store, geometry.dir_start, geometry.dir_blocks, &bytes)
    }

    /// Reads the whole table back from its region.
    pub fn load<S: BlockStore>(store: &mut S, geometry: &Geometry) -> Result<Self> {
        let bytes = read_region(store, geometry.dir_start, geometry.dir_blocks)?;
        let entries = (0..geometry.max_files as usize)
            .map(|i| DirEntry::decode(&bytes[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE]))
            .collect();
        Ok(Self { entries })
    }
}
