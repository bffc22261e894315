//! The volume handle: the only surface external callers drive. It owns the
//! backing store plus the in-memory geometry, directory and FAT, and keeps
//! the in-memory tables equal to the persisted ones at every operation
//! boundary. Mutating operations rewrite both tables together, after all
//! data blocks have been written.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::block_store::{BlockStore, DiskImage};
use crate::config::BLOCK_SIZE;
use crate::directory::{DirEntry, Directory};
use crate::error::{Result, VfsError};
use crate::fat::{FAT_FREE, Fat};
use crate::geometry::Geometry;

/// One `list()` row: an active directory entry in slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub created: i64,
    pub ftype: char,
}

/// Classification of a block for map reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockClass {
    Geometry,
    Directory,
    Fat,
    Free,
    File(String),
    /// Marked in use in the FAT but reachable from no file's chain. Only a
    /// corrupted table produces this; it is reported, never repaired.
    Orphan,
}

impl BlockClass {
    pub fn is_free(&self) -> bool {
        matches!(self, BlockClass::Free)
    }
}

/// An inclusive run of blocks sharing one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRange {
    pub start: u32,
    pub end: u32,
    pub class: BlockClass,
}

pub struct Volume<S: BlockStore> {
    store: S,
    geometry: Geometry,
    directory: Directory,
    fat: Fat,
}

impl<S: BlockStore> Volume<S> {
    /// Formats `store` as an empty volume of `requested_bytes` (rounded up
    /// to a block multiple; zero means the default size). The store must be
    /// at least as large as the computed extent.
    pub fn format(mut store: S, requested_bytes: u64) -> Result<Self> {
        let geometry = Geometry::compute(requested_bytes);
        if store.num_blocks() < geometry.total_blocks {
            return Err(VfsError::StoreTooSmall {
                needed: geometry.total_blocks,
                actual: store.num_blocks(),
            });
        }
        // A volume must at least hold its own metadata regions.
        if geometry.total_blocks < geometry.data_start {
            return Err(VfsError::StoreTooSmall {
                needed: geometry.data_start,
                actual: geometry.total_blocks,
            });
        }

        geometry.persist(&mut store)?;
        let directory = Directory::empty(&geometry);
        directory.persist(&mut store, &geometry)?;
        let fat = Fat::formatted(&geometry);
        fat.persist(&mut store, &geometry)?;
        store.flush()?;

        info!(
            "formatted volume: {} bytes, {} blocks, data starts at block {}",
            geometry.total_bytes(),
            geometry.total_blocks,
            geometry.data_start
        );
        Ok(Self {
            store,
            geometry,
            directory,
            fat,
        })
    }

    /// Loads an existing volume: geometry first (magic check), then both
    /// tables.
    pub fn open(mut store: S) -> Result<Self> {
        let geometry = Geometry::load(&mut store)?;
        let directory = Directory::load(&mut store, &geometry)?;
        let fat = Fat::load(&mut store, &geometry)?;
        debug!(
            "opened volume: {} blocks, {} free",
            geometry.total_blocks,
            fat.free_count()
        );
        Ok(Self {
            store,
            geometry,
            directory,
            fat,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn free_blocks(&self) -> u32 {
        self.fat.free_count()
    }

    pub fn fat(&self) -> &Fat {
        &self.fat
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Stores `data` under `name`. All validation happens before anything
    /// is touched; data blocks are written before the in-memory tables are
    /// linked, so a failed write leaves both the in-memory and persisted
    /// state exactly as they were.
    pub fn import_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(VfsError::SourceUnreadable(name.into()));
        }
        if self.directory.find_by_name(name).is_some() {
            return Err(VfsError::AlreadyExists(name.into()));
        }
        let slot = self.directory.alloc_slot().ok_or(VfsError::DirectoryFull)?;
        let blocks_needed = data.len().div_ceil(BLOCK_SIZE) as u32;
        let blocks = self.fat.find_free_run(blocks_needed)?;
        let entry = DirEntry::new(name, data.len() as u64, unix_now(), blocks[0])?;

        for (i, &block) in blocks.iter().enumerate() {
            let off = i * BLOCK_SIZE;
            let chunk = &data[off..data.len().min(off + BLOCK_SIZE)];
            self.store.write_block(block, chunk)?;
        }

        self.fat.link_chain(&blocks);
        self.directory.set(slot, entry);
        self.persist_tables()?;

        info!(
            "imported '{}' ({} bytes, {} blocks, first block {})",
            name,
            data.len(),
            blocks_needed,
            blocks[0]
        );
        Ok(())
    }

    /// Imports a host file, deriving the volume name by stripping any path
    /// prefix. An unreadable or empty source is a single error kind.
    pub fn import_file(&mut self, host_path: impl AsRef<Path>) -> Result<()> {
        let host_path = host_path.as_ref();
        let display = host_path.display().to_string();
        let name = host_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| VfsError::SourceUnreadable(display.clone()))?;
        let data = fs::read(host_path).map_err(|_| VfsError::SourceUnreadable(display.clone()))?;
        if data.is_empty() {
            return Err(VfsError::SourceUnreadable(display));
        }
        self.import_bytes(name, &data)
    }

    /// Reads a file's contents back by walking its chain, taking
    /// `min(block size, remaining)` per block until the declared size is
    /// exhausted or a negative marker ends the chain early.
    pub fn export_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let slot = self
            .directory
            .find_by_name(name)
            .ok_or_else(|| VfsError::NotFound(name.into()))?;
        let entry = *self.directory.entry(slot);

        let mut data = Vec::with_capacity(entry.size as usize);
        let mut remaining = entry.size as usize;
        let mut buf = [0u8; BLOCK_SIZE];
        for block in self.fat.chain(entry.first_block) {
            if remaining == 0 {
                break;
            }
            self.store.read_block(block, &mut buf)?;
            let take = remaining.min(BLOCK_SIZE);
            data.extend_from_slice(&buf[..take]);
            remaining -= take;
        }
        debug!("exported '{}' ({} bytes)", name, data.len());
        Ok(data)
    }

    /// Exports a file to the host. An absent destination defaults to the
    /// bare file name in the current directory. Returns the path written.
    pub fn export_file(&mut self, name: &str, dest: Option<&Path>) -> Result<PathBuf> {
        let data = self.export_bytes(name)?;
        let out_path = match dest {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(name),
        };
        fs::write(&out_path, &data)?;
        info!("exported '{}' to '{}'", name, out_path.display());
        Ok(out_path)
    }

    /// Removes a file: frees its whole chain, clears the slot, persists
    /// both tables.
    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        let slot = self
            .directory
            .find_by_name(name)
            .ok_or_else(|| VfsError::NotFound(name.into()))?;
        let first_block = self.directory.entry(slot).first_block;

        let freed = self.fat.free_chain(first_block);
        self.directory.clear(slot);
        self.persist_tables()?;

        info!("deleted '{}' ({} blocks freed)", name, freed);
        Ok(())
    }

    /// Active entries in directory slot order.
    pub fn list(&self) -> Vec<FileInfo> {
        self.directory
            .iter_active()
            .map(|(_, e)| FileInfo {
                name: e.name_string(),
                size: e.size,
                created: e.created,
                ftype: e.ftype as char,
            })
            .collect()
    }

    /// Classifies every block and coalesces adjacent identical
    /// classifications into inclusive ranges.
    pub fn block_map(&self) -> Vec<MapRange> {
        let mut ranges: Vec<MapRange> = Vec::new();
        for block in 0..self.geometry.total_blocks {
            let class = self.classify(block);
            match ranges.last_mut() {
                Some(range) if range.class == class => range.end = block,
                _ => ranges.push(MapRange {
                    start: block,
                    end: block,
                    class,
                }),
            }
        }
        ranges
    }

    fn classify(&self, block: u32) -> BlockClass {
        let g = &self.geometry;
        if block < g.dir_start {
            return BlockClass::Geometry;
        }
        if block < g.fat_start {
            return BlockClass::Directory;
        }
        if block < g.data_start {
            return BlockClass::Fat;
        }
        if self.fat.get(block) == FAT_FREE {
            return BlockClass::Free;
        }
        // First entry in slot order whose chain visits this block wins.
        for (_, entry) in self.directory.iter_active() {
            if self.fat.chain(entry.first_block).any(|b| b == block) {
                return BlockClass::File(entry.name_string());
            }
        }
        BlockClass::Orphan
    }

    /// Directory and FAT are always written together, after data blocks;
    /// a failure before this point leaves the persisted metadata unchanged.
    fn persist_tables(&mut self) -> Result<()> {
        self.directory.persist(&mut self.store, &self.geometry)?;
        self.fat.persist(&mut self.store, &self.geometry)?;
        self.store.flush()
    }
}

impl Volume<DiskImage> {
    /// Creates and formats a new image file at `path`.
    pub fn create(path: impl AsRef<Path>, requested_bytes: u64) -> Result<Self> {
        let geometry = Geometry::compute(requested_bytes);
        let store = DiskImage::create(path, geometry.total_bytes())?;
        Self::format(store, requested_bytes)
    }

    /// Opens an existing image file at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(DiskImage::open(path)?)
    }

    /// Closes the volume and deletes its backing image file.
    pub fn remove(self) -> Result<()> {
        let path = self.store.path().display().to_string();
        self.store.remove()?;
        info!("removed volume '{}'", path);
        Ok(())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
