use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::BLOCK_SIZE;
use crate::error::{Result, VfsError};

/// Raw fixed-size-block access to a byte-addressable container.
/// No caching: every call hits the container directly.
pub trait BlockStore {
    /// Returns the number of blocks the container holds.
    fn num_blocks(&self) -> u32;

    /// Reads one full block into `buf`.
    fn read_block(&mut self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    /// Writes `buf` to a block. `buf` may be shorter than a block;
    /// the remainder of the block is zero-filled.
    fn write_block(&mut self, block_id: u32, buf: &[u8]) -> Result<()>;

    /// Ensures all previous writes reached the container.
    fn flush(&mut self) -> Result<()>;

    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }
}

/// The emulated disk: a host file pre-sized to `total_blocks * BLOCK_SIZE`
/// at creation time and accessed with positioned reads and writes.
pub struct DiskImage {
    file: File,
    path: PathBuf,
    num_blocks: u32,
}

impl DiskImage {
    /// Creates (or truncates) the image file and sizes it to `total_bytes`.
    pub fn create(path: impl AsRef<Path>, total_bytes: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(total_bytes)?;
        Ok(DiskImage {
            file,
            path,
            num_blocks: (total_bytes / BLOCK_SIZE as u64) as u32,
        })
    }

    /// Opens an existing image file read/write. The block count comes from
    /// the file length; geometry validation happens at the volume layer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        Ok(DiskImage {
            file,
            path,
            num_blocks: (len / BLOCK_SIZE as u64) as u32,
        })
    }

    /// Closes the image and deletes the backing file.
    pub fn remove(self) -> Result<()> {
        let path = self.path.clone();
        drop(self);
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockStore for DiskImage {
    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn read_block(&mut self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(VfsError::InvalidBlockId(block_id));
        }
        self.file
            .seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, block_id: u32, buf: &[u8]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(VfsError::InvalidBlockId(block_id));
        }
        let mut block = [0u8; BLOCK_SIZE];
        let len = buf.len().min(BLOCK_SIZE);
        block[..len].copy_from_slice(&buf[..len]);
        self.file
            .seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(&block)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// Writes `bytes` across a run of blocks starting at `start`, zero-padding
/// up to `num_blocks * BLOCK_SIZE`. Used for the directory and FAT regions,
/// which are always persisted wholesale.
pub(crate) fn write_region<S: BlockStore>(
    store: &mut S,
    start: u32,
    num_blocks: u32,
    bytes: &[u8],
) -> Result<()> {
    for i in 0..num_blocks {
        let off = i as usize * BLOCK_SIZE;
        let chunk = if off < bytes.len() {
            &bytes[off..bytes.len().min(off + BLOCK_SIZE)]
        } else {
            &[]
        };
        store.write_block(start + i, chunk)?;
    }
    Ok(())
}

/// Reads `num_blocks` blocks starting at `start` into one contiguous buffer.
pub(crate) fn read_region<S: BlockStore>(
    store: &mut S,
    start: u32,
    num_blocks: u32,
) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; num_blocks as usize * BLOCK_SIZE];
    let mut buf = [0u8; BLOCK_SIZE];
    for i in 0..num_blocks {
        store.read_block(start + i, &mut buf)?;
        let off = i as usize * BLOCK_SIZE;
        bytes[off..off + BLOCK_SIZE].copy_from_slice(&buf);
    }
    Ok(bytes)
}
