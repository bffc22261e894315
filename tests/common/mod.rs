#![allow(dead_code)]

//! Shared test helpers: an in-memory block store and logging setup.

use std::sync::{Arc, Mutex};

use ttvfs::{BLOCK_SIZE, BlockStore, Error, Result};

/// In-memory block store backed by a shared byte buffer. Cloned handles
/// see the same bytes, which lets a test format a volume through one
/// handle and reopen (or corrupt) it through another.
#[derive(Clone)]
pub struct RamStore {
    inner: Arc<Mutex<Vec<u8>>>,
    num_blocks: u32,
}

impl RamStore {
    pub fn new(num_blocks: u32) -> Self {
        RamStore {
            inner: Arc::new(Mutex::new(vec![0u8; num_blocks as usize * BLOCK_SIZE])),
            num_blocks,
        }
    }

    /// Overwrites raw bytes at `offset`. Used to fabricate corruption.
    pub fn poke(&self, offset: usize, bytes: &[u8]) {
        let mut data = self.inner.lock().unwrap();
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl BlockStore for RamStore {
    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn read_block(&mut self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(Error::InvalidBlockId(block_id));
        }
        let data = self.inner.lock().unwrap();
        let start = block_id as usize * BLOCK_SIZE;
        buf.copy_from_slice(&data[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&mut self, block_id: u32, buf: &[u8]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(Error::InvalidBlockId(block_id));
        }
        let mut data = self.inner.lock().unwrap();
        let start = block_id as usize * BLOCK_SIZE;
        let len = buf.len().min(BLOCK_SIZE);
        data[start..start + len].copy_from_slice(&buf[..len]);
        data[start + len..start + BLOCK_SIZE].fill(0);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic payload for round-trip tests.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 13) as u8).collect()
}
