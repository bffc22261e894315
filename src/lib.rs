//! ttvfs is a minimal FAT-style file system hosted inside a single disk
//! image file. Flat namespace only: no sub-directories, no permissions, no
//! caching, no concurrent access.
//!
//! Linear layout of a volume:
//! - Geometry record (block 0): fixed partition layout, validated by magic
//! - Directory: flat table of `MAX_FILES` fixed-width entries
//! - Allocation table (FAT): one chain pointer per block
//! - Data blocks
//!
//! Layers, bottom to top:
//! 1. Block store: positioned fixed-size block I/O against the image file.
//! 2. Geometry: layout computation, persisted once at format time.
//! 3. Directory / FAT: in-memory tables, persisted wholesale together at
//!    the end of every mutating operation.
//! 4. Volume: the handle external callers drive (format, open, import,
//!    export, delete, list, block map). One handle per opened volume;
//!    nothing is global.

mod block_store;
mod codec;
mod config;
mod directory;
mod error;
mod fat;
mod geometry;
mod volume;

pub use block_store::{BlockStore, DiskImage};
pub use config::*;
pub use directory::{DirEntry, Directory};
pub use error::Result;
pub use error::VfsError as Error;
pub use fat::{FAT_EOF, FAT_FREE, FAT_RESERVED, Fat};
pub use geometry::Geometry;
pub use volume::{BlockClass, FileInfo, MapRange, Volume};
