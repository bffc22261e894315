use thiserror::Error;

/// Every fallible operation in the crate reports one of these.
/// None of them is fatal; the caller decides whether to abort.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("backing store unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a ttvfs volume (bad magic in block 0)")]
    InvalidMagic,
    #[error("block {0} is out of range for this store")]
    InvalidBlockId(u32),
    #[error("backing store too small: {needed} blocks needed, {actual} present")]
    StoreTooSmall { needed: u32, actual: u32 },
    #[error("file name '{0}' is empty or too long")]
    InvalidName(String),
    #[error("file '{0}' already exists on the volume")]
    AlreadyExists(String),
    #[error("directory is full")]
    DirectoryFull,
    #[error("source file '{0}' is empty or unreadable")]
    SourceUnreadable(String),
    #[error("not enough free space: {needed} blocks needed, {free} free")]
    OutOfSpace { needed: u32, free: u32 },
    #[error("file '{0}' not found on the volume")]
    NotFound(String),
}

pub type Result<T> = core::result::Result<T, VfsError>;
