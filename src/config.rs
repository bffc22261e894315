pub const MAGIC: [u8; 8] = *b"TTvfs01\0"; // Identifies a ttvfs volume

pub const BLOCK_SIZE: usize = 512;
pub const GEOMETRY_BLOCK_ID: u32 = 0; // Block ID of the geometry record
pub const DIR_START_BLOCK: u32 = 1; // Directory always follows the geometry block
pub const DEFAULT_VOLUME_SIZE: u64 = 10 * 1024 * 1024; // 10 MiB when no size is requested

pub const MAX_FILES: usize = 64; // Fixed directory capacity
pub const MAX_NAME_LEN: usize = 32; // Name field width; last byte stays NUL
pub const DIR_ENTRY_SIZE: usize = 53; // name + size + created + type + first_block
pub const GEOMETRY_SIZE: usize = 40; // magic + eight u32 fields
pub const FAT_ENTRY_SIZE: usize = 4; // one i32 per block

pub const TYPE_REGULAR: u8 = b'F'; // Only file type currently defined
