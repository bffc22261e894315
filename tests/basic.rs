mod common;

use common::{RamStore, init_logging, payload};
use ttvfs::{BLOCK_SIZE, BlockClass, DEFAULT_VOLUME_SIZE, Error, FAT_EOF, Geometry, Volume};

const VOL_BLOCKS: u32 = 128;
const VOL_BYTES: u64 = VOL_BLOCKS as u64 * BLOCK_SIZE as u64;

// Layout for a 128-block volume: geometry at 0, directory 1..=7,
// FAT at 8, data from 9.
const DATA_START: u32 = 9;

fn fresh_volume() -> (RamStore, Volume<RamStore>) {
    init_logging();
    let store = RamStore::new(VOL_BLOCKS);
    let volume = Volume::format(store.clone(), VOL_BYTES).unwrap();
    (store, volume)
}

/// free + blocks chained to active files + reserved == total, after any
/// sequence of operations.
fn assert_conservation(volume: &Volume<RamStore>) {
    let chained: u32 = volume
        .list()
        .iter()
        .map(|f| f.size.div_ceil(BLOCK_SIZE as u64) as u32)
        .sum();
    let reserved = volume.geometry().data_start;
    assert_eq!(
        volume.free_blocks() + chained + reserved,
        volume.geometry().total_blocks
    );
}

#[test]
fn geometry_rounding() {
    let g = Geometry::compute(1000);
    assert_eq!(g.total_bytes(), 1024);
    assert_eq!(g.total_blocks, 2);

    let g = Geometry::compute(0);
    assert_eq!(g.total_bytes(), DEFAULT_VOLUME_SIZE);

    let g = Geometry::compute(VOL_BYTES);
    assert_eq!(g.total_blocks, VOL_BLOCKS);
    assert_eq!(g.dir_start, 1);
    assert_eq!(g.dir_blocks, 7);
    assert_eq!(g.fat_start, 8);
    assert_eq!(g.fat_blocks, 1);
    assert_eq!(g.data_start, DATA_START);
    assert_eq!(g.data_start, g.fat_start + g.fat_blocks);
    assert_eq!(g.data_start, g.dir_start + g.dir_blocks + g.fat_blocks);
}

#[test]
fn format_then_open() {
    let (store, volume) = fresh_volume();
    let formatted = *volume.geometry();
    drop(volume);

    let reopened = Volume::open(store).unwrap();
    assert_eq!(*reopened.geometry(), formatted);
    assert_eq!(reopened.free_blocks(), VOL_BLOCKS - DATA_START);
    assert!(reopened.list().is_empty());
}

#[test]
fn open_rejects_bad_magic() {
    let (store, volume) = fresh_volume();
    drop(volume);
    store.poke(0, b"XXXXXXXX");
    assert!(matches!(Volume::open(store), Err(Error::InvalidMagic)));
}

#[test]
fn format_rejects_undersized_store() {
    init_logging();
    let store = RamStore::new(10);
    assert!(matches!(
        Volume::format(store, VOL_BYTES),
        Err(Error::StoreTooSmall { .. })
    ));
}

#[test]
fn round_trip() {
    let (_, mut volume) = fresh_volume();

    // Partial final block, exact multiple, single byte.
    for (name, len) in [
        ("partial.bin", 1300),
        ("exact.bin", 2 * BLOCK_SIZE),
        ("tiny.bin", 1),
    ] {
        let data = payload(len);
        volume.import_bytes(name, &data).unwrap();
        assert_eq!(volume.export_bytes(name).unwrap(), data);
        assert_conservation(&volume);
    }
}

#[test]
fn round_trip_survives_reopen() {
    let (store, mut volume) = fresh_volume();
    let data = payload(5 * BLOCK_SIZE + 99);
    volume.import_bytes("keep.bin", &data).unwrap();
    drop(volume);

    let mut reopened = Volume::open(store).unwrap();
    assert_eq!(reopened.export_bytes("keep.bin").unwrap(), data);
}

#[test]
fn import_rejects_duplicate_name() {
    let (_, mut volume) = fresh_volume();
    volume.import_bytes("dup.bin", &payload(10)).unwrap();
    assert!(matches!(
        volume.import_bytes("dup.bin", &payload(20)),
        Err(Error::AlreadyExists(_))
    ));
    // The original entry is untouched.
    assert_eq!(volume.export_bytes("dup.bin").unwrap(), payload(10));
}

#[test]
fn import_rejects_empty_source() {
    let (_, mut volume) = fresh_volume();
    assert!(matches!(
        volume.import_bytes("empty.bin", &[]),
        Err(Error::SourceUnreadable(_))
    ));
    assert!(volume.list().is_empty());
}

#[test]
fn export_and_delete_report_not_found() {
    let (_, mut volume) = fresh_volume();
    assert!(matches!(
        volume.export_bytes("ghost.bin"),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        volume.delete_file("ghost.bin"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn directory_full_on_65th_import() {
    let (_, mut volume) = fresh_volume();
    for i in 0..64 {
        volume
            .import_bytes(&format!("file{i:02}"), &payload(100))
            .unwrap();
    }
    assert!(matches!(
        volume.import_bytes("one-too-many", &payload(100)),
        Err(Error::DirectoryFull)
    ));
    // Prior entries remain unaffected.
    assert_eq!(volume.list().len(), 64);
    assert_eq!(volume.export_bytes("file00").unwrap(), payload(100));
    assert_conservation(&volume);
}

#[test]
fn out_of_space_leaves_volume_unchanged() {
    let (_, mut volume) = fresh_volume();
    let free = volume.free_blocks();

    let too_big = payload((free as usize + 1) * BLOCK_SIZE);
    assert!(matches!(
        volume.import_bytes("big.bin", &too_big),
        Err(Error::OutOfSpace { .. })
    ));
    assert_eq!(volume.free_blocks(), free);
    assert!(volume.list().is_empty());

    // Filling the volume exactly still works.
    let exact = payload(free as usize * BLOCK_SIZE);
    volume.import_bytes("full.bin", &exact).unwrap();
    assert_eq!(volume.free_blocks(), 0);
    assert_conservation(&volume);
}

#[test]
fn chains_are_well_formed() {
    let (_, mut volume) = fresh_volume();
    volume
        .import_bytes("chained.bin", &payload(5 * BLOCK_SIZE + 1))
        .unwrap();

    let slot = volume.directory().find_by_name("chained.bin").unwrap();
    let first = volume.directory().entry(slot).first_block;
    let chain: Vec<u32> = volume.fat().chain(first).collect();

    // ceil(size / block) distinct blocks, terminated by EOF.
    assert_eq!(chain.len(), 6);
    let mut sorted = chain.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 6);
    assert_eq!(volume.fat().get(*chain.last().unwrap()), FAT_EOF);
}

#[test]
fn delete_then_reimport_reuses_blocks() {
    let (_, mut volume) = fresh_volume();
    let data = payload(3 * BLOCK_SIZE);

    volume.import_bytes("reuse.bin", &data).unwrap();
    let before: Vec<_> = volume.block_map();
    let free_before = volume.free_blocks();

    volume.delete_file("reuse.bin").unwrap();
    assert_eq!(volume.free_blocks(), free_before + 3);
    assert!(volume.list().is_empty());
    assert_conservation(&volume);

    volume.import_bytes("reuse.bin", &data).unwrap();
    assert_eq!(volume.free_blocks(), free_before);
    // First-fit allocation hands back the same blocks.
    assert_eq!(volume.block_map(), before);
}

#[test]
fn list_follows_slot_order() {
    let (_, mut volume) = fresh_volume();
    for name in ["a.bin", "b.bin", "c.bin"] {
        volume.import_bytes(name, &payload(50)).unwrap();
    }
    volume.delete_file("b.bin").unwrap();
    // d reuses b's slot, so it lists between a and c.
    volume.import_bytes("d.bin", &payload(50)).unwrap();

    let names: Vec<String> = volume.list().into_iter().map(|f| f.name).collect();
    assert_eq!(names, ["a.bin", "d.bin", "c.bin"]);

    for info in volume.list() {
        assert_eq!(info.ftype, 'F');
        assert!(info.created > 0);
    }
}

#[test]
fn block_map_coalesces_ranges() {
    let (_, mut volume) = fresh_volume();
    volume
        .import_bytes("five.bin", &payload(5 * BLOCK_SIZE))
        .unwrap();

    let map = volume.block_map();
    assert_eq!(map.len(), 5);

    assert_eq!((map[0].start, map[0].end), (0, 0));
    assert_eq!(map[0].class, BlockClass::Geometry);
    assert_eq!((map[1].start, map[1].end), (1, 7));
    assert_eq!(map[1].class, BlockClass::Directory);
    assert_eq!((map[2].start, map[2].end), (8, 8));
    assert_eq!(map[2].class, BlockClass::Fat);
    assert_eq!((map[3].start, map[3].end), (DATA_START, DATA_START + 4));
    assert_eq!(map[3].class, BlockClass::File("five.bin".into()));
    assert_eq!((map[4].start, map[4].end), (DATA_START + 5, VOL_BLOCKS - 1));
    assert_eq!(map[4].class, BlockClass::Free);
    assert!(map[4].class.is_free());
}

#[test]
fn block_map_reports_orphans() {
    let (store, volume) = fresh_volume();
    drop(volume);

    // Mark block 20 in use in the FAT without any chain referencing it.
    let fat_offset = 8 * BLOCK_SIZE + 20 * 4;
    store.poke(fat_offset, &FAT_EOF.to_le_bytes());

    let reopened = Volume::open(store).unwrap();
    let map = reopened.block_map();
    let orphan = map.iter().find(|r| r.class == BlockClass::Orphan).unwrap();
    assert_eq!((orphan.start, orphan.end), (20, 20));
}

#[test]
fn corrupt_chain_never_frees_metadata() {
    let (store, mut volume) = fresh_volume();
    volume
        .import_bytes("bad.bin", &payload(2 * BLOCK_SIZE))
        .unwrap();
    drop(volume);

    // Redirect the file's first FAT entry into the reserved region
    // (block 5 belongs to the directory).
    let fat_offset = 8 * BLOCK_SIZE + DATA_START as usize * 4;
    store.poke(fat_offset, &5i32.to_le_bytes());

    let mut reopened = Volume::open(store).unwrap();
    reopened.delete_file("bad.bin").unwrap();

    // The walk freed the first block, then stopped at the reserved entry.
    assert_eq!(reopened.fat().get(5), ttvfs::FAT_RESERVED);
    assert_eq!(reopened.fat().get(DATA_START), ttvfs::FAT_FREE);
    // The file's second block is now an orphan; it is reported, not fixed.
    let map = reopened.block_map();
    assert!(map.iter().any(|r| r.class == BlockClass::Orphan));
}
