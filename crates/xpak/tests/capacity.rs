//! Directory table capacity boundary: the 32 MiB region holds exactly
//! 131072 records, and finalize must refuse to emit a truncated table.

use xpak::{DirEntry, DirectoryTable, EntryFlags, MAX_ENTRIES, PackError, TABLE_SIZE};

fn filled_table(count: usize) -> DirectoryTable {
    let mut table = DirectoryTable::new();
    for i in 0..count {
        table.upsert(DirEntry::file(
            &format!("bulk/{i:06}.bin"),
            0,
            0,
            EntryFlags::NONE,
        ));
    }
    table
}

#[test]
fn exactly_at_capacity_serializes() {
    let table = filled_table(MAX_ENTRIES);
    assert_eq!(table.len(), MAX_ENTRIES);

    let region = table.write_region().unwrap();
    assert_eq!(region.len(), TABLE_SIZE);

    // The last record slot is occupied, so a rescan sees every entry.
    let reread = DirectoryTable::from_region(&region).unwrap();
    assert_eq!(reread.len(), MAX_ENTRIES);
}

#[test]
fn one_past_capacity_is_rejected() {
    let table = filled_table(MAX_ENTRIES + 1);
    assert_eq!(table.len(), MAX_ENTRIES + 1);

    let err = table.write_region().unwrap_err();
    assert!(matches!(
        err,
        PackError::TooManyEntries {
            count,
            capacity,
        } if count == MAX_ENTRIES + 1 && capacity == MAX_ENTRIES
    ));
}

#[test]
fn finalize_rejects_overfull_pack() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("full.pak");

    let mut archive = xpak::PackArchive::create(&pack).unwrap();
    for i in 0..=MAX_ENTRIES {
        archive.add_directory(&format!("d/{i:06}")).unwrap();
    }
    assert_eq!(archive.len(), MAX_ENTRIES + 1);

    let err = archive.finalize(false).unwrap_err();
    assert!(matches!(err, PackError::TooManyEntries { .. }));
}
