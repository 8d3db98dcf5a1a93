//! Encrypted-flag handling: payloads flagged `ENCRYPTED` are XOR-obfuscated
//! at rest and transparently restored on extract. The writer surface only
//! produces plain entries, so these tests assemble a container by hand from
//! the codec pieces.

use std::fs;
use std::io::Write;
use xpak::{obfuscate, DirEntry, DirectoryTable, EntryFlags, PackArchive, PACK_KEY};

/// Write a minimal pack: the given payload bytes followed by an obfuscated
/// table region holding `entries`.
fn write_pack(path: &std::path::Path, payload: &[u8], entries: &[DirEntry]) {
    let mut table = DirectoryTable::new();
    for entry in entries {
        table.upsert(entry.clone());
    }
    let mut region = table.write_region().unwrap();
    obfuscate::apply(&mut region, PACK_KEY);

    let mut file = fs::File::create(path).unwrap();
    file.write_all(payload).unwrap();
    file.write_all(&region).unwrap();
}

#[test]
fn encrypted_payload_extracts_to_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("enc.pak");

    let plaintext = b"secret level geometry".to_vec();
    let mut at_rest = plaintext.clone();
    obfuscate::apply(&mut at_rest, PACK_KEY);

    let entry = DirEntry::file(
        "maps/level1.bin",
        0,
        plaintext.len() as i64,
        EntryFlags::ENCRYPTED,
    );
    write_pack(&pack, &at_rest, &[entry]);

    let mut archive = PackArchive::open(&pack).unwrap();
    let out = dir.path().join("level1.bin");
    assert!(archive.extract_one("maps/level1.bin", &out).unwrap());
    assert_eq!(fs::read(&out).unwrap(), plaintext);
}

#[test]
fn unencrypted_payload_is_stored_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("plain.pak");

    let mut archive = PackArchive::create(&pack).unwrap();
    archive.add_file("readme.txt", b"hello pack", None).unwrap();
    archive.finalize(false).unwrap();

    // Payload region starts at byte 0; no transform applied.
    let raw = fs::read(&pack).unwrap();
    assert_eq!(&raw[..10], b"hello pack");
}

#[test]
fn replacing_encrypted_entry_keeps_obfuscation() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("replace-enc.pak");

    let old_plain = b"old encrypted body".to_vec();
    let mut old_at_rest = old_plain.clone();
    obfuscate::apply(&mut old_at_rest, PACK_KEY);
    let entry = DirEntry::file("a.dat", 0, old_plain.len() as i64, EntryFlags::ENCRYPTED);
    write_pack(&pack, &old_at_rest, &[entry]);

    let new_plain = b"new body";
    let mut archive = PackArchive::open(&pack).unwrap();
    archive.add_file("a.dat", new_plain, None).unwrap();
    archive.finalize(true).unwrap();

    // The replacement is shorter, so it reused offset 0; the at-rest bytes
    // must not be the plaintext.
    let raw = fs::read(&pack).unwrap();
    assert_ne!(&raw[..new_plain.len()], new_plain.as_slice());

    let mut archive = PackArchive::open(&pack).unwrap();
    let entry = archive.entries()[0].clone();
    assert!(entry.flags.is_encrypted());

    let out = dir.path().join("a.dat");
    assert!(archive.extract_one("a.dat", &out).unwrap());
    assert_eq!(fs::read(&out).unwrap(), new_plain);
}

#[test]
fn corrupt_duplicate_hash_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("dup.pak");

    // Two records with the same hash, written without going through the
    // table's duplicate check.
    let entry = DirEntry::file("twice.bin", 0, 0, EntryFlags::NONE);
    let mut region = vec![0u8; xpak::TABLE_SIZE];
    region[..xpak::ENTRY_SIZE].copy_from_slice(&entry.encode());
    region[xpak::ENTRY_SIZE..2 * xpak::ENTRY_SIZE].copy_from_slice(&entry.encode());
    obfuscate::apply(&mut region, PACK_KEY);
    fs::write(&pack, &region).unwrap();

    let err = PackArchive::open(&pack).unwrap_err();
    assert!(matches!(err, xpak::PackError::CorruptTable(_)));
}

#[test]
fn out_of_range_extent_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("oob.pak");

    // Entry claims 100 payload bytes but the container has none.
    let entry = DirEntry::file("ghost.bin", 0, 100, EntryFlags::NONE);
    write_pack(&pack, &[], &[entry]);

    let err = PackArchive::open(&pack).unwrap_err();
    assert!(matches!(err, xpak::PackError::CorruptTable(_)));
}
