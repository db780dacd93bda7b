mod common;

use common::{archives, decompress, line};
use logroll::{LogWriter, archive_path, read_full};
use proptest::prelude::*;
use tempfile::tempdir;

fn arb_chunk() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![
            2 => Just(b'\n'),
            5 => any::<u8>(),
        ],
        0..40,
    )
}

fn arb_chunks() -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(arb_chunk(), 0..16)
}

// With room for every archive, the retained history is the whole history:
// decompressing archives oldest-first and appending the live file
// reproduces exactly the bytes written, in order.
proptest! {
    #[test]
    fn prop_read_full_round_trip(chunks in arb_chunks(), max_size in 1..48u64) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");
        let writer = LogWriter::open(&path, 0o600, max_size, 1000).unwrap();

        let mut expected = Vec::new();
        for chunk in &chunks {
            let n = writer.write(chunk).unwrap();
            prop_assert_eq!(n, chunk.len());
            expected.extend_from_slice(chunk);
        }

        prop_assert_eq!(read_full(&path).unwrap(), expected);
    }
}

// Rotation only ever cuts immediately after a line terminator, so every
// archive decompresses to bytes ending in a newline.
proptest! {
    #[test]
    fn prop_archives_end_at_newline(chunks in arb_chunks(), max_size in 1..48u64) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");
        let writer = LogWriter::open(&path, 0o600, max_size, 1000).unwrap();

        for chunk in &chunks {
            writer.write(chunk).unwrap();
        }

        for n in archives(&path) {
            let data = decompress(&archive_path(&path, n));
            prop_assert!(!data.is_empty());
            prop_assert_eq!(data.last(), Some(&b'\n'));
        }
    }
}

// However many rotations happen, at most max_files - 1 archives survive
// and their numbering stays gapless from 1.
proptest! {
    #[test]
    fn prop_archive_count_capped(
        lens in proptest::collection::vec(1..16usize, 1..64),
        max_files in 1..5usize,
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");
        let writer = LogWriter::open(&path, 0o600, 16, max_files).unwrap();

        for len in lens {
            writer.write(&line(b'x', len)).unwrap();
        }

        let ns = archives(&path);
        prop_assert!(ns.len() <= max_files - 1);
        prop_assert_eq!(ns.len(), ns.last().copied().unwrap_or(0));
    }
}
