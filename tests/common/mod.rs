#![allow(dead_code)]

use flate2::read::GzDecoder;
use logroll::{LogWriter, archive_path};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub fn open(path: &Path, max_size: u64, max_files: usize) -> LogWriter {
    LogWriter::open(path, 0o600, max_size, max_files).unwrap()
}

/// A line of `len` bytes total, trailing newline included, filled with `ch`.
pub fn line(ch: u8, len: usize) -> Vec<u8> {
    assert!(len >= 1);
    let mut v = vec![ch; len - 1];
    v.push(b'\n');
    v
}

/// Decompress a single gzip archive to its raw bytes.
pub fn decompress(path: &Path) -> Vec<u8> {
    let file = File::open(path).unwrap();
    let mut out = Vec::new();
    GzDecoder::new(file).read_to_end(&mut out).unwrap();
    out
}

/// Archive numbers present for `path`, probing from 1 upward.
pub fn archives(path: &Path) -> Vec<usize> {
    let mut ns = Vec::new();
    let mut n = 1;
    while archive_path(path, n).exists() {
        ns.push(n);
        n += 1;
    }
    ns
}
