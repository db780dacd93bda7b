use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

/// Window size for the backward scan.
const SCAN_CHUNK: u64 = 8192;

/// Find the byte offset of the last `\n` in the file, or `None` if the file
/// contains no newline.
///
/// Reads fixed-size windows backward from the end, searching each window
/// from its tail. A zero-length file is answered without any read.
pub(crate) fn last_newline(file: &File, size: u64) -> io::Result<Option<u64>> {
    if size == 0 {
        return Ok(None);
    }

    let mut buf = vec![0u8; SCAN_CHUNK as usize];
    // window containing the final byte; earlier windows are full-sized
    let mut off = ((size - 1) / SCAN_CHUNK) * SCAN_CHUNK;
    let mut len = (size - off) as usize;

    loop {
        file.read_exact_at(&mut buf[..len], off)?;

        if let Some(i) = buf[..len].iter().rposition(|&b| b == b'\n') {
            return Ok(Some(off + i as u64));
        }

        if off == 0 {
            return Ok(None);
        }
        off -= SCAN_CHUNK;
        len = SCAN_CHUNK as usize;
    }
}
