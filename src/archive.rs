use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// Window size for streaming a byte range into the encoder.
const COPY_CHUNK: u64 = 8192;

/// Returns the path of archive number `n` for a log file: `<path>.<n>.gz`.
///
/// Archive `1` is always the most recently rotated content; higher numbers
/// are older.
pub fn archive_path(path: impl AsRef<Path>, n: usize) -> PathBuf {
    let mut name = path.as_ref().as_os_str().to_os_string();
    name.push(format!(".{n}.gz"));
    PathBuf::from(name)
}

/// Highest `n` for which `<path>.<n>.gz` exists, probing upward from 1.
///
/// Archives are kept gapless, so the first missing number ends the probe.
pub(crate) fn highest_archive(path: &Path) -> io::Result<usize> {
    let mut n = 0;
    loop {
        match fs::symlink_metadata(archive_path(path, n + 1)) {
            Ok(_) => n += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(n),
            Err(e) => return Err(e),
        }
    }
}

/// Gzip the first `len` bytes of `src` into a new file at `dest`.
///
/// The encoder is fully finished and the archive synced before returning,
/// so the result is a self-contained stream that decompresses on its own.
pub(crate) fn compress_range(src: &File, len: u64, dest: &Path, mode: u32) -> io::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(dest)?;
    let mut encoder = GzEncoder::new(file, Compression::default());

    let mut buf = vec![0u8; COPY_CHUNK as usize];
    let mut off = 0u64;
    while off < len {
        let want = (len - off).min(COPY_CHUNK) as usize;
        src.read_exact_at(&mut buf[..want], off)?;
        encoder.write_all(&buf[..want])?;
        off += want as u64;
    }

    let file = encoder.finish()?;
    file.sync_data()?;
    Ok(())
}

/// Read back the full retained history of a log file, oldest bytes first.
///
/// Decompresses archives from the highest number down to `1`, then appends
/// the live file's contents. The concatenation reproduces every retained
/// line in the order it was written.
///
/// # Errors
///
/// Returns an error if the live file does not exist or any archive fails
/// to open or decompress.
pub fn read_full(path: impl AsRef<Path>) -> crate::Result<Vec<u8>> {
    let path = path.as_ref();
    let mut out = Vec::new();

    let mut n = highest_archive(path)?;
    while n > 0 {
        let file = File::open(archive_path(path, n))?;
        GzDecoder::new(file).read_to_end(&mut out)?;
        n -= 1;
    }

    File::open(path)?.read_to_end(&mut out)?;
    Ok(out)
}
