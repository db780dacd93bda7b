use crate::error::{Error, Result};
use crate::scan;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// A write handle to a size-bounded log file.
///
/// The writer appends bytes to the file at `path` and keeps its size below
/// `max_size` by rotating: the content up to the most recent newline is
/// gzipped into `<path>.1.gz` (older archives shift up one number, capped
/// at `max_files - 1` of them) and the remainder is compacted to the start
/// of the file. Rotation happens inline during [`write`](LogWriter::write)
/// whenever a line terminator would cross the size threshold, so the file
/// is only ever split immediately after a `\n`. A single line longer than
/// `max_size` is never split; it makes the file temporarily larger instead.
///
/// All operations serialize on one internal lock, so a `LogWriter` can be
/// shared across threads. Once any write or rotation fails, the error
/// latches and every later call fails fast without touching the file;
/// reopen the path to recover.
///
/// # Examples
///
/// ```
/// use logroll::LogWriter;
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("app.log");
///
/// let writer = LogWriter::builder(&path)
///     .max_size(64 * 1024)
///     .max_files(4)
///     .open()?;
/// writer.write(b"hello world\n")?;
/// writer.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct LogWriter {
    inner: Mutex<Inner>,
}

pub(crate) struct Inner {
    pub(crate) path: PathBuf,
    pub(crate) mode: u32,
    pub(crate) max_size: u64,
    pub(crate) max_files: usize,
    pub(crate) file: Option<File>,
    pub(crate) size: u64,
    pub(crate) last_newline: Option<u64>,
    write_err: Option<String>,
    closed: bool,
}

impl LogWriter {
    /// Open the log file at `path` for writing, creating it with the given
    /// unix `mode` if it does not exist.
    ///
    /// An existing file must be a plain file; directories, symlinks and
    /// devices are rejected. The writer picks up where the file left off:
    /// its size is read from metadata and the position of the last newline
    /// is located by scanning backward from the end, so reopening after a
    /// crash (even mid-rotation) resumes with correct split points.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMaxSize`] or [`Error::InvalidMaxFiles`] if either
    /// bound is zero, [`Error::NotRegularFile`] for a non-file path, and
    /// [`Error::Io`] for anything from the filesystem.
    pub fn open(
        path: impl AsRef<Path>,
        mode: u32,
        max_size: u64,
        max_files: usize,
    ) -> Result<LogWriter> {
        let path = path.as_ref().to_path_buf();
        if max_size < 1 {
            return Err(Error::InvalidMaxSize);
        }
        if max_files < 1 {
            return Err(Error::InvalidMaxFiles);
        }

        // symlink_metadata so a symlinked path is rejected, not followed
        let mut size = 0;
        match fs::symlink_metadata(&path) {
            Ok(meta) => {
                if !meta.file_type().is_file() {
                    return Err(Error::NotRegularFile(path));
                }
                size = meta.len();
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(mode)
            .open(&path)?;

        let last_newline = scan::last_newline(&file, size)?;

        Ok(LogWriter {
            inner: Mutex::new(Inner {
                path,
                mode,
                max_size,
                max_files,
                file: Some(file),
                size,
                last_newline,
                write_err: None,
                closed: false,
            }),
        })
    }

    /// Start building a writer for `path` with default settings.
    pub fn builder(path: impl AsRef<Path>) -> LogWriterBuilder {
        LogWriterBuilder::new(path)
    }

    /// Append `buf` to the log, rotating as needed.
    ///
    /// The input is consumed in chunks: each chunk is scanned for line
    /// terminators, clipped so it ends exactly at a rotation boundary when
    /// one is crossed, written at the current end of the file with an
    /// explicit offset, and followed by a rotation if the boundary was hit.
    /// A large enough input triggers several rotations within one call.
    /// The internal lock is held for the whole call.
    ///
    /// Returns the number of bytes written, which on success is always
    /// `buf.len()`.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after [`close`](LogWriter::close). Once a write or
    /// rotation fails the cause is returned to that caller and latched;
    /// every later call returns [`Error::Sticky`] without performing I/O.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        if inner.closed {
            return Err(Error::Closed);
        }
        if let Some(prior) = &inner.write_err {
            return Err(Error::Sticky(prior.clone()));
        }

        let mut written = 0;
        let mut p = buf;
        while !p.is_empty() {
            // advance a line at a time until the input runs out or the
            // scanned prefix would push the file past max_size
            let mut br = 0;
            loop {
                match p[br..].iter().position(|&b| b == b'\n') {
                    None => {
                        br = p.len();
                        break;
                    }
                    Some(i) => {
                        let nl = inner.size + (br + i) as u64;
                        if nl < inner.max_size || inner.last_newline.is_none() {
                            inner.last_newline = Some(nl);
                        }
                        br += i + 1;
                        if inner.size + br as u64 > inner.max_size {
                            break;
                        }
                    }
                }
            }

            let mut rotate = false;
            if let Some(nl) = inner.last_newline {
                let boundary = (nl + 1).max(inner.max_size);
                if inner.size + br as u64 > boundary {
                    // clip so the chunk ends exactly at the boundary; a file
                    // reopened already past it writes nothing and rotates
                    // before taking new bytes
                    br = boundary.saturating_sub(inner.size) as usize;
                    rotate = true;
                }
            }

            match inner.write_chunk(&p[..br]) {
                Ok(n) => written += n,
                Err(e) => return Err(inner.latch(e)),
            }
            if rotate {
                if let Err(e) = inner.rotate() {
                    return Err(inner.latch(e));
                }
            }
            p = &p[br..];
        }
        Ok(written)
    }

    /// Flush file data to disk.
    ///
    /// Writes land through the kernel page cache; call this when the
    /// content must survive a power failure.
    pub fn sync(&self) -> Result<()> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(Error::Closed);
        }
        if let Some(prior) = &inner.write_err {
            return Err(Error::Sticky(prior.clone()));
        }
        let Some(file) = inner.file.as_ref() else {
            return Err(Error::Closed);
        };
        file.sync_data()?;
        Ok(())
    }

    /// Close the writer, releasing the file handle.
    ///
    /// The first call syncs the file and drops the handle; any further
    /// call is a no-op returning `Ok`, even if the first close failed. The
    /// writer stays closed either way and any later write fails with
    /// [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        if let Some(file) = inner.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Current size in bytes of the live file.
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// The path this writer appends to.
    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }
}

impl Inner {
    /// Write `chunk` at the current end of the file, keeping `size` equal
    /// to the bytes actually on disk at every step.
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize> {
        let Some(file) = self.file.as_ref() else {
            return Err(Error::Closed);
        };
        let mut off = 0;
        while off < chunk.len() {
            match file.write_at(&chunk[off..], self.size) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole chunk",
                    )
                    .into());
                }
                Ok(n) => {
                    off += n;
                    self.size += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(off)
    }

    /// Record a failure so all later calls fail fast, and hand it back.
    fn latch(&mut self, err: Error) -> Error {
        self.write_err = Some(err.to_string());
        err
    }
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        LogWriter::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sync().map_err(io::Error::other)
    }
}

impl io::Write for &LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        LogWriter::write(*self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        LogWriter::sync(*self).map_err(io::Error::other)
    }
}

impl fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LogWriter")
            .field("path", &inner.path)
            .field("size", &inner.size)
            .field("max_size", &inner.max_size)
            .field("max_files", &inner.max_files)
            .field("closed", &inner.closed)
            .finish()
    }
}

/// Configures and opens a [`LogWriter`].
///
/// Defaults: mode `0o644`, `max_size` 1 MiB, `max_files` 8.
#[derive(Debug, Clone)]
pub struct LogWriterBuilder {
    path: PathBuf,
    mode: u32,
    max_size: u64,
    max_files: usize,
}

impl LogWriterBuilder {
    fn new(path: impl AsRef<Path>) -> Self {
        LogWriterBuilder {
            path: path.as_ref().to_path_buf(),
            mode: 0o644,
            max_size: 1 << 20,
            max_files: 8,
        }
    }

    /// Unix permission bits used if the file has to be created.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Size in bytes above which the file is rotated at the next newline.
    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Cap on retained files: the live file plus at most `max_files - 1`
    /// compressed archives.
    pub fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Open the writer with the configured settings.
    pub fn open(self) -> Result<LogWriter> {
        LogWriter::open(&self.path, self.mode, self.max_size, self.max_files)
    }
}
