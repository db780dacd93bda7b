use crate::archive::{self, archive_path};
use crate::error::{Error, Result};
use crate::writer::Inner;
use log::debug;
use std::fs;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

/// Window size for the in-place compaction copy.
const COMPACT_CHUNK: u64 = 8192;

impl Inner {
    /// Archive everything up to the recorded newline and compact the
    /// remainder to the start of the file.
    ///
    /// Only invoked from the write path, under the writer's lock, once a
    /// newline has been recorded. A failure at any step aborts without
    /// rollback; the partial state (archives shifted, file not yet
    /// compacted) is repaired by reopening, not here.
    pub(crate) fn rotate(&mut self) -> Result<()> {
        let Some(last_newline) = self.last_newline else {
            return Ok(());
        };
        let Some(file) = self.file.as_ref() else {
            return Err(Error::Closed);
        };

        let mut n = archive::highest_archive(&self.path)?;

        // evict expired archives so the shift below tops out at max_files - 1
        while n + 2 > self.max_files && n > 0 {
            remove_if_exists(&archive_path(&self.path, n))?;
            n -= 1;
        }

        // move each survivor up one number, oldest first, so no rename
        // lands on a file that has not moved yet
        while n > 0 {
            rename_if_exists(
                &archive_path(&self.path, n),
                &archive_path(&self.path, n + 1),
            )?;
            n -= 1;
        }

        // no archive slot exists when max_files is 1; the prefix is dropped
        if self.max_files > 1 {
            archive::compress_range(
                file,
                last_newline + 1,
                &archive_path(&self.path, 1),
                self.mode,
            )?;
        }

        // copy the tail over the archived prefix in bounded windows; the
        // read cursor stays ahead of the write cursor, so the overlapping
        // ranges cannot clobber unread bytes
        let remaining = self.size - (last_newline + 1);
        let mut buf = vec![0u8; COMPACT_CHUNK as usize];
        let mut copied = 0;
        while copied < remaining {
            let want = (remaining - copied).min(COMPACT_CHUNK) as usize;
            file.read_exact_at(&mut buf[..want], last_newline + 1 + copied)?;
            file.write_all_at(&buf[..want], copied)?;
            copied += want as u64;
        }
        file.set_len(remaining)?;

        debug!(
            "rotated {}: archived {} bytes, {} left in live file",
            self.path.display(),
            last_newline + 1,
            remaining,
        );

        self.size = remaining;
        self.last_newline = None;
        Ok(())
    }
}

/// Remove a file, treating absence as success. A missing archive just means
/// a prior rotation got that far already.
fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Rename a file, treating a missing source as success.
fn rename_if_exists(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
