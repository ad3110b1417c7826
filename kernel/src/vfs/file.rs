//! Open file objects
//!
//! An [`OpenFile`] is one opened resource with its access mode and cursor.
//! Descriptor slots hold `Arc<OpenFile>`; the strong count is the number
//! of slots (in every process) that refer to the file, and dropping the
//! last one drops the vnode reference with it.

use alloc::sync::Arc;
use core::fmt;
use spin::Mutex;

use super::{AccessMode, OpenFlags, Vnode, Whence};
use crate::error::{Errno, KernelResult};

/// A shared, positioned view of an opened vnode.
pub struct OpenFile {
    vnode: Arc<dyn Vnode>,
    mode: AccessMode,
    append: bool,
    /// Cursor. Held for the duration of every transfer, which orders all
    /// I/O on this file.
    offset: Mutex<u64>,
}

impl OpenFile {
    /// Wrap a freshly opened vnode.
    ///
    /// In append mode the cursor starts at the current size of the
    /// resource; if that cannot be determined the vnode reference is
    /// dropped and the error returned.
    pub fn new(vnode: Arc<dyn Vnode>, flags: OpenFlags) -> KernelResult<Self> {
        let append = flags.contains(OpenFlags::APPEND);
        let offset = if append { vnode.stat()?.size } else { 0 };

        Ok(Self {
            vnode,
            mode: flags.access_mode(),
            append,
            offset: Mutex::new(offset),
        })
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Current cursor position.
    pub fn offset(&self) -> u64 {
        *self.offset.lock()
    }

    /// Read at the cursor and advance it by the bytes actually read.
    pub fn read(&self, buf: &mut [u8]) -> KernelResult<usize> {
        if !self.mode.can_read() {
            return Err(Errno::BadFileDescriptor);
        }

        let mut offset = self.offset.lock();
        let count = self.vnode.read_at(*offset, buf)?;
        *offset = offset.saturating_add(count as u64);
        Ok(count)
    }

    /// Write at the cursor and advance it by the bytes actually written.
    pub fn write(&self, buf: &[u8]) -> KernelResult<usize> {
        if !self.mode.can_write() {
            return Err(Errno::BadFileDescriptor);
        }

        let mut offset = self.offset.lock();
        let count = self.vnode.write_at(*offset, buf)?;
        *offset = offset.saturating_add(count as u64);
        Ok(count)
    }

    /// Reposition the cursor. A negative or unrepresentable result fails
    /// with `InvalidArgument` and leaves the cursor where it was.
    pub fn seek(&self, pos: i64, whence: Whence) -> KernelResult<u64> {
        if !self.vnode.is_seekable() {
            return Err(Errno::IllegalSeek);
        }

        let mut offset = self.offset.lock();
        let base = match whence {
            Whence::Set => 0,
            Whence::Current => *offset,
            Whence::End => self.vnode.stat()?.size,
        };
        let base = i64::try_from(base).map_err(|_| Errno::InvalidArgument)?;
        let target = base.checked_add(pos).ok_or(Errno::InvalidArgument)?;
        if target < 0 {
            return Err(Errno::InvalidArgument);
        }

        *offset = target as u64;
        Ok(*offset)
    }
}

impl fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFile")
            .field("mode", &self.mode)
            .field("append", &self.append)
            .field("offset", &self.offset())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RamFile;

    fn file_with(contents: &[u8], flags: OpenFlags) -> (Arc<RamFile>, OpenFile) {
        let ram = RamFile::with_contents(contents);
        let vnode: Arc<dyn Vnode> = ram.clone();
        let file = OpenFile::new(vnode, flags).unwrap();
        (ram, file)
    }

    #[test]
    fn test_read_advances_by_bytes_read() {
        let (_, file) = file_with(b"hello", OpenFlags::RDONLY);
        let mut buf = [0u8; 8];
        assert_eq!(file.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(file.offset(), 5);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
        assert_eq!(file.offset(), 5);
    }

    #[test]
    fn test_write_on_read_only_is_bad_descriptor() {
        let (_, file) = file_with(b"", OpenFlags::RDONLY);
        assert_eq!(file.write(b"x"), Err(Errno::BadFileDescriptor));
        assert_eq!(file.offset(), 0);
    }

    #[test]
    fn test_read_on_write_only_is_bad_descriptor() {
        let (_, file) = file_with(b"abc", OpenFlags::WRONLY);
        let mut buf = [0u8; 3];
        assert_eq!(file.read(&mut buf), Err(Errno::BadFileDescriptor));
    }

    #[test]
    fn test_short_write_advances_by_accepted_bytes() {
        let (ram, file) = file_with(b"", OpenFlags::WRONLY);
        ram.set_write_limit(Some(2));
        assert_eq!(file.write(b"abcdef").unwrap(), 2);
        assert_eq!(file.offset(), 2);
        assert_eq!(ram.contents(), b"ab");
    }

    #[test]
    fn test_append_starts_at_size() {
        let (ram, file) = file_with(b"12345", OpenFlags::WRONLY | OpenFlags::APPEND);
        assert_eq!(file.offset(), 5);
        file.write(b"67").unwrap();
        assert_eq!(ram.contents(), b"1234567");
    }

    #[test]
    fn test_append_stat_failure_releases_vnode() {
        let ram = RamFile::with_contents(b"abc");
        ram.fail_stat(true);
        let vnode: Arc<dyn Vnode> = ram.clone();
        let err = OpenFile::new(vnode, OpenFlags::WRONLY | OpenFlags::APPEND).unwrap_err();
        assert_eq!(err, Errno::Io);
        assert_eq!(Arc::strong_count(&ram), 1);
    }

    #[test]
    fn test_seek_end_returns_size() {
        let (_, file) = file_with(b"0123456789", OpenFlags::RDONLY);
        assert_eq!(file.seek(0, Whence::End).unwrap(), 10);
        assert_eq!(file.seek(-3, Whence::Current).unwrap(), 7);
        assert_eq!(file.seek(2, Whence::Set).unwrap(), 2);
    }

    #[test]
    fn test_seek_negative_leaves_offset() {
        let (_, file) = file_with(b"abc", OpenFlags::RDONLY);
        file.seek(2, Whence::Set).unwrap();
        assert_eq!(file.seek(-1, Whence::Set), Err(Errno::InvalidArgument));
        assert_eq!(file.seek(-3, Whence::Current), Err(Errno::InvalidArgument));
        assert_eq!(file.seek(i64::MAX, Whence::End), Err(Errno::InvalidArgument));
        assert_eq!(file.offset(), 2);
    }

    #[test]
    fn test_seek_past_end_is_allowed() {
        let (_, file) = file_with(b"abc", OpenFlags::RDONLY);
        assert_eq!(file.seek(100, Whence::Set).unwrap(), 100);
    }

    #[test]
    fn test_seek_on_console_is_illegal() {
        let console = RamFile::console();
        let vnode: Arc<dyn Vnode> = console;
        let file = OpenFile::new(vnode, OpenFlags::WRONLY).unwrap();
        assert_eq!(file.seek(0, Whence::Set), Err(Errno::IllegalSeek));
    }
}
