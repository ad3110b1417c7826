//! File Descriptor Table
//!
//! Maps small integer descriptors to shared [`OpenFile`]s. Each process
//! owns one table behind its own lock. Slots hold `Arc<OpenFile>`, so
//! publishing a slot takes a reference and emptying one gives it back;
//! no path can change the file's share count without changing a slot.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use spin::Mutex;

use super::{OpenFile, OpenFlags, Vfs, Whence};
use crate::config::{CONSOLE_PATH, FIRST_USER_FD, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use crate::error::{Errno, KernelResult};

const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-capacity descriptor table.
pub struct FdTable {
    slots: Vec<Option<Arc<OpenFile>>>,
    /// One bit per slot, set while the slot is empty.
    free: Vec<u64>,
}

impl FdTable {
    /// Create an empty table with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        let words = capacity.div_ceil(WORD_BITS);
        let mut free = vec![u64::MAX; words];
        let tail = capacity % WORD_BITS;
        if tail != 0 {
            if let Some(last) = free.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }

        Self {
            slots: vec![None; capacity],
            free,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_open(&self, fd: usize) -> bool {
        matches!(self.slots.get(fd), Some(Some(_)))
    }

    /// Place `file` in the lowest empty slot at or above the standard
    /// streams. On `TooManyOpenFiles` the file is dropped.
    pub fn alloc(&mut self, file: Arc<OpenFile>) -> KernelResult<usize> {
        let fd = self.lowest_free(FIRST_USER_FD).ok_or(Errno::TooManyOpenFiles)?;
        self.slots[fd] = Some(file);
        self.mark_used(fd);
        Ok(fd)
    }

    /// The file in slot `fd`.
    pub fn get(&self, fd: usize) -> KernelResult<Arc<OpenFile>> {
        self.slots
            .get(fd)
            .and_then(|slot| slot.clone())
            .ok_or(Errno::BadFileDescriptor)
    }

    /// Empty slot `fd`, handing back its reference.
    pub fn take(&mut self, fd: usize) -> KernelResult<Arc<OpenFile>> {
        let file = self
            .slots
            .get_mut(fd)
            .and_then(Option::take)
            .ok_or(Errno::BadFileDescriptor)?;
        self.mark_free(fd);
        Ok(file)
    }

    /// Put `file` in slot `fd`, returning whatever the slot held.
    pub fn install(
        &mut self,
        fd: usize,
        file: Arc<OpenFile>,
    ) -> KernelResult<Option<Arc<OpenFile>>> {
        let slot = self.slots.get_mut(fd).ok_or(Errno::BadFileDescriptor)?;
        let previous = slot.replace(file);
        self.mark_used(fd);
        Ok(previous)
    }

    /// A table aliasing every open file of this one, for a forked child.
    pub fn duplicate(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            free: self.free.clone(),
        }
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        for fd in 0..self.slots.len() {
            if self.slots[fd].take().is_some() {
                self.mark_free(fd);
            }
        }
    }

    /// Open the console as stdin (read-only), stdout and stderr
    /// (write-only). Each slot gets its own open file.
    pub fn install_stdio(&mut self, vfs: &dyn Vfs) -> KernelResult<()> {
        let streams = [
            (STDIN_FILENO, OpenFlags::RDONLY),
            (STDOUT_FILENO, OpenFlags::WRONLY),
            (STDERR_FILENO, OpenFlags::WRONLY),
        ];

        for (fd, flags) in streams {
            let vnode = vfs.open(CONSOLE_PATH, flags)?;
            let file = Arc::new(OpenFile::new(vnode, flags)?);
            self.install(fd, file)?;
        }

        log::debug!("[KESTREL FD] standard streams attached to {}", CONSOLE_PATH);
        Ok(())
    }

    fn lowest_free(&self, from: usize) -> Option<usize> {
        let mut word = from / WORD_BITS;
        let mut mask = u64::MAX.checked_shl((from % WORD_BITS) as u32).unwrap_or(0);

        while word < self.free.len() {
            let bits = self.free[word] & mask;
            if bits != 0 {
                return Some(word * WORD_BITS + bits.trailing_zeros() as usize);
            }
            word += 1;
            mask = u64::MAX;
        }
        None
    }

    fn mark_used(&mut self, fd: usize) {
        self.free[fd / WORD_BITS] &= !(1u64 << (fd % WORD_BITS));
    }

    fn mark_free(&mut self, fd: usize) {
        self.free[fd / WORD_BITS] |= 1u64 << (fd % WORD_BITS);
    }
}

impl core::fmt::Debug for FdTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FdTable")
            .field("capacity", &self.capacity())
            .field("open", &self.open_count())
            .finish()
    }
}

// ── Public API ──────────────────────────────────────────────

/// Open `path` and return a descriptor in the caller's table.
pub fn open(
    files: &Mutex<FdTable>,
    vfs: &dyn Vfs,
    path: &str,
    raw_flags: u32,
) -> KernelResult<usize> {
    let flags = OpenFlags::parse(raw_flags)?;
    let vnode = vfs.open(path, flags)?;
    let file = Arc::new(OpenFile::new(vnode, flags)?);
    let fd = files.lock().alloc(file)?;

    log::debug!("[KESTREL FD] open {:?} flags={:#x} -> fd {}", path, raw_flags, fd);
    Ok(fd)
}

/// Read from `fd` into `buf`. Returns the bytes read.
pub fn read(files: &Mutex<FdTable>, fd: usize, buf: &mut [u8]) -> KernelResult<usize> {
    let file = files.lock().get(fd)?;
    let count = file.read(buf)?;
    log::trace!("[KESTREL FD] read fd {} -> {} bytes", fd, count);
    Ok(count)
}

/// Write `buf` to `fd`. Returns the bytes written.
pub fn write(files: &Mutex<FdTable>, fd: usize, buf: &[u8]) -> KernelResult<usize> {
    let file = files.lock().get(fd)?;
    let count = file.write(buf)?;
    log::trace!("[KESTREL FD] write fd {} -> {} bytes", fd, count);
    Ok(count)
}

/// Reposition the cursor of `fd`. Returns the new offset.
pub fn lseek(files: &Mutex<FdTable>, fd: usize, pos: i64, whence: i32) -> KernelResult<u64> {
    let file = files.lock().get(fd)?;
    let whence = Whence::try_from(whence)?;
    file.seek(pos, whence)
}

/// Close `fd`.
pub fn close(files: &Mutex<FdTable>, fd: usize) -> KernelResult<()> {
    let file = files.lock().take(fd)?;
    log::debug!(
        "[KESTREL FD] close fd {} ({} references left)",
        fd,
        Arc::strong_count(&file) - 1
    );
    drop(file);
    Ok(())
}

/// Make `new_fd` refer to the same open file as `old_fd`.
pub fn dup2(files: &Mutex<FdTable>, old_fd: usize, new_fd: usize) -> KernelResult<usize> {
    let displaced = {
        let mut table = files.lock();
        if new_fd >= table.capacity() {
            return Err(Errno::BadFileDescriptor);
        }
        let file = table.get(old_fd)?;
        if old_fd == new_fd {
            return Ok(new_fd);
        }
        table.install(new_fd, file)?
    };

    // The displaced file may be the last reference to its vnode; release it
    // without holding the table lock.
    drop(displaced);
    log::debug!("[KESTREL FD] dup2 {} -> {}", old_fd, new_fd);
    Ok(new_fd)
}
