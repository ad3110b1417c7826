//! File descriptor operations.

use core::ffi::CStr;

use crate::syscall::{syscall1, syscall2, syscall3, SyscallNumber, SyscallResult};

/// Open for reading only.
pub const O_RDONLY: u32 = 0;
/// Open for writing only.
pub const O_WRONLY: u32 = 1;
/// Open for reading and writing.
pub const O_RDWR: u32 = 2;
/// Create the file if it does not exist.
pub const O_CREAT: u32 = 4;
/// With `O_CREAT`, fail if the file exists.
pub const O_EXCL: u32 = 8;
/// Truncate to zero length.
pub const O_TRUNC: u32 = 16;
/// Start at the end of the file.
pub const O_APPEND: u32 = 32;

/// Seek from the start of the file.
pub const SEEK_SET: i32 = 0;
/// Seek from the current offset.
pub const SEEK_CUR: i32 = 1;
/// Seek from the end of the file.
pub const SEEK_END: i32 = 2;

/// Open `path` and return a descriptor.
pub fn open(path: &CStr, flags: u32) -> SyscallResult {
    unsafe { syscall2(SyscallNumber::Open, path.as_ptr() as u64, flags as u64) }
}

/// Read bytes from a file descriptor.
pub fn read(fd: u64, buf: &mut [u8]) -> SyscallResult {
    unsafe {
        syscall3(
            SyscallNumber::Read,
            fd,
            buf.as_mut_ptr() as u64,
            buf.len() as u64,
        )
    }
}

/// Write bytes to a file descriptor.
pub fn write(fd: u64, buf: &[u8]) -> SyscallResult {
    unsafe {
        syscall3(
            SyscallNumber::Write,
            fd,
            buf.as_ptr() as u64,
            buf.len() as u64,
        )
    }
}

/// Move the offset of `fd`. Returns the new offset.
pub fn lseek(fd: u64, pos: i64, whence: i32) -> SyscallResult {
    unsafe { syscall3(SyscallNumber::Lseek, fd, pos as u64, whence as u64) }
}

/// Close a file descriptor.
pub fn close(fd: u64) -> SyscallResult {
    unsafe { syscall1(SyscallNumber::Close, fd) }
}

/// Make `new_fd` refer to the same open file as `old_fd`.
pub fn dup2(old_fd: u64, new_fd: u64) -> SyscallResult {
    unsafe { syscall2(SyscallNumber::Dup2, old_fd, new_fd) }
}
