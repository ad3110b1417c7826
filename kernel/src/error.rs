//! Kernel error codes.
//!
//! Every fallible operation returns exactly one [`Errno`]. The numeric
//! values follow the Linux errno table so user programs can decode them
//! with the usual constants; syscalls return them negated.

use core::fmt;

/// Error kinds surfaced to system call callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    /// Operation not permitted (EPERM).
    PermissionDenied = 1,
    /// No such file or directory (ENOENT).
    NotFound = 2,
    /// No such process (ESRCH).
    NoSuchProcess = 3,
    /// I/O error (EIO).
    Io = 5,
    /// Argument list too long (E2BIG).
    ArgumentListTooBig = 7,
    /// Exec format error (ENOEXEC).
    ExecFormat = 8,
    /// Bad file descriptor (EBADF).
    BadFileDescriptor = 9,
    /// Target is not a child of the caller (ECHILD).
    NotAChild = 10,
    /// Process table is full (EAGAIN).
    TooManyProcesses = 11,
    /// Out of memory (ENOMEM).
    OutOfMemory = 12,
    /// Access denied (EACCES).
    AccessDenied = 13,
    /// Bad address (EFAULT).
    BadAddress = 14,
    /// File exists (EEXIST).
    AlreadyExists = 17,
    /// Not a directory (ENOTDIR).
    NotADirectory = 20,
    /// Is a directory (EISDIR).
    IsADirectory = 21,
    /// Invalid argument (EINVAL).
    InvalidArgument = 22,
    /// Descriptor table is full (EMFILE).
    TooManyOpenFiles = 24,
    /// No space left on device (ENOSPC).
    NoSpace = 28,
    /// Illegal seek (ESPIPE).
    IllegalSeek = 29,
    /// File name too long (ENAMETOOLONG).
    NameTooLong = 36,
    /// Function not implemented (ENOSYS).
    NotImplemented = 38,
}

/// Result type for kernel operations.
pub type KernelResult<T> = core::result::Result<T, Errno>;

impl Errno {
    /// Positive errno value.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Value placed in the return register of a failed syscall.
    pub const fn as_syscall_return(self) -> i64 {
        -(self as i64)
    }

    /// Decode a positive errno value.
    pub fn from_code(code: i32) -> Option<Self> {
        let errno = match code {
            1 => Errno::PermissionDenied,
            2 => Errno::NotFound,
            3 => Errno::NoSuchProcess,
            5 => Errno::Io,
            7 => Errno::ArgumentListTooBig,
            8 => Errno::ExecFormat,
            9 => Errno::BadFileDescriptor,
            10 => Errno::NotAChild,
            11 => Errno::TooManyProcesses,
            12 => Errno::OutOfMemory,
            13 => Errno::AccessDenied,
            14 => Errno::BadAddress,
            17 => Errno::AlreadyExists,
            20 => Errno::NotADirectory,
            21 => Errno::IsADirectory,
            22 => Errno::InvalidArgument,
            24 => Errno::TooManyOpenFiles,
            28 => Errno::NoSpace,
            29 => Errno::IllegalSeek,
            36 => Errno::NameTooLong,
            38 => Errno::NotImplemented,
            _ => return None,
        };
        Some(errno)
    }

    /// Human readable description.
    pub const fn as_str(self) -> &'static str {
        match self {
            Errno::PermissionDenied => "Operation not permitted",
            Errno::NotFound => "No such file or directory",
            Errno::NoSuchProcess => "No such process",
            Errno::Io => "Input/output error",
            Errno::ArgumentListTooBig => "Argument list too long",
            Errno::ExecFormat => "Exec format error",
            Errno::BadFileDescriptor => "Bad file descriptor",
            Errno::NotAChild => "No child processes",
            Errno::TooManyProcesses => "Too many processes",
            Errno::OutOfMemory => "Out of memory",
            Errno::AccessDenied => "Permission denied",
            Errno::BadAddress => "Bad address",
            Errno::AlreadyExists => "File exists",
            Errno::NotADirectory => "Not a directory",
            Errno::IsADirectory => "Is a directory",
            Errno::InvalidArgument => "Invalid argument",
            Errno::TooManyOpenFiles => "Too many open files",
            Errno::NoSpace => "No space left on device",
            Errno::IllegalSeek => "Illegal seek",
            Errno::NameTooLong => "File name too long",
            Errno::NotImplemented => "Function not implemented",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (errno {})", self.as_str(), self.code())
    }
}
