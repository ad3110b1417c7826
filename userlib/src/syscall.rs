//! Raw system call interface.
//!
//! This module provides the low-level system call mechanism using the
//! x86_64 `syscall` instruction. On other targets every call fails with
//! `NotImplemented`.

#[cfg(target_arch = "x86_64")]
use core::arch::asm;

/// System call numbers - must match the kernel's `SyscallNumber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum SyscallNumber {
    // Process management
    Fork = 0,
    Execv = 2,
    Exit = 3,
    Waitpid = 4,
    Getpid = 5,

    // File descriptors
    Open = 45,
    Dup2 = 48,
    Close = 49,
    Read = 50,
    Write = 55,
    Lseek = 59,
}

/// System call error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum SyscallError {
    /// Operation not permitted.
    PermissionDenied = -1,
    /// No such file or directory.
    NotFound = -2,
    /// No such process.
    NoSuchProcess = -3,
    /// I/O error.
    IoError = -5,
    /// Argument list too long.
    ArgumentListTooBig = -7,
    /// Not an executable.
    ExecFormat = -8,
    /// Bad file descriptor.
    BadFileDescriptor = -9,
    /// Not a child of the caller.
    NotAChild = -10,
    /// Process table full.
    TooManyProcesses = -11,
    /// Out of memory.
    OutOfMemory = -12,
    /// Access denied.
    AccessDenied = -13,
    /// Bad address.
    BadAddress = -14,
    /// File already exists.
    AlreadyExists = -17,
    /// Not a directory.
    NotADirectory = -20,
    /// Is a directory.
    IsADirectory = -21,
    /// Invalid argument.
    InvalidArgument = -22,
    /// Descriptor table full.
    TooManyOpenFiles = -24,
    /// No space left on device.
    NoSpace = -28,
    /// Illegal seek.
    IllegalSeek = -29,
    /// Name too long.
    NameTooLong = -36,
    /// Function not implemented.
    NotImplemented = -38,
    /// Unknown error.
    Unknown = -255,
}

impl SyscallError {
    /// Convert raw return value to error.
    pub fn from_raw(val: i64) -> Self {
        match val {
            -1 => Self::PermissionDenied,
            -2 => Self::NotFound,
            -3 => Self::NoSuchProcess,
            -5 => Self::IoError,
            -7 => Self::ArgumentListTooBig,
            -8 => Self::ExecFormat,
            -9 => Self::BadFileDescriptor,
            -10 => Self::NotAChild,
            -11 => Self::TooManyProcesses,
            -12 => Self::OutOfMemory,
            -13 => Self::AccessDenied,
            -14 => Self::BadAddress,
            -17 => Self::AlreadyExists,
            -20 => Self::NotADirectory,
            -21 => Self::IsADirectory,
            -22 => Self::InvalidArgument,
            -24 => Self::TooManyOpenFiles,
            -28 => Self::NoSpace,
            -29 => Self::IllegalSeek,
            -36 => Self::NameTooLong,
            -38 => Self::NotImplemented,
            _ => Self::Unknown,
        }
    }

    /// Positive errno value.
    pub const fn errno(self) -> i32 {
        -(self as i64) as i32
    }

    /// Short description for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "operation not permitted",
            Self::NotFound => "no such file or directory",
            Self::NoSuchProcess => "no such process",
            Self::IoError => "i/o error",
            Self::ArgumentListTooBig => "argument list too long",
            Self::ExecFormat => "exec format error",
            Self::BadFileDescriptor => "bad file descriptor",
            Self::NotAChild => "no child processes",
            Self::TooManyProcesses => "too many processes",
            Self::OutOfMemory => "out of memory",
            Self::AccessDenied => "permission denied",
            Self::BadAddress => "bad address",
            Self::AlreadyExists => "file exists",
            Self::NotADirectory => "not a directory",
            Self::IsADirectory => "is a directory",
            Self::InvalidArgument => "invalid argument",
            Self::TooManyOpenFiles => "too many open files",
            Self::NoSpace => "no space left on device",
            Self::IllegalSeek => "illegal seek",
            Self::NameTooLong => "file name too long",
            Self::NotImplemented => "function not implemented",
            Self::Unknown => "unknown error",
        }
    }
}

/// Result type for system calls.
pub type SyscallResult = Result<u64, SyscallError>;

/// Convert raw syscall return value to Result.
#[inline]
pub fn convert_result(ret: i64) -> SyscallResult {
    if ret >= 0 {
        Ok(ret as u64)
    } else {
        Err(SyscallError::from_raw(ret))
    }
}

/// System call with no arguments.
///
/// # Safety
///
/// The call must not violate memory safety of the calling program.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn syscall0(nr: SyscallNumber) -> SyscallResult {
    let ret: i64;
    unsafe {
        asm!(
            "syscall",
            inout("rax") nr as u64 => ret,
            out("rcx") _,  // clobbered by syscall
            out("r11") _,  // clobbered by syscall
            options(nostack, preserves_flags)
        );
    }
    convert_result(ret)
}

/// System call with 1 argument.
///
/// # Safety
///
/// Pointer arguments must be valid for the kernel to read or write.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn syscall1(nr: SyscallNumber, arg1: u64) -> SyscallResult {
    let ret: i64;
    unsafe {
        asm!(
            "syscall",
            inout("rax") nr as u64 => ret,
            in("rdi") arg1,
            out("rcx") _,
            out("r11") _,
            options(nostack, preserves_flags)
        );
    }
    convert_result(ret)
}

/// System call with 2 arguments.
///
/// # Safety
///
/// Pointer arguments must be valid for the kernel to read or write.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn syscall2(nr: SyscallNumber, arg1: u64, arg2: u64) -> SyscallResult {
    let ret: i64;
    unsafe {
        asm!(
            "syscall",
            inout("rax") nr as u64 => ret,
            in("rdi") arg1,
            in("rsi") arg2,
            out("rcx") _,
            out("r11") _,
            options(nostack, preserves_flags)
        );
    }
    convert_result(ret)
}

/// System call with 3 arguments.
///
/// # Safety
///
/// Pointer arguments must be valid for the kernel to read or write.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn syscall3(nr: SyscallNumber, arg1: u64, arg2: u64, arg3: u64) -> SyscallResult {
    let ret: i64;
    unsafe {
        asm!(
            "syscall",
            inout("rax") nr as u64 => ret,
            in("rdi") arg1,
            in("rsi") arg2,
            in("rdx") arg3,
            out("rcx") _,
            out("r11") _,
            options(nostack, preserves_flags)
        );
    }
    convert_result(ret)
}

#[cfg(not(target_arch = "x86_64"))]
mod unsupported {
    use super::{SyscallError, SyscallNumber, SyscallResult};

    /// # Safety
    ///
    /// Always safe; no call is made on this target.
    pub unsafe fn syscall0(_nr: SyscallNumber) -> SyscallResult {
        Err(SyscallError::NotImplemented)
    }

    /// # Safety
    ///
    /// Always safe; no call is made on this target.
    pub unsafe fn syscall1(_nr: SyscallNumber, _arg1: u64) -> SyscallResult {
        Err(SyscallError::NotImplemented)
    }

    /// # Safety
    ///
    /// Always safe; no call is made on this target.
    pub unsafe fn syscall2(_nr: SyscallNumber, _arg1: u64, _arg2: u64) -> SyscallResult {
        Err(SyscallError::NotImplemented)
    }

    /// # Safety
    ///
    /// Always safe; no call is made on this target.
    pub unsafe fn syscall3(
        _nr: SyscallNumber,
        _arg1: u64,
        _arg2: u64,
        _arg3: u64,
    ) -> SyscallResult {
        Err(SyscallError::NotImplemented)
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub use unsupported::{syscall0, syscall1, syscall2, syscall3};
