//! Process management for userspace.
//!
//! This module provides functions to control the current process
//! and create new processes.

use core::ffi::{c_char, CStr};

use crate::syscall::{
    syscall0, syscall1, syscall2, syscall3, SyscallError, SyscallNumber, SyscallResult,
};

/// Most arguments `execv` will pass.
pub const MAX_EXEC_ARGS: usize = 64;

/// Exit the current process.
pub fn exit(code: i32) -> ! {
    unsafe {
        let _ = syscall1(SyscallNumber::Exit, code as u64);
    }
    // Should never reach here
    loop {
        core::hint::spin_loop();
    }
}

/// Get current process ID.
pub fn getpid() -> u64 {
    unsafe { syscall0(SyscallNumber::Getpid).unwrap_or(0) }
}

/// Fork the current process.
///
/// Returns:
/// - `Ok(0)` in the child process
/// - `Ok(child_pid)` in the parent process
/// - `Err(_)` if fork failed
pub fn fork() -> SyscallResult {
    unsafe { syscall0(SyscallNumber::Fork) }
}

/// Wait status result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStatus {
    raw: i32,
}

impl WaitStatus {
    /// Create from raw status.
    pub const fn from_raw(raw: i32) -> Self {
        Self { raw }
    }

    pub const fn raw(&self) -> i32 {
        self.raw
    }

    /// Check if child exited normally.
    pub fn exited(&self) -> bool {
        (self.raw & 0x7f) == 0
    }

    /// Get exit code (if exited normally).
    pub fn exit_code(&self) -> Option<i32> {
        if self.exited() {
            Some((self.raw >> 8) & 0xff)
        } else {
            None
        }
    }
}

/// Wait for child `pid` to exit. `options` must be 0.
///
/// Returns `(pid, status)` on success.
pub fn waitpid(pid: u64, options: u32) -> Result<(u64, WaitStatus), SyscallError> {
    let mut status: i32 = 0;
    let result = unsafe {
        syscall3(
            SyscallNumber::Waitpid,
            pid,
            &mut status as *mut i32 as u64,
            options as u64,
        )
    }?;

    Ok((result, WaitStatus::from_raw(status)))
}

/// Build the NULL-terminated pointer array `execv` expects. Pointer slots
/// are 32-bit; an argument outside that range cannot be passed.
pub fn build_argv(
    args: &[&CStr],
    slots: &mut [u32; MAX_EXEC_ARGS + 1],
) -> Result<(), SyscallError> {
    if args.len() > MAX_EXEC_ARGS {
        return Err(SyscallError::ArgumentListTooBig);
    }
    for (slot, arg) in slots.iter_mut().zip(args) {
        *slot = u32::try_from(arg.as_ptr() as usize).map_err(|_| SyscallError::BadAddress)?;
    }
    slots[args.len()] = 0;
    Ok(())
}

/// Pointer held in slot `index` of an argument vector with 32-bit slots,
/// the layout both `build_argv` and the kernel's exec produce.
///
/// # Safety
///
/// `argv` must point to at least `index + 1` readable slots.
pub unsafe fn argv_entry(argv: *const u32, index: usize) -> *const c_char {
    let slot = unsafe { argv.add(index).read() };
    slot as usize as *const c_char
}

/// Replace the current program. Returns only on failure.
pub fn execv(path: &CStr, args: &[&CStr]) -> SyscallError {
    let mut slots = [0u32; MAX_EXEC_ARGS + 1];
    if let Err(err) = build_argv(args, &mut slots) {
        return err;
    }

    let result = unsafe {
        syscall2(
            SyscallNumber::Execv,
            path.as_ptr() as u64,
            slots.as_ptr() as u64,
        )
    };
    match result {
        Err(err) => err,
        Ok(_) => SyscallError::Unknown,
    }
}
