//! System call handling module.
//!
//! Decodes a trap frame, runs the matching handler against the calling
//! process and encodes the result: a non-negative value on success, a
//! negated errno on failure. `_exit` and a successful `execv` do not
//! return to the caller at all.

pub mod handlers;

use alloc::sync::Arc;

use crate::error::{Errno, KernelResult};
use crate::loader::UserEntry;
use crate::process::{Process, ProcessManager, TrapFrame};

/// System call numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum SyscallNumber {
    // ==========================================
    // Process Management
    // ==========================================
    /// Duplicate the calling process.
    Fork = 0,
    /// Replace the program image.
    Execv = 2,
    /// Terminate the calling process.
    Exit = 3,
    /// Wait for a child to exit.
    Waitpid = 4,
    /// Id of the calling process.
    Getpid = 5,

    // ==========================================
    // File Descriptors
    // ==========================================
    /// Open a file.
    Open = 45,
    /// Duplicate a descriptor onto another.
    Dup2 = 48,
    /// Close a descriptor.
    Close = 49,
    /// Read from a descriptor.
    Read = 50,
    /// Write to a descriptor.
    Write = 55,
    /// Reposition a descriptor's offset.
    Lseek = 59,
}

impl TryFrom<u64> for SyscallNumber {
    type Error = Errno;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SyscallNumber::Fork),
            2 => Ok(SyscallNumber::Execv),
            3 => Ok(SyscallNumber::Exit),
            4 => Ok(SyscallNumber::Waitpid),
            5 => Ok(SyscallNumber::Getpid),
            45 => Ok(SyscallNumber::Open),
            48 => Ok(SyscallNumber::Dup2),
            49 => Ok(SyscallNumber::Close),
            50 => Ok(SyscallNumber::Read),
            55 => Ok(SyscallNumber::Write),
            59 => Ok(SyscallNumber::Lseek),
            _ => Err(Errno::NotImplemented),
        }
    }
}

/// Outcome of a dispatched syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallReturn {
    /// Return to the caller with this value in the return register.
    Value(i64),
    /// The process exited; end the calling thread.
    Exit,
    /// The image was replaced; enter it.
    Exec(UserEntry),
}

/// State a handler runs against.
pub struct SyscallContext<'a> {
    pub manager: &'a ProcessManager,
    pub process: &'a Arc<Process>,
}

/// Run the syscall described by `frame` on behalf of `process`.
pub fn dispatch(
    manager: &ProcessManager,
    process: &Arc<Process>,
    frame: &TrapFrame,
) -> SyscallReturn {
    let ctx = SyscallContext { manager, process };
    let result: KernelResult<SyscallReturn> =
        SyscallNumber::try_from(frame.number).and_then(|number| {
            #[cfg(feature = "trace-syscalls")]
            log::trace!(
                "[KESTREL SYSCALL] pid {} {:?} {:x?}",
                process.pid(),
                number,
                frame.args
            );
            handlers::handle(number, &ctx, frame)
        });

    match result {
        Ok(ret) => ret,
        Err(err) => {
            log::trace!(
                "[KESTREL SYSCALL] pid {} call {} -> {}",
                process.pid(),
                frame.number,
                err
            );
            SyscallReturn::Value(err.as_syscall_return())
        }
    }
}

/// Syscall entry from the trap handler.
///
/// Returns with the result stored in `frame` and the program counter past
/// the trapping instruction, unless the call ended the thread or replaced
/// the image.
pub fn syscall(manager: &ProcessManager, process: &Arc<Process>, frame: &mut TrapFrame) {
    match dispatch(manager, process, frame) {
        SyscallReturn::Value(value) => {
            frame.set_return(value);
            frame.advance_pc();
        }
        SyscallReturn::Exit => manager.threads().exit_current(),
        SyscallReturn::Exec(entry) => manager.threads().enter_new_process(entry),
    }
}
