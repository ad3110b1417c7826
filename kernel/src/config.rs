//! Kernel configuration constants.
//!
//! This module contains the resource limits of the process and file
//! descriptor layer. The constants are the platform defaults; a
//! [`KernelConfig`] carries the same limits at runtime so a kernel (or a
//! test) can run with smaller tables.

use crate::error::{Errno, KernelResult};

/// Descriptor slots per process (including the three standard streams).
pub const OPEN_MAX: usize = 128;

/// Fd 0/1/2 are reserved for stdin/stdout/stderr.
pub const FIRST_USER_FD: usize = 3;

/// Standard input descriptor.
pub const STDIN_FILENO: usize = 0;

/// Standard output descriptor.
pub const STDOUT_FILENO: usize = 1;

/// Standard error descriptor.
pub const STDERR_FILENO: usize = 2;

/// Maximum number of live process records, zombies included.
pub const MAX_PROCESSES: usize = 256;

/// Lowest process id handed out to user processes.
pub const PID_MIN: u32 = 2;

/// Highest process id before the allocator wraps around.
pub const PID_MAX: u32 = 32767;

/// Maximum total size of exec arguments in bytes, terminators included.
pub const ARG_MAX: usize = 64 * 1024;

/// Maximum path length accepted from userspace, terminator included.
pub const PATH_MAX: usize = 1024;

/// Size of a user pointer slot in the argument vector.
pub const USER_WORD_SIZE: usize = 4;

/// Alignment of every string and pointer placed on a new user stack.
pub const STACK_ALIGN: usize = 4;

/// Device opened for the standard streams of the first process.
pub const CONSOLE_PATH: &str = "con:";

/// Length of the instruction that traps into the kernel.
pub const SYSCALL_INSN_LEN: usize = 4;

/// Runtime resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Descriptor slots per process.
    pub open_max: usize,
    /// Process table capacity.
    pub max_processes: usize,
    /// Maximum exec argument bytes.
    pub arg_max: usize,
    /// Maximum path bytes.
    pub path_max: usize,
}

impl KernelConfig {
    /// Platform defaults.
    pub const fn new() -> Self {
        Self {
            open_max: OPEN_MAX,
            max_processes: MAX_PROCESSES,
            arg_max: ARG_MAX,
            path_max: PATH_MAX,
        }
    }

    pub const fn with_open_max(mut self, open_max: usize) -> Self {
        self.open_max = open_max;
        self
    }

    pub const fn with_max_processes(mut self, max_processes: usize) -> Self {
        self.max_processes = max_processes;
        self
    }

    pub const fn with_arg_max(mut self, arg_max: usize) -> Self {
        self.arg_max = arg_max;
        self
    }

    pub const fn with_path_max(mut self, path_max: usize) -> Self {
        self.path_max = path_max;
        self
    }

    /// Reject limits the rest of the kernel cannot honour.
    pub fn validate(&self) -> KernelResult<()> {
        if self.open_max <= FIRST_USER_FD
            || self.max_processes == 0
            || self.arg_max == 0
            || self.path_max < 2
        {
            return Err(Errno::InvalidArgument);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
