//! Kestrel Userspace Library
//!
//! System call wrappers for programs running on the Kestrel kernel, plus
//! the `filetest` sample program.
//!
//! # Architecture
//!
//! Programs trap into the kernel with the `syscall` instruction. Arguments
//! go in registers; the kernel answers with a non-negative value or a
//! negated errno, which [`syscall`] turns into a `Result`.
//!
//! # Example
//!
//! ```rust,no_run
//! use userlib::{fs, io};
//!
//! let fd = fs::open(c"notes", fs::O_RDONLY).unwrap();
//! let mut buf = [0u8; 16];
//! let n = fs::read(fd, &mut buf).unwrap();
//! let _ = io::write(io::STDOUT, &buf[..n as usize]);
//! ```

#![cfg_attr(not(test), no_std)]

pub mod filetest;
pub mod fs;
pub mod io;
pub mod process;
pub mod syscall;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::fs::{close, open, read, write};
    pub use crate::io::{print, println};
    pub use crate::process::{exit, fork, getpid, waitpid};
    pub use crate::syscall::SyscallError;
}
