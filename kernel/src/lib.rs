//! Kestrel Kernel: process and file descriptor layer
//!
//! Per-process descriptor tables over shared, reference-counted open
//! files, the process table, and the fork / exec / exit / wait lifecycle.
//! File systems, address spaces, program loading and scheduling are
//! supplied by the embedding kernel through the traits in [`vfs`],
//! [`memory`], [`loader`] and [`thread`].
//!
//! # Wiring
//!
//! ```ignore
//! let table = Arc::new(ProcessTable::new(config.max_processes));
//! let manager = ProcessManager::new(config, table, services)?;
//! let err = manager.run_program("bin/init", &["init"]);
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod loader;
pub mod memory;
pub mod process;
pub mod sync;
pub mod syscall;
pub mod thread;
pub mod vfs;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

pub use config::KernelConfig;
pub use error::{Errno, KernelResult};
pub use process::{Pid, Process, ProcessManager, ProcessTable, Services, TrapFrame};
