//! Thread service interface
//!
//! Scheduling belongs to the embedding kernel. The process layer asks it
//! to start a thread for a forked child, to drop the current thread into
//! user mode after exec, to end the current thread, and to yield while
//! waiting.

use alloc::sync::Arc;

use crate::error::KernelResult;
use crate::loader::UserEntry;
use crate::process::{Process, TrapFrame};

pub trait ThreadService: Send + Sync {
    /// Start a thread in `process` that resumes user mode with `frame`.
    fn fork_thread(&self, name: &str, process: Arc<Process>, frame: TrapFrame) -> KernelResult<()>;

    /// Enter user mode at a freshly loaded image. Never returns.
    fn enter_new_process(&self, entry: UserEntry) -> !;

    /// End the calling thread. Never returns.
    fn exit_current(&self) -> !;

    /// Give up the CPU.
    fn yield_now(&self);
}
