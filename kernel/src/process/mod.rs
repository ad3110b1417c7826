//! Process Management
//!
//! Process records, the process table, and the lifecycle operations
//! (fork, exec, exit, wait) built on them.

pub mod context;
pub mod manager;
pub mod table;

pub use context::TrapFrame;
pub use manager::{ProcessManager, Services};
pub use table::{Pid, Process, ProcessState, ProcessTable};
