//! Virtual File System interface
//!
//! The process layer does not implement a file system. It consumes one
//! through the [`Vfs`] and [`Vnode`] traits and builds the per-process
//! descriptor machinery ([`fd`]) on top of them.

pub mod fd;
pub mod file;
pub mod flags;

use alloc::sync::Arc;

use crate::error::KernelResult;

pub use fd::FdTable;
pub use file::OpenFile;
pub use flags::{AccessMode, OpenFlags, Whence};

/// Kind of object behind a vnode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    CharDevice,
}

/// Stat information for a vnode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Current size in bytes.
    pub size: u64,
    pub kind: FileKind,
}

/// An opened file-like resource.
///
/// Holding an `Arc<dyn Vnode>` is holding a reference to the resource;
/// dropping the last one releases it.
pub trait Vnode: Send + Sync {
    /// Read into `buf` starting at `offset`. Returns the bytes transferred,
    /// which may be fewer than requested.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> KernelResult<usize>;

    /// Write `buf` at `offset`. Returns the bytes the resource accepted.
    fn write_at(&self, offset: u64, buf: &[u8]) -> KernelResult<usize>;

    fn stat(&self) -> KernelResult<Stat>;

    /// Whether the resource has a meaningful cursor position.
    fn is_seekable(&self) -> bool {
        true
    }
}

/// Path resolution service.
pub trait Vfs: Send + Sync {
    /// Open `path`. Creation, exclusivity and truncation requested in
    /// `flags` are handled here; errors are returned to the caller as is.
    fn open(&self, path: &str, flags: OpenFlags) -> KernelResult<Arc<dyn Vnode>>;
}
