//! Program Loader
//!
//! Executable formats are parsed by the embedding kernel through the
//! [`Loader`] trait. [`args`] moves exec arguments from the old image into
//! the kernel and out onto the new image's stack.

pub mod args;

use crate::error::KernelResult;
use crate::memory::{AddressSpace, UserAddr};
use crate::vfs::Vnode;

pub use args::{ArgLayout, ArgVector};

/// Loads an executable image into an address space.
pub trait Loader: Send + Sync {
    /// Map the image read from `image` into `space`. Returns the entry point.
    fn load(&self, image: &dyn Vnode, space: &mut dyn AddressSpace) -> KernelResult<UserAddr>;
}

/// Where a freshly exec'd thread starts in user mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEntry {
    /// Program entry point.
    pub entry: UserAddr,
    /// Argument count passed to the entry point.
    pub argc: usize,
    /// User address of the argument pointer array.
    pub argv: UserAddr,
    /// Initial stack pointer.
    pub sp: UserAddr,
}
