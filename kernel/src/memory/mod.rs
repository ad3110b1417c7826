//! User memory access
//!
//! Address spaces are provided by the embedding kernel. This module
//! defines what the process layer needs from them: byte copies across the
//! user/kernel boundary, duplication for fork and stack setup for exec.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::config::USER_WORD_SIZE;
use crate::error::{Errno, KernelResult};

/// A pointer-sized slot in user memory.
pub type UserWord = u32;

/// A virtual address in a user address space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserAddr(pub usize);

impl UserAddr {
    pub const NULL: UserAddr = UserAddr(0);

    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `self + bytes`, failing with `BadAddress` on overflow.
    pub fn add(self, bytes: usize) -> KernelResult<Self> {
        self.0.checked_add(bytes).map(Self).ok_or(Errno::BadAddress)
    }

    /// `self - bytes`, failing with `BadAddress` on underflow.
    pub fn sub(self, bytes: usize) -> KernelResult<Self> {
        self.0.checked_sub(bytes).map(Self).ok_or(Errno::BadAddress)
    }

    /// The address as a user word.
    pub fn to_word(self) -> KernelResult<UserWord> {
        UserWord::try_from(self.0).map_err(|_| Errno::BadAddress)
    }

    pub fn is_aligned(self, align: usize) -> bool {
        self.0 % align == 0
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#x})", self.0)
    }
}

impl From<UserWord> for UserAddr {
    fn from(word: UserWord) -> Self {
        Self(word as usize)
    }
}

/// Copying across the user/kernel boundary.
///
/// Addresses outside the mapped user range fail with `BadAddress`.
pub trait UserMemory {
    /// Fill `dst` from user memory at `src`.
    fn copy_in(&self, src: UserAddr, dst: &mut [u8]) -> KernelResult<()>;

    /// Store `src` into user memory at `dst`.
    fn copy_out(&mut self, src: &[u8], dst: UserAddr) -> KernelResult<()>;

    /// Copy a NUL-terminated string of at most `max` bytes (terminator
    /// included). Returns the bytes without the terminator.
    fn copy_in_str(&self, src: UserAddr, max: usize) -> KernelResult<Vec<u8>> {
        if src.is_null() {
            return Err(Errno::BadAddress);
        }

        let mut bytes = Vec::new();
        let mut byte = [0u8; 1];
        for i in 0..max {
            self.copy_in(src.add(i)?, &mut byte)?;
            if byte[0] == 0 {
                return Ok(bytes);
            }
            bytes.push(byte[0]);
        }
        Err(Errno::NameTooLong)
    }

    fn copy_in_word(&self, src: UserAddr) -> KernelResult<UserWord> {
        let mut raw = [0u8; USER_WORD_SIZE];
        self.copy_in(src, &mut raw)?;
        Ok(UserWord::from_ne_bytes(raw))
    }

    fn copy_out_word(&mut self, word: UserWord, dst: UserAddr) -> KernelResult<()> {
        self.copy_out(&word.to_ne_bytes(), dst)
    }
}

/// A process's user address space. Dropping it destroys it.
pub trait AddressSpace: UserMemory + Send {
    /// Deep copy for a forked child.
    fn duplicate(&self) -> KernelResult<Box<dyn AddressSpace>>;

    /// Make this the address space of the running CPU.
    fn activate(&self);

    /// Map the user stack. Returns the initial stack top.
    fn define_stack(&mut self) -> KernelResult<UserAddr>;
}

/// Creates empty address spaces for exec.
pub trait AddressSpaceFactory: Send + Sync {
    fn create(&self) -> KernelResult<Box<dyn AddressSpace>>;
}
