//! Exec argument handling
//!
//! Arguments are copied into kernel memory before the old image is torn
//! down, then written onto the new user stack. Stack layout, growing
//! down from the top returned by `define_stack`:
//!
//! ```text
//! top ->  +-----------------------------+
//!         | string argc-1, NUL, padding |
//!         | ...                         |
//!         | string 0, NUL, padding      |  <- argv[0]
//!         +-----------------------------+
//!         | NULL                        |  argv[argc]
//!         | argv[argc-1]                |
//!         | ...                         |
//! sp  ->  | argv[0]                     |
//!         +-----------------------------+
//! ```
//!
//! Strings are in ascending order, each padded with zeros to a
//! `STACK_ALIGN` boundary. Pointer slots are `USER_WORD_SIZE` bytes.

use alloc::vec::Vec;

use crate::config::{STACK_ALIGN, USER_WORD_SIZE};
use crate::error::{Errno, KernelResult};
use crate::memory::{UserAddr, UserMemory};

/// Kernel-owned copy of an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgVector {
    /// Argument bytes, terminators excluded.
    args: Vec<Vec<u8>>,
    /// Total bytes, terminators included.
    total: usize,
}

/// Result of marshalling onto a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgLayout {
    pub argc: usize,
    /// Address of the pointer array; also the new stack pointer.
    pub argv: UserAddr,
    /// Bytes consumed below the stack top.
    pub size: usize,
}

const fn padded(len: usize) -> usize {
    (len + STACK_ALIGN - 1) & !(STACK_ALIGN - 1)
}

impl ArgVector {
    /// Build from kernel strings. Arguments must not contain NUL bytes.
    pub fn new(args: Vec<Vec<u8>>, arg_max: usize) -> KernelResult<Self> {
        let mut total = 0usize;
        for arg in &args {
            if arg.contains(&0) {
                return Err(Errno::InvalidArgument);
            }
            total = total.checked_add(arg.len() + 1).ok_or(Errno::ArgumentListTooBig)?;
            if total > arg_max {
                return Err(Errno::ArgumentListTooBig);
            }
        }
        Ok(Self { args, total })
    }

    pub fn from_strs(args: &[&str], arg_max: usize) -> KernelResult<Self> {
        Self::new(args.iter().map(|arg| arg.as_bytes().to_vec()).collect(), arg_max)
    }

    /// Copy a NULL-terminated `argv` array and its strings out of user
    /// memory. The byte total is checked as each string is copied, so an
    /// oversized vector is rejected without reading past the limit.
    pub fn copy_in<M>(mem: &M, argv: UserAddr, arg_max: usize) -> KernelResult<Self>
    where
        M: UserMemory + ?Sized,
    {
        if argv.is_null() {
            return Err(Errno::BadAddress);
        }

        let mut args = Vec::new();
        let mut total = 0usize;
        loop {
            let slot = argv.add(args.len() * USER_WORD_SIZE)?;
            let ptr = UserAddr::from(mem.copy_in_word(slot)?);
            if ptr.is_null() {
                break;
            }

            let remaining = arg_max - total;
            if remaining == 0 {
                return Err(Errno::ArgumentListTooBig);
            }
            let arg = match mem.copy_in_str(ptr, remaining) {
                Err(Errno::NameTooLong) => return Err(Errno::ArgumentListTooBig),
                other => other?,
            };
            total += arg.len() + 1;
            args.push(arg);
        }

        Ok(Self { args, total })
    }

    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// Total string bytes, terminators included.
    pub fn total_bytes(&self) -> usize {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.args.iter().map(Vec::as_slice)
    }

    /// Bytes the vector occupies on a user stack.
    pub fn stack_size(&self) -> usize {
        let strings: usize = self.args.iter().map(|arg| padded(arg.len() + 1)).sum();
        strings + USER_WORD_SIZE * (self.argc() + 1)
    }

    /// Write the vector below `stack_top`.
    pub fn marshal<M>(&self, mem: &mut M, stack_top: UserAddr) -> KernelResult<ArgLayout>
    where
        M: UserMemory + ?Sized,
    {
        let top = UserAddr(stack_top.as_usize() & !(STACK_ALIGN - 1));
        let size = self.stack_size();
        let sp = top.sub(size).map_err(|_| Errno::ArgumentListTooBig)?;

        let mut cursor = sp.add(USER_WORD_SIZE * (self.argc() + 1))?;
        let mut slot = sp;
        for arg in &self.args {
            let mut bytes = Vec::with_capacity(padded(arg.len() + 1));
            bytes.extend_from_slice(arg);
            bytes.resize(padded(arg.len() + 1), 0);
            mem.copy_out(&bytes, cursor)?;
            mem.copy_out_word(cursor.to_word()?, slot)?;

            cursor = cursor.add(bytes.len())?;
            slot = slot.add(USER_WORD_SIZE)?;
        }
        mem.copy_out_word(0, slot)?;

        Ok(ArgLayout {
            argc: self.argc(),
            argv: sp,
            size,
        })
    }
}
