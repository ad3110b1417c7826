//! Trap Frame
//!
//! User register state saved on entry to a system call.

use crate::config::SYSCALL_INSN_LEN;

/// Registers the syscall path reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    /// System call number
    pub number: u64,
    /// Raw arguments, in calling-convention order
    pub args: [u64; 6],
    /// Value handed back to userspace
    pub retval: i64,
    /// Program counter of the trapping instruction
    pub pc: u64,
    /// User stack pointer
    pub sp: u64,
}

impl TrapFrame {
    /// Frame for a syscall with the given number and arguments.
    pub fn syscall(number: u64, args: &[u64]) -> Self {
        let mut frame = TrapFrame {
            number,
            ..Default::default()
        };
        for (slot, value) in frame.args.iter_mut().zip(args) {
            *slot = *value;
        }
        frame
    }

    /// Argument `index`, or 0 past the end.
    pub fn arg(&self, index: usize) -> u64 {
        self.args.get(index).copied().unwrap_or(0)
    }

    pub fn set_return(&mut self, value: i64) {
        self.retval = value;
    }

    /// Step past the syscall instruction so the thread does not re-trap.
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(SYSCALL_INSN_LEN as u64);
    }

    /// The frame a forked child resumes with: fork returns 0 and execution
    /// continues after the syscall instruction.
    pub fn for_forked_child(&self) -> Self {
        let mut child = *self;
        child.set_return(0);
        child.advance_pc();
        child
    }
}
