//! System call handlers.
//!
//! Each handler unpacks its arguments from the trap frame, moves data
//! across the user/kernel boundary and calls into the process or
//! descriptor layer.

use alloc::string::String;
use alloc::vec;

use super::{SyscallContext, SyscallNumber, SyscallReturn};
use crate::error::{Errno, KernelResult};
use crate::loader::ArgVector;
use crate::memory::{UserAddr, UserMemory, UserWord};
use crate::process::{Pid, TrapFrame};
use crate::vfs::fd;

/// Largest single read or write transfer; longer requests are short.
pub const MAX_TRANSFER: usize = 64 * 1024;

/// Route a decoded syscall to its handler.
pub fn handle(
    number: SyscallNumber,
    ctx: &SyscallContext<'_>,
    frame: &TrapFrame,
) -> KernelResult<SyscallReturn> {
    match number {
        SyscallNumber::Fork => sys_fork(ctx, frame),
        SyscallNumber::Execv => sys_execv(ctx, user_addr(frame.arg(0)), user_addr(frame.arg(1))),
        SyscallNumber::Exit => sys_exit(ctx, frame.arg(0) as i32),
        SyscallNumber::Waitpid => sys_waitpid(
            ctx,
            Pid::from_raw(frame.arg(0) as i64),
            user_addr(frame.arg(1)),
            frame.arg(2) as i32,
        ),
        SyscallNumber::Getpid => sys_getpid(ctx),
        SyscallNumber::Open => sys_open(ctx, user_addr(frame.arg(0)), frame.arg(1) as u32),
        SyscallNumber::Dup2 => sys_dup2(ctx, frame.arg(0), frame.arg(1)),
        SyscallNumber::Close => sys_close(ctx, frame.arg(0)),
        SyscallNumber::Read => sys_read(
            ctx,
            frame.arg(0),
            user_addr(frame.arg(1)),
            frame.arg(2) as usize,
        ),
        SyscallNumber::Write => sys_write(
            ctx,
            frame.arg(0),
            user_addr(frame.arg(1)),
            frame.arg(2) as usize,
        ),
        SyscallNumber::Lseek => sys_lseek(
            ctx,
            frame.arg(0),
            frame.arg(1) as i64,
            frame.arg(2) as i32,
        ),
    }
}

fn user_addr(raw: u64) -> UserAddr {
    UserAddr::new(raw as usize)
}

/// Descriptor argument. Negative values can never name a slot.
fn descriptor(raw: u64) -> KernelResult<usize> {
    let signed = raw as i64;
    usize::try_from(signed).map_err(|_| Errno::BadFileDescriptor)
}

/// Copy a path string out of the caller's address space.
fn copy_in_path(ctx: &SyscallContext<'_>, path: UserAddr) -> KernelResult<String> {
    let max = ctx.manager.config().path_max;
    let bytes = ctx
        .process
        .with_addrspace(|space| space.copy_in_str(path, max))?;
    String::from_utf8(bytes).map_err(|_| Errno::InvalidArgument)
}

// ── Process Management ──────────────────────────────────────

fn sys_fork(ctx: &SyscallContext<'_>, frame: &TrapFrame) -> KernelResult<SyscallReturn> {
    let pid = ctx.manager.fork(ctx.process, frame)?;
    Ok(SyscallReturn::Value(pid.as_u32() as i64))
}

fn sys_execv(
    ctx: &SyscallContext<'_>,
    path: UserAddr,
    argv: UserAddr,
) -> KernelResult<SyscallReturn> {
    let arg_max = ctx.manager.config().arg_max;
    let args = ctx
        .process
        .with_addrspace(|space| ArgVector::copy_in(&*space, argv, arg_max))?;
    let path = copy_in_path(ctx, path)?;

    let entry = ctx.manager.exec(ctx.process, &path, &args)?;
    Ok(SyscallReturn::Exec(entry))
}

fn sys_exit(ctx: &SyscallContext<'_>, code: i32) -> KernelResult<SyscallReturn> {
    ctx.manager.exit(ctx.process, code);
    Ok(SyscallReturn::Exit)
}

/// Wait status word for a normal exit.
pub fn encode_exit_status(code: i32) -> UserWord {
    ((code & 0xff) as UserWord) << 8
}

fn sys_waitpid(
    ctx: &SyscallContext<'_>,
    pid: Pid,
    status: UserAddr,
    options: i32,
) -> KernelResult<SyscallReturn> {
    let (code, pid) = ctx.manager.wait(ctx.process, pid, options)?;
    if !status.is_null() {
        ctx.process
            .with_addrspace(|space| space.copy_out_word(encode_exit_status(code), status))?;
    }
    Ok(SyscallReturn::Value(pid.as_u32() as i64))
}

fn sys_getpid(ctx: &SyscallContext<'_>) -> KernelResult<SyscallReturn> {
    let pid = ctx.manager.getpid(ctx.process);
    Ok(SyscallReturn::Value(pid.as_u32() as i64))
}

// ── File Descriptors ────────────────────────────────────────

fn sys_open(ctx: &SyscallContext<'_>, path: UserAddr, flags: u32) -> KernelResult<SyscallReturn> {
    let path = copy_in_path(ctx, path)?;
    let fd = fd::open(ctx.process.files(), ctx.manager.vfs(), &path, flags)?;
    Ok(SyscallReturn::Value(fd as i64))
}

fn sys_read(
    ctx: &SyscallContext<'_>,
    fd: u64,
    buf: UserAddr,
    len: usize,
) -> KernelResult<SyscallReturn> {
    let fd = descriptor(fd)?;
    ctx.process.files().lock().get(fd)?;
    if buf.is_null() {
        return Err(Errno::BadAddress);
    }

    let mut kbuf = vec![0u8; len.min(MAX_TRANSFER)];
    let count = fd::read(ctx.process.files(), fd, &mut kbuf)?;
    ctx.process
        .with_addrspace(|space| space.copy_out(&kbuf[..count], buf))?;
    Ok(SyscallReturn::Value(count as i64))
}

fn sys_write(
    ctx: &SyscallContext<'_>,
    fd: u64,
    buf: UserAddr,
    len: usize,
) -> KernelResult<SyscallReturn> {
    let fd = descriptor(fd)?;
    ctx.process.files().lock().get(fd)?;
    if buf.is_null() {
        return Err(Errno::BadAddress);
    }

    let mut kbuf = vec![0u8; len.min(MAX_TRANSFER)];
    ctx.process.with_addrspace(|space| space.copy_in(buf, &mut kbuf))?;
    let count = fd::write(ctx.process.files(), fd, &kbuf)?;
    Ok(SyscallReturn::Value(count as i64))
}

fn sys_lseek(
    ctx: &SyscallContext<'_>,
    fd: u64,
    pos: i64,
    whence: i32,
) -> KernelResult<SyscallReturn> {
    let fd = descriptor(fd)?;
    let offset = fd::lseek(ctx.process.files(), fd, pos, whence)?;
    Ok(SyscallReturn::Value(offset as i64))
}

fn sys_close(ctx: &SyscallContext<'_>, fd: u64) -> KernelResult<SyscallReturn> {
    fd::close(ctx.process.files(), descriptor(fd)?)?;
    Ok(SyscallReturn::Value(0))
}

fn sys_dup2(ctx: &SyscallContext<'_>, old_fd: u64, new_fd: u64) -> KernelResult<SyscallReturn> {
    let new_fd = fd::dup2(ctx.process.files(), descriptor(old_fd)?, descriptor(new_fd)?)?;
    Ok(SyscallReturn::Value(new_fd as i64))
}
