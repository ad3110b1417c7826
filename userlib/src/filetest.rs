//! `filetest` sample program
//!
//! Opens a file (named by `argv[1]`, or `testfile` when started with no
//! arguments), reads five bytes from it, echoes them to stdout and closes
//! it. The program logic runs against [`FileApi`] so it can be exercised
//! without a kernel.

use core::ffi::CStr;

use crate::fs;
use crate::io::{STDERR, STDOUT};
use crate::process::argv_entry;
use crate::syscall::{SyscallError, SyscallResult};

/// File used when no argument is given.
pub const DEFAULT_PATH: &CStr = c"testfile";

/// Bytes read from the file.
pub const READ_LEN: usize = 5;

/// File operations the program needs.
pub trait FileApi {
    fn open(&mut self, path: &CStr, flags: u32) -> SyscallResult;
    fn read(&mut self, fd: u64, buf: &mut [u8]) -> SyscallResult;
    fn write(&mut self, fd: u64, buf: &[u8]) -> SyscallResult;
    fn close(&mut self, fd: u64) -> SyscallResult;
}

/// The running kernel.
pub struct Kernel;

impl FileApi for Kernel {
    fn open(&mut self, path: &CStr, flags: u32) -> SyscallResult {
        fs::open(path, flags)
    }

    fn read(&mut self, fd: u64, buf: &mut [u8]) -> SyscallResult {
        fs::read(fd, buf)
    }

    fn write(&mut self, fd: u64, buf: &[u8]) -> SyscallResult {
        fs::write(fd, buf)
    }

    fn close(&mut self, fd: u64) -> SyscallResult {
        fs::close(fd)
    }
}

fn say<A: FileApi>(api: &mut A, fd: u64, parts: &[&[u8]]) {
    for part in parts {
        let _ = api.write(fd, part);
    }
}

fn fail<A: FileApi>(api: &mut A, path: &CStr, what: &str, err: SyscallError) -> i32 {
    say(
        api,
        STDERR,
        &[
            b"filetest: ",
            path.to_bytes(),
            b": ",
            what.as_bytes(),
            b": ",
            err.as_str().as_bytes(),
            b"\n",
        ],
    );
    1
}

/// Run the program with `args` (`args[0]` is the program name). Returns
/// the exit code.
pub fn run<A: FileApi>(api: &mut A, args: &[&CStr]) -> i32 {
    let path = match args {
        [] => {
            say(api, STDERR, &[b"filetest: No arguments - running on \"testfile\"\n"]);
            DEFAULT_PATH
        }
        [_, file] => {
            say(api, STDOUT, &[b"file name : ", file.to_bytes(), b"\n"]);
            *file
        }
        _ => {
            say(api, STDERR, &[b"Usage: filetest <filename>\n"]);
            return 1;
        }
    };

    let fd = match api.open(path, fs::O_RDONLY) {
        Ok(fd) => fd,
        Err(err) => return fail(api, path, "open for read", err),
    };

    let mut buf = [0u8; READ_LEN];
    let count = match api.read(fd, &mut buf) {
        Ok(count) => count as usize,
        Err(err) => return fail(api, path, "read", err),
    };
    say(api, STDOUT, &[&buf[..count.min(READ_LEN)]]);

    if let Err(err) = api.close(fd) {
        return fail(api, path, "close", err);
    }

    say(api, STDOUT, &[b"Passed filetest.\n"]);
    0
}

/// Program entry with the kernel's `argc`/`argv`.
///
/// # Safety
///
/// `argv` must point to `argc` 32-bit slots, each holding the address of
/// a valid NUL-terminated string.
pub unsafe fn main(argc: usize, argv: *const u32) -> i32 {
    let mut args: [&CStr; 2] = [DEFAULT_PATH; 2];
    if argc > args.len() {
        return run(&mut Kernel, &[DEFAULT_PATH; 3]);
    }
    for (i, arg) in args.iter_mut().enumerate().take(argc) {
        *arg = unsafe { CStr::from_ptr(argv_entry(argv, i)) };
    }
    run(&mut Kernel, &args[..argc])
}
