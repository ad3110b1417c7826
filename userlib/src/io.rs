//! I/O functions for userspace.
//!
//! This module provides standard I/O operations like print and read.

pub use crate::fs::{read, write};

/// File descriptor for stdin.
pub const STDIN: u64 = 0;
/// File descriptor for stdout.
pub const STDOUT: u64 = 1;
/// File descriptor for stderr.
pub const STDERR: u64 = 2;

/// Print a string to stdout.
pub fn print(s: &str) {
    let _ = write(STDOUT, s.as_bytes());
}

/// Print a string to stdout with a newline.
pub fn println(s: &str) {
    print(s);
    print("\n");
}

/// Print a string to stderr.
pub fn eprint(s: &str) {
    let _ = write(STDERR, s.as_bytes());
}

/// Print a string to stderr with a newline.
pub fn eprintln(s: &str) {
    eprint(s);
    eprint("\n");
}
