//! Open flags, access modes and seek origins.

use crate::error::{Errno, KernelResult};

bitflags::bitflags! {
    /// Flags accepted by `open`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const WRONLY = 1;
        const RDWR = 2;
        const CREAT = 4;
        const EXCL = 8;
        const TRUNC = 16;
        const APPEND = 32;
    }
}

impl OpenFlags {
    /// Read-only access has no bits set.
    pub const RDONLY: OpenFlags = OpenFlags::empty();

    /// Combinations `open` supports.
    const SUPPORTED: [OpenFlags; 11] = [
        OpenFlags::RDONLY,
        OpenFlags::WRONLY,
        OpenFlags::RDWR,
        OpenFlags::CREAT.union(OpenFlags::WRONLY),
        OpenFlags::CREAT.union(OpenFlags::RDWR),
        OpenFlags::CREAT.union(OpenFlags::EXCL).union(OpenFlags::WRONLY),
        OpenFlags::CREAT.union(OpenFlags::EXCL).union(OpenFlags::RDWR),
        OpenFlags::TRUNC.union(OpenFlags::WRONLY),
        OpenFlags::TRUNC.union(OpenFlags::RDWR),
        OpenFlags::WRONLY.union(OpenFlags::APPEND),
        OpenFlags::RDWR.union(OpenFlags::APPEND),
    ];

    /// Decode a raw flag word from userspace.
    ///
    /// Unknown bits and combinations outside the supported set are
    /// rejected with `InvalidArgument`.
    pub fn parse(raw: u32) -> KernelResult<Self> {
        let flags = OpenFlags::from_bits(raw).ok_or(Errno::InvalidArgument)?;
        if Self::SUPPORTED.contains(&flags) {
            Ok(flags)
        } else {
            Err(Errno::InvalidArgument)
        }
    }

    pub fn access_mode(self) -> AccessMode {
        if self.contains(OpenFlags::RDWR) {
            AccessMode::ReadWrite
        } else if self.contains(OpenFlags::WRONLY) {
            AccessMode::WriteOnly
        } else {
            AccessMode::ReadOnly
        }
    }
}

/// Direction(s) an open file may be used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn can_read(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

/// Origin of an `lseek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    /// SEEK_SET
    Set = 0,
    /// SEEK_CUR
    Current = 1,
    /// SEEK_END
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = Errno;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Whence::Set),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(Errno::InvalidArgument),
        }
    }
}
