//! In-memory collaborators for tests.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use hashbrown::HashMap;
use spin::Mutex;

use crate::config::{KernelConfig, CONSOLE_PATH};
use crate::error::{Errno, KernelResult};
use crate::loader::{Loader, UserEntry};
use crate::memory::{AddressSpace, AddressSpaceFactory, UserAddr, UserMemory};
use crate::process::{Pid, Process, ProcessManager, ProcessTable, Services, TrapFrame};
use crate::thread::ThreadService;
use crate::vfs::{FileKind, OpenFlags, Stat, Vfs, Vnode};

/// Magic a program image must start with.
pub const IMAGE_MAGIC: &[u8; 4] = b"\x7fELF";

/// Entry point the mock loader reports.
pub const ENTRY_POINT: UserAddr = UserAddr::new(0x0040_0000);

/// First mapped user address.
pub const USER_BASE: usize = 0x1000;

/// Bytes of mapped user memory; the stack top is at the end.
pub const USER_SIZE: usize = 256 * 1024;

/// Free user memory tests may scribble on.
pub const SCRATCH: usize = 0x2000;

// ── Files ───────────────────────────────────────────────────

/// A file or console device held in memory.
pub struct RamFile {
    contents: Mutex<Vec<u8>>,
    kind: FileKind,
    handles: AtomicUsize,
    write_limit: Mutex<Option<usize>>,
    stat_fails: AtomicBool,
}

impl RamFile {
    fn build(contents: &[u8], kind: FileKind) -> Arc<Self> {
        Arc::new(Self {
            contents: Mutex::new(contents.to_vec()),
            kind,
            handles: AtomicUsize::new(0),
            write_limit: Mutex::new(None),
            stat_fails: AtomicBool::new(false),
        })
    }

    pub fn with_contents(contents: &[u8]) -> Arc<Self> {
        Self::build(contents, FileKind::Regular)
    }

    /// A write-appending, unseekable device that reads as empty.
    pub fn console() -> Arc<Self> {
        Self::build(b"", FileKind::CharDevice)
    }

    pub fn contents(&self) -> Vec<u8> {
        self.contents.lock().clone()
    }

    /// Accept at most `limit` bytes per write.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        *self.write_limit.lock() = limit;
    }

    pub fn fail_stat(&self, fail: bool) {
        self.stat_fails.store(fail, Ordering::SeqCst);
    }

    /// Vnode references handed out by `RamFs::open` still alive.
    pub fn open_handles(&self) -> usize {
        self.handles.load(Ordering::SeqCst)
    }

    fn truncate(&self) {
        self.contents.lock().clear();
    }
}

impl Vnode for RamFile {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> KernelResult<usize> {
        if self.kind == FileKind::CharDevice {
            return Ok(0);
        }
        let contents = self.contents.lock();
        let start = (offset as usize).min(contents.len());
        let count = buf.len().min(contents.len() - start);
        buf[..count].copy_from_slice(&contents[start..start + count]);
        Ok(count)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> KernelResult<usize> {
        let count = match *self.write_limit.lock() {
            Some(limit) => buf.len().min(limit),
            None => buf.len(),
        };
        let mut contents = self.contents.lock();
        if self.kind == FileKind::CharDevice {
            contents.extend_from_slice(&buf[..count]);
            return Ok(count);
        }

        let start = offset as usize;
        if contents.len() < start + count {
            contents.resize(start + count, 0);
        }
        contents[start..start + count].copy_from_slice(&buf[..count]);
        Ok(count)
    }

    fn stat(&self) -> KernelResult<Stat> {
        if self.stat_fails.load(Ordering::SeqCst) {
            return Err(Errno::Io);
        }
        Ok(Stat {
            size: self.contents.lock().len() as u64,
            kind: self.kind,
        })
    }

    fn is_seekable(&self) -> bool {
        self.kind != FileKind::CharDevice
    }
}

/// One reference to a `RamFile`, as returned by `RamFs::open`.
struct RamHandle {
    file: Arc<RamFile>,
}

impl RamHandle {
    fn new(file: Arc<RamFile>) -> Self {
        file.handles.fetch_add(1, Ordering::SeqCst);
        Self { file }
    }
}

impl Drop for RamHandle {
    fn drop(&mut self) {
        self.file.handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Vnode for RamHandle {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> KernelResult<usize> {
        self.file.read_at(offset, buf)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> KernelResult<usize> {
        self.file.write_at(offset, buf)
    }

    fn stat(&self) -> KernelResult<Stat> {
        self.file.stat()
    }

    fn is_seekable(&self) -> bool {
        self.file.is_seekable()
    }
}

/// Flat name -> file map with a console at `con:`.
pub struct RamFs {
    files: Mutex<HashMap<String, Arc<RamFile>>>,
    opens: AtomicUsize,
}

impl RamFs {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(String::from(CONSOLE_PATH), RamFile::console());
        Self {
            files: Mutex::new(files),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn add_file(&self, name: &str, contents: &[u8]) -> Arc<RamFile> {
        let file = RamFile::with_contents(contents);
        self.files.lock().insert(String::from(name), Arc::clone(&file));
        file
    }

    /// A registered file. Panics if there is none.
    pub fn file(&self, name: &str) -> Arc<RamFile> {
        self.files
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no file named {name}"))
    }

    pub fn console(&self) -> Arc<RamFile> {
        self.file(CONSOLE_PATH)
    }

    /// A counted reference to a registered file.
    pub fn open_vnode(&self, name: &str) -> Arc<dyn Vnode> {
        Arc::new(RamHandle::new(self.file(name)))
    }

    /// Calls to `open` so far.
    pub fn open_calls(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Vfs for RamFs {
    fn open(&self, path: &str, flags: OpenFlags) -> KernelResult<Arc<dyn Vnode>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let mut files = self.files.lock();

        let file = match files.get(path) {
            Some(_) if flags.contains(OpenFlags::CREAT | OpenFlags::EXCL) => {
                return Err(Errno::AlreadyExists)
            }
            Some(file) => Arc::clone(file),
            None if flags.contains(OpenFlags::CREAT) => {
                let file = RamFile::with_contents(b"");
                files.insert(String::from(path), Arc::clone(&file));
                file
            }
            None => return Err(Errno::NotFound),
        };

        if flags.contains(OpenFlags::TRUNC) {
            file.truncate();
        }
        Ok(Arc::new(RamHandle::new(file)))
    }
}

// ── Address spaces ──────────────────────────────────────────

/// Counters shared by a factory and every space it made.
#[derive(Default)]
pub struct SpaceStats {
    live: AtomicUsize,
    created: AtomicUsize,
    activations: AtomicUsize,
    fail_duplicate: AtomicBool,
}

/// One contiguous mapping of `USER_SIZE` bytes at `USER_BASE`.
pub struct MockAddressSpace {
    memory: Vec<u8>,
    stats: Arc<SpaceStats>,
}

impl MockAddressSpace {
    pub fn new() -> Self {
        Self::with_stats(Arc::new(SpaceStats::default()))
    }

    fn with_stats(stats: Arc<SpaceStats>) -> Self {
        stats.live.fetch_add(1, Ordering::SeqCst);
        Self {
            memory: vec![0; USER_SIZE],
            stats,
        }
    }

    fn range(&self, addr: UserAddr, len: usize) -> KernelResult<core::ops::Range<usize>> {
        let start = addr
            .as_usize()
            .checked_sub(USER_BASE)
            .ok_or(Errno::BadAddress)?;
        let end = start.checked_add(len).ok_or(Errno::BadAddress)?;
        if end > self.memory.len() {
            return Err(Errno::BadAddress);
        }
        Ok(start..end)
    }
}

impl Drop for MockAddressSpace {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl UserMemory for MockAddressSpace {
    fn copy_in(&self, src: UserAddr, dst: &mut [u8]) -> KernelResult<()> {
        let range = self.range(src, dst.len())?;
        dst.copy_from_slice(&self.memory[range]);
        Ok(())
    }

    fn copy_out(&mut self, src: &[u8], dst: UserAddr) -> KernelResult<()> {
        let range = self.range(dst, src.len())?;
        self.memory[range].copy_from_slice(src);
        Ok(())
    }
}

impl AddressSpace for MockAddressSpace {
    fn duplicate(&self) -> KernelResult<Box<dyn AddressSpace>> {
        if self.stats.fail_duplicate.load(Ordering::SeqCst) {
            return Err(Errno::OutOfMemory);
        }
        let mut copy = MockAddressSpace::with_stats(Arc::clone(&self.stats));
        copy.memory.copy_from_slice(&self.memory);
        Ok(Box::new(copy))
    }

    fn activate(&self) {
        self.stats.activations.fetch_add(1, Ordering::SeqCst);
    }

    fn define_stack(&mut self) -> KernelResult<UserAddr> {
        Ok(UserAddr::new(USER_BASE + USER_SIZE))
    }
}

/// Factory for `MockAddressSpace`.
#[derive(Default)]
pub struct MockSpaces {
    stats: Arc<SpaceStats>,
}

impl MockSpaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spaces currently alive.
    pub fn live(&self) -> usize {
        self.stats.live.load(Ordering::SeqCst)
    }

    /// Spaces built by `create`.
    pub fn created(&self) -> usize {
        self.stats.created.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> usize {
        self.stats.activations.load(Ordering::SeqCst)
    }

    pub fn fail_duplicate(&self, fail: bool) {
        self.stats.fail_duplicate.store(fail, Ordering::SeqCst);
    }
}

impl AddressSpaceFactory for MockSpaces {
    fn create(&self) -> KernelResult<Box<dyn AddressSpace>> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAddressSpace::with_stats(Arc::clone(&self.stats))))
    }
}

// ── Loader and threads ──────────────────────────────────────

/// Accepts any image starting with `IMAGE_MAGIC`.
pub struct MockLoader;

impl Loader for MockLoader {
    fn load(&self, image: &dyn Vnode, _space: &mut dyn AddressSpace) -> KernelResult<UserAddr> {
        let mut magic = [0u8; 4];
        let read = image.read_at(0, &mut magic)?;
        if read == magic.len() && &magic == IMAGE_MAGIC {
            Ok(ENTRY_POINT)
        } else {
            Err(Errno::ExecFormat)
        }
    }
}

/// Records forked threads; diverging calls panic.
#[derive(Default)]
pub struct MockThreads {
    forked: Mutex<Vec<(Pid, TrapFrame)>>,
    fail_fork: AtomicBool,
    /// Processes handed to a failing `fork_thread`.
    rejected: Mutex<Vec<Arc<Process>>>,
    /// Exit code a forked child exits with before `fork_thread` returns.
    exit_on_start: Mutex<Option<i32>>,
}

impl MockThreads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forked(&self) -> Vec<(Pid, TrapFrame)> {
        self.forked.lock().clone()
    }

    pub fn fail_fork(&self, fail: bool) {
        self.fail_fork.store(fail, Ordering::SeqCst);
    }

    pub fn rejected(&self) -> Vec<Arc<Process>> {
        self.rejected.lock().clone()
    }

    pub fn exit_on_start(&self, code: Option<i32>) {
        *self.exit_on_start.lock() = code;
    }
}

impl ThreadService for MockThreads {
    fn fork_thread(&self, _name: &str, process: Arc<Process>, frame: TrapFrame) -> KernelResult<()> {
        if self.fail_fork.load(Ordering::SeqCst) {
            self.rejected.lock().push(process);
            return Err(Errno::OutOfMemory);
        }
        self.forked.lock().push((process.pid(), frame));
        if let Some(code) = *self.exit_on_start.lock() {
            if process.mark_exited(code) {
                process.exit_signal().up();
            }
        }
        Ok(())
    }

    fn enter_new_process(&self, entry: UserEntry) -> ! {
        panic!("enter user mode at {:?}", entry.entry)
    }

    fn exit_current(&self) -> ! {
        panic!("thread exited")
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}

// ── Harness ─────────────────────────────────────────────────

/// A process manager wired to in-memory collaborators, with `bin/init`
/// and `bin/prog` installed.
pub struct Harness {
    pub fs: Arc<RamFs>,
    pub spaces: Arc<MockSpaces>,
    pub threads: Arc<MockThreads>,
    pub table: Arc<ProcessTable>,
    pub services: Services,
    pub manager: Arc<ProcessManager>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(KernelConfig::new())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        let fs = Arc::new(RamFs::new());
        let mut image = IMAGE_MAGIC.to_vec();
        image.extend_from_slice(b"text");
        fs.add_file("bin/init", &image);
        fs.add_file("bin/prog", &image);

        let spaces = Arc::new(MockSpaces::new());
        let threads = Arc::new(MockThreads::new());
        let table = Arc::new(ProcessTable::new(config.max_processes));
        let services = Services {
            vfs: fs.clone(),
            spaces: spaces.clone(),
            loader: Arc::new(MockLoader),
            threads: threads.clone(),
        };
        let manager = ProcessManager::new(config, Arc::clone(&table), services.clone())
            .expect("valid test config");

        Self {
            fs,
            spaces,
            threads,
            table,
            services,
            manager: Arc::new(manager),
        }
    }

    /// Start `bin/init` and return its process.
    pub fn spawn_init(&self) -> Arc<Process> {
        let (process, _) = self
            .manager
            .spawn_initial("bin/init", &["init"])
            .expect("init starts");
        process
    }
}
