//! Process Table
//!
//! Process control blocks and the registry that maps process ids to them.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use spin::{Mutex, MutexGuard};

use crate::config::{PID_MAX, PID_MIN};
use crate::error::{Errno, KernelResult};
use crate::memory::AddressSpace;
use crate::sync::Semaphore;
use crate::vfs::{FdTable, Vnode};

/// Process ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u32);

impl Pid {
    /// Never allocated; stands in for ids that cannot name a process.
    pub const NONE: Pid = Pid(0);

    pub const fn new(raw: u32) -> Self {
        Pid(raw)
    }

    /// Decode a pid argument from userspace.
    pub fn from_raw(raw: i64) -> Self {
        u32::try_from(raw).map(Pid).unwrap_or(Pid::NONE)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for Pid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Process is live
    Running,
    /// Process has exited but not yet been reaped
    Zombie(i32),
    /// Parent collected the exit status; resources are gone
    Reaped,
}

/// Fields guarded by the process lock.
pub(crate) struct ProcessInner {
    pub(crate) parent: Option<Pid>,
    pub(crate) addrspace: Option<Box<dyn AddressSpace>>,
    pub(crate) cwd: Option<Arc<dyn Vnode>>,
    pub(crate) threads: usize,
    pub(crate) state: ProcessState,
}

/// Process control block
pub struct Process {
    pid: Pid,
    name: String,
    inner: Mutex<ProcessInner>,
    files: Mutex<FdTable>,
    /// Posted once by exit, taken by the reaping wait.
    exited: Semaphore,
}

impl Process {
    pub(crate) fn new(pid: Pid, name: &str, open_max: usize) -> Self {
        Self {
            pid,
            name: String::from(name),
            inner: Mutex::new(ProcessInner {
                parent: None,
                addrspace: None,
                cwd: None,
                threads: 0,
                state: ProcessState::Running,
            }),
            files: Mutex::new(FdTable::new(open_max)),
            exited: Semaphore::new(0),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Pid> {
        self.inner.lock().parent
    }

    pub fn state(&self) -> ProcessState {
        self.inner.lock().state
    }

    /// Exit code, once the process is a zombie.
    pub fn exit_code(&self) -> Option<i32> {
        match self.inner.lock().state {
            ProcessState::Zombie(code) => Some(code),
            _ => None,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.inner.lock().threads
    }

    pub fn attach_thread(&self) {
        self.inner.lock().threads += 1;
    }

    pub fn detach_thread(&self) {
        let mut inner = self.inner.lock();
        inner.threads = inner.threads.saturating_sub(1);
    }

    /// The descriptor table.
    pub fn files(&self) -> &Mutex<FdTable> {
        &self.files
    }

    pub fn cwd(&self) -> Option<Arc<dyn Vnode>> {
        self.inner.lock().cwd.clone()
    }

    /// Replace the current directory, returning the previous one.
    pub fn set_cwd(&self, cwd: Option<Arc<dyn Vnode>>) -> Option<Arc<dyn Vnode>> {
        core::mem::replace(&mut self.inner.lock().cwd, cwd)
    }

    pub fn has_addrspace(&self) -> bool {
        self.inner.lock().addrspace.is_some()
    }

    /// Install `space` as the address space, returning the old one.
    pub fn swap_addrspace(
        &self,
        space: Option<Box<dyn AddressSpace>>,
    ) -> Option<Box<dyn AddressSpace>> {
        core::mem::replace(&mut self.inner.lock().addrspace, space)
    }

    /// Run `f` on the address space. Fails with `BadAddress` if the
    /// process has none.
    pub fn with_addrspace<R>(
        &self,
        f: impl FnOnce(&mut dyn AddressSpace) -> KernelResult<R>,
    ) -> KernelResult<R> {
        let mut inner = self.inner.lock();
        let space = inner.addrspace.as_deref_mut().ok_or(Errno::BadAddress)?;
        f(space)
    }

    pub(crate) fn lock_inner(&self) -> MutexGuard<'_, ProcessInner> {
        self.inner.lock()
    }

    pub(crate) fn exit_signal(&self) -> &Semaphore {
        &self.exited
    }

    /// Record the exit code. Returns false if the process already exited.
    pub(crate) fn mark_exited(&self, code: i32) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != ProcessState::Running {
            return false;
        }
        inner.state = ProcessState::Zombie(code);
        inner.threads = inner.threads.saturating_sub(1);
        true
    }

    /// Release everything the process holds.
    pub(crate) fn reap(&self) {
        let (space, cwd) = {
            let mut inner = self.inner.lock();
            inner.state = ProcessState::Reaped;
            (inner.addrspace.take(), inner.cwd.take())
        };
        self.files.lock().clear();
        drop(space);
        drop(cwd);
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct TableInner {
    processes: HashMap<Pid, Arc<Process>>,
    next_pid: u32,
}

/// Registry of live processes, zombies included.
pub struct ProcessTable {
    inner: Mutex<TableInner>,
    capacity: usize,
}

impl ProcessTable {
    /// Create an empty table holding at most `capacity` processes.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TableInner {
                processes: HashMap::new(),
                next_pid: PID_MIN,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocate a fresh process record and register it.
    ///
    /// Ids come from a counter over `PID_MIN..=PID_MAX` that wraps and
    /// skips ids still in use.
    pub fn create(&self, name: &str, open_max: usize) -> KernelResult<Arc<Process>> {
        let mut inner = self.inner.lock();
        if inner.processes.len() >= self.capacity {
            return Err(Errno::TooManyProcesses);
        }

        let span = PID_MAX - PID_MIN + 1;
        for _ in 0..span {
            let candidate = Pid(inner.next_pid);
            inner.next_pid = if inner.next_pid >= PID_MAX {
                PID_MIN
            } else {
                inner.next_pid + 1
            };

            if !inner.processes.contains_key(&candidate) {
                let process = Arc::new(Process::new(candidate, name, open_max));
                inner.processes.insert(candidate, Arc::clone(&process));
                log::debug!("[KESTREL PROC] created pid {} ({})", candidate, name);
                return Ok(process);
            }
        }

        Err(Errno::TooManyProcesses)
    }

    /// Look up a registered process.
    pub fn get(&self, pid: Pid) -> Option<Arc<Process>> {
        self.inner.lock().processes.get(&pid).cloned()
    }

    /// Unregister a process.
    pub fn remove(&self, pid: Pid) -> Option<Arc<Process>> {
        self.inner.lock().processes.remove(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.inner.lock().processes.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids in ascending order.
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.inner.lock().processes.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAddressSpace;

    #[test]
    fn test_create_assigns_increasing_pids() {
        let table = ProcessTable::new(8);
        let a = table.create("a", 16).unwrap();
        let b = table.create("b", 16).unwrap();
        assert_eq!(a.pid(), Pid::new(PID_MIN));
        assert_eq!(b.pid(), Pid::new(PID_MIN + 1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.pids(), vec![a.pid(), b.pid()]);
    }

    #[test]
    fn test_new_process_is_empty() {
        let table = ProcessTable::new(4);
        let p = table.create("init", 16).unwrap();
        assert_eq!(p.name(), "init");
        assert_eq!(p.parent(), None);
        assert_eq!(p.state(), ProcessState::Running);
        assert_eq!(p.thread_count(), 0);
        assert!(!p.has_addrspace());
        assert!(p.cwd().is_none());
        assert_eq!(p.files().lock().open_count(), 0);
        assert_eq!(p.files().lock().capacity(), 16);
    }

    #[test]
    fn test_table_full() {
        let table = ProcessTable::new(2);
        table.create("a", 8).unwrap();
        table.create("b", 8).unwrap();
        assert_eq!(table.create("c", 8).unwrap_err(), Errno::TooManyProcesses);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_pids_not_reused_immediately() {
        let table = ProcessTable::new(4);
        let a = table.create("a", 8).unwrap();
        table.remove(a.pid());
        let b = table.create("b", 8).unwrap();
        assert_ne!(a.pid(), b.pid());
        assert!(!table.contains(a.pid()));
    }

    #[test]
    fn test_pid_counter_wraps_and_skips_live_ids() {
        let table = ProcessTable::new(4);
        let first = table.create("first", 8).unwrap();
        table.inner.lock().next_pid = PID_MAX;
        let last = table.create("last", 8).unwrap();
        assert_eq!(last.pid(), Pid::new(PID_MAX));
        let wrapped = table.create("wrapped", 8).unwrap();
        assert_eq!(first.pid(), Pid::new(PID_MIN));
        assert_eq!(wrapped.pid(), Pid::new(PID_MIN + 1));
    }

    #[test]
    fn test_exit_marks_zombie_once() {
        let table = ProcessTable::new(4);
        let p = table.create("p", 8).unwrap();
        p.attach_thread();
        assert!(p.mark_exited(3));
        assert!(!p.mark_exited(4));
        assert_eq!(p.state(), ProcessState::Zombie(3));
        assert_eq!(p.exit_code(), Some(3));
        assert_eq!(p.thread_count(), 0);
    }

    #[test]
    fn test_reap_releases_resources() {
        let table = ProcessTable::new(4);
        let p = table.create("p", 8).unwrap();
        p.swap_addrspace(Some(Box::new(MockAddressSpace::new())));
        assert!(p.has_addrspace());
        p.reap();
        assert!(!p.has_addrspace());
        assert_eq!(p.state(), ProcessState::Reaped);
    }

    #[test]
    fn test_with_addrspace_requires_one() {
        let table = ProcessTable::new(4);
        let p = table.create("p", 8).unwrap();
        assert_eq!(p.with_addrspace(|_| Ok(())), Err(Errno::BadAddress));
    }

    #[test]
    fn test_pid_from_raw() {
        assert_eq!(Pid::from_raw(5), Pid::new(5));
        assert_eq!(Pid::from_raw(-1), Pid::NONE);
        assert_eq!(Pid::from_raw(1 << 40), Pid::NONE);
    }
}
