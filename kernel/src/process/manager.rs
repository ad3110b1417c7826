//! Process Manager
//!
//! Lifecycle of user processes: bootstrap of the first program, fork,
//! exec, exit and wait. The manager owns no global state; the process
//! table and every collaborator are handed to it at construction.

use alloc::sync::Arc;

use super::context::TrapFrame;
use super::table::{Pid, Process, ProcessTable};
use crate::config::KernelConfig;
use crate::error::{Errno, KernelResult};
use crate::loader::{ArgVector, Loader, UserEntry};
use crate::memory::AddressSpaceFactory;
use crate::thread::ThreadService;
use crate::vfs::{OpenFlags, Vfs};

/// Services the process layer consumes from the rest of the kernel.
#[derive(Clone)]
pub struct Services {
    pub vfs: Arc<dyn Vfs>,
    pub spaces: Arc<dyn AddressSpaceFactory>,
    pub loader: Arc<dyn Loader>,
    pub threads: Arc<dyn ThreadService>,
}

/// Process manager
pub struct ProcessManager {
    table: Arc<ProcessTable>,
    services: Services,
    config: KernelConfig,
}

impl ProcessManager {
    /// Create a manager over `table`.
    pub fn new(
        config: KernelConfig,
        table: Arc<ProcessTable>,
        services: Services,
    ) -> KernelResult<Self> {
        config.validate()?;
        Ok(Self {
            table,
            services,
            config,
        })
    }

    pub fn table(&self) -> &Arc<ProcessTable> {
        &self.table
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn vfs(&self) -> &dyn Vfs {
        &*self.services.vfs
    }

    pub fn threads(&self) -> &dyn ThreadService {
        &*self.services.threads
    }

    /// Register a new, empty process.
    pub fn create(&self, name: &str) -> KernelResult<Arc<Process>> {
        self.table.create(name, self.config.open_max)
    }

    /// Start the first user program.
    ///
    /// The process gets the console on descriptors 0, 1 and 2 and `path`
    /// loaded with `args`. On failure nothing stays registered.
    pub fn spawn_initial(
        &self,
        path: &str,
        args: &[&str],
    ) -> KernelResult<(Arc<Process>, UserEntry)> {
        if path.len() >= self.config.path_max {
            return Err(Errno::NameTooLong);
        }
        let args = ArgVector::from_strs(args, self.config.arg_max)?;

        let process = self.create(path)?;
        let attached = process.files().lock().install_stdio(self.vfs());
        let loaded = attached.and_then(|()| self.exec(&process, path, &args));

        match loaded {
            Ok(entry) => {
                process.attach_thread();
                log::debug!("[KESTREL PROC] pid {} started {}", process.pid(), path);
                Ok((process, entry))
            }
            Err(err) => {
                self.discard(&process);
                Err(err)
            }
        }
    }

    /// Run the first user program on the calling thread. Returns only on
    /// failure.
    pub fn run_program(&self, path: &str, args: &[&str]) -> Errno {
        match self.spawn_initial(path, args) {
            Ok((_, entry)) => self.threads().enter_new_process(entry),
            Err(err) => err,
        }
    }

    /// Duplicate `parent`. Returns the child's id; the child thread
    /// resumes from `frame` with a return value of 0.
    pub fn fork(&self, parent: &Arc<Process>, frame: &TrapFrame) -> KernelResult<Pid> {
        let child = self.create(parent.name())?;

        let started = self.copy_into_child(parent, &child).and_then(|()| {
            // Counted before it runs; the child may exit at once.
            child.attach_thread();
            let spawned = self.threads().fork_thread(
                child.name(),
                Arc::clone(&child),
                frame.for_forked_child(),
            );
            if spawned.is_err() {
                child.detach_thread();
            }
            spawned
        });

        match started {
            Ok(()) => {
                log::debug!("[KESTREL PROC] fork {} -> {}", parent.pid(), child.pid());
                Ok(child.pid())
            }
            Err(err) => {
                log::debug!("[KESTREL PROC] fork of {} failed: {}", parent.pid(), err);
                self.discard(&child);
                Err(err)
            }
        }
    }

    /// Copy address space, descriptors and working directory under the
    /// parent's lock.
    fn copy_into_child(&self, parent: &Process, child: &Process) -> KernelResult<()> {
        let parent_inner = parent.lock_inner();

        let space = match parent_inner.addrspace.as_ref() {
            Some(space) => Some(space.duplicate()?),
            None => None,
        };
        let files = parent.files().lock().duplicate();

        let mut child_inner = child.lock_inner();
        child_inner.addrspace = space;
        child_inner.cwd = parent_inner.cwd.clone();
        child_inner.parent = Some(parent.pid());
        *child.files().lock() = files;
        Ok(())
    }

    /// Unregister a process that never ran and release what it holds.
    fn discard(&self, process: &Process) {
        self.table.remove(process.pid());
        process.reap();
    }

    pub fn getpid(&self, caller: &Process) -> Pid {
        caller.pid()
    }

    /// Turn `caller` into a zombie holding `code` and wake its waiter.
    ///
    /// A process that is not registered (or already exited) is left
    /// alone. The calling thread is ended by the caller of this method.
    pub fn exit(&self, caller: &Process, code: i32) {
        let registered = self
            .table
            .get(caller.pid())
            .is_some_and(|found| core::ptr::eq(Arc::as_ptr(&found), caller));
        if !registered {
            log::warn!("[KESTREL PROC] exit from unregistered pid {}", caller.pid());
            return;
        }

        if caller.mark_exited(code) {
            caller.exit_signal().up();
            log::debug!("[KESTREL PROC] pid {} exited with {}", caller.pid(), code);
        }
    }

    /// Wait for child `pid` to exit, then reap it. Returns the exit code
    /// and the child's id.
    pub fn wait(&self, caller: &Process, pid: Pid, options: i32) -> KernelResult<(i32, Pid)> {
        if options != 0 {
            return Err(Errno::InvalidArgument);
        }
        let child = self.table.get(pid).ok_or(Errno::NoSuchProcess)?;
        if pid == caller.pid() || child.parent() != Some(caller.pid()) {
            return Err(Errno::NotAChild);
        }

        child.exit_signal().down(self.threads());
        let code = child.exit_code().ok_or(Errno::NoSuchProcess)?;

        self.table.remove(pid);
        child.reap();
        log::debug!(
            "[KESTREL PROC] pid {} reaped pid {} (code {})",
            caller.pid(),
            pid,
            code
        );
        Ok((code, pid))
    }

    /// Replace the image of `caller` with the program at `path`.
    ///
    /// The arguments must already be in kernel memory. Once the new
    /// address space is installed there is no way back: a later failure
    /// leaves the process with the new, partially built image.
    pub fn exec(&self, caller: &Process, path: &str, args: &ArgVector) -> KernelResult<UserEntry> {
        if path.len() >= self.config.path_max {
            return Err(Errno::NameTooLong);
        }

        let image = self.services.vfs.open(path, OpenFlags::RDONLY)?;
        let space = self.services.spaces.create()?;
        let old = caller.swap_addrspace(Some(space));
        drop(old);

        let loaded = caller.with_addrspace(|space| {
            space.activate();
            let entry = self.services.loader.load(&*image, space)?;
            let top = space.define_stack()?;
            let layout = args.marshal(space, top)?;
            Ok(UserEntry {
                entry,
                argc: layout.argc,
                argv: layout.argv,
                sp: layout.argv,
            })
        });
        drop(image);

        match loaded {
            Ok(entry) => {
                log::debug!(
                    "[KESTREL EXEC] pid {} exec {} argc={} entry={:?}",
                    caller.pid(),
                    path,
                    entry.argc,
                    entry.entry
                );
                Ok(entry)
            }
            Err(err) => {
                log::warn!(
                    "[KESTREL EXEC] pid {} exec {} failed after swap: {}",
                    caller.pid(),
                    path,
                    err
                );
                Err(err)
            }
        }
    }
}
