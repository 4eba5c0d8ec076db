use crate::config::VmConfig;
use crate::error::VmError;
use crate::policy::BranchSelector;
use crate::script::ScriptModule;
use crate::thread::{ScriptThread, ThreadId};
use crate::vm::{self, VmContext};

#[derive(Debug, Default)]
struct DebugState {
    thread: Option<ThreadId>,
    single_step: bool,
    step_requested: bool,
}

/// Owns every script thread and advances them cooperatively.
///
/// Threads run in creation order. Each pass gives every runnable thread at
/// most [`VmConfig::instructions_per_tick`] instructions; a thread stops
/// early when it finishes, faults, gets held or goes to sleep.
#[derive(Debug)]
pub struct Scheduler {
    threads: Vec<ScriptThread>,
    next_id: u32,
    config: VmConfig,
    selector: Box<dyn BranchSelector>,
    debug: DebugState,
}

impl Scheduler {
    pub fn new(config: VmConfig) -> Self {
        let selector = config.branch_policy.selector();
        Self {
            threads: Vec::new(),
            next_id: 0,
            config,
            selector,
            debug: DebugState::default(),
        }
    }

    /// Replace the random-branch policy chosen by the configuration.
    pub fn with_selector(mut self, selector: Box<dyn BranchSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Create an inert thread. It does nothing until [`Scheduler::execute`].
    pub fn create_thread(&mut self, script: &dyn ScriptModule) -> Result<ThreadId, VmError> {
        if !script.is_initialized() {
            return Err(VmError::NotInitialized);
        }
        let id = ThreadId(self.next_id);
        self.next_id += 1;
        self.threads.push(ScriptThread::new(
            id,
            self.config.stack_capacity,
            self.config.stack_growth,
        ));
        log::debug!("created script thread {}", id);
        Ok(id)
    }

    /// Remove a thread. Its id is never handed out again.
    pub fn destroy_thread(&mut self, id: ThreadId) -> Result<(), VmError> {
        let pos = self.position(id)?;
        self.threads.remove(pos);
        log::debug!("destroyed script thread {}", id);
        Ok(())
    }

    /// Bind entry point `index` of the loaded script to a thread.
    ///
    /// An invalid index leaves the thread untouched.
    pub fn set_entry_point(
        &mut self,
        id: ThreadId,
        script: &dyn ScriptModule,
        index: usize,
    ) -> Result<(), VmError> {
        let offset = script.loaded_script()?.bytecode.entry_point(index)?.offset;
        self.thread_mut(id)?.bind_entry_point(index, offset);
        Ok(())
    }

    /// Start (or restart) a thread at entry point `index`.
    pub fn execute(
        &mut self,
        id: ThreadId,
        script: &dyn ScriptModule,
        index: usize,
    ) -> Result<(), VmError> {
        self.set_entry_point(id, script, index)?;
        let thread = self.thread_mut(id)?;
        thread.start();
        log::debug!(
            "thread {} executing entry point {} at 0x{:04X}",
            id,
            index,
            thread.entry_offset()
        );
        Ok(())
    }

    pub fn hold(&mut self, id: ThreadId) -> Result<(), VmError> {
        self.thread_mut(id)?.semaphore_mut().hold();
        Ok(())
    }

    pub fn release(&mut self, id: ThreadId) -> Result<(), VmError> {
        self.thread_mut(id)?.semaphore_mut().release();
        Ok(())
    }

    pub fn thread(&self, id: ThreadId) -> Result<&ScriptThread, VmError> {
        self.threads
            .iter()
            .find(|t| t.id() == id)
            .ok_or(VmError::NoSuchThread(id))
    }

    pub fn thread_mut(&mut self, id: ThreadId) -> Result<&mut ScriptThread, VmError> {
        self.threads
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(VmError::NoSuchThread(id))
    }

    pub fn threads(&self) -> &[ScriptThread] {
        &self.threads
    }

    fn position(&self, id: ThreadId) -> Result<usize, VmError> {
        self.threads
            .iter()
            .position(|t| t.id() == id)
            .ok_or(VmError::NoSuchThread(id))
    }

    /// Designate the thread that single-stepping applies to.
    pub fn set_debug_thread(&mut self, id: Option<ThreadId>) {
        self.debug.thread = id;
    }

    pub fn set_single_step(&mut self, enabled: bool) {
        self.debug.single_step = enabled;
        if !enabled {
            self.debug.step_requested = false;
        }
    }

    /// Let the debug thread execute one instruction on the next pass.
    pub fn debug_step(&mut self) {
        self.debug.step_requested = true;
    }

    /// Run one scheduling pass over every thread.
    ///
    /// `delta_ms` is the time elapsed since the previous pass; it counts down
    /// the sleep timers of threads that are not held. A fault deactivates the
    /// faulting thread only.
    ///
    /// Fails without touching any thread when the script module is not
    /// initialized or has no loaded script.
    pub fn run_all_threads<H>(
        &mut self,
        ctx: &mut VmContext<'_, H>,
        delta_ms: u32,
    ) -> Result<(), VmError> {
        let module = ctx.script;
        let script = module.loaded_script()?;

        let budget = self.config.instructions_per_tick;
        for thread in self.threads.iter_mut() {
            if !thread.is_executing() || thread.is_held() {
                continue;
            }
            thread.elapse(delta_ms);

            let stepping = self.debug.single_step && self.debug.thread == Some(thread.id());
            let limit = if stepping {
                if !self.debug.step_requested {
                    continue;
                }
                self.debug.step_requested = false;
                thread.sleep(0);
                1
            } else if thread.is_sleeping() {
                continue;
            } else {
                budget
            };

            for _ in 0..limit {
                match vm::step(thread, script, ctx, self.selector.as_mut()) {
                    Ok((inst, offset)) => {
                        if stepping {
                            log::debug!("thread {} 0x{:04X}: {}", thread.id(), offset, inst);
                        }
                    }
                    Err(e) => {
                        log::error!("thread {}: {}", thread.id(), e);
                        thread.halt();
                        break;
                    }
                }
                if !thread.is_runnable() {
                    break;
                }
            }
        }
        Ok(())
    }
}
