use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::VmError;
use crate::scheduler::Scheduler;
use crate::thread::ThreadId;
use crate::vm::VmContext;

/// A [`Scheduler`] that can be reached from more than one OS thread.
///
/// A scheduling pass holds the lock for its whole duration, so a speech or
/// audio callback calling [`SharedScheduler::release`] never observes a
/// thread halfway through an instruction.
#[derive(Debug, Clone)]
pub struct SharedScheduler(Arc<Mutex<Scheduler>>);

impl SharedScheduler {
    pub fn new(scheduler: Scheduler) -> Self {
        Self(Arc::new(Mutex::new(scheduler)))
    }

    pub fn run_all_threads<H>(
        &self,
        ctx: &mut VmContext<'_, H>,
        delta_ms: u32,
    ) -> Result<(), VmError> {
        self.0.lock().run_all_threads(ctx, delta_ms)
    }

    pub fn hold(&self, id: ThreadId) -> Result<(), VmError> {
        self.0.lock().hold(id)
    }

    pub fn release(&self, id: ThreadId) -> Result<(), VmError> {
        self.0.lock().release(id)
    }

    pub fn lock(&self) -> MutexGuard<'_, Scheduler> {
        self.0.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::script::ScriptSlot;

    #[test]
    fn release_from_another_thread() {
        let module = ScriptSlot::new();
        let shared = SharedScheduler::new(Scheduler::new(VmConfig::default()));
        let id = shared.lock().create_thread(&module).unwrap();
        shared.hold(id).unwrap();
        shared.hold(id).unwrap();

        let remote = shared.clone();
        std::thread::spawn(move || {
            remote.release(id).unwrap();
            remote.release(id).unwrap();
            remote.release(id).unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(shared.lock().thread(id).unwrap().semaphore().hold_count(), 0);
    }
}
