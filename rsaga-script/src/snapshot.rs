use serde::Serialize;

use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreadEntry {
    pub id: u32,
    pub offset: usize,
    pub executing: bool,
    pub sleep_ms: u32,
    pub hold_count: u32,
    pub stack_depth: usize,
}

/// Point-in-time view of every thread, for debuggers and trace output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VmSnapshot {
    pub tick_seq: u64,
    pub entries: Vec<ThreadEntry>,
}

impl VmSnapshot {
    /// `(running, sleeping, held, finished)`
    pub fn summarize_counts(&self) -> (usize, usize, usize, usize) {
        let mut run = 0usize;
        let mut sleep = 0usize;
        let mut held = 0usize;
        let mut done = 0usize;
        for e in &self.entries {
            if !e.executing {
                done += 1;
            } else if e.hold_count > 0 {
                held += 1;
            } else if e.sleep_ms > 0 {
                sleep += 1;
            } else {
                run += 1;
            }
        }
        (run, sleep, held, done)
    }

    pub fn update_from_scheduler(&mut self, scheduler: &Scheduler) {
        self.entries.clear();
        self.entries.reserve(scheduler.threads().len());

        for thread in scheduler.threads() {
            self.entries.push(ThreadEntry {
                id: thread.id().0,
                offset: thread.offset(),
                executing: thread.is_executing(),
                sleep_ms: thread.sleep_time(),
                hold_count: thread.semaphore().hold_count(),
                stack_depth: thread.stack().depth(),
            });
        }

        self.tick_seq = self.tick_seq.wrapping_add(1);
    }
}
