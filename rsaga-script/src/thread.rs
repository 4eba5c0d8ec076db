use std::fmt;

use crate::error::StackFault;
use crate::semaphore::Semaphore;
use crate::stack::{Growth, Stack};
use crate::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One independently scheduled script instruction stream.
///
/// The bytecode it runs belongs to the loaded script, not to the thread.
#[derive(Debug, Clone)]
pub struct ScriptThread {
    id: ThreadId,
    ep_num: usize,
    ep_offset: u16,
    i_offset: usize,
    executing: bool,
    sleep_ms: u32,
    stack: Stack,
    sem: Semaphore,
}

impl ScriptThread {
    pub(crate) fn new(id: ThreadId, stack_capacity: usize, growth: Growth) -> Self {
        Self {
            id,
            ep_num: 0,
            ep_offset: 0,
            i_offset: 0,
            executing: false,
            sleep_ms: 0,
            stack: Stack::new(stack_capacity, growth),
            sem: Semaphore::new(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn entry_point_index(&self) -> usize {
        self.ep_num
    }

    pub fn entry_offset(&self) -> u16 {
        self.ep_offset
    }

    pub(crate) fn bind_entry_point(&mut self, index: usize, offset: u16) {
        self.ep_num = index;
        self.ep_offset = offset;
    }

    /// Offset of the next instruction to execute.
    pub fn offset(&self) -> usize {
        self.i_offset
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.i_offset = offset;
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub(crate) fn start(&mut self) {
        self.i_offset = self.ep_offset as usize;
        self.sleep_ms = 0;
        self.stack.clear();
        self.executing = true;
    }

    pub(crate) fn halt(&mut self) {
        self.executing = false;
    }

    pub fn sleep_time(&self) -> u32 {
        self.sleep_ms
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep_ms > 0
    }

    /// Put the thread to sleep for `ms` milliseconds of scheduler time.
    pub fn sleep(&mut self, ms: u32) {
        self.sleep_ms = ms;
    }

    pub(crate) fn elapse(&mut self, ms: u32) {
        self.sleep_ms = self.sleep_ms.saturating_sub(ms);
    }

    pub fn semaphore(&self) -> &Semaphore {
        &self.sem
    }

    pub fn semaphore_mut(&mut self) -> &mut Semaphore {
        &mut self.sem
    }

    pub fn is_held(&self) -> bool {
        self.sem.is_held()
    }

    /// Whether a scheduling pass would run this thread right now.
    pub fn is_runnable(&self) -> bool {
        self.executing && !self.sem.is_held() && self.sleep_ms == 0
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn push(&mut self, value: Word) -> Result<(), StackFault> {
        self.stack.push(value)
    }

    pub fn pop(&mut self) -> Result<Word, StackFault> {
        self.stack.pop()
    }
}
