//! Native functions scripts can call.
//!
//! `CALL` addresses a fixed-size table by function number. The dialogue
//! opcodes (`DLGP`, `DLGS`, `DLGX`, `DLGO`) are routed to separately
//! registered intrinsics so the VM itself knows nothing about actors or
//! speech.

use anyhow::Result;

use crate::config::VmConfig;
use crate::data::DataStore;
use crate::script::ScriptData;
use crate::thread::{ScriptThread, ThreadId};
use crate::Word;

/// Everything a native function may touch while it runs.
pub struct NativeCall<'a> {
    pub thread: &'a mut ScriptThread,
    pub data: &'a mut dyn DataStore,
    pub script: &'a ScriptData,
    /// Arguments still on the stack for the native to pop.
    pub argc: u8,
    /// Arguments the VM already popped, in push order (intrinsics only).
    pub args: &'a [Word],
    /// Inline operands of the calling instruction (intrinsics only).
    pub operands: &'a [Word],
}

impl NativeCall<'_> {
    pub fn thread_id(&self) -> ThreadId {
        self.thread.id()
    }

    pub fn pop_arg(&mut self) -> Result<Word> {
        Ok(self.thread.pop()?)
    }

    /// Pop all `argc` arguments, returned in push order.
    pub fn pop_args(&mut self) -> Result<Vec<Word>> {
        let mut args = Vec::with_capacity(self.argc as usize);
        for _ in 0..self.argc {
            args.push(self.pop_arg()?);
        }
        args.reverse();
        Ok(args)
    }

    pub fn push_result(&mut self, value: Word) -> Result<()> {
        Ok(self.thread.push(value)?)
    }

    pub fn sleep(&mut self, ms: u32) {
        self.thread.sleep(ms);
    }

    pub fn hold(&mut self) {
        self.thread.semaphore_mut().hold();
    }

    pub fn release(&mut self) {
        self.thread.semaphore_mut().release();
    }
}

pub type HostFn<H> = Box<dyn Fn(&mut H, &mut NativeCall<'_>) -> Result<()> + Send + Sync>;

pub struct HostFunction<H> {
    pub name: &'static str,
    pub func: HostFn<H>,
}

impl<H> std::fmt::Debug for HostFunction<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunction").field("name", &self.name).finish()
    }
}

/// Dialogue opcodes that call out to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    DialoguePlay,
    DialogueStart,
    DialogueRun,
    DialogueOption,
}

impl Intrinsic {
    const COUNT: usize = 4;

    fn slot(self) -> usize {
        match self {
            Intrinsic::DialoguePlay => 0,
            Intrinsic::DialogueStart => 1,
            Intrinsic::DialogueRun => 2,
            Intrinsic::DialogueOption => 3,
        }
    }
}

/// Fixed-size table of native functions indexed by function number.
///
/// A number past the end of the table is a hard fault for the calling thread;
/// an unbound slot inside the table is skipped after discarding the call's
/// arguments.
pub struct HostFunctionTable<H> {
    slots: Vec<Option<HostFunction<H>>>,
    intrinsics: [Option<HostFunction<H>>; Intrinsic::COUNT],
}

impl<H> HostFunctionTable<H> {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
            intrinsics: [None, None, None, None],
        }
    }

    /// An empty table with `config.host_function_count` slots.
    pub fn from_config(config: &VmConfig) -> Self {
        Self::new(config.host_function_count)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bind `func` to function number `index`. Returns `false` when the index
    /// is outside the table.
    pub fn bind<F>(&mut self, index: u16, name: &'static str, func: F) -> bool
    where
        F: Fn(&mut H, &mut NativeCall<'_>) -> Result<()> + Send + Sync + 'static,
    {
        match self.slots.get_mut(index as usize) {
            Some(slot) => {
                *slot = Some(HostFunction {
                    name,
                    func: Box::new(func),
                });
                true
            }
            None => {
                log::warn!("cannot bind {} to function number {}: table has {} slots", name, index, self.slots.len());
                false
            }
        }
    }

    pub fn unbind(&mut self, index: u16) -> Option<HostFunction<H>> {
        self.slots.get_mut(index as usize)?.take()
    }

    pub fn bind_intrinsic<F>(&mut self, kind: Intrinsic, name: &'static str, func: F)
    where
        F: Fn(&mut H, &mut NativeCall<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.intrinsics[kind.slot()] = Some(HostFunction {
            name,
            func: Box::new(func),
        });
    }

    /// `None` when `index` is outside the table, `Some(None)` when unbound.
    pub fn get(&self, index: u16) -> Option<Option<&HostFunction<H>>> {
        self.slots.get(index as usize).map(Option::as_ref)
    }

    pub fn intrinsic(&self, kind: Intrinsic) -> Option<&HostFunction<H>> {
        self.intrinsics[kind.slot()].as_ref()
    }

    pub fn name(&self, index: u16) -> Option<&'static str> {
        self.get(index).flatten().map(|f| f.name)
    }
}

impl<H> std::fmt::Debug for HostFunctionTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunctionTable")
            .field("len", &self.slots.len())
            .field(
                "bound",
                &self.slots.iter().filter(|s| s.is_some()).count(),
            )
            .finish()
    }
}
