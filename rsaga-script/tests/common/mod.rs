#![allow(dead_code)]

use std::collections::HashMap;

use rsaga_script::{
    Bytecode, DataBuffers, EntryPoint, HostFunctionTable, Instruction, ScriptData, ScriptSlot,
    ScriptThread, Scheduler, ThreadId, VmConfig, VmContext, Word,
};

pub const MARK: u16 = 0;
pub const ECHO: u16 = 1;
pub const DEPTH: u16 = 2;
pub const WAIT: u16 = 3;
pub const FAIL: u16 = 4;
pub const COUNT: u16 = 5;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Host state the test natives write to.
#[derive(Debug, Default)]
pub struct Recorder {
    /// Offsets of the `CALL MARK` instructions executed, in order.
    pub marks: Vec<usize>,
    /// Arguments popped by `CALL ECHO`, in push order.
    pub values: Vec<Word>,
    pub depths: Vec<usize>,
    pub counts: HashMap<ThreadId, u32>,
    pub dialogue: Vec<(&'static str, Vec<Word>, Vec<Word>)>,
}

pub fn recorder_functions() -> HostFunctionTable<Recorder> {
    let mut table = HostFunctionTable::from_config(&VmConfig::default());
    table.bind(MARK, "mark", |host: &mut Recorder, call| {
        host.marks.push(call.thread.offset());
        Ok(())
    });
    table.bind(ECHO, "echo", |host: &mut Recorder, call| {
        let args = call.pop_args()?;
        host.values.extend(args);
        Ok(())
    });
    table.bind(DEPTH, "depth", |host: &mut Recorder, call| {
        host.depths.push(call.thread.stack().depth());
        Ok(())
    });
    table.bind(WAIT, "wait", |_: &mut Recorder, call| {
        call.sleep(100);
        Ok(())
    });
    table.bind(FAIL, "fail", |_: &mut Recorder, _| {
        Err(anyhow::anyhow!("native failed on purpose"))
    });
    table.bind(COUNT, "count", |host: &mut Recorder, call| {
        *host.counts.entry(call.thread_id()).or_default() += 1;
        Ok(())
    });
    table
}

pub fn call(func: u16, argc: u8) -> Instruction {
    Instruction::Call {
        opcode: rsaga_script::Opcode::Call,
        argc,
        func,
    }
}

/// Minimal assembler over [`Instruction::encode`].
#[derive(Debug, Default)]
pub struct Asm {
    code: Vec<u8>,
}

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pos(&self) -> u16 {
        self.code.len() as u16
    }

    /// Append an instruction, returning its offset.
    pub fn emit(&mut self, inst: Instruction) -> u16 {
        let at = self.pos();
        inst.encode(&mut self.code);
        at
    }

    pub fn emit_all(&mut self, program: impl IntoIterator<Item = Instruction>) -> u16 {
        let at = self.pos();
        for inst in program {
            self.emit(inst);
        }
        at
    }

    /// Overwrite the instruction at `at` with one of the same length.
    pub fn patch(&mut self, at: u16, inst: Instruction) {
        let mut bytes = Vec::new();
        inst.encode(&mut bytes);
        let at = at as usize;
        self.code[at..at + bytes.len()].copy_from_slice(&bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.code
    }
}

/// A loaded script plus everything a scheduling pass needs.
pub struct Harness {
    pub module: ScriptSlot,
    pub data: DataBuffers,
    pub functions: HostFunctionTable<Recorder>,
    pub host: Recorder,
    pub sched: Scheduler,
}

impl Harness {
    pub fn new(code: Vec<u8>, entries: &[u16]) -> Self {
        Self::with_config(code, entries, VmConfig::default())
    }

    pub fn with_config(code: Vec<u8>, entries: &[u16], config: VmConfig) -> Self {
        init_logger();
        let entry_points = entries
            .iter()
            .enumerate()
            .map(|(i, &offset)| EntryPoint {
                name: format!("entry{i}"),
                offset,
            })
            .collect();
        Self {
            module: ScriptSlot::with_script(ScriptData::new(Bytecode::new(code, entry_points))),
            data: DataBuffers::new(2, 8),
            functions: recorder_functions(),
            host: Recorder::default(),
            sched: Scheduler::new(config),
        }
    }

    /// Create a thread and start it at entry point `entry`.
    pub fn spawn(&mut self, entry: usize) -> ThreadId {
        let id = self.sched.create_thread(&self.module).unwrap();
        self.sched.execute(id, &self.module, entry).unwrap();
        id
    }

    pub fn tick(&mut self, delta_ms: u32) {
        let mut ctx = VmContext::new(&self.module, &mut self.data, &self.functions, &mut self.host);
        self.sched.run_all_threads(&mut ctx, delta_ms).unwrap();
    }

    pub fn thread(&self, id: ThreadId) -> &ScriptThread {
        self.sched.thread(id).unwrap()
    }
}
