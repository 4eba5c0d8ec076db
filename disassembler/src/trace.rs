use anyhow::{Context, Result};
use rsaga_script::{
    Bytecode, DataBuffers, EntryPoint, HostFunctionTable, Intrinsic, NativeCall, Scheduler,
    ScriptData, ScriptSlot, VmConfig, VmContext, VmSnapshot,
};
use serde::Serialize;

const DATA_BUFFERS: usize = 4;
const DATA_WORDS: usize = 1024;

#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub entry: usize,
    pub ticks: u32,
    pub delta_ms: u32,
    pub single_step: bool,
    pub config: VmConfig,
}

#[derive(Debug, Default)]
struct TraceHost {
    native_calls: u64,
}

#[derive(Debug, Serialize)]
pub struct TraceReport {
    pub ticks: u32,
    pub native_calls: u64,
    pub snapshot: VmSnapshot,
}

/// Every native logs its arguments and returns nothing.
fn logging_table(config: &VmConfig) -> HostFunctionTable<TraceHost> {
    let mut table = HostFunctionTable::from_config(config);
    for index in 0..table.len() as u16 {
        table.bind(index, "trace", move |host: &mut TraceHost, call: &mut NativeCall<'_>| {
            let args = call.pop_args()?;
            host.native_calls += 1;
            log::info!("{} CALL 0x{:X} {:?}", call.thread_id(), index, args);
            Ok(())
        });
    }
    for kind in [
        Intrinsic::DialoguePlay,
        Intrinsic::DialogueStart,
        Intrinsic::DialogueRun,
        Intrinsic::DialogueOption,
    ] {
        table.bind_intrinsic(kind, "trace", move |host: &mut TraceHost, call: &mut NativeCall<'_>| {
            host.native_calls += 1;
            log::info!("{} {:?} {:?} {:?}", call.thread_id(), kind, call.operands, call.args);
            Ok(())
        });
    }
    table
}

/// Run one entry point of `code` on a fresh scheduler until it finishes or
/// `ticks` passes have elapsed.
pub fn run(code: Vec<u8>, entries: Vec<EntryPoint>, opts: &TraceOptions) -> Result<TraceReport> {
    let module = ScriptSlot::with_script(ScriptData::new(Bytecode::new(code, entries)));
    let mut data = DataBuffers::new(DATA_BUFFERS, DATA_WORDS);
    let functions = logging_table(&opts.config);
    let mut host = TraceHost::default();

    let mut sched = Scheduler::new(opts.config.clone());
    let id = sched.create_thread(&module)?;
    sched
        .execute(id, &module, opts.entry)
        .with_context(|| format!("start entry point {}", opts.entry))?;
    if opts.single_step {
        sched.set_debug_thread(Some(id));
        sched.set_single_step(true);
    }

    let mut snapshot = VmSnapshot::default();
    let mut ticks = 0;
    let mut ctx = VmContext::new(&module, &mut data, &functions, &mut host);
    while ticks < opts.ticks {
        if opts.single_step {
            sched.debug_step();
        }
        sched.run_all_threads(&mut ctx, opts.delta_ms)?;
        ticks += 1;
        snapshot.update_from_scheduler(&sched);
        let (run, sleep, held, _) = snapshot.summarize_counts();
        if run + sleep + held == 0 {
            break;
        }
    }
    drop(ctx);

    Ok(TraceReport {
        ticks,
        native_calls: host.native_calls,
        snapshot,
    })
}
