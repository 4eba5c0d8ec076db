//! Instruction dispatch.
//!
//! [`step`] decodes exactly one instruction at a thread's offset and applies
//! it. The offset then moves past the instruction unless the instruction
//! produced a [`Flow::Jump`].

mod arith;

use crate::data::DataStore;
use crate::error::{StackFault, VmError};
use crate::host::{HostFunction, HostFunctionTable, Intrinsic, NativeCall};
use crate::instruction::Instruction;
use crate::policy::BranchSelector;
use crate::script::{ScriptData, ScriptModule};
use crate::thread::ScriptThread;
use crate::Word;

/// The collaborators a scheduling pass runs against.
pub struct VmContext<'a, H> {
    pub script: &'a dyn ScriptModule,
    pub data: &'a mut dyn DataStore,
    pub functions: &'a HostFunctionTable<H>,
    pub host: &'a mut H,
}

impl<'a, H> VmContext<'a, H> {
    pub fn new(
        script: &'a dyn ScriptModule,
        data: &'a mut dyn DataStore,
        functions: &'a HostFunctionTable<H>,
        host: &'a mut H,
    ) -> Self {
        Self {
            script,
            data,
            functions,
            host,
        }
    }
}

/// Where execution continues after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the next instruction.
    Next,
    Jump(usize),
    /// The thread is done.
    Halt,
}

/// Execute one instruction of `thread`.
///
/// Returns the decoded instruction and the offset it was fetched from. Any
/// error is fatal to the thread; the caller is expected to deactivate it.
pub(crate) fn step<H>(
    thread: &mut ScriptThread,
    script: &ScriptData,
    ctx: &mut VmContext<'_, H>,
    selector: &mut dyn BranchSelector,
) -> Result<(Instruction, usize), VmError> {
    let start = thread.offset();
    let code = script.bytecode.code();
    let (inst, next) = Instruction::decode(code, start)?;
    log::trace!("thread {} executing offset 0x{:04X}: {}", thread.id(), start, inst);

    match execute(thread, &inst, start, next, script, ctx, selector)? {
        Flow::Next => thread.set_offset(next),
        Flow::Jump(target) => thread.set_offset(target),
        Flow::Halt => thread.halt(),
    }
    Ok((inst, start))
}

fn execute<H>(
    thread: &mut ScriptThread,
    inst: &Instruction,
    start: usize,
    next: usize,
    script: &ScriptData,
    ctx: &mut VmContext<'_, H>,
    selector: &mut dyn BranchSelector,
) -> Result<Flow, VmError> {
    let sf = move |fault: StackFault| VmError::Stack {
        fault,
        offset: start,
    };

    let flow = match inst {
        Instruction::Align | Instruction::Enter(_) => Flow::Next,

        Instruction::PushNull => {
            thread.stack_mut().push_null().map_err(sf)?;
            Flow::Next
        }
        Instruction::PopNull => {
            thread.pop().map_err(sf)?;
            Flow::Next
        }
        Instruction::PushFalse => {
            thread.push(0).map_err(sf)?;
            Flow::Next
        }
        Instruction::PushTrue => {
            thread.push(1).map_err(sf)?;
            Flow::Next
        }
        Instruction::Push(v) | Instruction::PushDialogue(v) => {
            thread.push(*v).map_err(sf)?;
            Flow::Next
        }

        Instruction::TestFlag { buf, offset } => {
            let bit = ctx.data.get_bit(*buf, *offset);
            thread.push(bit as Word).map_err(sf)?;
            Flow::Next
        }
        Instruction::GetWord { buf, offset } => {
            let word = ctx.data.get_word(*buf, *offset);
            thread.push(word).map_err(sf)?;
            Flow::Next
        }
        Instruction::ModifyFlag { buf, offset } => {
            let bit = thread.stack().top().map_err(sf)? as u16;
            let on = ctx.data.read_word_unsigned(*offset) != 0;
            ctx.data.set_bit(*buf, bit, on);
            Flow::Next
        }
        Instruction::PutWord { buf, offset } => {
            let value = thread.stack().top().map_err(sf)?;
            ctx.data.put_word(*buf, *offset, value);
            Flow::Next
        }
        Instruction::ModifyFlagPop { buf, .. } => {
            // the inline offset is superseded by the popped one
            let bit = thread.pop().map_err(sf)? as u16;
            let on = ctx.data.read_word_unsigned(bit) != 0;
            ctx.data.set_bit(*buf, bit, on);
            Flow::Next
        }
        Instruction::PutWordPop { buf, offset } => {
            let value = thread.pop().map_err(sf)?;
            ctx.data.put_word(*buf, *offset, value);
            Flow::Next
        }

        Instruction::Gosub { target, .. } => {
            let ret = u16::try_from(next).map_err(|_| VmError::ReturnOutOfRange { offset: start })?;
            thread.stack_mut().push_return(ret).map_err(sf)?;
            Flow::Jump(*target as usize)
        }
        Instruction::Call { argc, func, .. } => {
            let functions = ctx.functions;
            match functions.get(*func) {
                None => {
                    return Err(VmError::InvalidFunction {
                        func: *func,
                        offset: start,
                    })
                }
                Some(None) => {
                    log::warn!(
                        "{:X}: undefined script function number: (0x{:X}), removing {} operand(s) from stack",
                        start,
                        func,
                        argc
                    );
                    thread.stack_mut().discard(*argc as usize).map_err(sf)?;
                }
                Some(Some(f)) => call_native(f, thread, script, ctx, *argc, &[], &[], start),
            }
            Flow::Next
        }
        Instruction::Exit => match thread.stack_mut().pop_return() {
            Ok(offset) => Flow::Jump(offset as usize),
            Err(_) => {
                log::info!("thread {}: script execution complete", thread.id());
                Flow::Halt
            }
        },
        Instruction::Unhandled { opcode, .. } => {
            return Err(VmError::UnhandledOpcode {
                opcode: *opcode as u8,
                offset: start,
            })
        }

        Instruction::Jump(target) => Flow::Jump(*target as usize),
        Instruction::JumpNonZeroPop(target) => {
            let v = thread.pop().map_err(sf)?;
            branch_if(v != 0, *target)
        }
        Instruction::JumpZeroPop(target) => {
            let v = thread.pop().map_err(sf)?;
            branch_if(v == 0, *target)
        }
        Instruction::JumpNonZero(target) => {
            let v = thread.stack().top().map_err(sf)?;
            branch_if(v != 0, *target)
        }
        Instruction::JumpZero(target) => {
            let v = thread.stack().top().map_err(sf)?;
            branch_if(v == 0, *target)
        }
        Instruction::JumpRelative { delta: 0, .. } => Flow::Next,
        Instruction::JumpRelative { delta, .. } => match start.checked_add_signed(*delta as isize) {
            Some(target) => Flow::Jump(target),
            None => {
                return Err(VmError::Truncated {
                    offset: start,
                    len: script.bytecode.len(),
                })
            }
        },
        Instruction::Switch { cases, default } => {
            let v = thread.pop().map_err(sf)?;
            let target = cases
                .iter()
                .find(|(value, _)| *value == v)
                .map(|(_, target)| *target)
                .unwrap_or(*default);
            Flow::Jump(target as usize)
        }
        Instruction::RandomJump { branches, .. } => {
            let weights: Vec<u16> = branches.iter().map(|(weight, _)| *weight).collect();
            let pick = selector.select(&weights);
            match branches.get(pick) {
                Some((_, target)) => Flow::Jump(*target as usize),
                None => {
                    log::error!("{:X}: random jump target out of bounds", start);
                    Flow::Next
                }
            }
        }

        Instruction::Unary(op) => {
            let v = thread.pop().map_err(sf)?;
            thread.push(arith::unary(*op, v)).map_err(sf)?;
            Flow::Next
        }
        Instruction::Binary(op) => {
            let b = thread.pop().map_err(sf)?;
            let a = thread.pop().map_err(sf)?;
            let out = arith::binary(*op, a, b).ok_or(VmError::DivideByZero { offset: start })?;
            thread.push(out).map_err(sf)?;
            Flow::Next
        }

        Instruction::DialoguePlay { voices, actor, .. } => {
            intrinsic(Intrinsic::DialoguePlay, thread, script, ctx, *voices, &[*actor], start)
                .map_err(sf)?;
            Flow::Next
        }
        Instruction::DialogueStart => {
            intrinsic(Intrinsic::DialogueStart, thread, script, ctx, 0, &[], start).map_err(sf)?;
            Flow::Next
        }
        Instruction::DialogueRun => {
            intrinsic(Intrinsic::DialogueRun, thread, script, ctx, 0, &[], start).map_err(sf)?;
            Flow::Next
        }
        Instruction::DialogueOption { a, b, c } => {
            let mut operands = vec![*a as Word, *b as Word];
            if let Some(c) = c {
                operands.push(*c as Word);
            }
            intrinsic(Intrinsic::DialogueOption, thread, script, ctx, 0, &operands, start)
                .map_err(sf)?;
            Flow::Next
        }
    };
    Ok(flow)
}

fn branch_if(cond: bool, target: u16) -> Flow {
    if cond {
        Flow::Jump(target as usize)
    } else {
        Flow::Next
    }
}

#[allow(clippy::too_many_arguments)]
fn call_native<H>(
    f: &HostFunction<H>,
    thread: &mut ScriptThread,
    script: &ScriptData,
    ctx: &mut VmContext<'_, H>,
    argc: u8,
    args: &[Word],
    operands: &[Word],
    start: usize,
) {
    let mut call = NativeCall {
        thread,
        data: &mut *ctx.data,
        script,
        argc,
        args,
        operands,
    };
    if let Err(e) = (f.func)(&mut *ctx.host, &mut call) {
        log::warn!("{:X}: script function {} failed: {:#}", start, f.name, e);
    }
}

/// Dialogue opcodes leave their stack arguments to the VM: exactly `argc`
/// words are popped whether or not the host handles the opcode.
fn intrinsic<H>(
    kind: Intrinsic,
    thread: &mut ScriptThread,
    script: &ScriptData,
    ctx: &mut VmContext<'_, H>,
    argc: u8,
    operands: &[Word],
    start: usize,
) -> Result<(), StackFault> {
    let mut args = Vec::with_capacity(argc as usize);
    for _ in 0..argc {
        args.push(thread.pop()?);
    }
    args.reverse();

    let functions = ctx.functions;
    match functions.intrinsic(kind) {
        Some(f) => call_native(f, thread, script, ctx, 0, &args, operands, start),
        None if argc > 0 => {
            log::warn!("{:X}: no host binding for {:?}, removing {} operand(s) from stack", start, kind, argc);
        }
        None => {}
    }
    Ok(())
}
