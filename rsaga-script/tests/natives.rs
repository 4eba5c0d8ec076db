mod common;

use common::{call, Asm, Harness, Recorder, DEPTH, ECHO, FAIL, MARK};
use pretty_assertions::assert_eq;
use rsaga_script::{
    Bytecode, DataStore, EntryPoint, Instruction, Intrinsic, NativeCall, ScriptData,
};

#[test]
fn unbound_function_discards_its_arguments() {
    let mut asm = Asm::new();
    asm.emit_all([
        Instruction::Push(1),
        Instruction::Push(2),
        Instruction::Push(3),
        call(40, 2),
        call(DEPTH, 0),
        call(ECHO, 1),
        Instruction::Exit,
    ]);
    let mut h = Harness::new(asm.finish(), &[0]);
    let id = h.spawn(0);
    h.tick(0);

    assert_eq!(h.host.depths, vec![1]);
    assert_eq!(h.host.values, vec![1]);
    assert!(!h.thread(id).is_executing());
}

#[test]
fn function_number_past_the_table_halts() {
    let mut asm = Asm::new();
    let bad = asm.emit(call(200, 0));
    asm.emit_all([call(MARK, 0), Instruction::Exit]);
    let mut h = Harness::new(asm.finish(), &[0]);
    let id = h.spawn(0);
    h.tick(0);

    assert!(h.host.marks.is_empty());
    assert!(!h.thread(id).is_executing());
    assert_eq!(h.thread(id).offset(), bad as usize);
}

#[test]
fn failing_native_does_not_stop_the_thread() {
    let mut asm = Asm::new();
    asm.emit(call(FAIL, 0));
    let mark = asm.emit_all([call(MARK, 0), Instruction::Exit]);
    let mut h = Harness::new(asm.finish(), &[0]);
    let id = h.spawn(0);
    h.tick(0);

    assert_eq!(h.host.marks, vec![mark as usize]);
    assert!(!h.thread(id).is_executing());
}

#[test]
fn native_hold_suspends_until_released() {
    let mut asm = Asm::new();
    asm.emit(call(10, 0));
    let mark = asm.emit_all([call(MARK, 0), Instruction::Exit]);
    let mut h = Harness::new(asm.finish(), &[0]);
    h.functions.bind(10, "speak", |_: &mut Recorder, call: &mut NativeCall<'_>| {
        call.hold();
        Ok(())
    });
    let id = h.spawn(0);

    h.tick(0);
    h.tick(0);
    assert!(h.thread(id).is_held());
    assert!(h.host.marks.is_empty());

    h.sched.release(id).unwrap();
    h.tick(0);
    assert_eq!(h.host.marks, vec![mark as usize]);
}

fn record(kind: &'static str) -> impl Fn(&mut Recorder, &mut NativeCall<'_>) -> anyhow::Result<()> {
    move |host: &mut Recorder, call: &mut NativeCall<'_>| {
        host.dialogue.push((kind, call.operands.to_vec(), call.args.to_vec()));
        Ok(())
    }
}

fn dialogue_program() -> Vec<u8> {
    let mut asm = Asm::new();
    asm.emit_all([
        Instruction::PushDialogue(11),
        Instruction::PushDialogue(12),
        Instruction::DialoguePlay {
            voices: 2,
            actor: 7,
            pad: (0, 0),
        },
        Instruction::DialogueStart,
        Instruction::DialogueOption { a: 1, b: 0, c: None },
        Instruction::DialogueOption {
            a: 1,
            b: 2,
            c: Some(300),
        },
        Instruction::DialogueRun,
        call(DEPTH, 0),
        Instruction::Exit,
    ]);
    asm.finish()
}

#[test]
fn dialogue_opcodes_reach_their_intrinsics() {
    let mut h = Harness::new(dialogue_program(), &[0]);
    h.functions.bind_intrinsic(Intrinsic::DialoguePlay, "play", record("play"));
    h.functions.bind_intrinsic(Intrinsic::DialogueStart, "start", record("start"));
    h.functions.bind_intrinsic(Intrinsic::DialogueOption, "option", record("option"));
    h.functions.bind_intrinsic(Intrinsic::DialogueRun, "run", record("run"));
    let id = h.spawn(0);

    h.tick(0);
    h.tick(0);

    assert_eq!(
        h.host.dialogue,
        vec![
            ("play", vec![7], vec![11, 12]),
            ("start", vec![], vec![]),
            ("option", vec![1, 0], vec![]),
            ("option", vec![1, 2, 300], vec![]),
            ("run", vec![], vec![]),
        ]
    );
    assert_eq!(h.host.depths, vec![0]);
    assert!(!h.thread(id).is_executing());
}

#[test]
fn dialogue_play_pops_voices_for_the_handler() {
    let mut asm = Asm::new();
    asm.emit_all([
        Instruction::PushDialogue(11),
        Instruction::PushDialogue(12),
        Instruction::DialoguePlay {
            voices: 2,
            actor: 7,
            pad: (0, 0),
        },
        call(DEPTH, 0),
    ]);
    let exit = asm.emit(Instruction::Exit);
    let mut h = Harness::new(asm.finish(), &[0]);
    h.functions.bind_intrinsic(
        Intrinsic::DialoguePlay,
        "play",
        |host: &mut Recorder, call: &mut NativeCall<'_>| {
            // leaves the stack alone
            call.hold();
            call.release();
            host.values.extend_from_slice(call.args);
            Ok(())
        },
    );
    let id = h.spawn(0);
    h.tick(0);

    assert_eq!(h.host.values, vec![11, 12]);
    assert_eq!(h.host.depths, vec![0]);
    let thread = h.thread(id);
    assert!(!thread.is_executing());
    assert_eq!(thread.offset(), exit as usize);
}

#[test]
fn unbound_dialogue_play_drops_its_voices() {
    let mut h = Harness::new(dialogue_program(), &[0]);
    let id = h.spawn(0);

    h.tick(0);
    h.tick(0);

    assert!(h.host.dialogue.is_empty());
    assert_eq!(h.host.depths, vec![0]);
    assert!(!h.thread(id).is_executing());
}

#[test]
fn data_store_words() {
    let mut asm = Asm::new();
    asm.emit_all([
        Instruction::Push(42),
        Instruction::PutWord { buf: 1, offset: 3 },
        Instruction::Push(-5),
        Instruction::PutWordPop { buf: 1, offset: 4 },
        Instruction::GetWord { buf: 1, offset: 3 },
        call(ECHO, 2),
        Instruction::Exit,
    ]);
    let mut h = Harness::new(asm.finish(), &[0]);
    h.spawn(0);
    h.tick(0);

    assert_eq!(h.host.values, vec![42, 42]);
    assert_eq!(h.data.get_word(1, 3), 42);
    assert_eq!(h.data.get_word(1, 4), -5);
}

#[test]
fn data_store_flags() {
    let mut asm = Asm::new();
    asm.emit_all([
        Instruction::TestFlag { buf: 1, offset: 5 },
        Instruction::TestFlag { buf: 1, offset: 6 },
        call(ECHO, 2),
        // bit 9 takes the truth of primary word 2
        Instruction::Push(9),
        Instruction::ModifyFlag { buf: 1, offset: 2 },
        Instruction::PopNull,
        // bit 3 takes the truth of primary word 3
        Instruction::Push(3),
        Instruction::ModifyFlagPop { buf: 1, offset: 2 },
        Instruction::Exit,
    ]);
    let mut h = Harness::new(asm.finish(), &[0]);
    h.data.set_bit(1, 5, true);
    h.data.set_bit(1, 3, true);
    h.data.put_word(0, 2, 1);
    let id = h.spawn(0);

    h.tick(0);
    h.tick(0);

    assert_eq!(h.host.values, vec![1, 0]);
    assert!(h.data.get_bit(1, 9));
    assert!(!h.data.get_bit(1, 3));
    assert!(!h.thread(id).is_executing());
    assert!(h.thread(id).stack().is_empty());
}

#[test]
fn natives_see_the_script_data() {
    let mut asm = Asm::new();
    asm.emit_all([Instruction::PushDialogue(1), call(10, 1), Instruction::Exit]);
    let code = asm.finish();
    let mut h = Harness::new(code.clone(), &[0]);
    let entry = EntryPoint {
        name: "main".into(),
        offset: 0,
    };
    h.module.load(
        ScriptData::new(Bytecode::new(code, vec![entry]))
            .with_strings(vec!["Hello".into(), "Goodbye".into()])
            .with_voices(vec![100, 101]),
    );
    h.functions.bind(10, "say", |host: &mut Recorder, call: &mut NativeCall<'_>| {
        let index = call.pop_arg()? as usize;
        let text = call.script.string(index).unwrap_or_default();
        host.values.push(text.len() as i16);
        host.values.push(call.script.voice(index) as i16);
        host.values.push(call.script.voice(index + 5) as i16);
        Ok(())
    });
    h.spawn(0);
    h.tick(0);

    assert_eq!(h.host.values, vec![7, 101, -1]);
}
