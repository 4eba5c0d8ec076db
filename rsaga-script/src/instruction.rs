use std::fmt;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::VmError;
use crate::opcode::Opcode;
use crate::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    TestZero,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    ShiftRight,
    ShiftLeft,
    And,
    Or,
    Xor,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
}

/// A fully decoded instruction.
///
/// Operands the interpreter ignores are still kept so that decoding always
/// consumes exactly the bytes the instruction occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Align,
    PushNull,
    PopNull,
    PushFalse,
    PushTrue,
    Push(Word),
    PushDialogue(Word),

    TestFlag { buf: u8, offset: u16 },
    GetWord { buf: u8, offset: u16 },
    ModifyFlag { buf: u8, offset: u16 },
    PutWord { buf: u8, offset: u16 },
    ModifyFlagPop { buf: u8, offset: u16 },
    PutWordPop { buf: u8, offset: u16 },

    Gosub { pad: [u8; 2], target: u16 },
    Call { opcode: Opcode, argc: u8, func: u16 },
    Enter(u16),
    Exit,
    /// Recognized but never executed; carries the operand bytes it spans.
    Unhandled { opcode: Opcode, operand: Option<(u8, u16)> },

    Jump(u16),
    JumpNonZeroPop(u16),
    JumpZeroPop(u16),
    JumpNonZero(u16),
    JumpZero(u16),
    JumpRelative { pad: [u16; 2], delta: i8 },
    Switch { cases: Vec<(Word, u16)>, default: u16 },
    RandomJump { pad: u16, branches: Vec<(u16, u16)> },

    Unary(UnaryOp),
    Binary(BinaryOp),

    DialoguePlay { voices: u8, actor: Word, pad: (u8, u16) },
    DialogueStart,
    DialogueRun,
    DialogueOption { a: u8, b: u8, c: Option<u16> },
}

impl Instruction {
    /// Decode the instruction at `offset`, returning it together with the
    /// offset just past it.
    pub fn decode(code: &[u8], offset: usize) -> Result<(Instruction, usize), VmError> {
        let truncated = VmError::Truncated {
            offset,
            len: code.len(),
        };
        let Some(&byte) = code.get(offset) else {
            return Err(truncated);
        };
        let opcode = Opcode::decode(byte).ok_or(VmError::InvalidOpcode {
            opcode: byte,
            offset,
        })?;

        let mut rd = Cursor::new(&code[offset + 1..]);
        let inst = Self::decode_operands(opcode, &mut rd).map_err(|_| truncated)?;
        let next = offset + 1 + rd.position() as usize;
        Ok((inst, next))
    }

    fn decode_operands(opcode: Opcode, rd: &mut Cursor<&[u8]>) -> std::io::Result<Instruction> {
        use Opcode::*;

        fn data(rd: &mut Cursor<&[u8]>) -> std::io::Result<(u8, u16)> {
            Ok((rd.read_u8()?, rd.read_u16::<LittleEndian>()?))
        }

        let inst = match opcode {
            Align => Instruction::Align,
            PushNull => Instruction::PushNull,
            PopNull => Instruction::PopNull,
            PushFalse => Instruction::PushFalse,
            PushTrue => Instruction::PushTrue,
            Push => Instruction::Push(rd.read_i16::<LittleEndian>()?),
            PushDialogue => Instruction::PushDialogue(rd.read_i16::<LittleEndian>()?),

            TestFlag => {
                let (buf, offset) = data(rd)?;
                Instruction::TestFlag { buf, offset }
            }
            GetWord => {
                let (buf, offset) = data(rd)?;
                Instruction::GetWord { buf, offset }
            }
            ModifyFlag => {
                let (buf, offset) = data(rd)?;
                Instruction::ModifyFlag { buf, offset }
            }
            PutWord => {
                let (buf, offset) = data(rd)?;
                Instruction::PutWord { buf, offset }
            }
            ModifyFlagPop => {
                let (buf, offset) = data(rd)?;
                Instruction::ModifyFlagPop { buf, offset }
            }
            PutWordPop => {
                let (buf, offset) = data(rd)?;
                Instruction::PutWordPop { buf, offset }
            }

            Gosub => {
                let pad = [rd.read_u8()?, rd.read_u8()?];
                let target = rd.read_u16::<LittleEndian>()?;
                Instruction::Gosub { pad, target }
            }
            Call | CallAlt => {
                let argc = rd.read_u8()?;
                let func = rd.read_u16::<LittleEndian>()?;
                Instruction::Call { opcode, argc, func }
            }
            Enter => Instruction::Enter(rd.read_u16::<LittleEndian>()?),
            Unknown1B => Instruction::Unhandled {
                opcode,
                operand: None,
            },
            Exit => Instruction::Exit,

            Jump => Instruction::Jump(rd.read_u16::<LittleEndian>()?),
            JumpNonZeroPop => Instruction::JumpNonZeroPop(rd.read_u16::<LittleEndian>()?),
            JumpZeroPop => Instruction::JumpZeroPop(rd.read_u16::<LittleEndian>()?),
            JumpNonZero => Instruction::JumpNonZero(rd.read_u16::<LittleEndian>()?),
            JumpZero => Instruction::JumpZero(rd.read_u16::<LittleEndian>()?),
            JumpRelative => {
                let pad = [
                    rd.read_u16::<LittleEndian>()?,
                    rd.read_u16::<LittleEndian>()?,
                ];
                let delta = rd.read_i8()?;
                Instruction::JumpRelative { pad, delta }
            }
            Switch => {
                let n = rd.read_u16::<LittleEndian>()?;
                let mut cases = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let value = rd.read_i16::<LittleEndian>()?;
                    let target = rd.read_u16::<LittleEndian>()?;
                    cases.push((value, target));
                }
                let default = rd.read_u16::<LittleEndian>()?;
                Instruction::Switch { cases, default }
            }
            RandomJump => {
                let pad = rd.read_u16::<LittleEndian>()?;
                let n = rd.read_u16::<LittleEndian>()?;
                let mut branches = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let weight = rd.read_u16::<LittleEndian>()?;
                    let target = rd.read_u16::<LittleEndian>()?;
                    branches.push((weight, target));
                }
                Instruction::RandomJump { pad, branches }
            }

            Negate => Instruction::Unary(UnaryOp::Negate),
            TestZero => Instruction::Unary(UnaryOp::TestZero),
            Not => Instruction::Unary(UnaryOp::Not),
            Unknown28 | Unknown29 | Unknown2A | Unknown2B => Instruction::Unhandled {
                opcode,
                operand: Some(data(rd)?),
            },

            Add => Instruction::Binary(BinaryOp::Add),
            Sub => Instruction::Binary(BinaryOp::Sub),
            Mul => Instruction::Binary(BinaryOp::Mul),
            Div => Instruction::Binary(BinaryOp::Div),
            Mod => Instruction::Binary(BinaryOp::Mod),
            Equal => Instruction::Binary(BinaryOp::Equal),
            NotEqual => Instruction::Binary(BinaryOp::NotEqual),
            Greater => Instruction::Binary(BinaryOp::Greater),
            Less => Instruction::Binary(BinaryOp::Less),
            GreaterEqual => Instruction::Binary(BinaryOp::GreaterEqual),
            LessEqual => Instruction::Binary(BinaryOp::LessEqual),
            ShiftRight => Instruction::Binary(BinaryOp::ShiftRight),
            ShiftLeft => Instruction::Binary(BinaryOp::ShiftLeft),
            And => Instruction::Binary(BinaryOp::And),
            Or => Instruction::Binary(BinaryOp::Or),
            Xor => Instruction::Binary(BinaryOp::Xor),
            LogicalAnd => Instruction::Binary(BinaryOp::LogicalAnd),
            LogicalOr => Instruction::Binary(BinaryOp::LogicalOr),
            LogicalXor => Instruction::Binary(BinaryOp::LogicalXor),

            DialoguePlay => {
                let voices = rd.read_u8()?;
                let actor = rd.read_i16::<LittleEndian>()?;
                let pad = data(rd)?;
                Instruction::DialoguePlay { voices, actor, pad }
            }
            DialogueStart => Instruction::DialogueStart,
            DialogueRun => Instruction::DialogueRun,
            DialogueOption => {
                let a = rd.read_u8()?;
                let b = rd.read_u8()?;
                let c = if b > 0 {
                    Some(rd.read_u16::<LittleEndian>()?)
                } else {
                    None
                };
                Instruction::DialogueOption { a, b, c }
            }
        };
        Ok(inst)
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Align => Opcode::Align,
            Instruction::PushNull => Opcode::PushNull,
            Instruction::PopNull => Opcode::PopNull,
            Instruction::PushFalse => Opcode::PushFalse,
            Instruction::PushTrue => Opcode::PushTrue,
            Instruction::Push(_) => Opcode::Push,
            Instruction::PushDialogue(_) => Opcode::PushDialogue,
            Instruction::TestFlag { .. } => Opcode::TestFlag,
            Instruction::GetWord { .. } => Opcode::GetWord,
            Instruction::ModifyFlag { .. } => Opcode::ModifyFlag,
            Instruction::PutWord { .. } => Opcode::PutWord,
            Instruction::ModifyFlagPop { .. } => Opcode::ModifyFlagPop,
            Instruction::PutWordPop { .. } => Opcode::PutWordPop,
            Instruction::Gosub { .. } => Opcode::Gosub,
            Instruction::Call { opcode, .. } => *opcode,
            Instruction::Enter(_) => Opcode::Enter,
            Instruction::Exit => Opcode::Exit,
            Instruction::Unhandled { opcode, .. } => *opcode,
            Instruction::Jump(_) => Opcode::Jump,
            Instruction::JumpNonZeroPop(_) => Opcode::JumpNonZeroPop,
            Instruction::JumpZeroPop(_) => Opcode::JumpZeroPop,
            Instruction::JumpNonZero(_) => Opcode::JumpNonZero,
            Instruction::JumpZero(_) => Opcode::JumpZero,
            Instruction::JumpRelative { .. } => Opcode::JumpRelative,
            Instruction::Switch { .. } => Opcode::Switch,
            Instruction::RandomJump { .. } => Opcode::RandomJump,
            Instruction::Unary(op) => match op {
                UnaryOp::Negate => Opcode::Negate,
                UnaryOp::TestZero => Opcode::TestZero,
                UnaryOp::Not => Opcode::Not,
            },
            Instruction::Binary(op) => match op {
                BinaryOp::Add => Opcode::Add,
                BinaryOp::Sub => Opcode::Sub,
                BinaryOp::Mul => Opcode::Mul,
                BinaryOp::Div => Opcode::Div,
                BinaryOp::Mod => Opcode::Mod,
                BinaryOp::Equal => Opcode::Equal,
                BinaryOp::NotEqual => Opcode::NotEqual,
                BinaryOp::Greater => Opcode::Greater,
                BinaryOp::Less => Opcode::Less,
                BinaryOp::GreaterEqual => Opcode::GreaterEqual,
                BinaryOp::LessEqual => Opcode::LessEqual,
                BinaryOp::ShiftRight => Opcode::ShiftRight,
                BinaryOp::ShiftLeft => Opcode::ShiftLeft,
                BinaryOp::And => Opcode::And,
                BinaryOp::Or => Opcode::Or,
                BinaryOp::Xor => Opcode::Xor,
                BinaryOp::LogicalAnd => Opcode::LogicalAnd,
                BinaryOp::LogicalOr => Opcode::LogicalOr,
                BinaryOp::LogicalXor => Opcode::LogicalXor,
            },
            Instruction::DialoguePlay { .. } => Opcode::DialoguePlay,
            Instruction::DialogueStart => Opcode::DialogueStart,
            Instruction::DialogueRun => Opcode::DialogueRun,
            Instruction::DialogueOption { .. } => Opcode::DialogueOption,
        }
    }

    /// Append the encoded form of this instruction to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        fn w16(out: &mut Vec<u8>, v: u16) {
            out.extend_from_slice(&v.to_le_bytes());
        }

        out.push(self.opcode() as u8);
        match self {
            Instruction::Push(v) | Instruction::PushDialogue(v) => w16(out, *v as u16),
            Instruction::TestFlag { buf, offset }
            | Instruction::GetWord { buf, offset }
            | Instruction::ModifyFlag { buf, offset }
            | Instruction::PutWord { buf, offset }
            | Instruction::ModifyFlagPop { buf, offset }
            | Instruction::PutWordPop { buf, offset } => {
                out.push(*buf);
                w16(out, *offset);
            }
            Instruction::Gosub { pad, target } => {
                out.extend_from_slice(pad);
                w16(out, *target);
            }
            Instruction::Call { argc, func, .. } => {
                out.push(*argc);
                w16(out, *func);
            }
            Instruction::Enter(v)
            | Instruction::Jump(v)
            | Instruction::JumpNonZeroPop(v)
            | Instruction::JumpZeroPop(v)
            | Instruction::JumpNonZero(v)
            | Instruction::JumpZero(v) => w16(out, *v),
            Instruction::Unhandled {
                operand: Some((b, w)),
                ..
            } => {
                out.push(*b);
                w16(out, *w);
            }
            Instruction::JumpRelative { pad, delta } => {
                w16(out, pad[0]);
                w16(out, pad[1]);
                out.push(*delta as u8);
            }
            Instruction::Switch { cases, default } => {
                w16(out, cases.len() as u16);
                for (value, target) in cases {
                    w16(out, *value as u16);
                    w16(out, *target);
                }
                w16(out, *default);
            }
            Instruction::RandomJump { pad, branches } => {
                w16(out, *pad);
                w16(out, branches.len() as u16);
                for (weight, target) in branches {
                    w16(out, *weight);
                    w16(out, *target);
                }
            }
            Instruction::DialoguePlay { voices, actor, pad } => {
                out.push(*voices);
                w16(out, *actor as u16);
                out.push(pad.0);
                w16(out, pad.1);
            }
            Instruction::DialogueOption { a, b, c } => {
                out.push(*a);
                out.push(*b);
                if let Some(c) = c {
                    w16(out, *c);
                }
            }
            _ => {}
        }
    }

    /// Operands rendered for listings.
    pub fn operands(&self) -> Vec<String> {
        match self {
            Instruction::Push(v) | Instruction::PushDialogue(v) => vec![v.to_string()],
            Instruction::TestFlag { buf, offset }
            | Instruction::GetWord { buf, offset }
            | Instruction::ModifyFlag { buf, offset }
            | Instruction::PutWord { buf, offset }
            | Instruction::ModifyFlagPop { buf, offset }
            | Instruction::PutWordPop { buf, offset } => {
                vec![buf.to_string(), format!("0x{offset:04X}")]
            }
            Instruction::Gosub { target, .. } => vec![format!("0x{target:04X}")],
            Instruction::Call { argc, func, .. } => vec![argc.to_string(), format!("0x{func:X}")],
            Instruction::Enter(v) => vec![format!("0x{v:04X}")],
            Instruction::Unhandled {
                operand: Some((b, w)),
                ..
            } => vec![format!("0x{b:02X}"), format!("0x{w:04X}")],
            Instruction::Jump(t)
            | Instruction::JumpNonZeroPop(t)
            | Instruction::JumpZeroPop(t)
            | Instruction::JumpNonZero(t)
            | Instruction::JumpZero(t) => vec![format!("0x{t:04X}")],
            Instruction::JumpRelative { delta, .. } => vec![format!("{delta:+}")],
            Instruction::Switch { cases, default } => cases
                .iter()
                .map(|(value, target)| format!("{value}=>0x{target:04X}"))
                .chain(std::iter::once(format!("default=>0x{default:04X}")))
                .collect(),
            Instruction::RandomJump { branches, .. } => branches
                .iter()
                .map(|(weight, target)| format!("{weight}:0x{target:04X}"))
                .collect(),
            Instruction::DialoguePlay { voices, actor, .. } => {
                vec![voices.to_string(), actor.to_string()]
            }
            Instruction::DialogueOption { a, b, c } => {
                let mut ops = vec![format!("0x{a:02X}"), format!("0x{b:02X}")];
                if let Some(c) = c {
                    ops.push(format!("0x{c:04X}"));
                }
                ops
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = self.operands();
        if operands.is_empty() {
            write!(f, "{}", self.opcode().mnemonic())
        } else {
            write!(f, "{:5} {}", self.opcode().mnemonic(), operands.join(", "))
        }
    }
}
