use crate::instruction::{BinaryOp, UnaryOp};
use crate::Word;

const SIGN_BIT: u16 = 0x8000;

fn flag(b: bool) -> Word {
    b as Word
}

pub(crate) fn unary(op: UnaryOp, v: Word) -> Word {
    match op {
        UnaryOp::Negate => v.wrapping_neg(),
        UnaryOp::TestZero => flag(v == 0),
        UnaryOp::Not => !v,
    }
}

/// Apply a two-operand instruction; `a` is the deeper stack value.
///
/// `None` means division or modulus by zero.
pub(crate) fn binary(op: BinaryOp, a: Word, b: Word) -> Option<Word> {
    let out = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return None;
            }
            a.wrapping_div(b)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return None;
            }
            a.wrapping_rem(b)
        }

        BinaryOp::Equal => flag(a == b),
        BinaryOp::NotEqual => flag(a != b),
        BinaryOp::Greater => flag(a > b),
        BinaryOp::Less => flag(a < b),
        BinaryOp::GreaterEqual => flag(a >= b),
        BinaryOp::LessEqual => flag(a <= b),

        BinaryOp::ShiftRight => shift_right(a, b),
        BinaryOp::ShiftLeft => (a as u16).checked_shl(b as u16 as u32).unwrap_or(0) as Word,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,

        BinaryOp::LogicalAnd => flag(a != 0 && b != 0),
        BinaryOp::LogicalOr => flag(a != 0 || b != 0),
        BinaryOp::LogicalXor => flag((a != 0) != (b != 0)),
    };
    Some(out)
}

/// One-bit logical shifts with the original sign bit OR-ed back in after
/// every step. Past 16 steps the result no longer changes.
fn shift_right(a: Word, count: Word) -> Word {
    let sign = (a as u16) & SIGN_BIT;
    let mut bits = a as u16;
    for _ in 0..count.clamp(0, 16) {
        bits = (bits >> 1) | sign;
    }
    bits as Word
}
