use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use strum::{Display, IntoStaticStr};

/// The closed instruction set of the script VM.
///
/// Discriminants are the byte values found in the bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Display, IntoStaticStr)]
#[repr(u8)]
pub enum Opcode {
    #[strum(serialize = "ALGN")]
    Align = 0x01,

    // stack
    #[strum(serialize = "PSHN")]
    PushNull = 0x02,
    #[strum(serialize = "POPN")]
    PopNull = 0x03,
    #[strum(serialize = "PSHF")]
    PushFalse = 0x04,
    #[strum(serialize = "PSHT")]
    PushTrue = 0x05,
    #[strum(serialize = "PUSH")]
    Push = 0x06,
    #[strum(serialize = "PSHD")]
    PushDialogue = 0x08,

    // data
    #[strum(serialize = "TSTF")]
    TestFlag = 0x0B,
    #[strum(serialize = "GETW")]
    GetWord = 0x0C,
    #[strum(serialize = "MODF")]
    ModifyFlag = 0x0F,
    #[strum(serialize = "PUTW")]
    PutWord = 0x10,
    #[strum(serialize = "MDFP")]
    ModifyFlagPop = 0x13,
    #[strum(serialize = "PTWP")]
    PutWordPop = 0x14,

    // control
    #[strum(serialize = "GOSB")]
    Gosub = 0x17,
    #[strum(serialize = "CALL")]
    Call = 0x18,
    #[strum(serialize = "CALL")]
    CallAlt = 0x19,
    #[strum(serialize = "ENTR")]
    Enter = 0x1A,
    #[strum(serialize = "???")]
    Unknown1B = 0x1B,
    #[strum(serialize = "EXIT")]
    Exit = 0x1C,

    // branch
    #[strum(serialize = "JMP")]
    Jump = 0x1D,
    #[strum(serialize = "JNZP")]
    JumpNonZeroPop = 0x1E,
    #[strum(serialize = "JZP")]
    JumpZeroPop = 0x1F,
    #[strum(serialize = "JNZ")]
    JumpNonZero = 0x20,
    #[strum(serialize = "JZ")]
    JumpZero = 0x21,
    #[strum(serialize = "SWCH")]
    Switch = 0x22,
    #[strum(serialize = "RJMP")]
    RandomJump = 0x24,

    // misc
    #[strum(serialize = "NEG")]
    Negate = 0x25,
    #[strum(serialize = "TSTZ")]
    TestZero = 0x26,
    #[strum(serialize = "NOT")]
    Not = 0x27,
    #[strum(serialize = "???")]
    Unknown28 = 0x28,
    #[strum(serialize = "???")]
    Unknown29 = 0x29,
    #[strum(serialize = "???")]
    Unknown2A = 0x2A,
    #[strum(serialize = "???")]
    Unknown2B = 0x2B,

    // arithmetic
    #[strum(serialize = "ADD")]
    Add = 0x2C,
    #[strum(serialize = "SUB")]
    Sub = 0x2D,
    #[strum(serialize = "MULT")]
    Mul = 0x2E,
    #[strum(serialize = "DIV")]
    Div = 0x2F,
    #[strum(serialize = "MOD")]
    Mod = 0x30,
    #[strum(serialize = "EQU")]
    Equal = 0x33,
    #[strum(serialize = "NEQU")]
    NotEqual = 0x34,
    #[strum(serialize = "GRT")]
    Greater = 0x35,
    #[strum(serialize = "LST")]
    Less = 0x36,
    #[strum(serialize = "GRTE")]
    GreaterEqual = 0x37,
    #[strum(serialize = "LSTE")]
    LessEqual = 0x38,

    // bitwise
    #[strum(serialize = "SHR")]
    ShiftRight = 0x3F,
    #[strum(serialize = "SHL")]
    ShiftLeft = 0x40,
    #[strum(serialize = "AND")]
    And = 0x41,
    #[strum(serialize = "OR")]
    Or = 0x42,
    #[strum(serialize = "XOR")]
    Xor = 0x43,

    // boolean
    #[strum(serialize = "LAND")]
    LogicalAnd = 0x44,
    #[strum(serialize = "LOR")]
    LogicalOr = 0x45,
    #[strum(serialize = "LXOR")]
    LogicalXor = 0x46,

    // game
    #[strum(serialize = "DLGP")]
    DialoguePlay = 0x53,
    #[strum(serialize = "DLGS")]
    DialogueStart = 0x54,
    #[strum(serialize = "DLGX")]
    DialogueRun = 0x55,
    #[strum(serialize = "DLGO")]
    DialogueOption = 0x56,
    #[strum(serialize = "JMPR")]
    JumpRelative = 0x57,
}

impl Opcode {
    pub fn decode(byte: u8) -> Option<Self> {
        Self::from_u8(byte)
    }

    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Opcodes the interpreter recognizes but refuses to execute.
    pub fn is_unhandled(self) -> bool {
        matches!(
            self,
            Opcode::Unknown1B
                | Opcode::Unknown28
                | Opcode::Unknown29
                | Opcode::Unknown2A
                | Opcode::Unknown2B
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_and_unknown() {
        assert_eq!(Opcode::decode(0x2C), Some(Opcode::Add));
        assert_eq!(Opcode::decode(0x19), Some(Opcode::CallAlt));
        assert_eq!(Opcode::decode(0x00), None);
        assert_eq!(Opcode::decode(0x07), None);
        assert_eq!(Opcode::decode(0xFF), None);
    }

    #[test]
    fn both_call_opcodes_share_a_mnemonic() {
        assert_eq!(Opcode::Call.mnemonic(), "CALL");
        assert_eq!(Opcode::CallAlt.to_string(), "CALL");
        assert_eq!(Opcode::ShiftRight.mnemonic(), "SHR");
    }
}
