use crate::thread::ThreadId;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackFault {
    #[error("stack overflow (capacity={capacity})")]
    Overflow { capacity: usize },

    #[error("stack underflow")]
    Underflow,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("script module is not initialized")]
    NotInitialized,

    #[error("no script is loaded")]
    ScriptNotLoaded,

    #[error("no such thread: {0}")]
    NoSuchThread(ThreadId),

    #[error("invalid entry point {index} (script has {count})")]
    InvalidEntryPoint { index: usize, count: usize },

    #[error("{fault} at offset 0x{offset:X}")]
    Stack {
        #[source]
        fault: StackFault,
        offset: usize,
    },

    #[error("invalid opcode: 0x{opcode:02X} at offset 0x{offset:X}")]
    InvalidOpcode { opcode: u8, offset: usize },

    #[error("unhandled opcode: 0x{opcode:02X} at offset 0x{offset:X}")]
    UnhandledOpcode { opcode: u8, offset: usize },

    #[error("instruction at offset 0x{offset:X} runs past the end of the bytecode (len=0x{len:X})")]
    Truncated { offset: usize, len: usize },

    #[error("return offset of the call at 0x{offset:X} does not fit in a stack word")]
    ReturnOutOfRange { offset: usize },

    #[error("invalid script function number: 0x{func:X} at offset 0x{offset:X}")]
    InvalidFunction { func: u16, offset: usize },

    #[error("division by zero at offset 0x{offset:X}")]
    DivideByZero { offset: usize },
}
