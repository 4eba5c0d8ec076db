//! rsaga-script
//!
//! The script-thread virtual machine of the rsaga engine: a cooperative,
//! time-sliced bytecode interpreter. Many script threads share one loaded
//! program; the [`Scheduler`] advances each of them by a bounded number of
//! instructions per tick, honouring sleep timers and semaphore holds that
//! native host functions set.
//!
//! Everything the VM touches outside of its own threads is passed in through
//! a [`VmContext`]: the script module, the game data store, the host function
//! table and the host's own state.

pub mod config;
pub mod data;
pub mod error;
pub mod host;
pub mod instruction;
pub mod opcode;
pub mod policy;
pub mod scheduler;
pub mod script;
pub mod semaphore;
pub mod shared;
pub mod snapshot;
pub mod stack;
pub mod thread;
pub mod vm;

pub use config::{BranchPolicy, VmConfig, VmConfigBuilder};
pub use data::{DataBuffers, DataStore};
pub use error::{StackFault, VmError};
pub use host::{HostFn, HostFunction, HostFunctionTable, Intrinsic, NativeCall};
pub use instruction::{BinaryOp, Instruction, UnaryOp};
pub use opcode::Opcode;
pub use policy::{BranchSelector, FirstBranch, WeightedBranch};
pub use scheduler::Scheduler;
pub use script::{Bytecode, EntryPoint, ScriptData, ScriptModule, ScriptSlot};
pub use semaphore::Semaphore;
pub use shared::SharedScheduler;
pub use snapshot::{ThreadEntry, VmSnapshot};
pub use stack::{Growth, Stack};
pub use thread::{ScriptThread, ThreadId};
pub use vm::{Flow, VmContext};

/// The fixed-width machine word the VM computes with.
pub type Word = i16;
