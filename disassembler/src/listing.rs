use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use rsaga_script::{EntryPoint, Instruction, VmError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    name: String,
    address: u32,
    insts: Vec<Inst>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inst {
    address: u32,
    mnemonic: String,
    operands: Vec<String>,
}

impl Inst {
    fn from_instruction(address: usize, inst: &Instruction) -> Self {
        Self {
            address: address as u32,
            mnemonic: inst.opcode().mnemonic().to_string(),
            operands: inst.operands(),
        }
    }

    /// A byte that does not start a valid instruction.
    fn from_byte(address: usize, byte: u8) -> Self {
        Self {
            address: address as u32,
            mnemonic: "db".to_string(),
            operands: vec![format!("0x{byte:02X}")],
        }
    }
}

/// Linear-sweep disassembler over a raw bytecode image.
///
/// Entry points split the listing into functions; bytes before the first
/// entry point land in an implicit `start` function.
pub struct Disassembler {
    code: Vec<u8>,
    entries: Vec<EntryPoint>,
    functions: Vec<Function>,
}

impl Disassembler {
    pub fn new(code: Vec<u8>, entries: Vec<EntryPoint>) -> Self {
        Self {
            code,
            entries,
            functions: Vec::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>, entries: Vec<EntryPoint>) -> Result<Self> {
        let path = path.as_ref();
        let code = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
        Ok(Self::new(code, entries))
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    fn begin_function(&mut self, entry: usize, address: usize) {
        let name = self
            .entries
            .iter()
            .filter(|e| e.offset as usize == entry)
            .map(|e| e.name.as_str())
            .join("/");
        self.functions.push(Function {
            name,
            address: address as u32,
            insts: Vec::new(),
        });
    }

    fn push_inst(&mut self, inst: Inst) {
        if self.functions.is_empty() {
            self.functions.push(Function {
                name: "start".to_string(),
                address: 0,
                insts: Vec::new(),
            });
        }
        if let Some(func) = self.functions.last_mut() {
            func.insts.push(inst);
        }
    }

    pub fn disassemble(&mut self) -> Result<()> {
        self.functions.clear();
        let starts: Vec<usize> = self
            .entries
            .iter()
            .map(|e| e.offset as usize)
            .sorted()
            .dedup()
            .collect();
        let mut next_start = starts.into_iter().peekable();

        let mut pc = 0usize;
        while pc < self.code.len() {
            // an entry point inside the previous instruction is still honoured
            while let Some(&start) = next_start.peek() {
                if start > pc {
                    break;
                }
                if start < pc {
                    log::warn!("entry point 0x{:04X} is not on an instruction boundary", start);
                }
                next_start.next();
                self.begin_function(start, pc);
            }

            match Instruction::decode(&self.code, pc) {
                Ok((inst, next)) => {
                    self.push_inst(Inst::from_instruction(pc, &inst));
                    pc = next;
                }
                Err(VmError::InvalidOpcode { opcode, .. }) => {
                    log::error!("unknown opcode: 0x{:02X} at 0x{:04X}", opcode, pc);
                    self.push_inst(Inst::from_byte(pc, opcode));
                    pc += 1;
                }
                Err(e) => {
                    log::error!("{}", e);
                    let tail = self.code[pc..].to_vec();
                    for (i, &byte) in tail.iter().enumerate() {
                        self.push_inst(Inst::from_byte(pc + i, byte));
                    }
                    pc = self.code.len();
                }
            }
        }

        Ok(())
    }

    pub fn write_insts(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer =
            std::fs::File::create(path).with_context(|| format!("create {:?}", path))?;
        serde_yaml::to_writer(&mut writer, &self.functions)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.functions)?)
    }
}
