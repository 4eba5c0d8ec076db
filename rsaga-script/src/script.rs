//! The loaded-script side of the VM.
//!
//! Loading and decompressing script resources happens elsewhere; the VM only
//! sees the result through [`ScriptModule`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::VmError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub offset: u16,
}

/// Immutable bytecode plus its entry-point table.
///
/// Shared by every thread that executes it; never copied.
#[derive(Debug, Clone)]
pub struct Bytecode {
    code: Arc<[u8]>,
    entry_points: Vec<EntryPoint>,
}

impl Bytecode {
    pub fn new(code: impl Into<Arc<[u8]>>, entry_points: Vec<EntryPoint>) -> Self {
        Self {
            code: code.into(),
            entry_points,
        }
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn entry_point(&self, index: usize) -> Result<&EntryPoint, VmError> {
        self.entry_points.get(index).ok_or(VmError::InvalidEntryPoint {
            index,
            count: self.entry_points.len(),
        })
    }
}

/// The script currently selected for execution.
#[derive(Debug, Clone)]
pub struct ScriptData {
    pub bytecode: Arc<Bytecode>,
    pub loaded: bool,
    /// Dialogue strings addressed by `PSHD` indices.
    pub strings: Vec<String>,
    /// Voice resource per dialogue string, when the script ships one.
    pub voices: Option<Vec<i32>>,
}

impl ScriptData {
    pub fn new(bytecode: Bytecode) -> Self {
        Self {
            bytecode: Arc::new(bytecode),
            loaded: true,
            strings: Vec::new(),
            voices: None,
        }
    }

    pub fn with_strings(mut self, strings: Vec<String>) -> Self {
        self.strings = strings;
        self
    }

    pub fn with_voices(mut self, voices: Vec<i32>) -> Self {
        self.voices = Some(voices);
        self
    }

    pub fn string(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    /// Voice resource for a dialogue string, `-1` when there is none.
    pub fn voice(&self, index: usize) -> i32 {
        self.voices
            .as_ref()
            .and_then(|v| v.get(index).copied())
            .unwrap_or(-1)
    }
}

pub trait ScriptModule {
    fn is_initialized(&self) -> bool;

    fn current_script(&self) -> Option<&ScriptData>;

    /// The current script, if one is present and fully loaded.
    fn loaded_script(&self) -> Result<&ScriptData, VmError> {
        if !self.is_initialized() {
            return Err(VmError::NotInitialized);
        }
        match self.current_script() {
            Some(script) if script.loaded => Ok(script),
            _ => Err(VmError::ScriptNotLoaded),
        }
    }
}

/// A script module holding at most one script.
#[derive(Debug, Clone, Default)]
pub struct ScriptSlot {
    initialized: bool,
    current: Option<ScriptData>,
}

impl ScriptSlot {
    pub fn new() -> Self {
        Self {
            initialized: true,
            current: None,
        }
    }

    pub fn uninitialized() -> Self {
        Self::default()
    }

    pub fn with_script(script: ScriptData) -> Self {
        Self {
            initialized: true,
            current: Some(script),
        }
    }

    pub fn load(&mut self, script: ScriptData) {
        self.current = Some(script);
    }

    pub fn unload(&mut self) -> Option<ScriptData> {
        self.current.take()
    }
}

impl ScriptModule for ScriptSlot {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn current_script(&self) -> Option<&ScriptData> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytecode() -> Bytecode {
        Bytecode::new(
            vec![0x1C, 0x1C],
            vec![
                EntryPoint {
                    name: "main".into(),
                    offset: 0,
                },
                EntryPoint {
                    name: "idle".into(),
                    offset: 1,
                },
            ],
        )
    }

    #[test]
    fn entry_point_bounds() {
        let bc = bytecode();
        assert_eq!(bc.entry_point(1).map(|e| e.offset), Ok(1));
        assert_eq!(
            bc.entry_point(2),
            Err(VmError::InvalidEntryPoint { index: 2, count: 2 })
        );
    }

    #[test]
    fn voice_lookup_falls_back() {
        let script = ScriptData::new(bytecode());
        assert_eq!(script.voice(0), -1);
        let script = script.with_voices(vec![40, 41]);
        assert_eq!(script.voice(1), 41);
        assert_eq!(script.voice(2), -1);
    }

    #[test]
    fn loaded_script_checks_state() {
        assert_eq!(
            ScriptSlot::uninitialized().loaded_script().err(),
            Some(VmError::NotInitialized)
        );
        assert_eq!(
            ScriptSlot::new().loaded_script().err(),
            Some(VmError::ScriptNotLoaded)
        );

        let mut script = ScriptData::new(bytecode());
        script.loaded = false;
        let mut slot = ScriptSlot::with_script(script);
        assert_eq!(slot.loaded_script().err(), Some(VmError::ScriptNotLoaded));

        slot.load(ScriptData::new(bytecode()));
        assert!(slot.loaded_script().is_ok());
        assert!(slot.unload().is_some());
        assert!(slot.current_script().is_none());
    }
}
