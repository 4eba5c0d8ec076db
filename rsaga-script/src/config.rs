use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::stack::Growth;

/// Environment variable overriding [`VmConfig::instructions_per_tick`].
pub const MAX_OPS_ENV: &str = "RSAGA_VM_MAX_OPS";

/// How `RJMP` picks its branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BranchPolicy {
    /// Always take the first table entry.
    #[default]
    First,
    /// Honour the declared weights. A fixed seed makes runs reproducible.
    Weighted { seed: Option<u64> },
}

/// Tunables of the script VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Instructions each thread may execute per scheduling pass.
    pub instructions_per_tick: usize,
    /// Capacity of every thread's operand stack, in words.
    pub stack_capacity: usize,
    pub stack_growth: Growth,
    /// Size of the host function table built by
    /// [`HostFunctionTable::from_config`](crate::HostFunctionTable::from_config).
    pub host_function_count: usize,
    pub branch_policy: BranchPolicy,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            instructions_per_tick: 8,
            stack_capacity: 16,
            stack_growth: Growth::Down,
            host_function_count: 78,
            branch_policy: BranchPolicy::First,
        }
    }
}

impl VmConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("read {:?}", path))?;
        let config = serde_json::from_slice(&bytes).with_context(|| format!("parse {:?}", path))?;
        Ok(config)
    }

    /// Apply overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ops) = std::env::var(MAX_OPS_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.instructions_per_tick = ops;
        }
        self
    }
}

/// `VmConfigBuilder` is a convenience builder to create a `VmConfig` from code.
pub struct VmConfigBuilder {
    config: VmConfig,
}

impl VmConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Default::default(),
        }
    }

    pub fn with_instructions_per_tick(mut self, count: usize) -> Self {
        self.config.instructions_per_tick = count;
        self
    }

    pub fn with_stack(mut self, capacity: usize, growth: Growth) -> Self {
        self.config.stack_capacity = capacity;
        self.config.stack_growth = growth;
        self
    }

    pub fn with_host_function_count(mut self, count: usize) -> Self {
        self.config.host_function_count = count;
        self
    }

    pub fn with_branch_policy(mut self, policy: BranchPolicy) -> Self {
        self.config.branch_policy = policy;
        self
    }

    pub fn get(self) -> VmConfig {
        self.config
    }
}

impl Default for VmConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: VmConfig =
            serde_json::from_str(r#"{ "instructions_per_tick": 100, "branch_policy": { "Weighted": { "seed": 3 } } }"#)
                .unwrap();
        assert_eq!(
            config,
            VmConfig {
                instructions_per_tick: 100,
                branch_policy: BranchPolicy::Weighted { seed: Some(3) },
                ..VmConfig::default()
            }
        );
    }

    #[test]
    fn builder_sets_fields() {
        let config = VmConfigBuilder::new()
            .with_instructions_per_tick(2)
            .with_stack(4, Growth::Up)
            .with_host_function_count(3)
            .get();
        assert_eq!(config.instructions_per_tick, 2);
        assert_eq!(config.stack_capacity, 4);
        assert_eq!(config.stack_growth, Growth::Up);
        assert_eq!(config.host_function_count, 3);
        assert_eq!(config.branch_policy, BranchPolicy::First);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = VmConfig::load("/nonexistent/rsaga-vm.json").unwrap_err();
        assert!(format!("{err:#}").contains("rsaga-vm.json"));
    }
}
