//! Engine construction parameters.
//!
//! Loaded in priority order:
//! 1. Environment variables (`VCPU_MEMORY_SIZE`, `VCPU_IVT_BASE`,
//!    `VCPU_STACK_START`, `VCPU_INTERRUPT_MASK`)
//! 2. A TOML file, when one is given
//! 3. Built-in defaults
//!
//! ```toml
//! memory_size = 65536
//! interrupt_vector_base = 0x1000
//! stack_start = 0xfffd
//! interrupt_mask = 0xffff
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vm::VECTORS;

/// Largest memory a 16-bit address can reach
pub const ADDRESS_SPACE: usize = 0x1_0000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Main memory size in bytes
  pub memory_size: usize,
  /// Address of the first of the fifteen interrupt handler addresses
  pub interrupt_vector_base: u16,
  /// Initial `sp` and `fp`
  pub stack_start: u16,
  /// Initial `im`, every vector enabled by default
  pub interrupt_mask: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      memory_size: ADDRESS_SPACE,
      interrupt_vector_base: 0x1000,
      stack_start: 0xFFFD,
      interrupt_mask: 0xFFFF,
    }
  }
}

impl Config {
  /// Defaults, overridden by `path` when given, overridden by the environment
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut config = match path {
      Some(path) => Self::from_file(path)?,
      None => Self::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    log::debug!("loaded configuration: {config:?}");
    Ok(config)
  }

  pub fn from_file(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    let config: Self = toml::from_str(&content)
      .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.memory_size == 0 || self.memory_size > ADDRESS_SPACE {
      return Err(Error::Config(format!(
        "memory size {} is not within 1..={ADDRESS_SPACE}",
        self.memory_size
      )));
    }
    // the first push writes the word at stack_start
    if self.stack_start as usize + 2 > self.memory_size {
      return Err(Error::Config(format!(
        "stack start {:#06x} is outside {} bytes of memory",
        self.stack_start, self.memory_size
      )));
    }
    let table_end = self.interrupt_vector_base as usize + 2 * VECTORS as usize;
    if table_end > self.memory_size {
      return Err(Error::Config(format!(
        "interrupt vector table at {:#06x} runs past {} bytes of memory",
        self.interrupt_vector_base, self.memory_size
      )));
    }
    Ok(())
  }

  fn apply_env_overrides(&mut self) {
    if let Some(size) = env_number("VCPU_MEMORY_SIZE") {
      self.memory_size = size as usize;
    }
    if let Some(base) = env_word("VCPU_IVT_BASE") {
      self.interrupt_vector_base = base;
    }
    if let Some(start) = env_word("VCPU_STACK_START") {
      self.stack_start = start;
    }
    if let Some(mask) = env_word("VCPU_INTERRUPT_MASK") {
      self.interrupt_mask = mask;
    }
  }
}

/// Parse `0x`-prefixed hex or plain decimal
pub fn parse_number(text: &str) -> Option<u32> {
  let text = text.trim();
  match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
    Some(hex) => u32::from_str_radix(hex, 16).ok(),
    None => text.parse().ok(),
  }
}

fn env_number(key: &str) -> Option<u32> {
  let value = std::env::var(key).ok()?;
  let parsed = parse_number(&value);
  match parsed {
    Some(number) => log::info!("using {key}={number:#x} from environment"),
    None => log::warn!("ignoring {key}={value:?}, not a number"),
  }
  parsed
}

fn env_word(key: &str) -> Option<u16> {
  let number = env_number(key)?;
  match u16::try_from(number) {
    Ok(word) => Some(word),
    Err(_) => {
      log::warn!("ignoring {key}={number:#x}, does not fit in 16 bits");
      None
    }
  }
}
