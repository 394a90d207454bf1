use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Every register the CPU has, in the order their operand bytes select them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
  /// Address of the next instruction byte to fetch
  Ip = 0,
  /// Accumulator, destination of arithmetic and logic results
  Acc,
  R1,
  R2,
  R3,
  R4,
  R5,
  R6,
  R7,
  R8,
  /// Next free stack slot; the stack grows down
  Sp,
  /// Base of the current call frame
  Fp,
  /// Interrupt mask, bit `k` set enables vector `k`
  Im,
}

impl Register {
  pub const COUNT: usize = 13;

  pub const ALL: [Register; Register::COUNT] = [
    Register::Ip,
    Register::Acc,
    Register::R1,
    Register::R2,
    Register::R3,
    Register::R4,
    Register::R5,
    Register::R6,
    Register::R7,
    Register::R8,
    Register::Sp,
    Register::Fp,
    Register::Im,
  ];

  /// The general purpose registers a call frame saves, in save order
  pub const GENERAL: [Register; 8] = [
    Register::R1,
    Register::R2,
    Register::R3,
    Register::R4,
    Register::R5,
    Register::R6,
    Register::R7,
    Register::R8,
  ];

  /// Decode a register-select operand byte. Out of range bytes wrap around
  /// the register count instead of faulting.
  pub fn from_operand(byte: u8) -> Self {
    Self::ALL[byte as usize % Self::COUNT]
  }

  pub fn index(self) -> u8 {
    self as u8
  }

  pub fn name(self) -> &'static str {
    match self {
      Register::Ip => "ip",
      Register::Acc => "acc",
      Register::R1 => "r1",
      Register::R2 => "r2",
      Register::R3 => "r3",
      Register::R4 => "r4",
      Register::R5 => "r5",
      Register::R6 => "r6",
      Register::R7 => "r7",
      Register::R8 => "r8",
      Register::Sp => "sp",
      Register::Fp => "fp",
      Register::Im => "im",
    }
  }
}

impl FromStr for Register {
  type Err = Error;

  fn from_str(name: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|register| register.name() == name)
      .ok_or_else(|| Error::UnknownRegister(name.to_owned()))
  }
}

impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// The register file: one 16-bit cell per [`Register`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
  cells: [u16; Register::COUNT],
}

impl RegisterFile {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn get(&self, register: Register) -> u16 {
    self.cells[register as usize]
  }

  #[inline]
  pub fn set(&mut self, register: Register, value: u16) {
    self.cells[register as usize] = value;
  }

  /// Look a register up by its assembly name
  pub fn get_by_name(&self, name: &str) -> Result<u16, Error> {
    Ok(self.get(name.parse()?))
  }

  pub fn set_by_name(&mut self, name: &str, value: u16) -> Result<(), Error> {
    self.set(name.parse()?, value);
    Ok(())
  }

  pub fn iter(&self) -> impl Iterator<Item = (Register, u16)> + '_ {
    Register::ALL
      .into_iter()
      .map(|register| (register, self.get(register)))
  }
}

impl fmt::Display for RegisterFile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (register, value) in self.iter() {
      writeln!(f, "{:>3}: {value:04x}", register.name())?;
    }
    Ok(())
  }
}
