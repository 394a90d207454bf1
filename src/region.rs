use crate::error::{Error, Result};
use crate::opcode::{Opcode, Operands};
use crate::register::Register;

/// A region of bytes that gets copied into memory before execution
pub trait Region {
  /// Address the first byte lands at
  fn origin(&self) -> u16;

  fn bytes(&self) -> &[u8];
}

/// One operand of an instruction being encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
  Lit(u16),
  Reg(Register),
  Addr(u16),
  /// Single byte shift amount
  Shift(u8),
}

/// A `Chunk` is a single contiguous image the virtual machine may load,
/// either handed over as raw bytes or encoded one instruction at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
  origin: u16,
  bytes: Vec<u8>,
}

impl Chunk {
  /// An empty chunk that will be loaded at `origin`
  pub fn at(origin: u16) -> Self {
    Self {
      origin,
      bytes: Vec::new(),
    }
  }

  /// Address the next emitted byte will have once loaded
  pub fn cursor(&self) -> usize {
    self.origin as usize + self.bytes.len()
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// Encode one instruction, checking the operands against the opcode's
  /// shape in the instruction table.
  pub fn emit(&mut self, opcode: Opcode, operands: &[Operand]) -> Result<&mut Self> {
    use Operand::*;

    let mismatch = || Error::OperandMismatch {
      mnemonic: opcode.mnemonic(),
    };
    let mut encoded = vec![opcode.byte()];
    match (opcode.operands(), operands) {
      (Operands::None, []) => {}
      (Operands::Lit, [Lit(v) | Addr(v)]) => encoded.extend(v.to_be_bytes()),
      (Operands::Reg, [Reg(r)]) => encoded.push(r.index()),
      (Operands::LitReg, [Lit(v), Reg(r)]) => {
        encoded.extend(v.to_be_bytes());
        encoded.push(r.index());
      }
      (Operands::RegReg | Operands::RegPtrReg, [Reg(a), Reg(b)]) => {
        encoded.extend([a.index(), b.index()]);
      }
      (Operands::RegLit, [Reg(r), Lit(v)]) | (Operands::RegMem, [Reg(r), Addr(v)]) => {
        encoded.push(r.index());
        encoded.extend(v.to_be_bytes());
      }
      (Operands::RegLit8, [Reg(r), Shift(n)]) => encoded.extend([r.index(), *n]),
      (Operands::MemReg, [Addr(a), Reg(r)]) => {
        encoded.extend(a.to_be_bytes());
        encoded.push(r.index());
      }
      (Operands::LitMem, [Lit(v), Addr(a)]) => {
        encoded.extend(v.to_be_bytes());
        encoded.extend(a.to_be_bytes());
      }
      (Operands::LitOffReg, [Addr(base), Reg(index), Reg(d)]) => {
        encoded.extend(base.to_be_bytes());
        encoded.extend([index.index(), d.index()]);
      }
      _ => return Err(mismatch()),
    }
    debug_assert_eq!(encoded.len(), opcode.size() as usize);
    self.bytes.extend(encoded);
    Ok(self)
  }

  /// Append raw data bytes
  pub fn data(&mut self, data: &[u8]) -> &mut Self {
    self.bytes.extend_from_slice(data);
    self
  }

  /// Append big-endian data words, e.g. an interrupt vector table
  pub fn words(&mut self, words: &[u16]) -> &mut Self {
    for word in words {
      self.bytes.extend(word.to_be_bytes());
    }
    self
  }
}

impl From<Vec<u8>> for Chunk {
  fn from(bytes: Vec<u8>) -> Self {
    Self { origin: 0, bytes }
  }
}

impl Region for Chunk {
  fn origin(&self) -> u16 {
    self.origin
  }

  fn bytes(&self) -> &[u8] {
    &self.bytes
  }
}
