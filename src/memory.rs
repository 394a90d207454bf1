use std::fmt;

use crate::error::{Error, Result};

/// A fixed-size, byte addressable block of memory.
///
/// Words are stored big-endian, most significant byte at the lower address.
#[derive(Debug, Clone)]
pub struct Memory {
  bytes: Box<[u8]>,
}

impl Memory {
  /// Create a zeroed memory of `size` bytes
  pub fn new(size: usize) -> Self {
    Self {
      bytes: vec![0; size].into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  // every access goes through here, so a failed word write never lands half
  // of its bytes
  fn range(&self, address: usize, width: usize) -> Result<std::ops::Range<usize>> {
    match address.checked_add(width) {
      Some(end) if end <= self.bytes.len() => Ok(address..end),
      _ => Err(Error::OutOfBounds {
        address,
        width,
        size: self.bytes.len(),
      }),
    }
  }

  pub fn read_byte(&self, address: usize) -> Result<u8> {
    let range = self.range(address, 1)?;
    Ok(self.bytes[range.start])
  }

  pub fn write_byte(&mut self, address: usize, value: u8) -> Result<()> {
    let range = self.range(address, 1)?;
    self.bytes[range.start] = value;
    Ok(())
  }

  pub fn read_word(&self, address: usize) -> Result<u16> {
    let range = self.range(address, 2)?;
    let word = &self.bytes[range];
    Ok(u16::from_be_bytes([word[0], word[1]]))
  }

  pub fn write_word(&mut self, address: usize, value: u16) -> Result<()> {
    let range = self.range(address, 2)?;
    self.bytes[range].copy_from_slice(&value.to_be_bytes());
    Ok(())
  }

  /// Copy `data` in starting at `address`; nothing is written if any byte
  /// would land outside of memory.
  pub fn load(&mut self, address: usize, data: &[u8]) -> Result<()> {
    let range = self.range(address, data.len())?;
    self.bytes[range].copy_from_slice(data);
    Ok(())
  }

  /// A read-only view of `n` bytes starting at `address`, for dumping
  pub fn window(&self, address: usize, n: usize) -> Result<MemoryWindow<'_>> {
    let range = self.range(address, n)?;
    Ok(MemoryWindow {
      address,
      bytes: &self.bytes[range],
    })
  }
}

/// A borrowed run of memory bytes, displayed as `aaaa: 0xbb 0xbb ...`
#[derive(Debug, Clone, Copy)]
pub struct MemoryWindow<'mem> {
  address: usize,
  bytes: &'mem [u8],
}

impl<'mem> MemoryWindow<'mem> {
  pub fn address(&self) -> usize {
    self.address
  }

  /// The viewed bytes, borrowed from the memory rather than the window
  pub fn bytes(&self) -> &'mem [u8] {
    self.bytes
  }
}

impl fmt::Display for MemoryWindow<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04x}:", self.address)?;
    for byte in self.bytes {
      write!(f, " {byte:#04x}")?;
    }
    Ok(())
  }
}
