/// An error that occurred while loading or executing a program
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("{width} byte access at {address:#06x} is outside memory of {size} bytes")]
  OutOfBounds {
    address: usize,
    width: usize,
    size: usize,
  },

  #[error("no such register `{0}`")]
  UnknownRegister(String),

  #[error("illegal instruction {opcode:#04x} at {address:#06x}")]
  IllegalInstruction { opcode: u8, address: u16 },

  #[error("machine is halted")]
  MachineHalted,

  #[error("no such instruction `{0}`")]
  UnknownMnemonic(String),

  #[error("operands do not fit the encoding of `{mnemonic}`")]
  OperandMismatch { mnemonic: &'static str },

  #[error("invalid configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
