use std::fmt;

use crate::error::Error;

/// The operand bytes that follow an opcode, in encoding order.
///
/// `Lit` is a 16-bit big-endian literal, `Mem` a 16-bit big-endian address,
/// `Reg` a single register-select byte and `Lit8` a single literal byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
  None,
  Lit,
  Reg,
  LitReg,
  RegReg,
  RegLit,
  RegLit8,
  RegMem,
  MemReg,
  LitMem,
  /// Source register holds the address to load from
  RegPtrReg,
  /// Base address, index register, destination register
  LitOffReg,
}

impl Operands {
  /// Number of operand bytes following the opcode
  pub const fn width(self) -> u16 {
    match self {
      Operands::None => 0,
      Operands::Reg => 1,
      Operands::Lit | Operands::RegReg | Operands::RegLit8 | Operands::RegPtrReg => 2,
      Operands::LitReg | Operands::RegLit | Operands::RegMem | Operands::MemReg => 3,
      Operands::LitMem | Operands::LitOffReg => 4,
    }
  }
}

// One list drives the enum, the mnemonic table and the operand shapes, so
// the encoder and the decoder cannot drift apart. Repeating an opcode byte
// is a compile error since the enum discriminants must be unique.
macro_rules! instructions {
  ($( $(#[$doc:meta])* $name:ident = $code:literal, $mnemonic:literal, $shape:ident; )*) => {
    #[repr(u8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Opcode {
      $( $(#[$doc])* $name = $code, )*
    }

    impl Opcode {
      /// Every instruction, in table order
      pub const ALL: &'static [Opcode] = &[$( Opcode::$name ),*];

      pub const fn mnemonic(self) -> &'static str {
        match self {
          $( Opcode::$name => $mnemonic, )*
        }
      }

      pub const fn operands(self) -> Operands {
        match self {
          $( Opcode::$name => Operands::$shape, )*
        }
      }

      /// Decode an opcode byte, `None` if no instruction has it
      pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
          $( $code => Some(Opcode::$name), )*
          _ => None,
        }
      }
    }
  };
}

instructions! {
  /// | Operation         | Semantics/RTL | Assembly              |
  /// |-------------------|---------------|-----------------------|
  /// | Move literal      | `r[d] ← vvvv` | `mov $vvvv, rd`       |
  MovLitReg = 0x10, "MOV_LIT_REG", LitReg;
  /// `r[d] ← r[s]`
  MovRegReg = 0x11, "MOV_REG_REG", RegReg;
  /// `m[aaaa] ← r[s]`
  MovRegMem = 0x12, "MOV_REG_MEM", RegMem;
  /// `r[d] ← m[aaaa]`
  MovMemReg = 0x13, "MOV_MEM_REG", MemReg;
  /// `m[aaaa] ← vvvv`
  MovLitMem = 0x1B, "MOV_LIT_MEM", LitMem;
  /// Register indirect load.
  ///
  /// | Operation         | Semantics/RTL    | Assembly       |
  /// |-------------------|------------------|----------------|
  /// | Move pointer      | `r[d] ← m[r[s]]` | `mov &rs, rd`  |
  MovRegPtrReg = 0x1C, "MOV_REG_PTR_REG", RegPtrReg;
  /// Indexed load.
  ///
  /// | Operation         | Semantics/RTL           | Assembly              |
  /// |-------------------|-------------------------|-----------------------|
  /// | Move base+index   | `r[d] ← m[aaaa + r[i]]` | `mov [$aaaa + ri], rd`|
  MovLitOffReg = 0x1D, "MOV_LIT_OFF_REG", LitOffReg;

  /// `acc ← r[a] + r[b]`
  AddRegReg = 0x14, "ADD_REG_REG", RegReg;
  /// `acc ← vvvv + r[s]`
  AddLitReg = 0x3F, "ADD_LIT_REG", LitReg;
  /// `acc ← r[s] − vvvv`
  SubLitReg = 0x16, "SUB_LIT_REG", LitReg;
  /// `acc ← vvvv − r[s]`, note the operand order
  SubRegLit = 0x1E, "SUB_REG_LIT", RegLit;
  /// `acc ← r[a] − r[b]`
  SubRegReg = 0x1F, "SUB_REG_REG", RegReg;
  /// `r[d] ← r[d] + 1`
  IncReg = 0x35, "INC_REG", Reg;
  /// `r[d] ← r[d] − 1`
  DecReg = 0x36, "DEC_REG", Reg;
  /// `acc ← vvvv × r[s]`
  MulLitReg = 0x20, "MUL_LIT_REG", LitReg;
  /// `acc ← r[a] × r[b]`
  MulRegReg = 0x21, "MUL_REG_REG", RegReg;

  /// `r[d] ← r[d] << vv`
  LsfRegLit = 0x26, "LSF_REG_LIT", RegLit8;
  /// `r[d] ← r[d] << r[s]`
  LsfRegReg = 0x27, "LSF_REG_REG", RegReg;
  /// `r[d] ← r[d] >> vv`
  RsfRegLit = 0x2A, "RSF_REG_LIT", RegLit8;
  /// `r[d] ← r[d] >> r[s]`
  RsfRegReg = 0x2B, "RSF_REG_REG", RegReg;
  /// `acc ← r[s] & vvvv`
  AndRegLit = 0x2E, "AND_REG_LIT", RegLit;
  AndRegReg = 0x2F, "AND_REG_REG", RegReg;
  /// `acc ← r[s] | vvvv`
  OrRegLit = 0x30, "OR_REG_LIT", RegLit;
  OrRegReg = 0x31, "OR_REG_REG", RegReg;
  /// `acc ← r[s] ^ vvvv`
  XorRegLit = 0x32, "XOR_REG_LIT", RegLit;
  XorRegReg = 0x33, "XOR_REG_REG", RegReg;
  /// `acc ← ~r[s]`
  Not = 0x34, "NOT", Reg;

  /// Conditional jumps compare their value against `acc`.
  ///
  /// | Operation        | Semantics/RTL                  | Assembly             |
  /// |------------------|--------------------------------|----------------------|
  /// | Jump not equal   | `if vvvv ≠ acc : ip ← aaaa`    | `jne $vvvv, &aaaa`   |
  JmpNotEq = 0x15, "JMP_NOT_EQ", LitMem;
  /// `if r[s] ≠ acc : ip ← aaaa`
  JneReg = 0x40, "JNE_REG", RegMem;
  /// `if vvvv = acc : ip ← aaaa`
  JeqLit = 0x41, "JEQ_LIT", LitMem;
  JeqReg = 0x3E, "JEQ_REG", RegMem;
  /// `if vvvv < acc : ip ← aaaa`
  JltLit = 0x43, "JLT_LIT", LitMem;
  JltReg = 0x42, "JLT_REG", RegMem;
  /// `if vvvv > acc : ip ← aaaa`
  JgtLit = 0x45, "JGT_LIT", LitMem;
  JgtReg = 0x44, "JGT_REG", RegMem;
  /// `if vvvv ≤ acc : ip ← aaaa`
  JleLit = 0x47, "JLE_LIT", LitMem;
  JleReg = 0x46, "JLE_REG", RegMem;
  /// `if vvvv ≥ acc : ip ← aaaa`
  JgeLit = 0x49, "JGE_LIT", LitMem;
  JgeReg = 0x48, "JGE_REG", RegMem;

  /// `m[sp] ← vvvv; sp ← sp − 2`
  PshLit = 0x17, "PSH_LIT", Lit;
  PshReg = 0x18, "PSH_REG", Reg;
  /// `sp ← sp + 2; r[d] ← m[sp]`
  Pop = 0x1A, "POP", Reg;
  /// Save the caller's frame and jump.
  ///
  /// | Operation   | Semantics/RTL             | Assembly      |
  /// |-------------|---------------------------|---------------|
  /// | Call        | `push frame; ip ← aaaa`   | `cal &aaaa`   |
  CalLit = 0x5E, "CAL_LIT", Lit;
  /// `push frame; ip ← r[s]`
  CalReg = 0x5F, "CAL_REG", Reg;
  /// `pop frame`
  Ret = 0x60, "RET", None;
  /// Leave an interrupt handler, restoring the interrupted frame
  RetInt = 0xFC, "RET_INT", None;
  /// Raise interrupt `vvvv mod 15` from software
  Int = 0xFD, "INT", Lit;
  /// Stop execution
  Hlt = 0xFF, "HLT", None;
}

const fn same(a: &str, b: &str) -> bool {
  let (a, b) = (a.as_bytes(), b.as_bytes());
  if a.len() != b.len() {
    return false;
  }
  let mut i = 0;
  while i < a.len() {
    if a[i] != b[i] {
      return false;
    }
    i += 1;
  }
  true
}

const _: () = {
  let all = Opcode::ALL;
  let mut i = 0;
  while i < all.len() {
    let mut j = i + 1;
    while j < all.len() {
      assert!(
        !same(all[i].mnemonic(), all[j].mnemonic()),
        "two instructions share a mnemonic"
      );
      j += 1;
    }
    i += 1;
  }
};

impl Opcode {
  pub fn byte(self) -> u8 {
    self as u8
  }

  /// Total encoded length, opcode byte included
  pub const fn size(self) -> u16 {
    1 + self.operands().width()
  }

  pub fn from_mnemonic(mnemonic: &str) -> Result<Self, Error> {
    Self::ALL
      .iter()
      .copied()
      .find(|opcode| opcode.mnemonic().eq_ignore_ascii_case(mnemonic))
      .ok_or_else(|| Error::UnknownMnemonic(mnemonic.to_owned()))
  }
}

impl fmt::Display for Opcode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.mnemonic())
  }
}
