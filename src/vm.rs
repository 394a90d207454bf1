use log::{debug, info, trace};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::memory::{Memory, MemoryWindow};
use crate::opcode::Opcode;
use crate::region::Region;
use crate::register::{Register, RegisterFile};

/// Number of interrupt vectors; an interrupt value selects `value % VECTORS`
pub const VECTORS: u16 = 0xF;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
  Active,
  Halted,
}

/// The virtual CPU: a register file, main memory and the bookkeeping for
/// call frames and interrupts.
///
/// Frames saved by a call or an interrupt look like this, highest address
/// first, each slot a big-endian word:
///
/// ```text
///   args...        pushed by the caller
///   arg count      pushed by the caller (0 for interrupts)
///   r1 .. r8
///   ip             return address
///   frame size     bytes pushed since the previous frame, plus 2
///                  <- fp, sp
/// ```
#[derive(Debug, Clone)]
pub struct Vm {
  memory: Memory,
  registers: RegisterFile,
  interrupt_vector_base: u16,
  in_interrupt_handler: bool,
  // bytes pushed since the current frame was entered
  stack_frame_size: u16,
  state: State,
}

impl Vm {
  /// Create a machine with zeroed memory as described by `config`
  pub fn new(config: &Config) -> Result<Self> {
    config.validate()?;
    Ok(Self::build(config))
  }

  fn build(config: &Config) -> Self {
    let mut registers = RegisterFile::new();
    registers.set(Register::Sp, config.stack_start);
    registers.set(Register::Fp, config.stack_start);
    registers.set(Register::Im, config.interrupt_mask);
    Self {
      memory: Memory::new(config.memory_size),
      registers,
      interrupt_vector_base: config.interrupt_vector_base,
      in_interrupt_handler: false,
      stack_frame_size: 0,
      state: State::Active,
    }
  }

  /// Copy a program image into memory at its origin
  pub fn load<R>(&mut self, region: &R) -> Result<()>
  where
    R: Region,
  {
    self.memory.load(region.origin() as usize, region.bytes())?;
    debug!(
      "loaded {} bytes at {:#06x}",
      region.bytes().len(),
      region.origin()
    );
    Ok(())
  }

  /// Fetch and execute a single instruction, returning whether it halted
  pub fn step(&mut self) -> Result<bool> {
    if self.state == State::Halted {
      return Err(Error::MachineHalted);
    }
    let opcode = self.fetch()?;
    self.execute(opcode)
  }

  /// Execute `opcode` as if it had just been fetched, decoding its operands
  /// from `ip` onwards
  pub fn execute(&mut self, opcode: u8) -> Result<bool> {
    let address = self.registers.get(Register::Ip).wrapping_sub(1);
    let op = Opcode::from_byte(opcode).ok_or(Error::IllegalInstruction { opcode, address })?;
    trace!("{address:04x}: {op}");
    match op {
      Opcode::MovLitReg => mov_lit_reg(self)?,
      Opcode::MovRegReg => mov_reg_reg(self)?,
      Opcode::MovRegMem => mov_reg_mem(self)?,
      Opcode::MovMemReg => mov_mem_reg(self)?,
      Opcode::MovLitMem => mov_lit_mem(self)?,
      Opcode::MovRegPtrReg => mov_reg_ptr_reg(self)?,
      Opcode::MovLitOffReg => mov_lit_off_reg(self)?,
      Opcode::AddRegReg => reg_reg(self, u16::wrapping_add)?,
      Opcode::AddLitReg => lit_reg(self, u16::wrapping_add)?,
      Opcode::SubLitReg => lit_reg(self, |lit, reg| reg.wrapping_sub(lit))?,
      Opcode::SubRegLit => reg_lit(self, |reg, lit| lit.wrapping_sub(reg))?,
      Opcode::SubRegReg => reg_reg(self, u16::wrapping_sub)?,
      Opcode::MulLitReg => lit_reg(self, u16::wrapping_mul)?,
      Opcode::MulRegReg => reg_reg(self, u16::wrapping_mul)?,
      Opcode::IncReg => in_place(self, |value| value.wrapping_add(1))?,
      Opcode::DecReg => in_place(self, |value| value.wrapping_sub(1))?,
      Opcode::LsfRegLit => shift_lit(self, shift_left)?,
      Opcode::LsfRegReg => shift_reg(self, shift_left)?,
      Opcode::RsfRegLit => shift_lit(self, shift_right)?,
      Opcode::RsfRegReg => shift_reg(self, shift_right)?,
      Opcode::AndRegLit => reg_lit(self, |reg, lit| reg & lit)?,
      Opcode::AndRegReg => reg_reg(self, |a, b| a & b)?,
      Opcode::OrRegLit => reg_lit(self, |reg, lit| reg | lit)?,
      Opcode::OrRegReg => reg_reg(self, |a, b| a | b)?,
      Opcode::XorRegLit => reg_lit(self, |reg, lit| reg ^ lit)?,
      Opcode::XorRegReg => reg_reg(self, |a, b| a ^ b)?,
      Opcode::Not => not(self)?,
      Opcode::JmpNotEq => jump_lit(self, Condition::NotEqual)?,
      Opcode::JneReg => jump_reg(self, Condition::NotEqual)?,
      Opcode::JeqLit => jump_lit(self, Condition::Equal)?,
      Opcode::JeqReg => jump_reg(self, Condition::Equal)?,
      Opcode::JltLit => jump_lit(self, Condition::Less)?,
      Opcode::JltReg => jump_reg(self, Condition::Less)?,
      Opcode::JgtLit => jump_lit(self, Condition::Greater)?,
      Opcode::JgtReg => jump_reg(self, Condition::Greater)?,
      Opcode::JleLit => jump_lit(self, Condition::LessOrEqual)?,
      Opcode::JleReg => jump_reg(self, Condition::LessOrEqual)?,
      Opcode::JgeLit => jump_lit(self, Condition::GreaterOrEqual)?,
      Opcode::JgeReg => jump_reg(self, Condition::GreaterOrEqual)?,
      Opcode::PshLit => psh_lit(self)?,
      Opcode::PshReg => psh_reg(self)?,
      Opcode::Pop => pop(self)?,
      Opcode::CalLit => cal_lit(self)?,
      Opcode::CalReg => cal_reg(self)?,
      Opcode::Ret => ret(self)?,
      Opcode::RetInt => ret_int(self)?,
      Opcode::Int => int(self)?,
      Opcode::Hlt => {
        info!("halted at {address:#06x}");
        self.state = State::Halted;
        return Ok(true);
      }
    }
    Ok(false)
  }

  /// Deliver interrupt `value`. Masked vectors are dropped without touching
  /// any state. A halted machine is woken by a delivered interrupt.
  pub fn trigger_interrupt(&mut self, value: u16) -> Result<()> {
    let vector = value % VECTORS;
    if self.registers.get(Register::Im) & (1 << vector) == 0 {
      debug!("interrupt {value:#06x} masked (vector {vector})");
      return Ok(());
    }

    let pointer = self.interrupt_vector_base as usize + vector as usize * 2;
    let handler = self.memory.read_word(pointer)?;

    // nested interrupts only redirect, the outermost frame is the one
    // RET_INT returns to
    if !self.in_interrupt_handler {
      self.push(0)?;
      self.push_state()?;
    }
    self.in_interrupt_handler = true;
    self.registers.set(Register::Ip, handler);
    debug!("interrupt {value:#06x} (vector {vector}) -> {handler:#06x}");

    if self.state == State::Halted {
      info!("woken by interrupt {value:#06x}");
      self.state = State::Active;
    }
    Ok(())
  }

  /// `m[sp] ← value; sp ← sp − 2`
  pub fn push(&mut self, value: u16) -> Result<()> {
    let sp = self.registers.get(Register::Sp);
    self.memory.write_word(sp as usize, value)?;
    self.registers.set(Register::Sp, sp.wrapping_sub(2));
    self.stack_frame_size = self.stack_frame_size.wrapping_add(2);
    Ok(())
  }

  /// `sp ← sp + 2; m[sp]`
  pub fn pop(&mut self) -> Result<u16> {
    let sp = self.registers.get(Register::Sp).wrapping_add(2);
    let value = self.memory.read_word(sp as usize)?;
    self.registers.set(Register::Sp, sp);
    self.stack_frame_size = self.stack_frame_size.wrapping_sub(2);
    Ok(value)
  }

  fn push_state(&mut self) -> Result<()> {
    for register in Register::GENERAL {
      self.push(self.registers.get(register))?;
    }
    self.push(self.registers.get(Register::Ip))?;
    // +2 for the slot holding this very count
    self.push(self.stack_frame_size.wrapping_add(2))?;

    let sp = self.registers.get(Register::Sp);
    self.registers.set(Register::Fp, sp);
    self.stack_frame_size = 0;
    debug!("frame pushed, fp = {sp:#06x}");
    Ok(())
  }

  fn pop_state(&mut self) -> Result<()> {
    let frame_pointer = self.registers.get(Register::Fp);
    self.registers.set(Register::Sp, frame_pointer);

    let frame_size = self.pop()?;
    // resume counting for the caller's frame, minus the word just popped
    self.stack_frame_size = frame_size.wrapping_sub(2);

    let ip = self.pop()?;
    self.registers.set(Register::Ip, ip);
    for register in Register::GENERAL.into_iter().rev() {
      let value = self.pop()?;
      self.registers.set(register, value);
    }

    let arguments = self.pop()?;
    for _ in 0..arguments {
      self.pop()?;
    }

    let fp = frame_pointer.wrapping_add(frame_size);
    self.registers.set(Register::Fp, fp);
    debug!("frame popped, returning to {ip:#06x} with {arguments} argument(s), fp = {fp:#06x}");
    Ok(())
  }

  fn fetch(&mut self) -> Result<u8> {
    let ip = self.registers.get(Register::Ip);
    let byte = self.memory.read_byte(ip as usize)?;
    self.registers.set(Register::Ip, ip.wrapping_add(1));
    Ok(byte)
  }

  fn fetch16(&mut self) -> Result<u16> {
    let ip = self.registers.get(Register::Ip);
    let word = self.memory.read_word(ip as usize)?;
    self.registers.set(Register::Ip, ip.wrapping_add(2));
    Ok(word)
  }

  fn fetch_register(&mut self) -> Result<Register> {
    Ok(Register::from_operand(self.fetch()?))
  }

  pub fn is_halted(&self) -> bool {
    self.state == State::Halted
  }

  pub fn in_interrupt_handler(&self) -> bool {
    self.in_interrupt_handler
  }

  pub fn stack_frame_size(&self) -> u16 {
    self.stack_frame_size
  }

  pub fn interrupt_vector_base(&self) -> u16 {
    self.interrupt_vector_base
  }

  /// Shorthand for `registers().get(register)`
  pub fn register(&self, register: Register) -> u16 {
    self.registers.get(register)
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }

  pub fn registers_mut(&mut self) -> &mut RegisterFile {
    &mut self.registers
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut Memory {
    &mut self.memory
  }

  /// `n` bytes of memory starting at `address`, for dumping
  pub fn view_memory(&self, address: u16, n: usize) -> Result<MemoryWindow<'_>> {
    self.memory.window(address as usize, n)
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::build(&Config::default())
  }
}

#[derive(Debug, Clone, Copy)]
enum Condition {
  NotEqual,
  Equal,
  Less,
  Greater,
  LessOrEqual,
  GreaterOrEqual,
}

impl Condition {
  fn holds(self, value: u16, acc: u16) -> bool {
    match self {
      Condition::NotEqual => value != acc,
      Condition::Equal => value == acc,
      Condition::Less => value < acc,
      Condition::Greater => value > acc,
      Condition::LessOrEqual => value <= acc,
      Condition::GreaterOrEqual => value >= acc,
    }
  }
}

fn shift_left(value: u16, amount: u16) -> u16 {
  (value as u32).checked_shl(amount as u32).map_or(0, |v| v as u16)
}

fn shift_right(value: u16, amount: u16) -> u16 {
  (value as u32).checked_shr(amount as u32).map_or(0, |v| v as u16)
}

// r[d] ← vvvv
fn mov_lit_reg(vm: &mut Vm) -> Result<()> {
  let literal = vm.fetch16()?;
  let d = vm.fetch_register()?;
  vm.registers.set(d, literal);
  Ok(())
}

// r[d] ← r[s]
fn mov_reg_reg(vm: &mut Vm) -> Result<()> {
  let s = vm.fetch_register()?;
  let d = vm.fetch_register()?;
  vm.registers.set(d, vm.registers.get(s));
  Ok(())
}

// m[aaaa] ← r[s]
fn mov_reg_mem(vm: &mut Vm) -> Result<()> {
  let s = vm.fetch_register()?;
  let address = vm.fetch16()?;
  vm.memory.write_word(address as usize, vm.registers.get(s))?;
  Ok(())
}

// r[d] ← m[aaaa]
fn mov_mem_reg(vm: &mut Vm) -> Result<()> {
  let address = vm.fetch16()?;
  let d = vm.fetch_register()?;
  let value = vm.memory.read_word(address as usize)?;
  vm.registers.set(d, value);
  Ok(())
}

// m[aaaa] ← vvvv
fn mov_lit_mem(vm: &mut Vm) -> Result<()> {
  let value = vm.fetch16()?;
  let address = vm.fetch16()?;
  vm.memory.write_word(address as usize, value)
}

// r[d] ← m[r[s]]
fn mov_reg_ptr_reg(vm: &mut Vm) -> Result<()> {
  let s = vm.fetch_register()?;
  let d = vm.fetch_register()?;
  let pointer = vm.registers.get(s);
  let value = vm.memory.read_word(pointer as usize)?;
  vm.registers.set(d, value);
  Ok(())
}

// r[d] ← m[aaaa + r[i]], the sum does not wrap
fn mov_lit_off_reg(vm: &mut Vm) -> Result<()> {
  let base = vm.fetch16()?;
  let i = vm.fetch_register()?;
  let d = vm.fetch_register()?;
  let address = base as usize + vm.registers.get(i) as usize;
  let value = vm.memory.read_word(address)?;
  vm.registers.set(d, value);
  Ok(())
}

// acc ← r[a] ∘ r[b]
fn reg_reg(vm: &mut Vm, op: impl FnOnce(u16, u16) -> u16) -> Result<()> {
  let a = vm.fetch_register()?;
  let b = vm.fetch_register()?;
  let result = op(vm.registers.get(a), vm.registers.get(b));
  vm.registers.set(Register::Acc, result);
  Ok(())
}

// acc ← vvvv ∘ r[s]
fn lit_reg(vm: &mut Vm, op: impl FnOnce(u16, u16) -> u16) -> Result<()> {
  let literal = vm.fetch16()?;
  let s = vm.fetch_register()?;
  let result = op(literal, vm.registers.get(s));
  vm.registers.set(Register::Acc, result);
  Ok(())
}

// acc ← r[s] ∘ vvvv
fn reg_lit(vm: &mut Vm, op: impl FnOnce(u16, u16) -> u16) -> Result<()> {
  let s = vm.fetch_register()?;
  let literal = vm.fetch16()?;
  let result = op(vm.registers.get(s), literal);
  vm.registers.set(Register::Acc, result);
  Ok(())
}

// r[d] ← f(r[d])
fn in_place(vm: &mut Vm, op: impl FnOnce(u16) -> u16) -> Result<()> {
  let d = vm.fetch_register()?;
  vm.registers.set(d, op(vm.registers.get(d)));
  Ok(())
}

// r[d] ← r[d] ⋘ vv
fn shift_lit(vm: &mut Vm, op: fn(u16, u16) -> u16) -> Result<()> {
  let d = vm.fetch_register()?;
  let amount = vm.fetch()?;
  vm.registers.set(d, op(vm.registers.get(d), amount as u16));
  Ok(())
}

// r[d] ← r[d] ⋘ r[s]
fn shift_reg(vm: &mut Vm, op: fn(u16, u16) -> u16) -> Result<()> {
  let d = vm.fetch_register()?;
  let s = vm.fetch_register()?;
  vm.registers.set(d, op(vm.registers.get(d), vm.registers.get(s)));
  Ok(())
}

// acc ← ~r[s]
fn not(vm: &mut Vm) -> Result<()> {
  let s = vm.fetch_register()?;
  vm.registers.set(Register::Acc, !vm.registers.get(s));
  Ok(())
}

// if vvvv ? acc : ip ← aaaa
fn jump_lit(vm: &mut Vm, condition: Condition) -> Result<()> {
  let value = vm.fetch16()?;
  let target = vm.fetch16()?;
  if condition.holds(value, vm.registers.get(Register::Acc)) {
    vm.registers.set(Register::Ip, target);
  }
  Ok(())
}

// if r[s] ? acc : ip ← aaaa
fn jump_reg(vm: &mut Vm, condition: Condition) -> Result<()> {
  let s = vm.fetch_register()?;
  let value = vm.registers.get(s);
  let target = vm.fetch16()?;
  if condition.holds(value, vm.registers.get(Register::Acc)) {
    vm.registers.set(Register::Ip, target);
  }
  Ok(())
}

fn psh_lit(vm: &mut Vm) -> Result<()> {
  let value = vm.fetch16()?;
  vm.push(value)
}

fn psh_reg(vm: &mut Vm) -> Result<()> {
  let s = vm.fetch_register()?;
  vm.push(vm.registers.get(s))
}

fn pop(vm: &mut Vm) -> Result<()> {
  let d = vm.fetch_register()?;
  let value = vm.pop()?;
  vm.registers.set(d, value);
  Ok(())
}

// push frame; ip ← aaaa
fn cal_lit(vm: &mut Vm) -> Result<()> {
  let target = vm.fetch16()?;
  vm.push_state()?;
  vm.registers.set(Register::Ip, target);
  Ok(())
}

// push frame; ip ← r[s]
fn cal_reg(vm: &mut Vm) -> Result<()> {
  let s = vm.fetch_register()?;
  let target = vm.registers.get(s);
  vm.push_state()?;
  vm.registers.set(Register::Ip, target);
  Ok(())
}

fn ret(vm: &mut Vm) -> Result<()> {
  vm.pop_state()
}

fn ret_int(vm: &mut Vm) -> Result<()> {
  vm.in_interrupt_handler = false;
  vm.pop_state()
}

fn int(vm: &mut Vm) -> Result<()> {
  let value = vm.fetch16()?;
  vm.trigger_interrupt(value)
}
