use emulator::memory::Memory;
use emulator::opcode::Opcode;
use emulator::region::{Chunk, Operand::*};
use emulator::register::{Register, RegisterFile};
use emulator::vm::{Vm, VECTORS};
use proptest::prelude::*;

fn any_register() -> impl Strategy<Value = Register> {
  (0..Register::COUNT).prop_map(|i| Register::ALL[i])
}

fn installed_handler(handler: u16) -> Vm {
  let mut vm = Vm::default();
  let mut ivt = Chunk::at(vm.interrupt_vector_base());
  ivt.words(&[handler; VECTORS as usize]);
  vm.load(&ivt).unwrap();
  vm
}

proptest! {
  #[test]
  fn register_set_get(register in any_register(), value in any::<u16>()) {
    let mut file = RegisterFile::new();
    file.set(register, value);
    prop_assert_eq!(file.get(register), value);
  }

  #[test]
  fn word_matches_two_big_endian_bytes(address in 0usize..0xFFFF, value in any::<u16>()) {
    let mut by_word = Memory::new(0x10000);
    let mut by_byte = Memory::new(0x10000);
    by_word.write_word(address, value).unwrap();
    by_byte.write_byte(address, (value >> 8) as u8).unwrap();
    by_byte.write_byte(address + 1, value as u8).unwrap();
    prop_assert_eq!(by_word.read_word(address).unwrap(), value);
    prop_assert_eq!(
      by_word.window(address, 2).unwrap().bytes(),
      by_byte.window(address, 2).unwrap().bytes()
    );
  }

  #[test]
  fn push_pop_round_trip(value in any::<u16>(), depth in 0usize..64) {
    let mut vm = Vm::default();
    for i in 0..depth {
      vm.push(i as u16).unwrap();
    }
    let sp = vm.register(Register::Sp);
    vm.push(value).unwrap();
    prop_assert_eq!(vm.pop().unwrap(), value);
    prop_assert_eq!(vm.register(Register::Sp), sp);
  }

  #[test]
  fn call_preserves_caller_state(
    args in prop::collection::vec(any::<u16>(), 0..8),
    saved in prop::array::uniform8(any::<u16>()),
    clobber in prop::array::uniform8(any::<u16>())
  ) {
    let function = 0x2000;
    let mut program = Chunk::at(0);
    for &arg in &args {
      program.emit(Opcode::PshLit, &[Lit(arg)]).unwrap();
    }
    program
      .emit(Opcode::PshLit, &[Lit(args.len() as u16)]).unwrap()
      .emit(Opcode::CalLit, &[Addr(function)]).unwrap()
      .emit(Opcode::Hlt, &[]).unwrap();

    let mut callee = Chunk::at(function);
    for (register, value) in Register::GENERAL.into_iter().zip(clobber) {
      callee.emit(Opcode::MovLitReg, &[Lit(value), Reg(register)]).unwrap();
      callee.emit(Opcode::PshReg, &[Reg(register)]).unwrap();
    }
    callee.emit(Opcode::Ret, &[]).unwrap();

    let mut vm = Vm::default();
    vm.load(&program).unwrap();
    vm.load(&callee).unwrap();
    for (register, value) in Register::GENERAL.into_iter().zip(saved) {
      vm.registers_mut().set(register, value);
    }
    let sp = vm.register(Register::Sp);
    let fp = vm.register(Register::Fp);

    while !vm.step().unwrap() {}

    for (register, value) in Register::GENERAL.into_iter().zip(saved) {
      prop_assert_eq!(vm.register(register), value);
    }
    prop_assert_eq!(vm.register(Register::Sp), sp);
    prop_assert_eq!(vm.register(Register::Fp), fp);
    prop_assert_eq!(vm.register(Register::Ip), program.len() as u16);
  }

  #[test]
  fn masked_interrupt_changes_nothing(value in any::<u16>(), ip in any::<u16>()) {
    let mut vm = installed_handler(0x3000);
    let vector = value % VECTORS;
    vm.registers_mut().set(Register::Im, !(1u16 << vector));
    vm.registers_mut().set(Register::Ip, ip);
    let before = vm.registers().clone();
    vm.trigger_interrupt(value).unwrap();
    prop_assert_eq!(vm.registers(), &before);
    prop_assert!(!vm.in_interrupt_handler());
  }

  #[test]
  fn interrupt_round_trip(
    value in any::<u16>(),
    ip in 0u16..0x0F00,
    general in prop::array::uniform8(any::<u16>())
  ) {
    let mut vm = installed_handler(0x3000);
    let mut handler = Chunk::at(0x3000);
    for register in Register::GENERAL {
      handler.emit(Opcode::MovLitReg, &[Lit(0xDEAD), Reg(register)]).unwrap();
    }
    handler.emit(Opcode::RetInt, &[]).unwrap();
    vm.load(&handler).unwrap();

    vm.registers_mut().set(Register::Ip, ip);
    for (register, value) in Register::GENERAL.into_iter().zip(general) {
      vm.registers_mut().set(register, value);
    }
    let sp = vm.register(Register::Sp);

    vm.trigger_interrupt(value).unwrap();
    prop_assert_eq!(vm.register(Register::Ip), 0x3000);
    for _ in 0..=Register::GENERAL.len() {
      vm.step().unwrap();
    }

    prop_assert_eq!(vm.register(Register::Ip), ip);
    prop_assert_eq!(vm.register(Register::Sp), sp);
    for (register, value) in Register::GENERAL.into_iter().zip(general) {
      prop_assert_eq!(vm.register(register), value);
    }
    prop_assert!(!vm.in_interrupt_handler());
  }
}
