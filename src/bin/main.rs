use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};

use emulator::config::{parse_number, Config};
use emulator::driver::Driver;
use emulator::opcode::Opcode;
use emulator::region::{Chunk, Operand};
use emulator::register::Register;
use emulator::vm::Vm;

const USAGE: &str = "usage: vcpu [--config FILE] [--origin ADDR] [--max-steps N] [IMAGE]";

struct Args {
  config: Option<PathBuf>,
  origin: u16,
  max_steps: Option<u64>,
  image: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
  let mut args = Args {
    config: None,
    origin: 0,
    max_steps: None,
    image: None,
  };
  let mut iter = env::args().skip(1);
  while let Some(arg) = iter.next() {
    match arg.as_str() {
      "--config" => args.config = Some(iter.next().context(USAGE)?.into()),
      "--origin" => {
        let value = iter.next().context(USAGE)?;
        let origin = parse_number(&value).and_then(|n| u16::try_from(n).ok());
        args.origin = origin.with_context(|| format!("bad origin `{value}`"))?;
      }
      "--max-steps" => {
        let value = iter.next().context(USAGE)?;
        let steps = parse_number(&value).with_context(|| format!("bad step count `{value}`"))?;
        args.max_steps = Some(steps.into());
      }
      "-h" | "--help" => {
        println!("{USAGE}");
        std::process::exit(0);
      }
      _ if arg.starts_with('-') => bail!("unknown option `{arg}`\n{USAGE}"),
      _ => args.image = Some(arg.into()),
    }
  }
  Ok(args)
}

/// Three arguments and a call into a subroutine that pushes its own values
/// and clobbers r1 and r8 before returning.
fn demo() -> emulator::Result<Vec<Chunk>> {
  use Operand::*;

  let subroutine = 0x3000;

  let mut main = Chunk::at(0);
  main
    .emit(Opcode::PshLit, &[Lit(0x3333)])?
    .emit(Opcode::PshLit, &[Lit(0x2222)])?
    .emit(Opcode::PshLit, &[Lit(0x1111)])?
    .emit(Opcode::MovLitReg, &[Lit(0x1234), Reg(Register::R1)])?
    .emit(Opcode::MovLitReg, &[Lit(0x5678), Reg(Register::R4)])?
    .emit(Opcode::PshLit, &[Lit(3)])?
    .emit(Opcode::CalLit, &[Addr(subroutine)])?
    .emit(Opcode::PshLit, &[Lit(0x4444)])?
    .emit(Opcode::Hlt, &[])?;

  let mut sub = Chunk::at(subroutine);
  sub
    .emit(Opcode::PshLit, &[Lit(0x0102)])?
    .emit(Opcode::PshLit, &[Lit(0x0304)])?
    .emit(Opcode::PshLit, &[Lit(0x0506)])?
    .emit(Opcode::MovLitReg, &[Lit(0x0708), Reg(Register::R1)])?
    .emit(Opcode::MovLitReg, &[Lit(0x090A), Reg(Register::R8)])?
    .emit(Opcode::Ret, &[])?;

  Ok(vec![main, sub])
}

fn main() -> anyhow::Result<()> {
  env_logger::init();

  let args = parse_args()?;
  let config = Config::load(args.config.as_deref())?;
  let mut vm = Vm::new(&config)?;

  match &args.image {
    Some(path) => {
      let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
      let mut image = Chunk::at(args.origin);
      image.data(&bytes);
      vm.load(&image)?;
      vm.registers_mut().set(Register::Ip, args.origin);
    }
    None => {
      for chunk in demo()? {
        vm.load(&chunk)?;
      }
    }
  }

  let mut driver = Driver::new(vm);
  let halted = match args.max_steps {
    Some(limit) => driver.run_for(limit)?,
    None => {
      driver.run()?;
      true
    }
  };

  let vm = driver.vm();
  println!("{}", vm.registers());
  // the most recently pushed word sits just above sp
  let top = vm.register(Register::Sp).saturating_add(2);
  if (top as usize) < vm.memory().len() {
    let len = (vm.memory().len() - top as usize).min(32);
    println!("{}", vm.view_memory(top, len)?);
  }
  if !halted {
    println!("stopped after {} instruction(s) without halting", driver.steps());
  }
  Ok(())
}
