//! Continuous execution.
//!
//! A [`Driver`] owns a [`Vm`] and alternates between executing one
//! instruction and giving attached [`Device`]s a chance to raise
//! interrupts. Interrupts are only ever delivered between instructions.

use std::collections::VecDeque;

use log::{debug, info};

use crate::error::Result;
use crate::vm::Vm;

/// Something outside the CPU that may want its attention
pub trait Device {
  fn name(&self) -> &str;

  /// Called once after every executed instruction; a returned value is
  /// delivered as an interrupt before the next one
  fn tick(&mut self, vm: &Vm) -> Option<u16>;
}

/// Raises the same interrupt every `period` instructions
#[derive(Debug, Clone)]
pub struct Timer {
  period: u64,
  value: u16,
  elapsed: u64,
}

impl Timer {
  pub fn new(period: u64, value: u16) -> Self {
    Self {
      period: period.max(1),
      value,
      elapsed: 0,
    }
  }
}

impl Device for Timer {
  fn name(&self) -> &str {
    "timer"
  }

  fn tick(&mut self, _vm: &Vm) -> Option<u16> {
    self.elapsed += 1;
    if self.elapsed < self.period {
      return None;
    }
    self.elapsed = 0;
    Some(self.value)
  }
}

pub struct Driver {
  vm: Vm,
  devices: Vec<Box<dyn Device>>,
  pending: VecDeque<u16>,
  steps: u64,
}

impl Driver {
  pub fn new(vm: Vm) -> Self {
    Self {
      vm,
      devices: Vec::new(),
      pending: VecDeque::new(),
      steps: 0,
    }
  }

  pub fn attach<D>(&mut self, device: D) -> &mut Self
  where
    D: Device + 'static,
  {
    debug!("attached device `{}`", device.name());
    self.devices.push(Box::new(device));
    self
  }

  /// Queue an interrupt for delivery before the next instruction
  pub fn raise(&mut self, value: u16) {
    self.pending.push_back(value);
  }

  /// Deliver whatever is pending, then execute one instruction and poll
  /// the devices. Returns whether the machine halted.
  ///
  /// An interrupt whose delivery faults stays at the front of the queue.
  pub fn step(&mut self) -> Result<bool> {
    while let Some(&value) = self.pending.front() {
      self.vm.trigger_interrupt(value)?;
      self.pending.pop_front();
    }

    let halted = self.vm.step()?;
    self.steps += 1;

    for device in &mut self.devices {
      if let Some(value) = device.tick(&self.vm) {
        debug!("device `{}` raised {value:#06x}", device.name());
        self.pending.push_back(value);
      }
    }
    Ok(halted)
  }

  /// Run until the machine halts, returning the number of instructions
  /// executed by this call
  pub fn run(&mut self) -> Result<u64> {
    let start = self.steps;
    while !self.step()? {}
    info!("halted after {} instruction(s)", self.steps - start);
    Ok(self.steps - start)
  }

  /// Run at most `limit` instructions, returning whether the machine halted
  pub fn run_for(&mut self, limit: u64) -> Result<bool> {
    let start = self.steps;
    for _ in 0..limit {
      if self.step()? {
        info!("halted after {} instruction(s)", self.steps - start);
        return Ok(true);
      }
    }
    Ok(false)
  }

  /// Interrupts raised but not yet delivered
  pub fn pending(&self) -> usize {
    self.pending.len()
  }

  /// Total instructions executed so far
  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn vm(&self) -> &Vm {
    &self.vm
  }

  pub fn vm_mut(&mut self) -> &mut Vm {
    &mut self.vm
  }

  pub fn into_vm(self) -> Vm {
    self.vm
  }
}
