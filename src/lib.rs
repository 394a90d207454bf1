//! A small 16-bit virtual CPU
//!
//! Thirteen 16-bit registers, a flat byte-addressed memory, a downward
//! growing stack with saved call frames, and fifteen maskable interrupt
//! vectors. Images are produced elsewhere and copied in through a
//! [`region::Region`].

pub mod config;
pub mod driver;
pub mod error;
pub mod memory;
pub mod opcode;
pub mod region;
pub mod register;
pub mod vm;

pub use error::{Error, Result};
