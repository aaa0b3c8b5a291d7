//! CPU emulation for the LS-8 computer.
//!
//! This module implements the complete LS-8 architecture:
//! - 256 byte-sized memory cells
//! - 8 general-purpose registers, with R7 reserved as the stack pointer
//! - flags byte, program counter, and the fetch-decode-execute engine

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{Registers, Flags};
pub use decode::{Instruction, DecodeError};
pub use execute::{Cpu, CpuError, CpuState};
