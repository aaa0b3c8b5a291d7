//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction, DecodeError};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::Flags;
use serde::{Serialize, Deserialize};
use std::io::Write;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
}

/// The LS-8 CPU.
///
/// All machine state lives here: the register file, RAM, and the
/// run/halt state. PRN output goes to the writer passed to [`Cpu::step`]
/// or [`Cpu::run`], emitted in strict execution order.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub ram: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (for profiling).
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU at reset state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            ram: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.ram.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program image into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.ram.load_program(0, program)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. A byte that decodes
    /// to nothing returns `Ok(None)`: the cycle completes without
    /// touching the PC, so a malformed image wedges the machine on
    /// that cell rather than faulting. [`Cpu::run_limited`] is the
    /// escape hatch for hosts that need to bail out of a wedged image.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Option<Instruction>, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch the instruction register plus the two bytes that
        // follow it; decode looks at the same window exactly once.
        let pc = self.regs.pc;
        let window = [
            self.ram.read(pc),
            self.ram.read(pc.wrapping_add(1)),
            self.ram.read(pc.wrapping_add(2)),
        ];

        match decode::decode(window) {
            Ok(instr) => {
                self.execute(instr, out)?;
                self.cycles += 1;
                self.last_instr = Some(instr);
                Ok(Some(instr))
            }
            Err(DecodeError::UnknownOpcode(_)) => {
                // PC stays put.
                self.cycles += 1;
                Ok(None)
            }
            Err(err @ DecodeError::UnknownAluOpcode(_)) => Err(err.into()),
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed. An image that
    /// loops endlessly keeps this method from returning; that is the
    /// machine behaving as designed.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited<W: Write>(&mut self, max_cycles: u64, out: &mut W) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    ///
    /// Register values wrap at the 8-bit boundary; PC and SP
    /// arithmetic wraps mod 256, which keeps every address inside
    /// [0,255] by construction.
    fn execute<W: Write>(&mut self, instr: Instruction, out: &mut W) -> Result<(), CpuError> {
        match instr {
            // ==================== ALU ====================

            Instruction::Add { a, b } => {
                let result = self.regs.get(a).wrapping_add(self.regs.get(b));
                self.regs.set(a, result);
                self.regs.advance_pc(3);
            }

            Instruction::Sub { a, b } => {
                let result = self.regs.get(a).wrapping_sub(self.regs.get(b));
                self.regs.set(a, result);
                self.regs.advance_pc(3);
            }

            Instruction::Mul { a, b } => {
                let result = self.regs.get(a).wrapping_mul(self.regs.get(b));
                self.regs.set(a, result);
                self.regs.advance_pc(3);
            }

            Instruction::Div { a, b } => {
                let divisor = self.regs.get(b);
                if divisor == 0 {
                    // The dividend must stay untouched.
                    return Err(CpuError::DivisionByZero);
                }
                let result = self.regs.get(a) / divisor;
                self.regs.set(a, result);
                self.regs.advance_pc(3);
            }

            Instruction::Cmp { a, b } => {
                self.regs.flags = Flags::compare(self.regs.get(a), self.regs.get(b));
                self.regs.advance_pc(3);
            }

            // ==================== Data Movement ====================

            Instruction::Ldi { reg, value } => {
                self.regs.set(reg, value);
                self.regs.advance_pc(3);
            }

            Instruction::Prn { reg } => {
                let value = self.regs.get(reg);
                writeln!(out, "{}", value).map_err(|e| CpuError::Output(e.to_string()))?;
                self.regs.advance_pc(2);
            }

            Instruction::Push { reg } => {
                let sp = self.regs.sp().wrapping_sub(1);
                self.regs.set_sp(sp);
                self.ram.write(sp, self.regs.get(reg));
                self.regs.advance_pc(2);
            }

            Instruction::Pop { reg } => {
                let sp = self.regs.sp();
                let value = self.ram.read(sp);
                self.regs.set(reg, value);
                self.regs.set_sp(sp.wrapping_add(1));
                self.regs.advance_pc(2);
            }

            // ==================== Control Flow ====================

            Instruction::Call { reg } => {
                // Return address is the byte after the operand.
                let ret_addr = self.regs.pc.wrapping_add(2);
                let sp = self.regs.sp().wrapping_sub(1);
                self.regs.set_sp(sp);
                self.ram.write(sp, ret_addr);
                let target = self.regs.get(reg);
                self.regs.jump(target);
            }

            Instruction::Ret => {
                let sp = self.regs.sp();
                let ret_addr = self.ram.read(sp);
                self.regs.set_sp(sp.wrapping_add(1));
                self.regs.jump(ret_addr);
            }

            Instruction::Jmp { reg } => {
                let target = self.regs.get(reg);
                self.regs.jump(target);
            }

            Instruction::Jeq { reg } => {
                if self.regs.flags.is_equal() {
                    let target = self.regs.get(reg);
                    self.regs.jump(target);
                } else {
                    self.regs.advance_pc(2);
                }
            }

            Instruction::Jne { reg } => {
                if self.regs.flags.is_equal() {
                    self.regs.advance_pc(2);
                } else {
                    let target = self.regs.get(reg);
                    self.regs.jump(target);
                }
            }

            Instruction::Hlt => {
                // PC stays on the HLT opcode.
                self.state = CpuState::Halted;
            }
        }

        Ok(())
    }

    /// Render a one-line machine trace: PC, the three bytes at PC,
    /// and all eight registers, in hex.
    pub fn trace(&self) -> String {
        let pc = self.regs.pc;
        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            pc,
            self.ram.read(pc),
            self.ram.read(pc.wrapping_add(1)),
            self.ram.read(pc.wrapping_add(2)),
        );

        for i in 0..8 {
            line.push_str(&format!(" {:02X}", self.regs.get(i)));
        }

        line
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("division by zero")]
    DivisionByZero,

    #[error("output error: {0}")]
    Output(String),
}
