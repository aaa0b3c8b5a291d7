//! Instruction decoder for the LS-8.
//!
//! Each instruction is one opcode byte followed by zero, one, or two
//! operand bytes. The opcode byte is laid out `AABCDDDD`:
//! - `AA`: number of operand bytes (0–2)
//! - `B`: set when the instruction is handled by the ALU
//! - `C`: set when the instruction writes the PC directly
//! - `DDDD`: instruction index within the group
//!
//! The encoding keeps the ALU class and the non-ALU opcodes mutually
//! exclusive, so classifying by the `B` bit and then matching the full
//! byte decides every instruction exactly once per fetch.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Decoded LS-8 instruction.
///
/// Register operands are carried as raw indices; the register file
/// enforces the [0,7] contract when they are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== ALU ====================

    /// Add: R[a] := R[a] + R[b] (wrapping at 8 bits)
    Add { a: u8, b: u8 },

    /// Subtract: R[a] := R[a] - R[b] (wrapping at 8 bits)
    Sub { a: u8, b: u8 },

    /// Multiply: R[a] := R[a] * R[b] (wrapping at 8 bits)
    Mul { a: u8, b: u8 },

    /// Divide: R[a] := R[a] / R[b]; fatal if R[b] is zero
    Div { a: u8, b: u8 },

    /// Compare R[a] with R[b], setting exactly one flag bit
    Cmp { a: u8, b: u8 },

    // ==================== Data Movement ====================

    /// Load immediate: R[reg] := value
    Ldi { reg: u8, value: u8 },

    /// Print the decimal value of R[reg], followed by a newline
    Prn { reg: u8 },

    /// Push R[reg] onto the stack
    Push { reg: u8 },

    /// Pop the top of the stack into R[reg]
    Pop { reg: u8 },

    // ==================== Control Flow ====================

    /// Call: push the return address, then PC := R[reg]
    Call { reg: u8 },

    /// Return: PC := top of stack
    Ret,

    /// Unconditional jump: PC := R[reg]
    Jmp { reg: u8 },

    /// Jump if the equal flag is set
    Jeq { reg: u8 },

    /// Jump if the equal flag is clear
    Jne { reg: u8 },

    /// Halt execution
    Hlt,
}

impl Instruction {
    /// Total width of the instruction in bytes (opcode + operands).
    pub fn width(&self) -> u8 {
        operand_count(self.opcode()) + 1
    }

    /// The opcode byte for this instruction.
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::Add { .. } => Opcode::ADD,
            Instruction::Sub { .. } => Opcode::SUB,
            Instruction::Mul { .. } => Opcode::MUL,
            Instruction::Div { .. } => Opcode::DIV,
            Instruction::Cmp { .. } => Opcode::CMP,
            Instruction::Ldi { .. } => Opcode::LDI,
            Instruction::Prn { .. } => Opcode::PRN,
            Instruction::Push { .. } => Opcode::PUSH,
            Instruction::Pop { .. } => Opcode::POP,
            Instruction::Call { .. } => Opcode::CALL,
            Instruction::Ret => Opcode::RET,
            Instruction::Jmp { .. } => Opcode::JMP,
            Instruction::Jeq { .. } => Opcode::JEQ,
            Instruction::Jne { .. } => Opcode::JNE,
            Instruction::Hlt => Opcode::HLT,
        }
    }
}

/// Opcode byte values.
pub struct Opcode;

impl Opcode {
    pub const ADD: u8 = 0b1010_0000;
    pub const SUB: u8 = 0b1010_0001;
    pub const MUL: u8 = 0b1010_0010;
    pub const DIV: u8 = 0b1010_0011;
    pub const CMP: u8 = 0b1010_0111;
    pub const LDI: u8 = 0b1000_0010;
    pub const PRN: u8 = 0b0100_0111;
    pub const PUSH: u8 = 0b0100_0101;
    pub const POP: u8 = 0b0100_0110;
    pub const CALL: u8 = 0b0101_0000;
    pub const RET: u8 = 0b0001_0001;
    pub const JMP: u8 = 0b0101_0100;
    pub const JEQ: u8 = 0b0101_0101;
    pub const JNE: u8 = 0b0101_0110;
    pub const HLT: u8 = 0b0000_0001;
}

/// Number of operand bytes encoded in an opcode's top two bits.
#[inline]
pub const fn operand_count(opcode: u8) -> u8 {
    opcode >> 6
}

/// Does this opcode belong to the ALU class?
#[inline]
pub const fn is_alu(opcode: u8) -> bool {
    (opcode >> 5) & 1 == 1
}

/// Decode the three bytes at the program counter.
///
/// `window[0]` is the opcode; `window[1]` and `window[2]` are the
/// bytes that follow it in memory, whether or not the instruction
/// consumes them.
///
/// An ALU-class byte with no table entry is [`DecodeError::UnknownAluOpcode`]
/// (the classifier and the ALU table have diverged); any other unmatched
/// byte is [`DecodeError::UnknownOpcode`], which the execution engine
/// treats as a no-op that leaves the PC in place.
pub fn decode(window: [u8; 3]) -> Result<Instruction, DecodeError> {
    let raw = window[0];

    if is_alu(raw) {
        let (a, b) = (window[1], window[2]);
        return match raw {
            Opcode::ADD => Ok(Instruction::Add { a, b }),
            Opcode::SUB => Ok(Instruction::Sub { a, b }),
            Opcode::MUL => Ok(Instruction::Mul { a, b }),
            Opcode::DIV => Ok(Instruction::Div { a, b }),
            Opcode::CMP => Ok(Instruction::Cmp { a, b }),
            _ => Err(DecodeError::UnknownAluOpcode(raw)),
        };
    }

    match raw {
        Opcode::LDI => Ok(Instruction::Ldi { reg: window[1], value: window[2] }),
        Opcode::PRN => Ok(Instruction::Prn { reg: window[1] }),
        Opcode::PUSH => Ok(Instruction::Push { reg: window[1] }),
        Opcode::POP => Ok(Instruction::Pop { reg: window[1] }),
        Opcode::CALL => Ok(Instruction::Call { reg: window[1] }),
        Opcode::RET => Ok(Instruction::Ret),
        Opcode::JMP => Ok(Instruction::Jmp { reg: window[1] }),
        Opcode::JEQ => Ok(Instruction::Jeq { reg: window[1] }),
        Opcode::JNE => Ok(Instruction::Jne { reg: window[1] }),
        Opcode::HLT => Ok(Instruction::Hlt),
        _ => Err(DecodeError::UnknownOpcode(raw)),
    }
}

/// Encode an instruction back to its byte sequence.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    match *instr {
        Instruction::Add { a, b } => vec![Opcode::ADD, a, b],
        Instruction::Sub { a, b } => vec![Opcode::SUB, a, b],
        Instruction::Mul { a, b } => vec![Opcode::MUL, a, b],
        Instruction::Div { a, b } => vec![Opcode::DIV, a, b],
        Instruction::Cmp { a, b } => vec![Opcode::CMP, a, b],
        Instruction::Ldi { reg, value } => vec![Opcode::LDI, reg, value],
        Instruction::Prn { reg } => vec![Opcode::PRN, reg],
        Instruction::Push { reg } => vec![Opcode::PUSH, reg],
        Instruction::Pop { reg } => vec![Opcode::POP, reg],
        Instruction::Call { reg } => vec![Opcode::CALL, reg],
        Instruction::Ret => vec![Opcode::RET],
        Instruction::Jmp { reg } => vec![Opcode::JMP, reg],
        Instruction::Jeq { reg } => vec![Opcode::JEQ, reg],
        Instruction::Jne { reg } => vec![Opcode::JNE, reg],
        Instruction::Hlt => vec![Opcode::HLT],
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A byte outside the instruction set. The machine ignores these
    /// without advancing the PC.
    #[error("unknown opcode: {0:#010b}")]
    UnknownOpcode(u8),

    /// A byte carrying the ALU class bit with no ALU table entry.
    /// This is an internal contract violation, not a program error.
    #[error("unknown ALU opcode: {0:#010b}")]
    UnknownAluOpcode(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hlt() {
        let instr = decode([Opcode::HLT, 0, 0]).unwrap();
        assert_eq!(instr, Instruction::Hlt);
    }

    #[test]
    fn test_decode_ldi() {
        let instr = decode([Opcode::LDI, 0, 8]).unwrap();
        assert_eq!(instr, Instruction::Ldi { reg: 0, value: 8 });
    }

    #[test]
    fn test_decode_alu() {
        let instr = decode([Opcode::ADD, 0, 1]).unwrap();
        assert_eq!(instr, Instruction::Add { a: 0, b: 1 });

        let instr = decode([Opcode::CMP, 2, 3]).unwrap();
        assert_eq!(instr, Instruction::Cmp { a: 2, b: 3 });
    }

    #[test]
    fn test_unknown_opcode_classification() {
        // No ALU bit: plain unknown opcode
        assert_eq!(
            decode([0b0000_0000, 0, 0]),
            Err(DecodeError::UnknownOpcode(0b0000_0000))
        );

        // ALU bit set, no table entry: contract violation
        assert_eq!(
            decode([0b1010_0100, 0, 0]),
            Err(DecodeError::UnknownAluOpcode(0b1010_0100))
        );
    }

    #[test]
    fn test_operand_count_matches_widths() {
        assert_eq!(operand_count(Opcode::LDI), 2);
        assert_eq!(operand_count(Opcode::ADD), 2);
        assert_eq!(operand_count(Opcode::PRN), 1);
        assert_eq!(operand_count(Opcode::CALL), 1);
        assert_eq!(operand_count(Opcode::RET), 0);
        assert_eq!(operand_count(Opcode::HLT), 0);
    }

    #[test]
    fn test_alu_classification_bit() {
        for op in [Opcode::ADD, Opcode::SUB, Opcode::MUL, Opcode::DIV, Opcode::CMP] {
            assert!(is_alu(op), "{:#010b} should classify as ALU", op);
        }
        for op in [
            Opcode::LDI,
            Opcode::PRN,
            Opcode::PUSH,
            Opcode::POP,
            Opcode::CALL,
            Opcode::RET,
            Opcode::JMP,
            Opcode::JEQ,
            Opcode::JNE,
            Opcode::HLT,
        ] {
            assert!(!is_alu(op), "{:#010b} should not classify as ALU", op);
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let test_cases = [
            Instruction::Hlt,
            Instruction::Ret,
            Instruction::Ldi { reg: 2, value: 0xF4 },
            Instruction::Prn { reg: 5 },
            Instruction::Call { reg: 1 },
            Instruction::Cmp { a: 0, b: 7 },
        ];

        for instr in test_cases {
            let bytes = encode(&instr);
            assert_eq!(bytes.len() as u8, instr.width());

            let mut window = [0u8; 3];
            window[..bytes.len()].copy_from_slice(&bytes);
            assert_eq!(decode(window).unwrap(), instr);
        }
    }
}
