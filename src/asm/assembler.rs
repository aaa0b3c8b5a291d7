//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! LABEL:          ; Define a label
//!     LDI R0,8    ; Load an immediate into a register
//!     LDI R1,LABEL; Labels resolve to addresses (jumps go via registers)
//!     ADD R0,R1   ; Two-register ALU op
//!     PRN R0      ; Print a register
//!     HLT         ; Halt
//!
//!     DAT 42      ; Define a data byte
//! ```

use crate::cpu::decode::{Instruction, encode};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to program bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// An immediate operand: a literal byte or a label reference.
enum Imm {
    Value(u8),
    Label(String),
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Pending references (byte_index, label, source_line).
    pending: Vec<(usize, String, usize)>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve forward references
        self.resolve_references()?;

        Ok(self.output.clone())
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with(';') {
            return Ok(());
        }

        // Remove inline comments
        let line = if let Some(idx) = line.find(';') {
            line[..idx].trim()
        } else {
            line
        };

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !label.is_empty() {
                self.symbols.insert(label, self.output.len());
            }

            // Process rest of line if any
            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(());
        }

        let mnemonic = parts[0].to_uppercase();
        // Rejoin so "R0, 8" and "R0,8" parse the same way
        let joined = parts[1..].join("");
        let operands: Vec<&str> = joined
            .split(',')
            .filter(|s| !s.is_empty())
            .collect();

        match mnemonic.as_str() {
            // Directives
            "DAT" | "DATA" => {
                let value = self.expect_value(&operands, 0, &mnemonic, line_num)?;
                self.output.push(value);
            }

            // Two-register ALU ops
            "ADD" | "SUB" | "MUL" | "DIV" | "CMP" => {
                let a = self.expect_register(&operands, 0, &mnemonic, line_num)?;
                let b = self.expect_register(&operands, 1, &mnemonic, line_num)?;
                let instr = match mnemonic.as_str() {
                    "ADD" => Instruction::Add { a, b },
                    "SUB" => Instruction::Sub { a, b },
                    "MUL" => Instruction::Mul { a, b },
                    "DIV" => Instruction::Div { a, b },
                    "CMP" => Instruction::Cmp { a, b },
                    _ => unreachable!(),
                };
                self.emit(&instr);
            }

            // Register + immediate
            "LDI" => {
                let reg = self.expect_register(&operands, 0, &mnemonic, line_num)?;
                let imm = self.parse_immediate(
                    operands.get(1).copied().ok_or_else(|| AssemblerError::SyntaxError {
                        line: line_num,
                        message: "LDI requires a register and a value".into(),
                    })?,
                    line_num,
                )?;
                self.output.push(Instruction::Ldi { reg, value: 0 }.opcode());
                self.output.push(reg);
                match imm {
                    Imm::Value(v) => self.output.push(v),
                    Imm::Label(label) => {
                        self.pending.push((self.output.len(), label, line_num));
                        self.output.push(0); // Placeholder, resolved in pass 2
                    }
                }
            }

            // Single-register ops
            "PRN" | "PUSH" | "POP" | "CALL" | "JMP" | "JEQ" | "JNE" => {
                let reg = self.expect_register(&operands, 0, &mnemonic, line_num)?;
                let instr = match mnemonic.as_str() {
                    "PRN" => Instruction::Prn { reg },
                    "PUSH" => Instruction::Push { reg },
                    "POP" => Instruction::Pop { reg },
                    "CALL" => Instruction::Call { reg },
                    "JMP" => Instruction::Jmp { reg },
                    "JEQ" => Instruction::Jeq { reg },
                    "JNE" => Instruction::Jne { reg },
                    _ => unreachable!(),
                };
                self.emit(&instr);
            }

            // No operands
            "RET" => self.emit(&Instruction::Ret),
            "HLT" | "HALT" => self.emit(&Instruction::Hlt),

            _ => {
                return Err(AssemblerError::UnknownMnemonic {
                    line: line_num,
                    mnemonic,
                })
            }
        }

        Ok(())
    }

    fn emit(&mut self, instr: &Instruction) {
        self.output.extend(encode(instr));
    }

    fn expect_register(
        &self,
        operands: &[&str],
        index: usize,
        mnemonic: &str,
        line_num: usize,
    ) -> Result<u8, AssemblerError> {
        let token = operands.get(index).ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("{} is missing a register operand", mnemonic),
        })?;
        self.parse_register(token, line_num)
    }

    fn expect_value(
        &mut self,
        operands: &[&str],
        index: usize,
        mnemonic: &str,
        line_num: usize,
    ) -> Result<u8, AssemblerError> {
        let token = operands.get(index).ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("{} requires a value", mnemonic),
        })?;
        self.parse_value(token, line_num)
    }

    fn parse_register(&self, token: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let token = token.trim().to_uppercase();
        if let Some(digits) = token.strip_prefix('R') {
            if let Ok(index) = digits.parse::<u8>() {
                if index < 8 {
                    return Ok(index);
                }
            }
        }
        Err(AssemblerError::SyntaxError {
            line: line_num,
            message: format!("expected a register R0-R7, found {:?}", token),
        })
    }

    /// Parse a literal byte value: decimal, `0x` hex, or `0b` binary.
    /// Negatives down to -128 are accepted and wrap to their two's
    /// complement byte.
    fn parse_value(&mut self, token: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let token = token.trim();

        let parsed = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            i32::from_str_radix(hex, 16).ok()
        } else if let Some(bin) = token.strip_prefix("0b").or_else(|| token.strip_prefix("0B")) {
            i32::from_str_radix(bin, 2).ok()
        } else {
            token.parse::<i32>().ok()
        };

        match parsed {
            Some(value) if (-128..=255).contains(&value) => Ok(value as u8),
            Some(value) => Err(AssemblerError::ValueOutOfRange { line: line_num, value }),
            None => Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid value {:?}", token),
            }),
        }
    }

    /// Parse an immediate: a literal value or a label reference.
    fn parse_immediate(&mut self, token: &str, line_num: usize) -> Result<Imm, AssemblerError> {
        let token = token.trim();

        // Labels start with a letter; anything else must be a literal
        if token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && !token.starts_with("0x")
            && !token.starts_with("0X")
            && !token.starts_with("0b")
            && !token.starts_with("0B")
        {
            return Ok(Imm::Label(token.to_uppercase()));
        }

        self.parse_value(token, line_num).map(Imm::Value)
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (byte_idx, label, line_num) in &self.pending {
            let addr = self.symbols.get(label).ok_or_else(|| {
                AssemblerError::UndefinedLabel {
                    line: *line_num,
                    label: label.clone(),
                }
            })?;

            if *addr > 255 {
                return Err(AssemblerError::ValueOutOfRange {
                    line: *line_num,
                    value: *addr as i32,
                });
            }

            self.output[*byte_idx] = *addr as u8;
        }
        Ok(())
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i32 },
}
