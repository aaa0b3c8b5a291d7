//! Disassembler for LS-8 programs.
//!
//! Converts program bytes back to readable assembly.

use crate::cpu::decode::{decode, Instruction};

/// Disassemble the instruction at the start of a 3-byte window.
pub fn disassemble_instruction(window: [u8; 3]) -> String {
    match decode(window) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!("??? ; {:#010b}", window[0]),
    }
}

/// Disassemble a program image to a listing.
///
/// Walks the bytes using each opcode's encoded width; a byte that
/// decodes to nothing is listed as `???` and skipped one cell at a
/// time, since nothing says where the next instruction starts.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut addr = 0;
    while addr < bytes.len() {
        let window = [
            bytes[addr],
            bytes.get(addr + 1).copied().unwrap_or(0),
            bytes.get(addr + 2).copied().unwrap_or(0),
        ];

        match decode(window) {
            Ok(instr) => {
                let width = instr.width() as usize;
                let raw: Vec<String> = bytes[addr..(addr + width).min(bytes.len())]
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect();
                output.push_str(&format!(
                    "{:02X}: {:<10} ; {}\n",
                    addr,
                    format_instruction(&instr),
                    raw.join(" ")
                ));
                addr += width;
            }
            Err(_) => {
                output.push_str(&format!("{:02X}: {:<10} ; {:02X}\n", addr, "???", bytes[addr]));
                addr += 1;
            }
        }
    }

    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction) -> String {
    match instr {
        // ALU
        Instruction::Add { a, b } => format!("ADD R{},R{}", a, b),
        Instruction::Sub { a, b } => format!("SUB R{},R{}", a, b),
        Instruction::Mul { a, b } => format!("MUL R{},R{}", a, b),
        Instruction::Div { a, b } => format!("DIV R{},R{}", a, b),
        Instruction::Cmp { a, b } => format!("CMP R{},R{}", a, b),

        // Data movement
        Instruction::Ldi { reg, value } => format!("LDI R{},{}", reg, value),
        Instruction::Prn { reg } => format!("PRN R{}", reg),
        Instruction::Push { reg } => format!("PUSH R{}", reg),
        Instruction::Pop { reg } => format!("POP R{}", reg),

        // Control
        Instruction::Call { reg } => format!("CALL R{}", reg),
        Instruction::Ret => "RET".to_string(),
        Instruction::Jmp { reg } => format!("JMP R{}", reg),
        Instruction::Jeq { reg } => format!("JEQ R{}", reg),
        Instruction::Jne { reg } => format!("JNE R{}", reg),
        Instruction::Hlt => "HLT".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assembler::assemble;

    #[test]
    fn test_disassemble_instruction() {
        assert_eq!(
            disassemble_instruction([0b1000_0010, 0, 8]),
            "LDI R0,8"
        );
        assert_eq!(disassemble_instruction([0b0000_0001, 0, 0]), "HLT");
    }

    #[test]
    fn test_disassemble_roundtrip_through_assembler() {
        let source = "LDI R0,8\nLDI R1,9\nADD R0,R1\nPRN R0\nHLT\n";
        let bytes = assemble(source).unwrap();
        let listing = disassemble(&bytes);

        assert!(listing.contains("LDI R0,8"));
        assert!(listing.contains("ADD R0,R1"));
        assert!(listing.contains("PRN R0"));
        assert!(listing.contains("HLT"));
    }

    #[test]
    fn test_disassemble_unknown_byte() {
        let listing = disassemble(&[0xFF]);
        assert!(listing.contains("???"));
    }
}
