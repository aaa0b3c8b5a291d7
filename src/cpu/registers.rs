//! LS-8 CPU registers.
//!
//! The register file holds:
//! - R0–R6: general-purpose 8-bit registers
//! - R7: the stack pointer, reset to 0xF4 (top of the downward stack)
//! - PC: 8-bit program counter
//! - FL: flags byte set by CMP, read by the conditional jumps

use serde::{Serialize, Deserialize};

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// Index of the stack pointer within the register file.
pub const SP: u8 = 7;

/// Reset value of the stack pointer.
pub const STACK_TOP: u8 = 0xF4;

/// The flags byte.
///
/// CMP fully overwrites the previous value with exactly one of the
/// three condition bits; they are never combined.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags(u8);

impl Flags {
    /// Bit set when the compared registers were equal.
    pub const EQUAL: u8 = 0b0000_0001;
    /// Bit set when register A was greater than register B.
    pub const GREATER: u8 = 0b0000_0010;
    /// Bit set when register A was less than register B.
    pub const LESS: u8 = 0b0000_0100;

    /// Create a cleared flags byte.
    pub const fn clear() -> Self {
        Flags(0)
    }

    /// Compute the flags for a CMP of two register values.
    pub fn compare(a: u8, b: u8) -> Self {
        use std::cmp::Ordering;
        match a.cmp(&b) {
            Ordering::Equal => Flags(Self::EQUAL),
            Ordering::Greater => Flags(Self::GREATER),
            Ordering::Less => Flags(Self::LESS),
        }
    }

    /// Is the equal bit set?
    pub fn is_equal(&self) -> bool {
        self.0 & Self::EQUAL != 0
    }

    /// Is the greater-than bit set?
    pub fn is_greater(&self) -> bool {
        self.0 & Self::GREATER != 0
    }

    /// Is the less-than bit set?
    pub fn is_less(&self) -> bool {
        self.0 & Self::LESS != 0
    }

    /// The raw flags byte.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Debug for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.is_equal() {
            "E"
        } else if self.is_greater() {
            "G"
        } else if self.is_less() {
            "L"
        } else {
            "-"
        };
        write!(f, "FL={} ({:#010b})", name, self.0)
    }
}

/// The LS-8 register file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registers {
    /// R0–R7 general-purpose registers. R7 is the stack pointer.
    regs: [u8; NUM_REGISTERS],

    /// PC: 8-bit program counter.
    pub pc: u8,

    /// FL: flags byte.
    pub flags: Flags,
}

impl Registers {
    /// Create a new register file at reset values.
    pub fn new() -> Self {
        let mut regs = [0; NUM_REGISTERS];
        regs[SP as usize] = STACK_TOP;
        Self {
            regs,
            pc: 0,
            flags: Flags::clear(),
        }
    }

    /// Reset all registers to their power-on values.
    pub fn reset(&mut self) {
        self.regs = [0; NUM_REGISTERS];
        self.regs[SP as usize] = STACK_TOP;
        self.pc = 0;
        self.flags = Flags::clear();
    }

    /// Read a general-purpose register.
    ///
    /// # Panics
    /// Panics if the index is outside [0,7]. A loaded image that names
    /// a register outside the file violates its programming contract;
    /// there is nothing to recover to.
    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        assert!(
            (index as usize) < NUM_REGISTERS,
            "register index {} out of range (0-{})",
            index,
            NUM_REGISTERS - 1
        );
        self.regs[index as usize]
    }

    /// Write a general-purpose register.
    ///
    /// # Panics
    /// Panics if the index is outside [0,7].
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) {
        assert!(
            (index as usize) < NUM_REGISTERS,
            "register index {} out of range (0-{})",
            index,
            NUM_REGISTERS - 1
        );
        self.regs[index as usize] = value;
    }

    /// The stack pointer (register 7).
    #[inline]
    pub fn sp(&self) -> u8 {
        self.regs[SP as usize]
    }

    /// Set the stack pointer (register 7).
    #[inline]
    pub fn set_sp(&mut self, value: u8) {
        self.regs[SP as usize] = value;
    }

    /// Advance the program counter by `n` bytes, wrapping mod 256.
    pub fn advance_pc(&mut self, n: u8) {
        self.pc = self.pc.wrapping_add(n);
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u8) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_values() {
        let regs = Registers::new();

        for i in 0..7 {
            assert_eq!(regs.get(i), 0);
        }
        assert_eq!(regs.sp(), STACK_TOP);
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.flags, Flags::clear());
    }

    #[test]
    fn test_get_set() {
        let mut regs = Registers::new();

        regs.set(3, 99);
        assert_eq!(regs.get(3), 99);
    }

    #[test]
    #[should_panic(expected = "register index 8 out of range")]
    fn test_register_index_out_of_range() {
        let regs = Registers::new();
        regs.get(8);
    }

    #[test]
    fn test_compare_sets_exactly_one_flag() {
        for (a, b) in [(5u8, 5u8), (9, 3), (3, 9)] {
            let flags = Flags::compare(a, b);
            let set = [flags.is_equal(), flags.is_greater(), flags.is_less()]
                .iter()
                .filter(|&&f| f)
                .count();
            assert_eq!(set, 1, "CMP({}, {}) set {} flags", a, b, set);
        }

        assert!(Flags::compare(5, 5).is_equal());
        assert!(Flags::compare(9, 3).is_greater());
        assert!(Flags::compare(3, 9).is_less());
    }

    #[test]
    fn test_compare_overwrites_prior_flags() {
        let mut regs = Registers::new();

        regs.flags = Flags::compare(1, 2);
        assert!(regs.flags.is_less());

        regs.flags = Flags::compare(2, 2);
        assert!(regs.flags.is_equal());
        assert!(!regs.flags.is_less());
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xFE;

        regs.advance_pc(3);
        assert_eq!(regs.pc, 1);
    }
}
