//! End-to-end program tests: assemble or parse a whole program, run it
//! on a fresh machine, and check the observable output and final state.

use ls8::{assemble, parse_image, Cpu, Flags};
use proptest::prelude::*;

/// Assemble, load, and run a program, returning the machine and its output.
fn run_source(source: &str) -> (Cpu, String) {
    let bytes = assemble(source).expect("program should assemble");
    let mut cpu = Cpu::new();
    cpu.load_program(&bytes).expect("program should fit in memory");

    let mut out = Vec::new();
    cpu.run(&mut out).expect("program should run to halt");

    (cpu, String::from_utf8(out).expect("PRN output is ASCII"))
}

#[test]
fn add_two_numbers_and_print() {
    let (cpu, out) = run_source(
        r#"
        ; 8 + 9 = 17
        LDI R0,8
        LDI R1,9
        ADD R0,R1
        PRN R0
        HLT
        "#,
    );

    assert_eq!(out, "17\n");
    assert!(cpu.is_halted());
}

#[test]
fn stack_is_lifo() {
    let (_, out) = run_source(
        r#"
        LDI R0,1
        LDI R1,2
        LDI R2,3
        PUSH R0
        PUSH R1
        PUSH R2
        POP R3
        POP R4
        POP R5
        PRN R3
        PRN R4
        PRN R5
        HLT
        "#,
    );

    assert_eq!(out, "3\n2\n1\n");
}

#[test]
fn countdown_loop_terminates() {
    // Exercises the CMP/JNE interplay across iterations: the loop body
    // decrements R0 until the equal flag finally falls through.
    let (cpu, out) = run_source(
        r#"
        LDI R0,3
        LDI R1,1
        LDI R2,0
        LDI R3,LOOP
    LOOP:
        SUB R0,R1
        PRN R0
        CMP R0,R2
        JNE R3
        HLT
        "#,
    );

    assert_eq!(out, "2\n1\n0\n");
    assert!(cpu.is_halted());
    assert_eq!(cpu.regs.get(0), 0);
}

#[test]
fn call_and_return() {
    let (cpu, out) = run_source(
        r#"
        ; Double R0 in a subroutine, then print it
        LDI R1,MULT2
        LDI R0,12
        CALL R1
        PRN R0
        HLT
    MULT2:
        LDI R2,2
        MUL R0,R2
        RET
        "#,
    );

    assert_eq!(out, "24\n");
    assert!(cpu.is_halted());
    assert_eq!(cpu.regs.sp(), 0xF4);
}

#[test]
fn nested_calls_unwind_in_order() {
    let (cpu, out) = run_source(
        r#"
        LDI R1,OUTER
        CALL R1
        PRN R0
        HLT
    OUTER:
        LDI R2,INNER
        CALL R2
        LDI R3,1
        ADD R0,R3
        RET
    INNER:
        LDI R0,10
        RET
        "#,
    );

    // INNER sets 10, OUTER adds 1 after INNER returns
    assert_eq!(out, "11\n");
    assert_eq!(cpu.regs.sp(), 0xF4);
}

#[test]
fn boot_from_image_text() {
    let image = parse_image(
        r#"
# 8 + 9, printed

10000010 # LDI R0,8
00000000
00001000
10000010 # LDI R1,9
00000001
00001001
10100000 # ADD R0,R1
00000000
00000001
01000111 # PRN R0
00000000
00000001 # HLT
"#,
    )
    .expect("image should parse");

    let mut cpu = Cpu::new();
    cpu.load_program(&image.bytes).unwrap();

    let mut out = Vec::new();
    cpu.run(&mut out).unwrap();

    assert_eq!(out, b"17\n");
    assert!(cpu.is_halted());
}

#[test]
fn jeq_skips_when_unequal() {
    let (_, out) = run_source(
        r#"
        LDI R0,1
        LDI R1,2
        LDI R2,SKIP
        CMP R0,R1
        JEQ R2
        PRN R0
    SKIP:
        HLT
        "#,
    );

    // Not equal, so the JEQ falls through and prints
    assert_eq!(out, "1\n");
}

proptest! {
    #[test]
    fn ldi_loads_any_value(reg in 0u8..8, value: u8) {
        let bytes = assemble(&format!("LDI R{},{}\nHLT\n", reg, value)).unwrap();
        let mut cpu = Cpu::new();
        cpu.load_program(&bytes).unwrap();

        let mut out = Vec::new();
        cpu.run(&mut out).unwrap();

        prop_assert_eq!(cpu.regs.get(reg), value);
        // One LDI advanced the PC by exactly 3, onto the HLT
        prop_assert_eq!(cpu.regs.pc, 3);
    }

    #[test]
    fn push_pop_restores_register_and_sp(value: u8, clobber: u8) {
        let source = format!(
            "LDI R0,{}\nPUSH R0\nLDI R0,{}\nPOP R0\nHLT\n",
            value, clobber
        );
        let bytes = assemble(&source).unwrap();
        let mut cpu = Cpu::new();
        cpu.load_program(&bytes).unwrap();

        let mut out = Vec::new();
        cpu.run(&mut out).unwrap();

        prop_assert_eq!(cpu.regs.get(0), value);
        prop_assert_eq!(cpu.regs.sp(), 0xF4);
    }

    #[test]
    fn cmp_sets_exactly_one_consistent_flag(a: u8, b: u8) {
        let source = format!("LDI R0,{}\nLDI R1,{}\nCMP R0,R1\nHLT\n", a, b);
        let bytes = assemble(&source).unwrap();
        let mut cpu = Cpu::new();
        cpu.load_program(&bytes).unwrap();

        let mut out = Vec::new();
        cpu.run(&mut out).unwrap();

        let flags = cpu.regs.flags;
        let set = [flags.is_equal(), flags.is_greater(), flags.is_less()]
            .iter()
            .filter(|&&f| f)
            .count();
        prop_assert_eq!(set, 1);

        let expected = Flags::compare(a, b);
        prop_assert_eq!(flags, expected);
    }
}
