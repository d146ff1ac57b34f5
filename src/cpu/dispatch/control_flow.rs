/*!
control_flow.rs - JMP/CALL/RET (unconditional, conditional, and
undocumented aliases), RST n, PCHL opcode family handler.

Overview
========
Implements every instruction that can redirect the program counter:

  JMP adr / UD_JMP (0xCB)            unconditional jump
  Jcc adr (8 conditions)             conditional jump
  CALL adr / UD_CALL (0xDD,0xED,0xFD) unconditional call
  Ccc adr (8 conditions)             conditional call
  RET / UD_RET (0xD9)                unconditional return
  Rcc (8 conditions)                 conditional return
  RST n (n = 0..7)                   call to n*8
  PCHL                               PC <- HL

Grounded on `i8080_jmp`/`i8080_jmp_addr`/`i8080_call`/`i8080_call_addr`/
`i8080_ret` in `libi8080/src/i8080.c`, including its
`SUBROUTINE_CYCLES_OFFSET` (+6 cycles when a conditional CALL/RET's
condition is true, applied here and cross-checked against
`cpu::cycles::taken_branch_bonus`).

Condition code decoding
========================
Jcc/Ccc/Rcc all share the 3-bit condition field at bits 3-5:
0=NZ 1=Z 2=NC 3=C 4=PO 5=PE 6=P 7=M.

Caller Requirements
===================
The orchestrator must fetch the opcode, advance PC, and initialize
`*cycles` with `base_cycles(opcode)` before calling `handle`. On a true
return here, `*cycles` has already had `taken_branch_bonus` folded in
when the branch was taken.

Return Contract
===============
`handle` returns true if the opcode was recognized and executed, false
otherwise.
*/

#![allow(dead_code)]

use crate::bus::Bus;
use crate::cpu::execute::{fetch_u16, pop_u16, push_u16};
use crate::cpu::regs::CpuRegs;

#[inline]
fn cond_true<C: CpuRegs>(cc: u8, cpu: &C) -> bool {
    match cc & 0x07 {
        0 => !cpu.zero(),
        1 => cpu.zero(),
        2 => !cpu.carry(),
        3 => cpu.carry(),
        4 => !cpu.parity(),
        5 => cpu.parity(),
        6 => !cpu.sign(),
        _ => cpu.sign(),
    }
}

#[inline]
fn op_jmp<C: CpuRegs>(cpu: &mut C, bus: &mut Bus) {
    let target = fetch_u16(cpu, bus);
    cpu.set_pc(target);
}

#[inline]
fn op_call<C: CpuRegs>(cpu: &mut C, bus: &mut Bus) {
    let target = fetch_u16(cpu, bus);
    let ret = cpu.pc();
    push_u16(cpu, bus, ret);
    cpu.set_pc(target);
}

#[inline]
fn op_ret<C: CpuRegs>(cpu: &mut C, bus: &mut Bus) {
    let target = pop_u16(cpu, bus);
    cpu.set_pc(target);
}

#[inline]
fn op_rst<C: CpuRegs>(cpu: &mut C, bus: &mut Bus, n: u8) {
    let ret = cpu.pc();
    push_u16(cpu, bus, ret);
    cpu.set_pc((n as u16) * 8);
}

pub(super) fn handle<C: CpuRegs>(opcode: u8, cpu: &mut C, bus: &mut Bus, cycles: &mut u32) -> bool {
    match opcode {
        // Unconditional jump (0xC3) and its undocumented alias (0xCB).
        0xC3 | 0xCB => op_jmp(cpu, bus),

        // Conditional jump: Jcc adr.
        0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
            let cc = (opcode >> 3) & 0x07;
            let target = fetch_u16(cpu, bus);
            if cond_true(cc, cpu) {
                cpu.set_pc(target);
            }
        }

        // Unconditional call (0xCD) and its undocumented aliases.
        0xCD | 0xDD | 0xED | 0xFD => op_call(cpu, bus),

        // Conditional call: Ccc adr. +6 cycles when taken.
        0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
            let cc = (opcode >> 3) & 0x07;
            let target = fetch_u16(cpu, bus);
            if cond_true(cc, cpu) {
                let ret = cpu.pc();
                push_u16(cpu, bus, ret);
                cpu.set_pc(target);
                *cycles += crate::cpu::cycles::taken_branch_bonus(opcode);
            }
        }

        // Unconditional return (0xC9) and its undocumented alias (0xD9).
        0xC9 | 0xD9 => op_ret(cpu, bus),

        // Conditional return: Rcc. +6 cycles when taken.
        0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
            let cc = (opcode >> 3) & 0x07;
            if cond_true(cc, cpu) {
                op_ret(cpu, bus);
                *cycles += crate::cpu::cycles::taken_branch_bonus(opcode);
            }
        }

        // RST n: n = bits 3-5.
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            let n = (opcode >> 3) & 0x07;
            op_rst(cpu, bus, n);
        }

        // PCHL: PC <- HL.
        0xE9 => cpu.set_pc(cpu.hl()),

        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::cycles::base_cycles;
    use crate::cpu::state::CpuState;

    fn setup() -> (CpuState, Bus) {
        let mut cpu = CpuState::new();
        cpu.set_sp(0x2000);
        (cpu, Bus::new())
    }

    #[test]
    fn jmp_sets_pc_from_operand() {
        let (mut cpu, mut bus) = setup();
        bus.write(0x0000, 0x00);
        bus.write(0x0001, 0x40);
        cpu.set_pc(0x0000);
        let mut cycles = base_cycles(0xC3);
        assert!(handle(0xC3, &mut cpu, &mut bus, &mut cycles));
        assert_eq!(cpu.pc(), 0x4000);
    }

    #[test]
    fn call_then_ret_round_trips_pc() {
        let (mut cpu, mut bus) = setup();
        bus.write(0x0100, 0x00);
        bus.write(0x0101, 0x50);
        cpu.set_pc(0x0100);
        let mut cycles = base_cycles(0xCD);
        assert!(handle(0xCD, &mut cpu, &mut bus, &mut cycles)); // CALL 0x5000
        assert_eq!(cpu.pc(), 0x5000);
        let mut cycles2 = base_cycles(0xC9);
        assert!(handle(0xC9, &mut cpu, &mut bus, &mut cycles2)); // RET
        assert_eq!(cpu.pc(), 0x0102);
    }

    #[test]
    fn conditional_call_not_taken_skips_push_but_still_reads_operand() {
        let (mut cpu, mut bus) = setup();
        bus.write(0x0000, 0x00);
        bus.write(0x0001, 0x50);
        cpu.set_pc(0x0000);
        cpu.set_zero(true); // CNZ condition false
        let sp_before = cpu.sp();
        let mut cycles = base_cycles(0xC4);
        assert!(handle(0xC4, &mut cpu, &mut bus, &mut cycles)); // CNZ 0x5000
        assert_eq!(cpu.pc(), 0x0002, "operand consumed even when not taken");
        assert_eq!(cpu.sp(), sp_before, "no push when condition is false");
        assert_eq!(cycles, base_cycles(0xC4));
    }

    #[test]
    fn conditional_call_taken_adds_bonus_cycles_matching_unconditional() {
        let (mut cpu, mut bus) = setup();
        bus.write(0x0000, 0x00);
        bus.write(0x0001, 0x50);
        cpu.set_pc(0x0000);
        cpu.set_zero(true); // CZ condition true
        let mut cycles = base_cycles(0xCC);
        assert!(handle(0xCC, &mut cpu, &mut bus, &mut cycles)); // CZ 0x5000
        assert_eq!(cpu.pc(), 0x5000);
        assert_eq!(cycles, base_cycles(0xCD));
    }

    #[test]
    fn rst_7_calls_0x38() {
        let (mut cpu, mut bus) = setup();
        cpu.set_pc(0x1234);
        let mut cycles = base_cycles(0xFF);
        assert!(handle(0xFF, &mut cpu, &mut bus, &mut cycles)); // RST 7
        assert_eq!(cpu.pc(), 0x0038);
        assert_eq!(pop_u16(&mut cpu, &bus), 0x1234);
    }

    #[test]
    fn pchl_loads_pc_from_hl() {
        let (mut cpu, mut bus) = setup();
        cpu.set_hl(0x9000);
        let mut cycles = base_cycles(0xE9);
        assert!(handle(0xE9, &mut cpu, &mut bus, &mut cycles));
        assert_eq!(cpu.pc(), 0x9000);
    }
}
