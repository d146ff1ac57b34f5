/*!
logical.rs - ANA/XRA/ORA/CMP, ANI/XRI/ORI/CPI, CMA/STC/CMC opcode
family handler.

Overview
========
Handles the 8080's bitwise-logical and complement/carry-flag-toggle
instructions. Grounded on the ANA/XRA/ORA/CMP/ANI/XRI/ORI/CPI/CMA/STC/
CMC cases of `i8080_exec` in `libi8080/src/i8080.c`.

Caller Requirements
===================
The orchestrator must fetch the opcode, advance PC, and initialize
`*cycles` with `base_cycles(opcode)` before calling `handle`.

Return Contract
===============
`handle` returns true if the opcode was recognized and executed, false
otherwise. None of these opcodes carry a conditionally-taken branch.
*/

#![allow(dead_code)]

use crate::bus::Bus;
use crate::cpu::execute::{and_with_a, cmp_with_a, fetch_u8, or_with_a, read_r, xor_with_a};
use crate::cpu::regs::CpuRegs;

pub(super) fn handle<C: CpuRegs>(
    opcode: u8,
    cpu: &mut C,
    bus: &mut Bus,
    _cycles: &mut u32,
) -> bool {
    match opcode {
        // ANA r/M (0xA0-0xA7), XRA r/M (0xA8-0xAF)
        0xA0..=0xA7 => {
            let v = read_r(opcode & 0x07, cpu, bus);
            and_with_a(cpu, v);
        }
        0xA8..=0xAF => {
            let v = read_r(opcode & 0x07, cpu, bus);
            xor_with_a(cpu, v);
        }

        // ORA r/M (0xB0-0xB7), CMP r/M (0xB8-0xBF)
        0xB0..=0xB7 => {
            let v = read_r(opcode & 0x07, cpu, bus);
            or_with_a(cpu, v);
        }
        0xB8..=0xBF => {
            let v = read_r(opcode & 0x07, cpu, bus);
            cmp_with_a(cpu, v);
        }

        // ANI/XRI/ORI/CPI data2
        0xE6 => {
            let v = fetch_u8(cpu, bus);
            and_with_a(cpu, v);
        }
        0xEE => {
            let v = fetch_u8(cpu, bus);
            xor_with_a(cpu, v);
        }
        0xF6 => {
            let v = fetch_u8(cpu, bus);
            or_with_a(cpu, v);
        }
        0xFE => {
            let v = fetch_u8(cpu, bus);
            cmp_with_a(cpu, v);
        }

        // CMA: A <- !A. No flags affected.
        0x2F => cpu.set_a(!cpu.a()),

        // STC: CY <- 1.
        0x37 => cpu.set_carry(true),

        // CMC: CY <- !CY.
        0x3F => {
            let cy = cpu.carry();
            cpu.set_carry(!cy);
        }

        _ => return false,
    }
    true
}
