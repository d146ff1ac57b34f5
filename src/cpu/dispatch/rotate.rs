/*!
rotate.rs - RLC/RRC/RAL/RAR opcode family handler.

Overview
========
The four accumulator-rotate instructions, each affecting only the
carry flag. Grounded on `i8080_rlc`/`i8080_rrc`/`i8080_ral`/`i8080_rar`
in `libi8080/src/i8080.c`, via the shared helpers in `cpu::execute`.

Caller Requirements
===================
The orchestrator must fetch the opcode, advance PC, and initialize
`*cycles` with `base_cycles(opcode)` before calling `handle`.

Return Contract
===============
`handle` returns true if the opcode was recognized and executed, false
otherwise. None of these carry a conditionally-taken branch.
*/

#![allow(dead_code)]

use crate::bus::Bus;
use crate::cpu::execute::{
    rotate_left, rotate_left_through_carry, rotate_right, rotate_right_through_carry,
};
use crate::cpu::regs::CpuRegs;

pub(super) fn handle<C: CpuRegs>(
    opcode: u8,
    cpu: &mut C,
    _bus: &mut Bus,
    _cycles: &mut u32,
) -> bool {
    match opcode {
        0x07 => rotate_left(cpu),
        0x0F => rotate_right(cpu),
        0x17 => rotate_left_through_carry(cpu),
        0x1F => rotate_right_through_carry(cpu),
        _ => return false,
    }
    true
}
