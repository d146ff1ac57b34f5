/*!
io_ctl.rs - IN/OUT, EI/DI, NOP (and its seven undocumented aliases),
HLT opcode family handler.

Overview
========
The only family whose instructions can fail at runtime: IN/OUT reach
out through `Bus::io_read`/`Bus::io_write`, which return
`Err(StepError::MissingHandler)` when the host never installed the
corresponding hook (spec.md §7: "no error is ever swallowed
silently"). Every other opcode in this family is infallible.

Grounded on the IN/OUT/EI/DI/NOP/ALT_NOP*/HLT cases of `i8080_exec` in
`libi8080/src/i8080.c`. EI/DI only flip `CpuRegs::int_enabled`; the
`Cpu` façade (`cpu::core`) is responsible for propagating that flag
into the shared `IntrLatch` after `step` returns, since this handler
has no access to the latch (it operates generically over `CpuRegs`).

Caller Requirements
===================
The orchestrator must fetch the opcode, advance PC, and initialize
`*cycles` with `base_cycles(opcode)` before calling `handle`.

Return Contract
===============
`handle` returns:
  Ok(true)  - opcode recognized and executed
  Ok(false) - not a member of this family; caller continues the chain
  Err(e)    - opcode recognized but a required host callback was missing
*/

#![allow(dead_code)]

use crate::bus::Bus;
use crate::cpu::execute::fetch_u8;
use crate::cpu::regs::CpuRegs;
use crate::error::StepError;

pub(super) fn handle<C: CpuRegs>(
    opcode: u8,
    cpu: &mut C,
    bus: &mut Bus,
    _cycles: &mut u32,
) -> Result<bool, StepError> {
    match opcode {
        // NOP and its seven undocumented aliases.
        0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {}

        // OUT port2: byte 2 is the 8-bit port address, doubled onto
        // both halves of the port bus per the original's
        // `concatenate(port_addr, port_addr)` convention.
        0xD3 => {
            let port = fetch_u8(cpu, bus);
            let v = cpu.a();
            bus.io_write(port, v)?;
        }

        // IN port2: A <- value read from the port.
        0xDB => {
            let port = fetch_u8(cpu, bus);
            let v = bus.io_read(port)?;
            cpu.set_a(v);
        }

        // EI: enable interrupts.
        0xFB => cpu.set_int_enabled(true),

        // DI: disable interrupts.
        0xF3 => cpu.set_int_enabled(false),

        // HLT: halt until the next serviced interrupt.
        0x76 => cpu.set_halted(true),

        _ => return Ok(false),
    }
    Ok(true)
}
