/*!
dispatch/mod.rs - Orchestrator for a single Intel 8080 CPU step.

Overview
========
Implements spec.md §4.3's priority order for one `Cpu::step` call:

  1. Service a pending interrupt, if armed and requested.
  2. Otherwise, if halted, consume no opcode and report zero cycles.
  3. Otherwise, fetch-decode-execute the next opcode from memory.

Grounded directly on `i8080_next`/`i8080_exec` in
`libi8080/src/i8080.c`: when an interrupt is serviced, the opcode
comes from the host's interrupt-acknowledge callback rather than guest
memory at PC, and PC is not advanced for that fetch - any further
operand bytes the acknowledged opcode needs (e.g. a jammed CALL) are
still read from memory at the current PC, exactly as the original
does by handing the acknowledged opcode straight to the same
`i8080_exec` switch used for a normal fetch.

Family dispatch
================
Each non-fallible family handler returns `true` if it recognized and
executed the opcode. `io_ctl` is the sole fallible family (IN/OUT can
observe a missing host callback) and is therefore tried last and
propagates its `Result` with `?`.

Interrupt/EI/DI synchronization
================================
This function only consumes the `IntrLatch`'s request-and-clear
protocol and disables it upon servicing, matching spec.md §4.4. EI/DI
executed as ordinary opcodes only flip `CpuState::int_enabled`; it is
`cpu::core::Cpu::step`'s job to resynchronize the shared `IntrLatch`'s
`enabled` bit from that mirror after this function returns, since this
function is generic over interrupt source and has no other way to
observe an EI/DI that just ran.
*/

#![allow(dead_code)]

pub(crate) mod arithmetic;
pub(crate) mod control_flow;
pub(crate) mod data_movement;
pub(crate) mod io_ctl;
pub(crate) mod logical;
pub(crate) mod rotate;
pub(crate) mod stack;

use crate::bus::Bus;
use crate::cpu::cycles::base_cycles;
use crate::cpu::interrupt::IntrLatch;
use crate::cpu::regs::CpuRegs;
use crate::cpu::state::CpuState;
use crate::error::StepError;

/// Execute one CPU step (interrupt service, halt check, or
/// fetch-decode-execute) and return the cycles it consumed.
pub(crate) fn step(cpu: &mut CpuState, bus: &mut Bus, intr: &IntrLatch) -> Result<u32, StepError> {
    let opcode = if cpu.int_enabled && intr.take_requested() {
        let ack = bus.intr_read()?;
        cpu.int_enabled = false;
        cpu.int_requested = false;
        cpu.halted = false;
        intr.set_enabled(false);
        ack
    } else if cpu.halted {
        return Ok(0);
    } else {
        cpu.fetch_u8(bus)
    };

    let mut cycles = base_cycles(opcode);

    let handled = data_movement::handle(opcode, cpu, bus, &mut cycles)
        || arithmetic::handle(opcode, cpu, bus, &mut cycles)
        || logical::handle(opcode, cpu, bus, &mut cycles)
        || rotate::handle(opcode, cpu, bus, &mut cycles)
        || stack::handle(opcode, cpu, bus, &mut cycles)
        || control_flow::handle(opcode, cpu, bus, &mut cycles);

    if !handled && !io_ctl::handle(opcode, cpu, bus, &mut cycles)? {
        log::error!("unhandled 8080 opcode {opcode:#04x} at pc {:#06x}", cpu.pc.wrapping_sub(1));
    }

    cpu.add_cycles(cycles);
    Ok(cycles)
}
