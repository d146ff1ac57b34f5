/*!
core::Cpu - Canonical Intel 8080 CPU façade wrapping `CpuState` and the
shared interrupt latch.

Overview
========
`Cpu` is the unit of composition the `Vm` wrapper (and tests) actually
hold: a `CpuState` plus the `IntrLatch` that lets a host thread raise
an interrupt asynchronously. It owns the EI/DI <-> `IntrLatch`
synchronization spec.md §4.4 requires: `CpuState::int_enabled` is the
architectural mirror instructions observe (and what `reset` clears per
the reset contract); `IntrLatch::enabled` is the thread-safe gate a
producer thread actually checks. `Cpu::step` keeps them in lockstep by
re-syncing the latch from the mirror after every instruction,
including the EI/DI opcodes themselves.

Interrupt handle
================
`Cpu::interrupt_handle` hands out a cloned `IntrLatch` a host can move
onto another thread (e.g. a keyboard-watcher thread per spec.md's
`--key-interrupts` CLI flag) to call `request_interrupt()` without
touching the CPU directly.
*/

use crate::bus::Bus;
use crate::cpu::interrupt::IntrLatch;
use crate::cpu::state::CpuState;
use crate::error::StepError;

#[derive(Debug, Clone)]
pub struct Cpu {
    state: CpuState,
    intr: IntrLatch,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Construct a new CPU with power-up defaults and a fresh,
    /// disabled interrupt latch.
    pub fn new() -> Self {
        Self {
            state: CpuState::new(),
            intr: IntrLatch::new(),
        }
    }

    /// Immutable reference to the architectural register/flag state.
    pub fn state(&self) -> &CpuState {
        &self.state
    }

    /// Mutable reference, for test setup and the CP/M shim's
    /// construction-time memory writes.
    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    /// A cloneable handle onto this CPU's interrupt latch, for a
    /// producer thread to call `request_interrupt()` on.
    pub fn interrupt_handle(&self) -> IntrLatch {
        self.intr.clone()
    }

    /// Reset architectural control state (PC, halt, interrupt enable);
    /// working registers and flags are left undisturbed.
    pub fn reset(&mut self, bus: &mut Bus) {
        self.state.reset(bus);
        self.intr.set_enabled(false);
    }

    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    /// True if the next `step` would service an interrupt rather than
    /// fetch an ordinary opcode. Lets a wrapper (the CP/M shim's
    /// host-trap detection) give a pending interrupt priority over its
    /// own address-based dispatch without duplicating `dispatch::step`'s
    /// own check.
    pub fn has_pending_interrupt(&self) -> bool {
        self.state.int_enabled && self.intr.is_requested()
    }

    pub fn set_halted(&mut self, h: bool) {
        self.state.halted = h;
    }

    // ---------------------------------------------------------------
    // Register / flag accessors (delegate to CpuState)
    // ---------------------------------------------------------------
    pub fn a(&self) -> u8 {
        self.state.a
    }
    pub fn b(&self) -> u8 {
        self.state.b
    }
    pub fn c(&self) -> u8 {
        self.state.c
    }
    pub fn d(&self) -> u8 {
        self.state.d
    }
    pub fn e(&self) -> u8 {
        self.state.e
    }
    pub fn h(&self) -> u8 {
        self.state.h
    }
    pub fn l(&self) -> u8 {
        self.state.l
    }
    pub fn sp(&self) -> u16 {
        self.state.sp
    }
    pub fn pc(&self) -> u16 {
        self.state.pc
    }
    pub fn bc(&self) -> u16 {
        self.state.bc()
    }
    pub fn de(&self) -> u16 {
        self.state.de()
    }
    pub fn hl(&self) -> u16 {
        self.state.hl()
    }
    pub fn psw(&self) -> u16 {
        self.state.psw()
    }
    pub fn cycles(&self) -> u64 {
        self.state.cycles
    }

    pub fn set_a(&mut self, v: u8) {
        self.state.a = v;
    }
    pub fn set_pc(&mut self, v: u16) {
        self.state.pc = v;
    }
    pub fn set_sp(&mut self, v: u16) {
        self.state.sp = v;
    }

    // ---------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------

    /// Execute exactly one instruction (or one interrupt-service
    /// entry, or a no-op halt tick) and return the cycles it cost.
    pub fn step(&mut self, bus: &mut Bus) -> Result<u32, StepError> {
        let cycles = crate::cpu::dispatch::step(&mut self.state, bus, &self.intr)?;
        self.intr.set_enabled(self.state.int_enabled);
        Ok(cycles)
    }

    /// Convenience: run until halted, an error occurs, or
    /// `max_instructions` steps have executed.
    pub fn run(&mut self, bus: &mut Bus, max_instructions: usize) -> Result<(), StepError> {
        for _ in 0..max_instructions {
            if self.is_halted() {
                break;
            }
            self.step(bus)?;
        }
        Ok(())
    }
}
