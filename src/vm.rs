/*!
vm.rs - Top-level virtual machine: `Cpu` + `Bus` + an optional CP/M
shim, composed into a single run loop with a latched exit code.

Overview
========
`Vm` is the object a host embeds: it owns the interpreter and its
memory, optionally installs a CP/M 2.2 environment, and exposes
`step`/`run` returning a [`VmExitCode`] once execution can no longer
continue. Grounded on `cpm80vm`'s `step`/`run`/`okay`/`restart` outer
loop, generalized to also cover the no-CP/M (bare interpreter) case
the original didn't need.

Exit code propagation (spec.md §7)
===================================
Once `exit_code` leaves `Running`, every subsequent `step` is a no-op
that immediately returns the same latched code; only `reset` clears
it. A `StepError` from the interpreter is both propagated to the
caller and latched into `exit_code` so a caller polling `exit_code()`
after ignoring one `step` result still sees why the VM stopped.

Host-trap priority
===================
A pending, enabled interrupt always takes priority over a CP/M trap
address: `Vm::step` checks `Cpu::has_pending_interrupt` first and, if
true, defers entirely to `Cpu::step`'s own interrupt-service path
rather than short-circuiting for the trap.
*/

use crate::bus::{Bus, BusHooks};
use crate::cpm::{CpmOutcome, CpmShim, ConsoleHooks};
use crate::cpu::core::Cpu;
use crate::cpu::execute::pop_u16;
use crate::cpu::interrupt::IntrLatch;
use crate::error::{LoadError, StepError, VmExitCode};
use crate::loader;

/// Nominal cycle cost charged for a serviced CP/M host trap: the
/// `OUT 0xFF; RET` trampoline's own cost (10 + 10), since the
/// interpreter never actually fetches those bytes once a trap address
/// is recognized (see `cpm::mod`'s module doc).
const TRAP_CYCLES: u32 = 20;

pub struct Vm {
    cpu: Cpu,
    bus: Bus,
    cpm: Option<CpmShim>,
    exit_code: VmExitCode,
}

impl Vm {
    /// A bare interpreter with no CP/M environment: `step` only ever
    /// fetches and executes guest opcodes.
    pub fn new(hooks: BusHooks) -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::with_hooks(hooks),
            cpm: None,
            exit_code: VmExitCode::Running,
        }
    }

    /// A CP/M 2.2 environment: installs the BIOS/BDOS shim over a
    /// fresh bus before the caller loads a program.
    pub fn with_cpm(memsize_kb: u16, console: ConsoleHooks, hooks: BusHooks) -> Self {
        let shim = CpmShim::new(memsize_kb, console);
        let mut bus = Bus::with_hooks(hooks);
        shim.install(&mut bus);
        Self {
            cpu: Cpu::new(),
            bus,
            cpm: Some(shim),
            exit_code: VmExitCode::Running,
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn exit_code(&self) -> VmExitCode {
        self.exit_code
    }

    /// A cloneable handle a host thread can use to raise an interrupt
    /// (e.g. the CLI's `--key-interrupts` keyboard-watcher thread).
    pub fn interrupt_handle(&self) -> IntrLatch {
        self.cpu.interrupt_handle()
    }

    /// Load a program image at the Transient Program Area origin.
    /// When a CP/M shim is installed, rejects any range overlapping
    /// the CCP; otherwise the whole address space past the origin is
    /// available.
    pub fn load_program(&mut self, data: &[u8]) -> Result<(), LoadError> {
        let ccp_bound = self
            .cpm
            .as_ref()
            .map(|shim| shim.ccp_addr() as u32)
            .unwrap_or(0x10000);
        loader::load_program(&mut self.bus, ccp_bound, data)
    }

    /// Reset CPU control state and exit code; reinstalls the CP/M
    /// shim's memory layout and its warm-boot counter, if present.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.exit_code = VmExitCode::Running;
        if let Some(shim) = &mut self.cpm {
            shim.reset();
            shim.install(&mut self.bus);
        }
    }

    /// Execute one step: a serviced interrupt, a CP/M host-trap
    /// service, an ordinary opcode, or (once latched) nothing at all.
    pub fn step(&mut self) -> Result<u32, StepError> {
        if !self.exit_code.is_running() {
            return Ok(0);
        }

        if self.cpu.is_halted() && !self.cpu.has_pending_interrupt() {
            return Ok(0);
        }

        if !self.cpu.has_pending_interrupt() {
            if let Some(kind) = self
                .cpm
                .as_ref()
                .and_then(|shim| shim.trap_kind(self.cpu.pc()))
            {
                return Ok(self.service_trap(kind));
            }
        }

        match self.cpu.step(&mut self.bus) {
            Ok(cycles) => Ok(cycles),
            Err(e) => {
                self.exit_code = VmExitCode::from(e);
                Err(e)
            }
        }
    }

    fn service_trap(&mut self, kind: crate::cpm::TrapKind) -> u32 {
        let shim = self.cpm.as_mut().expect("trap_kind only returns Some when cpm is installed");
        let outcome = shim.dispatch(kind, self.cpu.state_mut(), &mut self.bus);

        match outcome {
            CpmOutcome::Continue | CpmOutcome::Unimplemented { .. } => {
                let ret = pop_u16(self.cpu.state_mut(), &self.bus);
                self.cpu.set_pc(ret);
            }
            CpmOutcome::Restarted | CpmOutcome::Exited => {}
        }

        match outcome {
            CpmOutcome::Unimplemented { kind, code } => {
                log::error!("unimplemented CP/M {kind:?} call {code}");
                self.exit_code = VmExitCode::UnimplementedSyscall { kind, code };
            }
            CpmOutcome::Exited => {
                log::info!("guest program exited via warm boot");
                self.exit_code = VmExitCode::ProgramExit;
            }
            _ => {}
        }

        let state = self.cpu.state_mut();
        state.cycles = state.cycles.saturating_add(TRAP_CYCLES as u64);
        TRAP_CYCLES
    }

    /// Run until the exit code leaves `Running` or `max_instructions`
    /// steps have executed, whichever comes first.
    pub fn run(&mut self, max_instructions: usize) -> Result<VmExitCode, StepError> {
        for _ in 0..max_instructions {
            if !self.exit_code.is_running() {
                break;
            }
            self.step()?;
        }
        Ok(self.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// spec.md §8 scenario 4: CP/M print string.
    ///
    /// `MVI C,9; LXI D,0x0109; CALL 0x0005; HLT; "HI$"` loaded at the
    /// TPA origin. Running to completion should print "HI" via BDOS
    /// function 9 and then halt cleanly.
    #[test]
    fn scenario_cpm_print_string() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let out_clone = out.clone();
        let mut console = ConsoleHooks::new();
        console.write = Some(Box::new(move |b| out_clone.borrow_mut().push(b)));

        let mut vm = Vm::with_cpm(64, console, BusHooks::new());
        let program = [
            0x0E, 0x09, // MVI C, 9
            0x11, 0x09, 0x01, // LXI D, 0x0109
            0xCD, 0x05, 0x00, // CALL 0x0005
            0x76, // HLT
            b'H', b'I', b'$',
        ];
        vm.load_program(&program).unwrap();

        let exit = vm.run(10_000).unwrap();
        assert_eq!(exit, VmExitCode::Running, "halted, not yet re-entered warm boot");
        assert!(vm.cpu().is_halted());
        assert_eq!(*out.borrow(), b"HI");
    }

    /// spec.md §8 scenario 5: CP/M warm-boot termination.
    ///
    /// `JMP 0x0000` loaded at the TPA origin. The VM's own bootstrap
    /// already counts as the first warm-boot entry; the program's own
    /// jump back to 0x0000 is the second, which must surface as
    /// `ProgramExit`.
    #[test]
    fn scenario_warm_boot_termination() {
        let mut vm = Vm::with_cpm(64, ConsoleHooks::new(), BusHooks::new());
        vm.load_program(&[0xC3, 0x00, 0x00]).unwrap(); // JMP 0x0000
        let exit = vm.run(10_000).unwrap();
        assert_eq!(exit, VmExitCode::ProgramExit);
    }

    /// spec.md §8 scenario 6: interrupt from HALT.
    ///
    /// `EI; HLT`, then an external `request_interrupt()` with
    /// `intr_read` configured to hand back RST 1 (0xCF). The CPU should
    /// wake, push the pre-interrupt PC, and jump to 0x0008.
    #[test]
    fn scenario_interrupt_from_halt() {
        let mut hooks = BusHooks::new();
        hooks.intr_read = Some(Box::new(|| 0xCF)); // RST 1
        let mut vm = Vm::new(hooks);
        vm.bus_mut().write(0x0000, 0xFB); // EI
        vm.bus_mut().write(0x0001, 0x76); // HLT

        vm.step().unwrap(); // EI
        vm.step().unwrap(); // HLT
        assert!(vm.cpu().is_halted());

        // Stepping again with nothing requested yet: still halted, free.
        let cycles = vm.step().unwrap();
        assert_eq!(cycles, 0);
        assert!(vm.cpu().is_halted());

        let handle = vm.interrupt_handle();
        handle.request_interrupt();

        vm.step().unwrap();
        assert_eq!(vm.cpu().pc(), 0x0008);
        assert!(!vm.cpu().is_halted());
        assert!(!vm.cpu().state().int_enabled);
        assert_eq!(vm.cpu().sp(), 0x0000u16.wrapping_sub(2));
        assert_eq!(
            vm.bus().read(vm.cpu().sp()) as u16 | ((vm.bus().read(vm.cpu().sp().wrapping_add(1)) as u16) << 8),
            0x0002,
            "pushed PC is the address right after HLT"
        );
    }

    #[test]
    fn load_program_rejects_range_overlapping_ccp() {
        let mut vm = Vm::with_cpm(64, ConsoleHooks::new(), BusHooks::new());
        let oversized = vec![0u8; 0x10000];
        assert!(vm.load_program(&oversized).is_err());
    }

    #[test]
    fn reset_clears_latched_exit_code_and_reinstalls_cpm_shim() {
        let mut vm = Vm::with_cpm(64, ConsoleHooks::new(), BusHooks::new());
        vm.load_program(&[0xC3, 0x00, 0x00]).unwrap(); // JMP 0x0000
        assert_eq!(vm.run(10_000).unwrap(), VmExitCode::ProgramExit);

        vm.reset();
        assert_eq!(vm.exit_code(), VmExitCode::Running);
        assert_eq!(vm.cpu().pc(), 0);

        vm.load_program(&[0xC3, 0x00, 0x00]).unwrap();
        assert_eq!(vm.run(10_000).unwrap(), VmExitCode::ProgramExit);
    }
}
