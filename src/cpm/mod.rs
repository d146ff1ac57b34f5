/*!
cpm::mod - CP/M 2.2 environment shim: BIOS/BDOS trampolines and the
host-trap dispatcher that backs them.

Overview
========
Installs a 64 KiB CP/M 2.2 memory layout (cold-boot vector, BIOS jump
table, BDOS entry) over a `Bus`, and answers the handful of BIOS/BDOS
calls spec.md §4.6 names with in-process Rust rather than a second
emulated program. Grounded directly on `cpm80vm.cpp`'s constructor,
`try_host_call`, and `warm_boot`.

Host-trap mechanism, adapted
=============================
The original identifies which service is being called by writing the
3-byte sequence `OUT 0xFF; RET` at every BIOS/BDOS entry point and
inspecting `cpu->pc - 2` (the trap address) from inside the OUT
opcode's `io_write` callback - the callback needs direct, mutable
access to the CPU (to read C/D/E and write A/PC/SP), which a generic
`Bus::io_write(port, value)` hook cannot provide without leaking CPU
internals through the bus.

This crate instead has `Vm::step` check the *upcoming* PC against the
shim's known trap addresses before fetching, and run the service
in-process with direct `&mut CpuState`/`&mut Bus` access; it then
simulates the trampoline's own `RET` by popping the call-pushed return
address. The `OUT 0xFF; RET` bytes are still written to guest memory
(so the layout matches a real CP/M image byte-for-byte and nothing
observes a gap), they are simply never actually fetched by the
interpreter once a trap address is reached.
*/

use crate::bus::Bus;
use crate::cpu::execute::push_u16;
use crate::cpu::state::CpuState;
use crate::error::UnimplementedKind;

/// Transient Program Area origin: where CP/M loads `.COM` files.
pub const TPA_ORIGIN: u16 = 0x0100;

/// `OUT 0xFF; RET` - kept in guest memory purely for layout fidelity;
/// see the module doc for why the interpreter never actually fetches it.
const HOST_CALL: [u8; 3] = [0xD3, 0xFF, 0xC9];

/// Number of entries in the BIOS jump table (BOOT through SECTRAN).
const BIOS_CALL_COUNT: u8 = 17;

const BIOS_BOOT: u8 = 0;
const BIOS_WBOOT: u8 = 1;
const BIOS_CONST: u8 = 2;
const BIOS_CONIN: u8 = 3;
const BIOS_CONOUT: u8 = 4;

const BDOS_WBOOT: u8 = 0;
const BDOS_CONOUT: u8 = 2;
const BDOS_PRINT_STRING: u8 = 9;

/// End-of-line-terminated-string sentinel for BDOS function 9.
const STRING_TERMINATOR: u8 = b'$';

/// Host-side console hooks a CP/M shim uses to satisfy the few BIOS/BDOS
/// calls that touch an actual terminal. Left `None`, the corresponding
/// call surfaces as `VmExitCode::UnimplementedSyscall` instead of
/// silently discarding the read or write - the same "never swallow a
/// missing callback" policy as `Bus`'s own hooks.
#[derive(Default)]
pub struct ConsoleHooks {
    /// Reads one byte from the host console. `None` return means EOF;
    /// the shim maps that to ASCII SUB (0x1A), CP/M's own convention
    /// for "no more input" (see DESIGN.md, Open Question on CONIN/EOF).
    pub read: Option<Box<dyn FnMut() -> Option<u8>>>,
    pub write: Option<Box<dyn FnMut(u8)>>,
}

impl ConsoleHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Which BIOS/BDOS table a trapped call address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrapKind {
    Bios(u8),
    Bdos,
}

/// Result of servicing one trapped call, telling `Vm::step` how PC
/// should end up afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CpmOutcome {
    /// Ordinary call: `Vm` must pop the CALL-pushed return address.
    Continue,
    /// First warm-boot: the shim already set PC to the TPA origin
    /// itself; `Vm` must not also pop a return address.
    Restarted,
    /// Second warm-boot: the guest program is exiting.
    Exited,
    /// Call number outside the implemented set.
    Unimplemented { kind: UnimplementedKind, code: u16 },
}

/// CP/M 2.2 BIOS/BDOS shim: memory layout plus the warm-boot state
/// machine. Construct with [`CpmShim::new`], then [`CpmShim::install`]
/// onto a fresh `Bus` before loading a guest program.
pub struct CpmShim {
    ccp_addr: u16,
    bdos_addr: u16,
    bios_table_addr: u16,
    bios_impl_addr: u16,
    wboot_count: u8,
    console: ConsoleHooks,
}

impl CpmShim {
    /// `memsize_kb` is the CP/M `MSIZE` parameter: total RAM in KiB
    /// (typically 64). Address math mirrors `cpm80vm::cpm80vm`'s
    /// constructor exactly, including its `size_t -> 16-bit address`
    /// truncation for `bios_impl_addr` when `memsize_kb * 1024` would
    /// otherwise overflow a 16-bit address space.
    pub fn new(memsize_kb: u16, console: ConsoleHooks) -> Self {
        let ccp_addr = 1024u16.wrapping_mul(memsize_kb.wrapping_sub(7));
        let bdos_addr = ccp_addr.wrapping_add(0x0806);
        let bios_table_addr = ccp_addr.wrapping_add(0x1600);
        let bios_impl_addr =
            (1024u32 * memsize_kb as u32).wrapping_sub(BIOS_CALL_COUNT as u32 * 3) as u16;

        Self {
            ccp_addr,
            bdos_addr,
            bios_table_addr,
            bios_impl_addr,
            wboot_count: 0,
            console,
        }
    }

    /// Base of the Console Command Processor: the first address CP/M
    /// considers "system" rather than TPA. `loader::load_program` uses
    /// this as the upper bound of a legal program range.
    pub fn ccp_addr(&self) -> u16 {
        self.ccp_addr
    }

    /// Write the BIOS jump table, its host-trap trampolines, the BDOS
    /// entry trampoline, and the cold-boot vector at address 0.
    /// Grounded on `cpm80vm::cpm80vm`'s constructor body.
    pub fn install(&self, bus: &mut Bus) {
        let mut table_ptr = self.bios_table_addr;
        let mut impl_ptr = self.bios_impl_addr;
        for _ in 0..BIOS_CALL_COUNT {
            write_jmp(bus, table_ptr, impl_ptr);
            bus.write_block(impl_ptr, &HOST_CALL);
            table_ptr = table_ptr.wrapping_add(3);
            impl_ptr = impl_ptr.wrapping_add(3);
        }

        bus.write_block(self.bdos_addr, &HOST_CALL);

        // Cold boot: execution starts at 0x0000 and jumps straight into
        // the BIOS table's BOOT entry (call 0), which warm_boot()
        // treats identically to an explicit WBOOT.
        write_jmp(bus, 0x0000, self.bios_table_addr);
    }

    /// Reset the warm-boot counter so a fresh `install` behaves like a
    /// freshly constructed shim. Does not touch `console`.
    pub(crate) fn reset(&mut self) {
        self.wboot_count = 0;
    }

    /// Identify whether `pc` is a BIOS or BDOS host-trap address.
    pub(crate) fn trap_kind(&self, pc: u16) -> Option<TrapKind> {
        if pc >= self.bios_impl_addr {
            let call_no = (pc.wrapping_sub(self.bios_impl_addr)) / HOST_CALL.len() as u16;
            if call_no < BIOS_CALL_COUNT as u16 {
                return Some(TrapKind::Bios(call_no as u8));
            }
            return None;
        }
        if pc == self.bdos_addr {
            return Some(TrapKind::Bdos);
        }
        None
    }

    /// Service a trapped call, given which one it is.
    pub(crate) fn dispatch(&mut self, kind: TrapKind, cpu: &mut CpuState, bus: &mut Bus) -> CpmOutcome {
        match kind {
            TrapKind::Bios(call_no) => self.bios_call(call_no, cpu, bus),
            TrapKind::Bdos => self.bdos_call(cpu, bus),
        }
    }

    fn bios_call(&mut self, call_no: u8, cpu: &mut CpuState, bus: &mut Bus) -> CpmOutcome {
        match call_no {
            BIOS_BOOT | BIOS_WBOOT => self.warm_boot(cpu, bus),
            BIOS_CONST => {
                cpu.a = 0x00;
                CpmOutcome::Continue
            }
            BIOS_CONIN => match self.console.read.as_mut() {
                Some(f) => {
                    cpu.a = f().unwrap_or(0x1A);
                    CpmOutcome::Continue
                }
                None => unimplemented_bios(call_no),
            },
            BIOS_CONOUT => match self.console.write.as_mut() {
                Some(f) => {
                    f(cpu.c);
                    CpmOutcome::Continue
                }
                None => unimplemented_bios(call_no),
            },
            n => unimplemented_bios(n),
        }
    }

    fn bdos_call(&mut self, cpu: &mut CpuState, bus: &mut Bus) -> CpmOutcome {
        match cpu.c {
            BDOS_WBOOT => self.warm_boot(cpu, bus),
            BDOS_CONOUT => match self.console.write.as_mut() {
                Some(f) => {
                    f(cpu.e);
                    CpmOutcome::Continue
                }
                None => unimplemented_bdos(BDOS_CONOUT),
            },
            BDOS_PRINT_STRING => {
                if self.console.write.is_none() {
                    return unimplemented_bdos(BDOS_PRINT_STRING);
                }
                let mut addr = ((cpu.d as u16) << 8) | cpu.e as u16;
                loop {
                    let byte = bus.read(addr);
                    if byte == STRING_TERMINATOR {
                        break;
                    }
                    if let Some(f) = self.console.write.as_mut() {
                        f(byte);
                    }
                    addr = addr.wrapping_add(1);
                }
                CpmOutcome::Continue
            }
            n => unimplemented_bdos(n),
        }
    }

    /// Grounded on `cpm80vm::warm_boot`: the first entry rewrites the
    /// page-zero BDOS vector and cold-boot vector to point at the real
    /// BDOS/BIOS-WBOOT trampolines and starts the resident program at
    /// the TPA origin; the second entry - the guest re-entering warm
    /// boot on its own, having nowhere else to go - ends the run.
    fn warm_boot(&mut self, cpu: &mut CpuState, bus: &mut Bus) -> CpmOutcome {
        self.wboot_count = self.wboot_count.saturating_add(1);
        match self.wboot_count {
            1 => {
                write_jmp(bus, 0x0005, self.bdos_addr);
                let wboot_entry = self.bios_table_addr.wrapping_add(3);
                write_jmp(bus, 0x0000, wboot_entry);

                // `cpm80vm::warm_boot` computes SP and pushes the WBOOT
                // reentry address with its own ad hoc push sequence
                // (write-high-then-decrement-then-write-low, rather
                // than decrement-then-write twice); initializing SP one
                // byte higher than the original and reusing the
                // crate's ordinary `push_u16` lands the same two bytes
                // at the same two addresses.
                cpu.sp = self.ccp_addr.wrapping_add(0x07ab);
                push_u16(cpu, bus, wboot_entry);

                cpu.pc = TPA_ORIGIN;
                CpmOutcome::Restarted
            }
            _ => CpmOutcome::Exited,
        }
    }
}

fn write_jmp(bus: &mut Bus, at: u16, target: u16) {
    bus.write(at, 0xC3); // JMP
    bus.write(at.wrapping_add(1), target as u8);
    bus.write(at.wrapping_add(2), (target >> 8) as u8);
}

fn unimplemented_bios(code: u8) -> CpmOutcome {
    CpmOutcome::Unimplemented {
        kind: UnimplementedKind::Bios,
        code: code as u16,
    }
}

fn unimplemented_bdos(code: u8) -> CpmOutcome {
    CpmOutcome::Unimplemented {
        kind: UnimplementedKind::Bdos,
        code: code as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::execute::pop_u16 as pop16;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn shim(memsize_kb: u16) -> (CpmShim, Bus) {
        let shim = CpmShim::new(memsize_kb, ConsoleHooks::new());
        let mut bus = Bus::new();
        shim.install(&mut bus);
        (shim, bus)
    }

    #[test]
    fn address_layout_matches_64k_formulas() {
        let (s, _bus) = shim(64);
        assert_eq!(s.ccp_addr, 1024 * 57);
        assert_eq!(s.bdos_addr, s.ccp_addr + 0x0806);
        assert_eq!(s.bios_table_addr, s.ccp_addr + 0x1600);
        assert_eq!(s.bios_impl_addr, 1024u32.wrapping_mul(64).wrapping_sub(51) as u16);
    }

    #[test]
    fn install_writes_cold_boot_vector_and_bios_table() {
        let (s, bus) = shim(64);
        assert_eq!(bus.read(0x0000), 0xC3);
        assert_eq!(
            bus.read(0x0001) as u16 | ((bus.read(0x0002) as u16) << 8),
            s.bios_table_addr
        );
        // Table entry 0 (BOOT) jumps into the first trampoline.
        assert_eq!(bus.read(s.bios_table_addr), 0xC3);
        let entry0 =
            bus.read(s.bios_table_addr + 1) as u16 | ((bus.read(s.bios_table_addr + 2) as u16) << 8);
        assert_eq!(entry0, s.bios_impl_addr);
        assert_eq!(bus.read(s.bios_impl_addr), 0xD3);
        assert_eq!(bus.read(s.bios_impl_addr + 2), 0xC9);
    }

    #[test]
    fn trap_kind_identifies_bios_calls_by_offset_and_bdos_by_exact_address() {
        let (s, _bus) = shim(64);
        assert_eq!(s.trap_kind(s.bios_impl_addr), Some(TrapKind::Bios(0)));
        assert_eq!(s.trap_kind(s.bios_impl_addr + 3), Some(TrapKind::Bios(1)));
        assert_eq!(s.trap_kind(s.bdos_addr), Some(TrapKind::Bdos));
        assert_eq!(s.trap_kind(0x1234), None);
    }

    #[test]
    fn first_warm_boot_rewrites_vectors_and_starts_tpa() {
        let (mut s, mut bus) = shim(64);
        let mut cpu = CpuState::new();
        let outcome = s.dispatch(TrapKind::Bios(BIOS_BOOT), &mut cpu, &mut bus);
        assert_eq!(outcome, CpmOutcome::Restarted);
        assert_eq!(cpu.pc, TPA_ORIGIN);

        // 0x0005 now jumps straight to the BDOS trampoline.
        assert_eq!(bus.read(0x0005), 0xC3);
        let bdos_vec = bus.read(0x0006) as u16 | ((bus.read(0x0007) as u16) << 8);
        assert_eq!(bdos_vec, s.bdos_addr);

        // A RET from wherever the program left its stack returns into
        // the WBOOT table entry (index 1).
        let ret = pop16(&mut cpu, &bus);
        assert_eq!(ret, s.bios_table_addr + 3);
    }

    #[test]
    fn second_warm_boot_exits() {
        let (mut s, mut bus) = shim(64);
        let mut cpu = CpuState::new();
        assert_eq!(
            s.dispatch(TrapKind::Bios(BIOS_BOOT), &mut cpu, &mut bus),
            CpmOutcome::Restarted
        );
        assert_eq!(
            s.dispatch(TrapKind::Bios(BIOS_WBOOT), &mut cpu, &mut bus),
            CpmOutcome::Exited
        );
    }

    #[test]
    fn conin_without_console_hook_is_unimplemented() {
        let (mut s, mut bus) = shim(64);
        let mut cpu = CpuState::new();
        let outcome = s.dispatch(TrapKind::Bios(BIOS_CONIN), &mut cpu, &mut bus);
        assert_eq!(
            outcome,
            CpmOutcome::Unimplemented {
                kind: UnimplementedKind::Bios,
                code: BIOS_CONIN as u16
            }
        );
    }

    #[test]
    fn conin_eof_maps_to_ascii_sub() {
        let mut shim = CpmShim::new(64, ConsoleHooks::new());
        shim.console.read = Some(Box::new(|| None));
        let mut bus = Bus::new();
        shim.install(&mut bus);
        let mut cpu = CpuState::new();
        shim.dispatch(TrapKind::Bios(BIOS_CONIN), &mut cpu, &mut bus);
        assert_eq!(cpu.a, 0x1A);
    }

    #[test]
    fn bdos_print_string_writes_until_dollar_terminator() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let out_clone = out.clone();
        let mut console = ConsoleHooks::new();
        console.write = Some(Box::new(move |b| out_clone.borrow_mut().push(b)));
        let mut s = CpmShim::new(64, console);
        let mut bus = Bus::new();
        s.install(&mut bus);

        bus.write_block(0x0200, b"HI$");
        let mut cpu = CpuState::new();
        cpu.c = BDOS_PRINT_STRING;
        cpu.d = 0x02;
        cpu.e = 0x00;
        let outcome = s.dispatch(TrapKind::Bdos, &mut cpu, &mut bus);
        assert_eq!(outcome, CpmOutcome::Continue);
        assert_eq!(*out.borrow(), b"HI");
    }

    #[test]
    fn bdos_conout_writes_register_e() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let out_clone = out.clone();
        let mut console = ConsoleHooks::new();
        console.write = Some(Box::new(move |b| out_clone.borrow_mut().push(b)));
        let mut s = CpmShim::new(64, console);
        let mut bus = Bus::new();
        s.install(&mut bus);

        let mut cpu = CpuState::new();
        cpu.c = BDOS_CONOUT;
        cpu.e = b'Z';
        s.dispatch(TrapKind::Bdos, &mut cpu, &mut bus);
        assert_eq!(*out.borrow(), vec![b'Z']);
    }

    #[test]
    fn unknown_bdos_function_is_unimplemented() {
        let (mut s, mut bus) = shim(64);
        let mut cpu = CpuState::new();
        cpu.c = 200;
        let outcome = s.dispatch(TrapKind::Bdos, &mut cpu, &mut bus);
        assert_eq!(
            outcome,
            CpmOutcome::Unimplemented {
                kind: UnimplementedKind::Bdos,
                code: 200
            }
        );
    }
}
