#![doc = r#"
i8080emu: an Intel 8080 interpreter with a CP/M-2.2 environment shim.

This crate exposes the emulator core for use by the `i8080emu` CLI
binary and by embedders who want a bare interpreter plus optional
CP/M 2.2 support without a real BIOS image.

Modules:
- bus: 64 KiB guest memory plus the host-callback bundle (I/O ports,
  interrupt-vector fetch)
- cpu: the instruction interpreter - pure flag/arithmetic kernel,
  architectural register/flag state, per-opcode-family dispatch, the
  asynchronous interrupt latch, and the `Cpu` façade
- cpm: the CP/M 2.2 BIOS/BDOS shim and host-trap mechanism
- vm: `Vm`, the top-level composition of `Cpu` + `Bus` + an optional
  CP/M shim, with a latched exit code
- loader: range-checked program loading into the Transient Program Area
- dph: CP/M Disk Parameter Header / Block computation
- error: the error taxonomy shared across the above
"#]

pub mod bus;
pub mod cpm;
pub mod cpu;
pub mod dph;
pub mod error;
pub mod loader;
pub mod vm;

pub use bus::{Bus, BusHooks};
pub use cpu::{Cpu, CpuRegs, IntrLatch};
pub use error::{LoadError, StepError, VmExitCode};
pub use vm::Vm;
