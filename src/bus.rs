/*!
bus.rs - 64 KiB guest memory plus the host-callback bundle.

Overview
========
`Bus` owns the flat, total (no holes) memory map addressed by the
interpreter and the small set of host callbacks that let the guest
reach outside the emulated machine: port I/O and interrupt-vector
fetch. Memory read/write are not callbacks here - they are ordinary
array access against the array this struct owns, which plays the role
of the "mandatory" `mem_read`/`mem_write` callbacks in a hosted
embedding (spec.md's callback list is written for a C host that does
not itself own the memory array; in this crate the VM wrapper always
owns it, so those two become plain methods instead of optional
function pointers).

Responsibilities
================
- Total byte-addressable memory, wrapping modulo 2^16 on any address
  arithmetic performed by callers.
- A small typed bundle of optional closures (`BusHooks`) for I/O port
  access and interrupt-vector fetch, installed once at construction
  (spec.md §9: "the VM owns its callbacks as a small typed set").
- `io_read`/`io_write`/`intr_read` return `Err(StepError::MissingHandler)`
  when the corresponding hook was never installed, rather than
  panicking or silently returning a default.
*/

use crate::error::StepError;

const MEM_SIZE: usize = 1 << 16;

/// The host-side capability bundle. Any field left `None` means the
/// corresponding instruction fails with `StepError::MissingHandler`
/// instead of silently succeeding.
#[derive(Default)]
pub struct BusHooks {
    pub io_read: Option<Box<dyn FnMut(u8) -> u8>>,
    pub io_write: Option<Box<dyn FnMut(u8, u8)>>,
    pub intr_read: Option<Box<dyn FnMut() -> u8>>,
}

impl BusHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Flat 64 KiB memory array plus the installed host hooks.
pub struct Bus {
    memory: Box<[u8; MEM_SIZE]>,
    hooks: BusHooks,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0u8; MEM_SIZE]),
            hooks: BusHooks::new(),
        }
    }

    pub fn with_hooks(hooks: BusHooks) -> Self {
        Self {
            memory: Box::new([0u8; MEM_SIZE]),
            hooks,
        }
    }

    pub fn set_hooks(&mut self, hooks: BusHooks) {
        self.hooks = hooks;
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    /// Copy `data` into guest memory starting at `begin`, wrapping
    /// modulo 2^16. Callers are responsible for range validation;
    /// see `loader::load_program` for the checked entry point.
    pub fn write_block(&mut self, begin: u16, data: &[u8]) {
        let mut addr = begin;
        for &byte in data {
            self.memory[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    pub fn read_block(&self, begin: u16, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        let mut addr = begin;
        for _ in 0..len {
            out.push(self.memory[addr as usize]);
            addr = addr.wrapping_add(1);
        }
        out
    }

    pub fn io_read(&mut self, port: u8) -> Result<u8, StepError> {
        match self.hooks.io_read.as_mut() {
            Some(f) => Ok(f(port)),
            None => {
                log::warn!("ignored IN from port {port} (no io_read handler installed)");
                Err(StepError::MissingHandler("io_read"))
            }
        }
    }

    pub fn io_write(&mut self, port: u8, value: u8) -> Result<(), StepError> {
        match self.hooks.io_write.as_mut() {
            Some(f) => {
                f(port, value);
                Ok(())
            }
            None => {
                log::warn!(
                    "ignored OUT to port {port} with data {value} (no io_write handler installed)"
                );
                Err(StepError::MissingHandler("io_write"))
            }
        }
    }

    pub fn intr_read(&mut self) -> Result<u8, StepError> {
        match self.hooks.intr_read.as_mut() {
            Some(f) => Ok(f()),
            None => {
                log::warn!("ignored interrupt request (no intr_read handler installed)");
                Err(StepError::MissingHandler("intr_read"))
            }
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
