/*!
interrupt.rs - Asynchronous interrupt request latch.

Overview
========
`IntrLatch` is the producer/consumer boundary between a host thread
(e.g. a keyboard-watcher thread) and the CPU's fetch/execute loop. The
producer calls `request_interrupt()` from any thread; the consumer
(`Cpu::step`) tests-and-clears the pending flag once, at instruction
boundaries only, per spec.md §4.4 ("never mid-instruction, never across
a bus callback").

Grounded on the original's `i8080_intr_lock_create`/`i8080_interrupt`
mutex-guarded critical section (`libi8080/include/i8080/i8080.h`), with
the platform-specific mutex macro layer replaced by `std::sync::Mutex`
(see DESIGN.md OQ-1: this isn't a signal-handler context in safe Rust,
so a plain `Mutex` suffices where the original reached for something
async-signal-safe).
*/

use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct LatchState {
    enabled: bool,
    requested: bool,
}

/// Cloneable handle around a shared interrupt request latch.
#[derive(Clone, Debug, Default)]
pub struct IntrLatch {
    inner: Arc<Mutex<LatchState>>,
}

impl IntrLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by EI/DI to arm or disarm interrupt acceptance.
    pub fn set_enabled(&self, enabled: bool) {
        let mut guard = self.inner.lock().expect("interrupt latch poisoned");
        guard.enabled = enabled;
        if !enabled {
            guard.requested = false;
        }
    }

    pub fn enabled(&self) -> bool {
        self.inner.lock().expect("interrupt latch poisoned").enabled
    }

    /// Peek whether a request is currently latched, without consuming
    /// it. Used by callers (e.g. the CP/M shim's host-trap detection)
    /// that must give a pending interrupt priority over anything else
    /// without racing `take_requested`'s own test-and-clear.
    pub fn is_requested(&self) -> bool {
        self.inner.lock().expect("interrupt latch poisoned").requested
    }

    /// Raise a request. No-op if interrupts are currently disabled,
    /// matching the "silently ignored while masked" behavior of real
    /// 8080 hardware and of the original's `i8080_interrupt`.
    pub fn request_interrupt(&self) {
        let mut guard = self.inner.lock().expect("interrupt latch poisoned");
        if guard.enabled {
            guard.requested = true;
        }
    }

    /// Test-and-clear: true at most once per raised request, called
    /// only at an instruction boundary.
    pub fn take_requested(&self) -> bool {
        let mut guard = self.inner.lock().expect("interrupt latch poisoned");
        if guard.requested {
            guard.requested = false;
            true
        } else {
            false
        }
    }
}
