/*!
error.rs - Error taxonomy for the interpreter, CP/M shim, and loader.

Overview
========
Three independent error types cover the three places this crate can
fail to make progress:

  - `StepError`: returned by a single `Cpu::step` call when the
    interpreter needed a host callback that was not installed.
  - `VmExitCode`: latched by the `Vm` wrapper once execution can no
    longer continue in the "still running" sense (program exit,
    unimplemented CP/M call, or a propagated `StepError`).
  - `LoadError`: returned synchronously by `load_program`; never
    touches VM state.

Design Notes
============
`StepError` carries just enough context for a `log::error!` call at
the site that observed it; it never panics and never swallows a
failure silently, matching the "no error is ever swallowed silently"
policy from the interpreter's error-handling design.
*/

use thiserror::Error;

/// A single `Cpu::step` failed because a required host callback was
/// missing. `io_read`/`io_write`/`intr_read` are all optional; when
/// absent, the instruction that needed them cannot complete.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    #[error("no {0} handler installed")]
    MissingHandler(&'static str),
}

/// Reason a program load into guest memory was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    #[error("program range {begin:#06x}..{end:#06x} overlaps system memory")]
    OutOfRange { begin: u16, end: u16 },
}

/// Latched VM run state. Once non-`Running`, `Vm::step` short-circuits
/// and returns the same code until `Vm::reset` clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmExitCode {
    /// Still executing normally.
    Running,
    /// The guest program re-entered warm-boot a second time.
    ProgramExit,
    /// The CP/M shim saw a BIOS or BDOS call outside its implemented set.
    UnimplementedSyscall { kind: UnimplementedKind, code: u16 },
    /// The interpreter needed a host callback that was not installed.
    MissingHandler(&'static str),
}

/// Which half of the CP/M shim produced an unimplemented-call exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnimplementedKind {
    Bios,
    Bdos,
}

impl VmExitCode {
    /// True while the VM has not latched a terminal or error state.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, VmExitCode::Running)
    }
}

impl From<StepError> for VmExitCode {
    fn from(e: StepError) -> Self {
        match e {
            StepError::MissingHandler(which) => VmExitCode::MissingHandler(which),
        }
    }
}
