//! `i8080emu` - load a binary and run it against the `i8080emu` library
//! crate's interpreter, optionally under a CP/M 2.2 console shim.
//!
//! Out of scope for the crate's hard core (spec.md's external
//! collaborators): argument parsing, file loading, and console stream
//! selection all live here rather than in `i8080emu::vm`. Grounded on
//! `shell/src/main.cpp`'s `cxxopts` option set (`-c`/`--cpmcon`,
//! `-i`/`--kintr`) and `shell/src/emu.cpp`'s `emu_init`/`emu_run`
//! split, translated to a `clap` derive CLI the way the sibling
//! `rust-dos` emulator in the example pack structures its own
//! binary entrypoint.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use i8080emu::bus::BusHooks;
use i8080emu::cpm::ConsoleHooks;
use i8080emu::error::VmExitCode;
use i8080emu::vm::Vm;

/// CP/M machine size in KiB; only meaningful with `--cpmcon`.
const CPM_MEMSIZE_KB: u16 = 64;

/// Generous ceiling so a misbehaving guest program cannot spin forever
/// under automated use; interactive runs rarely approach it.
const MAX_INSTRUCTIONS: usize = 50_000_000;

#[derive(Parser, Debug)]
#[command(name = "i8080emu", about = "Emulate an Intel 8080 microprocessor.")]
struct Args {
    /// Path to a raw binary image (a CP/M `.COM` file in `--cpmcon` mode).
    file: PathBuf,

    /// Emulate a CP/M-80 console: install the BIOS/BDOS shim and load
    /// the program at the Transient Program Area origin (0x0100).
    #[arg(short = 'c', long = "cpmcon")]
    cpmcon: bool,

    /// Translate host keyboard interrupts (Ctrl-C on the controlling
    /// terminal) into CPU interrupts instead of terminating the process.
    #[arg(short = 'i', long = "kintr")]
    kintr: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let data = match std::fs::read(&args.file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("i8080emu: error: {} could not be opened: {e}", args.file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut vm = if args.cpmcon {
        Vm::with_cpm(CPM_MEMSIZE_KB, console_hooks(), bus_hooks())
    } else {
        Vm::new(bus_hooks())
    };

    if let Err(e) = vm.load_program(&data) {
        eprintln!("i8080emu: error: {} could not be loaded: {e}", args.file.display());
        return ExitCode::FAILURE;
    }

    if args.kintr {
        spawn_keyboard_interrupt_watcher(vm.interrupt_handle());
    }

    match run(&mut vm, args.kintr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("i8080emu: error: {msg}");
            ExitCode::FAILURE
        }
    }
}

/// Drive the VM until it latches a terminal exit code or the
/// instruction budget runs out. Per spec.md §5, a halted CPU with no
/// pending interrupt is still "running" as far as the VM's own exit
/// codes are concerned - nothing obliges the host to keep calling
/// `step()`. Without `--kintr` there is no producer thread that could
/// ever wake such a CPU back up, so this host stops polling as soon as
/// it sees one, rather than spinning through the rest of the budget
/// doing nothing.
fn run(vm: &mut Vm, kintr: bool) -> Result<(), String> {
    for _ in 0..MAX_INSTRUCTIONS {
        if !vm.exit_code().is_running() {
            break;
        }
        if vm.cpu().is_halted() && !kintr {
            break;
        }
        vm.step().map_err(|e| format!("CPU step failed: {e}"))?;
    }

    match vm.exit_code() {
        VmExitCode::Running => {
            if !vm.cpu().is_halted() {
                log::warn!("instruction budget exhausted after {MAX_INSTRUCTIONS} steps");
            }
            Ok(())
        }
        VmExitCode::ProgramExit => Ok(()),
        VmExitCode::UnimplementedSyscall { kind, code } => {
            Err(format!("unimplemented CP/M {kind:?} call {code}"))
        }
        VmExitCode::MissingHandler(which) => Err(format!("no {which} handler installed")),
    }
}

/// Bare-interpreter I/O: no ports wired up, no interrupt source beyond
/// whatever `--kintr` installs. Matches `emu.cpp`'s non-CP/M
/// `intr_read`, which always hands back NOP.
fn bus_hooks() -> BusHooks {
    let mut hooks = BusHooks::new();
    hooks.intr_read = Some(Box::new(|| 0x00));
    hooks
}

/// Console hooks for the CP/M shim: CONIN reads one byte from stdin,
/// CONOUT/print-string write to stdout.
fn console_hooks() -> ConsoleHooks {
    let mut console = ConsoleHooks::new();
    console.read = Some(Box::new(|| {
        let mut byte = [0u8; 1];
        match std::io::stdin().read_exact(&mut byte) {
            Ok(()) => Some(byte[0]),
            Err(_) => None,
        }
    }));
    console.write = Some(Box::new(|b| {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = lock.write_all(&[b]);
        let _ = lock.flush();
    }));
    console
}

/// A simplified stand-in for `keyintr.hpp`'s SIGINT interception:
/// rather than installing a real signal handler, watch stdin on a
/// background thread for an ASCII ETX (Ctrl-C, 0x03) byte and raise a
/// CPU interrupt instead of letting the terminal kill the process.
/// Demonstrates the same producer/consumer handoff across
/// `IntrLatch::request_interrupt` without pulling in a signal-handling
/// dependency for a CLI feature outside the crate's hard core.
fn spawn_keyboard_interrupt_watcher(intr: i8080emu::IntrLatch) {
    std::thread::spawn(move || {
        let mut byte = [0u8; 1];
        loop {
            match std::io::stdin().read_exact(&mut byte) {
                Ok(()) => {
                    if byte[0] == 0x03 {
                        intr.request_interrupt();
                    }
                }
                Err(_) => break,
            }
        }
    });
}
