/*!
loader.rs - Range-checked guest program loading.

Overview
========
Copies a `.COM`-style program image into guest memory starting at the
Transient Program Area origin, rejecting any range that would overlap
system memory (below the TPA origin, or at/above the CP/M CCP base
when a CP/M shim is installed). Grounded on `cpm80vm::program_write`'s
range check.
*/

use crate::bus::Bus;
use crate::error::LoadError;

pub use crate::cpm::TPA_ORIGIN;

/// Copy `data` into guest memory at [`TPA_ORIGIN`]. `ccp_addr` is the
/// first address considered system memory (pass `0x0000` - or rather
/// the actual top of a 64 KiB space, `0x10000` - when there is no CP/M
/// shim installed and the whole address space past the origin is
/// fair game; `Vm::load_program` picks the right bound for its mode).
pub fn load_program(bus: &mut Bus, ccp_addr: u32, data: &[u8]) -> Result<(), LoadError> {
    if data.is_empty() {
        return Ok(());
    }

    let last = TPA_ORIGIN as u32 + data.len() as u32 - 1;
    if last >= ccp_addr {
        return Err(LoadError::OutOfRange {
            begin: TPA_ORIGIN,
            end: last as u16,
        });
    }

    bus.write_block(TPA_ORIGIN, data);
    Ok(())
}
