/*!
dph.rs - CP/M Disk Parameter Header computation.

Overview
========
Pure, side-effect-free translation from a disk's physical geometry to
the values CP/M's Disk Parameter Header (DPH) and the Disk Parameter
Block (DPB) it points at would hold: sectors-per-track, block shift/
mask, extent mask, disk/directory block counts, the directory
allocation bitmap, and the checksum-vector size and track offset.
Grounded on `get_disk_parameter_block` in `cpm80_bios.c`.

Serializing this into guest memory alongside a live sector-translate
table is out of scope (spec.md's Non-goals) - this module only
produces the numbers a BIOS `SELDSK` implementation would need to
write one.
*/

/// Physical geometry of one disk drive, in the terms CP/M's `GETSYS`
/// data table uses.
#[derive(Debug, Clone, Copy)]
pub struct DiskGeometry {
    /// First physical sector number (usually 1).
    pub first_sector: u16,
    /// Last physical sector number per track.
    pub last_sector: u16,
    /// Sector skew factor (unused by this computation; carried for
    /// callers that also need to build a translate table).
    pub skew_factor: u16,
    /// Allocation block size in bytes (e.g. 1024, 2048, 4096).
    pub block_size: u16,
    /// Total allocation blocks on the disk.
    pub disk_blocks: u16,
    /// Total directory entries.
    pub dir_entries: u16,
    /// Directory entries covered by the checksum vector.
    pub checksum_entries: u16,
    /// Reserved (system) tracks before the data area begins.
    pub track_offset: u16,
    /// True for "true" (EXM-bearing) extents on DSM > 255 disks, per
    /// the CP/M 2.2 Alteration Guide's 16K-extent-block convention.
    pub extent_mask_16k: bool,
}

/// Computed Disk Parameter Header / Block fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskParameterHeader {
    pub spt: u16,
    pub bsh: u8,
    pub blm: u8,
    pub exm: u8,
    pub dsm: u16,
    pub drm: u16,
    pub al0: u8,
    pub al1: u8,
    pub cks: u16,
    pub off: u16,
}

/// Derive a [`DiskParameterHeader`] from physical [`DiskGeometry`].
pub fn disk_parameter_header(geo: &DiskGeometry) -> DiskParameterHeader {
    let spt = geo.last_sector - geo.first_sector + 1;
    let dsm = geo.disk_blocks - 1;
    let drm = geo.dir_entries - 1;
    let cks = geo.checksum_entries / 4;
    let off = geo.track_offset;

    let (bsh, blm) = block_shift_and_mask(geo.block_size);
    let exm = extent_mask(geo);
    let (al0, al1) = directory_allocation_bitmap(geo);

    DiskParameterHeader {
        spt,
        bsh,
        blm,
        exm,
        dsm,
        drm,
        al0,
        al1,
        cks,
        off,
    }
}

/// BSH/BLM: how many records (128-byte logical sectors) fit in one
/// allocation block, expressed as a shift amount and its matching mask.
fn block_shift_and_mask(block_size: u16) -> (u8, u8) {
    let mut records_per_block = block_size / 128;
    let mut shift = 0u8;
    let mut mask = 0u8;
    while records_per_block > 1 {
        shift += 1;
        mask = (mask << 1) | 1;
        records_per_block >>= 1;
    }
    (shift, mask)
}

/// EXM: how many 16 KiB units make up one directory extent, halved
/// again on disks with more than 256 allocation blocks (16-bit DSM).
fn extent_mask(geo: &DiskGeometry) -> u8 {
    if !geo.extent_mask_16k {
        return 0;
    }
    let mut units_per_extent = geo.block_size / 1024;
    let mut exm = 0u8;
    while units_per_extent > 1 {
        exm = (exm << 1) | 1;
        units_per_extent >>= 1;
    }
    if geo.disk_blocks > 256 {
        exm >>= 1;
    }
    exm
}

/// AL0/AL1: a 16-bit bitmap (MSB first) marking which allocation
/// blocks are permanently reserved for the directory.
fn directory_allocation_bitmap(geo: &DiskGeometry) -> (u8, u8) {
    let entries_per_block = geo.block_size / 32;
    let mut remaining = geo.dir_entries;
    let mut bitmap: u16 = 0;
    while remaining > 0 {
        bitmap = (bitmap >> 1) | 0x8000;
        remaining = remaining.saturating_sub(entries_per_block);
    }
    ((bitmap >> 8) as u8, (bitmap & 0xFF) as u8)
}
