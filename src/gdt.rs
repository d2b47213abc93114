//! A fabricated i386 global descriptor table, enough for segment-relative
//! loads through `fs` and `gs` to resolve against a known base.

use crate::{error::StateError, state::ProcessState};

pub const GDT_ADDR: u64 = 0x4000;
pub const GDT_LIMIT: u64 = 0x1000;

// Access byte
pub const A_PRESENT: u8 = 0x80;
pub const A_DATA: u8 = 0x10;
pub const A_DATA_WRITABLE: u8 = 0x2;
pub const A_PRIV_0: u8 = 0x0;
pub const A_DIR_CON_BIT: u8 = 0x4;

// Flags nibble
pub const F_PROT_32: u8 = 0x4;

// Selector bits
pub const S_GDT: u16 = 0x0;
pub const S_PRIV_0: u16 = 0x0;

pub const FULL_LIMIT: u32 = 0xFFFF_FFFF;

const ENTRY_COUNT: usize = 4;

/// Packs one 8-byte segment descriptor.
pub const fn create_gdt_entry(base: u32, limit: u32, access: u8, flags: u8) -> u64 {
    let (base, limit) = (base as u64, limit as u64);
    (limit & 0xffff)
        | (base & 0xff_ffff) << 16
        | (access as u64) << 40
        | ((limit >> 16) & 0xf) << 48
        | (flags as u64) << 52
        | ((base >> 24) & 0xff) << 56
}

pub const fn create_selector(index: u16, flags: u16) -> u16 {
    flags | index << 3
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalDescriptorTable {
    pub addr: u64,
    pub limit: u64,
    /// Entries 1..=4; entry 0 is the implicit null descriptor.
    pub entries: [u64; ENTRY_COUNT],
    /// Value for the `gdt` pseudo-register: base in the high bits, limit low.
    pub gdt: u64,
    pub cs: u16,
    pub ds: u16,
    pub es: u16,
    pub ss: u16,
    pub fs: u16,
    pub gs: u16,
}

impl GlobalDescriptorTable {
    /// Little-endian table bytes, as stored at `addr + 8`.
    pub fn table_bytes(&self) -> [u8; ENTRY_COUNT * 8] {
        let mut bytes = [0; ENTRY_COUNT * 8];
        for (chunk, entry) in bytes.chunks_exact_mut(8).zip(self.entries) {
            chunk.copy_from_slice(&entry.to_le_bytes());
        }
        bytes
    }
}

/// Flat data, stack, fs and gs segments, with fs and gs based at the given
/// addresses.
pub fn generate_gdt(fs: u32, gs: u32) -> GlobalDescriptorTable {
    let data = A_PRESENT | A_DATA | A_DATA_WRITABLE | A_PRIV_0;
    let normal = create_gdt_entry(0, FULL_LIMIT, data | A_DIR_CON_BIT, F_PROT_32);
    let stack = create_gdt_entry(0, FULL_LIMIT, data, F_PROT_32);
    let fs_entry = create_gdt_entry(fs, FULL_LIMIT, data | A_DIR_CON_BIT, F_PROT_32);
    let gs_entry = create_gdt_entry(gs, FULL_LIMIT, data | A_DIR_CON_BIT, F_PROT_32);

    let flat = create_selector(1, S_GDT | S_PRIV_0);
    GlobalDescriptorTable {
        addr: GDT_ADDR,
        limit: GDT_LIMIT,
        entries: [normal, stack, fs_entry, gs_entry],
        gdt: GDT_ADDR << 16 | GDT_LIMIT,
        cs: flat,
        ds: flat,
        es: flat,
        ss: create_selector(2, S_GDT | S_PRIV_0),
        fs: create_selector(3, S_GDT | S_PRIV_0),
        gs: create_selector(4, S_GDT | S_PRIV_0),
    }
}

/// Installs `gdt` in the state's memory and loads every segment register.
pub fn setup_gdt(state: &mut ProcessState, gdt: &GlobalDescriptorTable) -> Result<(), StateError> {
    state.memory.store(gdt.addr + 8, &gdt.table_bytes());
    state.store_register("gdt", gdt.gdt)?;
    for (reg, selector) in [
        ("cs", gdt.cs),
        ("ds", gdt.ds),
        ("es", gdt.es),
        ("ss", gdt.ss),
        ("fs", gdt.fs),
        ("gs", gdt.gs),
    ] {
        state.store_register(reg, selector as u64)?;
    }
    Ok(())
}
