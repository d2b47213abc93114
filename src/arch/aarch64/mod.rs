use crate::{
    arch::{
        no_tls_bootstrap, select_native_abi, ArchId, ArchProfile, Endianness, EntryValue,
        ThreadPointerRegister,
    },
    io_macros::register_table,
};

pub(super) static PROFILE: ArchProfile = ArchProfile {
    id: ArchId::AArch64,
    name: "AARCH64",
    bits: 64,
    endness: Endianness::Little,
    registers: register_table!(
        8; "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12",
        "x13", "x14", "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24",
        "x25", "x26", "x27", "x28", "x29", "x30", "sp", "pc", "tpidr_el0",
    ),
    sp: "sp",
    ip: "pc",
    initial_sp: 0x7fff_ffff_fff0_000,
    entry_registers: &[("x0", EntryValue::indicator("ld_destructor"))],
    syscall_abis: &["aarch64"],
    select_syscall_abi: select_native_abi,
    thread_pointer: Some(ThreadPointerRegister {
        name: "tpidr_el0",
        shift: 0,
    }),
    bootstrap_tls: no_tls_bootstrap,
    rtld_global: None,
    supports_ifunc: false,
    reserved_stack_words: 0,
    segment_sync: None,
};
