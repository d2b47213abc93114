use crate::{
    arch::{
        no_tls_bootstrap, select_native_abi, ArchId, ArchProfile, Endianness, EntryValue,
        ThreadPointerRegister,
    },
    io_macros::register_table,
};

// o32 and n32/n64 share the register naming; only the width differs.
macro_rules! mips_registers {
    ($size:expr) => {
        register_table!(
            $size; "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3",
            "t4", "t5", "t6", "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9",
            "k0", "k1", "gp", "sp", "s8", "ra", "pc", "hi", "lo", "ulr",
        )
    };
}

const ENTRY_REGISTERS: &[(&str, EntryValue)] = &[
    ("v0", EntryValue::indicator("ld_destructor")),
    ("ra", EntryValue::Literal(0)),
];

const MIPS32: ArchProfile = ArchProfile {
    id: ArchId::Mips32,
    name: "MIPS32",
    bits: 32,
    endness: Endianness::Big,
    registers: mips_registers!(4),
    sp: "sp",
    ip: "pc",
    initial_sp: 0x7fff_0000,
    entry_registers: ENTRY_REGISTERS,
    syscall_abis: &["mips-o32"],
    select_syscall_abi: select_native_abi,
    thread_pointer: Some(ThreadPointerRegister {
        name: "ulr",
        shift: 0,
    }),
    bootstrap_tls: no_tls_bootstrap,
    rtld_global: None,
    supports_ifunc: false,
    reserved_stack_words: 0,
    segment_sync: None,
};

pub(super) static PROFILE_32: ArchProfile = MIPS32;

pub(super) static PROFILE_64: ArchProfile = ArchProfile {
    id: ArchId::Mips64,
    name: "MIPS64",
    bits: 64,
    registers: mips_registers!(8),
    initial_sp: 0x7fff_ffff_fff0_000,
    syscall_abis: &["mips-n32", "mips-n64"],
    ..MIPS32
};
