use crate::{
    arch::{
        no_tls_bootstrap, select_native_abi, ArchId, ArchProfile, Endianness, EntryValue,
        ThreadPointerRegister,
    },
    io_macros::register_table,
};

macro_rules! ppc_registers {
    ($size:expr) => {
        register_table!(
            $size; "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11",
            "r12", "r13", "r14", "r15", "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23",
            "r24", "r25", "r26", "r27", "r28", "r29", "r30", "r31", "pc", "lr", "ctr",
        )
    };
}

const PPC32: ArchProfile = ArchProfile {
    id: ArchId::Ppc32,
    name: "PPC32",
    bits: 32,
    endness: Endianness::Big,
    registers: ppc_registers!(4),
    sp: "r1",
    ip: "pc",
    initial_sp: 0x7fff_0000,
    entry_registers: &[
        ("r3", EntryValue::indicator("argc")),
        ("r4", EntryValue::indicator("argv")),
        ("r5", EntryValue::indicator("envp")),
        ("r6", EntryValue::indicator("auxv")),
        ("r7", EntryValue::indicator("ld_destructor")),
    ],
    syscall_abis: &["ppc"],
    select_syscall_abi: select_native_abi,
    thread_pointer: Some(ThreadPointerRegister {
        name: "r2",
        shift: 0,
    }),
    bootstrap_tls: no_tls_bootstrap,
    rtld_global: None,
    supports_ifunc: false,
    // The SVR4 PPC startup code expects a small zeroed back-chain area below argc.
    reserved_stack_words: 4,
    segment_sync: None,
};

pub(super) static PROFILE_32: ArchProfile = PPC32;

pub(super) static PROFILE_64: ArchProfile = ArchProfile {
    id: ArchId::Ppc64,
    name: "PPC64",
    bits: 64,
    registers: ppc_registers!(8),
    initial_sp: 0x7fff_ffff_fff0_000,
    entry_registers: &[
        ("r2", EntryValue::indicator("toc")),
        ("r3", EntryValue::indicator("argc")),
        ("r4", EntryValue::indicator("argv")),
        ("r5", EntryValue::indicator("envp")),
        ("r6", EntryValue::indicator("auxv")),
        ("r7", EntryValue::indicator("ld_destructor")),
    ],
    syscall_abis: &["ppc64"],
    thread_pointer: Some(ThreadPointerRegister {
        name: "r13",
        shift: 0,
    }),
    reserved_stack_words: 0,
    ..PPC32
};
