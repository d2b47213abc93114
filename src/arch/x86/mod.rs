use crate::{
    arch::{
        select_native_abi, ArchId, ArchProfile, Endianness, EntryValue, SegmentSync,
        ThreadPointerRegister,
    },
    io_macros::register_tables,
    tls,
};

/// `mov eax, gs:[0]` padded with nops.
const READ_GS0: &[u8] = &[0x65, 0xA1, 0x00, 0x00, 0x00, 0x00, 0x90, 0x90, 0x90, 0x90];

pub(super) static PROFILE: ArchProfile = ArchProfile {
    id: ArchId::X86,
    name: "X86",
    bits: 32,
    endness: Endianness::Little,
    registers: register_tables!(
        4 => ["eax", "ebx", "ecx", "edx", "esi", "edi", "ebp", "esp", "eip", "eflags"],
        2 => ["cs", "ds", "es", "fs", "gs", "ss"],
        8 => ["gdt", "ldt"],
    ),
    sp: "esp",
    ip: "eip",
    initial_sp: 0x7fff_f000,
    entry_registers: &[
        ("eax", EntryValue::Literal(0x1c)),
        ("edx", EntryValue::indicator("ld_destructor")),
        ("ebp", EntryValue::Literal(0)),
    ],
    syscall_abis: &["i386"],
    select_syscall_abi: select_native_abi,
    thread_pointer: Some(ThreadPointerRegister {
        name: "gs",
        shift: 16,
    }),
    bootstrap_tls: tls::write_sysinfo_pointer,
    rtld_global: None,
    supports_ifunc: true,
    reserved_stack_words: 0,
    segment_sync: Some(SegmentSync {
        register: "gs",
        shellcode: READ_GS0,
        exfiltration_register: "eax",
    }),
};
