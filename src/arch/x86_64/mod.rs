use crate::{
    arch::{
        ArchId, ArchProfile, Endianness, EntryValue, RtldGlobalSlots, SegmentSync,
        ThreadPointerRegister,
    },
    error::SyscallError,
    io_macros::register_tables,
    syscall::JumpKind,
    tls,
};

/// `mov rax, fs:[0]` padded with nops; on Linux fs:[0] holds the TCB self pointer.
const READ_FS0: &[u8] = &[
    0x64, 0x48, 0x8B, 0x04, 0x25, 0x00, 0x00, 0x00, 0x00, 0x90, 0x90, 0x90, 0x90,
];

pub(super) static PROFILE: ArchProfile = ArchProfile {
    id: ArchId::Amd64,
    name: "AMD64",
    bits: 64,
    endness: Endianness::Little,
    registers: register_tables!(
        8 => [
            "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "rsp", "r8", "r9", "r10", "r11",
            "r12", "r13", "r14", "r15", "rip", "rflags", "fs", "gs",
        ],
        2 => ["cs", "ds", "es", "ss"],
    ),
    sp: "rsp",
    ip: "rip",
    initial_sp: 0x07ff_ffff_ffff_0000,
    entry_registers: &[
        ("rax", EntryValue::Literal(0x1c)),
        ("rdx", EntryValue::indicator("ld_destructor")),
        ("rflags", EntryValue::Literal(0x200)),
    ],
    syscall_abis: &["i386", "amd64"],
    select_syscall_abi,
    thread_pointer: Some(ThreadPointerRegister {
        name: "fs",
        shift: 0,
    }),
    bootstrap_tls: tls::write_stack_guards,
    rtld_global: Some(RtldGlobalSlots {
        lock_recursive: 0xF08,
        unlock_recursive: 0xF10,
        error_catch_tsd: 0x990,
    }),
    supports_ifunc: true,
    reserved_stack_words: 0,
    segment_sync: Some(SegmentSync {
        register: "fs",
        shellcode: READ_FS0,
        exfiltration_register: "rax",
    }),
};

/// A 64-bit kernel still accepts `int 0x80` with the i386 syscall table.
fn select_syscall_abi(
    profile: &ArchProfile,
    jumpkind: &JumpKind,
) -> Result<&'static str, SyscallError> {
    match jumpkind {
        JumpKind::SysInt128 => Ok("i386"),
        JumpKind::SysSyscall => Ok("amd64"),
        other => Err(SyscallError::UnknownTrap {
            arch: profile.name,
            jumpkind: other.as_str().to_owned(),
        }),
    }
}
