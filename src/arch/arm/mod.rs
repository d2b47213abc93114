use crate::{
    arch::{select_native_abi, ArchId, ArchProfile, Endianness, EntryValue, RegisterInfo},
    io_macros::register_table,
    tls,
};

const REGISTERS: &[RegisterInfo] = register_table!(
    4; "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp",
    "lr", "pc", "cpsr",
);

const ENTRY_REGISTERS: &[(&str, EntryValue)] = &[("r0", EntryValue::indicator("ld_destructor"))];

const ARMEL: ArchProfile = ArchProfile {
    id: ArchId::ArmEl,
    name: "ARMEL",
    bits: 32,
    endness: Endianness::Little,
    registers: REGISTERS,
    sp: "sp",
    ip: "pc",
    initial_sp: 0x7fff_0000,
    entry_registers: ENTRY_REGISTERS,
    syscall_abis: &["arm"],
    select_syscall_abi: select_native_abi,
    // TLS lives behind the kernel helper page; there is no user register.
    thread_pointer: None,
    bootstrap_tls: tls::hook_kernel_helper_page,
    rtld_global: None,
    supports_ifunc: false,
    reserved_stack_words: 0,
    segment_sync: None,
};

pub(super) static PROFILE_EL: ArchProfile = ARMEL;

pub(super) static PROFILE_HF: ArchProfile = ArchProfile {
    id: ArchId::ArmHf,
    name: "ARMHF",
    syscall_abis: &["arm", "armhf"],
    ..ARMEL
};
