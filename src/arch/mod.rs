use phf::phf_map;
use smallvec::SmallVec;
use std::{borrow::Cow, fmt};

use crate::{error::ConfigError, error::SyscallError, syscall::JumpKind, tls::TlsContext};

mod aarch64;
mod arm;
mod mips;
mod ppc;
mod x86;
mod x86_64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchId {
    X86,
    Amd64,
    ArmEl,
    ArmHf,
    AArch64,
    Mips32,
    Mips64,
    Ppc32,
    Ppc64,
}

impl ArchId {
    pub const ALL: [ArchId; 9] = [
        ArchId::X86,
        ArchId::Amd64,
        ArchId::ArmEl,
        ArchId::ArmHf,
        ArchId::AArch64,
        ArchId::Mips32,
        ArchId::Mips64,
        ArchId::Ppc32,
        ArchId::Ppc64,
    ];

    pub fn profile(self) -> &'static ArchProfile {
        match self {
            ArchId::X86 => &x86::PROFILE,
            ArchId::Amd64 => &x86_64::PROFILE,
            ArchId::ArmEl => &arm::PROFILE_EL,
            ArchId::ArmHf => &arm::PROFILE_HF,
            ArchId::AArch64 => &aarch64::PROFILE,
            ArchId::Mips32 => &mips::PROFILE_32,
            ArchId::Mips64 => &mips::PROFILE_64,
            ArchId::Ppc32 => &ppc::PROFILE_32,
            ArchId::Ppc64 => &ppc::PROFILE_64,
        }
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }
}

static ARCHITECTURES: phf::Map<&'static str, ArchId> = phf_map! {
    "X86" => ArchId::X86,
    "AMD64" => ArchId::Amd64,
    "ARMEL" => ArchId::ArmEl,
    "ARMHF" => ArchId::ArmHf,
    "AARCH64" => ArchId::AArch64,
    "MIPS32" => ArchId::Mips32,
    "MIPS64" => ArchId::Mips64,
    "PPC32" => ArchId::Ppc32,
    "PPC64" => ArchId::Ppc64,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterInfo {
    pub name: &'static str,
    /// Width in bytes.
    pub size: usize,
}

/// What an entry register receives when a fresh process state is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryValue {
    Literal(u64),
    /// A symbolic indicator such as `argc` or `ld_destructor`, resolved
    /// against the freshly built stack.
    Indicator(Cow<'static, str>),
}

impl EntryValue {
    pub const fn indicator(name: &'static str) -> Self {
        EntryValue::Indicator(Cow::Borrowed(name))
    }
}

/// Register receiving the thread pointer in a blank state, and how far the
/// value is shifted right before the store (x86 keeps a selector in `gs`).
#[derive(Clone, Copy, Debug)]
pub struct ThreadPointerRegister {
    pub name: &'static str,
    pub shift: u32,
}

/// Fixed offsets inside the loader's `_rtld_global` where the recursive
/// lock hooks and the initial error-catch slot live.
#[derive(Clone, Copy, Debug)]
pub struct RtldGlobalSlots {
    pub lock_recursive: u64,
    pub unlock_recursive: u64,
    pub error_catch_tsd: u64,
}

/// Injected snippet used to leak a segment base from a live twin process.
#[derive(Clone, Copy, Debug)]
pub struct SegmentSync {
    /// Segment register mirrored in the emulated state.
    pub register: &'static str,
    pub shellcode: &'static [u8],
    /// General-purpose register holding the leaked value after execution.
    pub exfiltration_register: &'static str,
}

pub type SyscallAbiSelector = fn(&ArchProfile, &JumpKind) -> Result<&'static str, SyscallError>;
pub type TlsBootstrap = fn(&mut TlsContext<'_>) -> Result<(), ConfigError>;

/// One row of the per-architecture dispatch table.
pub struct ArchProfile {
    pub id: ArchId,
    pub name: &'static str,
    pub bits: u32,
    pub endness: Endianness,
    pub registers: &'static [RegisterInfo],
    pub sp: &'static str,
    pub ip: &'static str,
    pub initial_sp: u64,
    pub entry_registers: &'static [(&'static str, EntryValue)],
    pub syscall_abis: &'static [&'static str],
    pub select_syscall_abi: SyscallAbiSelector,
    pub thread_pointer: Option<ThreadPointerRegister>,
    pub bootstrap_tls: TlsBootstrap,
    pub rtld_global: Option<RtldGlobalSlots>,
    pub supports_ifunc: bool,
    /// Zero words pushed below `argc` by the startup stack builder.
    pub reserved_stack_words: usize,
    pub segment_sync: Option<SegmentSync>,
}

impl fmt::Debug for ArchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchProfile")
            .field("name", &self.name)
            .field("bits", &self.bits)
            .field("endness", &self.endness)
            .field("syscall_abis", &self.syscall_abis)
            .finish_non_exhaustive()
    }
}

/// Picks the only ABI an architecture has, whatever the trap.
pub(crate) fn select_native_abi(
    profile: &ArchProfile,
    _jumpkind: &JumpKind,
) -> Result<&'static str, SyscallError> {
    profile
        .syscall_abis
        .last()
        .copied()
        .ok_or(SyscallError::NoAbi { arch: profile.name })
}

pub(crate) fn no_tls_bootstrap(_ctx: &mut TlsContext<'_>) -> Result<(), ConfigError> {
    Ok(())
}

/// An architecture descriptor: the static profile plus an entry-register map
/// the host may extend or override.
#[derive(Clone, Debug)]
pub struct Arch {
    profile: &'static ArchProfile,
    entry_register_values: SmallVec<[(Cow<'static, str>, EntryValue); 8]>,
}

impl Arch {
    pub fn new(id: ArchId) -> Self {
        let profile = id.profile();
        let entry_register_values = profile
            .entry_registers
            .iter()
            .map(|(reg, value)| (Cow::Borrowed(*reg), value.clone()))
            .collect();
        Self {
            profile,
            entry_register_values,
        }
    }

    /// Looks up an architecture by its canonical upper-case name.
    pub fn from_name(name: &str) -> Option<Self> {
        ARCHITECTURES.get(name).map(|id| Self::new(*id))
    }

    /// Sets (or replaces) the value an entry register receives.
    pub fn with_entry_register(
        mut self,
        register: impl Into<Cow<'static, str>>,
        value: EntryValue,
    ) -> Self {
        let register = register.into();
        match self
            .entry_register_values
            .iter_mut()
            .find(|(name, _)| *name == register)
        {
            Some(slot) => slot.1 = value,
            None => self.entry_register_values.push((register, value)),
        }
        self
    }

    pub fn profile(&self) -> &'static ArchProfile {
        self.profile
    }

    pub fn id(&self) -> ArchId {
        self.profile.id
    }

    pub fn name(&self) -> &'static str {
        self.profile.name
    }

    pub fn bits(&self) -> u32 {
        self.profile.bits
    }

    /// Pointer width in bytes.
    pub fn bytes(&self) -> usize {
        (self.profile.bits / 8) as usize
    }

    /// All ones across the pointer width. Guest addresses wrap at this value.
    pub fn address_mask(&self) -> u64 {
        u64::MAX >> (64 - self.profile.bits)
    }

    pub fn endness(&self) -> Endianness {
        self.profile.endness
    }

    pub fn register(&self, name: &str) -> Option<&'static RegisterInfo> {
        self.profile.registers.iter().find(|reg| reg.name == name)
    }

    pub fn sp_name(&self) -> &'static str {
        self.profile.sp
    }

    pub fn ip_name(&self) -> &'static str {
        self.profile.ip
    }

    pub fn initial_sp(&self) -> u64 {
        self.profile.initial_sp
    }

    pub fn entry_register_values(&self) -> &[(Cow<'static, str>, EntryValue)] {
        &self.entry_register_values
    }

    pub fn syscall_abis(&self) -> &'static [&'static str] {
        self.profile.syscall_abis
    }
}
