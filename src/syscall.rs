use smartstring::alias::String as SmartString;

use crate::{arch::Arch, error::SyscallError};

/// How control last left the emulated code, in VEX jumpkind terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JumpKind {
    Boring,
    Call,
    Ret,
    /// `int 0x80`
    SysInt128,
    SysSyscall,
    SysSysenter,
    Other(SmartString),
}

impl JumpKind {
    pub fn from_vex(name: &str) -> Self {
        match name {
            "Ijk_Boring" => JumpKind::Boring,
            "Ijk_Call" => JumpKind::Call,
            "Ijk_Ret" => JumpKind::Ret,
            "Ijk_Sys_int128" => JumpKind::SysInt128,
            "Ijk_Sys_syscall" => JumpKind::SysSyscall,
            "Ijk_Sys_sysenter" => JumpKind::SysSysenter,
            other => JumpKind::Other(other.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JumpKind::Boring => "Ijk_Boring",
            JumpKind::Call => "Ijk_Call",
            JumpKind::Ret => "Ijk_Ret",
            JumpKind::SysInt128 => "Ijk_Sys_int128",
            JumpKind::SysSyscall => "Ijk_Sys_syscall",
            JumpKind::SysSysenter => "Ijk_Sys_sysenter",
            JumpKind::Other(name) => name.as_str(),
        }
    }

    pub fn is_syscall(&self) -> bool {
        matches!(
            self,
            JumpKind::SysInt128 | JumpKind::SysSyscall | JumpKind::SysSysenter
        ) || matches!(self, JumpKind::Other(name) if name.starts_with("Ijk_Sys"))
    }
}

/// Chooses the syscall ABI for a trap taken on `arch`.
///
/// The result is always one of `arch.syscall_abis()`.
pub fn select_abi(arch: &Arch, jumpkind: &JumpKind) -> Result<&'static str, SyscallError> {
    let profile = arch.profile();
    (profile.select_syscall_abi)(profile, jumpkind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchId;

    const TRAPS: [&str; 5] = [
        "Ijk_Sys_int128",
        "Ijk_Sys_syscall",
        "Ijk_Sys_sysenter",
        "Ijk_Boring",
        "Ijk_SigTRAP",
    ];

    #[test]
    fn test_amd64_trap_mapping() {
        let arch = Arch::new(ArchId::Amd64);
        assert_eq!(
            select_abi(&arch, &JumpKind::from_vex("Ijk_Sys_int128")),
            Ok("i386")
        );
        assert_eq!(
            select_abi(&arch, &JumpKind::from_vex("Ijk_Sys_syscall")),
            Ok("amd64")
        );
        assert_eq!(
            select_abi(&arch, &JumpKind::SysSysenter),
            Err(SyscallError::UnknownTrap {
                arch: "AMD64",
                jumpkind: "Ijk_Sys_sysenter".to_owned(),
            })
        );
    }

    #[test]
    fn test_selected_abi_is_declared() {
        for id in ArchId::ALL {
            let arch = Arch::new(id);
            for trap in TRAPS {
                if let Ok(abi) = select_abi(&arch, &JumpKind::from_vex(trap)) {
                    assert!(arch.syscall_abis().contains(&abi), "{} {}", arch.name(), abi);
                }
            }
        }
    }

    #[test]
    fn test_single_trap_architectures_are_unconditional() {
        let cases = [
            (ArchId::X86, "i386"),
            (ArchId::ArmEl, "arm"),
            (ArchId::ArmHf, "armhf"),
            (ArchId::AArch64, "aarch64"),
            (ArchId::Mips32, "mips-o32"),
            (ArchId::Mips64, "mips-n64"),
            (ArchId::Ppc32, "ppc"),
            (ArchId::Ppc64, "ppc64"),
        ];
        for (id, expected) in cases {
            let arch = Arch::new(id);
            for trap in TRAPS {
                assert_eq!(select_abi(&arch, &JumpKind::from_vex(trap)), Ok(expected));
            }
        }
    }

    #[test]
    fn test_jumpkind_names_round_trip() {
        assert_eq!(JumpKind::from_vex("Ijk_NoDecode").as_str(), "Ijk_NoDecode");
        assert!(JumpKind::from_vex("Ijk_Sys_int128").is_syscall());
        assert!(!JumpKind::Call.is_syscall());
    }
}
