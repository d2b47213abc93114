use log::debug;

use crate::{
    arch::{ArchId, SegmentSync},
    elf::thread_local_storage::X86_SYSINFO_OFFSET,
    error::SyncError,
    gdt::{generate_gdt, setup_gdt, GlobalDescriptorTable},
    hooks::{HookTable, SimBehavior},
    memory::decode_word,
    state::ProcessState,
};

/// A live twin process the emulated state is kept in step with.
///
/// Both operations block on the twin. Injection repurposes the twin's
/// execution context, so callers must not run two at once against it.
pub trait ConcreteTarget {
    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, SyncError>;

    /// Runs `code` in the twin and returns `result_register` afterwards.
    fn execute_shellcode(&mut self, code: &[u8], result_register: &str) -> Result<u64, SyncError>;
}

fn segment_sync(state: &ProcessState, expected: ArchId) -> Result<SegmentSync, SyncError> {
    match state.arch.profile().segment_sync {
        Some(sync) if state.arch.id() == expected => Ok(sync),
        _ => Err(SyncError::Unsupported(state.arch.name())),
    }
}

fn leak_segment_base(
    sync: &SegmentSync,
    target: &mut dyn ConcreteTarget,
) -> Result<u64, SyncError> {
    target.execute_shellcode(sync.shellcode, sync.exfiltration_register)
}

/// Copies the twin's `fs` base into the emulated state.
pub fn initialize_segment_register_x64(
    state: &mut ProcessState,
    target: &mut dyn ConcreteTarget,
) -> Result<u64, SyncError> {
    let sync = segment_sync(state, ArchId::Amd64)?;
    debug!("synchronizing {} segment register", sync.register);
    let fs = leak_segment_base(&sync, target)?;
    state.store_register(sync.register, fs)?;
    Ok(fs)
}

/// Builds a descriptor table around the twin's `gs` base, installs it, and
/// moves the vsyscall hook to where the twin's loader put `__kernel_vsyscall`.
///
/// Everything is read from the twin before the state is touched, so a failed
/// sync leaves `state` and `hooks` as they were.
pub fn initialize_gdt_x86(
    state: &mut ProcessState,
    hooks: &mut HookTable,
    target: &mut dyn ConcreteTarget,
) -> Result<GlobalDescriptorTable, SyncError> {
    let sync = segment_sync(state, ArchId::X86)?;
    debug!("creating descriptor table and synchronizing {}", sync.register);
    let mask = state.arch.address_mask();
    let gs = leak_segment_base(&sync, target)? & mask;

    let word = state.arch.bytes();
    let sysinfo = gs.wrapping_add(X86_SYSINFO_OFFSET) & mask;
    let raw = target.read_memory(sysinfo, word)?;
    if raw.len() != word {
        return Err(SyncError::ShortRead {
            addr: sysinfo,
            expected: word,
            got: raw.len(),
        });
    }
    let vsyscall = decode_word(&raw, state.arch.endness())
        .map_err(|err| SyncError::Read {
            addr: sysinfo,
            len: word,
            reason: err.to_string(),
        })?;

    let gdt = generate_gdt(0, gs as u32);
    setup_gdt(state, &gdt)?;
    let name = SimBehavior::Vsyscall.display_name();
    if hooks.rehook_symbol(vsyscall, name).is_none() {
        debug!("no {} hook to move to {:#x}", name, vsyscall);
    }
    Ok(gdt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::{Arch, Endianness},
        memory::SparseMemory,
    };

    /// Replays canned answers and records what was injected.
    struct ScriptedTarget {
        memory: SparseMemory,
        register_value: u64,
        injected: Vec<(Vec<u8>, String)>,
        fail_injection: bool,
    }

    impl ScriptedTarget {
        fn new(register_value: u64) -> Self {
            Self {
                memory: SparseMemory::new(),
                register_value,
                injected: Vec::new(),
                fail_injection: false,
            }
        }
    }

    impl ConcreteTarget for ScriptedTarget {
        fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, SyncError> {
            self.memory.load(addr, len).map_err(|err| SyncError::Read {
                addr,
                len,
                reason: err.to_string(),
            })
        }

        fn execute_shellcode(&mut self, code: &[u8], reg: &str) -> Result<u64, SyncError> {
            if self.fail_injection {
                return Err(SyncError::Injection("twin exited".to_owned()));
            }
            self.injected.push((code.to_vec(), reg.to_owned()));
            Ok(self.register_value)
        }
    }

    #[test]
    fn test_fs_sync_injects_fs_read() {
        let mut state = ProcessState::new(Arch::new(ArchId::Amd64), SparseMemory::new());
        let mut target = ScriptedTarget::new(0x7fff_f7d8_a740);
        assert_eq!(
            initialize_segment_register_x64(&mut state, &mut target),
            Ok(0x7fff_f7d8_a740)
        );
        assert_eq!(state.load_register("fs"), Ok(0x7fff_f7d8_a740));
        assert_eq!(
            target.injected,
            [(
                vec![0x64, 0x48, 0x8B, 0x04, 0x25, 0, 0, 0, 0, 0x90, 0x90, 0x90, 0x90],
                "rax".to_owned()
            )]
        );
    }

    #[test]
    fn test_gdt_sync_rehooks_vsyscall() {
        let mut state = ProcessState::new(Arch::new(ArchId::X86), SparseMemory::new());
        let mut hooks = HookTable::new();
        hooks.bind(0x0900_0010, SimBehavior::Vsyscall);
        let mut target = ScriptedTarget::new(0xf7fc_0700);
        target
            .memory
            .pack_word(0xf7fc_0710, 0xf7fd_0b50, 4, Endianness::Little)
            .unwrap();

        let gdt = initialize_gdt_x86(&mut state, &mut hooks, &mut target).unwrap();
        assert_eq!(gdt.entries[3] >> 56, 0xf7);
        assert_eq!(state.load_register("gs"), Ok(0x20));
        assert!(!hooks.is_hooked(0x0900_0010));
        assert_eq!(hooks.hooked_by(0xf7fd_0b50), Some(&SimBehavior::Vsyscall));
        assert_eq!(target.injected[0].1, "eax");
    }

    #[test]
    fn test_gdt_sync_truncates_wide_segment_base() {
        let mut state = ProcessState::new(Arch::new(ArchId::X86), SparseMemory::new());
        let mut hooks = HookTable::new();
        hooks.bind(0x0900_0010, SimBehavior::Vsyscall);
        let mut target = ScriptedTarget::new(0xdead_0000_f7fc_0700);
        target
            .memory
            .pack_word(0xf7fc_0710, 0xf7fd_0b50, 4, Endianness::Little)
            .unwrap();

        let gdt = initialize_gdt_x86(&mut state, &mut hooks, &mut target).unwrap();
        assert_eq!(gdt, generate_gdt(0, 0xf7fc_0700));
        assert_eq!(hooks.hooked_by(0xf7fd_0b50), Some(&SimBehavior::Vsyscall));

        // The sysinfo slot wraps past the top of the 32-bit address space.
        let mut state = ProcessState::new(Arch::new(ArchId::X86), SparseMemory::new());
        let mut target = ScriptedTarget::new(u64::MAX - 4);
        assert!(matches!(
            initialize_gdt_x86(&mut state, &mut hooks, &mut target),
            Err(SyncError::Read { addr: 0xb, .. })
        ));
        assert!(!state.regs.is_set("gs"));
    }

    #[test]
    fn test_sync_failures_surface() {
        let mut state = ProcessState::new(Arch::new(ArchId::X86), SparseMemory::new());
        let mut hooks = HookTable::new();
        let mut target = ScriptedTarget::new(0xf7fc_0700);
        // gs + 0x10 was never mapped in the twin.
        assert!(matches!(
            initialize_gdt_x86(&mut state, &mut hooks, &mut target),
            Err(SyncError::Read { addr: 0xf7fc_0710, .. })
        ));
        assert!(!state.regs.is_set("gdt"));
        assert!(!state.regs.is_set("gs"));
        assert!(!state.memory.is_mapped(0x4000));

        target.fail_injection = true;
        assert!(matches!(
            initialize_gdt_x86(&mut state, &mut hooks, &mut target),
            Err(SyncError::Injection(_))
        ));

        let mut arm = ProcessState::new(Arch::new(ArchId::ArmEl), SparseMemory::new());
        assert_eq!(
            initialize_segment_register_x64(&mut arm, &mut target),
            Err(SyncError::Unsupported("ARMEL"))
        );
    }
}
