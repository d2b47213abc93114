use linux_personality::{
    elf::{
        relocate::{relocations::R_386_JMP_SLOT, Relocation},
        symbol::{Symbol, SymbolType},
        thread_local_storage::TlsDescriptor,
    },
    error::SyncError,
    start::{auxiliary_vector::AT_RANDOM, environment_variables},
    Arch, ArchId, AuxvIter, BlankOptions, ConcreteTarget, EntryOptions, EntryValue, LinuxConfig, LoadedImage,
    Loader, Project, SharedObject, SimBehavior, SimLinux,
};

fn amd64_project() -> Project<LoadedImage> {
    let arch = Arch::new(ArchId::Amd64);
    let main = SharedObject::new("prog", 0x40_0000, 0x40_ffff).with_entry(0x40_1040);
    let image = LoadedImage::new(&arch, main);
    Project::new(arch, image)
}

#[test]
fn single_argument_layout_on_amd64() {
    let mut project = amd64_project();
    let mut linux = SimLinux::default();
    linux.configure(&mut project).unwrap();

    let arch = Arch::new(ArchId::Amd64).with_entry_register("rdi", EntryValue::indicator("argc"));
    project.arch = arch;
    let state = linux
        .entry_state(&project, &EntryOptions::default().with_args(["prog"]))
        .unwrap();

    let argv = state.posix.argv;
    assert_eq!(state.load_register("rdi"), Ok(1));
    assert_eq!(state.sp(), argv - 8);
    assert_eq!(state.load_word(argv - 8).unwrap(), 1);
    let prog = state.load_word(argv).unwrap();
    assert_eq!(state.memory.load(prog, 5).unwrap(), b"prog\0");
    assert_eq!(state.load_word(argv + 8).unwrap(), 0);
    assert_eq!(state.posix.environ, argv + 16);
    assert_eq!(state.posix.auxv, argv + 24);
    assert_eq!(state.ip(), 0x40_1040);
}

#[test]
fn default_arguments_use_the_main_object_name() {
    let project = amd64_project();
    let linux = SimLinux::default();
    let state = linux.entry_state(&project, &EntryOptions::default()).unwrap();
    let args = environment_variables::read_pointer_vector(
        &state.memory,
        state.posix.argv,
        8,
        state.arch.endness(),
    )
    .unwrap();
    assert_eq!(args, [b"prog".to_vec()]);
}

#[test]
fn argc_override_is_stored_in_register_and_stack() {
    let mut project = amd64_project();
    project.arch = Arch::new(ArchId::Amd64).with_entry_register("rdi", EntryValue::indicator("argc"));
    let linux = SimLinux::default();
    let state = linux
        .entry_state(
            &project,
            &EntryOptions::default().with_args(["prog"]).with_argc(3),
        )
        .unwrap();

    assert_eq!(state.load_register("rdi"), Ok(3));
    assert_eq!(state.load_word(state.sp()).unwrap(), 3);
    assert_eq!(state.posix.argc, 3);
    // The layout still follows the real argument list.
    assert_eq!(state.load_word(state.posix.argv + 8).unwrap(), 0);
}

#[test]
fn startup_image_is_deterministic_and_seedable() {
    let project = amd64_project();
    let options = EntryOptions::default()
        .with_args(["prog", "--flag"])
        .with_env("PATH", "/usr/bin")
        .with_env("LANG", "C");

    let linux = SimLinux::default();
    let first = linux.entry_state(&project, &options).unwrap();
    let second = linux.entry_state(&project, &options).unwrap();
    let len = (project.arch.initial_sp() - first.sp()) as usize;
    assert_eq!(first.sp(), second.sp());
    assert_eq!(
        first.memory.load(first.sp(), len).unwrap(),
        second.memory.load(second.sp(), len).unwrap()
    );

    let env = environment_variables::environment_variables(
        &first.memory,
        first.posix.environ,
        8,
        first.arch.endness(),
    )
    .unwrap();
    assert_eq!(
        env,
        [
            (b"PATH".to_vec(), b"/usr/bin".to_vec()),
            (b"LANG".to_vec(), b"C".to_vec())
        ]
    );

    let auxv: Vec<_> = AuxvIter::new(&first.memory, first.posix.auxv, 8, first.arch.endness())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(auxv.len(), 1);
    assert_eq!(auxv[0].a_type, AT_RANDOM);
    assert_eq!(
        first.memory.load(auxv[0].a_val, 4).unwrap(),
        [0xAE, 0xC0, 0xAE, 0xC0]
    );
    assert_eq!(first.load_word(first.posix.auxv + 16).unwrap(), 0);
    assert_eq!(first.load_word(first.posix.auxv + 24).unwrap(), 0);

    let seeded = SimLinux::new(LinuxConfig::default().with_at_random([7; 16]));
    let state = seeded.entry_state(&project, &options).unwrap();
    let random = state.load_word(state.posix.auxv + 8).unwrap();
    assert_eq!(state.memory.load(random, 16).unwrap(), [7; 16]);
}

#[test]
fn low_stack_end_wraps_on_x86() {
    let arch = Arch::new(ArchId::X86);
    let image = LoadedImage::new(&arch, SharedObject::new("prog", 0x0804_8000, 0x0805_0000));
    let project = Project::new(arch, image);
    let options = EntryOptions {
        blank: BlankOptions {
            stack_end: Some(0x20),
            ..BlankOptions::default()
        },
        ..EntryOptions::default()
    }
    .with_args(["prog", "a-fairly-long-argument-string-here"]);

    let state = SimLinux::default().entry_state(&project, &options).unwrap();
    assert!(state.sp() <= 0xffff_ffff);
    assert!(state.posix.argv <= 0xffff_ffff);
    let args = environment_variables::read_pointer_vector(
        &state.memory,
        state.posix.argv,
        4,
        state.arch.endness(),
    )
    .unwrap();
    assert_eq!(
        args,
        [
            b"prog".to_vec(),
            b"a-fairly-long-argument-string-here".to_vec()
        ]
    );
}

#[test]
fn ppc64_descriptor_abi_entry_state() {
    let arch = Arch::new(ArchId::Ppc64);
    let mut main = SharedObject::new("prog", 0x1000_0000, 0x1002_0000).with_entry(0x1001_0000);
    main.ppc64_abiv1 = true;
    main.ppc64_initial_rtoc = Some(0x1002_8000);
    let mut image = LoadedImage::new(&arch, main);
    image.set_tls(TlsDescriptor::new(0x2000_7000));
    let project = Project::new(arch, image);

    let linux = SimLinux::default();
    let state = linux.entry_state(&project, &EntryOptions::default()).unwrap();
    assert_eq!(state.libc.ppc64_abiv, Some("ppc64_1"));
    assert_eq!(state.load_register("r2"), Ok(0x1002_8000));
    assert_eq!(state.load_register("r3"), Ok(1));
    assert_eq!(state.load_register("r4"), Ok(state.posix.argv));
    assert_eq!(state.load_register("r5"), Ok(state.posix.environ));
    assert_eq!(state.load_register("r6"), Ok(state.posix.auxv));
    assert_eq!(state.load_register("r13"), Ok(0x2000_7000));
    // big-endian argc
    assert_eq!(
        state.memory.load(state.sp(), 8).unwrap(),
        [0, 0, 0, 0, 0, 0, 0, 1]
    );
}

#[test]
fn x86_configuration_and_ifunc_idempotence() {
    let arch = Arch::new(ArchId::X86);
    let main = SharedObject::new("prog", 0x0804_8000, 0x0805_0000).with_relocation(
        Relocation::new(0x0804_a00c, R_386_JMP_SLOT).with_symbol(
            "memcpy",
            Some(Symbol::new("memcpy", 0x0804_8400, SymbolType::GnuIfunc)),
        ),
    );
    let mut image = LoadedImage::new(&arch, main);
    image
        .memory_mut()
        .pack_word(0x0804_a00c, 0x0804_8400, 4, arch.endness())
        .unwrap();
    image.set_tls(TlsDescriptor::new(0xb7e0_0000));
    let mut project = Project::new(arch, image);

    let mut linux = SimLinux::default();
    let addresses = linux.configure(&mut project).unwrap();
    assert_eq!(
        project.loader.unpack_word(0xb7e0_0010).unwrap(),
        addresses.vsyscall
    );
    let resolver = project.loader.unpack_word(0x0804_a00c).unwrap();
    assert!(matches!(
        project.hooked_by(resolver),
        Some(SimBehavior::IFuncResolver { funcaddr: 0x0804_8400, .. })
    ));

    let hooks = project.hooks.len();
    assert_eq!(
        linux_personality::linking::ifunc::resolve_ifunc_relocations(&mut project),
        Ok(0)
    );
    assert_eq!(project.hooks.len(), hooks);
}

struct Twin {
    gs: u64,
    sysinfo: [u8; 4],
}

impl ConcreteTarget for Twin {
    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, SyncError> {
        if addr == self.gs + 0x10 && len == 4 {
            Ok(self.sysinfo.to_vec())
        } else {
            Err(SyncError::Read {
                addr,
                len,
                reason: "unmapped".to_owned(),
            })
        }
    }

    fn execute_shellcode(&mut self, code: &[u8], reg: &str) -> Result<u64, SyncError> {
        assert_eq!(&code[..2], &[0x65u8, 0xA1]);
        assert_eq!(reg, "eax");
        Ok(self.gs)
    }
}

#[test]
fn x86_twin_synchronization_moves_vsyscall() {
    let arch = Arch::new(ArchId::X86);
    let image = LoadedImage::new(&arch, SharedObject::new("prog", 0x0804_8000, 0x0805_0000));
    let mut project = Project::new(arch, image);
    let mut linux = SimLinux::default();
    let addresses = linux.configure(&mut project).unwrap();
    let mut state = linux
        .blank_state(&project, &Default::default())
        .unwrap();

    let mut twin = Twin {
        gs: 0xf7d8_4700,
        sysinfo: 0xf7fc_8b50u32.to_le_bytes(),
    };
    let gdt = linux
        .initialize_gdt_x86(&mut state, &mut project, &mut twin)
        .unwrap();
    assert_eq!(state.load_register("gdt"), Ok(gdt.gdt));
    assert_eq!(state.load_register("gs"), Ok(4 << 3));
    assert!(!project.is_hooked(addresses.vsyscall));
    assert_eq!(project.hooked_by(0xf7fc_8b50), Some(&SimBehavior::Vsyscall));
}
