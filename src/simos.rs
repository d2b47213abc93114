use std::path::PathBuf;

use log::debug;
use smartstring::alias::String as SmartString;

use crate::{
    arch::Arch,
    concrete::{self, ConcreteTarget},
    elf::BINARY_HEADER_NAME,
    error::{ConfigError, Result, SyncError, SyscallError},
    gdt::GlobalDescriptorTable,
    linking::{self, ifunc::resolve_ifunc_relocations, LoaderAddresses},
    loader::Loader,
    posix::{Filesystem, HostMount},
    project::Project,
    start::{self, auxiliary_vector::AT_RANDOM_LEN, EntryContext, StartupImage},
    state::ProcessState,
    syscall,
};

/// Argument used when the main object has no name.
pub const DUMMY_FILENAME: &str = "dummy_filename";

/// Knobs shared by every state a [`SimLinux`] builds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinuxConfig {
    /// `AT_RANDOM` payload. Fixed by default so runs are reproducible.
    pub at_random: [u8; AT_RANDOM_LEN],
    /// Bytes zeroed below the stack pointer before the startup image is written.
    pub stack_scratch: u64,
    pub cwd: SmartString,
    pub pathsep: SmartString,
}

impl Default for LinuxConfig {
    fn default() -> Self {
        let mut at_random = [0; AT_RANDOM_LEN];
        for pair in at_random.chunks_exact_mut(2) {
            pair.copy_from_slice(&[0xAE, 0xC0]);
        }
        Self {
            at_random,
            stack_scratch: 128,
            cwd: "/home/user".into(),
            pathsep: "/".into(),
        }
    }
}

impl LinuxConfig {
    pub fn with_at_random(mut self, at_random: [u8; AT_RANDOM_LEN]) -> Self {
        self.at_random = at_random;
        self
    }

    pub fn with_cwd(mut self, cwd: &str) -> Self {
        self.cwd = cwd.into();
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlankOptions {
    /// In-memory files, path to content.
    pub fs: Vec<(SmartString, Vec<u8>)>,
    /// Mount the host filesystem at the path separator.
    pub concrete_fs: bool,
    /// Host directory the mount is rooted at. Defaults to `/`.
    pub chroot: Option<PathBuf>,
    pub pathsep: Option<SmartString>,
    pub cwd: Option<SmartString>,
    /// Initial stack pointer. Defaults to the architecture's.
    pub stack_end: Option<u64>,
    /// Initial instruction pointer. Defaults to the main object's entry.
    pub addr: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct EntryOptions {
    /// Defaults to the main object's name alone.
    pub args: Option<Vec<Vec<u8>>>,
    pub env: Vec<(Vec<u8>, Vec<u8>)>,
    /// Stored as argc instead of the argument count.
    pub argc: Option<u64>,
    /// Overrides [`LinuxConfig::at_random`] for this state.
    pub random: Option<[u8; AT_RANDOM_LEN]>,
    pub blank: BlankOptions,
}

impl EntryOptions {
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.args = Some(args.into_iter().map(|arg| arg.as_ref().to_vec()).collect());
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.as_bytes().to_vec(), value.as_bytes().to_vec()));
        self
    }

    pub fn with_argc(mut self, argc: u64) -> Self {
        self.argc = Some(argc);
        self
    }
}

/// The Linux process personality: loader-state setup, startup images and
/// syscall ABI routing for one project.
#[derive(Clone, Debug, Default)]
pub struct SimLinux {
    config: LinuxConfig,
    addresses: Option<LoaderAddresses>,
}

impl SimLinux {
    pub fn new(config: LinuxConfig) -> Self {
        Self {
            config,
            addresses: None,
        }
    }

    pub fn config(&self) -> &LinuxConfig {
        &self.config
    }

    /// Extern addresses of the loader hooks, once configured.
    pub fn loader_addresses(&self) -> Option<LoaderAddresses> {
        self.addresses
    }

    /// Prepares the project's address space. Running it again is a no-op.
    pub fn configure<L: Loader>(
        &mut self,
        project: &mut Project<L>,
    ) -> Result<LoaderAddresses, ConfigError> {
        if let Some(addresses) = self.addresses {
            return Ok(addresses);
        }
        let addresses = linking::configure_loader_state(project)?;
        let rewritten = resolve_ifunc_relocations(project)?;
        debug!(
            "configured {} personality: {} ifunc slots redirected",
            project.arch.name(),
            rewritten
        );
        self.addresses = Some(addresses);
        Ok(addresses)
    }

    pub fn syscall_abis(&self, arch: &Arch) -> &'static [&'static str] {
        arch.syscall_abis()
    }

    /// The ABI to decode the syscall `state` just trapped into.
    pub fn syscall_abi(&self, state: &ProcessState) -> Result<&'static str, SyscallError> {
        syscall::select_abi(&state.arch, &state.history.jumpkind)
    }

    /// A state with reset registers over the loader's memory image.
    pub fn blank_state<L: Loader>(
        &self,
        project: &Project<L>,
        options: &BlankOptions,
    ) -> Result<ProcessState> {
        let loader = &project.loader;
        let mut state = ProcessState::new(project.arch.clone(), loader.memory_image());
        state.set_sp(options.stack_end.unwrap_or(project.arch.initial_sp()))?;
        state.set_ip(options.addr.unwrap_or(loader.main_object().entry))?;

        if let (Some(tls), Some(reg)) = (loader.tls(), project.arch.profile().thread_pointer) {
            state.store_register(reg.name, tls.user_thread_pointer >> reg.shift)?;
        }

        let pathsep = options.pathsep.as_deref().unwrap_or(self.config.pathsep.as_str());
        let cwd = options.cwd.as_deref().unwrap_or(self.config.cwd.as_str());
        let mut fs = Filesystem::new(pathsep, cwd);
        for (path, content) in &options.fs {
            fs.insert_file(path, content.clone());
        }
        if options.concrete_fs {
            let root = options
                .chroot
                .clone()
                .unwrap_or_else(|| PathBuf::from(std::path::MAIN_SEPARATOR_STR));
            fs.mount(pathsep, HostMount { root });
        }
        state.posix.fs = fs;

        if loader.main_object().ppc64_abiv1 {
            state.libc.ppc64_abiv = Some("ppc64_1");
        }
        Ok(state)
    }

    /// A state positioned at the program entry with the kernel's startup
    /// image on the stack and entry registers populated.
    pub fn entry_state<L: Loader>(
        &self,
        project: &Project<L>,
        options: &EntryOptions,
    ) -> Result<ProcessState> {
        let mut state = self.blank_state(project, &options.blank)?;
        let main = project.loader.main_object();

        let default_args;
        let args = match &options.args {
            Some(args) => args.as_slice(),
            None => {
                let name = if main.name.is_empty() {
                    DUMMY_FILENAME
                } else {
                    main.name.as_str()
                };
                default_args = [name.as_bytes().to_vec()];
                &default_args[..]
            }
        };

        let image = StartupImage {
            args,
            env: &options.env,
            argc: options.argc,
            random: options.random.unwrap_or(self.config.at_random),
            scratch: self.config.stack_scratch,
        };
        start::build_initial_stack(&mut state, &image)?;

        let ctx = EntryContext {
            toc: main.ppc64_initial_rtoc.filter(|_| main.ppc64_abiv1),
            thread_pointer: project.loader.tls().map(|tls| tls.user_thread_pointer),
        };
        start::set_entry_register_values(&mut state, &ctx)?;
        Ok(state)
    }

    /// An entry state starting at the synthetic loader hook, which runs the
    /// initializers before jumping to the program entry.
    pub fn full_init_state<L: Loader>(
        &self,
        project: &Project<L>,
        options: &EntryOptions,
    ) -> Result<ProcessState> {
        let loader_addr = self
            .addresses
            .map(|addresses| addresses.loader)
            .ok_or(ConfigError::NotConfigured)?;
        let mut options = options.clone();
        options.blank.addr = Some(loader_addr);
        self.entry_state(project, &options)
    }

    /// See [`linking::prepare_function_symbol`].
    pub fn prepare_function_symbol<L: Loader>(
        &self,
        project: &mut Project<L>,
        name: &str,
        basic_addr: Option<u64>,
    ) -> Result<(u64, u64), ConfigError> {
        linking::prepare_function_symbol(project, name, basic_addr)
    }

    pub fn initialize_segment_register_x64(
        &self,
        state: &mut ProcessState,
        target: &mut dyn ConcreteTarget,
    ) -> Result<u64, SyncError> {
        concrete::initialize_segment_register_x64(state, target)
    }

    pub fn initialize_gdt_x86<L: Loader>(
        &self,
        state: &mut ProcessState,
        project: &mut Project<L>,
        target: &mut dyn ConcreteTarget,
    ) -> Result<GlobalDescriptorTable, SyncError> {
        concrete::initialize_gdt_x86(state, &mut project.hooks, target)
    }

    /// Segment register mirrored from a concrete twin, if any.
    pub fn segment_register_name(&self, arch: &Arch) -> Option<&'static str> {
        arch.profile().segment_sync.map(|sync| sync.register)
    }

    pub fn binary_header_name(&self) -> &'static str {
        BINARY_HEADER_NAME
    }
}
