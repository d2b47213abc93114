use log::trace;
use rustc_hash::FxHashMap;
use smartstring::alias::String as SmartString;

/// Synthetic behaviors standing in for loader and kernel code that is never
/// executed natively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimBehavior {
    /// Start address of full-init states: runs the loader's initializers.
    LinuxLoader,
    RtldLockRecursive,
    RtldUnlockRecursive,
    /// `_dl_initial_error_catch_tsd`, returning a pointer to its own static slot.
    InitialErrorCatchTsd { static_addr: u64 },
    /// i386 `__kernel_vsyscall`, reached through `call *%gs:0x10`.
    Vsyscall,
    /// ARM `__kuser_get_tls` in the kernel vector page.
    KernelUserHelperGetTls,
    TlsGetAddr,
    /// i386 `___tls_get_addr`, which takes its argument in `eax`.
    TlsGetAddrRegparm,
    DlVdsoVsym,
    /// Calls the resolver at `funcaddr` once, then patches `gotaddr`.
    IFuncResolver {
        funcaddr: u64,
        gotaddr: u64,
        funcname: SmartString,
    },
}

impl SimBehavior {
    pub fn display_name(&self) -> &str {
        match self {
            SimBehavior::LinuxLoader => "LinuxLoader",
            SimBehavior::RtldLockRecursive => "_dl_rtld_lock_recursive",
            SimBehavior::RtldUnlockRecursive => "_dl_rtld_unlock_recursive",
            SimBehavior::InitialErrorCatchTsd { .. } => "_dl_initial_error_catch_tsd",
            SimBehavior::Vsyscall => "_vsyscall",
            SimBehavior::KernelUserHelperGetTls => "_kernel_user_helper_get_tls",
            SimBehavior::TlsGetAddr => "__tls_get_addr",
            SimBehavior::TlsGetAddrRegparm => "___tls_get_addr",
            SimBehavior::DlVdsoVsym => "_dl_vdso_vsym",
            SimBehavior::IFuncResolver { funcname, .. } => funcname.as_str(),
        }
    }
}

/// Address to behavior bindings owned by a project.
#[derive(Clone, Debug, Default)]
pub struct HookTable {
    bindings: FxHashMap<u64, SimBehavior>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `behavior` at `addr`, replacing any previous binding.
    pub fn bind(&mut self, addr: u64, behavior: SimBehavior) -> Option<SimBehavior> {
        trace!("hooking {:#x} with {}", addr, behavior.display_name());
        self.bindings.insert(addr, behavior)
    }

    pub fn is_hooked(&self, addr: u64) -> bool {
        self.bindings.contains_key(&addr)
    }

    pub fn hooked_by(&self, addr: u64) -> Option<&SimBehavior> {
        self.bindings.get(&addr)
    }

    /// Address currently bound to the behavior named `name`, if any.
    pub fn find_by_name(&self, name: &str) -> Option<u64> {
        self.bindings
            .iter()
            .find(|(_, behavior)| behavior.display_name() == name)
            .map(|(addr, _)| *addr)
    }

    /// Moves the binding named `name` to `new_addr`. Returns the old address.
    pub fn rehook_symbol(&mut self, new_addr: u64, name: &str) -> Option<u64> {
        let old_addr = self.find_by_name(name)?;
        let behavior = self.bindings.remove(&old_addr)?;
        trace!("rehooking {} from {:#x} to {:#x}", name, old_addr, new_addr);
        self.bindings.insert(new_addr, behavior);
        Some(old_addr)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
