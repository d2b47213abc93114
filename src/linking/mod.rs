use log::{debug, trace};

use crate::{
    error::ConfigError,
    hooks::SimBehavior,
    loader::Loader,
    project::Project,
    tls::TlsContext,
};

pub mod ifunc;

/// Size of a PPC64 ELFv1 function descriptor: entry, TOC, environment.
const PPC64_DESCRIPTOR_SIZE: u64 = 0x18;

/// Extern addresses carved out while configuring the loader state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderAddresses {
    /// Synthetic loader entry, the start of full-init states.
    pub loader: u64,
    pub lock: u64,
    pub unlock: u64,
    pub error_catch_tsd: u64,
    /// Static slot owned by the error-catch hook.
    pub error_catch_static: u64,
    pub vsyscall: u64,
}

/// Makes the dynamic loader's internal entry points resolvable without
/// running its code, then seeds the primary thread's TCB.
pub fn configure_loader_state<L: Loader>(
    project: &mut Project<L>,
) -> Result<LoaderAddresses, ConfigError> {
    let word = project.arch.bytes() as u64;
    let loader = project.loader.allocate_extern(word);
    let lock = project.loader.allocate_extern(word);
    let unlock = project.loader.allocate_extern(word);
    let error_catch_tsd = project.loader.allocate_extern(word);
    let vsyscall = project.loader.allocate_extern(word);
    let error_catch_static = project.loader.allocate_extern(word);

    project.hook(loader, SimBehavior::LinuxLoader)?;
    project.hook(lock, SimBehavior::RtldLockRecursive)?;
    project.hook(unlock, SimBehavior::RtldUnlockRecursive)?;
    project.hook(
        error_catch_tsd,
        SimBehavior::InitialErrorCatchTsd {
            static_addr: error_catch_static,
        },
    )?;
    project.hook(vsyscall, SimBehavior::Vsyscall)?;

    let addresses = LoaderAddresses {
        loader,
        lock,
        unlock,
        error_catch_tsd,
        error_catch_static,
        vsyscall,
    };
    patch_linux_loader(project, &addresses)?;

    if let Some(addr) = symbol_addr(project.loader.find_object("libc.so.6"), "_dl_vdso_vsym") {
        let (code_addr, _) = prepare_function_symbol(project, "_dl_vdso_vsym", Some(addr))?;
        if project.is_hooked(code_addr) {
            trace!("_dl_vdso_vsym already hooked at {:#x}", code_addr);
        } else {
            project.hook(code_addr, SimBehavior::DlVdsoVsym)?;
        }
    }

    let bootstrap = project.arch.profile().bootstrap_tls;
    let tls = project.loader.tls();
    let mut ctx = TlsContext {
        loader: &mut project.loader,
        hooks: &mut project.hooks,
        tls,
        vsyscall_addr: vsyscall,
    };
    bootstrap(&mut ctx)?;

    debug!(
        "configured loader state: entry {:#x}, vsyscall {:#x}",
        loader, vsyscall
    );
    Ok(addresses)
}

fn symbol_addr(object: Option<&crate::shared_object::SharedObject>, name: &str) -> Option<u64> {
    object
        .and_then(|object| object.get_symbol(name))
        .map(|symbol| symbol.rebased_addr)
}

/// Hooks the TLS accessors exported by `ld-linux` and points the lock slots
/// of `_rtld_global` at the synthetic lock hooks.
fn patch_linux_loader<L: Loader>(
    project: &mut Project<L>,
    addresses: &LoaderAddresses,
) -> Result<(), ConfigError> {
    let Some(ld) = project.loader.linux_loader_object() else {
        debug!("no dynamic loader object mapped");
        return Ok(());
    };
    let tls_get_addr = symbol_addr(Some(ld), "__tls_get_addr");
    let tls_get_addr_regparm = symbol_addr(Some(ld), "___tls_get_addr");
    let rtld_global = symbol_addr(Some(ld), "_rtld_global");

    // These always win over whatever the host bound there.
    for (name, addr, behavior) in [
        ("__tls_get_addr", tls_get_addr, SimBehavior::TlsGetAddr),
        ("___tls_get_addr", tls_get_addr_regparm, SimBehavior::TlsGetAddrRegparm),
    ] {
        if let Some(addr) = addr {
            project.hook_symbol(name, Some(addr), behavior)?;
        }
    }

    let Some(rtld_global) = rtld_global else {
        debug!("_rtld_global not exported, leaving loader locks alone");
        return Ok(());
    };
    let Some(slots) = project.arch.profile().rtld_global else {
        debug!("no _rtld_global layout for {}", project.arch.name());
        return Ok(());
    };
    project
        .loader
        .pack_word(rtld_global + slots.lock_recursive, addresses.lock)?;
    project
        .loader
        .pack_word(rtld_global + slots.unlock_recursive, addresses.unlock)?;
    project
        .loader
        .pack_word(rtld_global + slots.error_catch_tsd, addresses.error_catch_tsd)?;
    Ok(())
}

/// Prepares the address space for relocations against `name`.
///
/// Returns `(code address, relocation target)`. On PPC64 ELFv1 the target is
/// a function descriptor whose first word holds the code address; everywhere
/// else the two are the same.
pub fn prepare_function_symbol<L: Loader>(
    project: &mut Project<L>,
    name: &str,
    basic_addr: Option<u64>,
) -> Result<(u64, u64), ConfigError> {
    if !project.loader.main_object().ppc64_abiv1 {
        let addr = match basic_addr {
            Some(addr) => addr,
            None => project.loader.pseudo_addr(name),
        };
        return Ok((addr, addr));
    }

    if let Some(descriptor) = basic_addr {
        let code_addr = project.loader.unpack_word(descriptor)?;
        return Ok((code_addr, descriptor));
    }

    let code_addr = project.loader.pseudo_addr(name);
    let descriptor = project.loader.allocate_extern(PPC64_DESCRIPTOR_SIZE);
    project.loader.pack_word(descriptor, code_addr)?;
    Ok((code_addr, descriptor))
}
