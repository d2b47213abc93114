use log::{debug, trace};

use crate::{
    elf::thread_local_storage::{
        TlsDescriptor, ARM_KUSER_GET_TLS, POINTER_GUARD_MAGIC, STACK_GUARD_MAGIC,
        X86_64_POINTER_GUARD_OFFSET, X86_64_STACK_GUARD_OFFSET, X86_SYSINFO_OFFSET,
    },
    error::ConfigError,
    hooks::{HookTable, SimBehavior},
    loader::Loader,
};

/// What a per-architecture TLS bootstrap routine may touch.
pub struct TlsContext<'a> {
    pub loader: &'a mut dyn Loader,
    pub hooks: &'a mut HookTable,
    /// The primary thread, when the loader set one up.
    pub tls: Option<TlsDescriptor>,
    /// Extern address of the synthetic vsyscall trampoline.
    pub vsyscall_addr: u64,
}

/// x86_64: seed `stack_guard` and `pointer_guard` in the TCB.
pub fn write_stack_guards(ctx: &mut TlsContext<'_>) -> Result<(), ConfigError> {
    let Some(tls) = ctx.tls else {
        debug!("no thread-local storage, skipping stack guards");
        return Ok(());
    };
    let tp = tls.thread_pointer;
    ctx.loader
        .pack_word(tp + X86_64_STACK_GUARD_OFFSET, STACK_GUARD_MAGIC)?;
    ctx.loader
        .pack_word(tp + X86_64_POINTER_GUARD_OFFSET, POINTER_GUARD_MAGIC)?;
    trace!("wrote stack and pointer guards at tp {:#x}", tp);
    Ok(())
}

/// i386: point `%gs:0x10` at the vsyscall trampoline.
pub fn write_sysinfo_pointer(ctx: &mut TlsContext<'_>) -> Result<(), ConfigError> {
    let Some(tls) = ctx.tls else {
        debug!("no thread-local storage, skipping sysinfo pointer");
        return Ok(());
    };
    ctx.loader
        .pack_word(tls.thread_pointer + X86_SYSINFO_OFFSET, ctx.vsyscall_addr)?;
    Ok(())
}

/// ARM: user code fetches its thread pointer from a fixed kernel helper.
///
/// The vector page is not owned by any object, so the binding skips the
/// ownership check applied to other hooks.
pub fn hook_kernel_helper_page(ctx: &mut TlsContext<'_>) -> Result<(), ConfigError> {
    if ctx.tls.is_none() {
        debug!("no thread-local storage, skipping kernel helper page");
        return Ok(());
    }
    ctx.hooks
        .bind(ARM_KUSER_GET_TLS, SimBehavior::KernelUserHelperGetTls);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::{Arch, ArchId},
        loader::LoadedImage,
        shared_object::SharedObject,
    };

    fn image(id: ArchId) -> LoadedImage {
        let arch = Arch::new(id);
        LoadedImage::new(&arch, SharedObject::new("main", 0x40_0000, 0x40_ffff))
    }

    #[test]
    fn test_stack_guards_land_next_to_thread_pointer() {
        let mut loader = image(ArchId::Amd64);
        let mut hooks = HookTable::new();
        let mut ctx = TlsContext {
            loader: &mut loader,
            hooks: &mut hooks,
            tls: Some(TlsDescriptor::new(0x7000_0000)),
            vsyscall_addr: 0,
        };
        write_stack_guards(&mut ctx).unwrap();
        assert_eq!(loader.unpack_word(0x7000_0028).unwrap(), STACK_GUARD_MAGIC);
        assert_eq!(loader.unpack_word(0x7000_0030).unwrap(), POINTER_GUARD_MAGIC);
        // little-endian "_YRANAC_"
        assert_eq!(
            loader.memory().load(0x7000_0028, 8).unwrap(),
            b"_YRANAC_"
        );
    }

    #[test]
    fn test_missing_tls_is_tolerated() {
        let mut loader = image(ArchId::X86);
        let mut hooks = HookTable::new();
        let mut ctx = TlsContext {
            loader: &mut loader,
            hooks: &mut hooks,
            tls: None,
            vsyscall_addr: 0x0900_0010,
        };
        assert_eq!(write_sysinfo_pointer(&mut ctx), Ok(()));
        assert_eq!(write_stack_guards(&mut ctx), Ok(()));
        assert_eq!(hook_kernel_helper_page(&mut ctx), Ok(()));
        assert!(hooks.is_empty());
    }

    #[test]
    fn test_sysinfo_pointer_and_kernel_helper() {
        let mut loader = image(ArchId::X86);
        let mut hooks = HookTable::new();
        let mut ctx = TlsContext {
            loader: &mut loader,
            hooks: &mut hooks,
            tls: Some(TlsDescriptor::new(0x6000_0000)),
            vsyscall_addr: 0x0900_0010,
        };
        write_sysinfo_pointer(&mut ctx).unwrap();
        hook_kernel_helper_page(&mut ctx).unwrap();
        assert_eq!(loader.unpack_word(0x6000_0010).unwrap(), 0x0900_0010);
        assert_eq!(
            hooks.hooked_by(ARM_KUSER_GET_TLS),
            Some(&SimBehavior::KernelUserHelperGetTls)
        );
    }
}
