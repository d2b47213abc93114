use crate::{
    arch::Arch,
    error::ConfigError,
    hooks::{HookTable, SimBehavior},
    loader::Loader,
};

/// A loaded binary together with its architecture and hook bindings.
///
/// Mutating operations take `&mut self`, so configuring a project and
/// building states from it are serialized by the borrow checker.
pub struct Project<L> {
    pub arch: Arch,
    pub loader: L,
    pub hooks: HookTable,
}

impl<L: Loader> Project<L> {
    pub fn new(arch: Arch, loader: L) -> Self {
        Self {
            arch,
            loader,
            hooks: HookTable::new(),
        }
    }

    /// Binds `behavior` at `addr`, which must be an extern address or lie
    /// inside a loaded object.
    pub fn hook(&mut self, addr: u64, behavior: SimBehavior) -> Result<(), ConfigError> {
        if !self.loader.owns(addr) {
            return Err(ConfigError::UnownedHookTarget { addr });
        }
        self.hooks.bind(addr, behavior);
        Ok(())
    }

    /// Like [`Project::hook`], but for a symbol resolved in the main object
    /// or at a pseudo address: binds wherever [`prepare_function_symbol`]
    /// says the code lives.
    ///
    /// [`prepare_function_symbol`]: crate::linking::prepare_function_symbol
    pub fn hook_symbol(
        &mut self,
        name: &str,
        basic_addr: Option<u64>,
        behavior: SimBehavior,
    ) -> Result<u64, ConfigError> {
        let (code_addr, _) = crate::linking::prepare_function_symbol(self, name, basic_addr)?;
        self.hook(code_addr, behavior)?;
        Ok(code_addr)
    }

    pub fn is_hooked(&self, addr: u64) -> bool {
        self.hooks.is_hooked(addr)
    }

    pub fn hooked_by(&self, addr: u64) -> Option<&SimBehavior> {
        self.hooks.hooked_by(addr)
    }

    /// Moves the behavior named `name` to `new_addr`, which may lie in a
    /// live twin's layout rather than in any loaded object.
    pub fn rehook_symbol(&mut self, new_addr: u64, name: &str) -> Option<u64> {
        self.hooks.rehook_symbol(new_addr, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arch::ArchId, loader::LoadedImage, shared_object::SharedObject};

    #[test]
    fn test_hook_rejects_unowned_addresses() {
        let arch = Arch::new(ArchId::Amd64);
        let loader = LoadedImage::new(&arch, SharedObject::new("main", 0x40_0000, 0x40_ffff));
        let mut project = Project::new(arch, loader);

        assert_eq!(
            project.hook(0x1234, SimBehavior::Vsyscall),
            Err(ConfigError::UnownedHookTarget { addr: 0x1234 })
        );
        let addr = project.loader.allocate_extern(8);
        project.hook(addr, SimBehavior::Vsyscall).unwrap();
        project.hook(0x40_1000, SimBehavior::TlsGetAddr).unwrap();
        assert!(project.is_hooked(addr));
        assert!(project.is_hooked(0x40_1000));
    }
}
