use smartstring::alias::String as SmartString;

use crate::elf::symbol::Symbol;

/// A relocation the loader already processed.
///
/// Only records whose resolving symbol is a GNU indirect function are of
/// interest here; everything else has been fully applied by the loader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// Rebased address of the slot being relocated (usually a GOT entry).
    pub rebased_addr: u64,
    pub r_type: u32,
    /// Name of the symbol the relocation refers to, if any.
    pub symbol: Option<SmartString>,
    /// Definition the loader bound the reference to.
    pub resolved_by: Option<Symbol>,
}

impl Relocation {
    pub fn new(rebased_addr: u64, r_type: u32) -> Self {
        Self {
            rebased_addr,
            r_type,
            symbol: None,
            resolved_by: None,
        }
    }

    pub fn with_symbol(mut self, name: &str, resolved_by: Option<Symbol>) -> Self {
        self.symbol = Some(name.into());
        self.resolved_by = resolved_by;
        self
    }

    /// The symbol name when the reference resolved to an indirect function.
    pub fn ifunc_target(&self) -> Option<&str> {
        match (&self.symbol, &self.resolved_by) {
            (Some(name), Some(definition)) if definition.is_ifunc() => Some(name.as_str()),
            _ => None,
        }
    }
}

pub mod relocations {
    // Relocation types the loader emits for GOT slots that can point at an ifunc.
    pub const R_X86_64_GLOB_DAT: u32 = 6;
    pub const R_X86_64_JUMP_SLOT: u32 = 7;
    pub const R_386_JMP_SLOT: u32 = 7;
}
