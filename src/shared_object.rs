use rustc_hash::FxHashMap;
use smartstring::alias::String as SmartString;

use crate::elf::{relocate::Relocation, symbol::Symbol};

/// A binary object mapped by the loader, reduced to what process startup
/// needs: its symbols, its processed relocations and a few ABI flags.
#[derive(Clone, Debug, Default)]
pub struct SharedObject {
    pub name: SmartString,
    /// `false` for blobs and other non-ELF backends; those are never scanned
    /// for indirect-function relocations.
    pub is_elf: bool,
    pub min_addr: u64,
    pub max_addr: u64,
    pub entry: u64,
    symbols: FxHashMap<SmartString, Symbol>,
    relocations: Vec<Relocation>,
    /// PPC64 ELFv1: functions are called through descriptors and the entry
    /// state needs the initial TOC.
    pub ppc64_abiv1: bool,
    pub ppc64_initial_rtoc: Option<u64>,
}

impl SharedObject {
    pub fn new(name: &str, min_addr: u64, max_addr: u64) -> Self {
        Self {
            name: name.into(),
            is_elf: true,
            min_addr,
            max_addr,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.add_symbol(symbol);
        self
    }

    pub fn with_relocation(mut self, relocation: Relocation) -> Self {
        self.relocations.push(relocation);
        self
    }

    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    #[inline(always)]
    pub fn contains_addr(&self, addr: u64) -> bool {
        (self.min_addr..=self.max_addr).contains(&addr)
    }
}
