use std::path::PathBuf;

use rustc_hash::FxHashMap;
use smartstring::alias::String as SmartString;

/// Where the startup image put the process arguments, as seen by emulated
/// C-runtime startup code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PosixState {
    pub argc: u64,
    pub argv: u64,
    pub environ: u64,
    pub auxv: u64,
    pub fs: Filesystem,
}

/// A host directory exposed to the emulated process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostMount {
    pub root: PathBuf,
}

/// In-memory files plus optional host mounts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filesystem {
    files: FxHashMap<SmartString, Vec<u8>>,
    mounts: FxHashMap<SmartString, HostMount>,
    pub pathsep: SmartString,
    pub cwd: SmartString,
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new("/", "/home/user")
    }
}

impl Filesystem {
    pub fn new(pathsep: &str, cwd: &str) -> Self {
        Self {
            files: FxHashMap::default(),
            mounts: FxHashMap::default(),
            pathsep: pathsep.into(),
            cwd: cwd.into(),
        }
    }

    pub fn insert_file(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn mount(&mut self, at: &str, mount: HostMount) {
        self.mounts.insert(at.into(), mount);
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn mount_at(&self, path: &str) -> Option<&HostMount> {
        self.mounts.get(path)
    }
}

/// C-library facts the startup path records for later stubs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibcState {
    /// `Some("ppc64_1")` when calls go through ELFv1 function descriptors.
    pub ppc64_abiv: Option<&'static str>,
}
