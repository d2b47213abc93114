//! Linux process personality for emulated binaries: syscall ABI routing,
//! dynamic-loader state emulation, the `execve` startup image and
//! synchronization with a concretely running twin.

pub mod arch;
pub mod concrete;
pub mod elf;
pub mod error;
pub mod gdt;
pub mod hooks;
mod io_macros;
pub mod linking;
pub mod loader;
pub mod memory;
mod page_size;
pub mod posix;
pub mod project;
pub mod shared_object;
pub mod simos;
pub mod start;
pub mod state;
pub mod syscall;
pub mod tls;

pub use arch::{Arch, ArchId, EntryValue};
pub use concrete::ConcreteTarget;
pub use error::{Error, Result};
pub use hooks::{HookTable, SimBehavior};
pub use loader::{LoadedImage, Loader};
pub use project::Project;
pub use shared_object::SharedObject;
pub use simos::{BlankOptions, EntryOptions, LinuxConfig, SimLinux};
pub use start::auxiliary_vector::{AuxiliaryVectorItem, AuxvIter};
pub use state::ProcessState;
