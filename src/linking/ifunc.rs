use log::{debug, trace};
use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::{error::ConfigError, hooks::SimBehavior, loader::Loader, project::Project};

struct PendingSlot {
    gotaddr: u64,
    funcname: SmartString,
}

/// Redirects every GOT slot bound to a GNU indirect function through a
/// resolve-on-first-call hook.
///
/// Slots whose current value is already hooked are left alone, so running
/// this twice installs nothing the second time. Returns the number of slots
/// rewritten.
pub fn resolve_ifunc_relocations<L: Loader>(
    project: &mut Project<L>,
) -> Result<usize, ConfigError> {
    if !project.arch.profile().supports_ifunc {
        return Ok(0);
    }
    if !project.loader.main_object().is_elf {
        debug!("main object is not ELF, skipping ifunc resolution");
        return Ok(0);
    }

    let pending: SmallVec<[PendingSlot; 16]> = project
        .loader
        .objects()
        .iter()
        .filter(|object| object.is_elf)
        .flat_map(|object| object.relocations())
        .filter_map(|reloc| {
            reloc.ifunc_target().map(|name| PendingSlot {
                gotaddr: reloc.rebased_addr,
                funcname: name.into(),
            })
        })
        .collect();

    let mut rewritten = 0;
    for slot in pending {
        let funcaddr = project.loader.unpack_word(slot.gotaddr)?;
        if project.is_hooked(funcaddr) {
            continue;
        }
        let resolver = project.loader.allocate_extern(project.arch.bytes() as u64);
        trace!(
            "ifunc {} at got {:#x}: stub {:#x}, hook {:#x}",
            slot.funcname,
            slot.gotaddr,
            funcaddr,
            resolver
        );
        project.hook(
            resolver,
            SimBehavior::IFuncResolver {
                funcaddr,
                gotaddr: slot.gotaddr,
                funcname: slot.funcname,
            },
        )?;
        project.loader.pack_word(slot.gotaddr, resolver)?;
        rewritten += 1;
    }
    Ok(rewritten)
}
