/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use log::{debug, trace};

use crate::{
    frame_table::FrameOwner,
    machine::Machine,
    memory_manager::{MemoryManager, SpaceLookup},
    modules::{backing_store::BackingStoreModule, replacement::ReplacementModule},
    process_table::ProcessId,
};

use super::AddressSpace;

/// Completes the fork of `parent` into `child`.
///
/// The child has to be registered already with an address space created by
/// [`AddressSpace::new_child`]. Every private page that is resident in
/// the parent gets its own frame with a copy of the parent's frame. For all
/// other private pages the backing store slot is copied again, because the
/// allocations of this fork may have evicted pages of the parent.
pub(crate) fn copy_resident_pages<R: ReplacementModule, P: SpaceLookup>(
    manager: &mut MemoryManager<R>,
    machine: &mut Machine,
    spaces: &mut P,
    parent: ProcessId,
    child: ProcessId,
) -> Result<(), ()> {
    let num_pages = parent_space(spaces, parent).num_pages();
    let page_size = manager.page_size();
    let mut page = vec![0u8; page_size];
    let mut copied = 0;

    for vpn in 0..num_pages {
        let parent_entry = parent_space(spaces, parent).table().entry(vpn).clone();
        if parent_entry.shared {
            continue;
        }

        match parent_entry.resident_frame() {
            Some(src) => {
                let frame = manager.allocate_frame(
                    FrameOwner::new(child, vpn),
                    Some(src),
                    machine,
                    spaces,
                )?;

                // an eviction may have changed the parent's entry, but never `src`
                trace!("Copy vpn {} from frame {} to frame {}", vpn, src, frame);
                machine.copy_frame(src, frame);

                let entry = child_space(spaces, child).table_mut().entry_mut(vpn);
                *entry = parent_entry;
                entry.physical_page = Some(frame);
                copied += 1;
            }
            None => {
                parent_space_mut(spaces, parent)
                    .backing_store_mut()
                    .read_page(vpn, &mut page)?;

                let space = child_space(spaces, child);
                space.backing_store_mut().write_page(vpn, &page)?;
                *space.table_mut().entry_mut(vpn) = parent_entry;
            }
        }
    }

    debug!(
        "Forked process {} into {} ({} of {} pages resident)",
        parent, child, copied, num_pages
    );
    manager.statistics_mut().page_faults += 1;

    Ok(())
}

fn parent_space<P: SpaceLookup>(spaces: &P, parent: ProcessId) -> &AddressSpace {
    match spaces.space(parent) {
        Some(space) => space,
        None => panic!("unknown parent process {}", parent),
    }
}

fn parent_space_mut<P: SpaceLookup>(spaces: &mut P, parent: ProcessId) -> &mut AddressSpace {
    match spaces.space_mut(parent) {
        Some(space) => space,
        None => panic!("unknown parent process {}", parent),
    }
}

fn child_space<P: SpaceLookup>(spaces: &mut P, child: ProcessId) -> &mut AddressSpace {
    match spaces.space_mut(child) {
        Some(space) => space,
        None => panic!("child process {} is not registered", child),
    }
}
