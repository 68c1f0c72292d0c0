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
    modules::replacement::ReplacementModule,
    process_table::ProcessId,
};

/// Appends `page_count` zero filled shared pages to the address space of
/// `process`.
///
/// Shared frames are never evicted and stay claimed after the process
/// exits. Children forked later on refer to the same frames.
///
/// Returns the virtual address of the first new page.
pub(crate) fn attach_shared_region<R: ReplacementModule, P: SpaceLookup>(
    manager: &mut MemoryManager<R>,
    machine: &mut Machine,
    spaces: &mut P,
    process: ProcessId,
    page_count: usize,
) -> Result<usize, ()> {
    let page_size = manager.page_size();
    let old_num_pages = {
        let space = match spaces.space_mut(process) {
            Some(space) => space,
            None => panic!("unknown process {}", process),
        };
        let old_num_pages = space.table_mut().grow(page_count);
        space
            .backing_store_mut()
            .resize((old_num_pages + page_count) * page_size);
        old_num_pages
    };

    for vpn in old_num_pages..old_num_pages + page_count {
        let frame =
            manager.allocate_frame(FrameOwner::new(process, vpn), None, machine, spaces)?;
        trace!("Shared vpn {} of process {} uses frame {}", vpn, process, frame);

        machine.frame_mut(frame).fill(0);
        manager.frame_table_mut().mark_shared(frame);
        if let Some(space) = spaces.space_mut(process) {
            space.table_mut().install_shared(vpn, frame);
        }
        manager.statistics_mut().page_faults += 1;
    }

    if machine.current_process() == Some(process) {
        machine.publish_page_table(process, old_num_pages + page_count);
    }

    debug!(
        "Attached {} shared pages to process {} at {:#x}",
        page_count,
        process,
        old_num_pages * page_size
    );
    Ok(old_num_pages * page_size)
}
