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

use log::{debug, error, trace};

use crate::{
    frame_table::{FrameNumber, FrameOwner},
    machine::Machine,
    memory_manager::{MemoryManager, SpaceLookup},
    modules::{
        backing_store::BackingStoreModule,
        executable::{ExecutableModule, FileSystemModule},
        replacement::ReplacementModule,
    },
    process_table::ProcessId,
};

use super::AddressSpace;

impl AddressSpace {
    /// Fills `dest` with page `vpn` as described by the program image.
    ///
    /// Bytes covered by the code or the initialized data segment are read
    /// from the image, everything else is zero.
    fn read_page_from_executable<E: ExecutableModule>(
        &self,
        vpn: usize,
        executable: &mut E,
        dest: &mut [u8],
    ) -> Result<(), ()> {
        dest.fill(0);

        let page_start = vpn * self.page_size;
        let page_end = page_start + self.page_size;

        for segment in self.header.file_segments() {
            let (start, end) = segment.virtual_range();
            let from = start.max(page_start);
            let to = end.min(page_end);
            if from >= to {
                continue;
            }

            let offset = segment.in_file_addr as usize + (from - start);
            trace!(
                "Load {} bytes of vpn {} from file offset {}",
                to - from,
                vpn,
                offset
            );
            executable.read_exact_at(&mut dest[from - page_start..to - page_start], offset)?;
        }

        Ok(())
    }

    /// Fills `frame` with the contents of `vpn`, either from the image or
    /// from the backing store.
    fn load_page<F: FileSystemModule>(
        &mut self,
        vpn: usize,
        frame: &mut [u8],
        file_system: &mut F,
    ) -> Result<(), ()> {
        if self.table.entry(vpn).load_from_swap {
            trace!("Load vpn {} of process {} from swap", vpn, self.process);
            return self.backing_store.read_page(vpn, frame);
        }

        trace!(
            "Load vpn {} of process {} from {}",
            vpn,
            self.process,
            self.source_path
        );
        let mut executable = file_system.open(&self.source_path)?;
        self.read_page_from_executable(vpn, &mut executable, frame)
            .map_err(|_| {
                error!(
                    "Could not read vpn {} of process {} from {}",
                    vpn, self.process, self.source_path
                );
            })?;

        // from now on the backing store holds the current contents
        self.backing_store.write_page(vpn, frame)?;
        self.table.entry_mut(vpn).load_from_swap = true;

        Ok(())
    }
}

/// Makes the page containing `address` of `process` resident.
///
/// Returns the tick at which the faulting context can continue.
pub(crate) fn handle_page_fault<R, F, P>(
    manager: &mut MemoryManager<R>,
    machine: &mut Machine,
    spaces: &mut P,
    file_system: &mut F,
    process: ProcessId,
    address: usize,
) -> Result<u64, ()>
where
    R: ReplacementModule,
    F: FileSystemModule,
    P: SpaceLookup,
{
    let vpn = address / manager.page_size();
    let space = match spaces.space(process) {
        Some(space) => space,
        None => panic!("page fault of unknown process {}", process),
    };
    let num_pages = space.num_pages();
    if vpn >= num_pages {
        error!(
            "Page fault of process {} at {:#x} (vpn {}) outside of its {} pages",
            process, address, vpn, num_pages
        );
        panic!("page fault address {:#x} out of range", address);
    }
    if space.table().entry(vpn).is_valid() {
        debug!("vpn {} of process {} is already resident", vpn, process);
        return Ok(manager.statistics().total_ticks);
    }

    trace!("Page fault of process {} at {:#x} (vpn {})", process, address, vpn);
    let frame = manager.allocate_frame(FrameOwner::new(process, vpn), None, machine, spaces)?;

    if let Err(()) = load_into_frame(machine, spaces, file_system, process, vpn, frame) {
        manager.frame_table_mut().release(frame);
        return Err(());
    }

    manager.statistics_mut().page_faults += 1;
    Ok(manager.statistics().total_ticks + manager.config().fault_latency_ticks)
}

fn load_into_frame<F: FileSystemModule, P: SpaceLookup>(
    machine: &mut Machine,
    spaces: &mut P,
    file_system: &mut F,
    process: ProcessId,
    vpn: usize,
    frame: FrameNumber,
) -> Result<(), ()> {
    let space = match spaces.space_mut(process) {
        Some(space) => space,
        None => panic!("unknown process {}", process),
    };

    space.load_page(vpn, machine.frame_mut(frame), file_system)?;
    space.table.install(vpn, frame);

    Ok(())
}
