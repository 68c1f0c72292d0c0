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

use log::{error, trace};

use crate::{
    address_space::AddressSpace,
    frame_table::{FrameNumber, FrameOwner, FrameTable},
    machine::Machine,
    modules::replacement::{ReplacementModule, VictimCandidates},
    process_table::ProcessId,
    statistics::Statistics,
    vm_config::VMConfig,
};

/// Access to the address spaces of all processes.
///
/// The allocator uses this to back up a victim page that belongs to
/// another process than the one it allocates for.
pub trait SpaceLookup {
    fn space(&self, process: ProcessId) -> Option<&AddressSpace>;

    fn space_mut(&mut self, process: ProcessId) -> Option<&mut AddressSpace>;

    /// Is `process` currently tearing down its address space?
    fn is_exiting(&self, process: ProcessId) -> bool;
}

/// Global state of the paging subsystem: frame table, replacement
/// module and statistics.
pub struct MemoryManager<R: ReplacementModule> {
    config: VMConfig,
    frame_table: FrameTable,
    replacement: R,

    /// Next frame the free frame search starts at
    cursor: FrameNumber,

    stats: Statistics,
}

impl<R: ReplacementModule> MemoryManager<R> {
    pub(crate) fn new(config: VMConfig, replacement: R) -> Self {
        config.check();

        Self {
            frame_table: FrameTable::new(config.num_phys_pages),
            config,
            replacement,
            cursor: 0,
            stats: Statistics::default(),
        }
    }

    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    pub fn frame_table(&self) -> &FrameTable {
        &self.frame_table
    }

    pub(crate) fn frame_table_mut(&mut self) -> &mut FrameTable {
        &mut self.frame_table
    }

    pub fn replacement(&self) -> &R {
        &self.replacement
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.stats
    }

    /// Fails if an address space of `num_pages` pages can never be
    /// resident at once while the replacement module cannot evict.
    pub(crate) fn check_capacity(&self, num_pages: usize) {
        if self.replacement.allows_oversubscription() {
            return;
        }

        if num_pages + self.frame_table.allocated() > self.config.num_phys_pages {
            error!(
                "Address space with {} pages does not fit ({} of {} frames allocated)",
                num_pages,
                self.frame_table.allocated(),
                self.config.num_phys_pages
            );
            panic!("not enough physical memory for {} pages", num_pages);
        }
    }

    /// Returns a frame claimed by `owner`.
    ///
    /// Free frames are handed out first. Otherwise the replacement module
    /// chooses a victim which is backed up by its owner. `protect` is never
    /// chosen as victim.
    pub(crate) fn allocate_frame<P: SpaceLookup>(
        &mut self,
        owner: FrameOwner,
        protect: Option<FrameNumber>,
        machine: &Machine,
        spaces: &mut P,
    ) -> Result<FrameNumber, ()> {
        let frame = match self.frame_table.find_free(self.cursor) {
            Some(frame) => frame,
            None => {
                let victim = {
                    let exiting = |process: ProcessId| spaces.is_exiting(process);
                    let candidates = VictimCandidates::new(&self.frame_table, protect, &exiting);
                    self.replacement.select_victim(&candidates)
                };

                let victim = match victim {
                    Some(victim) => victim,
                    None => {
                        error!(
                            "No frame left for process {} vpn {}",
                            owner.process, owner.vpn
                        );
                        self.frame_table.dump();
                        panic!("physical memory exhausted");
                    }
                };

                self.evict(victim, machine, spaces)?;
                victim
            }
        };

        trace!(
            "Allocate frame {} for process {} vpn {}",
            frame,
            owner.process,
            owner.vpn
        );
        self.frame_table.claim(frame, owner);
        self.replacement.frame_claimed(frame);
        self.cursor = (frame + 1) % self.frame_table.len();

        Ok(frame)
    }

    /// Backs up the page currently stored in `frame` and frees the frame
    pub(crate) fn evict<P: SpaceLookup>(
        &mut self,
        frame: FrameNumber,
        machine: &Machine,
        spaces: &mut P,
    ) -> Result<(), ()> {
        let owner = match self.frame_table.owner(frame) {
            Some(owner) if !self.frame_table.is_shared(frame) => owner,
            _ => {
                error!("Frame {} can not be evicted", frame);
                self.frame_table.dump();
                panic!("frame {} is free or shared", frame);
            }
        };

        assert!(
            !spaces.is_exiting(owner.process),
            "process {} is exiting, its pages can not be backed up",
            owner.process
        );

        let consistent = spaces
            .space(owner.process)
            .and_then(|space| space.table().get(owner.vpn))
            .map_or(false, |entry| entry.resident_frame() == Some(frame));
        if !consistent {
            error!(
                "Frame {} claims to hold vpn {} of process {}, but the translation table disagrees",
                frame, owner.vpn, owner.process
            );
            self.frame_table.dump();
            panic!("inconsistent frame table");
        }

        trace!(
            "Evict frame {} (process {} vpn {})",
            frame,
            owner.process,
            owner.vpn
        );

        let space = match spaces.space_mut(owner.process) {
            Some(space) => space,
            None => panic!("unknown process {}", owner.process),
        };
        space.backup(owner.vpn, machine, &mut self.frame_table, &mut self.stats)?;
        self.stats.evictions += 1;

        Ok(())
    }
}
