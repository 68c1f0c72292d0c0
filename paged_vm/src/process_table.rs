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

use core::fmt::Display;
use std::collections::BTreeMap;

use log::debug;

use crate::{address_space::AddressSpace, machine::NUM_TOTAL_REGS, memory_manager::SpaceLookup};

/// Identifier of a user process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl Display for ProcessId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the kernel keeps about a user process
#[derive(Debug)]
pub struct ProcessEntry {
    pub(crate) space: AddressSpace,

    /// Set while the process is tearing down its address space
    pub(crate) exiting: bool,

    /// User registers while the process is switched out
    pub(crate) user_registers: [i32; NUM_TOTAL_REGS],
}

impl ProcessEntry {
    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    pub fn user_registers(&self) -> &[i32; NUM_TOTAL_REGS] {
        &self.user_registers
    }
}

/// Lookup from process id to its address space
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: BTreeMap<ProcessId, ProcessEntry>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn get(&self, process: ProcessId) -> Option<&ProcessEntry> {
        self.processes.get(&process)
    }

    pub fn ids(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.processes.keys().copied()
    }

    pub(crate) fn insert(&mut self, process: ProcessId, space: AddressSpace) {
        debug!("Register process {}", process);
        let prev = self.processes.insert(
            process,
            ProcessEntry {
                space,
                exiting: false,
                user_registers: [0; NUM_TOTAL_REGS],
            },
        );
        assert!(prev.is_none(), "process {} already exists", process);
    }

    pub(crate) fn mark_exiting(&mut self, process: ProcessId) {
        self.entry_mut(process).exiting = true;
    }

    pub(crate) fn remove(&mut self, process: ProcessId) -> Option<ProcessEntry> {
        debug!("Remove process {}", process);
        self.processes.remove(&process)
    }

    /// Mutable entry of `process`, an unknown process is fatal
    pub(crate) fn entry_mut(&mut self, process: ProcessId) -> &mut ProcessEntry {
        match self.processes.get_mut(&process) {
            Some(entry) => entry,
            None => panic!("unknown process {}", process),
        }
    }

    /// Like [`ProcessTable::get`] but an unknown process is fatal
    pub(crate) fn entry(&self, process: ProcessId) -> &ProcessEntry {
        match self.processes.get(&process) {
            Some(entry) => entry,
            None => panic!("unknown process {}", process),
        }
    }
}

impl SpaceLookup for ProcessTable {
    fn space(&self, process: ProcessId) -> Option<&AddressSpace> {
        self.processes.get(&process).map(|entry| &entry.space)
    }

    fn space_mut(&mut self, process: ProcessId) -> Option<&mut AddressSpace> {
        self.processes.get_mut(&process).map(|entry| &mut entry.space)
    }

    fn is_exiting(&self, process: ProcessId) -> bool {
        self.processes
            .get(&process)
            .map_or(false, |entry| entry.exiting)
    }
}

#[cfg(test)]
mod test {
    use crate::{address_space::AddressSpace, memory_manager::SpaceLookup};

    use super::{ProcessId, ProcessTable};

    #[test]
    fn test_insert_and_remove() {
        let mut table = ProcessTable::new();
        table.insert(ProcessId(3), AddressSpace::empty(ProcessId(3), 2, 64));
        table.insert(ProcessId(1), AddressSpace::empty(ProcessId(1), 4, 64));

        assert_eq!(table.len(), 2);
        assert_eq!(table.ids().collect::<Vec<_>>(), vec![ProcessId(1), ProcessId(3)]);
        assert_eq!(table.space(ProcessId(1)).unwrap().num_pages(), 4);
        assert!(table.space(ProcessId(2)).is_none());

        assert!(!table.is_exiting(ProcessId(3)));
        table.mark_exiting(ProcessId(3));
        assert!(table.is_exiting(ProcessId(3)));

        assert!(table.remove(ProcessId(3)).unwrap().is_exiting());
        assert!(!table.is_exiting(ProcessId(3)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_insert_twice() {
        let mut table = ProcessTable::new();
        table.insert(ProcessId(1), AddressSpace::empty(ProcessId(1), 1, 64));
        table.insert(ProcessId(1), AddressSpace::empty(ProcessId(1), 1, 64));
    }

    #[test]
    #[should_panic]
    fn test_unknown_process() {
        let table = ProcessTable::new();
        table.entry(ProcessId(7));
    }
}
