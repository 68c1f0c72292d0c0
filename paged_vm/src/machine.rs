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

//! Minimal model of the simulated MIPS machine: main memory, the register
//! file and the address translation step that raises page faults.

use log::trace;

use crate::{
    frame_table::FrameNumber, memory_manager::SpaceLookup, process_table::ProcessId,
};

pub const STACK_REG: usize = 29;
pub const PC_REG: usize = 34;
pub const NEXT_PC_REG: usize = 35;
pub const NUM_GP_REGS: usize = 32;
pub const NUM_TOTAL_REGS: usize = 40;

/// Exceptions the translation step can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    /// No valid translation for `address`
    PageFault { address: usize },

    /// Write to a read only page
    ReadOnly { address: usize },

    /// Translation resulted in an invalid physical address
    BusError { address: usize },

    /// Unaligned access or access beyond the end of the address space
    AddressError { address: usize },
}

pub struct Machine {
    page_size: usize,

    main_memory: Vec<u8>,

    registers: [i32; NUM_TOTAL_REGS],

    /// Process whose translation table is currently used for translation
    current: Option<ProcessId>,

    /// Length of the published translation table
    page_table_size: usize,
}

impl Machine {
    pub(crate) fn new(page_size: usize, num_phys_pages: usize) -> Self {
        Self {
            page_size,
            main_memory: vec![0u8; page_size * num_phys_pages],
            registers: [0; NUM_TOTAL_REGS],
            current: None,
            page_table_size: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn main_memory(&self) -> &[u8] {
        &self.main_memory
    }

    pub fn frame(&self, frame: FrameNumber) -> &[u8] {
        let start = frame * self.page_size;
        &self.main_memory[start..start + self.page_size]
    }

    pub(crate) fn frame_mut(&mut self, frame: FrameNumber) -> &mut [u8] {
        let start = frame * self.page_size;
        &mut self.main_memory[start..start + self.page_size]
    }

    pub(crate) fn copy_frame(&mut self, src: FrameNumber, dest: FrameNumber) {
        let page_size = self.page_size;
        self.main_memory
            .copy_within(src * page_size..(src + 1) * page_size, dest * page_size);
    }

    pub fn read_register(&self, reg: usize) -> i32 {
        self.registers[reg]
    }

    pub fn write_register(&mut self, reg: usize, value: i32) {
        self.registers[reg] = value;
    }

    pub(crate) fn registers(&self) -> &[i32; NUM_TOTAL_REGS] {
        &self.registers
    }

    pub(crate) fn set_registers(&mut self, registers: &[i32; NUM_TOTAL_REGS]) {
        self.registers = *registers;
    }

    /// Process whose translation table is currently in use
    pub fn current_process(&self) -> Option<ProcessId> {
        self.current
    }

    pub fn page_table_size(&self) -> usize {
        self.page_table_size
    }

    /// Makes the translation table of `process` the one used for translation
    pub(crate) fn publish_page_table(&mut self, process: ProcessId, len: usize) {
        trace!("Publish page table of process {} ({} pages)", process, len);
        self.current = Some(process);
        self.page_table_size = len;
    }

    pub(crate) fn unpublish_page_table(&mut self) {
        self.current = None;
        self.page_table_size = 0;
    }

    /// Translates `address` of the current process into a physical address.
    ///
    /// Sets the `used` bit of the page and the `dirty` bit if `writing`.
    pub(crate) fn translate<P: SpaceLookup>(
        &self,
        spaces: &mut P,
        address: usize,
        size: usize,
        writing: bool,
    ) -> Result<usize, ExceptionType> {
        if (size == 4 && address & 0x3 != 0) || (size == 2 && address & 0x1 != 0) {
            trace!("Unaligned access at {:#x} (size {})", address, size);
            return Err(ExceptionType::AddressError { address });
        }

        let vpn = address / self.page_size;
        let offset = address % self.page_size;
        if vpn >= self.page_table_size {
            return Err(ExceptionType::AddressError { address });
        }

        let process = match self.current {
            Some(process) => process,
            None => return Err(ExceptionType::AddressError { address }),
        };
        let entry = match spaces
            .space_mut(process)
            .and_then(|space| space.table_mut().get_mut(vpn))
        {
            Some(entry) => entry,
            None => return Err(ExceptionType::AddressError { address }),
        };

        if !entry.valid {
            return Err(ExceptionType::PageFault { address });
        }
        if entry.read_only && writing {
            return Err(ExceptionType::ReadOnly { address });
        }

        let frame = match entry.physical_page {
            Some(frame) if (frame + 1) * self.page_size <= self.main_memory.len() => frame,
            _ => return Err(ExceptionType::BusError { address }),
        };

        entry.used = true;
        if writing {
            entry.dirty = true;
        }

        Ok(frame * self.page_size + offset)
    }

    /// Reads 1, 2 or 4 bytes (little endian) of the current process
    pub(crate) fn read_mem<P: SpaceLookup>(
        &self,
        spaces: &mut P,
        address: usize,
        size: usize,
    ) -> Result<u32, ExceptionType> {
        assert!(matches!(size, 1 | 2 | 4), "invalid access size {}", size);
        let physical = self.translate(spaces, address, size, false)?;

        let mut bytes = [0u8; 4];
        bytes[..size].copy_from_slice(&self.main_memory[physical..physical + size]);
        Ok(u32::from_le_bytes(bytes))
    }

    /// Writes 1, 2 or 4 bytes (little endian) of the current process
    pub(crate) fn write_mem<P: SpaceLookup>(
        &mut self,
        spaces: &mut P,
        address: usize,
        size: usize,
        value: u32,
    ) -> Result<(), ExceptionType> {
        assert!(matches!(size, 1 | 2 | 4), "invalid access size {}", size);
        let physical = self.translate(spaces, address, size, true)?;

        let bytes = value.to_le_bytes();
        self.main_memory[physical..physical + size].copy_from_slice(&bytes[..size]);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{address_space::AddressSpace, process_table::ProcessId, ProcessTable};

    use super::{ExceptionType, Machine};

    const PAGE_SIZE: usize = 64;

    /// Process 1 with 3 pages, vpn 1 is resident in frame 2
    fn get_test_machine() -> (Machine, ProcessTable) {
        let mut machine = Machine::new(PAGE_SIZE, 4);
        let mut processes = ProcessTable::new();

        let mut space = AddressSpace::empty(ProcessId(1), 3, PAGE_SIZE);
        space.table_mut().install(1, 2);
        processes.insert(ProcessId(1), space);
        machine.publish_page_table(ProcessId(1), 3);

        (machine, processes)
    }

    #[test]
    fn test_translate() {
        let (machine, mut processes) = get_test_machine();

        assert_eq!(machine.translate(&mut processes, PAGE_SIZE + 4, 4, false), Ok(2 * PAGE_SIZE + 4));
        let entry = processes.entry(ProcessId(1)).space().table().entry(1);
        assert!(entry.is_used());
        assert!(!entry.is_dirty());

        assert_eq!(machine.translate(&mut processes, PAGE_SIZE + 5, 1, true), Ok(2 * PAGE_SIZE + 5));
        assert!(processes.entry(ProcessId(1)).space().table().entry(1).is_dirty());
    }

    #[test]
    fn test_translate_exceptions() {
        let (mut machine, mut processes) = get_test_machine();

        assert_eq!(
            machine.translate(&mut processes, PAGE_SIZE + 2, 4, false),
            Err(ExceptionType::AddressError { address: PAGE_SIZE + 2 })
        );
        assert_eq!(
            machine.translate(&mut processes, PAGE_SIZE + 1, 2, false),
            Err(ExceptionType::AddressError { address: PAGE_SIZE + 1 })
        );
        assert_eq!(
            machine.translate(&mut processes, 3 * PAGE_SIZE, 1, false),
            Err(ExceptionType::AddressError { address: 3 * PAGE_SIZE })
        );
        assert_eq!(
            machine.translate(&mut processes, 8, 4, false),
            Err(ExceptionType::PageFault { address: 8 })
        );

        let table = processes.entry_mut(ProcessId(1)).space.table_mut();
        table.entry_mut(1).read_only = true;
        table.install(2, 9);
        assert_eq!(
            machine.translate(&mut processes, PAGE_SIZE, 4, true),
            Err(ExceptionType::ReadOnly { address: PAGE_SIZE })
        );
        assert_eq!(
            machine.translate(&mut processes, 2 * PAGE_SIZE, 4, false),
            Err(ExceptionType::BusError { address: 2 * PAGE_SIZE })
        );

        machine.unpublish_page_table();
        assert_eq!(
            machine.translate(&mut processes, PAGE_SIZE, 4, false),
            Err(ExceptionType::AddressError { address: PAGE_SIZE })
        );
    }

    #[test]
    fn test_read_write_little_endian() {
        let (mut machine, mut processes) = get_test_machine();

        machine.write_mem(&mut processes, PAGE_SIZE, 4, 0x11223344).unwrap();
        assert_eq!(machine.frame(2)[..4], [0x44, 0x33, 0x22, 0x11]);

        assert_eq!(machine.read_mem(&mut processes, PAGE_SIZE, 4), Ok(0x11223344));
        assert_eq!(machine.read_mem(&mut processes, PAGE_SIZE, 2), Ok(0x3344));
        assert_eq!(machine.read_mem(&mut processes, PAGE_SIZE + 3, 1), Ok(0x11));

        machine.write_mem(&mut processes, PAGE_SIZE + 2, 2, 0xBEEF).unwrap();
        assert_eq!(machine.read_mem(&mut processes, PAGE_SIZE, 4), Ok(0xBEEF3344));
    }

    #[test]
    fn test_copy_frame() {
        let mut machine = Machine::new(PAGE_SIZE, 4);
        machine.frame_mut(1).fill(3);
        machine.copy_frame(1, 3);

        assert!(machine.frame(3).iter().all(|x| *x == 3));
        assert!(machine.frame(0).iter().all(|x| *x == 0));
        assert_eq!(machine.main_memory().len(), 4 * PAGE_SIZE);
    }
}
