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

use log::{debug, info, trace};

use crate::{
    address_space::{self, AddressSpace},
    frame_table::FrameTable,
    machine::{ExceptionType, Machine, NEXT_PC_REG, NUM_TOTAL_REGS, PC_REG, STACK_REG},
    memory_manager::MemoryManager,
    modules::{
        executable::FileSystemModule,
        replacement::{AnyReplacementModule, ReplacementModule},
    },
    process_table::{ProcessId, ProcessTable},
    statistics::Statistics,
    vm_config::VMConfig,
};

/// Paging subsystem of the kernel.
///
/// Owns the simulated machine, the memory manager and all address spaces.
/// Address spaces are addressed by the id of the process they belong to.
pub struct VirtualMemory<R: ReplacementModule, F: FileSystemModule> {
    manager: MemoryManager<R>,
    machine: Machine,
    processes: ProcessTable,
    file_system: F,
}

impl<F: FileSystemModule> VirtualMemory<AnyReplacementModule, F> {
    /// Uses the replacement module selected in `config`
    pub fn from_config(config: VMConfig, file_system: F) -> Self {
        let replacement = AnyReplacementModule::from_config(&config);
        Self::new(config, replacement, file_system)
    }
}

impl<R: ReplacementModule, F: FileSystemModule> VirtualMemory<R, F> {
    pub fn new(config: VMConfig, replacement: R, file_system: F) -> Self {
        info!(
            "Initialize virtual memory: {} frames of {} bytes, oversubscription: {}",
            config.num_phys_pages,
            config.page_size,
            replacement.allows_oversubscription()
        );

        Self {
            machine: Machine::new(config.page_size, config.num_phys_pages),
            manager: MemoryManager::new(config, replacement),
            processes: ProcessTable::new(),
            file_system,
        }
    }

    /// Creates the address space of `process` for the executable at `path`
    pub fn load_executable(&mut self, process: ProcessId, path: &str) -> Result<(), ()> {
        let mut executable = self.file_system.open(path)?;
        let space = AddressSpace::from_executable(process, &mut executable, path, &self.manager)?;
        self.processes.insert(process, space);
        Ok(())
    }

    /// Creates the address space of `child` as a copy of the one of `parent`
    pub fn fork(&mut self, parent: ProcessId, child: ProcessId) -> Result<(), ()> {
        debug!("Fork process {} into {}", parent, child);
        let space = self.processes.entry(parent).space().new_child(child);
        self.processes.insert(child, space);

        address_space::copy_resident_pages(
            &mut self.manager,
            &mut self.machine,
            &mut self.processes,
            parent,
            child,
        )
    }

    /// Tears down the address space of `process` and forgets the process
    pub fn exit(&mut self, process: ProcessId) {
        debug!("Process {} exits", process);
        self.processes.mark_exiting(process);
        self.processes
            .entry_mut(process)
            .space
            .destroy(self.manager.frame_table_mut());
        self.processes.remove(process);

        if self.machine.current_process() == Some(process) {
            self.machine.unpublish_page_table();
        }
    }

    /// Appends `page_count` shared pages to the address space of `process`.
    ///
    /// Returns the virtual address of the new region.
    pub fn attach_shared_region(
        &mut self,
        process: ProcessId,
        page_count: usize,
    ) -> Result<usize, ()> {
        address_space::attach_shared_region(
            &mut self.manager,
            &mut self.machine,
            &mut self.processes,
            process,
            page_count,
        )
    }

    /// Services a page fault of `process` at `address`.
    ///
    /// Returns the tick at which the faulting context may continue.
    pub fn handle_fault(&mut self, process: ProcessId, address: usize) -> Result<u64, ()> {
        address_space::handle_page_fault(
            &mut self.manager,
            &mut self.machine,
            &mut self.processes,
            &mut self.file_system,
            process,
            address,
        )
    }

    /// Evicts the resident page `vpn` of `process`.
    ///
    /// Returns `false` if the page is not resident.
    pub fn page_out(&mut self, process: ProcessId, vpn: usize) -> Result<bool, ()> {
        let entry = self.processes.entry(process).space().table().entry(vpn);
        let frame = match entry.resident_frame() {
            Some(frame) => frame,
            None => return Ok(false),
        };
        assert!(!entry.is_shared(), "shared pages can not be paged out");

        self.manager
            .evict(frame, &self.machine, &mut self.processes)?;
        Ok(true)
    }

    /// Sets up the registers for the first instruction of `process`
    pub fn init_registers(&mut self, process: ProcessId) {
        let size = self.processes.entry(process).space().size();

        let mut registers = [0; NUM_TOTAL_REGS];
        registers[PC_REG] = 0;
        registers[NEXT_PC_REG] = 4;
        registers[STACK_REG] = (size - 16) as i32;
        trace!(
            "Init registers of process {}, stack pointer: {:#x}",
            process,
            size - 16
        );

        self.processes.entry_mut(process).user_registers = registers;
        self.machine.set_registers(&registers);
    }

    /// Saves the user registers of `process` before it gets switched out
    pub fn save_state(&mut self, process: ProcessId) {
        let registers = *self.machine.registers();
        self.processes.entry_mut(process).user_registers = registers;
    }

    /// Switches the machine to `process`: restores its registers and
    /// publishes its translation table.
    pub fn restore_state(&mut self, process: ProcessId) {
        let entry = self.processes.entry(process);
        let num_pages = entry.space().num_pages();
        self.machine.set_registers(&entry.user_registers);
        self.machine.publish_page_table(process, num_pages);
    }

    /// Reads `size` bytes at `address` of the current process like the
    /// simulator does, a missing page raises [`ExceptionType::PageFault`].
    pub fn read_mem(&mut self, address: usize, size: usize) -> Result<u32, ExceptionType> {
        self.machine.read_mem(&mut self.processes, address, size)
    }

    pub fn write_mem(&mut self, address: usize, size: usize, value: u32) -> Result<(), ExceptionType> {
        self.machine
            .write_mem(&mut self.processes, address, size, value)
    }

    /// Like [`Self::read_mem`], but page faults are serviced and the access
    /// is retried.
    pub fn user_read(&mut self, address: usize, size: usize) -> Result<u32, ExceptionType> {
        match self.read_mem(address, size) {
            Err(ExceptionType::PageFault { address }) => {
                self.service_fault(address)?;
                self.read_mem(address, size)
            }
            result => result,
        }
    }

    /// Like [`Self::write_mem`], but page faults are serviced and the access
    /// is retried.
    pub fn user_write(&mut self, address: usize, size: usize, value: u32) -> Result<(), ExceptionType> {
        match self.write_mem(address, size, value) {
            Err(ExceptionType::PageFault { address }) => {
                self.service_fault(address)?;
                self.write_mem(address, size, value)
            }
            result => result,
        }
    }

    /// Handles a fault of the current process and waits until it is resolved
    fn service_fault(&mut self, address: usize) -> Result<(), ExceptionType> {
        let process = match self.machine.current_process() {
            Some(process) => process,
            None => return Err(ExceptionType::AddressError { address }),
        };

        let wake_up = self
            .handle_fault(process, address)
            .map_err(|_| ExceptionType::BusError { address })?;

        let stats = self.manager.statistics_mut();
        stats.total_ticks = stats.total_ticks.max(wake_up);
        Ok(())
    }

    /// Advances the simulated time
    pub fn tick(&mut self, ticks: u64) {
        self.manager.statistics_mut().total_ticks += ticks;
    }

    pub fn statistics(&self) -> &Statistics {
        self.manager.statistics()
    }

    pub fn config(&self) -> &VMConfig {
        self.manager.config()
    }

    pub fn address_space(&self, process: ProcessId) -> Option<&AddressSpace> {
        self.processes.get(process).map(|entry| entry.space())
    }

    pub fn frame_table(&self) -> &FrameTable {
        self.manager.frame_table()
    }

    pub fn replacement(&self) -> &R {
        self.manager.replacement()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn file_system_mut(&mut self) -> &mut F {
        &mut self.file_system
    }
}
