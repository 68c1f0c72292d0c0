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

mod address_space;
mod frame_table;
mod machine;
mod memory_manager;
mod process_table;
mod statistics;
mod translation_table;
mod util;
mod vm_config;
mod virtual_memory;

#[cfg(test)]
mod test;

pub mod modules;

pub use address_space::AddressSpace;
pub use frame_table::{FrameInfo, FrameNumber, FrameOwner, FrameTable};
pub use machine::{
    ExceptionType, Machine, NEXT_PC_REG, NUM_GP_REGS, NUM_TOTAL_REGS, PC_REG, STACK_REG,
};
pub use memory_manager::{MemoryManager, SpaceLookup};
pub use process_table::{ProcessEntry, ProcessId, ProcessTable};
pub use statistics::Statistics;
pub use translation_table::{TranslationEntry, TranslationTable};
pub use virtual_memory::VirtualMemory;
pub use vm_config::VMConfig;
