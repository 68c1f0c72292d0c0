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

use crate::modules::replacement::ReplacementPolicy;

/// Configuration of the simulated machine and the paging subsystem
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VMConfig {
    /// Size of a virtual page and of a physical frame in bytes
    pub page_size: usize,

    /// Number of physical frames of the main memory
    pub num_phys_pages: usize,

    /// Bytes reserved for the user stack at the end of each address space
    pub user_stack_size: usize,

    /// Simulated ticks a faulting context has to wait for the "disk"
    pub fault_latency_ticks: u64,

    /// Which replacement module is used once no frame is free
    pub replacement_policy: ReplacementPolicy,

    /// Seed for policies that make random decisions
    pub random_seed: u64,
}

impl Default for VMConfig {
    fn default() -> Self {
        Self {
            page_size: 128,
            num_phys_pages: 32,
            user_stack_size: 1024,
            fault_latency_ticks: 1000,
            replacement_policy: ReplacementPolicy::Random,
            random_seed: 5446535461589659585,
        }
    }
}

impl VMConfig {
    /// Size of the main memory in bytes
    pub fn memory_size(&self) -> usize {
        self.page_size * self.num_phys_pages
    }

    pub(crate) fn check(&self) {
        assert!(self.page_size > 0, "page size has to be greater than zero");
        assert!(
            self.page_size % 4 == 0,
            "page size has to be word aligned (page_size={})",
            self.page_size
        );
        assert!(self.num_phys_pages > 0, "machine needs at least one frame");
        assert!(
            self.user_stack_size >= 16,
            "user stack is too small (user_stack_size={})",
            self.user_stack_size
        );
    }
}
