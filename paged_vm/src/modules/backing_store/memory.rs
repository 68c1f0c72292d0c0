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

use log::error;

use super::BackingStoreModule;

/// Backing store that keeps all pages in a heap allocated buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBackingStoreModule {
    data: Vec<u8>,
}

impl MemoryBackingStoreModule {
    /// Creates a zero filled store of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    /// Grows (zero filled) or shrinks this store to `size` bytes
    pub fn resize(&mut self, size: usize) {
        self.data.resize(size, 0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn check_access(&self, offset: usize, len: usize) -> Result<(), ()> {
        if offset + len > self.data.len() {
            error!(
                "illegal backing store access, offset: {}, len: {}, size: {}",
                offset,
                len,
                self.data.len()
            );
            return Err(());
        }

        Ok(())
    }
}

impl BackingStoreModule for MemoryBackingStoreModule {
    fn read(&mut self, offset: usize, dest: &mut [u8]) -> Result<(), ()> {
        self.check_access(offset, dest.len())?;
        dest.copy_from_slice(&self.data[offset..offset + dest.len()]);
        Ok(())
    }

    fn get_max_size(&self) -> usize {
        self.data.len()
    }

    fn write(&mut self, offset: usize, src: &[u8]) -> Result<(), ()> {
        self.check_access(offset, src.len())?;
        self.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}
