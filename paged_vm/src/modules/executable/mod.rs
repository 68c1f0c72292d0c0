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

mod file;
mod memory;
mod noff;

pub use file::{FileExecutableModule, HostFileSystemModule};
pub use memory::{MemoryExecutableModule, MemoryFileSystemModule};
pub use noff::{NoffHeader, Segment, NOFF_HEADER_SIZE, NOFF_MAGIC};

/// Read access to a program image
pub trait ExecutableModule {
    /// Reads up to `dest.len()` bytes starting at `offset` of the image.
    ///
    /// Returns how many bytes were read, this is less than `dest.len()`
    /// if the image ends before.
    fn read_at(&mut self, dest: &mut [u8], offset: usize) -> Result<usize, ()>;

    /// Reads exactly `dest.len()` bytes or fails
    fn read_exact_at(&mut self, dest: &mut [u8], offset: usize) -> Result<(), ()> {
        if self.read_at(dest, offset)? != dest.len() {
            return Err(());
        }
        Ok(())
    }
}

/// Opens program images by path
pub trait FileSystemModule {
    type File: ExecutableModule;

    fn open(&mut self, path: &str) -> Result<Self::File, ()>;
}
