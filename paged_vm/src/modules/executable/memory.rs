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

use std::{collections::HashMap, rc::Rc};

use log::error;

use super::{ExecutableModule, FileSystemModule};

/// Program image kept in memory
#[derive(Debug, Clone)]
pub struct MemoryExecutableModule {
    data: Rc<[u8]>,
}

impl MemoryExecutableModule {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ExecutableModule for MemoryExecutableModule {
    fn read_at(&mut self, dest: &mut [u8], offset: usize) -> Result<usize, ()> {
        if offset >= self.data.len() {
            return Ok(0);
        }

        let len = dest.len().min(self.data.len() - offset);
        dest[..len].copy_from_slice(&self.data[offset..offset + len]);
        Ok(len)
    }
}

/// Path -> image map, stands in for the kernel file system
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystemModule {
    files: HashMap<String, Rc<[u8]>>,
}

impl MemoryFileSystemModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the file at `path`
    pub fn add_file(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(path.to_string(), data.into());
    }

    pub fn remove_file(&mut self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }
}

impl FileSystemModule for MemoryFileSystemModule {
    type File = MemoryExecutableModule;

    fn open(&mut self, path: &str) -> Result<Self::File, ()> {
        match self.files.get(path) {
            Some(data) => Ok(MemoryExecutableModule { data: data.clone() }),
            None => {
                error!("Could not open {}: no such file", path);
                Err(())
            }
        }
    }
}
