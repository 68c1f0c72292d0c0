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

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use log::error;

use super::{ExecutableModule, FileSystemModule};

/// Program image read from a file of the host
pub struct FileExecutableModule {
    file: File,
}

impl FileExecutableModule {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::options().read(true).open(path)?;
        Ok(Self { file })
    }
}

impl ExecutableModule for FileExecutableModule {
    fn read_at(&mut self, dest: &mut [u8], offset: usize) -> Result<usize, ()> {
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .map_err(|_| ())?;

        // a single read may return less than requested even if the file is long enough
        let mut read = 0;
        while read < dest.len() {
            match self.file.read(&mut dest[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!("Could not read executable at offset {}: {}", offset, err);
                    return Err(());
                }
            }
        }

        Ok(read)
    }
}

/// Resolves paths relative to `root` on the host file system
pub struct HostFileSystemModule {
    root: PathBuf,
}

impl HostFileSystemModule {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl FileSystemModule for HostFileSystemModule {
    type File = FileExecutableModule;

    fn open(&mut self, path: &str) -> Result<Self::File, ()> {
        let full_path = self.root.join(path);
        FileExecutableModule::open(&full_path).map_err(|err| {
            error!("Could not open {}: {}", full_path.display(), err);
        })
    }
}
