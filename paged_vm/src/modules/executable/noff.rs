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

//! NOFF ("Nachos object file format") header.
//!
//! A NOFF image starts with the header below, followed by the contents of
//! the code and the initialized data segment. All header words are stored
//! little endian. Images generated on a big endian host are detected by their
//! byte swapped magic number.

use core::mem::size_of;

use log::{debug, error};
use static_assertions::const_assert_eq;

use super::ExecutableModule;

pub const NOFF_MAGIC: u32 = 0x00ba_dfad;

/// magic + 3 segments with 3 words each
pub const NOFF_HEADER_SIZE: usize = 40;
const_assert_eq!(NOFF_HEADER_SIZE, 10 * size_of::<u32>());

/// One segment of a program image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Segment {
    /// Location of the segment inside of the address space
    pub virtual_addr: u32,

    /// Location of the segment contents inside of the image
    pub in_file_addr: u32,

    /// Size in bytes
    pub size: u32,
}

impl Segment {
    fn from_words(words: &[u32]) -> Self {
        Self {
            virtual_addr: words[0],
            in_file_addr: words[1],
            size: words[2],
        }
    }

    fn words(&self) -> [u32; 3] {
        [self.virtual_addr, self.in_file_addr, self.size]
    }

    /// Virtual address range `[start, end)` of this segment
    pub fn virtual_range(&self) -> (usize, usize) {
        let start = self.virtual_addr as usize;
        (start, start + self.size as usize)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoffHeader {
    pub magic: u32,
    pub code: Segment,
    pub init_data: Segment,
    pub uninit_data: Segment,
}

impl NoffHeader {
    /// Parses a header, swapping the byte order if the image was
    /// written with the other endianness.
    pub fn from_bytes(bytes: &[u8; NOFF_HEADER_SIZE]) -> Self {
        let mut words = [0u32; NOFF_HEADER_SIZE / size_of::<u32>()];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(size_of::<u32>())) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        if words[0] != NOFF_MAGIC && words[0].swap_bytes() == NOFF_MAGIC {
            debug!("NOFF header has swapped byte order, converting");
            for word in words.iter_mut() {
                *word = word.swap_bytes();
            }
        }

        Self {
            magic: words[0],
            code: Segment::from_words(&words[1..4]),
            init_data: Segment::from_words(&words[4..7]),
            uninit_data: Segment::from_words(&words[7..10]),
        }
    }

    /// Reads the header at the start of `executable`
    pub fn read_from<E: ExecutableModule>(executable: &mut E) -> Result<Self, ()> {
        let mut bytes = [0u8; NOFF_HEADER_SIZE];
        executable.read_exact_at(&mut bytes, 0).map_err(|_| {
            error!("Executable is too short to contain a NOFF header");
        })?;

        Ok(Self::from_bytes(&bytes))
    }

    pub fn is_valid(&self) -> bool {
        self.magic == NOFF_MAGIC
    }

    /// Encodes this header (little endian)
    pub fn to_bytes(&self) -> [u8; NOFF_HEADER_SIZE] {
        let mut bytes = [0u8; NOFF_HEADER_SIZE];
        let words = self.words();
        for (chunk, word) in bytes.chunks_exact_mut(size_of::<u32>()).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    fn words(&self) -> [u32; NOFF_HEADER_SIZE / size_of::<u32>()] {
        let mut words = [0u32; NOFF_HEADER_SIZE / size_of::<u32>()];
        words[0] = self.magic;
        words[1..4].copy_from_slice(&self.code.words());
        words[4..7].copy_from_slice(&self.init_data.words());
        words[7..10].copy_from_slice(&self.uninit_data.words());
        words
    }

    /// Bytes of the program itself, without stack
    pub fn program_size(&self) -> usize {
        self.code.size as usize + self.init_data.size as usize + self.uninit_data.size as usize
    }

    /// Segments whose contents are stored inside of the image
    pub fn file_segments(&self) -> [&Segment; 2] {
        [&self.code, &self.init_data]
    }

    /// Builds a complete image: header, code and initialized data.
    ///
    /// Code is placed at virtual address 0, the data segments follow directly.
    pub fn build_image(code: &[u8], init_data: &[u8], uninit_data_size: usize) -> Vec<u8> {
        let code_segment = Segment {
            virtual_addr: 0,
            in_file_addr: NOFF_HEADER_SIZE as u32,
            size: code.len() as u32,
        };
        let init_data_segment = Segment {
            virtual_addr: code.len() as u32,
            in_file_addr: (NOFF_HEADER_SIZE + code.len()) as u32,
            size: init_data.len() as u32,
        };
        let uninit_data_segment = Segment {
            virtual_addr: (code.len() + init_data.len()) as u32,
            in_file_addr: 0,
            size: uninit_data_size as u32,
        };

        let header = NoffHeader {
            magic: NOFF_MAGIC,
            code: code_segment,
            init_data: init_data_segment,
            uninit_data: uninit_data_segment,
        };

        let mut image = Vec::with_capacity(NOFF_HEADER_SIZE + code.len() + init_data.len());
        image.extend_from_slice(&header.to_bytes());
        image.extend_from_slice(code);
        image.extend_from_slice(init_data);
        image
    }
}
