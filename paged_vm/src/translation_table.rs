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

use core::slice::Iter;

use crate::frame_table::FrameNumber;

/// Translation of one virtual page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    /// Equals the index of this entry inside of its table
    pub(crate) virtual_page: usize,

    /// Frame this page lives in, `None` while not resident
    pub(crate) physical_page: Option<FrameNumber>,

    /// Page is resident in `physical_page`
    pub(crate) valid: bool,

    /// Page was modified since it was last written to the backing store
    pub(crate) dirty: bool,

    /// Page was referenced (set by the machine, not consulted by any policy yet)
    pub(crate) used: bool,

    pub(crate) read_only: bool,

    /// Frame is shared with other address spaces, never evicted
    pub(crate) shared: bool,

    /// The backing store holds valid content for this page
    pub(crate) load_from_swap: bool,
}

impl TranslationEntry {
    pub(crate) fn unmapped(virtual_page: usize) -> Self {
        Self {
            virtual_page,
            physical_page: None,
            valid: false,
            dirty: false,
            used: false,
            read_only: false,
            shared: false,
            load_from_swap: false,
        }
    }

    pub fn virtual_page(&self) -> usize {
        self.virtual_page
    }

    pub fn physical_page(&self) -> Option<FrameNumber> {
        self.physical_page
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn load_from_swap(&self) -> bool {
        self.load_from_swap
    }

    /// Frame of this page if it is resident
    pub fn resident_frame(&self) -> Option<FrameNumber> {
        if self.valid {
            self.physical_page
        } else {
            None
        }
    }
}

/// Linear (single level) page table of one address space
#[derive(Debug, Clone)]
pub struct TranslationTable {
    entries: Vec<TranslationEntry>,
}

impl TranslationTable {
    /// Creates a table with `num_pages` unmapped entries
    pub(crate) fn new(num_pages: usize) -> Self {
        Self {
            entries: (0..num_pages).map(TranslationEntry::unmapped).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, vpn: usize) -> Option<&TranslationEntry> {
        self.entries.get(vpn)
    }

    pub(crate) fn get_mut(&mut self, vpn: usize) -> Option<&mut TranslationEntry> {
        self.entries.get_mut(vpn)
    }

    pub(crate) fn entry(&self, vpn: usize) -> &TranslationEntry {
        assert!(
            vpn < self.entries.len(),
            "virtual page {} out of range (num pages: {})",
            vpn,
            self.entries.len()
        );
        &self.entries[vpn]
    }

    pub(crate) fn entry_mut(&mut self, vpn: usize) -> &mut TranslationEntry {
        assert!(
            vpn < self.entries.len(),
            "virtual page {} out of range (num pages: {})",
            vpn,
            self.entries.len()
        );
        &mut self.entries[vpn]
    }

    pub fn iter(&self) -> Iter<'_, TranslationEntry> {
        self.entries.iter()
    }

    /// Appends `count` unmapped entries and returns the first new virtual page
    pub(crate) fn grow(&mut self, count: usize) -> usize {
        let start = self.entries.len();
        self.entries
            .extend((start..start + count).map(TranslationEntry::unmapped));
        start
    }

    /// Maps `vpn` to a freshly loaded private `frame`
    pub(crate) fn install(&mut self, vpn: usize, frame: FrameNumber) {
        let entry = self.entry_mut(vpn);
        entry.physical_page = Some(frame);
        entry.valid = true;
        entry.used = false;
        entry.dirty = false;
        entry.read_only = false;
        entry.shared = false;
    }

    /// Maps `vpn` to a frame that is shared with other address spaces
    pub(crate) fn install_shared(&mut self, vpn: usize, frame: FrameNumber) {
        let entry = self.entry_mut(vpn);
        entry.physical_page = Some(frame);
        entry.valid = true;
        entry.used = false;
        entry.dirty = false;
        entry.read_only = false;
        entry.shared = true;
    }

    /// Marks `vpn` as swapped out and returns the frame it occupied
    pub(crate) fn swap_out(&mut self, vpn: usize) -> Option<FrameNumber> {
        let entry = self.entry_mut(vpn);
        entry.valid = false;
        entry.load_from_swap = true;
        entry.physical_page.take()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
