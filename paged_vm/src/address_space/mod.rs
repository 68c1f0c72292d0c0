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

use log::{debug, error, info, trace};

use crate::{
    frame_table::FrameTable,
    machine::Machine,
    memory_manager::MemoryManager,
    modules::{
        backing_store::{BackingStoreModule, MemoryBackingStoreModule},
        executable::{ExecutableModule, NoffHeader},
        replacement::ReplacementModule,
    },
    process_table::ProcessId,
    statistics::Statistics,
    translation_table::TranslationTable,
    util::{bounded_path, ceil_div},
};

mod fault;
mod fork;
mod shared;

pub(crate) use fault::handle_page_fault;
pub(crate) use fork::copy_resident_pages;
pub(crate) use shared::attach_shared_region;

/// Virtual address space of one user process.
///
/// Pages are loaded lazily: a new address space has no resident page at all.
/// Every page has a slot in the backing store that holds its contents while
/// the page is not resident.
#[derive(Debug)]
pub struct AddressSpace {
    process: ProcessId,
    table: TranslationTable,
    backing_store: MemoryBackingStoreModule,
    header: NoffHeader,

    /// Path of the executable, pages that were never loaded are read from it
    source_path: String,

    page_size: usize,
}

impl AddressSpace {
    /// Creates the address space of `process` for the program `executable`
    /// which was opened from `path`.
    ///
    /// The space covers code, data and the user stack. Nothing is loaded yet.
    pub(crate) fn from_executable<E: ExecutableModule, R: ReplacementModule>(
        process: ProcessId,
        executable: &mut E,
        path: &str,
        manager: &MemoryManager<R>,
    ) -> Result<Self, ()> {
        let header = NoffHeader::read_from(executable)?;
        if !header.is_valid() {
            error!("{} is no NOFF executable (magic: {:#x})", path, header.magic);
            panic!("invalid NOFF magic {:#x}", header.magic);
        }

        let page_size = manager.page_size();
        let size = header.program_size() + manager.config().user_stack_size;
        let num_pages = ceil_div(size, page_size);
        manager.check_capacity(num_pages);

        info!(
            "Create address space of process {} for {} ({} pages, {} bytes)",
            process,
            path,
            num_pages,
            num_pages * page_size
        );
        debug!(
            "code: {:?}, init data: {:?}, uninit data: {:?}",
            header.code, header.init_data, header.uninit_data
        );

        Ok(Self {
            process,
            table: TranslationTable::new(num_pages),
            backing_store: MemoryBackingStoreModule::new(num_pages * page_size),
            header,
            source_path: bounded_path(path),
            page_size,
        })
    }

    /// Address space of a forked `child`.
    ///
    /// Shared pages refer to the same frames, all other pages start out
    /// non resident. The backing store is a copy of the one of this space.
    pub(crate) fn new_child(&self, child: ProcessId) -> Self {
        let mut table = self.table.clone();
        for vpn in 0..table.len() {
            let entry = table.entry_mut(vpn);
            if !entry.shared {
                entry.valid = false;
                entry.physical_page = None;
            }
        }

        Self {
            process: child,
            table,
            backing_store: self.backing_store.clone(),
            header: self.header,
            source_path: self.source_path.clone(),
            page_size: self.page_size,
        }
    }

    #[cfg(test)]
    pub(crate) fn empty(process: ProcessId, num_pages: usize, page_size: usize) -> Self {
        Self {
            process,
            table: TranslationTable::new(num_pages),
            backing_store: MemoryBackingStoreModule::new(num_pages * page_size),
            header: NoffHeader::default(),
            source_path: String::new(),
            page_size,
        }
    }

    pub fn process(&self) -> ProcessId {
        self.process
    }

    pub fn num_pages(&self) -> usize {
        self.table.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Size of this address space in bytes
    pub fn size(&self) -> usize {
        self.num_pages() * self.page_size
    }

    pub fn table(&self) -> &TranslationTable {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut TranslationTable {
        &mut self.table
    }

    pub fn backing_store(&self) -> &MemoryBackingStoreModule {
        &self.backing_store
    }

    pub(crate) fn backing_store_mut(&mut self) -> &mut MemoryBackingStoreModule {
        &mut self.backing_store
    }

    pub fn header(&self) -> &NoffHeader {
        &self.header
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Moves the resident page `vpn` out of its frame and releases the frame.
    ///
    /// The frame is only copied to the backing store if the page is dirty,
    /// otherwise the backing store already holds the same contents.
    pub(crate) fn backup(
        &mut self,
        vpn: usize,
        machine: &Machine,
        frame_table: &mut FrameTable,
        stats: &mut Statistics,
    ) -> Result<(), ()> {
        let entry = self.table.entry_mut(vpn);
        let frame = match entry.resident_frame() {
            Some(frame) => frame,
            None => panic!(
                "vpn {} of process {} is not resident and can not be backed up",
                vpn, self.process
            ),
        };
        assert!(!entry.shared, "shared pages are never backed up");

        if entry.dirty {
            debug!(
                "Write back dirty vpn {} of process {} (frame {})",
                vpn, self.process, frame
            );
            self.backing_store.write_page(vpn, machine.frame(frame))?;
            entry.dirty = false;
            stats.dirty_write_backs += 1;
        } else {
            trace!("vpn {} of process {} is clean", vpn, self.process);
        }

        self.table.swap_out(vpn);
        frame_table.release(frame);

        Ok(())
    }

    /// Releases all private frames and drops the translation table and the
    /// backing store. Shared frames stay claimed.
    pub(crate) fn destroy(&mut self, frame_table: &mut FrameTable) {
        debug!(
            "Destroy address space of process {} ({} pages)",
            self.process,
            self.num_pages()
        );

        for entry in self.table.iter() {
            if entry.shared {
                continue;
            }
            if let Some(frame) = entry.resident_frame() {
                frame_table.release(frame);
            }
        }

        self.table.clear();
        self.backing_store.resize(0);
    }
}

#[cfg(test)]
mod test {
    use crate::{
        frame_table::{FrameOwner, FrameTable},
        machine::Machine,
        memory_manager::MemoryManager,
        modules::{
            backing_store::BackingStoreModule,
            executable::{MemoryExecutableModule, NoffHeader},
            replacement::{DirectReplacementModule, RandomReplacementModule},
        },
        process_table::ProcessId,
        statistics::Statistics,
        VMConfig,
    };

    use super::AddressSpace;

    const PAGE_SIZE: usize = 64;

    fn get_config() -> VMConfig {
        VMConfig {
            page_size: PAGE_SIZE,
            num_phys_pages: 8,
            user_stack_size: 64,
            ..Default::default()
        }
    }

    /// Space with vpn 1 resident in frame 3
    fn get_resident_space() -> (AddressSpace, Machine, FrameTable) {
        let mut space = AddressSpace::empty(ProcessId(1), 4, PAGE_SIZE);
        let mut machine = Machine::new(PAGE_SIZE, 8);
        let mut frame_table = FrameTable::new(8);

        frame_table.claim(3, FrameOwner::new(ProcessId(1), 1));
        space.table_mut().install(1, 3);
        machine.frame_mut(3).fill(0x5A);

        (space, machine, frame_table)
    }

    #[test]
    fn test_page_count() {
        let config = get_config();
        let manager = MemoryManager::new(config.clone(), RandomReplacementModule::new(1));

        // 100 + 20 + 8 + 64 = 192 bytes = 3 pages
        let mut exe = MemoryExecutableModule::new(NoffHeader::build_image(&[0; 100], &[0; 20], 8));
        let space = AddressSpace::from_executable(ProcessId(1), &mut exe, "test", &manager).unwrap();
        assert_eq!(space.num_pages(), 3);
        assert_eq!(space.size(), 192);
        assert_eq!(space.backing_store().get_max_size(), 192);
        assert!(space.table().iter().all(|entry| !entry.is_valid()));

        // one more byte needs another page
        let mut exe = MemoryExecutableModule::new(NoffHeader::build_image(&[0; 101], &[0; 20], 8));
        let space = AddressSpace::from_executable(ProcessId(1), &mut exe, "test", &manager).unwrap();
        assert_eq!(space.num_pages(), 4);
    }

    #[test]
    #[should_panic]
    fn test_invalid_magic() {
        let manager = MemoryManager::new(get_config(), RandomReplacementModule::new(1));
        let mut image = NoffHeader::build_image(&[0; 100], &[], 0);
        image[0] ^= 0xFF;

        let mut exe = MemoryExecutableModule::new(image);
        let _ = AddressSpace::from_executable(ProcessId(1), &mut exe, "test", &manager);
    }

    #[test]
    #[should_panic]
    fn test_too_large_for_direct() {
        let manager = MemoryManager::new(get_config(), DirectReplacementModule);

        // 9 pages, but only 8 frames
        let mut exe = MemoryExecutableModule::new(NoffHeader::build_image(&[0; 8 * PAGE_SIZE], &[], 0));
        let _ = AddressSpace::from_executable(ProcessId(1), &mut exe, "test", &manager);
    }

    #[test]
    fn test_truncated_image() {
        let manager = MemoryManager::new(get_config(), RandomReplacementModule::new(1));
        let mut exe = MemoryExecutableModule::new(vec![0xad, 0xdf]);
        assert!(AddressSpace::from_executable(ProcessId(1), &mut exe, "test", &manager).is_err());
    }

    #[test]
    fn test_backup_clean_page() {
        let (mut space, machine, mut frame_table) = get_resident_space();
        let mut stats = Statistics::default();

        space.backup(1, &machine, &mut frame_table, &mut stats).unwrap();

        // the frame contents are not copied
        assert!(space.backing_store().as_slice().iter().all(|x| *x == 0));
        assert_eq!(stats.dirty_write_backs, 0);

        let entry = space.table().entry(1);
        assert!(!entry.is_valid());
        assert!(entry.load_from_swap());
        assert_eq!(entry.physical_page(), None);
        assert_eq!(frame_table.owner(3), None);
        assert_eq!(frame_table.allocated(), 0);
    }

    #[test]
    fn test_backup_dirty_page() {
        let (mut space, machine, mut frame_table) = get_resident_space();
        let mut stats = Statistics::default();
        space.table_mut().entry_mut(1).dirty = true;

        space.backup(1, &machine, &mut frame_table, &mut stats).unwrap();

        let store = space.backing_store().as_slice();
        assert!(store[PAGE_SIZE..2 * PAGE_SIZE].iter().all(|x| *x == 0x5A));
        assert!(store[..PAGE_SIZE].iter().all(|x| *x == 0));
        assert_eq!(stats.dirty_write_backs, 1);
        assert!(!space.table().entry(1).is_dirty());
    }

    #[test]
    #[should_panic]
    fn test_backup_invalid_page() {
        let (mut space, machine, mut frame_table) = get_resident_space();
        let _ = space.backup(0, &machine, &mut frame_table, &mut Statistics::default());
    }

    #[test]
    fn test_destroy_keeps_shared_frames() {
        let (mut space, _, mut frame_table) = get_resident_space();
        frame_table.claim(5, FrameOwner::new(ProcessId(1), 2));
        frame_table.mark_shared(5);
        space.table_mut().install_shared(2, 5);

        space.destroy(&mut frame_table);

        assert_eq!(space.num_pages(), 0);
        assert_eq!(space.backing_store().get_max_size(), 0);
        assert_eq!(frame_table.owner(3), None);
        assert!(frame_table.is_shared(5));
        assert_eq!(frame_table.allocated(), 1);
    }

    #[test]
    fn test_new_child() {
        let (mut space, _, mut frame_table) = get_resident_space();
        frame_table.claim(5, FrameOwner::new(ProcessId(1), 2));
        frame_table.mark_shared(5);
        space.table_mut().install_shared(2, 5);
        space.table_mut().entry_mut(1).dirty = true;

        let child = space.new_child(ProcessId(2));
        assert_eq!(child.process(), ProcessId(2));
        assert_eq!(child.num_pages(), 4);

        let entry = child.table().entry(1);
        assert!(!entry.is_valid());
        assert_eq!(entry.physical_page(), None);
        assert!(entry.is_dirty());

        let entry = child.table().entry(2);
        assert!(entry.is_shared());
        assert_eq!(entry.resident_frame(), Some(5));
    }
}
