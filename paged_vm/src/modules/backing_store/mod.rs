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

mod memory;

pub use memory::MemoryBackingStoreModule;

/// Swap space of one address space
pub trait BackingStoreModule {
    /// Reads a region `[offset, offset + dest.len())` into `dest`.
    fn read(&mut self, offset: usize, dest: &mut [u8]) -> Result<(), ()>;

    /// Returns the size in bytes of this store
    fn get_max_size(&self) -> usize;

    /// Writes `src` back to the underlying storage `[offset, offset + src.len())`
    fn write(&mut self, offset: usize, src: &[u8]) -> Result<(), ()>;

    /// Reads the whole page `vpn` into `dest` (`dest.len()` is the page size)
    fn read_page(&mut self, vpn: usize, dest: &mut [u8]) -> Result<(), ()> {
        self.read(vpn * dest.len(), dest)
    }

    /// Writes the whole page `vpn` from `src` (`src.len()` is the page size)
    fn write_page(&mut self, vpn: usize, src: &[u8]) -> Result<(), ()> {
        self.write(vpn * src.len(), src)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::BackingStoreModule;

    fn gen_number(i: usize) -> u8 {
        (i * 3 + (i % 3) * 7 + (i % 11) * 51) as u8
    }

    pub(super) const BACKING_STORE_NORMAL_TEST_SIZE: usize = 4096;

    /// test if write saves all data and read restores all of it
    pub(super) fn test_backing_store_normal<T: BackingStoreModule>(mut module: T) {
        const SUB_TEST_SIZE: usize = BACKING_STORE_NORMAL_TEST_SIZE / 32;

        let mut source_slice = [0u8; BACKING_STORE_NORMAL_TEST_SIZE];
        for i in 0..BACKING_STORE_NORMAL_TEST_SIZE {
            source_slice[i] = gen_number(i);
        }

        let mut test_slice = [0u8; SUB_TEST_SIZE];

        for i in 0..BACKING_STORE_NORMAL_TEST_SIZE / SUB_TEST_SIZE {
            let offset = i * SUB_TEST_SIZE;
            test_slice.copy_from_slice(&source_slice[offset..offset + SUB_TEST_SIZE]);
            module.write(offset, &test_slice).unwrap();
        }

        for i in 0..BACKING_STORE_NORMAL_TEST_SIZE / SUB_TEST_SIZE {
            let offset = i * SUB_TEST_SIZE;
            module.read(offset, &mut test_slice).unwrap();

            for x in 0..SUB_TEST_SIZE {
                assert_eq!(test_slice[x], source_slice[offset + x]);
            }
        }
    }

    /// pages are independent of each other
    pub(super) fn test_backing_store_pages<T: BackingStoreModule>(mut module: T, page_size: usize) {
        let page_count = module.get_max_size() / page_size;
        assert!(page_count >= 3);

        module.write_page(1, &vec![0xAB; page_size]).unwrap();

        let mut page = vec![0u8; page_size];
        module.read_page(0, &mut page).unwrap();
        assert!(page.iter().all(|x| *x == 0));

        module.read_page(1, &mut page).unwrap();
        assert!(page.iter().all(|x| *x == 0xAB));

        module.read_page(2, &mut page).unwrap();
        assert!(page.iter().all(|x| *x == 0));
    }
}
