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

use rand::{rngs::SmallRng, RngCore, SeedableRng};

use crate::{
    frame_table::FrameOwner,
    modules::{
        executable::{FileSystemModule, MemoryFileSystemModule, NoffHeader},
        replacement::{AnyReplacementModule, ReplacementModule, ReplacementPolicy},
    },
    process_table::ProcessId,
    VMConfig, VirtualMemory,
};

mod fork;

pub(crate) const SEED: u64 = 5446535461589659585;

pub(crate) type TestVM = VirtualMemory<AnyReplacementModule, MemoryFileSystemModule>;

pub(crate) fn get_test_config(
    page_size: usize,
    num_phys_pages: usize,
    policy: ReplacementPolicy,
) -> VMConfig {
    VMConfig {
        page_size,
        num_phys_pages,
        user_stack_size: page_size,
        replacement_policy: policy,
        random_seed: SEED,
        ..Default::default()
    }
}

pub(crate) fn get_test_vm(config: VMConfig) -> TestVM {
    let _ = env_logger::builder().is_test(true).try_init();
    VirtualMemory::from_config(config, MemoryFileSystemModule::new())
}

pub(crate) fn rand_data(rand: &mut SmallRng, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand.fill_bytes(&mut data);
    data
}

pub(crate) fn get_test_rand() -> SmallRng {
    SmallRng::seed_from_u64(SEED)
}

/// Stores a NOFF image with the given segments as `path` and creates the
/// address space of `process` for it
pub(crate) fn load_test_program(
    vm: &mut TestVM,
    process: ProcessId,
    path: &str,
    code: &[u8],
    init_data: &[u8],
    uninit_data_size: usize,
) {
    let image = NoffHeader::build_image(code, init_data, uninit_data_size);
    vm.file_system_mut().add_file(path, image);
    vm.load_executable(process, path).unwrap();
}

/// Current contents of page `vpn`: the frame if resident, the backing store otherwise
pub(crate) fn page_contents<R: ReplacementModule, F: FileSystemModule>(
    vm: &VirtualMemory<R, F>,
    process: ProcessId,
    vpn: usize,
) -> Vec<u8> {
    let space = vm.address_space(process).unwrap();
    let page_size = space.page_size();

    match space.table().entry(vpn).resident_frame() {
        Some(frame) => vm.machine().frame(frame).to_vec(),
        None => space.backing_store().as_slice()[vpn * page_size..(vpn + 1) * page_size].to_vec(),
    }
}

/// Checks that the frame table and all translation tables agree
pub(crate) fn check_consistency<R: ReplacementModule, F: FileSystemModule>(
    vm: &VirtualMemory<R, F>,
) {
    let frame_table = vm.frame_table();
    let mut private_frames = 0;

    for process in vm.processes().ids() {
        let space = vm.address_space(process).unwrap();
        for entry in space.table().iter() {
            match entry.resident_frame() {
                Some(frame) if entry.is_shared() => {
                    assert!(frame_table.is_shared(frame), "frame {} is not shared", frame);
                }
                Some(frame) => {
                    assert_eq!(
                        frame_table.owner(frame),
                        Some(FrameOwner::new(process, entry.virtual_page())),
                        "frame {} has the wrong owner",
                        frame
                    );
                    assert!(!frame_table.is_shared(frame));
                    private_frames += 1;
                }
                None => {
                    assert!(!entry.is_valid());
                    assert_eq!(entry.physical_page(), None);
                }
            }
        }
    }

    let shared_frames = frame_table.iter().filter(|(_, info)| info.shared).count();
    assert_eq!(frame_table.allocated(), private_frames + shared_frames);
}
