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

use rand::Rng;

use crate::{modules::replacement::ReplacementPolicy, process_table::ProcessId};

use super::{
    check_consistency, get_test_config, get_test_rand, get_test_vm, load_test_program,
    page_contents, rand_data, TestVM,
};

const PAGE_SIZE: usize = 64;

/// Loads process 1 with 6 pages, touches every page and writes random
/// words to it
fn get_parent(num_phys_pages: usize, policy: ReplacementPolicy) -> TestVM {
    let mut vm = get_test_vm(get_test_config(PAGE_SIZE, num_phys_pages, policy));
    let mut rand = get_test_rand();

    let parent = ProcessId(1);
    let code = rand_data(&mut rand, 4 * PAGE_SIZE);
    let data = rand_data(&mut rand, PAGE_SIZE / 2);
    load_test_program(&mut vm, parent, "../test/fork", &code, &data, PAGE_SIZE / 2);
    vm.restore_state(parent);

    for vpn in 0..6 {
        vm.user_read(vpn * PAGE_SIZE, 4).unwrap();
    }
    for _ in 0..20 {
        let address = rand.gen_range(0..6 * PAGE_SIZE / 4) * 4;
        vm.user_write(address, 4, rand.gen()).unwrap();
    }
    vm
}

fn check_identical(vm: &TestVM, parent: ProcessId, child: ProcessId) {
    let parent_space = vm.address_space(parent).unwrap();
    let child_space = vm.address_space(child).unwrap();
    assert_eq!(parent_space.num_pages(), child_space.num_pages());
    assert_eq!(parent_space.header(), child_space.header());
    assert_eq!(parent_space.source_path(), child_space.source_path());

    for vpn in 0..parent_space.num_pages() {
        assert_eq!(
            page_contents(vm, parent, vpn),
            page_contents(vm, child, vpn),
            "vpn {} differs",
            vpn
        );

        let parent_frame = parent_space.table().entry(vpn).resident_frame();
        let child_frame = child_space.table().entry(vpn).resident_frame();
        if parent_space.table().entry(vpn).is_shared() {
            assert_eq!(parent_frame, child_frame);
        } else if let (Some(parent_frame), Some(child_frame)) = (parent_frame, child_frame) {
            assert_ne!(parent_frame, child_frame);
        }
    }
}

#[test]
fn test_fork_copies_resident_pages() {
    let mut vm = get_parent(16, ReplacementPolicy::Random);
    let (parent, child) = (ProcessId(1), ProcessId(2));

    // one page of the parent is only in the backing store
    assert!(vm.page_out(parent, 3).unwrap());
    let faults = vm.statistics().page_faults;
    let allocated = vm.frame_table().allocated();

    vm.fork(parent, child).unwrap();
    assert_eq!(vm.statistics().page_faults, faults + 1);
    assert_eq!(vm.statistics().evictions, 1);

    let parent_space = vm.address_space(parent).unwrap();
    let child_space = vm.address_space(child).unwrap();
    for vpn in 0..parent_space.num_pages() {
        let parent_entry = parent_space.table().entry(vpn);
        let child_entry = child_space.table().entry(vpn);
        assert_eq!(parent_entry.is_valid(), child_entry.is_valid());
        assert_eq!(parent_entry.is_dirty(), child_entry.is_dirty());
        assert_eq!(parent_entry.load_from_swap(), child_entry.load_from_swap());
    }
    assert_eq!(vm.frame_table().allocated(), 2 * allocated);

    check_identical(&vm, parent, child);
    check_consistency(&vm);
}

#[test]
fn test_fork_under_memory_pressure() {
    for policy in [ReplacementPolicy::Random, ReplacementPolicy::Fifo] {
        let mut vm = get_parent(4, policy);
        let (parent, child) = (ProcessId(1), ProcessId(2));

        vm.fork(parent, child).unwrap();
        check_identical(&vm, parent, child);
        check_consistency(&vm);
    }
}

#[test]
fn test_fork_pages_are_private() {
    let mut vm = get_parent(4, ReplacementPolicy::Random);
    let (parent, child) = (ProcessId(1), ProcessId(2));
    vm.fork(parent, child).unwrap();

    let before = vm.user_read(8, 4).unwrap();

    vm.save_state(parent);
    vm.restore_state(child);
    vm.user_write(8, 4, !before).unwrap();
    assert_eq!(vm.user_read(8, 4), Ok(!before));

    vm.restore_state(parent);
    assert_eq!(vm.user_read(8, 4), Ok(before));
    check_consistency(&vm);
}

#[test]
fn test_fork_then_exit_parent() {
    let mut vm = get_parent(8, ReplacementPolicy::Random);
    let (parent, child) = (ProcessId(1), ProcessId(2));
    vm.fork(parent, child).unwrap();

    let expected: Vec<Vec<u8>> = (0..6).map(|vpn| page_contents(&vm, child, vpn)).collect();
    vm.exit(parent);
    check_consistency(&vm);

    // the child does not depend on the parent's frames or backing store
    vm.restore_state(child);
    for vpn in 0..6 {
        vm.user_read(vpn * PAGE_SIZE, 4).unwrap();
        assert_eq!(page_contents(&vm, child, vpn), expected[vpn]);
    }
}
