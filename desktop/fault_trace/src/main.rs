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

use std::{env, fs};

use env_logger::{Builder, Env};
use log::{info, LevelFilter};
use paged_vm::{
    modules::executable::{MemoryFileSystemModule, NoffHeader},
    ProcessId, VMConfig, VirtualMemory,
};
use rand::{rngs::SmallRng, Rng, RngCore, SeedableRng};
use serde_json::json;

const PROGRAM_PATH: &str = "../test/matmult";
const ACCESSES_PER_SLICE: usize = 64;

fn main() {
    Builder::from_env(Env::default())
        .filter_level(LevelFilter::Info)
        .format_module_path(false)
        .init();

    // optional JSON file with a `VMConfig`
    let config = match env::args().nth(1) {
        Some(path) => {
            let text = fs::read_to_string(&path).unwrap();
            serde_json::from_str(&text).unwrap()
        }
        None => VMConfig {
            num_phys_pages: 16,
            ..Default::default()
        },
    };
    info!("Running with {:?}", config);

    let mut rand = SmallRng::seed_from_u64(config.random_seed);
    let mut file_system = MemoryFileSystemModule::new();
    let mut code = vec![0u8; 12 * config.page_size];
    rand.fill_bytes(&mut code);
    let mut data = vec![0u8; 2 * config.page_size];
    rand.fill_bytes(&mut data);
    file_system.add_file(PROGRAM_PATH, NoffHeader::build_image(&code, &data, 4 * config.page_size));

    let mut vm = VirtualMemory::from_config(config.clone(), file_system);

    let init = ProcessId(1);
    vm.load_executable(init, PROGRAM_PATH).unwrap();
    vm.init_registers(init);
    let shared_start = vm.attach_shared_region(init, 2).unwrap();

    let mut running = vec![init];
    for child in 2..=4 {
        let child = ProcessId(child);
        vm.fork(init, child).unwrap();
        running.push(child);
    }

    // round robin over all processes, every slice does random accesses
    for slice in 0..40 {
        let process = running[slice % running.len()];
        vm.restore_state(process);

        let size = vm.address_space(process).unwrap().size();
        for _ in 0..ACCESSES_PER_SLICE {
            let address = rand.gen_range(0..size / 4) * 4;
            if rand.gen_bool(0.3) {
                vm.user_write(address, 4, rand.gen()).unwrap();
            } else {
                vm.user_read(address, 4).unwrap();
            }
        }

        // counter in the shared region
        let counter = vm.user_read(shared_start, 4).unwrap();
        vm.user_write(shared_start, 4, counter + 1).unwrap();

        vm.save_state(process);
        vm.tick(100);

        if slice == 30 {
            let exiting = running.remove(1);
            info!("Process {} exits", exiting);
            vm.exit(exiting);
        }
    }

    vm.restore_state(init);
    let counter = vm.user_read(shared_start, 4).unwrap();

    let report = json!({
        "config": config,
        "statistics": vm.statistics(),
        "shared_counter": counter,
        "allocated_frames": vm.frame_table().allocated(),
        "total_allocated_frames": vm.frame_table().total_allocated(),
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap());
}
