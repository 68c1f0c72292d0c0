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

use log::trace;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::frame_table::FrameNumber;

use super::{ReplacementModule, VictimCandidates};

/// Evicts a uniformly chosen candidate
#[derive(Debug)]
pub struct RandomReplacementModule {
    rng: SmallRng,
}

impl RandomReplacementModule {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl ReplacementModule for RandomReplacementModule {
    fn allows_oversubscription(&self) -> bool {
        true
    }

    fn select_victim(&mut self, candidates: &VictimCandidates<'_>) -> Option<FrameNumber> {
        let list: Vec<FrameNumber> = candidates.iter().collect();
        if list.is_empty() {
            return None;
        }

        let victim = list[self.rng.gen_range(0..list.len())];
        trace!("Random victim: frame {} (out of {} candidates)", victim, list.len());
        Some(victim)
    }
}
