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

use std::collections::VecDeque;

use crate::frame_table::FrameNumber;

use super::{ReplacementModule, VictimCandidates};

/// Evicts the candidate that got its current occupant the longest time ago
#[derive(Debug, Default)]
pub struct FifoReplacementModule {
    /// Frames in claim order, oldest first.
    /// May contain frames that were released in the meantime.
    queue: VecDeque<FrameNumber>,
}

impl FifoReplacementModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplacementModule for FifoReplacementModule {
    fn allows_oversubscription(&self) -> bool {
        true
    }

    fn select_victim(&mut self, candidates: &VictimCandidates<'_>) -> Option<FrameNumber> {
        let pos = self
            .queue
            .iter()
            .position(|frame| candidates.is_candidate(*frame))?;
        self.queue.remove(pos)
    }

    fn frame_claimed(&mut self, frame: FrameNumber) {
        self.queue.retain(|x| *x != frame);
        self.queue.push_back(frame);
    }
}
