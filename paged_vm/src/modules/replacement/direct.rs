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

use crate::frame_table::FrameNumber;

use super::{ReplacementModule, VictimCandidates};

/// Hands out free frames only, the machine must never be oversubscribed
#[derive(Debug, Default)]
pub struct DirectReplacementModule;

impl ReplacementModule for DirectReplacementModule {
    fn allows_oversubscription(&self) -> bool {
        false
    }

    fn select_victim(&mut self, _candidates: &VictimCandidates<'_>) -> Option<FrameNumber> {
        None
    }
}
