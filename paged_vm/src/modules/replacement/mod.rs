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

use crate::{
    frame_table::{FrameNumber, FrameTable},
    process_table::ProcessId,
    VMConfig,
};

mod direct;
mod fifo;
mod random;

pub use direct::DirectReplacementModule;
pub use fifo::FifoReplacementModule;
pub use random::RandomReplacementModule;

/// Replacement policy that can be selected in [`VMConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplacementPolicy {
    /// No oversubscription, running out of frames is fatal
    Direct,

    /// Evict a uniformly chosen page
    Random,

    /// Evict the page that was loaded first
    Fifo,
}

/// The frames a replacement module may choose from.
///
/// A frame is a candidate if it is occupied, not shared, not protected
/// by the caller and not owned by a process that is currently exiting.
pub struct VictimCandidates<'a> {
    frame_table: &'a FrameTable,
    protected: Option<FrameNumber>,
    exiting: &'a dyn Fn(ProcessId) -> bool,
}

impl<'a> VictimCandidates<'a> {
    pub(crate) fn new(
        frame_table: &'a FrameTable,
        protected: Option<FrameNumber>,
        exiting: &'a dyn Fn(ProcessId) -> bool,
    ) -> Self {
        Self {
            frame_table,
            protected,
            exiting,
        }
    }

    /// Number of physical frames (candidate or not)
    pub fn frame_count(&self) -> usize {
        self.frame_table.len()
    }

    pub fn is_candidate(&self, frame: FrameNumber) -> bool {
        if self.protected == Some(frame) {
            return false;
        }

        match self.frame_table.get(frame) {
            Some(info) if !info.shared => match info.owner {
                Some(owner) => !(self.exiting)(owner.process),
                None => false,
            },
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        (0..self.frame_count()).filter(move |frame| self.is_candidate(*frame))
    }
}

/// Decides which frame is reclaimed once no frame is free
pub trait ReplacementModule {
    /// Can this module free frames by evicting pages?
    fn allows_oversubscription(&self) -> bool;

    /// Chooses one of `candidates` or returns `None` if no page can be evicted
    fn select_victim(&mut self, candidates: &VictimCandidates<'_>) -> Option<FrameNumber>;

    /// Called every time a frame gets a new occupant
    fn frame_claimed(&mut self, _frame: FrameNumber) {}
}

/// Replacement module chosen at runtime
#[derive(Debug)]
pub enum AnyReplacementModule {
    Direct(DirectReplacementModule),
    Random(RandomReplacementModule),
    Fifo(FifoReplacementModule),
}

impl AnyReplacementModule {
    pub fn from_config(config: &VMConfig) -> Self {
        match config.replacement_policy {
            ReplacementPolicy::Direct => Self::Direct(DirectReplacementModule),
            ReplacementPolicy::Random => {
                Self::Random(RandomReplacementModule::new(config.random_seed))
            }
            ReplacementPolicy::Fifo => Self::Fifo(FifoReplacementModule::new()),
        }
    }

    pub fn policy(&self) -> ReplacementPolicy {
        match self {
            Self::Direct(_) => ReplacementPolicy::Direct,
            Self::Random(_) => ReplacementPolicy::Random,
            Self::Fifo(_) => ReplacementPolicy::Fifo,
        }
    }
}

impl ReplacementModule for AnyReplacementModule {
    fn allows_oversubscription(&self) -> bool {
        match self {
            Self::Direct(module) => module.allows_oversubscription(),
            Self::Random(module) => module.allows_oversubscription(),
            Self::Fifo(module) => module.allows_oversubscription(),
        }
    }

    fn select_victim(&mut self, candidates: &VictimCandidates<'_>) -> Option<FrameNumber> {
        match self {
            Self::Direct(module) => module.select_victim(candidates),
            Self::Random(module) => module.select_victim(candidates),
            Self::Fifo(module) => module.select_victim(candidates),
        }
    }

    fn frame_claimed(&mut self, frame: FrameNumber) {
        match self {
            Self::Direct(module) => module.frame_claimed(frame),
            Self::Random(module) => module.frame_claimed(frame),
            Self::Fifo(module) => module.frame_claimed(frame),
        }
    }
}
