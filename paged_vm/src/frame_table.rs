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

use log::{error, trace};

use crate::process_table::ProcessId;

/// Index of a physical frame
pub type FrameNumber = usize;

/// The (process, virtual page) pair that occupies a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameOwner {
    pub process: ProcessId,
    pub vpn: usize,
}

impl FrameOwner {
    pub fn new(process: ProcessId, vpn: usize) -> Self {
        Self { process, vpn }
    }
}

/// Inverse mapping information of one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// Current occupant, `None` if the frame is free
    pub owner: Option<FrameOwner>,

    /// Frame is mapped by multiple address spaces.
    /// For shared frames `owner` only names the process that attached it.
    pub shared: bool,
}

impl FrameInfo {
    pub fn is_free(&self) -> bool {
        self.owner.is_none() && !self.shared
    }
}

/// Inverse page table: physical frame -> owning (process, virtual page)
#[derive(Debug)]
pub struct FrameTable {
    frames: Vec<FrameInfo>,

    /// How many frames are currently occupied
    allocated: usize,

    /// How many frames were handed out since boot
    total_allocated: usize,
}

impl FrameTable {
    pub(crate) fn new(num_frames: usize) -> Self {
        Self {
            frames: vec![FrameInfo::default(); num_frames],
            allocated: 0,
            total_allocated: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame: FrameNumber) -> Option<&FrameInfo> {
        self.frames.get(frame)
    }

    pub fn owner(&self, frame: FrameNumber) -> Option<FrameOwner> {
        self.frames.get(frame).and_then(|info| info.owner)
    }

    pub fn is_shared(&self, frame: FrameNumber) -> bool {
        self.frames.get(frame).map_or(false, |info| info.shared)
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn total_allocated(&self) -> usize {
        self.total_allocated
    }

    pub fn free_count(&self) -> usize {
        self.frames.iter().filter(|info| info.is_free()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameNumber, &FrameInfo)> {
        self.frames.iter().enumerate()
    }

    /// Returns the first free frame starting at `start`, wrapping around once
    pub(crate) fn find_free(&self, start: FrameNumber) -> Option<FrameNumber> {
        let len = self.frames.len();
        (0..len)
            .map(|i| (start + i) % len)
            .find(|frame| self.frames[*frame].is_free())
    }

    /// Records `owner` as the new occupant of the free `frame`
    pub(crate) fn claim(&mut self, frame: FrameNumber, owner: FrameOwner) {
        let info = &mut self.frames[frame];
        assert!(
            info.is_free(),
            "frame {} is still claimed by {:?} (shared: {})",
            frame,
            info.owner,
            info.shared
        );

        trace!(
            "Frame {} claimed by process {} vpn {}",
            frame,
            owner.process,
            owner.vpn
        );
        info.owner = Some(owner);
        self.allocated += 1;
        self.total_allocated += 1;
    }

    /// Turns an already claimed frame into a shared one
    pub(crate) fn mark_shared(&mut self, frame: FrameNumber) {
        let info = &mut self.frames[frame];
        assert!(info.owner.is_some(), "only claimed frames can be shared");
        info.shared = true;
    }

    /// Clears the owner of a private `frame`
    pub(crate) fn release(&mut self, frame: FrameNumber) {
        let info = &mut self.frames[frame];
        assert!(!info.shared, "shared frame {} can not be released", frame);
        assert!(info.owner.is_some(), "frame {} is not claimed", frame);

        trace!("Frame {} released by {:?}", frame, info.owner);
        info.owner = None;
        self.allocated -= 1;
    }

    /// Writes the whole table to the log, used right before a fatal invariant violation
    pub(crate) fn dump(&self) {
        error!(
            "Frame table ({} frames, {} allocated, {} total):",
            self.frames.len(),
            self.allocated,
            self.total_allocated
        );
        for (frame, info) in self.iter() {
            match info.owner {
                Some(owner) => error!(
                    "  frame {:>4}: process {} vpn {}{}",
                    frame,
                    owner.process,
                    owner.vpn,
                    if info.shared { " (shared)" } else { "" }
                ),
                None => error!("  frame {:>4}: free", frame),
            }
        }
    }
}
