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

/// efficient way to calculate: ceil(x / y)
pub(crate) fn ceil_div(x: usize, y: usize) -> usize {
    (x + y - 1) / y
}

/// Length limit of the executable path an address space remembers
pub(crate) const MAX_FILE_NAME_LEN: usize = 1024;

/// Cuts `path` at the first line break and at [`MAX_FILE_NAME_LEN`] bytes
/// (respecting char boundaries).
pub(crate) fn bounded_path(path: &str) -> String {
    let line = path.split('\n').next().unwrap_or_default();
    if line.len() <= MAX_FILE_NAME_LEN {
        return line.to_string();
    }

    let mut end = MAX_FILE_NAME_LEN;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    line[..end].to_string()
}
