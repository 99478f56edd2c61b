/*
 *     Copyright (C) 2023  Fritz Ochsmann
 *
 *     This program is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU Affero General Public License as published
 *     by the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     This program is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU Affero General Public License for more details.
 *
 *     You should have received a copy of the GNU Affero General Public License
 *     along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

const MIN_MINUTES: u32 = 5;

enum Adjustment {
    AtLeast(u32),
    AtMost(u32),
}

// Only the first matching group applies.
const KEYWORD_GROUPS: [(&[&str], Adjustment); 4] = [
    (&["meeting", "call", "discuss"], Adjustment::AtLeast(30)),
    (&["email", "message", "reply"], Adjustment::AtMost(15)),
    (
        &["report", "presentation", "document", "project"],
        Adjustment::AtLeast(120),
    ),
    (
        &["analyze", "research", "study", "investigate"],
        Adjustment::AtLeast(90),
    ),
];

/// Estimates minutes from word count and keywords of the description.
pub fn estimate(description: &str) -> u32 {
    let words = description.split_whitespace().count();
    let base = match words {
        0..=3 => 15,
        4..=8 => 30,
        9..=15 => 60,
        _ => 90,
    };

    let lowered = description.to_lowercase();
    let adjusted = KEYWORD_GROUPS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(_, adjustment)| match adjustment {
            Adjustment::AtLeast(minutes) => base.max(*minutes),
            Adjustment::AtMost(minutes) => base.min(*minutes),
        })
        .unwrap_or(base);

    adjusted.max(MIN_MINUTES)
}
