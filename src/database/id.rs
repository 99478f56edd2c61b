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

use crate::error::ApplicationError;
use std::fmt::{Display, Formatter};

pub const ALPHABET: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

const KEY_LENGTH: usize = 20;
const MAX_KEY_LENGTH: usize = 64;

/// A record id, the table plus the key within it.
#[derive(Debug, Clone, PartialEq)]
pub struct Id {
    pub table: &'static str,
    pub key: String,
}

impl Id {
    pub fn new(table: &'static str, key: String) -> Self {
        Self { table, key }
    }

    /// A fresh random key in the given table.
    pub fn generate(table: &'static str) -> Self {
        Self::new(table, nanoid::nanoid!(KEY_LENGTH, &ALPHABET))
    }
}

/// Keys coming from the outside are only accepted if they could have been generated by us.
impl TryFrom<(&'static str, &str)> for Id {
    type Error = ApplicationError;

    fn try_from((table, key): (&'static str, &str)) -> Result<Self, Self::Error> {
        if key.is_empty()
            || key.len() > MAX_KEY_LENGTH
            || !key.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ApplicationError::NotFound(format!("{table} not found")));
        }

        Ok(Self::new(table, key.to_owned()))
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}
