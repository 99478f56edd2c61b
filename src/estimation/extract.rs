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

//! Turning free-form model replies into structured values.

use crate::estimation::breakdown::{BreakdownItem, DayChunk, StepChunk, WorkCalendar};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

/// Estimates above three days are treated as nonsense.
pub const MAX_PLAUSIBLE_MINUTES: u64 = 4320;
/// Replacement for an implausible estimate.
pub const CAPPED_MINUTES: u32 = 120;

lazy_static! {
    static ref DIGITS: Regex = Regex::new(r"\d+").expect("valid digits pattern");
    static ref JSON_ARRAY: Regex =
        Regex::new(r"(?s)\[\s*(?:\{.*?\}\s*,?\s*)*\]").expect("valid json array pattern");
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Parsed(T),
    Unrecoverable(String),
}

impl<T> Extraction<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Extraction::Parsed(value) => Some(value),
            Extraction::Unrecoverable(_) => None,
        }
    }
}

/// The first run of digits in the reply, in minutes.
pub fn minutes(reply: &str) -> Extraction<u32> {
    let Some(digits) = DIGITS.find(reply) else {
        return Extraction::Unrecoverable(format!("no number in reply {reply:?}"));
    };

    // runs too long for u64 are implausible as well
    let minutes = digits.as_str().parse::<u64>().unwrap_or(u64::MAX);
    match minutes {
        0 => Extraction::Unrecoverable("estimate of zero minutes".to_owned()),
        minutes if minutes > MAX_PLAUSIBLE_MINUTES => Extraction::Parsed(CAPPED_MINUTES),
        // bounded by MAX_PLAUSIBLE_MINUTES
        minutes => Extraction::Parsed(minutes as u32),
    }
}

/// Finds the breakdown array in the reply and validates every item. Day items without a
/// usable date are dated by walking the work calendar.
pub fn breakdown(reply: &str, mut calendar: WorkCalendar) -> Extraction<Vec<BreakdownItem>> {
    let candidate = match JSON_ARRAY.find(reply) {
        Some(array) => array.as_str().to_owned(),
        None => {
            let stripped = strip_code_fence(reply);
            if stripped.starts_with('{') {
                format!("[{stripped}]")
            } else {
                stripped.to_owned()
            }
        }
    };

    let items = match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Array(items)) => items,
        Ok(_) => return Extraction::Unrecoverable("reply is not a list".to_owned()),
        Err(error) => return Extraction::Unrecoverable(format!("invalid json: {error}")),
    };
    if items.is_empty() {
        return Extraction::Unrecoverable("empty breakdown".to_owned());
    }

    let mut breakdown = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            return Extraction::Unrecoverable(format!("item {index} is not an object"));
        };

        match item_from(object, &mut calendar) {
            Some(item) => breakdown.push(item),
            None => {
                return Extraction::Unrecoverable(format!("item {index} misses required fields"))
            }
        }
    }

    Extraction::Parsed(breakdown)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);

    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn item_from(object: &Map<String, Value>, calendar: &mut WorkCalendar) -> Option<BreakdownItem> {
    let summary = object.get("summary")?.as_str()?.to_owned();
    let completed = object
        .get("completed")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if let (Some(step), Some(percentage)) = (object.get("step"), object.get("percentage")) {
        return Some(BreakdownItem::Step(StepChunk {
            step: u32::try_from(number(step)? as u64).ok()?,
            percentage: number(percentage)?,
            summary,
            completed,
        }));
    }

    let day = match object.get("day")? {
        Value::String(day) => day.clone(),
        Value::Number(day) => format!("Day {day}"),
        _ => return None,
    };
    let hours = number(object.get("hours")?)?;
    let scheduled = calendar.advance();
    let date = object
        .get("date")
        .and_then(Value::as_str)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .unwrap_or(scheduled);

    Some(BreakdownItem::Day(DayChunk {
        day,
        date,
        hours,
        summary,
        completed,
    }))
}

/// Numbers, also when sent as strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite() && *number >= 0.0)
}
