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

use chrono::{Datelike, NaiveDate, Weekday};

/// Upper bound of generated day chunks, two years of daily work.
pub const MAX_CHUNKS: usize = 730;

/// One entry of a task breakdown. Always written with its `kind`, read with or without it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case", from = "IncomingItem")]
pub enum BreakdownItem {
    Day(DayChunk),
    Step(StepChunk),
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TaggedItem {
    Day(DayChunk),
    Step(StepChunk),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IncomingItem {
    Tagged(TaggedItem),
    Day(DayChunk),
    Step(StepChunk),
}

impl From<IncomingItem> for BreakdownItem {
    fn from(item: IncomingItem) -> Self {
        match item {
            IncomingItem::Tagged(TaggedItem::Day(chunk)) | IncomingItem::Day(chunk) => {
                BreakdownItem::Day(chunk)
            }
            IncomingItem::Tagged(TaggedItem::Step(step)) | IncomingItem::Step(step) => {
                BreakdownItem::Step(step)
            }
        }
    }
}

impl BreakdownItem {
    pub fn summary(&self) -> &str {
        match self {
            BreakdownItem::Day(chunk) => chunk.summary.as_str(),
            BreakdownItem::Step(step) => step.summary.as_str(),
        }
    }

    pub fn completed(&self) -> bool {
        match self {
            BreakdownItem::Day(chunk) => chunk.completed,
            BreakdownItem::Step(step) => step.completed,
        }
    }
}

/// A block of work scheduled on a calendar day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DayChunk {
    pub day: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub summary: String,
    #[serde(default)]
    pub completed: bool,
}

/// A fraction of the whole task, without a date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepChunk {
    pub step: u32,
    pub percentage: f64,
    pub summary: String,
    #[serde(default)]
    pub completed: bool,
}

/// Walks calendar days from a start date, optionally skipping weekends.
#[derive(Debug, Clone)]
pub struct WorkCalendar {
    next: NaiveDate,
    skip_weekends: bool,
}

impl WorkCalendar {
    /// Weekends are skipped for schedules of five days a week or less.
    pub fn new(start: NaiveDate, days_per_week: u32) -> Self {
        Self {
            next: start,
            skip_weekends: days_per_week <= 5,
        }
    }

    /// The next work day.
    pub fn advance(&mut self) -> NaiveDate {
        if self.skip_weekends {
            while matches!(self.next.weekday(), Weekday::Sat | Weekday::Sun) {
                self.next = self.next.succ_opt().unwrap_or(self.next);
            }
        }

        let date = self.next;
        self.next = date.succ_opt().unwrap_or(date);
        date
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A schedule is usable with at least one day per week and a positive, finite number of hours
/// per day. Weeks with more than five days keep their weekends.
pub fn valid_schedule(
    days_per_week: Option<u32>,
    hours_per_day: Option<f64>,
) -> Option<(u32, f64)> {
    match (days_per_week, hours_per_day) {
        (Some(days), Some(hours)) if days > 0 && hours > 0.0 && hours.is_finite() => {
            Some((days, hours))
        }
        _ => None,
    }
}

/// Deterministically splits the total into day chunks following the schedule. Without a
/// usable schedule the whole task becomes a single entry dated today.
pub fn synthesize(
    description: &str,
    total_minutes: i64,
    days_per_week: Option<u32>,
    hours_per_day: Option<f64>,
    today: NaiveDate,
) -> Vec<BreakdownItem> {
    if description.trim().is_empty() || total_minutes <= 0 {
        return Vec::new();
    }

    let Some((days_per_week, hours_per_day)) = valid_schedule(days_per_week, hours_per_day)
    else {
        return vec![BreakdownItem::Day(DayChunk {
            day: "Task".to_owned(),
            date: today,
            hours: round1(total_minutes as f64 / 60.0),
            summary: format!("Complete task: {description}"),
            completed: false,
        })];
    };

    let minutes_per_day = hours_per_day * 60.0;
    let chunks = ((total_minutes as f64 / minutes_per_day).ceil() as usize).clamp(1, MAX_CHUNKS);
    let mut calendar = WorkCalendar::new(today, days_per_week);
    let mut remaining = total_minutes as f64;
    let mut items = Vec::with_capacity(chunks);

    for part in 1..=chunks {
        if remaining <= 0.0 {
            break;
        }

        let minutes = remaining.min(minutes_per_day);
        remaining -= minutes;

        let summary = if chunks == 1 {
            format!("Complete task: {description}")
        } else if remaining <= 0.0 || part == chunks {
            format!("Final work on: {description} (Part {part})")
        } else {
            format!("Work on: {description} (Part {part})")
        };

        items.push(BreakdownItem::Day(DayChunk {
            day: format!("Day {part}"),
            date: calendar.advance(),
            hours: round1(minutes / 60.0),
            summary,
            completed: false,
        }));
    }

    items
}

/// Converts day chunks into steps. A step's percentage is its share of the total hours,
/// steps are numbered by position. Lists of steps pass through unchanged.
pub fn normalize(items: Vec<BreakdownItem>) -> Vec<BreakdownItem> {
    if items
        .iter()
        .all(|item| matches!(item, BreakdownItem::Step(_)))
    {
        return items;
    }

    let total_hours: f64 = items
        .iter()
        .filter_map(|item| match item {
            BreakdownItem::Day(chunk) => Some(chunk.hours),
            BreakdownItem::Step(_) => None,
        })
        .sum();
    let count = items.len();

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            BreakdownItem::Day(chunk) => BreakdownItem::Step(StepChunk {
                step: index as u32 + 1,
                percentage: if total_hours > 0.0 {
                    chunk.hours / total_hours * 100.0
                } else {
                    100.0 / count as f64
                },
                summary: chunk.summary,
                completed: chunk.completed,
            }),
            step => step,
        })
        .collect()
}

/// Share of completed items, 0 for an empty list.
pub fn progress(items: &[BreakdownItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }

    items.iter().filter(|item| item.completed()).count() as f64 / items.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn days(items: &[BreakdownItem]) -> Vec<&DayChunk> {
        items
            .iter()
            .map(|item| match item {
                BreakdownItem::Day(chunk) => chunk,
                BreakdownItem::Step(_) => panic!("expected a day chunk"),
            })
            .collect()
    }

    #[test]
    fn test_nothing_to_split() {
        let today = date("2026-10-12");

        assert!(synthesize("", 120, Some(5), Some(2.0), today).is_empty());
        assert!(synthesize("   ", 120, Some(5), Some(2.0), today).is_empty());
        assert!(synthesize("Write", 0, Some(5), Some(2.0), today).is_empty());
        assert!(synthesize("Write", -5, Some(5), Some(2.0), today).is_empty());
    }

    #[test]
    fn test_without_schedule() {
        let today = date("2026-10-12");

        let schedules = [
            (None, None),
            (Some(5), None),
            (Some(0), Some(2.0)),
            (Some(5), Some(0.0)),
            (Some(5), Some(-1.0)),
            (Some(5), Some(f64::NAN)),
            (Some(5), Some(f64::INFINITY)),
        ];

        for (per_week, per_day) in schedules {
            let items = synthesize("Write report", 90, per_week, per_day, today);
            let chunks = days(&items);

            assert_eq!(chunks.len(), 1);
            assert_eq!(chunks[0].day, "Task");
            assert_eq!(chunks[0].date, today);
            assert_eq!(chunks[0].hours, 1.5);
            assert_eq!(chunks[0].summary, "Complete task: Write report");
        }
    }

    #[test]
    fn test_single_chunk() {
        let items = synthesize("Email", 60, Some(5), Some(2.0), date("2026-10-12"));
        let chunks = days(&items);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].day, "Day 1");
        assert_eq!(chunks[0].hours, 1.0);
        assert_eq!(chunks[0].summary, "Complete task: Email");
    }

    #[test]
    fn test_weekends_are_skipped() {
        // friday
        let items = synthesize("Write report", 300, Some(5), Some(2.0), date("2026-10-16"));
        let chunks = days(&items);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].date, date("2026-10-16"));
        assert_eq!(chunks[1].date, date("2026-10-19"));
        assert_eq!(chunks[2].date, date("2026-10-20"));
        assert_eq!(
            chunks.iter().map(|chunk| chunk.hours).collect::<Vec<_>>(),
            vec![2.0, 2.0, 1.0]
        );
        assert_eq!(chunks[0].summary, "Work on: Write report (Part 1)");
        assert_eq!(chunks[1].summary, "Work on: Write report (Part 2)");
        assert_eq!(chunks[2].summary, "Final work on: Write report (Part 3)");
    }

    #[test]
    fn test_weekends_are_kept_for_full_weeks() {
        // saturday
        let items = synthesize("Study", 240, Some(7), Some(2.0), date("2026-10-17"));
        let chunks = days(&items);

        assert_eq!(chunks[0].date, date("2026-10-17"));
        assert_eq!(chunks[1].date, date("2026-10-18"));
    }

    #[test]
    fn test_unusual_schedules_are_split() {
        // monday
        let items = synthesize("Write report", 300, Some(8), Some(2.0), date("2026-10-12"));
        let chunks = days(&items);

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.day.as_str()).collect::<Vec<_>>(),
            vec!["Day 1", "Day 2", "Day 3"]
        );
        assert_eq!(chunks[2].date, date("2026-10-14"));

        // saturday, more than a day of work fits into one chunk
        let items = synthesize("Write report", 300, Some(5), Some(25.0), date("2026-10-17"));
        let chunks = days(&items);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].day, "Day 1");
        assert_eq!(chunks[0].date, date("2026-10-19"));
        assert_eq!(chunks[0].hours, 5.0);
    }

    #[test]
    fn test_hours_add_up() {
        let items = synthesize("Study", 1000, Some(6), Some(1.5), date("2026-10-12"));
        let chunks = days(&items);
        let total: f64 = chunks.iter().map(|chunk| chunk.hours).sum();

        assert_eq!(chunks.len(), 12);
        assert!((total - 1000.0 / 60.0).abs() <= 0.05 * chunks.len() as f64);
        assert!(chunks.windows(2).all(|pair| pair[0].date < pair[1].date));
    }

    #[test]
    fn test_chunks_are_bounded() {
        let items = synthesize("Huge", 10_000_000, Some(7), Some(0.1), date("2026-10-12"));

        assert_eq!(items.len(), MAX_CHUNKS);
    }

    #[test]
    fn test_normalize() {
        let mut items = synthesize("Write", 300, Some(7), Some(2.0), date("2026-10-12"));
        if let BreakdownItem::Day(chunk) = &mut items[0] {
            chunk.completed = true;
        }

        let steps = normalize(items);
        let steps: Vec<&StepChunk> = steps
            .iter()
            .map(|item| match item {
                BreakdownItem::Step(step) => step,
                BreakdownItem::Day(_) => panic!("expected a step"),
            })
            .collect();

        assert_eq!(
            steps.iter().map(|step| step.step).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!((steps[0].percentage - 40.0).abs() < 1e-9);
        assert!((steps[2].percentage - 20.0).abs() < 1e-9);
        assert!(steps[0].completed);
        assert!(!steps[1].completed);
        assert_eq!(steps[2].summary, "Final work on: Write (Part 3)");
    }

    #[test]
    fn test_normalize_keeps_steps() {
        let steps = vec![BreakdownItem::Step(StepChunk {
            step: 4,
            percentage: 12.5,
            summary: "Outline".to_owned(),
            completed: false,
        })];

        assert_eq!(normalize(steps.clone()), steps);
    }

    #[test]
    fn test_progress() {
        let mut items = synthesize("Write", 300, Some(7), Some(2.0), date("2026-10-12"));
        assert_eq!(progress(&items), 0.0);
        assert_eq!(progress(&[]), 0.0);

        if let BreakdownItem::Day(chunk) = &mut items[1] {
            chunk.completed = true;
        }
        assert!((progress(&items) - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_wire_format() {
        let item = BreakdownItem::Day(DayChunk {
            day: "Day 1".to_owned(),
            date: date("2026-10-12"),
            hours: 2.0,
            summary: "Work".to_owned(),
            completed: false,
        });
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["kind"], "day");
        assert_eq!(value["date"], "2026-10-12");
        assert_eq!(
            serde_json::from_value::<BreakdownItem>(json!({
                "kind": "step", "step": 1, "percentage": 50.0, "summary": "Half"
            }))
            .unwrap(),
            BreakdownItem::Step(StepChunk {
                step: 1,
                percentage: 50.0,
                summary: "Half".to_owned(),
                completed: false,
            })
        );
    }

    #[test]
    fn test_items_without_kind() {
        let items = serde_json::from_value::<Vec<BreakdownItem>>(json!([
            {"step": 1, "percentage": 40.0, "summary": "Draft", "completed": true},
            {"day": "Day 1", "date": "2026-10-12", "hours": 1.5, "summary": "Polish"},
        ]))
        .unwrap();

        assert_eq!(
            items,
            vec![
                BreakdownItem::Step(StepChunk {
                    step: 1,
                    percentage: 40.0,
                    summary: "Draft".to_owned(),
                    completed: true,
                }),
                BreakdownItem::Day(DayChunk {
                    day: "Day 1".to_owned(),
                    date: date("2026-10-12"),
                    hours: 1.5,
                    summary: "Polish".to_owned(),
                    completed: false,
                }),
            ]
        );
        // written back with the discriminator
        assert_eq!(serde_json::to_value(&items[0]).unwrap()["kind"], "step");
        assert!(serde_json::from_value::<BreakdownItem>(json!({"summary": "Nothing"})).is_err());
    }
}
