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

use crate::database::definitions::account::Account;
use crate::database::record::{self, Table};
use crate::estimation::breakdown::{self, BreakdownItem};
use crate::prelude::*;
use chrono::{DateTime, Duration, Utc};
use std::future::{Future, IntoFuture};
use std::pin::Pin;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Getters)]
#[get = "pub"]
pub struct Task {
    id: String,
    owner: String,
    description: String,
    estimated_minutes: u32,
    completed: bool,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    days_per_week: Option<u32>,
    #[serde(default)]
    hours_per_day: Option<f64>,
    #[serde(default)]
    breakdown: Option<Vec<BreakdownItem>>,
    #[serde(default)]
    progress: f64,
    created_at: DateTime<Utc>,
}

impl Table for Task {
    const TABLE: &'static str = "task";
}

impl Task {
    /// Task as handed out to clients, breakdowns always in step form.
    pub fn normalized(mut self) -> Self {
        self.breakdown = self.breakdown.map(breakdown::normalize);
        self
    }
}

#[derive(Serialize, Debug)]
struct TaskContent {
    owner: String,
    description: String,
    estimated_minutes: u32,
    completed: bool,
    due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_per_week: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hours_per_day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<Vec<BreakdownItem>>,
    progress: f64,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Setters)]
pub struct WriteTask<'a> {
    owner: &'a Account,
    description: &'a str,
    #[set = "pub"]
    estimated_minutes: u32,
    #[set = "pub"]
    completed: bool,
    #[set = "pub"]
    due_date: Option<DateTime<Utc>>,
    #[set = "pub"]
    days_per_week: Option<u32>,
    #[set = "pub"]
    hours_per_day: Option<f64>,
    #[set = "pub"]
    breakdown: Option<Vec<BreakdownItem>>,
    connection: &'a DatabaseConnection,
}

impl<'a> WriteTask<'a> {
    pub fn new(
        owner: &'a Account,
        description: &'a str,
        connection: &'a DatabaseConnection,
    ) -> Self {
        Self {
            owner,
            description,
            estimated_minutes: 0,
            completed: false,
            due_date: None,
            days_per_week: None,
            hours_per_day: None,
            breakdown: None,
            connection,
        }
    }
}

impl<'a> IntoFuture for WriteTask<'a> {
    type Output = Result<Task>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all)]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let created_at = Utc::now();
            let content = TaskContent {
                owner: self.owner.id().clone(),
                description: self.description.to_owned(),
                estimated_minutes: self.estimated_minutes,
                completed: self.completed,
                // due tomorrow unless told otherwise
                due_date: self.due_date.unwrap_or(created_at + Duration::days(1)),
                days_per_week: self.days_per_week,
                hours_per_day: self.hours_per_day,
                breakdown: self.breakdown,
                progress: 0.0,
                created_at,
            };

            record::create(self.connection, &Id::generate(Task::TABLE), content).await
        })
    }
}
