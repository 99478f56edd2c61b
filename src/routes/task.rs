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
use crate::database::definitions::task::{Task, WriteTask};
use crate::database::record::{self, Table};
use crate::estimation::breakdown::{self, BreakdownItem};
use crate::estimation::EstimationRequest;
use crate::prelude::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Extension, Router};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Used when the estimation service can not be reached.
pub const DEFAULT_ESTIMATED_MINUTES: u32 = 60;

pub fn router(state: ApplicationState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task)
                .put(update_task)
                .patch(toggle_task)
                .delete(delete_task),
        )
        .route("/tasks/:id/breakdown", patch(update_breakdown))
        .route_layer(require_session!(state))
        .with_state(state)
}

/// Accepts RFC 3339 timestamps, naive timestamps (read as UTC) and plain dates.
fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn due_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_due_date(value.as_str())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid due_date: {value}"))),
        None => Ok(None),
    }
}

fn validate_schedule(days_per_week: Option<u32>, hours_per_day: Option<f64>) -> Result<()> {
    if days_per_week.is_some_and(|days| !(1..=7).contains(&days)) {
        return Err(ApplicationError::BadRequest(
            "days_per_week must be between 1 and 7".to_owned(),
        ));
    }
    if hours_per_day.is_some_and(|hours| !(hours > 0.0 && hours <= 24.0)) {
        return Err(ApplicationError::BadRequest(
            "hours_per_day must be greater than 0 and at most 24".to_owned(),
        ));
    }

    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    match description.trim().is_empty() {
        true => Err(ApplicationError::BadRequest(
            "Description must not be empty".to_owned(),
        )),
        false => Ok(()),
    }
}

fn task_id(id: &str) -> Result<Id> {
    Id::try_from((Task::TABLE, id)).map_err(|_| not_found())
}

fn not_found() -> ApplicationError {
    ApplicationError::NotFound("Task not found".to_owned())
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateTaskRequest {
    description: String,
    #[serde(default)]
    estimated_minutes: Option<u32>,
    #[serde(default, deserialize_with = "due_date")]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    days_per_week: Option<u32>,
    #[serde(default)]
    hours_per_day: Option<f64>,
}

/// Partial update, absent fields stay untouched.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
    #[serde(
        default,
        deserialize_with = "due_date",
        skip_serializing_if = "Option::is_none"
    )]
    due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    days_per_week: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hours_per_day: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BreakdownUpdate {
    breakdown: Vec<BreakdownItem>,
    #[serde(default)]
    progress: Option<f64>,
}

async fn list_tasks(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
) -> Result<Json<Vec<Task>>> {
    let tasks = record::list_owned::<Task>(state.connection(), account.id()).await?;

    Ok(Json(tasks.into_iter().map(Task::normalized).collect()))
}

#[instrument(skip_all)]
async fn create_task(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Json(data): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>)> {
    validate_description(data.description.as_str())?;
    validate_schedule(data.days_per_week, data.hours_per_day)?;

    let (estimated_minutes, breakdown) = match data.estimated_minutes {
        Some(minutes) if minutes > 0 => (minutes, None),
        _ => {
            let request = EstimationRequest {
                description: data.description.clone(),
                days_per_week: data.days_per_week,
                hours_per_day: data.hours_per_day,
            };

            match state.estimation().estimate(&request).await {
                Some(result) => (
                    result.estimated_minutes,
                    Some(result.breakdown).filter(|items| !items.is_empty()),
                ),
                None => (DEFAULT_ESTIMATED_MINUTES, None),
            }
        }
    };

    let task = WriteTask::new(&account, data.description.as_str(), state.connection())
        .set_estimated_minutes(estimated_minutes)
        .set_due_date(data.due_date)
        .set_days_per_week(data.days_per_week)
        .set_hours_per_day(data.hours_per_day)
        .set_breakdown(breakdown)
        .to_owned()
        .await?;

    Ok((StatusCode::CREATED, Json(task.normalized())))
}

async fn get_task(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<Json<Task>> {
    let task = record::select_owned::<Task>(state.connection(), account.id(), &task_id(&id)?)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(task.normalized()))
}

async fn update_task(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    Json(data): Json<UpdateTaskRequest>,
) -> Result<Json<Task>> {
    if let Some(description) = &data.description {
        validate_description(description)?;
    }
    validate_schedule(data.days_per_week, data.hours_per_day)?;

    let task = record::merge_owned::<Task, _>(
        state.connection(),
        account.id(),
        &task_id(&id)?,
        data,
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(task.normalized()))
}

/// Flips the completion state.
async fn toggle_task(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<Json<Task>> {
    let id = task_id(&id)?;
    let task = record::select_owned::<Task>(state.connection(), account.id(), &id)
        .await?
        .ok_or_else(not_found)?;

    let task = record::merge_owned::<Task, _>(
        state.connection(),
        account.id(),
        &id,
        json!({"completed": !task.completed()}),
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(task.normalized()))
}

/// Answers 200 whether or not there was a task to delete.
async fn delete_task(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    if let Ok(id) = task_id(&id) {
        if !record::delete_owned(state.connection(), account.id(), &id).await? {
            debug!(%id, "Nothing to delete");
        }
    }

    Ok(Json(json!({"message": "Task deleted"})))
}

#[instrument(skip_all)]
async fn update_breakdown(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    Json(data): Json<BreakdownUpdate>,
) -> Result<Json<Task>> {
    let progress = match data.progress {
        Some(progress) if !(0.0..=100.0).contains(&progress) => {
            return Err(ApplicationError::BadRequest(
                "progress must be between 0 and 100".to_owned(),
            ))
        }
        Some(progress) => progress,
        None => breakdown::progress(&data.breakdown),
    };

    let task = record::merge_owned::<Task, _>(
        state.connection(),
        account.id(),
        &task_id(&id)?,
        json!({"breakdown": data.breakdown, "progress": progress}),
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(task.normalized()))
}

#[cfg(test)]
mod tests {
    use super::parse_due_date;
    use crate::database::definitions::task::Task;
    use crate::estimation::breakdown::BreakdownItem;
    use crate::estimation::{EstimationResult, Estimator};
    use crate::tests::prelude::*;
    use axum::BoxError;
    use chrono::{TimeZone, Utc};
    use reqwest::StatusCode;

    fn percentages(task: &Task) -> f64 {
        task.breakdown()
            .iter()
            .flatten()
            .map(|item| match item {
                BreakdownItem::Step(step) => step.percentage,
                BreakdownItem::Day(_) => panic!("days are not handed out"),
            })
            .sum()
    }

    #[test]
    fn test_due_dates() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();

        assert_eq!(parse_due_date("2026-10-20"), Some(expected));
        assert_eq!(parse_due_date("2026-10-20T00:00:00"), Some(expected));
        assert_eq!(parse_due_date("2026-10-20T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_due_date("2026-10-20T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_due_date("next week"), None);
    }

    #[tokio::test]
    async fn test_create_with_estimate() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;

        let response = suite
            .post("/tasks")
            .json(&json!({"description": "Write a report", "days_per_week": 5, "hours_per_day": 2}))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let task = response.json::<Task>().await?;

        assert!(*task.estimated_minutes() >= 120);
        assert!(!task.breakdown().clone().unwrap_or_default().is_empty());
        assert!((percentages(&task) - 100.0).abs() < 0.5);
        assert!(!task.completed());
        assert!(task.due_date().is_some_and(|due| due > *task.created_at()));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_given_minutes() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;

        let response = suite
            .post("/tasks")
            .json(&json!({"description": "Call mom", "estimated_minutes": 25, "due_date": "2030-01-01"}))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let task = response.json::<Task>().await?;

        assert_eq!(*task.estimated_minutes(), 25);
        assert!(task.breakdown().is_none());
        assert_eq!(
            *task.due_date(),
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_validation() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;

        for body in [
            json!({"description": "   "}),
            json!({"description": "Task", "days_per_week": 0}),
            json!({"description": "Task", "days_per_week": 8}),
            json!({"description": "Task", "hours_per_day": 0}),
            json!({"description": "Task", "hours_per_day": 24.5}),
            json!({"description": "Task", "due_date": "someday"}),
            json!({"estimated_minutes": 10}),
        ] {
            let response = suite.post("/tasks").json(&body).send().await?;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_task_lifecycle() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;

        let first = suite
            .post("/tasks")
            .json(&json!({"description": "First", "estimated_minutes": 10}))
            .send()
            .await?
            .json::<Task>()
            .await?;
        suite
            .post("/tasks")
            .json(&json!({"description": "Second", "estimated_minutes": 20}))
            .send()
            .await?;

        let tasks = suite.get("/tasks").send().await?.json::<Vec<Task>>().await?;
        assert_eq!(
            tasks.iter().map(|task| task.description().as_str()).collect::<Vec<_>>(),
            vec!["First", "Second"]
        );

        let path = format!("/tasks/{}", first.id());
        let fetched = suite.get(&path).send().await?.json::<Task>().await?;
        assert_eq!(fetched, first);

        // partial update keeps everything else
        let updated = suite
            .put(&path)
            .json(&json!({"description": "First, renamed"}))
            .send()
            .await?
            .json::<Task>()
            .await?;
        assert_eq!(updated.description(), "First, renamed");
        assert_eq!(updated.estimated_minutes(), first.estimated_minutes());

        // toggling twice restores the original state
        let toggled = suite.patch(&path).send().await?.json::<Task>().await?;
        assert!(toggled.completed());
        let toggled = suite.patch(&path).send().await?.json::<Task>().await?;
        assert!(!toggled.completed());

        let response = suite.delete(&path).send().await?;
        assert_eq!(response.status(), StatusCode::OK);
        let response = suite.delete(&path).send().await?;
        assert_eq!(response.status(), StatusCode::OK);
        let response = suite.get(&path).send().await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = suite.delete("/tasks/not-a-key!").send().await?;
        assert_eq!(response.status(), StatusCode::OK);

        Ok(())
    }

    #[tokio::test]
    async fn test_foreign_tasks() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;
        let task = suite
            .post("/tasks")
            .json(&json!({"description": "Private", "estimated_minutes": 10}))
            .send()
            .await?
            .json::<Task>()
            .await?;

        suite.authorize("other@test.com", "password").await?;
        let path = format!("/tasks/{}", task.id());
        assert_eq!(
            suite.get(&path).send().await?.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            suite.patch(&path).send().await?.status(),
            StatusCode::NOT_FOUND
        );
        assert!(suite
            .get("/tasks")
            .send()
            .await?
            .json::<Vec<Task>>()
            .await?
            .is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_breakdown() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;
        let task = suite
            .post("/tasks")
            .json(&json!({"description": "Write a report", "days_per_week": 7, "hours_per_day": 1}))
            .send()
            .await?
            .json::<Task>()
            .await?;
        let path = format!("/tasks/{}/breakdown", task.id());

        let steps = json!([
            {"kind": "step", "step": 1, "percentage": 50.0, "summary": "Draft", "completed": true},
            {"step": 2, "percentage": 50.0, "summary": "Polish"},
        ]);
        let updated = suite
            .patch(&path)
            .json(&json!({"breakdown": steps}))
            .send()
            .await?
            .json::<Task>()
            .await?;
        assert_eq!(*updated.progress(), 50.0);
        assert_eq!(updated.breakdown().as_ref().map(Vec::len), Some(2));

        let updated = suite
            .patch(&path)
            .json(&json!({"breakdown": steps, "progress": 75.0}))
            .send()
            .await?
            .json::<Task>()
            .await?;
        assert_eq!(*updated.progress(), 75.0);

        let response = suite
            .patch(&path)
            .json(&json!({"breakdown": steps, "progress": 101.0}))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        Ok(())
    }

    #[tokio::test]
    async fn test_remote_estimation() -> Result<(), BoxError> {
        let peer = TestSuite::init().await?;
        let mut suite = TestSuite::with(
            Estimator::new(None),
            Some(format!("http://{}", peer.address())),
        )
        .await?;
        suite.authorize_default().await?;

        let task = suite
            .post("/tasks")
            .json(&json!({"description": "Reply to email"}))
            .send()
            .await?
            .json::<Task>()
            .await?;
        let expected = peer
            .post("/estimate_time")
            .json(&json!({"description": "Reply to email"}))
            .send()
            .await?
            .json::<EstimationResult>()
            .await?;
        assert_eq!(*task.estimated_minutes(), expected.estimated_minutes);

        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_estimation() -> Result<(), BoxError> {
        let mut suite =
            TestSuite::with(Estimator::new(None), Some("http://127.0.0.1:9".to_owned())).await?;
        suite.authorize_default().await?;

        let response = suite
            .post("/tasks")
            .json(&json!({"description": "Write a report", "days_per_week": 5, "hours_per_day": 2}))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let task = response.json::<Task>().await?;

        assert_eq!(*task.estimated_minutes(), super::DEFAULT_ESTIMATED_MINUTES);
        assert!(task.breakdown().is_none());

        Ok(())
    }
}
