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
use crate::database::definitions::activity::Activity;
use crate::database::record::{self, Table};
use crate::prelude::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Router};
use chrono::NaiveDate;

pub fn router(state: ApplicationState) -> Router {
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route(
            "/activities/:id",
            get(get_activity)
                .put(update_activity)
                .delete(delete_activity),
        )
        .route_layer(require_session!(state))
        .with_state(state)
}

fn activity_id(id: &str) -> Result<Id> {
    Id::try_from((Activity::TABLE, id))
        .map_err(|_| ApplicationError::NotFound("Activity not found".to_owned()))
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateActivityRequest {
    name: String,
    date: NaiveDate,
    #[serde(default)]
    completed: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UpdateActivityRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
}

async fn list_activities(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
) -> Result<Json<Vec<Activity>>> {
    Ok(Json(
        record::list_owned::<Activity>(state.connection(), account.id()).await?,
    ))
}

async fn create_activity(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Json(data): Json<CreateActivityRequest>,
) -> Result<(StatusCode, Json<Activity>)> {
    if data.name.trim().is_empty() {
        return Err(ApplicationError::BadRequest(
            "Name must not be empty".to_owned(),
        ));
    }

    let activity = Activity::create(
        &account,
        data.name.as_str(),
        data.date,
        data.completed,
        state.connection(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

async fn get_activity(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<Json<Activity>> {
    record::select_owned::<Activity>(state.connection(), account.id(), &activity_id(&id)?)
        .await?
        .map(Json)
        .ok_or_else(|| ApplicationError::NotFound("Activity not found".to_owned()))
}

async fn update_activity(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    Json(data): Json<UpdateActivityRequest>,
) -> Result<Json<Activity>> {
    record::merge_owned::<Activity, _>(state.connection(), account.id(), &activity_id(&id)?, data)
        .await?
        .map(Json)
        .ok_or_else(|| ApplicationError::NotFound("Activity not found".to_owned()))
}

async fn delete_activity(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    if let Ok(id) = activity_id(&id) {
        record::delete_owned(state.connection(), account.id(), &id).await?;
    }

    Ok(Json(json!({"message": "Activity deleted"})))
}
