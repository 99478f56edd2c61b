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

use crate::estimation::{EstimationRequest, EstimationResult};
use crate::prelude::*;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;

pub fn router(state: ApplicationState) -> Router {
    Router::new()
        .route("/estimate_time", post(estimate_time))
        .route("/health", get(health))
        .with_state(state)
}

/// Always answers with an estimate, falling back to the heuristic when no model helps.
#[instrument(skip_all)]
async fn estimate_time(
    State(state): State<ApplicationState>,
    Json(request): Json<EstimationRequest>,
) -> Result<Json<EstimationResult>> {
    if request.description.trim().is_empty() {
        return Err(ApplicationError::BadRequest(
            "Task description is required".to_owned(),
        ));
    }

    let result = state
        .estimator()
        .estimate(&request, Utc::now().date_naive())
        .await;
    info!(
        minutes = result.estimated_minutes,
        source = %result.source,
        "Estimated task"
    );

    Ok(Json(result))
}

async fn health(State(state): State<ApplicationState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "ai_service_configured": state.estimator().ai_configured(),
    }))
}
