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

use crate::prelude::*;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod activity;
pub mod auth;
pub mod estimate;
pub mod extractor;
pub mod file;
pub mod task;

/// The whole api. Every service shares the state, clients may talk to it from any origin.
pub fn router(state: ApplicationState) -> Router {
    Router::new()
        .merge(auth::router(state.clone()))
        .merge(task::router(state.clone()))
        .merge(activity::router(state.clone()))
        .merge(file::router(state.clone()))
        .merge(estimate::router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
