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

use crate::auth::session::Session;
use crate::prelude::*;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer token and makes the account and its session available to the handlers.
pub async fn require_session(
    State(state): State<ApplicationState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return ApplicationError::Unauthorized.into_response();
    };

    match Session::validate(token.as_str(), state.connection()).await {
        Ok((session, account)) => {
            let extensions = request.extensions_mut();
            extensions.insert(account);
            extensions.insert(session);

            next.run(request).await
        }
        Err(error) => error.into_response(),
    }
}

/// Layer requiring a valid session for every route it wraps.
#[macro_export]
macro_rules! require_session {
    ($state: expr) => {
        ::axum::middleware::from_fn_with_state(
            $state.clone(),
            $crate::auth::middleware::require_session,
        )
    };
}
