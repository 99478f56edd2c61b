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

use crate::auth::Authenticate;
use crate::database::definitions::account::{Account, WriteAccount};
use crate::prelude::*;
use crate::routes::extractor::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Router};
use chrono::Duration;

pub fn router(state: ApplicationState) -> Router {
    Router::new()
        .route("/logout", post(logout))
        .route_layer(require_session!(state))
        .route("/register", post(register))
        .route("/token", post(token))
        .with_state(state)
}

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    email: String,
    password: String,
}

/// OAuth2 password grant, the username is the email.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenRequest {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[instrument(skip_all)]
async fn register(
    State(state): State<ApplicationState>,
    Json(data): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    if !data.email.contains('@') || data.password.is_empty() {
        return Err(ApplicationError::BadRequest(
            "A valid email and a password are required".to_owned(),
        ));
    }

    if Account::from_email(data.email.as_str(), state.connection())
        .await?
        .is_some()
    {
        return Err(ApplicationError::BadRequest(
            "Email already registered".to_owned(),
        ));
    }

    let created = WriteAccount::from(state.connection())
        .set_email(Some(data.email.as_str()))
        .set_password(Some(data.password))
        .to_owned()
        .await;
    if let Err(error) = created {
        // a concurrent registration of the same email won the unique index
        if Account::from_email(data.email.as_str(), state.connection())
            .await?
            .is_some()
        {
            return Err(ApplicationError::BadRequest(
                "Email already registered".to_owned(),
            ));
        }

        return Err(error);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "User registered successfully"})),
    ))
}

#[instrument(skip_all)]
async fn token(
    State(state): State<ApplicationState>,
    Form(data): Form<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    let invalid = || ApplicationError::BadRequest("Invalid credentials".to_owned());

    let account = Account::from_email(data.username.as_str(), state.connection())
        .await?
        .ok_or_else(invalid)?;
    account
        .login(data.password.as_str())
        .map_err(|_| invalid())?;

    let session = account
        .start_session(
            Duration::seconds(*state.config().session_length_secs()),
            state.connection(),
        )
        .await?;

    Ok(Json(TokenResponse {
        access_token: session.id().clone(),
        token_type: "bearer".to_owned(),
    }))
}

/// Ends every session of the account.
async fn logout(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
) -> Result<Json<serde_json::Value>> {
    account.logout(state.connection()).await?;

    Ok(Json(json!({"message": "Logged out"})))
}
