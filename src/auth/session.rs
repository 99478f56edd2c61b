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
use crate::database::id::ALPHABET;
use crate::database::record::{self, Table};
use crate::prelude::*;
use chrono::{DateTime, Duration, Utc};
use std::future::{Future, IntoFuture};
use std::pin::Pin;

const TOKEN_LENGTH: usize = 64;

/// A bearer token session. The record key is the token itself.
#[derive(Clone, Debug, Getters, Deserialize)]
#[get = "pub"]
pub struct Session {
    id: String,
    account: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Table for Session {
    const TABLE: &'static str = "session";
}

impl Session {
    /// Resolves a bearer token into its session and account. Expired sessions are ended.
    #[instrument(skip_all)]
    pub async fn validate(token: &str, connection: &DatabaseConnection) -> Result<(Session, Account)> {
        let id = Id::try_from((Session::TABLE, token)).map_err(|_| ApplicationError::Unauthorized)?;
        let session = record::select::<Session>(connection, &id)
            .await?
            .ok_or(ApplicationError::Unauthorized)?;

        if session.is_expired() {
            // the session is not anymore valid, so we end it.
            session.end(connection).await?;

            return Err(ApplicationError::Unauthorized);
        }

        let account = record::select::<Account>(
            connection,
            &Id::new(Account::TABLE, session.account.clone()),
        )
        .await?
        .ok_or(ApplicationError::Unauthorized)?;

        Ok((session, account))
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Ends the given session
    #[instrument(skip_all)]
    pub async fn end(&self, connection: &DatabaseConnection) -> Result<()> {
        record::delete(connection, &Id::new(Session::TABLE, self.id.clone())).await
    }
}

/// Ends every session of the account.
#[derive(Clone, Debug)]
pub struct EndSession<'a> {
    account: &'a Account,
    connection: &'a DatabaseConnection,
}

impl<'a> EndSession<'a> {
    pub fn new(account: &'a Account, connection: &'a DatabaseConnection) -> Self {
        Self {
            account,
            connection,
        }
    }
}

impl<'a> IntoFuture for EndSession<'a> {
    type Output = Result<()>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            sql_span!(self
                .connection
                .query("DELETE session WHERE account = $account RETURN NONE")
                .bind(("account", self.account.id().clone())))?
            .check()?;

            Ok(())
        })
    }
}

#[derive(Clone, Debug)]
pub struct WriteSession<'a> {
    account: &'a Account,
    length: Duration,
    connection: &'a DatabaseConnection,
}

impl<'a> WriteSession<'a> {
    pub fn new(account: &'a Account, length: Duration, connection: &'a DatabaseConnection) -> Self {
        Self {
            account,
            length,
            connection,
        }
    }
}

impl<'a> IntoFuture for WriteSession<'a> {
    type Output = Result<Session>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all)]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let created_at = Utc::now();
            // generate session id
            let id = Id::new(
                Session::TABLE,
                nanoid::nanoid!(TOKEN_LENGTH, &ALPHABET),
            );

            record::create(
                self.connection,
                &id,
                json!({
                    "account": self.account.id(),
                    "created_at": created_at,
                    "expires_at": created_at + self.length,
                }),
            )
            .await
        })
    }
}
