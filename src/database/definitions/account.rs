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

use crate::database::record::{self, Table};
use crate::prelude::*;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use std::future::{Future, IntoFuture};
use std::pin::Pin;

pub const SEED_EMAIL: &str = "test@test.com";
pub const SEED_PASSWORD: &str = "12345678";

#[derive(Clone, Debug, Deserialize, PartialEq, Getters)]
#[get = "pub"]
pub struct Account {
    id: String,
    email: String,
    password: String,
    created_at: DateTime<Utc>,
}

impl Table for Account {
    const TABLE: &'static str = "account";
}

impl Account {
    #[instrument(skip(connection))]
    pub async fn from_email(email: &str, connection: &DatabaseConnection) -> Result<Option<Account>> {
        let mut response = sql_span!(connection
            .query("SELECT *, record::id(id) AS id FROM account WHERE email = $email LIMIT 1")
            .bind(("email", normalize_email(email))))?
        .check()?;

        Ok(response.take::<Option<Account>>(0)?)
    }
}

/// Emails are compared case insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone, Debug, Setters)]
pub struct WriteAccount<'a> {
    #[set = "pub"]
    email: Option<&'a str>,
    #[set = "pub"]
    password: Option<String>,
    connection: &'a DatabaseConnection,
}

impl<'a> From<&'a DatabaseConnection> for WriteAccount<'a> {
    fn from(connection: &'a DatabaseConnection) -> Self {
        Self {
            email: None,
            password: None,
            connection,
        }
    }
}

impl<'a> IntoFuture for WriteAccount<'a> {
    type Output = Result<Account>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all)]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let (Some(email), Some(password)) = (self.email, self.password) else {
                return Err(ApplicationError::BadRequest(
                    "email and password are required".to_owned(),
                ));
            };

            // hash with a fresh salt
            let hash = Argon2::default()
                .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
                .to_string();

            record::create(
                self.connection,
                &Id::generate(Account::TABLE),
                json!({
                    "email": normalize_email(email),
                    "password": hash,
                    "created_at": Utc::now(),
                }),
            )
            .await
        })
    }
}

/// Creates the well known test account unless it already exists.
#[instrument(skip_all)]
pub async fn seed_test_account(connection: &DatabaseConnection) -> Result<()> {
    if Account::from_email(SEED_EMAIL, connection).await?.is_none() {
        WriteAccount::from(connection)
            .set_email(Some(SEED_EMAIL))
            .set_password(Some(SEED_PASSWORD.to_owned()))
            .to_owned()
            .await?;
        info!("Created test account {}", SEED_EMAIL);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::BoxError;

    #[tokio::test]
    async fn test_write_account() -> std::result::Result<(), BoxError> {
        let mut config = Config::default();
        config.set_database_name(nanoid::nanoid!());
        let connection = crate::database::connect(&config).await?;

        let account = WriteAccount::from(&connection)
            .set_email(Some(" Jane@Example.com"))
            .set_password(Some("password".to_owned()))
            .to_owned()
            .await?;

        assert_eq!(account.email(), "jane@example.com");
        assert_ne!(account.password(), "password");
        assert_eq!(
            Account::from_email("JANE@example.com", &connection).await?,
            Some(account)
        );
        assert!(Account::from_email("john@example.com", &connection)
            .await?
            .is_none());

        assert!(WriteAccount::from(&connection)
            .set_email(Some("john@example.com"))
            .to_owned()
            .await
            .is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() -> std::result::Result<(), BoxError> {
        let mut config = Config::default();
        config.set_database_name(nanoid::nanoid!());
        let connection = crate::database::connect(&config).await?;

        seed_test_account(&connection).await?;
        seed_test_account(&connection).await?;

        assert!(Account::from_email(SEED_EMAIL, &connection).await?.is_some());

        Ok(())
    }
}
