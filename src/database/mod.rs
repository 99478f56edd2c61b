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

use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

pub mod definitions;
pub mod id;
pub mod record;

pub type DatabaseConnection = Surreal<Any>;

#[instrument(skip_all)]
pub async fn connect(config: &Config) -> Result<DatabaseConnection> {
    // establish the connection
    let client = any::connect(config.database_endpoint().as_str()).await?;
    info!(
        "Established connection to surrealdb at {}",
        config.database_endpoint()
    );

    // authenticate, embedded engines run without credentials
    if let (Some(username), Some(password)) =
        (config.database_username(), config.database_password())
    {
        client
            .signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        info!("Authenticated with surrealdb");
    }

    // use namespace and database
    client
        .use_ns(config.database_namespace().as_str())
        .use_db(config.database_name().as_str())
        .await?;

    // execute the up queries
    client.query(include_str!("./up.surrealql")).await?.check()?;
    info!("Initiated tables");

    Ok(client)
}

#[macro_export]
macro_rules! sql_span {
    ($expr: expr) => {{
        use ::tracing::Instrument;
        ::std::future::IntoFuture::into_future($expr)
            .instrument(::tracing::info_span!("Surrealdb Request"))
            .await
    }};
}
