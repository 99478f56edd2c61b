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

//! Record access shared by every table. Keys are always read back as plain strings through
//! `record::id(id)`, so the definitions never see surrealdb record ids.

use crate::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait Table {
    const TABLE: &'static str;
    /// Field the owner listing is sorted by, ascending.
    const ORDER_BY: &'static str = "created_at";
}

#[instrument(skip_all, fields(id = %id))]
pub async fn create<T, D>(connection: &DatabaseConnection, id: &Id, data: D) -> Result<T>
where
    T: DeserializeOwned,
    D: Serialize + Send + 'static,
{
    let mut response = sql_span!(connection
        .query("CREATE type::thing($table, $key) CONTENT $data RETURN NONE")
        .query("SELECT *, record::id(id) AS id FROM type::thing($table, $key)")
        .bind(("table", id.table))
        .bind(("key", id.key.clone()))
        .bind(("data", data)))?
    .check()?;

    response
        .take::<Option<T>>(1)?
        .ok_or(ApplicationError::InternalServerError)
}

#[instrument(skip_all, fields(id = %id))]
pub async fn select<T>(connection: &DatabaseConnection, id: &Id) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let mut response = sql_span!(connection
        .query("SELECT *, record::id(id) AS id FROM type::thing($table, $key)")
        .bind(("table", id.table))
        .bind(("key", id.key.clone())))?
    .check()?;

    Ok(response.take::<Option<T>>(0)?)
}

/// Selects the record only if it belongs to the given owner.
#[instrument(skip_all, fields(id = %id))]
pub async fn select_owned<T>(
    connection: &DatabaseConnection,
    owner: &str,
    id: &Id,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let mut response = sql_span!(connection
        .query("SELECT *, record::id(id) AS id FROM type::thing($table, $key) WHERE owner = $owner")
        .bind(("table", id.table))
        .bind(("key", id.key.clone()))
        .bind(("owner", owner.to_owned())))?
    .check()?;

    Ok(response.take::<Option<T>>(0)?)
}

#[instrument(skip(connection))]
pub async fn list_owned<T>(connection: &DatabaseConnection, owner: &str) -> Result<Vec<T>>
where
    T: Table + DeserializeOwned,
{
    let query = format!(
        "SELECT *, record::id(id) AS id FROM type::table($table) WHERE owner = $owner ORDER BY {} ASC",
        T::ORDER_BY
    );
    let mut response = sql_span!(connection
        .query(query)
        .bind(("table", T::TABLE))
        .bind(("owner", owner.to_owned())))?
    .check()?;

    Ok(response.take::<Vec<T>>(0)?)
}

/// Merges the data into an owned record and returns the result, `None` if there is no such
/// record for the owner.
#[instrument(skip_all, fields(id = %id))]
pub async fn merge_owned<T, D>(
    connection: &DatabaseConnection,
    owner: &str,
    id: &Id,
    data: D,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
    D: Serialize + Send + 'static,
{
    let mut response = sql_span!(connection
        .query("UPDATE type::thing($table, $key) MERGE $data WHERE owner = $owner RETURN NONE")
        .query("SELECT *, record::id(id) AS id FROM type::thing($table, $key) WHERE owner = $owner")
        .bind(("table", id.table))
        .bind(("key", id.key.clone()))
        .bind(("owner", owner.to_owned()))
        .bind(("data", data)))?
    .check()?;

    Ok(response.take::<Option<T>>(1)?)
}

/// Deletes an owned record. Returns whether there was anything to delete.
#[instrument(skip_all, fields(id = %id))]
pub async fn delete_owned(connection: &DatabaseConnection, owner: &str, id: &Id) -> Result<bool> {
    let mut response = sql_span!(connection
        .query("SELECT VALUE record::id(id) FROM type::thing($table, $key) WHERE owner = $owner")
        .query("DELETE type::thing($table, $key) WHERE owner = $owner RETURN NONE")
        .bind(("table", id.table))
        .bind(("key", id.key.clone()))
        .bind(("owner", owner.to_owned())))?
    .check()?;

    Ok(!response.take::<Vec<String>>(0)?.is_empty())
}

#[instrument(skip_all, fields(id = %id))]
pub async fn delete(connection: &DatabaseConnection, id: &Id) -> Result<()> {
    sql_span!(connection
        .query("DELETE type::thing($table, $key) RETURN NONE")
        .bind(("table", id.table))
        .bind(("key", id.key.clone())))?
    .check()?;

    Ok(())
}
