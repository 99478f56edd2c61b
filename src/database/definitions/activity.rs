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
use crate::database::record::{self, Table};
use crate::prelude::*;
use chrono::{DateTime, NaiveDate, Utc};

/// A dated entry of the activity calendar.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Getters)]
#[get = "pub"]
pub struct Activity {
    id: String,
    owner: String,
    name: String,
    date: NaiveDate,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl Table for Activity {
    const TABLE: &'static str = "activity";
}

impl Activity {
    #[instrument(skip(owner, connection))]
    pub async fn create(
        owner: &Account,
        name: &str,
        date: NaiveDate,
        completed: bool,
        connection: &DatabaseConnection,
    ) -> Result<Activity> {
        record::create(
            connection,
            &Id::generate(Activity::TABLE),
            json!({
                "owner": owner.id(),
                "name": name,
                "date": date,
                "completed": completed,
                "created_at": Utc::now(),
            }),
        )
        .await
    }
}
