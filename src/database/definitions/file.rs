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
use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Accepted upload types, named by their extension.
#[derive(
    Deserialize,
    Serialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FileType {
    Jpg,
    Jpeg,
    Png,
    Pdf,
    Txt,
}

impl FileType {
    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| FileType::from_str(extension).ok())
    }

    pub fn mime(&self) -> &'static str {
        match self {
            FileType::Jpg | FileType::Jpeg => "image/jpeg",
            FileType::Png => "image/png",
            FileType::Pdf => "application/pdf",
            FileType::Txt => "text/plain",
        }
    }

    /// ".jpg, .jpeg, .png, .pdf, .txt"
    pub fn allowed() -> String {
        FileType::iter()
            .map(|file_type| format!(".{}", file_type.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Metadata of an uploaded file, the content lives in the upload directory.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Getters)]
#[get = "pub"]
pub struct StoredFile {
    id: String,
    owner: String,
    original_filename: String,
    #[serde(default, skip_serializing)]
    storage_filename: String,
    file_type: FileType,
    file_size: u64,
    upload_time: DateTime<Utc>,
    #[serde(default)]
    description: Option<String>,
}

impl Table for StoredFile {
    const TABLE: &'static str = "stored_file";
    const ORDER_BY: &'static str = "upload_time";
}

impl StoredFile {
    #[instrument(skip(owner, connection))]
    pub async fn create(
        owner: &Account,
        original_filename: &str,
        storage_filename: &str,
        file_type: FileType,
        file_size: u64,
        description: Option<String>,
        connection: &DatabaseConnection,
    ) -> Result<StoredFile> {
        record::create(
            connection,
            &Id::generate(StoredFile::TABLE),
            json!({
                "owner": owner.id(),
                "original_filename": original_filename,
                "storage_filename": storage_filename,
                "file_type": file_type,
                "file_size": file_size,
                "upload_time": Utc::now(),
                "description": description,
            }),
        )
        .await
    }
}
