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
use crate::database::definitions::file::{FileType, StoredFile};
use crate::database::record::{self, Table};
use crate::prelude::*;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Router};
use std::io::ErrorKind;

pub fn router(state: ApplicationState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/files", get(list_files))
        .route("/files/:id", get(download).delete(delete_file))
        .route_layer(require_session!(state))
        .layer(DefaultBodyLimit::max(*state.config().max_upload_bytes()))
        .with_state(state)
}

fn file_id(id: &str) -> Result<Id> {
    Id::try_from((StoredFile::TABLE, id)).map_err(|_| not_found())
}

fn not_found() -> ApplicationError {
    ApplicationError::NotFound("File not found".to_owned())
}

#[derive(Default)]
struct Upload {
    filename: Option<String>,
    content: Option<Bytes>,
    description: Option<String>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut upload = Upload::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("file") => {
                    upload.filename = field.file_name().map(str::to_owned);
                    upload.content = Some(field.bytes().await?);
                }
                Some("description") => {
                    upload.description = Some(field.text().await?).filter(|text| !text.is_empty());
                }
                _ => debug!("Skipping unknown multipart field"),
            }
        }

        Ok(upload)
    }
}

#[instrument(skip_all)]
async fn upload(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    multipart: Multipart,
) -> Result<Json<StoredFile>> {
    let upload = Upload::read(multipart).await?;
    let (Some(filename), Some(content)) = (upload.filename, upload.content) else {
        return Err(ApplicationError::BadRequest("No file uploaded".to_owned()));
    };
    let file_type = FileType::from_filename(filename.as_str()).ok_or_else(|| {
        ApplicationError::BadRequest(format!(
            "File type not allowed. Allowed types: {}",
            FileType::allowed()
        ))
    })?;

    let upload_dir = state.config().upload_dir();
    tokio::fs::create_dir_all(upload_dir).await?;
    let storage_filename = format!("{}.{}", nanoid::nanoid!(), file_type);
    let path = upload_dir.join(storage_filename.as_str());
    tokio::fs::write(&path, &content).await?;

    match StoredFile::create(
        &account,
        filename.as_str(),
        storage_filename.as_str(),
        file_type,
        content.len() as u64,
        upload.description,
        state.connection(),
    )
    .await
    {
        Ok(file) => Ok(Json(file)),
        Err(error) => {
            // no metadata, no file
            if let Err(error) = tokio::fs::remove_file(&path).await {
                warn!(%error, "Could not remove orphaned upload");
            }
            Err(error)
        }
    }
}

async fn list_files(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
) -> Result<Json<Vec<StoredFile>>> {
    Ok(Json(
        record::list_owned::<StoredFile>(state.connection(), account.id()).await?,
    ))
}

async fn download(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let file = record::select_owned::<StoredFile>(state.connection(), account.id(), &file_id(&id)?)
        .await?
        .ok_or_else(not_found)?;

    let content = match tokio::fs::read(state.config().upload_dir().join(file.storage_filename())).await
    {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(error) => return Err(error.into()),
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file.original_filename().replace(['"', '\\'], "_")
    );

    Ok((
        [
            (CONTENT_TYPE, file.file_type().mime().to_owned()),
            (CONTENT_DISPOSITION, disposition),
        ],
        content,
    ))
}

async fn delete_file(
    State(state): State<ApplicationState>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = file_id(&id)?;
    let file = record::select_owned::<StoredFile>(state.connection(), account.id(), &id)
        .await?
        .ok_or_else(not_found)?;

    record::delete_owned(state.connection(), account.id(), &id).await?;
    match tokio::fs::remove_file(state.config().upload_dir().join(file.storage_filename())).await {
        Err(error) if error.kind() != ErrorKind::NotFound => return Err(error.into()),
        _ => {}
    }

    Ok(Json(json!({"message": "File deleted"})))
}

#[cfg(test)]
mod tests {
    use crate::database::definitions::file::{FileType, StoredFile};
    use crate::tests::prelude::*;
    use axum::BoxError;
    use reqwest::multipart::{Form, Part};
    use reqwest::StatusCode;

    fn form(filename: &str, content: &'static [u8]) -> Form {
        Form::new()
            .part("file", Part::bytes(content).file_name(filename.to_owned()))
            .text("description", "meeting notes")
    }

    #[tokio::test]
    async fn test_upload_and_download() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;

        let response = suite
            .post("/upload")
            .multipart(form("notes.txt", b"hello world"))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let file = response.json::<StoredFile>().await?;
        assert_eq!(file.original_filename(), "notes.txt");
        assert_eq!(*file.file_type(), FileType::Txt);
        assert_eq!(*file.file_size(), 11);
        assert_eq!(file.description().as_deref(), Some("meeting notes"));

        let files = suite.get("/files").send().await?.json::<Vec<serde_json::Value>>().await?;
        assert_eq!(files.len(), 1);
        // the storage name stays internal
        assert!(files[0].get("storage_filename").is_none());

        let path = format!("/files/{}", file.id());
        let response = suite.get(&path).send().await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"notes.txt\""
        );
        assert_eq!(response.bytes().await?.as_ref(), b"hello world");

        let response = suite.delete(&path).send().await?;
        assert_eq!(response.status(), StatusCode::OK);
        let response = suite.delete(&path).send().await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = suite.get(&path).send().await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let stored = std::fs::read_dir(suite.upload_dir().path())?.count();
        assert_eq!(stored, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_uploads() -> Result<(), BoxError> {
        let mut suite = TestSuite::init().await?;
        suite.authorize_default().await?;

        let response = suite
            .post("/upload")
            .multipart(form("virus.exe", b"MZ"))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = response.json::<ApplicationErrorResponse>().await?;
        assert!(error.error.contains(".jpg, .jpeg, .png, .pdf, .txt"));

        let response = suite
            .post("/upload")
            .multipart(Form::new().text("description", "no file"))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        Ok(())
    }
}
