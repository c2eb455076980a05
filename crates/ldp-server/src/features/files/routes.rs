//! File routes
//!
//! `POST /upload` streams a multipart body into the object store;
//! `GET /files` and `GET /files/:file_id` read the catalog.

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::api::response::ErrorBody;
use crate::features::FeatureState;

use super::{
    commands::{self, UploadFileCommand, UploadFileError, UploadFileResponse},
    queries::{self, GetFileError, GetFileQuery, ListFilesError, ListFilesQuery},
};

pub fn files_routes() -> Router<FeatureState> {
    Router::new()
        // The per-file limit is enforced while streaming, so the framework's
        // whole-body cap is lifted for this route only.
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/files", get(list_files))
        .route("/files/:file_id", get(get_file))
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_file(
    State(state): State<FeatureState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, FileApiError> {
    let mut multipart = multipart.map_err(|_| UploadFileError::NotMultipart)?;
    let mut uploaded: Option<UploadFileResponse> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadFileError::Multipart(e.to_string()))?
    {
        let is_file_part = field.name() == Some("file");

        if uploaded.is_none() && is_file_part {
            let command = UploadFileCommand {
                original_name: field.file_name().unwrap_or("upload.bin").to_string(),
                content_type: field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string(),
            };

            let response = commands::upload::handle(
                &state.storage,
                &state.catalog,
                &state.config.upload,
                command,
                field,
            )
            .await?;

            uploaded = Some(response);
        } else {
            // One file per request: any further parts are drained unused so
            // the client can finish sending.
            while field
                .chunk()
                .await
                .map_err(|e| UploadFileError::Multipart(e.to_string()))?
                .is_some()
            {}
        }
    }

    let response = uploaded.ok_or(UploadFileError::NoFile)?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "file_id": response.file_id,
            "key": response.key,
            "message": "uploaded",
            "metadata": response.metadata,
        })),
    )
        .into_response())
}

#[tracing::instrument(skip(state))]
async fn get_file(
    State(state): State<FeatureState>,
    Path(file_id): Path<String>,
) -> Result<Response, FileApiError> {
    let record = queries::get_file::handle(&state.catalog, GetFileQuery { file_id }).await?;

    Ok((StatusCode::OK, Json(record)).into_response())
}

#[tracing::instrument(skip(state))]
async fn list_files(
    State(state): State<FeatureState>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Response, FileApiError> {
    let response = queries::list_files::handle(&state.catalog, query).await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

#[derive(Debug)]
enum FileApiError {
    Upload(UploadFileError),
    Get(GetFileError),
    List(ListFilesError),
}

impl From<UploadFileError> for FileApiError {
    fn from(err: UploadFileError) -> Self {
        Self::Upload(err)
    }
}

impl From<GetFileError> for FileApiError {
    fn from(err: GetFileError) -> Self {
        Self::Get(err)
    }
}

impl From<ListFilesError> for FileApiError {
    fn from(err: ListFilesError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for FileApiError {
    fn into_response(self) -> Response {
        match self {
            FileApiError::Upload(err) => match err {
                UploadFileError::NotMultipart
                | UploadFileError::NoFile
                | UploadFileError::DisallowedType(_) => {
                    let body = ErrorBody::with_message("Upload failed", err.to_string());
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                },
                UploadFileError::SizeExceeded(_) => {
                    let body = ErrorBody::with_message("Upload failed", err.to_string());
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
                UploadFileError::Multipart(_) => {
                    tracing::error!("Multipart stream error during upload: {}", err);
                    let body =
                        ErrorBody::with_message("Upload failed", "Failed to read upload stream");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
                UploadFileError::Storage(_) => {
                    tracing::error!("Storage error during upload: {:#}", err);
                    let body =
                        ErrorBody::with_message("Upload failed", "A storage error occurred");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
                UploadFileError::Database(_) => {
                    tracing::error!("Database error during upload: {}", err);
                    let body =
                        ErrorBody::with_message("Upload failed", "A database error occurred");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
            },
            FileApiError::Get(err) => match err {
                GetFileError::InvalidId => {
                    let body = ErrorBody::new(err.to_string());
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                },
                GetFileError::NotFound => {
                    let body = ErrorBody::new("File not found");
                    (StatusCode::NOT_FOUND, Json(body)).into_response()
                },
                GetFileError::Database(_) => {
                    tracing::error!("Database error fetching file: {}", err);
                    let body = ErrorBody::new("Internal server error");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
            },
            FileApiError::List(err) => match err {
                ListFilesError::InvalidStatus => {
                    let body = ErrorBody::with_message("Invalid query", err.to_string());
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                },
                ListFilesError::Database(_) => {
                    tracing::error!("Database error listing files: {}", err);
                    let body = ErrorBody::new("Internal server error");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_structure() {
        let router = files_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
