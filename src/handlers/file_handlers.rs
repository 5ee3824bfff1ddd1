//! File endpoints: multipart upload, listing, search, streaming download
//! and delete.

use super::{folder_handlers::MessageResp, parse_flag, parse_group};
use crate::{
    errors::AppError,
    models::file::File,
    services::file_service::NewFile,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{PathRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::io;
use tokio_util::io::ReaderStream;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    pub folder_id: Option<String>,
    #[serde(default)]
    pub owner_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilesQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub owner_email: String,
}

#[derive(Serialize)]
pub struct FileResp {
    pub message: &'static str,
    pub file: File,
}

/// Multipart fields collected before validation. Fields may arrive in any
/// order; the payload is buffered only when the file part comes before the
/// metadata it is filed under.
#[derive(Default)]
struct UploadForm {
    name: Option<String>,
    folder_id: Option<String>,
    visibility: Option<String>,
    owner_email: Option<String>,
    group_id: Option<String>,
    original_name: Option<String>,
    content_type: Option<String>,
    payload: Option<Bytes>,
}

/// How the `file` part of an upload form was consumed.
enum UploadOutcome {
    /// All metadata preceded the file part, which went straight to storage.
    Stored(File),
    /// The whole form was read with the payload held in memory.
    Buffered(UploadForm),
}

impl UploadForm {
    async fn read(mut multipart: Multipart, state: &AppState) -> Result<UploadOutcome, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(field_name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field_name.as_str() {
                "file" => {
                    form.original_name = field.file_name().map(str::to_owned);
                    form.content_type = field.content_type().map(str::to_owned);
                    if form.metadata_complete() {
                        let upload = form.metadata()?;
                        let body = field.map(|chunk| chunk.map_err(io::Error::other));
                        let file = state.files.upload(upload, body).await?;
                        return Ok(UploadOutcome::Stored(file));
                    }
                    form.payload = Some(field.bytes().await?);
                }
                "name" => form.name = non_blank(field.text().await?),
                "folderId" => form.folder_id = non_blank(field.text().await?),
                "visibility" => form.visibility = non_blank(field.text().await?),
                "ownerEmail" => form.owner_email = non_blank(field.text().await?),
                "groupId" => form.group_id = non_blank(field.text().await?),
                other => debug!("ignoring multipart field `{}`", other),
            }
        }
        Ok(UploadOutcome::Buffered(form))
    }

    /// Every field the upload is filed under, visibility included, has been
    /// seen.
    fn metadata_complete(&self) -> bool {
        self.name.is_some()
            && self.folder_id.is_some()
            && self.visibility.is_some()
            && self.owner_email.is_some()
            && self.group_id.is_some()
    }

    fn into_upload(mut self) -> Result<(NewFile, Bytes), AppError> {
        let payload = self
            .payload
            .take()
            .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
        Ok((self.metadata()?, payload))
    }

    fn metadata(self) -> Result<NewFile, AppError> {
        let (Some(name), Some(folder_id), Some(owner_email), Some(group_id)) =
            (self.name, self.folder_id, self.owner_email, self.group_id)
        else {
            return Err(AppError::bad_request(
                "Missing required fields: name, folderId, ownerEmail, or groupId",
            ));
        };

        let folder_id = folder_id
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::bad_request(format!("invalid folder id `{folder_id}`")))?;

        Ok(NewFile {
            name,
            folder_id,
            visibility: self.visibility.as_deref().is_some_and(parse_flag),
            owner_email,
            group_id: parse_group(&group_id)?,
            original_name: self.original_name,
            content_type: self.content_type,
        })
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// `POST /api/files` (multipart/form-data)
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let file = match UploadForm::read(multipart?, &state).await? {
        UploadOutcome::Stored(file) => file,
        UploadOutcome::Buffered(form) => {
            let (upload, payload) = form.into_upload()?;
            state
                .files
                .upload(upload, stream::iter([Ok::<_, io::Error>(payload)]))
                .await?
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(FileResp {
            message: "File uploaded",
            file,
        }),
    ))
}

/// `GET /api/files?folderId=&ownerEmail=`
pub async fn list_files(
    State(state): State<AppState>,
    query: Result<Query<ListFilesQuery>, QueryRejection>,
) -> Result<Json<Vec<File>>, AppError> {
    let Query(q) = query?;
    let raw = q
        .folder_id
        .ok_or_else(|| AppError::bad_request("folderId is required"))?;
    let folder_id = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("invalid folder id `{raw}`")))?;

    Ok(Json(
        state.files.list_in_folder(folder_id, &q.owner_email).await?,
    ))
}

/// `GET /api/files/search?query=&ownerEmail=`
pub async fn search_files(
    State(state): State<AppState>,
    query: Result<Query<SearchFilesQuery>, QueryRejection>,
) -> Result<Json<Vec<File>>, AppError> {
    let Query(q) = query?;
    Ok(Json(state.files.search(&q.query, &q.owner_email).await?))
}

/// `GET /api/files/download/{id}`: streams the payload under the file's
/// logical name. Not access-checked.
pub async fn download_file(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let (file, handle) = state.files.open(id).await?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(handle)));
    *response.status_mut() = StatusCode::OK;
    set_download_headers(response.headers_mut(), &file);
    Ok(response)
}

/// `DELETE /api/files/{id}`, not restricted to the owner.
pub async fn delete_file(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResp>, AppError> {
    let Path(id) = id?;
    state.files.delete(id).await?;
    Ok(Json(MessageResp {
        message: "File deleted",
    }))
}

fn set_download_headers(headers: &mut HeaderMap, file: &File) {
    let content_type = file
        .content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(file.size_bytes.max(0) as u64),
    );

    if let Ok(value) = HeaderValue::from_str(&content_disposition(&file.name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", file.checksum)) {
        headers.insert(header::ETAG, value);
    }
}

/// `attachment` disposition carrying `name`. Names that are not plain
/// printable ASCII get an ASCII fallback plus an RFC 5987 `filename*`.
fn content_disposition(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\');
    if plain {
        return format!("attachment; filename=\"{}\"", name);
    }

    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(name, NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_keeps_plain_ascii_names() {
        assert_eq!(
            content_disposition("Final Thesis.pdf"),
            "attachment; filename=\"Final Thesis.pdf\""
        );
    }

    #[test]
    fn disposition_encodes_unicode_and_quotes() {
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9%2Epdf"
        );
        assert_eq!(
            content_disposition("my \"final\" thesis.pdf"),
            "attachment; filename=\"my _final_ thesis.pdf\"; \
             filename*=UTF-8''my%20%22final%22%20thesis%2Epdf"
        );
    }

    fn form() -> UploadForm {
        UploadForm {
            name: Some("draft.pdf".into()),
            folder_id: Some("1".into()),
            visibility: Some("true".into()),
            owner_email: Some("b@x.com".into()),
            group_id: Some("1".into()),
            original_name: Some("draft.pdf".into()),
            content_type: Some("application/pdf".into()),
            payload: Some(Bytes::from_static(b"data")),
        }
    }

    #[test]
    fn complete_form_converts_to_upload() {
        let (upload, payload) = form().into_upload().unwrap();
        assert_eq!(upload.folder_id, 1);
        assert_eq!(upload.group_id, 1);
        assert!(upload.visibility);
        assert_eq!(payload, Bytes::from_static(b"data"));
    }

    #[test]
    fn missing_file_or_fields_is_bad_request() {
        let mut no_file = form();
        no_file.payload = None;
        assert_eq!(
            no_file.into_upload().unwrap_err().status,
            StatusCode::BAD_REQUEST
        );

        let mut no_group = form();
        no_group.group_id = None;
        assert_eq!(
            no_group.into_upload().unwrap_err().status,
            StatusCode::BAD_REQUEST
        );

        let mut bad_folder = form();
        bad_folder.folder_id = Some("abc".into());
        assert_eq!(
            bad_folder.into_upload().unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn streaming_waits_for_every_metadata_field() {
        let mut form = form();
        form.payload = None;
        assert!(form.metadata_complete());

        form.visibility = None;
        assert!(!form.metadata_complete());
    }

    #[test]
    fn visibility_defaults_to_private() {
        let mut unset = form();
        unset.visibility = None;
        assert!(!unset.into_upload().unwrap().0.visibility);
    }
}
