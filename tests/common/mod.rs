use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use research_nexus::{db, state::AppState};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{path::PathBuf, sync::Arc};
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "nexus-test-boundary";
const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

pub struct TestApp {
    router: Router,
    storage: TempDir,
}

/// A multipart file part: (filename, content type, bytes).
pub type FilePart<'a> = (&'a str, &'a str, &'a [u8]);

impl TestApp {
    pub async fn new() -> Result<Self> {
        let storage = TempDir::new()?;
        let pool = db::connect("sqlite::memory:").await?;
        db::run_migrations(&pool).await?;

        let state = AppState::new(Arc::new(pool), storage.path().join("uploads"));
        let router = research_nexus::app(state, MAX_UPLOAD_BYTES);

        Ok(Self { router, storage })
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.storage.path().join("uploads")
    }

    pub fn stored_blob_count(&self) -> Result<usize> {
        let dir = self.upload_dir();
        if !dir.exists() {
            return Ok(0);
        }
        Ok(std::fs::read_dir(dir)?.count())
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    pub async fn get(&self, uri: &str) -> Result<Response<Body>> {
        self.send(Request::builder().uri(uri).body(Body::empty())?)
            .await
    }

    pub async fn delete(&self, uri: &str) -> Result<Response<Body>> {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())?,
        )
        .await
    }

    pub async fn post_json<T: Serialize>(&self, uri: &str, body: &T) -> Result<Response<Body>> {
        self.json_request(Method::POST, uri, body).await
    }

    pub async fn put_json<T: Serialize>(&self, uri: &str, body: &T) -> Result<Response<Body>> {
        self.json_request(Method::PUT, uri, body).await
    }

    async fn json_request<T: Serialize>(
        &self,
        method: Method,
        uri: &str,
        body: &T,
    ) -> Result<Response<Body>> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?;
        self.send(request).await
    }

    /// Multipart upload with the text fields ahead of the file part.
    pub async fn upload(
        &self,
        fields: &[(&str, &str)],
        file: Option<FilePart<'_>>,
    ) -> Result<Response<Body>> {
        self.send_multipart(multipart_body(fields, file, false)).await
    }

    /// Multipart upload with the file part sent first.
    pub async fn upload_file_first(
        &self,
        fields: &[(&str, &str)],
        file: FilePart<'_>,
    ) -> Result<Response<Body>> {
        self.send_multipart(multipart_body(fields, Some(file), true))
            .await
    }

    async fn send_multipart(&self, body: Vec<u8>) -> Result<Response<Body>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/files")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))?;
        self.send(request).await
    }

    pub async fn register_supervisor(&self, email: &str, groups: &[i64]) -> Result<()> {
        let resp = self
            .post_json(
                "/api/auth/register/supervisor",
                &json!({
                    "name": "Supervisor",
                    "interest": "research",
                    "email": email,
                    "groups": groups,
                }),
            )
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::CREATED, "supervisor registration failed");
        Ok(())
    }

    pub async fn register_student(&self, email: &str, group_id: i64) -> Result<()> {
        let resp = self
            .post_json(
                "/api/auth/register/student",
                &json!({
                    "name": "Student",
                    "supervisorRef": "Supervisor",
                    "email": email,
                    "groupId": group_id,
                }),
            )
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::CREATED, "student registration failed");
        Ok(())
    }

    pub async fn create_folder(
        &self,
        name: &str,
        visibility: bool,
        owner: &str,
        group_id: i64,
    ) -> Result<Response<Body>> {
        self.post_json(
            "/api/folders",
            &json!({
                "name": name,
                "visibility": visibility,
                "ownerEmail": owner,
                "groupId": group_id,
            }),
        )
        .await
    }
}

fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
    file_first: bool,
) -> Vec<u8> {
    let mut body = Vec::new();
    if file_first {
        push_file_part(&mut body, file);
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if !file_first {
        push_file_part(&mut body, file);
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn push_file_part(body: &mut Vec<u8>, file: Option<FilePart<'_>>) {
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    Ok(body.collect().await?.to_bytes().to_vec())
}

pub async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> Result<T> {
    let bytes = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Ids of a JSON array of records.
pub fn ids(records: &Value) -> Vec<i64> {
    records
        .as_array()
        .map(|items| items.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default()
}
