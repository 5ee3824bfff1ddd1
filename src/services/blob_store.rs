//! Local-disk blob storage for uploaded file payloads.
//!
//! Blobs are written flat under `base_path` with a name built from the
//! ingestion timestamp, a random token and the sanitized original filename,
//! e.g. `1729240000123-3f2a9c1d-draft.pdf`. Only that stored name is recorded
//! in the database.

use super::{ServiceError, ServiceResult};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Byte budget for the filename part, leaving room for the timestamp and
/// token prefix within the usual 255-byte filename limit.
const MAX_ORIGINAL_NAME_BYTES: usize = 200;
const FALLBACK_NAME: &str = "upload";

/// Result of persisting a blob.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    /// Name of the blob inside the storage directory.
    pub stored_name: String,
    pub size_bytes: i64,
    /// Hex-encoded MD5 of the payload.
    pub checksum: String,
}

#[derive(Clone, Debug)]
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a stored name to its on-disk path, refusing anything that
    /// could escape the storage directory.
    fn blob_path(&self, stored_name: &str) -> ServiceResult<PathBuf> {
        if stored_name.is_empty()
            || stored_name.starts_with('.')
            || stored_name
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(ServiceError::BadRequest(format!(
                "invalid storage path `{stored_name}`"
            )));
        }
        Ok(self.base_path.join(stored_name))
    }

    /// Stream a payload to disk and return its stored name, size and checksum.
    ///
    /// Bytes go to a temporary file first, are fsynced, and are then renamed
    /// into place. The temporary file is removed on any failure.
    pub async fn put_stream<S>(&self, original_name: &str, stream: S) -> ServiceResult<StoredBlob>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        fs::create_dir_all(&self.base_path).await?;

        let stored_name = stored_name_for(original_name);
        let final_path = self.blob_path(&stored_name)?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        let result = write_stream(&tmp_path, stream).await;
        let (size_bytes, checksum) = match result {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ServiceError::Io(err));
            }
        };

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ServiceError::Io(err));
        }

        debug!(stored_name = %stored_name, size_bytes, "stored blob");
        Ok(StoredBlob {
            stored_name,
            size_bytes,
            checksum,
        })
    }

    /// Open a stored blob for reading.
    pub async fn open(&self, stored_name: &str) -> ServiceResult<File> {
        let path = self.blob_path(stored_name)?;
        File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ServiceError::NotFound("File not found on server".into())
            } else {
                ServiceError::Io(err)
            }
        })
    }

    /// Remove a stored blob. Returns `false` if it was already gone.
    pub async fn remove(&self, stored_name: &str) -> ServiceResult<bool> {
        let path = self.blob_path(stored_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("removed blob {}", path.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("blob {} already missing", path.display());
                Ok(false)
            }
            Err(err) => Err(ServiceError::Io(err)),
        }
    }

    pub async fn exists(&self, stored_name: &str) -> bool {
        match self.blob_path(stored_name) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Write, read back and delete a scratch file under the storage directory.
    pub async fn probe(&self) -> Result<(), String> {
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz")
            .await
            .map_err(|e| format!("could not write tmp file: {}", e))?;

        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match read_back {
            Ok(bytes) if bytes == b"readyz" => Ok(()),
            Ok(_) => Err("file content mismatch".to_string()),
            Err(e) => Err(format!("could not read tmp file: {}", e)),
        }
    }
}

async fn write_stream<S>(path: &Path, stream: S) -> io::Result<(i64, String)>
where
    S: Stream<Item = io::Result<Bytes>> + Send,
{
    let mut file = File::create(path).await?;
    let mut size_bytes: i64 = 0;
    let mut digest = Context::new();

    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size_bytes += chunk.len() as i64;
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok((size_bytes, format!("{:x}", digest.compute())))
}

/// Build a collision-resistant stored name for an uploaded file.
fn stored_name_for(original_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        &token[..8],
        sanitize_original_name(original_name)
    )
}

/// Reduce a client-supplied filename to a single safe path component.
fn sanitize_original_name(original_name: &str) -> String {
    let last = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let mut cleaned = String::with_capacity(last.len().min(MAX_ORIGINAL_NAME_BYTES));
    for c in last.chars().filter(|c| !c.is_control()) {
        if cleaned.len() + c.len_utf8() > MAX_ORIGINAL_NAME_BYTES {
            break;
        }
        cleaned.push(c);
    }
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
