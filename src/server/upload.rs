//! 上传文件落盘
//!
//! 文件名为 `{上传时刻毫秒}{原扩展名}`；用 create_new 打开，同名已存在时毫秒数加一再试，
//! 保证不覆盖已有文件。文件写入后不修改、不删除。

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::server::ErrorBody;

/// 上传表单里的文件字段名
pub const FILE_FIELD: &str = "file";

const MAX_EXTENSION_CHARS: usize = 16;
const MAX_NAME_ATTEMPTS: i64 = 16;

/// 已落盘的上传文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub original_name: String,
    pub created_at: DateTime<Utc>,
}

/// 上传失败；都在进入流水线之前发生
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("no file field in request")]
    NoFile,

    #[error("more than one file field in request")]
    MultipleFiles,

    #[error("malformed multipart body: {message}")]
    Multipart { status: StatusCode, message: String },

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        UploadError::Multipart {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            UploadError::NoFile => (StatusCode::BAD_REQUEST, "No file received."),
            UploadError::MultipleFiles => (StatusCode::BAD_REQUEST, "Only one file may be uploaded."),
            UploadError::Multipart { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "File too large.")
            }
            UploadError::Multipart { .. } => (StatusCode::BAD_REQUEST, "No file received."),
            UploadError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload."),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// 原文件名的扩展名（含点）；只保留 ASCII 字母数字，过长或为空时返回空串
pub fn sanitize_extension(original_name: &str) -> String {
    let Some(ext) = Path::new(original_name).extension().and_then(|e| e.to_str()) else {
        return String::new();
    };
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_CHARS
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return String::new();
    }
    format!(".{}", ext)
}

pub fn upload_file_name(millis: i64, extension: &str) -> String {
    format!("{}{}", millis, extension)
}

/// 读取 multipart：恰好一个 file 字段，其余字段忽略
pub async fn receive_upload(
    upload_dir: &Path,
    mut multipart: Multipart,
) -> Result<UploadedFile, UploadError> {
    let mut stored: Option<UploadedFile> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if let Some(existing) = &stored {
            tracing::warn!(kept = %existing.path.display(), "rejecting second file field");
            return Err(UploadError::MultipleFiles);
        }
        stored = Some(store_field(upload_dir, field).await?);
    }
    stored.ok_or(UploadError::NoFile)
}

async fn store_field(upload_dir: &Path, mut field: Field<'_>) -> Result<UploadedFile, UploadError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let extension = sanitize_extension(&original_name);
    let created_at = Utc::now();
    let (path, mut file) = create_unique(upload_dir, created_at.timestamp_millis(), &extension).await?;

    let mut bytes = 0usize;
    while let Some(chunk) = field.chunk().await? {
        bytes += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    tracing::info!(path = %path.display(), original = %original_name, bytes, "upload stored");

    Ok(UploadedFile {
        path,
        original_name,
        created_at,
    })
}

/// 以 millis 为起点找一个未被占用的文件名并独占创建
async fn create_unique(
    dir: &Path,
    millis: i64,
    extension: &str,
) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let mut last_err = None;
    for offset in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(upload_file_name(millis + offset, extension));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::other("no free upload name")))
}
