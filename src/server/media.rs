//! Song media uploads and serving.
//!
//! Uploaded files are stored under the media base path with uuid-v4 names,
//! keeping the original extension. The stored relative uri goes into the
//! song row; serving reads the file back and sniffs the content type.

use super::error::{ApiError, ApiResult};
use crate::validation::MSG_REQUIRED;
use anyhow::{Context, Result};
use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::Path;
use uuid::Uuid;

pub const SONG_AUDIO_DIR: &str = "song_audio";
pub const SONG_IMAGES_DIR: &str = "song_images";

pub const AUDIO_EXTENSION_ALLOWLIST: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "aac"];

pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct SongUpload {
    pub name: Option<String>,
    pub audio: UploadedFile,
    pub image: Option<UploadedFile>,
}

fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn audio_extension_error(file_name: &str) -> ApiError {
    let extension = extension_of(file_name).unwrap_or_default();
    ApiError::field(
        "audio",
        &format!(
            "File extension \u{201c}{}\u{201d} is not allowed. Allowed extensions are: {}.",
            extension,
            AUDIO_EXTENSION_ALLOWLIST.join(", ")
        ),
    )
}

/// Reads the `name`, `audio` and `image` fields of a song-creation form.
/// The audio file is required and must carry an allowed extension.
pub async fn parse_song_upload(mut multipart: Multipart) -> ApiResult<SongUpload> {
    let mut name: Option<String> = None;
    let mut audio: Option<UploadedFile> = None;
    let mut image: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::NonField(e.to_string()))?
    {
        match field.name() {
            Some("name") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::NonField(e.to_string()))?;
                if !value.is_empty() {
                    name = Some(value);
                }
            }
            Some("audio") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::NonField(e.to_string()))?;
                audio = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::NonField(e.to_string()))?;
                if !bytes.is_empty() {
                    image = Some(UploadedFile {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let audio = match audio {
        Some(audio) if !audio.bytes.is_empty() => audio,
        _ => return Err(ApiError::field("audio", MSG_REQUIRED)),
    };

    match extension_of(&audio.file_name) {
        Some(ext) if AUDIO_EXTENSION_ALLOWLIST.contains(&ext.as_str()) => {}
        _ => return Err(audio_extension_error(&audio.file_name)),
    }

    Ok(SongUpload { name, audio, image })
}

/// Writes the file under `<media_path>/<subdir>/` with a fresh uuid name and
/// returns the relative uri stored on the song row.
pub fn store_media_file(
    media_path: &Path,
    subdir: &str,
    original_file_name: &str,
    bytes: &[u8],
) -> Result<String> {
    let mut stored_name = Uuid::new_v4().to_string();
    if let Some(ext) = extension_of(original_file_name) {
        stored_name.push('.');
        stored_name.push_str(&ext);
    }

    let dir = media_path.join(subdir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create media dir {}", dir.display()))?;
    let path = dir.join(&stored_name);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write media file {}", path.display()))?;

    Ok(format!("{}/{}", subdir, stored_name))
}

/// Best-effort removal of a stored file whose song row never landed.
/// Missing files are ignored.
pub fn discard_media_file(media_path: &Path, uri: &str) {
    let _ = std::fs::remove_file(media_path.join(uri));
}

/// Streams a stored media file back, sniffing the content type from the
/// leading bytes.
pub fn serve_media_file(media_path: &Path, uri: &str) -> Response {
    let path = media_path.join(uri);
    if !path.exists() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let buffer = match std::fs::read(&path) {
        Ok(buffer) => buffer,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let content_type = infer::get(&buffer)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(buffer.into())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
