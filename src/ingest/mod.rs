// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File ingestion: turns raw user selections into uploaded files
//!
//! Every selection is read fully into memory and encoded for the reasoning
//! service. Text formats stay as text, binary formats become base64. A
//! selection that cannot be read is reported on its own and never stops the
//! rest of the batch.

pub mod document;
pub mod image;
pub mod tabular;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::IngestionConfig;
use crate::{CityPulseError, Result};

/// Closed set of file kinds the workspace accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Tabular,
    Image,
    Document,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Tabular => "tabular",
            FileKind::Image => "image",
            FileKind::Document => "document",
        }
    }
}

/// How `UploadedFile::content` is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Text,
    Base64,
}

/// A file held in the session, ready to be sent for analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub kind: FileKind,
    pub encoding: ContentEncoding,
    pub content: String,
    pub media_type: String,
    pub size_bytes: usize,
    pub added_at: DateTime<Utc>,
}

/// Where the bytes of a selection come from
#[derive(Debug, Clone)]
pub enum SelectionSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A file the user picked, before it has been read
#[derive(Debug, Clone)]
pub struct RawSelection {
    pub name: String,
    pub source: SelectionSource,
    pub media_type: Option<String>,
}

impl RawSelection {
    /// Selection backed by a file on disk
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();

        Self {
            name,
            source: SelectionSource::Path(path.to_path_buf()),
            media_type: None,
        }
    }

    /// Selection whose bytes were already received (web upload)
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, media_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            source: SelectionSource::Bytes(bytes),
            media_type,
        }
    }
}

/// Content after kind-specific encoding
#[derive(Debug)]
pub struct Encoded {
    pub encoding: ContentEncoding,
    pub content: String,
    pub media_type: String,
}

/// A selection that could not be ingested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of ingesting a batch of selections
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub files: Vec<UploadedFile>,
    pub failures: Vec<IngestFailure>,
}

/// Ingest a batch of selections, collecting per-file failures
pub fn add_files(selections: Vec<RawSelection>, config: &IngestionConfig) -> IngestReport {
    let mut report = IngestReport::default();

    for selection in selections {
        let name = selection.name.clone();
        match ingest_one(selection, config) {
            Ok(file) => {
                info!("Ingested {} as {} ({})", file.name, file.kind.label(), file.media_type);
                report.files.push(file);
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                let reason = match e {
                    CityPulseError::FileRead { reason, .. } => reason,
                    other => other.to_string(),
                };
                report.failures.push(IngestFailure { name, reason });
            }
        }
    }

    report
}

/// Read and encode a single selection
pub fn ingest_one(selection: RawSelection, config: &IngestionConfig) -> Result<UploadedFile> {
    let RawSelection { name, source, media_type } = selection;

    let (kind, media_type) = classify(&name, media_type.as_deref()).ok_or_else(|| {
        CityPulseError::FileRead {
            name: name.clone(),
            reason: "unsupported file type".to_string(),
        }
    })?;

    let bytes = match source {
        SelectionSource::Bytes(bytes) => bytes,
        SelectionSource::Path(path) => std::fs::read(&path).map_err(|e| CityPulseError::FileRead {
            name: name.clone(),
            reason: e.to_string(),
        })?,
    };
    let size_bytes = bytes.len();
    debug!("Read {} bytes from {}", size_bytes, name);

    let encoded = match kind {
        FileKind::Tabular => tabular::encode(&media_type, bytes, config.spreadsheet_rows),
        FileKind::Image => image::encode(&media_type, bytes),
        FileKind::Document => document::encode(&media_type, bytes),
    }
    .map_err(|reason| CityPulseError::FileRead { name: name.clone(), reason })?;

    Ok(UploadedFile {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        kind,
        encoding: encoded.encoding,
        content: encoded.content,
        media_type: encoded.media_type,
        size_bytes,
        added_at: Utc::now(),
    })
}

/// Work out the kind and media type of a selection
///
/// Plain-text extensions always decide, since browsers often label `.csv`
/// as `application/vnd.ms-excel`. Otherwise a specific declared media type
/// wins and the extension is the fallback.
pub fn classify(name: &str, declared: Option<&str>) -> Option<(FileKind, String)> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    if let Some(ext) = ext.as_deref().filter(|e| TEXT_EXTENSIONS.contains(e)) {
        let media_type = media_type_for_extension(ext)?;
        return kind_for_media_type(media_type).map(|kind| (kind, media_type.to_string()));
    }

    if let Some(declared) = declared.map(normalize_media_type) {
        if !declared.is_empty() && declared != "application/octet-stream" {
            if let Some(kind) = kind_for_media_type(&declared) {
                return Some((kind, declared));
            }
        }
    }

    let media_type = media_type_for_extension(&ext?)?;
    let kind = kind_for_media_type(media_type)?;
    Some((kind, media_type.to_string()))
}

const TEXT_EXTENSIONS: &[&str] = &["csv", "tsv", "txt", "md", "markdown"];

fn normalize_media_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_lowercase()
}

fn kind_for_media_type(media_type: &str) -> Option<FileKind> {
    if media_type.starts_with("image/") {
        return Some(FileKind::Image);
    }
    if tabular::MEDIA_TYPES.contains(&media_type) {
        return Some(FileKind::Tabular);
    }
    if document::MEDIA_TYPES.contains(&media_type) {
        return Some(FileKind::Document);
    }
    None
}

fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        _ => return None,
    })
}

/// Decode bytes that must be UTF-8 text
pub(crate) fn utf8_text(bytes: Vec<u8>) -> std::result::Result<String, String> {
    String::from_utf8(bytes).map_err(|_| "file is not valid UTF-8 text".to_string())
}
