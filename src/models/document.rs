//! Document records and the search / upload payloads sent to the remote service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::TagRef;
use crate::errors::AppError;

/// Date format produced by date pickers.
pub const PICKER_DATE_FORMAT: &str = "%Y-%m-%d";
/// Date format expected on the wire.
pub const WIRE_DATE_FORMAT: &str = "%d-%m-%Y";

/// Fixed first page requested by every search.
pub const SEARCH_START: u32 = 0;
pub const SEARCH_PAGE_SIZE: u32 = 10;

/// Format an optional date for the wire; unset dates become an empty string.
pub fn wire_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(WIRE_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a picker date; blank input means "unset".
pub fn parse_picker_date(text: &str) -> Result<Option<NaiveDate>, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, PICKER_DATE_FORMAT)
        .map(Some)
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", text)))
}

/// Full-text filter block of a search payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub value: String,
}

/// Body of a remote document search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub major_head: String,
    pub minor_head: String,
    pub from_date: String,
    pub to_date: String,
    pub tags: Vec<TagRef>,
    pub uploaded_by: String,
    pub start: u32,
    pub length: u32,
    #[serde(rename = "filterId")]
    pub filter_id: String,
    pub search: SearchFilter,
}

/// Reduced answer of a remote search.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// Transport-level success (2xx)
    pub ok: bool,
    /// Application-level success flag reported by the service
    pub status: bool,
    pub data: Vec<DocumentRecord>,
    pub message: Option<String>,
    pub records_filtered: u64,
}

/// Metadata part of an upload request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub major_head: String,
    pub minor_head: String,
    pub document_date: String,
    pub document_remarks: String,
    pub tags: Vec<TagRef>,
    pub user_id: String,
}

/// File contents attached to an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Only images and PDFs are accepted for upload.
    pub fn is_supported(&self) -> bool {
        self.content_type.starts_with("image/") || self.content_type == "application/pdf"
    }
}

/// Reduced answer of a remote upload.
#[derive(Debug, Clone, Default)]
pub struct UploadResponse {
    pub ok: bool,
    pub message: Option<String>,
}

/// How a stored document can be previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Image,
    Pdf,
    Other,
}

/// A document as returned by the remote search.
///
/// Known fields are typed; everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_head: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_head: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentRecord {
    /// Last path segment of the file URL, ignoring query and fragment.
    pub fn file_name(&self) -> Option<&str> {
        let url = self.file_url.as_deref()?;
        let path = url.split(|c| c == '?' || c == '#').next()?;
        let name = path.rsplit('/').next()?;
        (!name.is_empty()).then_some(name)
    }

    /// Lowercased extension of the file name.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_lowercase())
    }

    /// MIME type a previewer should assume for this file.
    pub fn content_type(&self) -> String {
        match self.extension().as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg".to_string(),
            Some(ext @ ("png" | "gif" | "bmp" | "webp")) => format!("image/{}", ext),
            Some("pdf") => "application/pdf".to_string(),
            _ => "application/octet-stream".to_string(),
        }
    }

    pub fn preview_kind(&self) -> PreviewKind {
        let content_type = self.content_type();
        if content_type.starts_with("image/") {
            PreviewKind::Image
        } else if content_type == "application/pdf" {
            PreviewKind::Pdf
        } else {
            PreviewKind::Other
        }
    }
}
