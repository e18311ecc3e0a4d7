//! Document upload form.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{
    parse_picker_date, wire_date, Category, CategoryTable, FormMessage, SelectedTags,
    UploadFile, UploadPayload, NETWORK_ERROR_MESSAGE,
};
use crate::remote::DocumentApi;
use crate::session::Session;
use crate::tags::{TagInputView, TagSelector};

pub const AUTH_REQUIRED_MESSAGE: &str =
    "Authentication required. Please log in to upload documents.";
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill all required fields and select a file.";
pub const UNSUPPORTED_FILE_MESSAGE: &str = "Only Image and PDF files are allowed.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload document. Please try again.";

/// Summary of the attached file, without its contents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    pub name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFormView {
    pub document_date: Option<NaiveDate>,
    pub category: Option<Category>,
    pub sub_category: Option<String>,
    pub sub_category_options: Vec<String>,
    pub remarks: String,
    pub file: Option<AttachedFile>,
    pub tags: TagInputView,
    pub message: Option<FormMessage>,
    pub loading: bool,
}

pub struct UploadForm {
    api: Arc<dyn DocumentApi>,
    session: Session,
    categories: Arc<CategoryTable>,
    document_date: Option<NaiveDate>,
    category: Option<Category>,
    sub_category: Option<String>,
    remarks: String,
    file: Option<UploadFile>,
    selected: SelectedTags,
    tags: TagSelector,
    message: Option<FormMessage>,
    loading: bool,
}

impl UploadForm {
    pub fn new(api: Arc<dyn DocumentApi>, session: Session, categories: Arc<CategoryTable>) -> Self {
        let selected = SelectedTags::new();
        let tags = TagSelector::new(api.clone(), session.clone(), selected.clone());
        Self {
            api,
            session,
            categories,
            document_date: None,
            category: None,
            sub_category: None,
            remarks: String::new(),
            file: None,
            selected,
            tags,
            message: None,
            loading: false,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.tags = self.tags.with_debounce(debounce);
        self
    }

    pub fn tags(&self) -> &TagSelector {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagSelector {
        &mut self.tags
    }

    pub fn set_document_date(&mut self, text: &str) -> Result<(), AppError> {
        self.document_date = parse_picker_date(text)?;
        Ok(())
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
        self.sub_category = None;
    }

    pub fn set_sub_category(&mut self, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        if value.is_empty() {
            self.sub_category = None;
            return Ok(());
        }
        match self.category {
            Some(category) if self.categories.contains(category, value) => {
                self.sub_category = Some(value.to_string());
                Ok(())
            }
            Some(category) => Err(AppError::Validation(format!(
                "'{}' is not a sub-category of {}",
                value,
                category.as_str()
            ))),
            None => Err(AppError::Validation(
                "Select a category before a sub-category".to_string(),
            )),
        }
    }

    pub fn set_remarks(&mut self, remarks: impl Into<String>) {
        self.remarks = remarks.into();
    }

    /// Attach a file. Unsupported types detach whatever was attached.
    pub fn set_file(&mut self, file: UploadFile) -> Result<(), AppError> {
        if !file.is_supported() {
            tracing::debug!(content_type = %file.content_type, "Rejected upload file type");
            self.file = None;
            return Err(AppError::Validation(UNSUPPORTED_FILE_MESSAGE.to_string()));
        }
        self.file = Some(file);
        Ok(())
    }

    /// Validate, upload, and reset the form on success.
    pub async fn submit(&mut self) -> bool {
        self.message = None;

        let Some(credentials) = self.session.credentials() else {
            self.message = Some(FormMessage::error(AUTH_REQUIRED_MESSAGE));
            return false;
        };

        let (Some(file), Some(date), Some(category), Some(sub_category)) = (
            self.file.as_ref(),
            self.document_date,
            self.category,
            self.sub_category.as_ref(),
        ) else {
            self.message = Some(FormMessage::error(MISSING_FIELDS_MESSAGE));
            return false;
        };

        let payload = UploadPayload {
            major_head: category.as_str().to_string(),
            minor_head: sub_category.clone(),
            document_date: wire_date(Some(date)),
            document_remarks: self.remarks.clone(),
            tags: self.selected.to_refs(),
            user_id: credentials.user_id.clone(),
        };
        let file_name = file.name.clone();

        self.loading = true;
        let result = self
            .api
            .save_document(file, &payload, &credentials.token)
            .await;
        self.loading = false;

        match result {
            Ok(response) if response.ok => {
                tracing::info!(file = %file_name, "Document uploaded");
                let server_message = response.message.unwrap_or_default();
                self.reset();
                self.message = Some(FormMessage::success(format!(
                    "Successfully uploaded file: {}. {}",
                    file_name, server_message
                )));
                true
            }
            Ok(response) => {
                tracing::warn!(message = ?response.message, "Upload rejected by server");
                let text = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string());
                self.message = Some(FormMessage::error(text));
                false
            }
            Err(e) => {
                tracing::warn!("Upload failed: {}", e);
                let text = if e.is_transport() {
                    NETWORK_ERROR_MESSAGE.to_string()
                } else {
                    e.remote_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string())
                };
                self.message = Some(FormMessage::error(text));
                false
            }
        }
    }

    /// Clear every field, the tags and the message.
    pub fn reset(&mut self) {
        self.document_date = None;
        self.category = None;
        self.sub_category = None;
        self.remarks.clear();
        self.file = None;
        self.selected.clear();
        self.tags.reset();
        self.message = None;
    }

    pub fn view(&self) -> UploadFormView {
        UploadFormView {
            document_date: self.document_date,
            category: self.category,
            sub_category: self.sub_category.clone(),
            sub_category_options: self
                .category
                .map(|c| self.categories.sub_categories(c).to_vec())
                .unwrap_or_default(),
            remarks: self.remarks.clone(),
            file: self.file.as_ref().map(|f| AttachedFile {
                name: f.name.clone(),
                content_type: f.content_type.clone(),
                size: f.bytes.len(),
            }),
            tags: self.tags.view(),
            message: self.message.clone(),
            loading: self.loading,
        }
    }
}
