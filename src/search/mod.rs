//! Document search form.
//!
//! Holds the search criteria, builds the remote payload, and reduces the
//! remote answer into a result list plus a banner message. Failures never
//! escape `submit_search`; they end up in the form state instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{
    parse_picker_date, wire_date, Category, CategoryTable, DocumentRecord, FormMessage,
    PreviewKind, SearchFilter, SearchPayload, SearchResponse, SelectedTags, NETWORK_ERROR_MESSAGE,
    SEARCH_PAGE_SIZE, SEARCH_START,
};
use crate::remote::DocumentApi;
use crate::session::Session;
use crate::tags::{TagInputView, TagSelector};

pub const AUTH_REQUIRED_MESSAGE: &str =
    "Authentication required. Please log in to search documents.";
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to search documents. Please try again.";

/// Search criteria as entered in the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub category: Option<Category>,
    pub sub_category: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results replaced; carries the filtered record count.
    Found(u64),
    AuthenticationRequired,
    /// A search on this form is still running; nothing was sent.
    InProgress,
    /// The form was cleared while the search ran; the answer was dropped.
    Discarded,
    Failed,
}

/// A search result with the preview details a renderer needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultView {
    #[serde(flatten)]
    pub record: DocumentRecord,
    pub file_name: Option<String>,
    pub content_type: String,
    pub preview_kind: PreviewKind,
}

impl From<&DocumentRecord> for SearchResultView {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            file_name: record.file_name().map(str::to_string),
            content_type: record.content_type(),
            preview_kind: record.preview_kind(),
            record: record.clone(),
        }
    }
}

/// A started search, detached from the form so the form can be released
/// while the remote call is in flight.
pub struct PendingSearch {
    api: Arc<dyn DocumentApi>,
    payload: SearchPayload,
    token: String,
    generation: u64,
}

impl PendingSearch {
    pub async fn run(self) -> SearchReply {
        let result = self.api.search_documents(&self.payload, &self.token).await;
        SearchReply {
            generation: self.generation,
            result,
        }
    }
}

/// Remote answer to a [`PendingSearch`], tagged with the form state it was
/// issued against.
pub struct SearchReply {
    generation: u64,
    result: Result<SearchResponse, AppError>,
}

/// Serializable view of the search form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFormView {
    pub criteria: SearchCriteria,
    pub sub_category_options: Vec<String>,
    pub tags: TagInputView,
    pub message: Option<FormMessage>,
    pub results: Vec<SearchResultView>,
    pub loading: bool,
}

pub struct SearchForm {
    api: Arc<dyn DocumentApi>,
    session: Session,
    categories: Arc<CategoryTable>,
    criteria: SearchCriteria,
    selected: SelectedTags,
    tags: TagSelector,
    message: Option<FormMessage>,
    results: Vec<DocumentRecord>,
    loading: bool,
    /// Bumped on clear; replies from an older generation are dropped
    generation: u64,
}

impl SearchForm {
    pub fn new(api: Arc<dyn DocumentApi>, session: Session, categories: Arc<CategoryTable>) -> Self {
        let selected = SelectedTags::new();
        let tags = TagSelector::new(api.clone(), session.clone(), selected.clone());
        Self {
            api,
            session,
            categories,
            criteria: SearchCriteria::default(),
            selected,
            tags,
            message: None,
            results: Vec::new(),
            loading: false,
            generation: 0,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.tags = self.tags.with_debounce(debounce);
        self
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn tags(&self) -> &TagSelector {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagSelector {
        &mut self.tags
    }

    /// Set or unset the category. Always clears the sub-category.
    pub fn set_category(&mut self, category: Option<Category>) {
        self.criteria.category = category;
        self.criteria.sub_category = None;
    }

    /// Set the sub-category; blank unsets it.
    pub fn set_sub_category(&mut self, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        if value.is_empty() {
            self.criteria.sub_category = None;
            return Ok(());
        }

        let Some(category) = self.criteria.category else {
            return Err(AppError::Validation(
                "Select a category before a sub-category".to_string(),
            ));
        };
        if !self.categories.contains(category, value) {
            return Err(AppError::Validation(format!(
                "'{}' is not a sub-category of {}",
                value,
                category.as_str()
            )));
        }

        self.criteria.sub_category = Some(value.to_string());
        Ok(())
    }

    /// Sub-categories selectable under the current category.
    pub fn sub_category_options(&self) -> &[String] {
        match self.criteria.category {
            Some(category) => self.categories.sub_categories(category),
            None => &[],
        }
    }

    pub fn set_from_date(&mut self, text: &str) -> Result<(), AppError> {
        self.criteria.from_date = parse_picker_date(text)?;
        Ok(())
    }

    pub fn set_to_date(&mut self, text: &str) -> Result<(), AppError> {
        self.criteria.to_date = parse_picker_date(text)?;
        Ok(())
    }

    /// Wire payload for the current criteria on behalf of `user_id`.
    pub fn payload(&self, user_id: &str) -> SearchPayload {
        SearchPayload {
            major_head: self
                .criteria
                .category
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
            minor_head: self.criteria.sub_category.clone().unwrap_or_default(),
            from_date: wire_date(self.criteria.from_date),
            to_date: wire_date(self.criteria.to_date),
            tags: self.selected.to_refs(),
            uploaded_by: user_id.to_string(),
            start: SEARCH_START,
            length: SEARCH_PAGE_SIZE,
            filter_id: String::new(),
            search: SearchFilter::default(),
        }
    }

    /// Check the session, build the payload and mark the form loading.
    ///
    /// The returned search borrows nothing from the form; its reply goes
    /// back through [`SearchForm::finish_search`]. A form that is already
    /// loading refuses with [`SearchOutcome::InProgress`].
    pub fn begin_search(&mut self) -> Result<PendingSearch, SearchOutcome> {
        if self.loading {
            tracing::debug!("Search already in progress");
            return Err(SearchOutcome::InProgress);
        }

        self.message = None;

        let Some(credentials) = self.session.credentials() else {
            tracing::info!("Search attempted without a session");
            self.message = Some(FormMessage::error(AUTH_REQUIRED_MESSAGE));
            return Err(SearchOutcome::AuthenticationRequired);
        };

        let payload = self.payload(&credentials.user_id);
        self.loading = true;

        Ok(PendingSearch {
            api: self.api.clone(),
            payload,
            token: credentials.token,
            generation: self.generation,
        })
    }

    /// Fold a finished search into the form state.
    pub fn finish_search(&mut self, reply: SearchReply) -> SearchOutcome {
        if reply.generation != self.generation {
            tracing::debug!("Dropping search answer for a cleared form");
            return SearchOutcome::Discarded;
        }
        self.loading = false;
        self.reduce(reply.result)
    }

    /// Run the search and fold the answer into the form state.
    pub async fn submit_search(&mut self) -> SearchOutcome {
        match self.begin_search() {
            Ok(pending) => {
                let reply = pending.run().await;
                self.finish_search(reply)
            }
            Err(outcome) => outcome,
        }
    }

    fn reduce(&mut self, result: Result<SearchResponse, AppError>) -> SearchOutcome {
        match result {
            Ok(response) if response.ok && response.status => {
                tracing::info!(
                    returned = response.data.len(),
                    filtered = response.records_filtered,
                    "Search succeeded"
                );
                self.results = response.data;
                self.message = Some(FormMessage::success(format!(
                    "Found {} documents.",
                    response.records_filtered
                )));
                SearchOutcome::Found(response.records_filtered)
            }
            Ok(response) => {
                tracing::warn!(message = ?response.message, "Search rejected by server");
                let text = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| SEARCH_FAILED_MESSAGE.to_string());
                self.fail(text)
            }
            Err(e) if e.is_transport() => {
                tracing::warn!("Search failed: {}", e);
                self.fail(NETWORK_ERROR_MESSAGE.to_string())
            }
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                let text = e
                    .remote_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| SEARCH_FAILED_MESSAGE.to_string());
                self.fail(text)
            }
        }
    }

    fn fail(&mut self, text: String) -> SearchOutcome {
        self.results.clear();
        self.message = Some(FormMessage::error(text));
        SearchOutcome::Failed
    }

    /// Reset every criterion, the tags, the message and the results.
    pub fn clear_search(&mut self) {
        self.criteria = SearchCriteria::default();
        self.selected.clear();
        self.tags.reset();
        self.message = None;
        self.results.clear();
        self.loading = false;
        self.generation += 1;
    }

    pub fn view(&self) -> SearchFormView {
        SearchFormView {
            criteria: self.criteria.clone(),
            sub_category_options: self.sub_category_options().to_vec(),
            tags: self.tags.view(),
            message: self.message.clone(),
            results: self.results.iter().map(SearchResultView::from).collect(),
            loading: self.loading,
        }
    }
}
