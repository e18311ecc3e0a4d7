//! Search form endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{parse_category, success, ApiResult};
use crate::models::CategoryTable;
use crate::search::SearchFormView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryRequest {
    #[serde(default)]
    pub sub_category: String,
}

/// Absent fields are left untouched; empty strings unset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatesRequest {
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
}

/// GET /api/categories - The category table.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<CategoryTable> {
    success(state.categories.as_ref().clone())
}

/// GET /api/search - Current search form state.
pub async fn get_search(State(state): State<AppState>) -> ApiResult<SearchFormView> {
    success(state.search.lock().await.view())
}

/// POST /api/search - Submit the search.
///
/// The form is unlocked while the remote call runs, so the view (with
/// `loading` set) and the tag input stay usable. A submit that arrives
/// while a search is running is ignored.
pub async fn submit_search(State(state): State<AppState>) -> ApiResult<SearchFormView> {
    let mut search = state.search.lock().await;
    let started = search.begin_search();
    drop(search);

    let outcome = match started {
        Ok(pending) => {
            let reply = pending.run().await;
            state.search.lock().await.finish_search(reply)
        }
        Err(outcome) => outcome,
    };
    tracing::debug!(?outcome, "Search submitted");

    success(state.search.lock().await.view())
}

/// DELETE /api/search - Reset criteria and results.
pub async fn clear_search(State(state): State<AppState>) -> ApiResult<SearchFormView> {
    let mut search = state.search.lock().await;
    search.clear_search();
    success(search.view())
}

/// PUT /api/search/category - Set or unset the category.
pub async fn set_search_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryRequest>,
) -> ApiResult<SearchFormView> {
    let category = parse_category(request.category.as_deref())?;
    let mut search = state.search.lock().await;
    search.set_category(category);
    success(search.view())
}

/// PUT /api/search/sub-category - Set or unset the sub-category.
pub async fn set_search_sub_category(
    State(state): State<AppState>,
    Json(request): Json<SubCategoryRequest>,
) -> ApiResult<SearchFormView> {
    let mut search = state.search.lock().await;
    search.set_sub_category(&request.sub_category)?;
    success(search.view())
}

/// PUT /api/search/dates - Set the date range (YYYY-MM-DD).
pub async fn set_search_dates(
    State(state): State<AppState>,
    Json(request): Json<DatesRequest>,
) -> ApiResult<SearchFormView> {
    let mut search = state.search.lock().await;
    if let Some(from) = request.from_date.as_deref() {
        search.set_from_date(from)?;
    }
    if let Some(to) = request.to_date.as_deref() {
        search.set_to_date(to)?;
    }
    success(search.view())
}
