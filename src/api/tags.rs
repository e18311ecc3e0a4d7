//! Tag input endpoints, shared by the search and upload forms.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::tags::{Key, TagInputView, TagSelector};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    pub prevent_default: bool,
    pub tags: TagInputView,
}

/// Run `op` against the tag selector of the named form.
async fn with_tags<R>(
    state: &AppState,
    form: &str,
    op: impl FnOnce(&mut TagSelector) -> R,
) -> Result<(R, TagInputView), AppError> {
    match form {
        "search" => {
            let mut search = state.search.lock().await;
            let out = op(search.tags_mut());
            Ok((out, search.tags().view()))
        }
        "upload" => {
            let mut upload = state.upload.lock().await;
            let out = op(upload.tags_mut());
            Ok((out, upload.tags().view()))
        }
        other => Err(AppError::NotFound(format!("Unknown form '{}'", other))),
    }
}

/// POST /api/{form}/tags/input - Input text changed.
pub async fn tag_input(
    State(state): State<AppState>,
    Path(form): Path<String>,
    Json(request): Json<InputRequest>,
) -> ApiResult<TagInputView> {
    let ((), view) = with_tags(&state, &form, |tags| tags.on_input_change(request.text)).await?;
    success(view)
}

/// POST /api/{form}/tags/key - Key pressed in the tag input.
pub async fn tag_key(
    State(state): State<AppState>,
    Path(form): Path<String>,
    Json(request): Json<KeyRequest>,
) -> ApiResult<KeyResponse> {
    let key = Key::from_name(&request.key);
    let (prevent_default, tags) = with_tags(&state, &form, |tags| tags.handle_key(key)).await?;
    success(KeyResponse {
        prevent_default,
        tags,
    })
}

/// POST /api/{form}/tags/commit - Commit free text as a tag.
pub async fn tag_commit(
    State(state): State<AppState>,
    Path(form): Path<String>,
    Json(request): Json<TagRequest>,
) -> ApiResult<TagInputView> {
    let (_, view) = with_tags(&state, &form, |tags| tags.commit_tag(&request.tag)).await?;
    success(view)
}

/// POST /api/{form}/tags/select - Pick a suggestion.
pub async fn tag_select(
    State(state): State<AppState>,
    Path(form): Path<String>,
    Json(request): Json<TagRequest>,
) -> ApiResult<TagInputView> {
    let (_, view) = with_tags(&state, &form, |tags| tags.select_suggestion(&request.tag)).await?;
    success(view)
}

/// POST /api/{form}/tags/focus - Open the suggestion list.
pub async fn tag_focus(
    State(state): State<AppState>,
    Path(form): Path<String>,
) -> ApiResult<TagInputView> {
    let ((), view) = with_tags(&state, &form, TagSelector::focus).await?;
    success(view)
}

/// POST /api/{form}/tags/blur - Close the suggestion list.
pub async fn tag_blur(
    State(state): State<AppState>,
    Path(form): Path<String>,
) -> ApiResult<TagInputView> {
    let ((), view) = with_tags(&state, &form, TagSelector::blur).await?;
    success(view)
}

/// DELETE /api/{form}/tags/{tag} - Remove a selected tag.
pub async fn tag_remove(
    State(state): State<AppState>,
    Path((form, tag)): Path<(String, String)>,
) -> ApiResult<TagInputView> {
    let (_, view) = with_tags(&state, &form, |tags| tags.remove_tag(&tag)).await?;
    success(view)
}
