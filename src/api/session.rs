//! Session endpoints (OTP login / logout).

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::login::LoginView;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    pub mobile_number: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub otp: String,
}

/// GET /api/session - Current login state.
pub async fn get_session(State(state): State<AppState>) -> ApiResult<LoginView> {
    let login = state.login.lock().await;
    success(login.view())
}

/// POST /api/session/otp - Request an OTP for a mobile number.
pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<OtpRequest>,
) -> ApiResult<LoginView> {
    let mut login = state.login.lock().await;
    login.request_otp(&request.mobile_number).await;
    success(login.view())
}

/// POST /api/session/verify - Validate the OTP and open a session.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<LoginView> {
    let mut login = state.login.lock().await;
    login.validate_otp(&request.otp).await;
    success(login.view())
}

/// DELETE /api/session - Log out and reset every form.
pub async fn logout(State(state): State<AppState>) -> ApiResult<LoginView> {
    state.search.lock().await.clear_search();
    state.upload.lock().await.reset();

    let mut login = state.login.lock().await;
    login.logout();
    success(login.view())
}
