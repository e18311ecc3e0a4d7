//! Two-step OTP login: request a code for a mobile number, then validate it.
//!
//! A successful validation writes the credential pair into the shared
//! [`Session`]; the forms pick it up from there.

use std::sync::Arc;

use serde::Serialize;

use crate::models::{FormMessage, NETWORK_ERROR_MESSAGE};
use crate::remote::DocumentApi;
use crate::session::Session;

pub const INVALID_MOBILE_MESSAGE: &str = "Please enter a valid 10-digit mobile number.";
pub const OTP_SENT_MESSAGE: &str = "OTP sent to your mobile number.";
pub const OTP_FAILED_MESSAGE: &str = "Failed to send OTP. Please try again.";
pub const INVALID_OTP_MESSAGE: &str = "Invalid OTP. Please try again.";
pub const OTP_NOT_REQUESTED_MESSAGE: &str = "Request an OTP before validating.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStep {
    Request,
    Validate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginView {
    pub step: LoginStep,
    pub mobile_number: String,
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub message: Option<FormMessage>,
}

pub struct LoginFlow {
    api: Arc<dyn DocumentApi>,
    session: Session,
    mobile_number: String,
    step: LoginStep,
    message: Option<FormMessage>,
}

fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == 10 && mobile.bytes().all(|b| b.is_ascii_digit())
}

impl LoginFlow {
    pub fn new(api: Arc<dyn DocumentApi>, session: Session) -> Self {
        Self {
            api,
            session,
            mobile_number: String::new(),
            step: LoginStep::Request,
            message: None,
        }
    }

    /// Ask the remote service to send an OTP to `mobile`.
    pub async fn request_otp(&mut self, mobile: &str) -> bool {
        self.message = None;
        let mobile = mobile.trim();

        if !is_valid_mobile(mobile) {
            self.message = Some(FormMessage::error(INVALID_MOBILE_MESSAGE));
            return false;
        }

        match self.api.generate_otp(mobile).await {
            Ok(response) if response.ok => {
                self.mobile_number = mobile.to_string();
                self.step = LoginStep::Validate;
                self.message = Some(FormMessage::success(OTP_SENT_MESSAGE));
                true
            }
            Ok(response) => {
                let text = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| OTP_FAILED_MESSAGE.to_string());
                self.message = Some(FormMessage::error(text));
                false
            }
            Err(e) => {
                tracing::warn!("OTP request failed: {}", e);
                self.message = Some(FormMessage::error(NETWORK_ERROR_MESSAGE));
                false
            }
        }
    }

    /// Exchange `otp` for a session. Only valid after a successful request.
    pub async fn validate_otp(&mut self, otp: &str) -> bool {
        self.message = None;

        if self.step != LoginStep::Validate {
            self.message = Some(FormMessage::error(OTP_NOT_REQUESTED_MESSAGE));
            return false;
        }

        let response = match self.api.validate_otp(&self.mobile_number, otp.trim()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("OTP validation failed: {}", e);
                self.message = Some(FormMessage::error(NETWORK_ERROR_MESSAGE));
                return false;
            }
        };

        let token = response.token.filter(|t| !t.is_empty());
        let user_id = response.user_id.filter(|u| !u.is_empty());
        match (response.ok && response.status, token, user_id) {
            (true, Some(token), Some(user_id)) => {
                tracing::info!(user_id = %user_id, "Logged in");
                self.session.login(token, user_id);
                self.step = LoginStep::Request;
                true
            }
            _ => {
                let text = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| INVALID_OTP_MESSAGE.to_string());
                self.message = Some(FormMessage::error(text));
                false
            }
        }
    }

    /// Drop the session and start over.
    pub fn logout(&mut self) {
        tracing::info!("Logged out");
        self.session.logout();
        self.mobile_number.clear();
        self.step = LoginStep::Request;
        self.message = None;
    }

    pub fn view(&self) -> LoginView {
        LoginView {
            step: self.step,
            mobile_number: self.mobile_number.clone(),
            authenticated: self.session.is_authenticated(),
            user_id: self.session.user_id(),
            message: self.message.clone(),
        }
    }
}
