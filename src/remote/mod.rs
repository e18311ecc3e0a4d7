//! Remote document management service.
//!
//! `DocumentApi` is the contract the forms depend on; `HttpDocumentApi` is the
//! reqwest implementation talking to the real service.

#[cfg(test)]
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{
    DocumentRecord, SearchPayload, SearchResponse, TagLabel, UploadFile, UploadPayload,
    UploadResponse,
};

/// Header carrying the session token on authenticated calls.
pub const TOKEN_HEADER: &str = "token";

/// Answer to an OTP request.
#[derive(Debug, Clone, Default)]
pub struct OtpResponse {
    pub ok: bool,
    pub message: Option<String>,
}

/// Answer to an OTP validation.
#[derive(Debug, Clone, Default)]
pub struct OtpValidation {
    pub ok: bool,
    pub status: bool,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub message: Option<String>,
}

/// Operations offered by the remote document management service.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Tags whose label matches a partial term.
    async fn document_tags(&self, term: &str, token: &str) -> Result<Vec<TagLabel>, AppError>;

    /// Run a document search.
    async fn search_documents(
        &self,
        payload: &SearchPayload,
        token: &str,
    ) -> Result<SearchResponse, AppError>;

    /// Store a file together with its metadata.
    async fn save_document(
        &self,
        file: &UploadFile,
        payload: &UploadPayload,
        token: &str,
    ) -> Result<UploadResponse, AppError>;

    /// Ask the service to send an OTP to a mobile number.
    async fn generate_otp(&self, mobile_number: &str) -> Result<OtpResponse, AppError>;

    /// Exchange an OTP for a session token.
    async fn validate_otp(&self, mobile_number: &str, otp: &str)
        -> Result<OtpValidation, AppError>;
}

// Wire envelopes

#[derive(Debug, Deserialize)]
struct TagsEnvelope {
    #[serde(default)]
    data: Option<Vec<TagLabel>>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    data: Option<Vec<DocumentRecord>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "recordsFiltered", deserialize_with = "count")]
    records_filtered: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    #[serde(default)]
    status: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidateEnvelope {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    data: Option<SessionData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    user_id: Option<String>,
}

/// Identities come back as either JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Record counts come back as either JSON numbers or numeric strings.
fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A body decoded as `T`, together with the HTTP status it arrived with.
struct Decoded<T> {
    status: StatusCode,
    body: Result<T, AppError>,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<Decoded<T>, AppError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    let body = serde_json::from_slice::<T>(&bytes).map_err(AppError::from);
    Ok(Decoded { status, body })
}

/// reqwest-backed implementation of [`DocumentApi`].
#[derive(Debug, Clone)]
pub struct HttpDocumentApi {
    client: Client,
    base_url: String,
}

impl HttpDocumentApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn document_tags(&self, term: &str, token: &str) -> Result<Vec<TagLabel>, AppError> {
        tracing::debug!(term, "Looking up document tags");

        let response = self
            .client
            .post(self.url("documentTags"))
            .header(TOKEN_HEADER, token)
            .json(&json!({ "term": term }))
            .send()
            .await?;

        let decoded = decode::<TagsEnvelope>(response).await?;
        if !decoded.status.is_success() {
            return Err(AppError::Remote {
                message: None,
                status: decoded.status.as_u16(),
            });
        }

        decoded.body?.data.ok_or_else(|| {
            AppError::MalformedResponse("Tag lookup response has no data".to_string())
        })
    }

    async fn search_documents(
        &self,
        payload: &SearchPayload,
        token: &str,
    ) -> Result<SearchResponse, AppError> {
        tracing::debug!(?payload, "Searching documents");

        let response = self
            .client
            .post(self.url("searchDocumentEntry"))
            .header(TOKEN_HEADER, token)
            .json(payload)
            .send()
            .await?;

        let decoded = decode::<SearchEnvelope>(response).await?;
        let ok = decoded.status.is_success();
        let envelope = match decoded.body {
            Ok(envelope) => envelope,
            Err(_) if !ok => {
                return Err(AppError::Remote {
                    message: None,
                    status: decoded.status.as_u16(),
                })
            }
            Err(e) => return Err(e),
        };

        if ok && envelope.status && envelope.data.is_none() {
            return Err(AppError::MalformedResponse(
                "Search response has no data".to_string(),
            ));
        }

        let data = envelope.data.unwrap_or_default();
        let records_filtered = envelope
            .records_filtered
            .unwrap_or(data.len() as u64);

        Ok(SearchResponse {
            ok,
            status: envelope.status,
            data,
            message: envelope.message,
            records_filtered,
        })
    }

    async fn save_document(
        &self,
        file: &UploadFile,
        payload: &UploadPayload,
        token: &str,
    ) -> Result<UploadResponse, AppError> {
        tracing::debug!(file = %file.name, size = file.bytes.len(), "Uploading document");

        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| AppError::Validation(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("data", serde_json::to_string(payload)?);

        let response = self
            .client
            .post(self.url("saveDocumentEntry"))
            .header(TOKEN_HEADER, token)
            .multipart(form)
            .send()
            .await?;

        let decoded = decode::<MessageEnvelope>(response).await?;
        let envelope = decoded.body.ok();
        Ok(UploadResponse {
            ok: decoded.status.is_success()
                && envelope.as_ref().and_then(|e| e.status).unwrap_or(true),
            message: envelope.and_then(|e| e.message),
        })
    }

    async fn generate_otp(&self, mobile_number: &str) -> Result<OtpResponse, AppError> {
        tracing::debug!("Requesting OTP");

        let response = self
            .client
            .post(self.url("generateOTP"))
            .json(&json!({ "mobile_number": mobile_number }))
            .send()
            .await?;

        let decoded = decode::<MessageEnvelope>(response).await?;
        let envelope = decoded.body.ok();
        Ok(OtpResponse {
            ok: decoded.status.is_success()
                && envelope.as_ref().and_then(|e| e.status).unwrap_or(true),
            message: envelope.and_then(|e| e.message),
        })
    }

    async fn validate_otp(
        &self,
        mobile_number: &str,
        otp: &str,
    ) -> Result<OtpValidation, AppError> {
        tracing::debug!("Validating OTP");

        let response = self
            .client
            .post(self.url("validateOTP"))
            .json(&json!({ "mobile_number": mobile_number, "otp": otp }))
            .send()
            .await?;

        let decoded = decode::<ValidateEnvelope>(response).await?;
        let ok = decoded.status.is_success();
        let envelope = match decoded.body {
            Ok(envelope) => envelope,
            Err(_) if !ok => {
                return Ok(OtpValidation {
                    ok,
                    ..Default::default()
                })
            }
            Err(e) => return Err(e),
        };

        let (token, user_id) = envelope
            .data
            .map(|d| (d.token, d.user_id))
            .unwrap_or_default();

        Ok(OtpValidation {
            ok,
            status: envelope.status,
            token,
            user_id,
            message: envelope.message,
        })
    }
}
