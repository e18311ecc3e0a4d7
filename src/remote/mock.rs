//! In-memory `DocumentApi` used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{DocumentApi, OtpResponse, OtpValidation};
use crate::errors::AppError;
use crate::models::{
    SearchPayload, SearchResponse, TagLabel, UploadFile, UploadPayload, UploadResponse,
};

/// Scripted outcome for a remote call.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Respond(T),
    NetworkDown,
    Malformed,
}

impl<T: Clone> Reply<T> {
    fn produce(&self) -> Result<T, AppError> {
        match self {
            Reply::Respond(value) => Ok(value.clone()),
            Reply::NetworkDown => Err(AppError::Network("connection refused".to_string())),
            Reply::Malformed => Err(AppError::MalformedResponse("bad body".to_string())),
        }
    }
}

pub struct MockApi {
    /// Every known tag label; lookups return the ones containing the term.
    pub labels: Mutex<Vec<String>>,
    pub tag_delays: Mutex<HashMap<String, Duration>>,
    pub tags_fail: Mutex<bool>,
    pub tag_terms: Mutex<Vec<String>>,

    pub search_reply: Mutex<Reply<SearchResponse>>,
    pub searches: Mutex<Vec<(SearchPayload, String)>>,

    pub upload_reply: Mutex<Reply<UploadResponse>>,
    pub uploads: Mutex<Vec<(UploadFile, UploadPayload)>>,

    pub otp_reply: Mutex<Reply<OtpResponse>>,
    pub validate_reply: Mutex<Reply<OtpValidation>>,
    pub otp_requests: Mutex<Vec<String>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            labels: Mutex::new(Vec::new()),
            tag_delays: Mutex::new(HashMap::new()),
            tags_fail: Mutex::new(false),
            tag_terms: Mutex::new(Vec::new()),
            search_reply: Mutex::new(Reply::Respond(SearchResponse {
                ok: true,
                status: true,
                ..Default::default()
            })),
            searches: Mutex::new(Vec::new()),
            upload_reply: Mutex::new(Reply::Respond(UploadResponse {
                ok: true,
                message: None,
            })),
            uploads: Mutex::new(Vec::new()),
            otp_reply: Mutex::new(Reply::Respond(OtpResponse {
                ok: true,
                message: None,
            })),
            validate_reply: Mutex::new(Reply::Respond(OtpValidation::default())),
            otp_requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockApi {
    pub fn with_labels(labels: &[&str]) -> Self {
        let api = Self::default();
        *api.labels.lock().unwrap() = labels.iter().map(|s| s.to_string()).collect();
        api
    }

    pub fn tag_terms(&self) -> Vec<String> {
        self.tag_terms.lock().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentApi for MockApi {
    async fn document_tags(&self, term: &str, _token: &str) -> Result<Vec<TagLabel>, AppError> {
        self.tag_terms.lock().unwrap().push(term.to_string());

        let delay = self.tag_delays.lock().unwrap().get(term).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.tags_fail.lock().unwrap() {
            return Err(AppError::Network("connection reset".to_string()));
        }

        let needle = term.to_lowercase();
        Ok(self
            .labels
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.to_lowercase().contains(&needle))
            .map(|l| TagLabel { label: l.clone() })
            .collect())
    }

    async fn search_documents(
        &self,
        payload: &SearchPayload,
        token: &str,
    ) -> Result<SearchResponse, AppError> {
        self.searches
            .lock()
            .unwrap()
            .push((payload.clone(), token.to_string()));
        self.search_reply.lock().unwrap().produce()
    }

    async fn save_document(
        &self,
        file: &UploadFile,
        payload: &UploadPayload,
        _token: &str,
    ) -> Result<UploadResponse, AppError> {
        self.uploads
            .lock()
            .unwrap()
            .push((file.clone(), payload.clone()));
        self.upload_reply.lock().unwrap().produce()
    }

    async fn generate_otp(&self, mobile_number: &str) -> Result<OtpResponse, AppError> {
        self.otp_requests
            .lock()
            .unwrap()
            .push(mobile_number.to_string());
        self.otp_reply.lock().unwrap().produce()
    }

    async fn validate_otp(
        &self,
        _mobile_number: &str,
        _otp: &str,
    ) -> Result<OtpValidation, AppError> {
        self.validate_reply.lock().unwrap().produce()
    }
}
