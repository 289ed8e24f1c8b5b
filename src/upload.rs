//! Delivery of finished artifacts to the upload endpoint.
//!
//! The endpoint is an external collaborator: it accepts a multipart POST
//! with the artifact under a fixed field name plus arbitrary extra
//! key/value fields, and answers with a JSON envelope. Non-2xx statuses and
//! malformed bodies are send failures.

use crate::audio::encoding::AudioArtifact;
use crate::defaults;
use crate::error::{CapscribeError, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Response envelope returned by the upload endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub metadata: Option<UploadMetadata>,
}

/// Server-side metadata about a stored artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub size: u64,
    pub mimetype: String,
    pub original_name: String,
    pub timestamp: String,
}

/// Client for posting recording artifacts to the upload endpoint.
pub struct RecordingUploader {
    client: reqwest::Client,
    endpoint: String,
    field_name: String,
}

impl RecordingUploader {
    /// Create an uploader targeting the given endpoint URL.
    ///
    /// # Errors
    /// Returns `CapscribeError::Upload` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CapscribeError::Upload {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            field_name: defaults::UPLOAD_FIELD.to_string(),
        })
    }

    /// Override the multipart field name the artifact is sent under.
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST an artifact to the endpoint with optional extra form fields.
    ///
    /// # Errors
    /// - `CapscribeError::Upload` — request failure or malformed response body
    /// - `CapscribeError::UploadRejected` — the endpoint answered non-2xx
    pub async fn send(
        &self,
        artifact: &AudioArtifact,
        extra_fields: &[(&str, &str)],
    ) -> Result<UploadResponse> {
        let file_name = artifact.file_name(&format!("recording_{}", unix_timestamp_millis()));

        let part = Part::bytes(artifact.data().to_vec())
            .file_name(file_name)
            .mime_str(artifact.media_type())
            .map_err(|e| CapscribeError::Upload {
                message: format!("Invalid media type: {}", e),
            })?;

        let mut form = Form::new().part(self.field_name.clone(), part);
        for (key, value) in extra_fields {
            form = form.text(key.to_string(), value.to_string());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CapscribeError::Upload {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapscribeError::UploadRejected {
                status: status.as_u16(),
            });
        }

        response
            .json::<UploadResponse>()
            .await
            .map_err(|e| CapscribeError::Upload {
                message: format!("Malformed response body: {}", e),
            })
    }
}

fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
